use ouro::RuleHandle;

use crate::tree::MatchHandle;

/// State of one `(rule, position)` cell.
///
/// `Growing` marks an invocation in progress and carries the current
/// left-recursion seed; `Done(None)` is a memoized failure.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum MemoEntry {
    Vacant,
    Growing(Option<(MatchHandle, u32)>),
    Done(Option<(MatchHandle, u32)>),
}

/// Dense per-parse memo table: `rule_count x (input_len + 1)` cells.
///
/// Rule counts are small, so the dense layout beats a hash map and keeps
/// lookups branch-free. The table is discarded with the parse.
pub(crate) struct MemoTable {
    entries: Vec<MemoEntry>,
    width: usize,
}

impl MemoTable {
    pub fn new(rule_count: usize, input_len: usize) -> MemoTable {
        let width = input_len + 1;
        MemoTable {
            entries: vec![MemoEntry::Vacant; rule_count * width],
            width,
        }
    }

    fn index(&self, rule: RuleHandle, at: u32) -> usize {
        rule.as_u32() as usize * self.width + at as usize
    }

    pub fn get(&self, rule: RuleHandle, at: u32) -> MemoEntry {
        self.entries[self.index(rule, at)]
    }

    pub fn set(&mut self, rule: RuleHandle, at: u32, entry: MemoEntry) {
        let index = self.index(rule, at);
        self.entries[index] = entry;
    }
}
