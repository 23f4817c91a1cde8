use std::ops::Index;

use cranelift_entity::{entity_impl, PrimaryMap};
use ouro::Span;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MatchHandle(u32);

entity_impl!(MatchHandle);

/// One matched clause occurrence.
///
/// Nodes do not repeat clause payloads; consumers walk the match tree and
/// the clause tree in lockstep. `pick` records the winning alternative when
/// the clause was a choice and is zero everywhere else.
#[derive(Clone, Debug)]
pub struct MatchNode {
    pub span: Span,
    pub children: Vec<MatchHandle>,
    pub pick: u32,
}

/// The structural result of a successful parse.
///
/// All nodes of one parse live in a single arena. Memoized rule results are
/// shared, so the structure reachable from [`Match::root`] is a DAG rather
/// than a strict tree; nodes abandoned by backtracking stay in the arena but
/// are unreachable. The whole value is discarded after action binding.
#[derive(Debug)]
pub struct Match {
    nodes: PrimaryMap<MatchHandle, MatchNode>,
    root: MatchHandle,
}

impl Match {
    pub(crate) fn new(nodes: PrimaryMap<MatchHandle, MatchNode>, root: MatchHandle) -> Match {
        Match { nodes, root }
    }

    pub fn root(&self) -> MatchHandle {
        self.root
    }

    /// The span the whole parse consumed.
    pub fn span(&self) -> Span {
        self.nodes[self.root].span
    }

    pub fn get(&self, handle: MatchHandle) -> Option<&MatchNode> {
        self.nodes.get(handle)
    }
}

impl Index<MatchHandle> for Match {
    type Output = MatchNode;
    fn index(&self, handle: MatchHandle) -> &MatchNode {
        &self.nodes[handle]
    }
}
