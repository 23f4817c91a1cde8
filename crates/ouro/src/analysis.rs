//! Nullability and left-recursion facts, computed once at grammar build.

use cranelift_entity::{EntitySet, PrimaryMap, SecondaryMap};

use crate::clause::Clause;
use crate::grammar::{Rule, RuleHandle};

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct RuleFacts {
    /// The rule can match without consuming input.
    pub nullable: bool,
    /// The rule reaches itself through a chain of left-most nullable
    /// positions, so the engine must run the seed-growing protocol for it.
    pub left_recursive: bool,
}

pub(crate) fn analyze(rules: &PrimaryMap<RuleHandle, Rule>) -> SecondaryMap<RuleHandle, RuleFacts> {
    let mut facts: SecondaryMap<RuleHandle, RuleFacts> = SecondaryMap::new();
    for (handle, _) in rules.iter() {
        facts[handle] = RuleFacts::default();
    }

    // Least fixed point: nullability only ever flips false -> true, and the
    // rule count bounds the iteration.
    loop {
        let mut changed = false;
        for (handle, rule) in rules.iter() {
            if !facts[handle].nullable && clause_nullable(&rule.clause, &facts) {
                facts[handle].nullable = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for (handle, _) in rules.iter() {
        let left_recursive = reaches_itself(handle, rules, &facts);
        facts[handle].left_recursive = left_recursive;
    }

    facts
}

pub(crate) fn clause_nullable(
    clause: &Clause,
    facts: &SecondaryMap<RuleHandle, RuleFacts>,
) -> bool {
    match clause {
        Clause::Empty | Clause::Not { .. } | Clause::And { .. } => true,
        Clause::Any { .. } | Clause::Literal { .. } | Clause::Range { .. } => false,
        Clause::Reference { resolved, .. } => {
            resolved.map_or(false, |handle| facts[handle].nullable)
        }
        Clause::Sequence { children } => children
            .iter()
            .all(|child| clause_nullable(child, facts)),
        Clause::Choice { children } => children
            .iter()
            .any(|child| clause_nullable(child, facts)),
        Clause::Repeat { child }
        | Clause::Commit { child }
        | Clause::Capture { child, .. }
        | Clause::Transform { child, .. } => clause_nullable(child, facts),
    }
}

/// Push every rule reachable from `clause` at its entry position. Predicate
/// and repetition children count: they evaluate before anything consumes.
fn left_successors(
    clause: &Clause,
    facts: &SecondaryMap<RuleHandle, RuleFacts>,
    out: &mut Vec<RuleHandle>,
) {
    match clause {
        Clause::Reference {
            resolved: Some(handle),
            ..
        } => out.push(*handle),
        Clause::Sequence { children } => {
            for child in children {
                left_successors(child, facts, out);
                if !clause_nullable(child, facts) {
                    break;
                }
            }
        }
        Clause::Choice { children } => {
            for child in children {
                left_successors(child, facts, out);
            }
        }
        Clause::Repeat { child }
        | Clause::Not { child }
        | Clause::And { child }
        | Clause::Commit { child }
        | Clause::Capture { child, .. }
        | Clause::Transform { child, .. } => left_successors(child, facts, out),
        _ => {}
    }
}

fn reaches_itself(
    start: RuleHandle,
    rules: &PrimaryMap<RuleHandle, Rule>,
    facts: &SecondaryMap<RuleHandle, RuleFacts>,
) -> bool {
    let mut seen = EntitySet::new();
    let mut stack = Vec::new();
    left_successors(&rules[start].clause, facts, &mut stack);

    while let Some(handle) = stack.pop() {
        if handle == start {
            return true;
        }
        if !seen.contains(handle) {
            seen.insert(handle);
            left_successors(&rules[handle].clause, facts, &mut stack);
        }
    }
    false
}
