use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Index;

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};

use crate::analysis::{self, RuleFacts};
use crate::clause::{Clause, RcString};
use crate::error::{DefectAccumulator, GrammarDefect, GrammarErrors};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RuleHandle(u32);

entity_impl!(RuleHandle);

impl RuleHandle {
    pub fn name(self, grammar: &Grammar) -> &RcString {
        &grammar[self].name
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Rule {
    pub name: RcString,
    pub clause: Clause,
}

/// A frozen namespace of rules with a designated entry point.
///
/// Built once from `(name, clause)` pairs; duplicate names and unresolved
/// references are rejected up front, every [`Clause::Reference`] gets its
/// handle cached, and the nullability / left-recursion facts the engine
/// depends on are computed here.
#[derive(Clone, Debug)]
pub struct Grammar {
    rules: PrimaryMap<RuleHandle, Rule>,
    by_name: HashMap<RcString, RuleHandle>,
    facts: SecondaryMap<RuleHandle, RuleFacts>,
    entry: RuleHandle,
}

/// The conventional name of the entry rule.
pub const ENTRY_RULE: &str = "top";

impl Grammar {
    pub fn build(
        rules: impl IntoIterator<Item = (RcString, Clause)>,
    ) -> Result<Grammar, GrammarErrors> {
        let defects = DefectAccumulator::new();

        let mut map: PrimaryMap<RuleHandle, Rule> = PrimaryMap::new();
        let mut by_name: HashMap<RcString, RuleHandle> = HashMap::new();
        for (name, clause) in rules {
            match by_name.entry(name.clone()) {
                Entry::Occupied(_) => defects.push(GrammarDefect::DuplicateRule { name }),
                Entry::Vacant(vacant) => {
                    vacant.insert(map.push(Rule { name, clause }));
                }
            }
        }
        if map.is_empty() {
            defects.push(GrammarDefect::MissingRules);
        }

        for (_, rule) in map.iter_mut() {
            let rule_name = rule.name.clone();
            rule.clause.visit_mut(|clause| {
                if let Clause::Reference { name, resolved } = clause {
                    match by_name.get(name) {
                        Some(&handle) => *resolved = Some(handle),
                        None => defects.push(GrammarDefect::UnknownRule {
                            name: name.clone(),
                            rule: rule_name.clone(),
                        }),
                    }
                }
            });
        }

        defects.finish()?;

        let facts = analysis::analyze(&map);
        let entry = match by_name.get(ENTRY_RULE) {
            Some(&handle) => handle,
            None => map.keys().next().unwrap(),
        };

        Ok(Grammar {
            rules: map,
            by_name,
            facts,
            entry,
        })
    }

    pub fn entry(&self) -> RuleHandle {
        self.entry
    }

    pub fn entry_rule(&self) -> &Rule {
        &self.rules[self.entry]
    }

    pub fn resolve(&self, name: &str) -> Option<RuleHandle> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, handle: RuleHandle) -> Option<&Rule> {
        self.rules.get(handle)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> cranelift_entity::Iter<'_, RuleHandle, Rule> {
        self.rules.iter()
    }

    /// Whether the rule can match without consuming input.
    pub fn nullable(&self, handle: RuleHandle) -> bool {
        self.facts[handle].nullable
    }

    /// Whether the rule seeds: it is reachable from itself through
    /// left-most nullable positions and needs the LR protocol.
    pub fn left_recursive(&self, handle: RuleHandle) -> bool {
        self.facts[handle].left_recursive
    }

    /// Nullability of a detached clause, resolved against this grammar.
    pub fn clause_nullable(&self, clause: &Clause) -> bool {
        analysis::clause_nullable(clause, &self.facts)
    }

    /// Structural equality; the bootstrap fixed point detector.
    pub fn equal_to(&self, other: &Grammar) -> bool {
        self.rules.len() == other.rules.len()
            && self.entry == other.entry
            && self
                .rules
                .iter()
                .zip(other.rules.iter())
                .all(|((_, a), (_, b))| a == b)
    }
}

impl Index<RuleHandle> for Grammar {
    type Output = Rule;
    fn index(&self, handle: RuleHandle) -> &Rule {
        &self.rules[handle]
    }
}
