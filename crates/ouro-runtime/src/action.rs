//! Action binding: turning a match tree into a user value.
//!
//! Actions run in a single post-order pass after the whole parse has
//! succeeded. The engine only moves capture bindings around; what an action
//! body means is entirely up to the [`ActionHost`].

use std::fmt::Display;

use ouro::{Action, Clause, Grammar, RcString, Span};

use crate::failure::ParseError;
use crate::tree::{Match, MatchHandle};

/// A host-side evaluation failure; the engine attaches the span.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ActionError {
    pub reason: String,
}

impl ActionError {
    pub fn new(reason: impl Into<String>) -> ActionError {
        ActionError {
            reason: reason.into(),
        }
    }
}

impl Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// What an action hands back to the engine.
pub enum Outcome<V> {
    Value(V),
    /// The match contributes nothing to its parent scope; whitespace and
    /// comment rules use this.
    Discard,
}

/// The bindings visible to one action invocation: everything captured below
/// the transform but outside nested transforms, in capture order, plus the
/// slice the transform matched (reachable as `*` in recipe-style hosts).
pub struct Scope<'a, V> {
    input: &'a str,
    span: Span,
    bindings: &'a [(RcString, V)],
}

impl<'a, V> Scope<'a, V> {
    /// Assemble a scope by hand; hosts use this to unit-test their actions.
    pub fn new(input: &'a str, span: Span, bindings: &'a [(RcString, V)]) -> Scope<'a, V> {
        Scope {
            input,
            span,
            bindings,
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The input slice the transform matched.
    pub fn text(&self) -> &'a str {
        self.span.as_str(self.input)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.bindings
            .iter()
            .find(|(bound, _)| &**bound == name)
            .map(|(_, value)| value)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &V)> {
        self.bindings.iter().map(|(name, value)| (&**name, value))
    }
}

/// The evaluator for opaque action tokens.
pub trait ActionHost {
    type Value: Clone;

    /// Wrap a raw input slice; used for captures with no action inside and
    /// for an action-less top rule.
    fn literal(&self, text: &str) -> Result<Self::Value, ActionError>;

    /// Collect the values of a variadic capture.
    fn collect(&self, items: Vec<Self::Value>) -> Result<Self::Value, ActionError>;

    /// Evaluate one action over its scope.
    fn call(
        &self,
        action: &Action,
        scope: &Scope<'_, Self::Value>,
    ) -> Result<Outcome<Self::Value>, ActionError>;
}

struct Step<V> {
    results: Vec<V>,
    bindings: Vec<(RcString, V)>,
}

impl<V> Step<V> {
    fn empty() -> Step<V> {
        Step {
            results: Vec::new(),
            bindings: Vec::new(),
        }
    }
    fn append(&mut self, mut other: Step<V>) {
        self.results.append(&mut other.results);
        self.bindings.append(&mut other.bindings);
    }
}

struct EvalCx<'a, H: ActionHost> {
    grammar: &'a Grammar,
    input: &'a str,
    tree: &'a Match,
    host: &'a H,
}

impl<'a, H: ActionHost> EvalCx<'a, H> {
    fn host_error(&self, span: Span, error: ActionError) -> ParseError {
        ParseError::Action {
            span,
            reason: error.reason,
        }
    }

    fn eval(&self, clause: &Clause, handle: MatchHandle) -> Result<Step<H::Value>, ParseError> {
        let node = &self.tree[handle];
        match clause {
            Clause::Empty
            | Clause::Any { .. }
            | Clause::Literal { .. }
            | Clause::Range { .. }
            | Clause::Not { .. } => Ok(Step::empty()),
            Clause::Reference { name, resolved } => {
                let rule = resolved.ok_or_else(|| ParseError::UnknownRule { name: name.clone() })?;
                self.eval(&self.grammar[rule].clause, handle)
            }
            Clause::Sequence { children } => {
                debug_assert_eq!(children.len(), node.children.len());
                let mut step = Step::empty();
                for (child, &child_node) in children.iter().zip(&node.children) {
                    step.append(self.eval(child, child_node)?);
                }
                Ok(step)
            }
            Clause::Choice { children } => {
                self.eval(&children[node.pick as usize], node.children[0])
            }
            Clause::Repeat { child } => {
                let mut step = Step::empty();
                for &child_node in &node.children {
                    step.append(self.eval(child, child_node)?);
                }
                Ok(step)
            }
            Clause::And { child } => {
                // a positive lookahead keeps its captures but contributes no
                // values
                let step = self.eval(child, node.children[0])?;
                Ok(Step {
                    results: Vec::new(),
                    bindings: step.bindings,
                })
            }
            Clause::Commit { child } => self.eval(child, node.children[0]),
            Clause::Capture {
                child,
                name,
                variadic,
            } => {
                let mut step = self.eval(child, node.children[0])?;
                let value = if *variadic {
                    self.host
                        .collect(step.results)
                        .map_err(|error| self.host_error(node.span, error))?
                } else {
                    match step.results.len() {
                        0 => self
                            .host
                            .literal(node.span.as_str(self.input))
                            .map_err(|error| self.host_error(node.span, error))?,
                        1 => step.results.pop().unwrap(),
                        count => {
                            return Err(ParseError::CaptureArity {
                                name: name.clone(),
                                span: node.span,
                                count,
                            })
                        }
                    }
                };
                Ok(Step {
                    results: Vec::new(),
                    bindings: vec![(name.clone(), value)],
                })
            }
            Clause::Transform { child, action } => {
                let step = self.eval(child, node.children[0])?;
                let scope = Scope {
                    input: self.input,
                    span: node.span,
                    bindings: &step.bindings,
                };
                match self
                    .host
                    .call(action, &scope)
                    .map_err(|error| self.host_error(node.span, error))?
                {
                    Outcome::Value(value) => Ok(Step {
                        results: vec![value],
                        bindings: Vec::new(),
                    }),
                    Outcome::Discard => Ok(Step::empty()),
                }
            }
        }
    }
}

pub(crate) fn evaluate<H: ActionHost>(
    grammar: &Grammar,
    input: &str,
    tree: &Match,
    host: &H,
) -> Result<H::Value, ParseError> {
    let cx = EvalCx {
        grammar,
        input,
        tree,
        host,
    };
    let entry = &grammar.entry_rule().clause;
    let mut step = cx.eval(entry, tree.root())?;
    match step.results.len() {
        0 => host
            .literal(tree.span().as_str(input))
            .map_err(|error| cx.host_error(tree.span(), error)),
        1 => Ok(step.results.pop().unwrap()),
        _ => host
            .collect(step.results)
            .map_err(|error| cx.host_error(tree.span(), error)),
    }
}
