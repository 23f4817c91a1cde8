//! The ouro matching engine.
//!
//! A parse is a pure, single-threaded function of `(Grammar, input)`: the
//! engine interprets the clause tree with per-rule memoization, handles
//! left-recursive rules by growing a seed match, tracks the farthest
//! failure for diagnostics, and only then runs user actions bottom-up over
//! the finished match tree.

pub mod action;
pub mod engine;
pub mod failure;
mod memo;
pub mod tree;

pub use action::{ActionError, ActionHost, Outcome, Scope};
pub use engine::Parser;
pub use failure::{Expected, Failure, ParseError};
pub use tree::{Match, MatchHandle, MatchNode};
