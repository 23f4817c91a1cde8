//! Grammar IR for the ouro parsing toolkit.
//!
//! A grammar is a frozen set of named [`clause::Clause`] trees. Everything
//! recursive goes through named references resolved against the owning
//! [`grammar::Grammar`]; the trees themselves stay acyclic. The matching
//! engine lives in `ouro-runtime`, the textual grammar dialects and the
//! bootstrap in `ouro-meta`.

mod analysis;
pub mod clause;
pub mod error;
pub mod grammar;
pub mod render;
pub mod span;

pub use clause::{Action, Clause, RcString};
pub use error::{GrammarDefect, GrammarErrors};
pub use grammar::{Grammar, Rule, RuleHandle};
pub use span::Span;
