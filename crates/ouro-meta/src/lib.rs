//! Meta-parsing for the ouro toolkit: the textual grammar dialects, the
//! grammar-building action host, and the self-hosting bootstrap.
//!
//! The chain starts at [`boot::seed`], a hand-built parser for the minimal
//! dialect. It reads `grammars/boot.bpeg`, whose output reads
//! `grammars/bpeg.bpeg`, and [`bootstrap::fixed_point`] iterates that until
//! the produced grammar reproduces itself. The canonical `name <- expr`
//! dialect is then one more grammar text away ([`peg`]).

pub mod boot;
pub mod bootstrap;
pub mod bpeg;
pub mod build;
pub mod peg;
pub mod recipe;

pub use bootstrap::BootstrapError;
pub use build::{GrammarHost, Term};
pub use recipe::{Recipe, RecipeError};
