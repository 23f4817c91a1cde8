//! The canonical dialect front end: free-form `name <- expression` rules.

use ouro::Grammar;

use crate::bootstrap::{self, BootstrapError};

/// The grammar of the canonical dialect, obtained by reading its bpeg
/// description with the bootstrapped bpeg parser.
pub fn grammar() -> Result<Grammar, BootstrapError> {
    let bpeg = bootstrap::fixed_point()?;
    bootstrap::parse_grammar(&bpeg, bootstrap::PEG_GRAMMAR)
}

/// Read a canonical-dialect grammar text into a [`Grammar`].
pub fn parse_grammar(source: &str) -> Result<Grammar, BootstrapError> {
    let dialect = grammar()?;
    bootstrap::parse_grammar(&dialect, source)
}
