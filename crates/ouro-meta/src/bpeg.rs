//! The bpeg dialect front end: `name:` headers with `| case` lines.

use ouro::Grammar;

use crate::bootstrap::{self, BootstrapError};

/// The bootstrapped grammar of the bpeg dialect itself.
pub fn grammar() -> Result<Grammar, BootstrapError> {
    bootstrap::fixed_point()
}

/// Read a bpeg-dialect grammar text into a [`Grammar`].
pub fn parse_grammar(source: &str) -> Result<Grammar, BootstrapError> {
    let dialect = grammar()?;
    bootstrap::parse_grammar(&dialect, source)
}
