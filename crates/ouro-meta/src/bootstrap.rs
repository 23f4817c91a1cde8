//! The fixed-point iteration that makes the toolkit self-hosting.
//!
//! The hand-built seed reads the minimal meta-grammar; the result reads the
//! full meta-grammar; and the full parser keeps re-reading its own
//! description until two rounds agree structurally.

use std::fmt::Display;

use ouro::{Grammar, GrammarErrors};
use ouro_runtime::{ParseError, Parser};

use crate::boot;
use crate::build::{GrammarHost, Term};

/// The minimal meta-grammar, the textual twin of [`boot::seed`].
pub const BOOT_GRAMMAR: &str = include_str!("../grammars/boot.bpeg");
/// The full bpeg meta-grammar, written in the minimal subset.
pub const FULL_GRAMMAR: &str = include_str!("../grammars/bpeg.bpeg");
/// The canonical `name <- expr` dialect, written in bpeg.
pub const PEG_GRAMMAR: &str = include_str!("../grammars/peg.bpeg");

/// How many re-reads of the full grammar may happen before we declare the
/// bootstrap divergent. Convergence takes two in practice.
pub const ITERATION_LIMIT: u32 = 5;

#[derive(Clone, PartialEq, Debug)]
pub enum BootstrapError {
    Parse(ParseError),
    Grammar(GrammarErrors),
    /// Successive bootstrap iterations kept producing different grammars.
    Divergence { iterations: u32 },
    /// The top-level action of a meta-grammar produced a non-grammar value.
    NotAGrammar,
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapError::Parse(error) => error.fmt(f),
            BootstrapError::Grammar(errors) => errors.fmt(f),
            BootstrapError::Divergence { iterations } => write!(
                f,
                "bootstrap did not reach a fixed point within {iterations} iterations"
            ),
            BootstrapError::NotAGrammar => {
                f.write_str("the grammar text evaluated to something other than a grammar")
            }
        }
    }
}

impl std::error::Error for BootstrapError {}

impl From<ParseError> for BootstrapError {
    fn from(error: ParseError) -> Self {
        BootstrapError::Parse(error)
    }
}

impl From<GrammarErrors> for BootstrapError {
    fn from(errors: GrammarErrors) -> Self {
        BootstrapError::Grammar(errors)
    }
}

/// Read a grammar text with the grammar of its dialect.
pub fn parse_grammar(dialect: &Grammar, source: &str) -> Result<Grammar, BootstrapError> {
    let parser = Parser::new(dialect, GrammarHost);
    let (_, value) = parser.parse(source)?;
    match value {
        Term::Grammar(grammar) => Ok(grammar),
        _ => Err(BootstrapError::NotAGrammar),
    }
}

/// Run the whole chain: seed, minimal grammar, then the full grammar until
/// it reproduces itself.
pub fn fixed_point() -> Result<Grammar, BootstrapError> {
    let seed = boot::seed()?;
    let minimal = parse_grammar(&seed, BOOT_GRAMMAR)?;
    let mut current = parse_grammar(&minimal, FULL_GRAMMAR)?;
    for _ in 0..ITERATION_LIMIT {
        let next = parse_grammar(&current, FULL_GRAMMAR)?;
        if next.equal_to(&current) {
            return Ok(next);
        }
        current = next;
    }
    Err(BootstrapError::Divergence {
        iterations: ITERATION_LIMIT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_reads_its_own_description() {
        let seed = boot::seed().unwrap();
        let minimal = parse_grammar(&seed, BOOT_GRAMMAR).unwrap();

        // boot.bpeg is the seed written down, so reading it reproduces the
        // seed exactly
        assert!(minimal.equal_to(&seed));

        // and the produced parser agrees with itself on the same text
        let again = parse_grammar(&minimal, BOOT_GRAMMAR).unwrap();
        assert!(again.equal_to(&minimal));
    }

    #[test]
    fn test_full_grammar_reaches_fixed_point() {
        let seed = boot::seed().unwrap();
        let minimal = parse_grammar(&seed, BOOT_GRAMMAR).unwrap();
        let first = parse_grammar(&minimal, FULL_GRAMMAR).unwrap();
        let second = parse_grammar(&first, FULL_GRAMMAR).unwrap();
        assert!(second.equal_to(&first));

        let fixed = fixed_point().unwrap();
        assert!(fixed.equal_to(&first));
    }

    #[test]
    fn test_divergence_reporting() {
        let error = BootstrapError::Divergence { iterations: 5 };
        assert!(error.to_string().contains("5 iterations"));
    }
}
