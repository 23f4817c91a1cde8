use std::cell::RefCell;
use std::fmt::Display;

use crate::clause::RcString;

/// A problem detected while wiring a grammar together.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GrammarDefect {
    /// Two rules share a name; the later one is rejected.
    DuplicateRule { name: RcString },
    /// A reference names a rule the grammar does not define.
    UnknownRule { name: RcString, rule: RcString },
    /// The grammar has no rules at all, so there is no entry point.
    MissingRules,
}

impl Display for GrammarDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarDefect::DuplicateRule { name } => {
                write!(f, "duplicate rule name `{name}`")
            }
            GrammarDefect::UnknownRule { name, rule } => {
                write!(f, "rule `{rule}` references unknown rule `{name}`")
            }
            GrammarDefect::MissingRules => f.write_str("grammar defines no rules"),
        }
    }
}

/// All defects found during a grammar build, reported together.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GrammarErrors {
    pub defects: Vec<GrammarDefect>,
}

impl Display for GrammarErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed grammar:")?;
        for defect in &self.defects {
            write!(f, "\n  {defect}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GrammarErrors {}

/// Collects defects from build passes that cannot early-return.
#[derive(Default)]
pub struct DefectAccumulator {
    defects: RefCell<Vec<GrammarDefect>>,
}

impl DefectAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&self, defect: GrammarDefect) {
        self.defects.borrow_mut().push(defect);
    }
    pub fn is_empty(&self) -> bool {
        self.defects.borrow().is_empty()
    }
    pub fn finish(self) -> Result<(), GrammarErrors> {
        let defects = self.defects.into_inner();
        if defects.is_empty() {
            Ok(())
        } else {
            Err(GrammarErrors { defects })
        }
    }
}
