use std::fmt::Display;

use ouro::{RcString, Span};

/// What the engine was looking for at a failure position.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Expected {
    Literal(RcString),
    Range(char, char),
    Any,
    Rule(RcString),
    /// A negative lookahead matched where it must not.
    NotMatch,
    EndOfInput,
}

impl Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Literal(text) => write!(f, "{text:?}"),
            Expected::Range(lower, upper) => write!(f, "[{lower}-{upper}]"),
            Expected::Any => f.write_str("any input"),
            Expected::Rule(name) => write!(f, "{name}"),
            Expected::NotMatch => f.write_str("different input"),
            Expected::EndOfInput => f.write_str("end of input"),
        }
    }
}

/// The farthest-failure diagnostics of a parse that did not go through.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Failure {
    /// Byte offset of the farthest position reached.
    pub at: u32,
    /// 1-based line of `at`.
    pub line: u32,
    /// 1-based byte column of `at` within its line.
    pub column: u32,
    /// The clauses expected at `at`, in discovery order.
    pub expected: Vec<Expected>,
    /// Whether a commit made the failure final.
    pub committed: bool,
    /// The input line containing `at`.
    pub context: String,
}

impl Failure {
    pub(crate) fn new(input: &str, at: u32, expected: Vec<Expected>, committed: bool) -> Failure {
        let (line, column, context) = locate(input, at);
        Failure {
            at,
            line,
            column,
            expected,
            committed,
            context,
        }
    }
}

fn locate(input: &str, at: u32) -> (u32, u32, String) {
    let at = (at as usize).min(input.len());
    let before = &input[..at];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    let column = at - line_start + 1;
    let line_end = input[line_start..]
        .find('\n')
        .map_or(input.len(), |index| line_start + index);
    (
        line as u32,
        column as u32,
        input[line_start..line_end].to_string(),
    )
}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("expected ")?;
        if self.expected.is_empty() {
            f.write_str("nothing further")?;
        }
        for (index, expected) in self.expected.iter().enumerate() {
            if index > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{expected}")?;
        }
        writeln!(f, " at {}:{}", self.line, self.column)?;
        writeln!(f, "{}", self.context)?;
        for _ in 1..self.column {
            f.write_str(" ")?;
        }
        f.write_str("^")
    }
}

/// Everything that can go wrong between handing input to a grammar and
/// getting a value back. All variants are returned, never thrown.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ParseError {
    /// Some clause failed, or the match stopped before the end of input.
    MatchFailed(Failure),
    /// A commit was passed and a later clause failed; no alternatives were
    /// consulted.
    CommittedFailure(Failure),
    /// A reference survived grammar building unresolved.
    UnknownRule { name: RcString },
    /// A non-variadic capture produced more than one value.
    CaptureArity {
        name: RcString,
        span: Span,
        count: usize,
    },
    /// The action host rejected an action.
    Action { span: Span, reason: String },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MatchFailed(failure) => write!(f, "parse failed: {failure}"),
            ParseError::CommittedFailure(failure) => {
                write!(f, "parse failed after commit: {failure}")
            }
            ParseError::UnknownRule { name } => write!(f, "unknown rule `{name}`"),
            ParseError::CaptureArity { name, span, count } => write!(
                f,
                "capture `{name}` at {span} bound {count} values instead of one"
            ),
            ParseError::Action { span, reason } => {
                write!(f, "action failed at {span}: {reason}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Farthest-failure cursor.
///
/// Committed failures lock the tracker: a non-committed failure can never
/// displace one, whatever its position. Probes under a negative lookahead
/// mute recording entirely; only the `last` cells keep updating so that a
/// commit can still point at the failure it converted.
pub(crate) struct FailureTracker {
    at: u32,
    expected: Vec<Expected>,
    committed: bool,
    any: bool,
    last_at: u32,
    last: Option<Expected>,
    muted: u32,
}

impl FailureTracker {
    pub fn new() -> FailureTracker {
        FailureTracker {
            at: 0,
            expected: Vec::new(),
            committed: false,
            any: false,
            last_at: 0,
            last: None,
            muted: 0,
        }
    }

    pub fn mute(&mut self) {
        self.muted += 1;
    }

    pub fn unmute(&mut self) {
        debug_assert!(self.muted > 0);
        self.muted -= 1;
    }

    pub fn record(&mut self, at: u32, expected: Expected) {
        self.last_at = at;
        self.last = Some(expected.clone());

        if self.muted > 0 || self.committed {
            return;
        }
        if !self.any || at > self.at {
            self.at = at;
            self.expected.clear();
            self.expected.push(expected);
            self.any = true;
        } else if at == self.at && !self.expected.contains(&expected) {
            self.expected.push(expected);
        }
    }

    /// Lock onto the failure a commit just made final. The innermost commit
    /// wins; later conversions on the way out change nothing.
    pub fn commit(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;
        self.any = true;
        self.at = self.last_at;
        self.expected.clear();
        self.expected.extend(self.last.clone());
    }

    pub fn committed(&self) -> bool {
        self.committed
    }

    pub fn has_failure_past(&self, end: u32) -> bool {
        self.any && self.at > end
    }

    pub fn at(&self) -> u32 {
        self.at
    }

    pub fn into_failure(self, input: &str) -> Failure {
        Failure::new(input, self.at, self.expected, self.committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_farther_failure_wins() {
        let mut tracker = FailureTracker::new();
        tracker.record(3, Expected::Any);
        tracker.record(1, Expected::EndOfInput);
        tracker.record(3, Expected::Literal("x".into()));
        tracker.record(3, Expected::Any);

        let failure = tracker.into_failure("abcdef");
        assert_eq!(failure.at, 3);
        assert_eq!(
            failure.expected,
            vec![Expected::Any, Expected::Literal("x".into())]
        );
        assert!(!failure.committed);
    }

    #[test]
    fn test_commit_locks_the_tracker() {
        let mut tracker = FailureTracker::new();
        tracker.record(9, Expected::Any);
        tracker.record(3, Expected::Literal(")".into()));
        tracker.commit();
        tracker.record(12, Expected::Any);

        let failure = tracker.into_failure("line one\nline two\n");
        assert!(failure.committed);
        assert_eq!(failure.at, 3);
        assert_eq!(failure.expected, vec![Expected::Literal(")".into())]);
    }

    #[test]
    fn test_muted_probes_do_not_record() {
        let mut tracker = FailureTracker::new();
        tracker.mute();
        tracker.record(5, Expected::Any);
        tracker.unmute();
        tracker.record(2, Expected::EndOfInput);

        let failure = tracker.into_failure("abcdef");
        assert_eq!(failure.at, 2);
        assert_eq!(failure.expected, vec![Expected::EndOfInput]);
    }

    #[test]
    fn test_location_rendering() {
        let failure = Failure::new("first\nsecond\nthird", 9, vec![Expected::Any], false);
        assert_eq!((failure.line, failure.column), (2, 4));
        assert_eq!(failure.context, "second");
        let rendered = failure.to_string();
        assert!(rendered.contains("at 2:4"));
        assert!(rendered.ends_with("second\n   ^"));
    }
}
