//! The matcher: a deterministic recursive-descent interpreter over clause
//! trees with per-rule memoization and seed-growing left recursion.

use cranelift_entity::PrimaryMap;
use ouro::{Clause, Grammar, RcString, RuleHandle, Span};

use crate::action::{self, ActionHost};
use crate::failure::{Expected, Failure, FailureTracker, ParseError};
use crate::memo::{MemoEntry, MemoTable};
use crate::tree::{Match, MatchHandle, MatchNode};

/// Why a clause did not match. `Recoverable` is ordinary PEG failure that a
/// surrounding choice may erase; `Committed` passed a cut and unwinds the
/// whole parse; `Defect` is a broken grammar surfacing mid-match.
enum Flaw {
    Recoverable,
    Committed,
    Defect(ParseError),
}

type ClauseResult = Result<MatchHandle, Flaw>;

struct Engine<'a> {
    grammar: &'a Grammar,
    input: &'a str,
    nodes: PrimaryMap<MatchHandle, MatchNode>,
    memo: MemoTable,
    failure: FailureTracker,
}

impl<'a> Engine<'a> {
    fn new(grammar: &'a Grammar, input: &'a str) -> Engine<'a> {
        Engine {
            grammar,
            input,
            nodes: PrimaryMap::new(),
            memo: MemoTable::new(grammar.len(), input.len()),
            failure: FailureTracker::new(),
        }
    }

    fn leaf(&mut self, start: u32, end: u32) -> MatchHandle {
        self.nodes.push(MatchNode {
            span: Span::new(start, end),
            children: Vec::new(),
            pick: 0,
        })
    }

    fn wrap(&mut self, span: Span, children: Vec<MatchHandle>, pick: u32) -> MatchHandle {
        self.nodes.push(MatchNode {
            span,
            children,
            pick,
        })
    }

    fn end(&self, handle: MatchHandle) -> u32 {
        self.nodes[handle].span.end()
    }

    fn fail(&mut self, at: u32, expected: Expected) -> Flaw {
        self.failure.record(at, expected);
        Flaw::Recoverable
    }

    fn clause_match(&mut self, clause: &'a Clause, at: u32) -> ClauseResult {
        match clause {
            Clause::Empty => Ok(self.leaf(at, at)),
            Clause::Literal { text } => {
                if self.input[at as usize..].starts_with(&**text) {
                    Ok(self.leaf(at, at + text.len() as u32))
                } else {
                    Err(self.fail(at, Expected::Literal(text.clone())))
                }
            }
            Clause::Any { count } => {
                let mut end = at as usize;
                for _ in 0..*count {
                    match self.input[end..].chars().next() {
                        Some(c) => end += c.len_utf8(),
                        None => return Err(self.fail(at, Expected::Any)),
                    }
                }
                Ok(self.leaf(at, end as u32))
            }
            Clause::Range { lower, upper } => match self.input[at as usize..].chars().next() {
                Some(c) if *lower <= c && c <= *upper => {
                    Ok(self.leaf(at, at + c.len_utf8() as u32))
                }
                _ => Err(self.fail(at, Expected::Range(*lower, *upper))),
            },
            Clause::Reference { name, resolved } => match resolved {
                Some(handle) => self.rule_match(*handle, name, at),
                None => Err(Flaw::Defect(ParseError::UnknownRule { name: name.clone() })),
            },
            Clause::Sequence { children } => {
                let mut matched = Vec::with_capacity(children.len());
                let mut end = at;
                for child in children {
                    let m = self.clause_match(child, end)?;
                    end = self.end(m);
                    matched.push(m);
                }
                Ok(self.wrap(Span::new(at, end), matched, 0))
            }
            Clause::Choice { children } => {
                for (index, child) in children.iter().enumerate() {
                    match self.clause_match(child, at) {
                        Ok(m) => {
                            let span = self.nodes[m].span;
                            return Ok(self.wrap(span, vec![m], index as u32));
                        }
                        Err(Flaw::Recoverable) => continue,
                        Err(flaw) => return Err(flaw),
                    }
                }
                Err(Flaw::Recoverable)
            }
            Clause::Repeat { child } => {
                let mut matched = Vec::new();
                let mut end = at;
                loop {
                    match self.clause_match(child, end) {
                        Ok(m) => {
                            let advanced = self.end(m) > end;
                            end = self.end(m);
                            matched.push(m);
                            // a non-advancing body would repeat forever
                            if !advanced || end as usize == self.input.len() {
                                break;
                            }
                        }
                        Err(Flaw::Recoverable) => {
                            if matched.is_empty() {
                                return Err(Flaw::Recoverable);
                            }
                            break;
                        }
                        Err(flaw) => return Err(flaw),
                    }
                }
                Ok(self.wrap(Span::new(at, end), matched, 0))
            }
            Clause::Not { child } => {
                self.failure.mute();
                let probed = self.clause_match(child, at);
                self.failure.unmute();
                match probed {
                    Ok(_) => Err(self.fail(at, Expected::NotMatch)),
                    Err(Flaw::Recoverable) => Ok(self.leaf(at, at)),
                    Err(flaw) => Err(flaw),
                }
            }
            Clause::And { child } => {
                let m = self.clause_match(child, at)?;
                Ok(self.wrap(Span::at(at), vec![m], 0))
            }
            Clause::Commit { child } => match self.clause_match(child, at) {
                Ok(m) => {
                    let span = self.nodes[m].span;
                    Ok(self.wrap(span, vec![m], 0))
                }
                Err(Flaw::Recoverable) => {
                    self.failure.commit();
                    Err(Flaw::Committed)
                }
                Err(flaw) => Err(flaw),
            },
            Clause::Capture { child, .. } | Clause::Transform { child, .. } => {
                let m = self.clause_match(child, at)?;
                let span = self.nodes[m].span;
                Ok(self.wrap(span, vec![m], 0))
            }
        }
    }

    fn rule_match(&mut self, handle: RuleHandle, name: &RcString, at: u32) -> ClauseResult {
        match self.memo.get(handle, at) {
            MemoEntry::Done(Some((m, _))) | MemoEntry::Growing(Some((m, _))) => Ok(m),
            MemoEntry::Done(None) | MemoEntry::Growing(None) => {
                Err(self.fail(at, Expected::Rule(name.clone())))
            }
            MemoEntry::Vacant => {
                self.memo.set(handle, at, MemoEntry::Growing(None));
                let grammar = self.grammar;
                let clause = &grammar[handle].clause;

                let result = if grammar.left_recursive(handle) {
                    self.grow_seed(handle, clause, at)
                } else {
                    self.clause_match(clause, at)
                };

                match result {
                    Ok(m) => {
                        let end = self.end(m);
                        self.memo.set(handle, at, MemoEntry::Done(Some((m, end))));
                        Ok(m)
                    }
                    Err(Flaw::Recoverable) => {
                        self.memo.set(handle, at, MemoEntry::Done(None));
                        Err(self.fail(at, Expected::Rule(name.clone())))
                    }
                    // committed failures and defects unwind the whole parse;
                    // the stale Growing entry dies with it
                    Err(flaw) => Err(flaw),
                }
            }
        }
    }

    /// The left-recursion protocol: re-evaluate the rule body while its
    /// match keeps getting longer, publishing each improvement as the seed
    /// visible to recursive re-entries.
    fn grow_seed(&mut self, handle: RuleHandle, clause: &'a Clause, at: u32) -> ClauseResult {
        let mut seed: Option<(MatchHandle, u32)> = None;
        loop {
            match self.clause_match(clause, at) {
                Ok(m) => {
                    let end = self.end(m);
                    if seed.map_or(true, |(_, previous)| end > previous) {
                        seed = Some((m, end));
                        self.memo.set(handle, at, MemoEntry::Growing(seed));
                    } else {
                        break;
                    }
                }
                Err(Flaw::Recoverable) => break,
                Err(flaw) => return Err(flaw),
            }
        }
        match seed {
            Some((m, _)) => Ok(m),
            None => Err(Flaw::Recoverable),
        }
    }
}

/// A grammar bound to an action host, ready to run against input.
pub struct Parser<'g, H: ActionHost> {
    grammar: &'g Grammar,
    host: H,
}

impl<'g, H: ActionHost> Parser<'g, H> {
    pub fn new(grammar: &'g Grammar, host: H) -> Parser<'g, H> {
        Parser { grammar, host }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Match the entire input against the entry rule, without running
    /// actions.
    pub fn match_input(&self, input: &str) -> Result<Match, ParseError> {
        assert!(
            input.len() <= u32::MAX as usize,
            "input exceeds the engine's 4 GiB position space"
        );
        let mut engine = Engine::new(self.grammar, input);
        let entry = self.grammar.entry();
        let name = self.grammar.entry_rule().name.clone();

        match engine.rule_match(entry, &name, 0) {
            Ok(m) => {
                let end = engine.end(m);
                if end as usize == input.len() {
                    Ok(Match::new(engine.nodes, m))
                } else if engine.failure.has_failure_past(end) {
                    Err(ParseError::MatchFailed(engine.failure.into_failure(input)))
                } else {
                    // the match itself was fine, the input just kept going
                    let same_spot = engine.failure.at() == end && !engine.failure.committed();
                    let failure = if same_spot {
                        engine.failure.record(end, Expected::EndOfInput);
                        engine.failure.into_failure(input)
                    } else {
                        Failure::new(input, end, vec![Expected::EndOfInput], false)
                    };
                    Err(ParseError::MatchFailed(failure))
                }
            }
            Err(Flaw::Recoverable) => {
                Err(ParseError::MatchFailed(engine.failure.into_failure(input)))
            }
            Err(Flaw::Committed) => Err(ParseError::CommittedFailure(
                engine.failure.into_failure(input),
            )),
            Err(Flaw::Defect(error)) => Err(error),
        }
    }

    /// Match the input and evaluate actions bottom-up over the result.
    pub fn parse(&self, input: &str) -> Result<(Match, H::Value), ParseError> {
        let tree = self.match_input(input)?;
        let value = action::evaluate(self.grammar, input, &tree, &self.host)?;
        Ok((tree, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionError, Outcome, Scope};
    use ouro::clause::Action;
    use ouro::Clause;

    /// A host for exercising the engine: actions `tag:<label>` wrap their
    /// scope into `label(binding=value, ...)`, `discard` drops the match.
    struct TestHost;

    impl ActionHost for TestHost {
        type Value = String;

        fn literal(&self, text: &str) -> Result<String, ActionError> {
            Ok(text.to_string())
        }

        fn collect(&self, items: Vec<String>) -> Result<String, ActionError> {
            Ok(format!("[{}]", items.join(", ")))
        }

        fn call(
            &self,
            action: &Action,
            scope: &Scope<'_, String>,
        ) -> Result<Outcome<String>, ActionError> {
            let body = action.body().trim();
            if body == "discard" {
                return Ok(Outcome::Discard);
            }
            if body == "fail" {
                return Err(ActionError::new("host rejected the action"));
            }
            if let Some(label) = body.strip_prefix("tag:") {
                let bindings: Vec<String> = scope
                    .bindings()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                return Ok(Outcome::Value(format!("{label}({})", bindings.join(", "))));
            }
            Err(ActionError::new(format!("unknown action `{body}`")))
        }
    }

    fn grammar(rules: Vec<(&str, Clause)>) -> Grammar {
        Grammar::build(rules.into_iter().map(|(name, clause)| (name.into(), clause))).unwrap()
    }

    #[test]
    fn test_literal_sequence() {
        let g = grammar(vec![(
            "top",
            Clause::sequence(vec![Clause::literal("ab"), Clause::literal("c")]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let tree = parser.match_input("abc").unwrap();
        assert_eq!((tree.span().start(), tree.span().end()), (0, 3));

        let error = parser.match_input("abx").unwrap_err();
        match error {
            ParseError::MatchFailed(failure) => {
                assert_eq!(failure.at, 2);
                assert_eq!(failure.expected, vec![Expected::Literal("c".into())]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_choice_takes_first_match() {
        // "a" wins even though "ab" would consume more; the leftover input
        // then fails the parse
        let g = grammar(vec![(
            "top",
            Clause::choice(vec![Clause::literal("a"), Clause::literal("ab")]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let error = parser.match_input("ab").unwrap_err();
        match error {
            ParseError::MatchFailed(failure) => {
                assert_eq!(failure.at, 1);
                assert_eq!(failure.expected, vec![Expected::EndOfInput]);
                assert!(!failure.committed);
            }
            other => panic!("unexpected error {other:?}"),
        }

        let tree = parser.match_input("a").unwrap();
        assert_eq!(tree[tree.root()].pick, 0);
    }

    #[test]
    fn test_left_recursion_spans_whole_input() {
        // as <- as as / "a"
        let g = grammar(vec![(
            "as",
            Clause::choice(vec![
                Clause::sequence(vec![Clause::reference("as"), Clause::reference("as")]),
                Clause::literal("a"),
            ]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let tree = parser.match_input("aaaa").unwrap();
        assert_eq!((tree.span().start(), tree.span().end()), (0, 4));
        // the grown result picked the recursive alternative
        let root = &tree[tree.root()];
        assert_eq!(root.pick, 0);
        assert_eq!(tree[root.children[0]].children.len(), 2);

        assert!(parser.match_input("").is_err());
        assert!(parser.match_input("ab").is_err());
    }

    #[test]
    fn test_left_recursive_count() {
        // digits <- digits [0-9] / [0-9]; classic left-associative spine
        let g = grammar(vec![(
            "digits",
            Clause::choice(vec![
                Clause::sequence(vec![Clause::reference("digits"), Clause::range('0', '9')]),
                Clause::range('0', '9'),
            ]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let tree = parser.match_input("12345").unwrap();
        assert_eq!(tree.span().end(), 5);
        // the spine leans left: the recursive child covers all but the last
        // digit
        let root = &tree[tree.root()];
        let seq = &tree[root.children[0]];
        assert_eq!(seq.children.len(), 2);
        assert_eq!(tree[seq.children[0]].span.end(), 4);
    }

    #[test]
    fn test_commit_aborts_other_alternatives() {
        // r <- "(" ~ e ")" / e ; e <- [a-z]
        let g = grammar(vec![
            (
                "r",
                Clause::choice(vec![
                    Clause::sequence(vec![
                        Clause::literal("("),
                        Clause::commit(Clause::sequence(vec![
                            Clause::reference("e"),
                            Clause::literal(")"),
                        ])),
                    ]),
                    Clause::reference("e"),
                ]),
            ),
            ("e", Clause::range('a', 'z')),
        ]);
        let parser = Parser::new(&g, TestHost);

        parser.match_input("(x)").unwrap();
        parser.match_input("x").unwrap();

        let error = parser.match_input("(x").unwrap_err();
        match error {
            ParseError::CommittedFailure(failure) => {
                assert!(failure.committed);
                assert_eq!(failure.at, 2);
                assert_eq!(failure.expected, vec![Expected::Literal(")".into())]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_commit_failure_position() {
        // p <- "(" ~ [a-z]+ ")" on "(1)" fails committed at 1
        let g = grammar(vec![(
            "p",
            Clause::sequence(vec![
                Clause::literal("("),
                Clause::commit(Clause::sequence(vec![
                    Clause::repeat(Clause::range('a', 'z')),
                    Clause::literal(")"),
                ])),
            ]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let error = parser.match_input("(1)").unwrap_err();
        match error {
            ParseError::CommittedFailure(failure) => {
                assert_eq!(failure.at, 1);
                assert_eq!(failure.expected, vec![Expected::Range('a', 'z')]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_repeat_with_nullable_body_terminates() {
        let g = grammar(vec![(
            "top",
            Clause::repeat(Clause::maybe(Clause::literal("a"))),
        )]);
        let parser = Parser::new(&g, TestHost);

        let tree = parser.match_input("aaa").unwrap();
        assert_eq!(tree.span().end(), 3);

        let tree = parser.match_input("").unwrap();
        assert_eq!(tree.span().end(), 0);
        // exactly one non-advancing iteration
        assert_eq!(tree[tree.root()].children.len(), 1);
    }

    #[test]
    fn test_predicates_are_zero_width() {
        // top <- &"ab" "a" !"c" "b"
        let g = grammar(vec![(
            "top",
            Clause::sequence(vec![
                Clause::and(Clause::literal("ab")),
                Clause::literal("a"),
                Clause::not(Clause::literal("c")),
                Clause::literal("b"),
            ]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let tree = parser.match_input("ab").unwrap();
        assert_eq!(tree.span().end(), 2);
        let root = &tree[tree.root()];
        // the negative lookahead left no children behind
        assert!(tree[root.children[2]].children.is_empty());

        assert!(parser.match_input("ac").is_err());
    }

    #[test]
    fn test_not_probe_does_not_pollute_diagnostics() {
        // top <- !"xy" ..; failing on "ab" must not blame "xy"
        let g = grammar(vec![(
            "top",
            Clause::sequence(vec![
                Clause::not(Clause::literal("xy")),
                Clause::any(2),
                Clause::literal("!"),
            ]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let error = parser.match_input("ab").unwrap_err();
        match error {
            ParseError::MatchFailed(failure) => {
                assert_eq!(failure.at, 2);
                assert_eq!(failure.expected, vec![Expected::Literal("!".into())]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_expected_set_collects_alternatives() {
        let g = grammar(vec![(
            "top",
            Clause::choice(vec![
                Clause::literal("left"),
                Clause::literal("right"),
                Clause::range('0', '9'),
            ]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let error = parser.match_input("?").unwrap_err();
        match error {
            ParseError::MatchFailed(failure) => {
                assert_eq!(failure.at, 0);
                assert_eq!(
                    failure.expected,
                    vec![
                        Expected::Literal("left".into()),
                        Expected::Literal("right".into()),
                        Expected::Range('0', '9'),
                        Expected::Rule("top".into()),
                    ]
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_capture_binds_the_input_slice() {
        // top <- word=[a-z]+ { tag:word }
        let g = grammar(vec![(
            "top",
            Clause::transform(
                Clause::capture("word", Clause::repeat(Clause::range('a', 'z')), false),
                Action::new("tag:got"),
            ),
        )]);
        let parser = Parser::new(&g, TestHost);

        let (_, value) = parser.parse("hello").unwrap();
        assert_eq!(value, "got(word=hello)");
    }

    #[test]
    fn test_variadic_capture_collects_in_order() {
        // item <- [a-z] { tag:item } ; top <- *items=item+ { tag:all }
        let g = grammar(vec![
            (
                "top",
                Clause::transform(
                    Clause::capture("items", Clause::repeat(Clause::reference("item")), true),
                    Action::new("tag:all"),
                ),
            ),
            (
                "item",
                Clause::transform(Clause::range('a', 'z'), Action::new("tag:item")),
            ),
        ]);
        let parser = Parser::new(&g, TestHost);

        let (_, value) = parser.parse("ab").unwrap();
        assert_eq!(value, "all(items=[item(), item()])");
    }

    #[test]
    fn test_capture_arity_rejects_two_values() {
        let item = Clause::transform(Clause::range('a', 'z'), Action::new("tag:item"));
        let g = grammar(vec![(
            "top",
            Clause::transform(
                Clause::capture(
                    "pair",
                    Clause::sequence(vec![item.clone(), item]),
                    false,
                ),
                Action::new("tag:top"),
            ),
        )]);
        let parser = Parser::new(&g, TestHost);

        match parser.parse("ab").unwrap_err() {
            ParseError::CaptureArity { name, count, .. } => {
                assert_eq!(&*name, "pair");
                assert_eq!(count, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_discard_drops_the_value() {
        // ws <- " "+ { discard } ; word <- [a-z]+ { tag:word }
        let g = grammar(vec![
            (
                "top",
                Clause::sequence(vec![
                    Clause::reference("ws"),
                    Clause::reference("word"),
                    Clause::reference("ws"),
                ]),
            ),
            (
                "ws",
                Clause::transform(Clause::repeat(Clause::literal(" ")), Action::new("discard")),
            ),
            (
                "word",
                Clause::transform(
                    Clause::capture("w", Clause::repeat(Clause::range('a', 'z')), false),
                    Action::new("tag:word"),
                ),
            ),
        ]);
        let parser = Parser::new(&g, TestHost);

        let (_, value) = parser.parse("  hi ").unwrap();
        assert_eq!(value, "word(w=hi)");
    }

    #[test]
    fn test_captures_inside_lookahead_stay_visible() {
        // top <- &(first=[a-z]) rest=[a-z]+ { tag:both }
        let g = grammar(vec![(
            "top",
            Clause::transform(
                Clause::sequence(vec![
                    Clause::and(Clause::capture("first", Clause::range('a', 'z'), false)),
                    Clause::capture("rest", Clause::repeat(Clause::range('a', 'z')), false),
                ]),
                Action::new("tag:both"),
            ),
        )]);
        let parser = Parser::new(&g, TestHost);

        let (_, value) = parser.parse("abc").unwrap();
        assert_eq!(value, "both(first=a, rest=abc)");
    }

    #[test]
    fn test_action_errors_surface() {
        let g = grammar(vec![(
            "top",
            Clause::transform(Clause::literal("x"), Action::new("fail")),
        )]);
        let parser = Parser::new(&g, TestHost);

        match parser.parse("x").unwrap_err() {
            ParseError::Action { reason, .. } => {
                assert_eq!(reason, "host rejected the action");
            }
            other => panic!("unexpected error {other:?}"),
        }
        // actions never run when the match fails
        assert!(matches!(
            parser.parse("y").unwrap_err(),
            ParseError::MatchFailed(_)
        ));
    }

    #[test]
    fn test_determinism() {
        let g = grammar(vec![(
            "as",
            Clause::choice(vec![
                Clause::sequence(vec![Clause::reference("as"), Clause::reference("as")]),
                Clause::literal("a"),
            ]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let (first_tree, first) = parser.parse("aaaaaa").unwrap();
        let (second_tree, second) = parser.parse("aaaaaa").unwrap();
        assert_eq!(first, second);
        assert_eq!(first_tree.span(), second_tree.span());

        let first_err = parser.match_input("aab ").unwrap_err();
        let second_err = parser.match_input("aab ").unwrap_err();
        assert_eq!(first_err, second_err);
    }

    #[test]
    fn test_unicode_positions() {
        let g = grammar(vec![(
            "top",
            Clause::sequence(vec![
                Clause::any(1),
                Clause::range('α', 'ω'),
                Clause::literal("x"),
            ]),
        )]);
        let parser = Parser::new(&g, TestHost);

        let tree = parser.match_input("äβx").unwrap();
        assert_eq!(tree.span().end() as usize, "äβx".len());
    }
}
