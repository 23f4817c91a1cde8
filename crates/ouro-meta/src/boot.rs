//! The hand-built seed parser.
//!
//! This is `grammars/boot.bpeg` spelled out in clause constructors, rule for
//! rule: exactly the grammar that parsing that file produces. The bootstrap
//! starts here, and the structural-equality test between this grammar and
//! its own parse of `boot.bpeg` keeps the two in lockstep.

use ouro::clause::Action;
use ouro::{Clause, Grammar, GrammarErrors, RcString};

fn lit(text: &str) -> Clause {
    Clause::literal(text)
}

fn r(name: &str) -> Clause {
    Clause::reference(name)
}

fn cap(name: &str, clause: Clause) -> Clause {
    Clause::capture(name, clause, false)
}

fn vcap(name: &str, clause: Clause) -> Clause {
    Clause::capture(name, clause, true)
}

fn seq(children: Vec<Clause>) -> Clause {
    Clause::sequence(children)
}

fn alt(children: Vec<Clause>) -> Clause {
    Clause::choice(children)
}

fn plus(clause: Clause) -> Clause {
    Clause::repeat(clause)
}

fn star(clause: Clause) -> Clause {
    Clause::repeat0(clause)
}

fn opt(clause: Clause) -> Clause {
    Clause::maybe(clause)
}

fn not(clause: Clause) -> Clause {
    Clause::not(clause)
}

fn commit(clause: Clause) -> Clause {
    Clause::commit(clause)
}

fn any1() -> Clause {
    Clause::any(1)
}

/// `(!x .)`: any one item that is not `x`.
fn neg(clause: Clause) -> Clause {
    seq(vec![not(clause), any1()])
}

/// A case with an action; the body gets the surrounding spaces the textual
/// form `{ body }` captures.
fn act(clause: Clause, body: &str) -> Clause {
    Clause::transform(clause, Action::new(format!(" {body} ")))
}

/// A quoted literal with one delimiter: `q (!q .)* ~ q`.
fn quoted(quote: &str) -> Clause {
    seq(vec![
        lit(quote),
        star(neg(lit(quote))),
        commit(lit(quote)),
    ])
}

/// The seed grammar for the minimal bootstrap dialect.
pub fn seed() -> Result<Grammar, GrammarErrors> {
    let rules: Vec<(RcString, Clause)> = vec![
        (
            "top".into(),
            act(
                seq(vec![
                    vcap("rules", plus(alt(vec![r("rule"), r("end_line")]))),
                    not(any1()),
                ]),
                "Grammar(rules)",
            ),
        ),
        (
            "end_line".into(),
            seq(vec![
                r("spaces"),
                opt(r("comment")),
                alt(vec![lit("\n"), not(any1())]),
            ]),
        ),
        (
            "comment".into(),
            seq(vec![lit("#"), star(neg(lit("\n")))]),
        ),
        ("spaces".into(), star(lit(" "))),
        (
            "identifier".into(),
            plus(alt(vec![
                Clause::range('a', 'z'),
                Clause::range('A', 'Z'),
                lit("_"),
            ])),
        ),
        (
            "literal".into(),
            alt(vec![quoted("\""), quoted("'")]),
        ),
        (
            "action_body".into(),
            star(alt(vec![
                seq(vec![not(lit("{")), not(lit("}")), any1()]),
                seq(vec![lit("{"), r("action_body"), commit(lit("}"))]),
            ])),
        ),
        (
            "action".into(),
            act(
                seq(vec![
                    lit("{"),
                    cap("body", r("action_body")),
                    commit(lit("}")),
                ]),
                "body",
            ),
        ),
        (
            "rule_choice".into(),
            alt(vec![
                act(
                    seq(vec![
                        lit("| "),
                        cap("expr", r("expr")),
                        r("spaces"),
                        cap("act", r("action")),
                    ]),
                    "Action(expr, act)",
                ),
                seq(vec![lit("| "), r("expr")]),
            ]),
        ),
        (
            "rule_body".into(),
            alt(vec![
                act(
                    seq(vec![
                        cap("first", r("rule_body")),
                        lit("    "),
                        cap("case", r("rule_choice")),
                        r("end_line"),
                    ]),
                    "Choice(first, case)",
                ),
                seq(vec![lit("    "), r("rule_choice"), r("end_line")]),
            ]),
        ),
        (
            "rule".into(),
            act(
                seq(vec![
                    cap("name", r("identifier")),
                    lit(":"),
                    r("end_line"),
                    cap("body", r("rule_body")),
                ]),
                "Rule(name, body)",
            ),
        ),
        (
            "variadic".into(),
            alt(vec![
                act(lit("*"), "true"),
                act(Clause::Empty, "false"),
            ]),
        ),
        (
            "atom".into(),
            alt(vec![
                act(lit("\"\""), "Empty()"),
                act(lit("''"), "Empty()"),
                act(lit("."), "Any(1)"),
                act(lit("\\n"), "Literal(\"\\n\")"),
                act(
                    seq(vec![
                        cap("lower", r("literal")),
                        r("spaces"),
                        lit("-"),
                        r("spaces"),
                        commit(cap("upper", r("literal"))),
                    ]),
                    "Range(unquote(lower), unquote(upper))",
                ),
                act(cap("lit", r("literal")), "Literal(unquote(lit))"),
                act(cap("name", r("identifier")), "Ref(name)"),
            ]),
        ),
        (
            "prefix".into(),
            alt(vec![
                act(
                    seq(vec![lit("!"), commit(cap("expr", r("prefix")))]),
                    "Not(expr)",
                ),
                seq(vec![
                    lit("("),
                    r("spaces"),
                    commit(seq(vec![r("expr"), r("spaces"), lit(")")])),
                ]),
                act(
                    cap(
                        "expr",
                        seq(vec![
                            lit("["),
                            r("spaces"),
                            commit(seq(vec![r("expr"), r("spaces"), lit("]")])),
                        ]),
                    ),
                    "Maybe(expr)",
                ),
                r("atom"),
            ]),
        ),
        (
            "repeat".into(),
            alt(vec![
                act(seq(vec![cap("expr", r("prefix")), lit("+")]), "Repeat(expr)"),
                act(
                    seq(vec![cap("expr", r("prefix")), lit("*")]),
                    "Maybe(Repeat(expr))",
                ),
                r("prefix"),
            ]),
        ),
        (
            "capture".into(),
            alt(vec![
                act(
                    seq(vec![
                        cap("v", r("variadic")),
                        cap("name", r("identifier")),
                        lit("="),
                        commit(cap("expr", r("repeat"))),
                    ]),
                    "Capture(name, expr, v)",
                ),
                r("repeat"),
            ]),
        ),
        (
            "sequence".into(),
            alt(vec![
                act(
                    seq(vec![
                        cap("head", r("sequence")),
                        r("spaces"),
                        cap("tail", r("capture")),
                    ]),
                    "Seq(head, tail)",
                ),
                act(
                    seq(vec![
                        cap("head", r("sequence")),
                        r("spaces"),
                        lit("~"),
                        r("spaces"),
                        commit(cap("tail", r("sequence"))),
                    ]),
                    "Seq(head, Commit(tail))",
                ),
                act(
                    seq(vec![
                        lit("~"),
                        r("spaces"),
                        commit(cap("tail", r("sequence"))),
                    ]),
                    "Commit(tail)",
                ),
                r("capture"),
            ]),
        ),
        (
            "choice".into(),
            alt(vec![
                act(
                    seq(vec![
                        cap("first", r("choice")),
                        r("spaces"),
                        lit("|"),
                        r("spaces"),
                        commit(cap("other", r("sequence"))),
                    ]),
                    "Choice(first, other)",
                ),
                r("sequence"),
            ]),
        ),
        ("expr".into(), r("choice")),
    ];

    Grammar::build(rules)
}
