//! Canonical-dialect rendering of clauses and grammars.
//!
//! The output is `name <- expr` text that the canonical meta-parser reads
//! back into a structurally equal grammar; the bootstrap tests rely on that
//! round trip.

use std::fmt::Write;

use crate::clause::Clause;
use crate::grammar::Grammar;

// Binding strength of each rendered form, loosest first. A child whose form
// binds looser than its position requires gets parenthesized.
const PREC_CHOICE: u8 = 0;
const PREC_TRANSFORM: u8 = 1;
const PREC_SEQUENCE: u8 = 2;
const PREC_PREFIX: u8 = 3;
const PREC_SUFFIX: u8 = 4;
const PREC_PRIMARY: u8 = 5;

/// How a `Choice` renders: the desugared forms `e?`/`e*` and character
/// classes are printed back as their surface sugar.
enum ChoiceForm<'a> {
    Maybe(&'a Clause),
    Star(&'a Clause),
    Class(&'a [Clause]),
    Plain,
}

fn class_member(clause: &Clause) -> bool {
    match clause {
        Clause::Range { .. } => true,
        Clause::Literal { text } => text.chars().count() == 1,
        _ => false,
    }
}

fn classify_choice(children: &[Clause]) -> ChoiceForm<'_> {
    if let [child, Clause::Empty] = children {
        if let Clause::Repeat { child } = child {
            return ChoiceForm::Star(&**child);
        }
        return ChoiceForm::Maybe(child);
    }
    if children.len() >= 2 && children.iter().all(class_member) {
        return ChoiceForm::Class(children);
    }
    ChoiceForm::Plain
}

fn precedence(clause: &Clause) -> u8 {
    match clause {
        Clause::Choice { children } => match classify_choice(children) {
            ChoiceForm::Maybe(_) | ChoiceForm::Star(_) => PREC_SUFFIX,
            ChoiceForm::Class(_) => PREC_PRIMARY,
            ChoiceForm::Plain => PREC_CHOICE,
        },
        Clause::Transform { .. } => PREC_TRANSFORM,
        Clause::Sequence { .. } | Clause::Commit { .. } => PREC_SEQUENCE,
        Clause::Not { .. } | Clause::And { .. } | Clause::Capture { .. } => PREC_PREFIX,
        Clause::Repeat { .. } => PREC_SUFFIX,
        Clause::Empty
        | Clause::Any { .. }
        | Clause::Literal { .. }
        | Clause::Range { .. }
        | Clause::Reference { .. } => PREC_PRIMARY,
    }
}

fn push_literal_char(buf: &mut String, c: char) {
    match c {
        '\\' => buf.push_str("\\\\"),
        '\'' => buf.push_str("\\'"),
        '\n' => buf.push_str("\\n"),
        '\r' => buf.push_str("\\r"),
        '\t' => buf.push_str("\\t"),
        c if (c as u32) < 0x20 || c == '\u{7f}' => {
            let _ = write!(buf, "\\u{:04x}", c as u32);
        }
        c => buf.push(c),
    }
}

fn push_class_char(buf: &mut String, c: char) {
    match c {
        '\\' => buf.push_str("\\\\"),
        ']' => buf.push_str("\\]"),
        '-' => buf.push_str("\\-"),
        '\n' => buf.push_str("\\n"),
        '\r' => buf.push_str("\\r"),
        '\t' => buf.push_str("\\t"),
        c if (c as u32) < 0x20 || c == '\u{7f}' => {
            let _ = write!(buf, "\\u{:04x}", c as u32);
        }
        c => buf.push(c),
    }
}

fn push_class_item(buf: &mut String, clause: &Clause) {
    match clause {
        Clause::Range { lower, upper } => {
            push_class_char(buf, *lower);
            buf.push('-');
            push_class_char(buf, *upper);
        }
        Clause::Literal { text } => {
            for c in text.chars() {
                push_class_char(buf, c);
            }
        }
        _ => unreachable!("classified as class member"),
    }
}

fn push_clause(buf: &mut String, clause: &Clause, min: u8) {
    if precedence(clause) < min {
        buf.push('(');
        push_clause(buf, clause, PREC_CHOICE);
        buf.push(')');
        return;
    }

    match clause {
        Clause::Empty => buf.push_str("''"),
        Clause::Any { count } => {
            for _ in 0..*count {
                buf.push('.');
            }
        }
        Clause::Literal { text } => {
            buf.push('\'');
            for c in text.chars() {
                push_literal_char(buf, c);
            }
            buf.push('\'');
        }
        Clause::Range { lower, upper } => {
            buf.push('[');
            push_class_char(buf, *lower);
            buf.push('-');
            push_class_char(buf, *upper);
            buf.push(']');
        }
        Clause::Reference { name, .. } => buf.push_str(name),
        Clause::Sequence { children } => {
            for (index, child) in children.iter().enumerate() {
                if index > 0 {
                    buf.push(' ');
                }
                // the cut form `a ~ b c` is a trailing Commit over the rest
                // of the sequence
                if index == children.len() - 1 {
                    if let Clause::Commit { child } = child {
                        buf.push_str("~ ");
                        push_clause(buf, child, PREC_SEQUENCE);
                        continue;
                    }
                }
                push_clause(buf, child, PREC_PREFIX);
            }
        }
        Clause::Choice { children } => match classify_choice(children) {
            ChoiceForm::Maybe(child) => {
                push_clause(buf, child, PREC_PRIMARY);
                buf.push('?');
            }
            ChoiceForm::Star(child) => {
                push_clause(buf, child, PREC_PRIMARY);
                buf.push('*');
            }
            ChoiceForm::Class(items) => {
                buf.push('[');
                for item in items {
                    push_class_item(buf, item);
                }
                buf.push(']');
            }
            ChoiceForm::Plain => {
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        buf.push_str(" / ");
                    }
                    push_clause(buf, child, PREC_TRANSFORM);
                }
            }
        },
        Clause::Repeat { child } => {
            push_clause(buf, child, PREC_PRIMARY);
            buf.push('+');
        }
        Clause::Not { child } => {
            buf.push('!');
            push_clause(buf, child, PREC_PREFIX);
        }
        Clause::And { child } => {
            buf.push('&');
            push_clause(buf, child, PREC_PREFIX);
        }
        Clause::Commit { child } => {
            buf.push_str("~ ");
            push_clause(buf, child, PREC_SEQUENCE);
        }
        Clause::Capture {
            child,
            name,
            variadic,
        } => {
            if *variadic {
                buf.push('*');
            }
            buf.push_str(name);
            buf.push('=');
            push_clause(buf, child, PREC_SUFFIX);
        }
        Clause::Transform { child, action } => {
            push_clause(buf, child, PREC_SEQUENCE);
            buf.push_str(" {");
            buf.push_str(action.body());
            buf.push('}');
        }
    }
}

pub fn render_clause(clause: &Clause) -> String {
    let mut buf = String::new();
    push_clause(&mut buf, clause, PREC_CHOICE);
    buf
}

pub fn render_grammar(grammar: &Grammar) -> String {
    let mut buf = String::new();
    for (_, rule) in grammar.iter() {
        buf.push_str(&rule.name);
        buf.push_str(" <- ");
        push_clause(&mut buf, &rule.clause, PREC_CHOICE);
        buf.push('\n');
    }
    buf
}

impl Grammar {
    /// The canonical-dialect text of the whole grammar.
    pub fn render(&self) -> String {
        render_grammar(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Action;

    #[test]
    fn test_primary_forms() {
        assert_eq!(render_clause(&Clause::Empty), "''");
        assert_eq!(render_clause(&Clause::any(2)), "..");
        assert_eq!(render_clause(&Clause::literal("a b")), "'a b'");
        assert_eq!(render_clause(&Clause::literal("x\n")), "'x\\n'");
        assert_eq!(render_clause(&Clause::literal("it's")), "'it\\'s'");
        assert_eq!(render_clause(&Clause::range('a', 'z')), "[a-z]");
        assert_eq!(render_clause(&Clause::reference("item")), "item");
    }

    #[test]
    fn test_precedence_parens() {
        let seq = Clause::sequence(vec![Clause::literal("a"), Clause::literal("b")]);
        let choice = Clause::choice(vec![Clause::literal("a"), Clause::literal("bc")]);

        assert_eq!(render_clause(&Clause::repeat(seq.clone())), "('a' 'b')+");
        assert_eq!(render_clause(&Clause::not(choice.clone())), "!('a' / 'bc')");
        assert_eq!(
            render_clause(&Clause::sequence(vec![choice.clone(), Clause::literal("d")])),
            "('a' / 'bc') 'd'"
        );
        assert_eq!(
            render_clause(&Clause::not(Clause::repeat(Clause::literal("a")))),
            "!'a'+"
        );
    }

    #[test]
    fn test_sugar_forms() {
        assert_eq!(render_clause(&Clause::maybe(Clause::literal("a"))), "'a'?");
        assert_eq!(
            render_clause(&Clause::repeat0(Clause::literal("a"))),
            "'a'*"
        );
        let class = Clause::choice(vec![
            Clause::range('a', 'z'),
            Clause::range('A', 'Z'),
            Clause::literal("_"),
        ]);
        assert_eq!(render_clause(&class), "[a-zA-Z_]");
    }

    #[test]
    fn test_cut_in_sequence() {
        let clause = Clause::sequence(vec![
            Clause::literal("("),
            Clause::commit(Clause::sequence(vec![
                Clause::reference("expr"),
                Clause::literal(")"),
            ])),
        ]);
        assert_eq!(render_clause(&clause), "'(' ~ expr ')'");
    }

    #[test]
    fn test_capture_and_transform() {
        let clause = Clause::transform(
            Clause::sequence(vec![
                Clause::capture("lhs", Clause::reference("expr"), false),
                Clause::literal("+"),
                Clause::capture("rhs", Clause::reference("term"), true),
            ]),
            Action::new(" add(lhs, rhs) "),
        );
        assert_eq!(
            render_clause(&clause),
            "lhs=expr '+' *rhs=term { add(lhs, rhs) }"
        );
    }
}
