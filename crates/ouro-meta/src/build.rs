//! The grammar-building action host.
//!
//! Meta-grammar actions construct clause IR: `Seq(head, tail)`,
//! `Rule(name, body)`, `Grammar(rules)`. This host gives those recipe names
//! their meaning and carries the intermediate values around as [`Term`]s.

use ouro::clause::Action;
use ouro::{Clause, Grammar, RcString};
use ouro_runtime::{ActionError, ActionHost, Outcome, Scope};

use crate::recipe::{self, Recipe};

/// A value flowing through meta-grammar actions.
#[derive(Clone, Debug)]
pub enum Term {
    Text(RcString),
    Flag(bool),
    Number(u32),
    Clause(Clause),
    Rule { name: RcString, clause: Clause },
    List(Vec<Term>),
    Grammar(Grammar),
}

impl Term {
    fn kind(&self) -> &'static str {
        match self {
            Term::Text(_) => "text",
            Term::Flag(_) => "flag",
            Term::Number(_) => "number",
            Term::Clause(_) => "clause",
            Term::Rule { .. } => "rule",
            Term::List(_) => "list",
            Term::Grammar(_) => "grammar",
        }
    }
}

/// Evaluates recipe actions into [`Term`]s; raw slices become text.
pub struct GrammarHost;

impl ActionHost for GrammarHost {
    type Value = Term;

    fn literal(&self, text: &str) -> Result<Term, ActionError> {
        Ok(Term::Text(text.into()))
    }

    fn collect(&self, items: Vec<Term>) -> Result<Term, ActionError> {
        Ok(Term::List(items))
    }

    fn call(
        &self,
        action: &Action,
        scope: &Scope<'_, Term>,
    ) -> Result<Outcome<Term>, ActionError> {
        let recipe = recipe::parse(action.body())
            .map_err(|error| ActionError::new(error.to_string()))?;
        if let Recipe::Call { name, args } = &recipe {
            if &**name == "discard" && args.is_empty() {
                return Ok(Outcome::Discard);
            }
        }
        evaluate(&recipe, scope).map(Outcome::Value)
    }
}

fn evaluate(recipe: &Recipe, scope: &Scope<'_, Term>) -> Result<Term, ActionError> {
    match recipe {
        Recipe::Binding(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| ActionError::new(format!("unbound capture `{name}`"))),
        Recipe::Slice => Ok(Term::Text(scope.text().into())),
        Recipe::Text(text) => Ok(Term::Text(text.clone())),
        Recipe::Flag(flag) => Ok(Term::Flag(*flag)),
        Recipe::Number(number) => Ok(Term::Number(*number)),
        Recipe::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            construct(name, args)
        }
    }
}

fn mismatch(name: &str, term: &Term) -> ActionError {
    ActionError::new(format!("`{name}` cannot take a {} argument", term.kind()))
}

fn arity(name: &str, expected: &str) -> ActionError {
    ActionError::new(format!("`{name}` takes {expected}"))
}

fn clause_arg(name: &str, term: Term) -> Result<Clause, ActionError> {
    match term {
        Term::Clause(clause) => Ok(clause),
        other => Err(mismatch(name, &other)),
    }
}

fn text_arg(name: &str, term: Term) -> Result<RcString, ActionError> {
    match term {
        Term::Text(text) => Ok(text),
        other => Err(mismatch(name, &other)),
    }
}

/// Clause arguments, with lists (from variadic captures) flattened in.
fn clause_list(name: &str, args: Vec<Term>) -> Result<Vec<Clause>, ActionError> {
    let mut clauses = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Term::Clause(clause) => clauses.push(clause),
            Term::List(items) => clauses.extend(clause_list(name, items)?),
            other => return Err(mismatch(name, &other)),
        }
    }
    if clauses.is_empty() {
        return Err(arity(name, "at least one clause"));
    }
    Ok(clauses)
}

fn rule_list(args: Vec<Term>, out: &mut Vec<(RcString, Clause)>) -> Result<(), ActionError> {
    for arg in args {
        match arg {
            Term::Rule { name, clause } => out.push((name, clause)),
            Term::List(items) => rule_list(items, out)?,
            other => return Err(mismatch("Grammar", &other)),
        }
    }
    Ok(())
}

fn char_arg(name: &str, text: &RcString) -> Result<char, ActionError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ActionError::new(format!(
            "`{name}` bounds must be single characters, got {text:?}"
        ))),
    }
}

fn one<T>(name: &str, args: Vec<T>) -> Result<T, ActionError> {
    let mut args = args;
    if args.len() != 1 {
        return Err(arity(name, "exactly one argument"));
    }
    Ok(args.pop().unwrap())
}

fn two<T>(name: &str, args: Vec<T>) -> Result<(T, T), ActionError> {
    let mut args = args;
    if args.len() != 2 {
        return Err(arity(name, "exactly two arguments"));
    }
    let second = args.pop().unwrap();
    let first = args.pop().unwrap();
    Ok((first, second))
}

fn construct(name: &str, mut args: Vec<Term>) -> Result<Term, ActionError> {
    let term = match name {
        "Empty" => {
            if !args.is_empty() {
                return Err(arity(name, "no arguments"));
            }
            Term::Clause(Clause::Empty)
        }
        "Any" => match one(name, args)? {
            Term::Number(count) if count > 0 => Term::Clause(Clause::any(count)),
            other => return Err(mismatch(name, &other)),
        },
        "Literal" => {
            let text = text_arg(name, one(name, args)?)?;
            Term::Clause(Clause::literal(text))
        }
        "Range" => {
            let (lower, upper) = two(name, args)?;
            let lower = text_arg(name, lower)?;
            let upper = text_arg(name, upper)?;
            Term::Clause(Clause::range(
                char_arg(name, &lower)?,
                char_arg(name, &upper)?,
            ))
        }
        "Ref" => Term::Clause(Clause::reference(text_arg(name, one(name, args)?)?)),
        "Seq" => Term::Clause(Clause::sequence(clause_list(name, args)?)),
        "Choice" => Term::Clause(Clause::choice(clause_list(name, args)?)),
        "Repeat" => Term::Clause(Clause::repeat(clause_arg(name, one(name, args)?)?)),
        "Maybe" => Term::Clause(Clause::maybe(clause_arg(name, one(name, args)?)?)),
        "Not" => Term::Clause(Clause::not(clause_arg(name, one(name, args)?)?)),
        "And" => Term::Clause(Clause::and(clause_arg(name, one(name, args)?)?)),
        "Commit" => Term::Clause(Clause::commit(clause_arg(name, one(name, args)?)?)),
        "Delimited" => {
            let (open, close) = two(name, args)?;
            let open = clause_arg(name, open)?;
            let close = clause_arg(name, close)?;
            let skip = Clause::repeat0(Clause::sequence(vec![
                Clause::not(close.clone()),
                Clause::any(1),
            ]));
            Term::Clause(Clause::sequence(vec![open, skip, Clause::commit(close)]))
        }
        "Capture" => {
            if args.len() != 3 {
                return Err(arity(name, "name, clause, and a variadic flag"));
            }
            let variadic = match args.pop().unwrap() {
                Term::Flag(flag) => flag,
                other => return Err(mismatch(name, &other)),
            };
            let clause = clause_arg(name, args.pop().unwrap())?;
            let capture_name = text_arg(name, args.pop().unwrap())?;
            Term::Clause(Clause::capture(capture_name, clause, variadic))
        }
        "Action" => {
            let (clause, body) = two(name, args)?;
            let clause = clause_arg(name, clause)?;
            let body = text_arg(name, body)?;
            Term::Clause(Clause::transform(clause, Action::new(body)))
        }
        "Rule" => {
            let (rule_name, clause) = two(name, args)?;
            Term::Rule {
                name: text_arg(name, rule_name)?,
                clause: clause_arg(name, clause)?,
            }
        }
        "Grammar" => {
            let mut rules = Vec::new();
            rule_list(args, &mut rules)?;
            let grammar = Grammar::build(rules)
                .map_err(|errors| ActionError::new(errors.to_string()))?;
            Term::Grammar(grammar)
        }
        "unquote" => Term::Text(unquote(&text_arg(name, one(name, args)?)?)?.into()),
        "unescape" => Term::Text(unescape(&text_arg(name, one(name, args)?)?)?.into()),
        other => return Err(ActionError::new(format!("unknown constructor `{other}`"))),
    };
    Ok(term)
}

/// Strip the surrounding quotes of a raw literal slice and resolve escapes.
pub fn unquote(raw: &str) -> Result<String, ActionError> {
    let bytes = raw.as_bytes();
    let quoted = bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0];
    if !quoted {
        return Err(ActionError::new(format!("not a quoted literal: {raw:?}")));
    }
    unescape(&raw[1..raw.len() - 1])
}

/// Resolve the escape sequences of the textual dialects: the named ones,
/// quote/bracket escapes, octal, and the two unicode forms.
pub fn unescape(text: &str) -> Result<String, ActionError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let rest = chars.as_str();
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('[') => out.push('['),
            Some(']') => out.push(']'),
            Some('-') => out.push('-'),
            Some('u') => out.push(unicode_escape(&mut chars, 4)?),
            Some('U') => out.push(unicode_escape(&mut chars, 8)?),
            Some('0'..='7') => {
                let digits = rest
                    .chars()
                    .take(3)
                    .take_while(|c| ('0'..='7').contains(c))
                    .count();
                let value = u32::from_str_radix(&rest[..digits], 8).unwrap();
                // resynchronize past the digits we just took
                chars = rest[digits..].chars();
                out.push(char::from_u32(value).ok_or_else(|| {
                    ActionError::new(format!("octal escape out of range: \\{}", &rest[..digits]))
                })?);
            }
            Some(other) => {
                return Err(ActionError::new(format!("unknown escape `\\{other}`")));
            }
            None => return Err(ActionError::new("dangling backslash")),
        }
    }
    Ok(out)
}

fn unicode_escape(chars: &mut std::str::Chars, width: usize) -> Result<char, ActionError> {
    let rest = chars.as_str();
    if rest.len() < width || !rest.is_char_boundary(width) {
        return Err(ActionError::new("truncated unicode escape"));
    }
    let digits = &rest[..width];
    let value = u32::from_str_radix(digits, 16)
        .map_err(|_| ActionError::new(format!("bad unicode escape `\\u{digits}`")))?;
    *chars = rest[width..].chars();
    char::from_u32(value).ok_or_else(|| {
        ActionError::new(format!("unicode escape out of range: `\\u{digits}`"))
    })
}
