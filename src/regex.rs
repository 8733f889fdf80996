// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use crate::dfa::NfaBuilder;
use crate::segments::{Seg, Segments};
use crate::StateId;

/// Syntax error in a regex, with the character position in the pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct RegexError {
    pub pos: usize,
    pub msg: String,
}

impl RegexError {
    fn new<T: Into<String>>(pos: usize, msg: T) -> Self {
        RegexError { pos, msg: msg.into() }
    }
}

impl Display for RegexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "regex syntax error at {}: {}", self.pos, self.msg)
    }
}

impl std::error::Error for RegexError {}

// ---------------------------------------------------------------------------------------------
// Expression references

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExprKind { Regex, Literal }

/// One definition behind a `{name}` reference.
#[derive(Clone, Debug)]
pub struct ExprDef {
    pub definition: String,
    pub kind: ExprKind,
    pub case_insensitive: bool,
}

/// Resolves `{name}` subexpression references. A reference the source doesn't know is
/// compiled as the literal name. Cyclic definitions are the host's responsibility.
pub trait ExpressionSource {
    fn lookup(&self, name: &str) -> Option<&[ExprDef]>;
}

/// Source with no expressions; every reference compiles as its literal name.
pub struct NoExpressions;

impl ExpressionSource for NoExpressions {
    fn lookup(&self, _name: &str) -> Option<&[ExprDef]> {
        None
    }
}

impl ExpressionSource for HashMap<String, Vec<ExprDef>> {
    fn lookup(&self, name: &str) -> Option<&[ExprDef]> {
        self.get(name).map(|defs| defs.as_slice())
    }
}

// ---------------------------------------------------------------------------------------------
// Compiler

/// Compiles `pattern` into NFA transitions through the builder, starting at the
/// builder's current state. Recognised: classes with ranges and `^`/`~` negation,
/// `.`, anchors (accepted, no-ops in this anchored lexer context), `|`, `*` `+` `?`,
/// `{m,n}` bounded repetition, groups, backslash escapes, a leading `(?i)` case
/// flag, and `{name}` references resolved against `source`.
pub fn add_regex<S: ExpressionSource + ?Sized>(cons: &mut NfaBuilder, pattern: &str, source: &S) -> Result<(), RegexError> {
    let mut chars = pattern.chars().collect::<Vec<_>>();
    if pattern.starts_with("(?i)") {
        cons.set_case_options(true, true);
        chars.drain(..4);
    }
    let mut compiler = RegexCompiler { chars, pos: 0, source };
    compiler.compile_alternation(cons)?;
    if compiler.pos < compiler.chars.len() {
        return Err(RegexError::new(compiler.pos, format!("unexpected '{}'", compiler.chars[compiler.pos])));
    }
    Ok(())
}

struct RegexCompiler<'a, S: ExpressionSource + ?Sized> {
    chars: Vec<char>,
    pos: usize,
    source: &'a S,
}

impl<'a, S: ExpressionSource + ?Sized> RegexCompiler<'a, S> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).cloned()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).cloned()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, c: char) -> Result<(), RegexError> {
        let pos = self.pos;
        if self.next() != Some(c) {
            Err(RegexError::new(pos, format!("expected '{c}'")))
        } else {
            Ok(())
        }
    }

    fn compile_alternation(&mut self, cons: &mut NfaBuilder) -> Result<(), RegexError> {
        cons.push();
        self.compile_concat(cons)?;
        while self.peek() == Some('|') {
            self.next();
            cons.begin_or();
            self.compile_concat(cons)?;
        }
        cons.pop();
        Ok(())
    }

    fn compile_concat(&mut self, cons: &mut NfaBuilder) -> Result<(), RegexError> {
        while self.compile_term(cons)? {}
        Ok(())
    }

    /// One atom with its postfix repetitions. Returns `false` at the end of a branch.
    fn compile_term(&mut self, cons: &mut NfaBuilder) -> Result<bool, RegexError> {
        let start = self.pos;
        let mark = match self.compile_atom(cons)? {
            Some(mark) => mark,
            None => return Ok(false)
        };
        let atom_end = self.pos;
        loop {
            match self.peek() {
                Some('*') => {
                    self.next();
                    cons.epsilon(mark, cons.current_state());
                    cons.epsilon(cons.current_state(), mark);
                }
                Some('+') => {
                    self.next();
                    cons.epsilon(cons.current_state(), mark);
                }
                Some('?') => {
                    self.next();
                    cons.epsilon(mark, cons.current_state());
                }
                Some('{') if self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                    let span = self.chars[start..atom_end].to_vec();
                    self.compile_bounded(cons, mark, &span)?;
                }
                _ => break
            }
        }
        Ok(true)
    }

    /// `{m}`, `{m,}` or `{m,n}` applied to the atom spanning `span` (one copy of
    /// which is already compiled, entered at `mark`).
    fn compile_bounded(&mut self, cons: &mut NfaBuilder, mark: StateId, span: &[char]) -> Result<(), RegexError> {
        let open = self.pos;
        self.expect('{')?;
        let min = self.parse_number()?;
        let max = if self.peek() == Some(',') {
            self.next();
            if self.peek() == Some('}') { None } else { Some(self.parse_number()?) }
        } else {
            Some(min)
        };
        self.expect('}')?;
        if let Some(max) = max {
            if max < min || max == 0 {
                return Err(RegexError::new(open, format!("invalid repetition bounds {{{min},{max}}}")));
            }
        }
        // the copy already compiled counts as the first one
        let mut last_mark = mark;
        if min == 0 {
            cons.epsilon(mark, cons.current_state());
        }
        for _ in 1..min.max(1) {
            last_mark = cons.isolate();
            self.recompile(cons, span)?;
        }
        match max {
            // unbounded: loops the last mandatory copy
            None => cons.epsilon(cons.current_state(), last_mark),
            Some(max) => {
                for _ in min.max(1)..max {
                    let opt_mark = cons.isolate();
                    self.recompile(cons, span)?;
                    cons.epsilon(opt_mark, cons.current_state());
                }
            }
        }
        Ok(())
    }

    /// Compiles another copy of an atom span at the current state.
    fn recompile(&mut self, cons: &mut NfaBuilder, span: &[char]) -> Result<(), RegexError> {
        let mut sub = RegexCompiler { chars: span.to_vec(), pos: 0, source: self.source };
        sub.compile_atom(cons)?;
        Ok(())
    }

    fn parse_number(&mut self) -> Result<u32, RegexError> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(c) = self.peek() {
            match c.to_digit(10) {
                Some(d) => {
                    self.next();
                    value = value.saturating_mul(10).saturating_add(d);
                }
                None => break
            }
        }
        if self.pos == start {
            Err(RegexError::new(start, "expected a number"))
        } else {
            Ok(value)
        }
    }

    /// One atom. Returns its entry state, or `None` at the end of a branch.
    fn compile_atom(&mut self, cons: &mut NfaBuilder) -> Result<Option<StateId>, RegexError> {
        match self.peek() {
            None | Some('|') | Some(')') => Ok(None),
            Some(c @ ('*' | '+' | '?')) => {
                Err(RegexError::new(self.pos, format!("nothing to repeat before '{c}'")))
            }
            Some('(') => {
                self.next();
                let mark = cons.isolate();
                self.compile_alternation(cons)?;
                self.expect(')')?;
                Ok(Some(mark))
            }
            Some('[') => {
                let set = self.parse_class()?;
                let mark = cons.isolate();
                cons.transit(set);
                Ok(Some(mark))
            }
            Some('.') => {
                self.next();
                let mark = cons.isolate();
                cons.transit(Segments::dot());
                Ok(Some(mark))
            }
            Some('{') => {
                let pos = self.pos;
                self.next();
                let mut name = String::new();
                loop {
                    match self.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(RegexError::new(pos, "unterminated expression reference"))
                    }
                }
                let mark = cons.isolate();
                self.compile_reference(cons, &name, pos)?;
                Ok(Some(mark))
            }
            Some('^' | '$') => {
                // lexer matches are anchored by construction
                self.next();
                Ok(Some(cons.current_state()))
            }
            Some('\\') => {
                self.next();
                let mark = cons.isolate();
                match self.parse_escape(false)? {
                    Escaped::Char(c) => cons.literal_char(c),
                    Escaped::Set(set) => cons.transit(set),
                }
                Ok(Some(mark))
            }
            Some(c) => {
                self.next();
                let mark = cons.isolate();
                cons.literal_char(c);
                Ok(Some(mark))
            }
        }
    }

    /// Character class: `[abc]`, `[a-z0-9]`, `[^...]` / `[~...]`.
    fn parse_class(&mut self) -> Result<Segments, RegexError> {
        let open = self.pos;
        self.expect('[')?;
        let negate = matches!(self.peek(), Some('^' | '~'));
        if negate {
            self.next();
        }
        let mut set = Segments::empty();
        loop {
            let item_pos = self.pos;
            let low = match self.next() {
                None => return Err(RegexError::new(open, "unterminated character class")),
                Some(']') => break,
                Some('\\') => match self.parse_escape(true)? {
                    Escaped::Char(c) => c,
                    Escaped::Set(sub) => {
                        // \w and friends cannot be a range bound
                        for seg in sub.iter() {
                            set.insert(*seg);
                        }
                        continue;
                    }
                },
                Some(c) => c
            };
            if self.peek() == Some('-') && self.peek_at(1) != Some(']') && self.peek_at(1).is_some() {
                self.next();
                let high = match self.next() {
                    Some('\\') => match self.parse_escape(true)? {
                        Escaped::Char(c) => c,
                        Escaped::Set(_) => return Err(RegexError::new(item_pos, "class shorthand cannot bound a range"))
                    },
                    Some(c) => c,
                    None => return Err(RegexError::new(open, "unterminated character class"))
                };
                if (high as u32) < (low as u32) {
                    return Err(RegexError::new(item_pos, format!("invalid range '{low}'-'{high}'")));
                }
                set.insert(Seg(low as u32, high as u32 + 1));
            } else {
                set.insert(Seg::from_char(low));
            }
        }
        set.normalize();
        Ok(if negate { set.not() } else { set })
    }

    /// After a backslash, inside or outside a class.
    fn parse_escape(&mut self, in_class: bool) -> Result<Escaped, RegexError> {
        let pos = self.pos;
        match self.next() {
            None => Err(RegexError::new(pos, "dangling backslash")),
            Some('n') => Ok(Escaped::Char('\n')),
            Some('r') => Ok(Escaped::Char('\r')),
            Some('t') => Ok(Escaped::Char('\t')),
            Some('w') => Ok(Escaped::Set(Segments::from([seg_of('a', 'z'), seg_of('A', 'Z'), seg_of('0', '9'), Seg::from_char('_')]))),
            Some('d') => Ok(Escaped::Set(Segments::from([seg_of('0', '9')]))),
            Some('s') => Ok(Escaped::Set(Segments::from([Seg::from_char(' '), seg_of('\t', '\n'), Seg::from_char('\r')]))),
            Some('u') => {
                self.expect('{')?;
                let mut value: u32 = 0;
                let mut digits = 0;
                while let Some(c) = self.peek() {
                    match c.to_digit(16) {
                        Some(d) => {
                            self.next();
                            value = value.saturating_mul(16).saturating_add(d);
                            digits += 1;
                        }
                        None => break
                    }
                }
                self.expect('}')?;
                if digits == 0 {
                    return Err(RegexError::new(pos, "empty unicode escape"));
                }
                match char::from_u32(value) {
                    Some(c) => Ok(Escaped::Char(c)),
                    None => Err(RegexError::new(pos, format!("invalid codepoint \\u{{{value:x}}}")))
                }
            }
            Some(c) if !c.is_alphanumeric() || in_class => Ok(Escaped::Char(c)),
            Some(c) => Err(RegexError::new(pos, format!("unknown escape '\\{c}'")))
        }
    }

    /// Compiles a `{name}` reference: alternatives from the expression source when it
    /// resolves, the literal name otherwise.
    fn compile_reference(&mut self, cons: &mut NfaBuilder, name: &str, pos: usize) -> Result<(), RegexError> {
        let items = self.source.lookup(name).unwrap_or(&[]);
        if items.is_empty() {
            cons.literal(name);
            return Ok(());
        }
        let (lower, upper) = cons.case_options();
        cons.push();
        let mut first = true;
        for item in items {
            if !first {
                cons.begin_or();
            }
            cons.push();
            if item.case_insensitive {
                cons.set_case_options(true, true);
            } else {
                cons.set_case_options(lower, upper);
            }
            match item.kind {
                ExprKind::Regex => {
                    let mut sub = RegexCompiler { chars: item.definition.chars().collect(), pos: 0, source: self.source };
                    sub.compile_alternation(cons)
                        .map_err(|e| RegexError::new(pos, format!("in expression '{name}': {}", e.msg)))?;
                }
                ExprKind::Literal => cons.literal(&item.definition),
            }
            cons.set_case_options(lower, upper);
            cons.pop();
            first = false;
        }
        cons.set_case_options(lower, upper);
        cons.pop();
        Ok(())
    }
}

enum Escaped {
    Char(char),
    Set(Segments),
}

fn seg_of(a: char, b: char) -> Seg {
    Seg(a as u32, b as u32 + 1)
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------
