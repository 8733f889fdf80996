// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

use std::fmt::{Debug, Display, Formatter};

// ---------------------------------------------------------------------------------------------
// Diagnostics

/// `Pos(line, col)` in a language source, `Pos(0, 0)` when unknown.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Pos(pub u32, pub u32);

impl Pos {
    pub fn is_unknown(&self) -> bool {
        *self == Pos(0, 0)
    }
}

impl Display for Pos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            write!(f, "?:?")
        } else {
            write!(f, "{}:{}", self.0, self.1)
        }
    }
}

/// Diagnostic severities, from the only one that may stop a build (`Bug`, an internal
/// invariant violation) down to `Detail` entries attached to a previous diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity { Bug, Error, Warning, Info, Detail }

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Severity::Bug => "BUG",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Detail => "detail",
        })
    }
}

/// One reported problem. The build gathers diagnostics and carries on; it never
/// aborts on `Error` or below.
#[derive(Clone, PartialEq, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub file: String,
    pub pos: Pos,
    pub message: String,
}

impl Diagnostic {
    pub fn new<T: Into<String>>(severity: Severity, code: &'static str, file: &str, pos: Pos, message: T) -> Self {
        Diagnostic { severity, code, file: file.to_string(), pos, message: message.into() }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} [{}]", self.severity, self.message, self.code)?;
        if !self.file.is_empty() || !self.pos.is_unknown() {
            write!(f, " at {}:{}", self.file, self.pos)?;
        }
        Ok(())
    }
}

// diagnostic codes
pub const DUPLICATE_LEXER_SYMBOL: &str = "DUPLICATE_LEXER_SYMBOL";
pub const DUPLICATE_NONTERMINAL_DEFINITION: &str = "DUPLICATE_NONTERMINAL_DEFINITION";
pub const UNDEFINED_NONTERMINAL: &str = "UNDEFINED_NONTERMINAL";
pub const IMPLICIT_LEXER_SYMBOL: &str = "IMPLICIT_LEXER_SYMBOL";
pub const UNUSED_TERMINAL_SYMBOL: &str = "UNUSED_TERMINAL_SYMBOL";
pub const SYMBOL_CANNOT_BE_GENERATED: &str = "SYMBOL_CANNOT_BE_GENERATED";
pub const SYMBOL_CLASHES_WITH: &str = "SYMBOL_CLASHES_WITH";
pub const REGEX_SYNTAX_ERROR: &str = "REGEX_SYNTAX_ERROR";
pub const LR_CONFLICT: &str = "LR_CONFLICT";
pub const MISSING_START_SYMBOL: &str = "MISSING_START_SYMBOL";

// ---------------------------------------------------------------------------------------------
// Log traits

/// Common log functionalities for a message consumer / status verifier
pub trait LogStatus: Debug {
    fn num_warnings(&self) -> usize;
    fn num_errors(&self) -> usize;
    #[inline]
    fn has_no_errors(&self) -> bool {
        self.num_errors() == 0
    }
    #[inline]
    fn has_no_warnings(&self) -> bool {
        self.num_warnings() == 0
    }

    fn get_diagnostics(&self) -> impl Iterator<Item = &Diagnostic>;

    fn get_messages_str(&self) -> String {
        self.get_diagnostics().map(|d| format!("- {d}")).collect::<Vec<_>>().join("\n")
    }

    fn get_warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.get_diagnostics().filter(|d| d.severity == Severity::Warning)
    }

    fn get_errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.get_diagnostics().filter(|d| d.severity <= Severity::Error)
    }
}

/// Common log functionalities for a message producer
pub trait Logger: Debug {
    fn report(&mut self, diagnostic: Diagnostic);

    fn add_error<T: Into<String>>(&mut self, code: &'static str, msg: T) {
        self.report(Diagnostic::new(Severity::Error, code, "", Pos::default(), msg));
    }

    fn add_warning<T: Into<String>>(&mut self, code: &'static str, msg: T) {
        self.report(Diagnostic::new(Severity::Warning, code, "", Pos::default(), msg));
    }
}

// ---------------------------------------------------------------------------------------------

/// Basic log system that prints out diagnostics to stderr without storing them
#[derive(Clone, Debug)]
pub struct PrintLog {
    num_warnings: usize,
    num_errors: usize,
}

impl PrintLog {
    pub fn new() -> PrintLog {
        PrintLog { num_warnings: 0, num_errors: 0 }
    }
}

impl LogStatus for PrintLog {
    fn num_warnings(&self) -> usize {
        self.num_warnings
    }

    fn num_errors(&self) -> usize {
        self.num_errors
    }

    fn get_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        [].into_iter()
    }
}

impl Logger for PrintLog {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Bug | Severity::Error => self.num_errors += 1,
            Severity::Warning => self.num_warnings += 1,
            _ => {}
        }
        eprintln!("{diagnostic}");
    }
}

// ---------------------------------------------------------------------------------------------

/// Log system that stores the diagnostics, in discovery order
#[derive(Clone, Debug, Default)]
pub struct BufLog {
    diagnostics: Vec<Diagnostic>,
    num_warnings: usize,
    num_errors: usize,
}

impl BufLog {
    pub fn new() -> Self {
        BufLog { diagnostics: Vec::new(), num_warnings: 0, num_errors: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Clears all stored diagnostics.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.num_warnings = 0;
        self.num_errors = 0;
    }

    /// Extends the diagnostics with another log's content.
    pub fn extend(&mut self, other: BufLog) {
        self.num_warnings += other.num_warnings;
        self.num_errors += other.num_errors;
        self.diagnostics.extend(other.diagnostics)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

impl LogStatus for BufLog {
    fn num_warnings(&self) -> usize {
        self.num_warnings
    }

    fn num_errors(&self) -> usize {
        self.num_errors
    }

    fn get_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }
}

impl Logger for BufLog {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Bug | Severity::Error => self.num_errors += 1,
            Severity::Warning => self.num_warnings += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------
