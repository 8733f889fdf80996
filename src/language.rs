// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

use std::collections::{BTreeSet, HashMap};
use crate::dfa::UnitKind;
use crate::grammar::{Grammar, GrItem, NtKind};
use crate::log::*;
use crate::regex::{ExprDef, ExprKind};
use crate::{TokenId, VarId};

// ---------------------------------------------------------------------------------------------
// Input AST

/// Kind of a lexeme definition in the language source.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DefKind { Regex, Str, Char, Literal }

/// One lexeme definition: `identifier : definition`.
#[derive(Clone, Debug)]
pub struct LexemeDef {
    pub identifier: String,
    pub definition: String,
    pub kind: DefKind,
    pub case_insensitive: bool,
    pub pos: Pos,
}

impl LexemeDef {
    pub fn regex(identifier: &str, definition: &str) -> Self {
        LexemeDef { identifier: identifier.to_string(), definition: definition.to_string(),
                    kind: DefKind::Regex, case_insensitive: false, pos: Pos::default() }
    }

    pub fn literal(identifier: &str, definition: &str) -> Self {
        LexemeDef { identifier: identifier.to_string(), definition: definition.to_string(),
                    kind: DefKind::Literal, case_insensitive: false, pos: Pos::default() }
    }

    fn to_expr(&self) -> ExprDef {
        ExprDef {
            definition: self.definition.clone(),
            kind: match self.kind {
                DefKind::Regex => ExprKind::Regex,
                // strings, characters and literals all behave as literal text
                DefKind::Str | DefKind::Char | DefKind::Literal => ExprKind::Literal,
            },
            case_insensitive: self.case_insensitive,
        }
    }
}

/// Definition operator of a nonterminal: `=` errors on redefinition, `|=` appends,
/// replace clears the existing rules first.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DefType { Assign, Append, Replace }

/// EBNF item shape as it appears in a grammar definition.
#[derive(Clone, PartialEq, Debug)]
pub enum EbnfItem {
    Terminal(String),
    TerminalString(String),
    TerminalChar(String),
    Nonterminal(String),
    Optional(Vec<EbnfItem>),
    RepeatZero(Vec<EbnfItem>),
    RepeatOne(Vec<EbnfItem>),
    Alternative(Vec<EbnfItem>, Vec<EbnfItem>),
    Guard(Vec<EbnfItem>),
    Paren(Vec<EbnfItem>),
}

/// One nonterminal definition with its productions.
#[derive(Clone, Debug)]
pub struct GrammarDef {
    pub identifier: String,
    pub def_type: DefType,
    pub productions: Vec<Vec<EbnfItem>>,
    pub pos: Pos,
}

impl GrammarDef {
    pub fn new(identifier: &str, def_type: DefType, productions: Vec<Vec<EbnfItem>>) -> Self {
        GrammarDef { identifier: identifier.to_string(), def_type, productions, pos: Pos::default() }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParserBlock {
    pub start_symbols: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum LanguageUnit {
    /// Named expressions usable as `{name}` references; they define no terminals.
    LexerSymbols(Vec<LexemeDef>),
    Lexer { weak: bool, defs: Vec<LexemeDef> },
    Keywords { weak: bool, defs: Vec<LexemeDef> },
    Ignore(Vec<LexemeDef>),
    Grammar(Vec<GrammarDef>),
    Parser(ParserBlock),
}

#[derive(Clone, Debug)]
pub struct Language {
    pub identifier: String,
    pub inherits: Vec<String>,
    pub units: Vec<LanguageUnit>,
}

impl Language {
    pub fn new(identifier: &str) -> Self {
        Language { identifier: identifier.to_string(), inherits: Vec::new(), units: Vec::new() }
    }
}

// ---------------------------------------------------------------------------------------------
// Language stage

/// Everything the later stages need: the closed dictionaries and grammar, the lexeme
/// list in priority order, the named-expression table, and the symbol classifications.
#[derive(Debug, Default)]
pub struct LanguageData {
    pub grammar: Grammar,
    /// `(symbol, definition, unit kind)` in lexer priority order.
    pub lexemes: Vec<(TokenId, ExprDef, UnitKind)>,
    pub expressions: HashMap<String, Vec<ExprDef>>,
    pub weak_ids: BTreeSet<TokenId>,
    pub ignored: BTreeSet<TokenId>,
    /// Ignored symbols that appear in the grammar, which keep their own identity.
    pub used_ignored: BTreeSet<TokenId>,
    pub start: Option<VarId>,
    pub log: BufLog,
    pub file: String,
    first_usage: HashMap<VarId, Pos>,
}

/// Lexer block processing order: the priority of the symbols.
const UNIT_ORDER: [UnitKind; 5] = [
    UnitKind::WeakKeywords,
    UnitKind::WeakLexer,
    UnitKind::Keywords,
    UnitKind::Lexer,
    UnitKind::Ignore,
];

impl LanguageData {
    /// Compiles the language AST into dictionaries, grammar and lexeme list. Errors
    /// are gathered in the returned log; the result is best-effort.
    pub fn build(language: &Language) -> LanguageData {
        let mut data = LanguageData { file: language.identifier.clone(), ..LanguageData::default() };
        data.collect_expressions(language);
        data.collect_lexemes(language);
        data.collect_implicit_keywords(language);
        data.build_grammar(language);
        data.check_undefined(language);
        data.resolve_start(language);
        data
    }

    fn error<T: Into<String>>(&mut self, code: &'static str, pos: Pos, msg: T) {
        let file = self.file.clone();
        self.log.report(Diagnostic::new(Severity::Error, code, &file, pos, msg));
    }

    fn warning<T: Into<String>>(&mut self, code: &'static str, pos: Pos, msg: T) {
        let file = self.file.clone();
        self.log.report(Diagnostic::new(Severity::Warning, code, &file, pos, msg));
    }

    fn collect_expressions(&mut self, language: &Language) {
        for unit in &language.units {
            if let LanguageUnit::LexerSymbols(defs) = unit {
                for def in defs {
                    self.expressions.entry(def.identifier.clone()).or_default().push(def.to_expr());
                }
            }
        }
    }

    /// Registers the terminals of every lexer block, one unit kind at a time in
    /// priority order, and in document order within a kind.
    fn collect_lexemes(&mut self, language: &Language) {
        for kind in UNIT_ORDER {
            for unit in &language.units {
                let defs = match (kind, unit) {
                    (UnitKind::WeakLexer, LanguageUnit::Lexer { weak: true, defs }) => defs,
                    (UnitKind::Lexer, LanguageUnit::Lexer { weak: false, defs }) => defs,
                    (UnitKind::WeakKeywords, LanguageUnit::Keywords { weak: true, defs }) => defs,
                    (UnitKind::Keywords, LanguageUnit::Keywords { weak: false, defs }) => defs,
                    (UnitKind::Ignore, LanguageUnit::Ignore(defs)) => defs,
                    _ => continue
                };
                for def in defs {
                    match self.grammar.terminals.add(&def.identifier, kind) {
                        Some(id) => {
                            if kind.is_weak() {
                                self.weak_ids.insert(id);
                            }
                            if kind == UnitKind::Ignore {
                                self.ignored.insert(id);
                            }
                            self.lexemes.push((id, def.to_expr(), kind));
                        }
                        None => {
                            self.error(DUPLICATE_LEXER_SYMBOL, def.pos,
                                       format!("duplicate lexer symbol: {}", def.identifier));
                        }
                    }
                }
            }
        }
    }

    /// Symbols defined inside the grammar itself (bare identifiers, strings and
    /// characters) count as weak keywords; a bare identifier additionally warns.
    fn collect_implicit_keywords(&mut self, language: &Language) {
        for unit in &language.units {
            if let LanguageUnit::Grammar(defs) = unit {
                for def in defs {
                    for production in &def.productions {
                        for item in production {
                            self.add_ebnf_lexer_items(item, def.pos);
                        }
                    }
                }
            }
        }
    }

    fn add_ebnf_lexer_items(&mut self, item: &EbnfItem, pos: Pos) {
        match item {
            EbnfItem::Terminal(name) => {
                if self.grammar.terminals.id_for(name).is_none() {
                    self.warning(IMPLICIT_LEXER_SYMBOL, pos, format!("implicitly defining keyword: {name}"));
                    self.add_implicit(name);
                }
            }
            EbnfItem::TerminalString(text) | EbnfItem::TerminalChar(text) => {
                if self.grammar.terminals.id_for(text).is_none() {
                    self.add_implicit(text);
                }
            }
            EbnfItem::Nonterminal(_) => {}
            EbnfItem::Optional(sub) | EbnfItem::RepeatZero(sub) | EbnfItem::RepeatOne(sub)
            | EbnfItem::Guard(sub) | EbnfItem::Paren(sub) => {
                for item in sub {
                    self.add_ebnf_lexer_items(item, pos);
                }
            }
            EbnfItem::Alternative(left, right) => {
                for item in left.iter().chain(right.iter()) {
                    self.add_ebnf_lexer_items(item, pos);
                }
            }
        }
    }

    fn add_implicit(&mut self, name: &str) {
        if let Some(id) = self.grammar.terminals.add(name, UnitKind::WeakKeywords) {
            self.weak_ids.insert(id);
            self.lexemes.push((id, ExprDef {
                definition: name.to_string(),
                kind: ExprKind::Literal,
                case_insensitive: false,
            }, UnitKind::WeakKeywords));
        }
    }

    fn build_grammar(&mut self, language: &Language) {
        let mut first_usage = HashMap::<VarId, Pos>::new();
        let mut used = BTreeSet::<TokenId>::new();
        for unit in &language.units {
            if let LanguageUnit::Grammar(defs) = unit {
                for def in defs {
                    let nt = self.grammar.nonterminals.id_or_add(&def.identifier);
                    let already = self.grammar.has_rules(nt);
                    match def.def_type {
                        DefType::Assign if already => {
                            self.error(DUPLICATE_NONTERMINAL_DEFINITION, def.pos,
                                       format!("duplicate nonterminal definition: {}", def.identifier));
                        }
                        DefType::Replace if already => {
                            self.grammar.clear_rules_for(nt);
                        }
                        _ => {}
                    }
                    for production in &def.productions {
                        let items = production.iter()
                            .map(|item| self.convert_item(item, def.pos, &mut first_usage, &mut used))
                            .collect::<Vec<_>>();
                        self.grammar.add_rule(nt, &items);
                    }
                }
            }
        }
        // a nonterminal that never got rules was referenced but not defined
        self.first_usage = first_usage;
        // terminals never referenced by the grammar
        for (id, name) in self.grammar.terminals.iter() {
            if !used.contains(&id) && self.grammar.terminals.kind_for(id) != UnitKind::Ignore {
                let msg = format!("unused terminal symbol definition: {name}");
                let file = self.file.clone();
                self.log.report(Diagnostic::new(Severity::Warning, UNUSED_TERMINAL_SYMBOL, &file, Pos::default(), msg));
            }
        }
    }

    fn convert_item(&mut self, item: &EbnfItem, pos: Pos,
                    first_usage: &mut HashMap<VarId, Pos>, used: &mut BTreeSet<TokenId>) -> GrItem {
        match item {
            EbnfItem::Terminal(name) | EbnfItem::TerminalString(name) | EbnfItem::TerminalChar(name) => {
                // registered by the implicit-keyword pass, so this cannot fail
                let id = self.grammar.terminals.id_for(name).unwrap();
                used.insert(id);
                if self.ignored.contains(&id) {
                    self.used_ignored.insert(id);
                }
                GrItem::T(id)
            }
            EbnfItem::Nonterminal(name) => {
                let id = self.grammar.nonterminals.id_or_add(name);
                first_usage.entry(id).or_insert(pos);
                GrItem::NT(id)
            }
            EbnfItem::Optional(sub) =>
                GrItem::Optional(self.convert_seq(sub, pos, first_usage, used)),
            EbnfItem::RepeatZero(sub) =>
                GrItem::RepeatZero(self.convert_seq(sub, pos, first_usage, used)),
            EbnfItem::RepeatOne(sub) =>
                GrItem::RepeatOne(self.convert_seq(sub, pos, first_usage, used)),
            EbnfItem::Guard(sub) =>
                GrItem::Guard(self.convert_seq(sub, pos, first_usage, used)),
            EbnfItem::Paren(sub) =>
                GrItem::Paren(self.convert_seq(sub, pos, first_usage, used)),
            EbnfItem::Alternative(left, right) =>
                GrItem::Alternative(self.convert_seq(left, pos, first_usage, used),
                                    self.convert_seq(right, pos, first_usage, used)),
        }
    }

    fn convert_seq(&mut self, items: &[EbnfItem], pos: Pos,
                   first_usage: &mut HashMap<VarId, Pos>, used: &mut BTreeSet<TokenId>) -> Vec<GrItem> {
        items.iter().map(|item| self.convert_item(item, pos, first_usage, used)).collect()
    }

    fn check_undefined(&mut self, _language: &Language) {
        let undefined = self.grammar.nonterminals.iter()
            .filter(|&(id, _)| !self.grammar.has_rules(id) && self.grammar.nonterminals.kind_for(id) == NtKind::Plain)
            .map(|(id, name)| (id, name.to_string()))
            .collect::<Vec<_>>();
        for (id, name) in undefined {
            let pos = self.first_usage.get(&id).cloned().unwrap_or_default();
            self.error(UNDEFINED_NONTERMINAL, pos, format!("undefined nonterminal: {name}"));
        }
    }

    fn resolve_start(&mut self, language: &Language) {
        for unit in &language.units {
            if let LanguageUnit::Parser(block) = unit {
                if let Some(name) = block.start_symbols.first() {
                    match self.grammar.nonterminals.id_for(name) {
                        Some(id) => {
                            self.start = Some(id);
                            self.grammar.start = Some(id);
                            return;
                        }
                        None => {
                            self.error(UNDEFINED_NONTERMINAL, Pos::default(),
                                       format!("undefined start symbol: {name}"));
                        }
                    }
                }
            }
        }
        // default: the first defined nonterminal
        let fallback = self.grammar.nonterminals.iter()
            .find(|&(id, _)| self.grammar.has_rules(id))
            .map(|(id, _)| id);
        match fallback {
            Some(id) => {
                self.start = Some(id);
                self.grammar.start = Some(id);
            }
            None => self.error(MISSING_START_SYMBOL, Pos::default(), "no start symbol and no defined nonterminal"),
        }
    }
}
