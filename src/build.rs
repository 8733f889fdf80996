// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

use std::collections::BTreeSet;
use crate::dfa::{AcceptAction, Nfa, UnitKind};
use crate::grammar::Grammar;
use crate::lalr::LalrBuilder;
use crate::language::{Language, LanguageData};
use crate::lexer::{LexerTables, TableProfile};
use crate::log::*;
use crate::parser::ParserTables;
use crate::regex::{add_regex, ExprKind};
use crate::weak::WeakSymbols;


/// Build options, mirroring the original command-line switches.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub profile: TableProfile,
    pub compact_dfa: bool,
    pub merge_symbols: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions { profile: TableProfile::Flat, compact_dfa: true, merge_symbols: true }
    }
}

/// The finished build: immutable tables plus the diagnostics gathered on the way.
/// Errors do not abort the pipeline; the artefact is best-effort and the caller
/// inspects the log.
#[derive(Debug)]
pub struct Build {
    pub name: String,
    pub grammar: Grammar,
    pub lexer: LexerTables,
    pub parser: ParserTables,
    pub weak: WeakSymbols,
    pub log: BufLog,
}

/// Compiles a language into lexer and parser tables:
/// language stage (dictionaries, grammar) → lexer stage (NFA → unique symbols → DFA
/// → weak symbols → compaction → merged symbols → tables) → parser stage (LALR +
/// weak rewrite).
pub fn build_language(language: &Language, options: &BuildOptions) -> Build {
    let mut data = LanguageData::build(language);
    let mut log = std::mem::take(&mut data.log);

    // ---- lexer stage ----
    // ignored symbols with no syntactic meaning all map to a single shared id
    let bland = data.ignored.difference(&data.used_ignored).cloned().collect::<BTreeSet<_>>();
    let shared_ignore = bland.first().cloned();
    let mut nfa = Nfa::new();
    for (symbol, expr, kind) in &data.lexemes {
        let mut symbol = *symbol;
        if *kind == UnitKind::Ignore && bland.contains(&symbol) {
            symbol = shared_ignore.unwrap();
        }
        let mut cons = nfa.builder(0);
        cons.push();
        cons.set_case_options(expr.case_insensitive, expr.case_insensitive);
        let mut ok = true;
        match expr.kind {
            ExprKind::Regex => {
                if let Err(e) = add_regex(&mut cons, &expr.definition, &data.expressions) {
                    log.report(Diagnostic::new(Severity::Error, REGEX_SYNTAX_ERROR, &data.file, Pos::default(),
                                               format!("in /{}/ at {}: {}", expr.definition, e.pos, e.msg)));
                    ok = false;
                }
            }
            ExprKind::Literal => cons.literal(&expr.definition),
        }
        if ok {
            cons.accept(AcceptAction::language(symbol, *kind, kind.is_weak()));
        }
        cons.pop();
    }
    let mut dfa = nfa.to_nfa_with_unique_symbols().to_dfa();

    // terminals that are always replaced by other terminals
    let never = data.grammar.terminals.iter()
        .filter(|&(id, _)| !dfa.generated_symbols().contains(&id) && !data.ignored.contains(&id))
        .map(|(id, name)| (id, name.to_string()))
        .collect::<Vec<_>>();
    for (id, name) in never {
        log.report(Diagnostic::new(Severity::Warning, SYMBOL_CANNOT_BE_GENERATED, &data.file, Pos::default(),
                                   format!("lexer symbol can never be generated: {name}")));
        if let Some(winners) = dfa.clashes().get(&id) {
            for winner in winners.clone() {
                let winner_name = data.grammar.terminals.name_for(winner).to_string();
                log.report(Diagnostic::new(Severity::Detail, SYMBOL_CLASHES_WITH, &data.file, Pos::default(),
                                           format!("'{name}' clashes with: {winner_name}")));
            }
        }
    }

    // weak symbols get their parallel ids before the DFA is compacted
    let weak = WeakSymbols::add_symbols(&mut dfa, &data.weak_ids, &mut data.grammar.terminals);
    let dfa = if options.compact_dfa { dfa.to_compact_dfa() } else { dfa };
    let dfa = if options.merge_symbols { dfa.to_dfa_with_merged_symbols() } else { dfa };
    let mut lexer = LexerTables::from_dfa(&dfa, options.profile);
    if let Some(shared) = shared_ignore {
        lexer.skip.insert(shared);
    }

    // ---- parser stage ----
    let parser = match data.start {
        Some(start) => {
            let (mut tables, lalr_log) = LalrBuilder::build(&data.grammar, start, &data.used_ignored);
            log.extend(lalr_log);
            weak.rewrite_actions(&mut tables, &data.grammar.terminals);
            tables
        }
        None => ParserTables::default()
    };

    Build {
        name: language.identifier.clone(),
        grammar: data.grammar,
        lexer,
        parser,
        weak,
        log,
    }
}

/// Convenience for tokenising then parsing a source string against a build.
pub fn parse_source(build: &Build, source: &str) -> Result<(), String> {
    let mut tokens = Vec::new();
    for token in build.lexer.tokens(source) {
        match token {
            Ok(token) => tokens.push(token),
            Err(e) => return Err(e.to_string())
        }
    }
    crate::parser::Parser::new(&build.parser).parse(tokens.into_iter()).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------
