// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

use crate::build::Build;
use crate::grammar::NtKind;
use crate::parser::LrAction;
use crate::{GuardId, RuleId, SetId, StateId, TokenId, VarId};

/// Emission events, in the order `emit_build` produces them. A back-end consumes the
/// subset it cares about and ignores the rest.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputEvent<'a> {
    BeginOutput { name: &'a str },
    BeginTerminalSymbols { count: usize },
    TerminalSymbol { name: &'a str, id: TokenId },
    EndTerminalSymbols,
    BeginNonterminalSymbols { count: usize },
    NonterminalSymbol { name: &'a str, id: VarId, kind: NtKind },
    EndNonterminalSymbols,
    BeginLexerDefinitions,
    BeginSymbolMap { count_sets: usize },
    /// `[start, end)` maps to the set id.
    SymbolRange { start: u32, end: u32, set: SetId },
    EndSymbolMap,
    BeginStateMachine { count_states: usize },
    BeginLexerState { state: StateId },
    /// Supplied in ascending set order.
    LexerTransition { set: SetId, next: StateId },
    EndLexerState,
    EndStateMachine,
    BeginAcceptTable,
    /// `symbol = None` for a non-accepting state.
    AcceptState { state: StateId, symbol: Option<TokenId> },
    EndAcceptTable,
    EndLexerDefinitions,
    BeginParserDefinitions,
    BeginActionState { state: StateId },
    /// Terminal-keyed actions, sorted by symbol id.
    TerminalAction { action: LrAction },
    /// Nonterminal-keyed actions (gotos, diverts, end-of-input and end-of-guard rows).
    NonterminalAction { action: LrAction },
    EndActionState,
    RuleEntry { rule: RuleId, nt: VarId, len: usize },
    GuardEntry { guard: GuardId, initial_state: StateId, nt: VarId },
    EndParserDefinitions,
    EndOutput,
}

/// Consumer capability of the output stage. The default implementation ignores every
/// event, so back-ends only match what they need.
pub trait OutputConsumer {
    fn emit(&mut self, event: OutputEvent) {
        let _ = event;
    }
}

/// Drives a consumer over a finished build, in declaration order: symbols first,
/// then the lexer tables (symbol map → state machine → accept table), then the
/// parser tables (action rows → rule table → guard table).
pub fn emit_build(build: &Build, consumer: &mut dyn OutputConsumer) {
    consumer.emit(OutputEvent::BeginOutput { name: &build.name });

    consumer.emit(OutputEvent::BeginTerminalSymbols { count: build.grammar.terminals.count() });
    for (id, name) in build.grammar.terminals.iter() {
        consumer.emit(OutputEvent::TerminalSymbol { name, id });
    }
    consumer.emit(OutputEvent::EndTerminalSymbols);

    consumer.emit(OutputEvent::BeginNonterminalSymbols { count: build.grammar.nonterminals.count() });
    for (id, name) in build.grammar.nonterminals.iter() {
        consumer.emit(OutputEvent::NonterminalSymbol { name, id, kind: build.grammar.nonterminals.kind_for(id) });
    }
    consumer.emit(OutputEvent::EndNonterminalSymbols);

    consumer.emit(OutputEvent::BeginLexerDefinitions);
    let triples = build.lexer.translator.triples();
    let count_sets = triples.iter().map(|&(_, _, set)| set + 1).max().unwrap_or(0) as usize;
    consumer.emit(OutputEvent::BeginSymbolMap { count_sets });
    for &(start, end, set) in triples {
        consumer.emit(OutputEvent::SymbolRange { start, end, set });
    }
    consumer.emit(OutputEvent::EndSymbolMap);
    let count_states = build.lexer.table.count_states();
    consumer.emit(OutputEvent::BeginStateMachine { count_states });
    for state in 0..count_states {
        consumer.emit(OutputEvent::BeginLexerState { state });
        for (set, next) in build.lexer.table.row(state) {
            consumer.emit(OutputEvent::LexerTransition { set, next });
        }
        consumer.emit(OutputEvent::EndLexerState);
    }
    consumer.emit(OutputEvent::EndStateMachine);
    consumer.emit(OutputEvent::BeginAcceptTable);
    for state in 0..count_states {
        consumer.emit(OutputEvent::AcceptState { state, symbol: build.lexer.accept_for(state) });
    }
    consumer.emit(OutputEvent::EndAcceptTable);
    consumer.emit(OutputEvent::EndLexerDefinitions);

    consumer.emit(OutputEvent::BeginParserDefinitions);
    for state in 0..build.parser.count_states() {
        consumer.emit(OutputEvent::BeginActionState { state });
        for &action in &build.parser.t_actions[state] {
            consumer.emit(OutputEvent::TerminalAction { action });
        }
        for &action in &build.parser.nt_actions[state] {
            consumer.emit(OutputEvent::NonterminalAction { action });
        }
        consumer.emit(OutputEvent::EndActionState);
    }
    for (rule, &(nt, len)) in build.parser.rules.iter().enumerate() {
        consumer.emit(OutputEvent::RuleEntry { rule, nt, len });
    }
    for (guard, &(initial_state, nt)) in build.parser.guards.iter().enumerate() {
        consumer.emit(OutputEvent::GuardEntry { guard: guard as GuardId, initial_state, nt });
    }
    consumer.emit(OutputEvent::EndParserDefinitions);
    consumer.emit(OutputEvent::EndOutput);
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------
