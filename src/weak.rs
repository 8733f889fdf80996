// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

use std::collections::{BTreeMap, BTreeSet};
use crate::dfa::{AcceptAction, Dfa, UnitKind};
use crate::grammar::Terminals;
use crate::parser::{ActionKind, LrAction, ParserTables};
use crate::TokenId;

/// Weak-symbol augmentation. A weak symbol is a lexer symbol whose meaning depends on
/// parser state (a contextual keyword). Wherever the DFA accepts a weak symbol over a
/// strong one, a parallel terminal id carrying both meanings is introduced; the lexer
/// emits the parallel id and the parser decides between the two interpretations with
/// weak-reduce lookahead simulation.
#[derive(Clone, Debug, Default)]
pub struct WeakSymbols {
    /// `(parallel, weak, strong)` triples, in id order.
    pairs: Vec<(TokenId, TokenId, TokenId)>,
}

impl WeakSymbols {
    /// Scans the DFA accept states. For each state whose winning accept is a weak
    /// symbol overriding a strong one, allocates (or reuses) a parallel terminal id
    /// and points the state's accept at it. The terminal dictionary grows by one
    /// entry per distinct (weak, strong) pair.
    pub fn add_symbols(dfa: &mut Dfa, weak_ids: &BTreeSet<TokenId>, terminals: &mut Terminals) -> WeakSymbols {
        let mut made = BTreeMap::<(TokenId, TokenId), TokenId>::new();
        let mut pairs = Vec::new();
        let overridden = dfa.overridden().clone();
        for (state, losers) in overridden {
            let winner = match dfa.accept_for(state) {
                Some(&winner) => winner,
                None => continue
            };
            if !weak_ids.contains(&winner.symbol) {
                continue;
            }
            let strong = match losers.iter().filter(|action| !action.weak).max() {
                Some(&strong) => strong,
                None => continue
            };
            let key = (winner.symbol, strong.symbol);
            let parallel = match made.get(&key) {
                Some(&parallel) => parallel,
                None => {
                    let name = format!("{}|{}", terminals.name_for(key.0), terminals.name_for(key.1));
                    let kind = terminals.kind_for(key.0);
                    let parallel = match terminals.add(&name, kind) {
                        Some(id) => id,
                        None => terminals.id_for(&name).unwrap()
                    };
                    made.insert(key, parallel);
                    pairs.push((parallel, key.0, key.1));
                    parallel
                }
            };
            let kind = winner.kind.unwrap_or(UnitKind::WeakKeywords);
            dfa.accepts_mut().insert(state, AcceptAction::language(parallel, kind, true));
        }
        WeakSymbols { pairs }
    }

    pub fn pairs(&self) -> &[(TokenId, TokenId, TokenId)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Augments the action tables for the parallel ids: in every state, the weak
    /// symbol's actions come first (reduces already weak), then the strong symbol's
    /// interpretation, so the runtime's first-valid-wins search falls through to the
    /// strong meaning when the weak one is rejected.
    pub fn rewrite_actions(&self, tables: &mut ParserTables, terminals: &Terminals) {
        if self.pairs.is_empty() {
            return;
        }
        for row in tables.t_actions.iter_mut() {
            let mut appended = Vec::<LrAction>::new();
            for &(parallel, weak_id, strong_id) in &self.pairs {
                for action in row.iter().filter(|a| a.symbol == weak_id as u32) {
                    let kind = match action.kind {
                        ActionKind::Reduce => ActionKind::WeakReduce,
                        kind => kind
                    };
                    appended.push(LrAction { symbol: parallel as u32, kind, target: action.target });
                }
                for action in row.iter().filter(|a| a.symbol == strong_id as u32) {
                    appended.push(LrAction { symbol: parallel as u32, kind: action.kind, target: action.target });
                }
            }
            // parallel ids are above every grammar terminal, so the row stays sorted
            row.extend(appended);
        }
        tables.num_t = terminals.count();
    }
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------
