// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use crate::dfa::Dfa;
use crate::log::Pos;
use crate::symbol_map::SymbolMap;
use crate::{SetId, StateId, TokenId};

// ---------------------------------------------------------------------------------------------
// Symbol translator

/// Codepoint → set-id map, stored as a sorted list of `(range_start, range_end, set_id)`
/// triples over half-open ranges. Lookup is an upper-bound search plus a bounds check.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolTranslator {
    triples: Vec<(u32, u32, SetId)>,
}

impl SymbolTranslator {
    pub fn from_symbol_map(symbols: &SymbolMap) -> Self {
        let mut triples = symbols.iter()
            .flat_map(|(id, set)| set.iter().map(move |seg| (seg.0, seg.1, id)))
            .collect::<Vec<_>>();
        triples.sort();
        SymbolTranslator { triples }
    }

    pub fn triples(&self) -> &[(u32, u32, SetId)] {
        &self.triples
    }

    /// Set id for a codepoint, `None` when no set covers it.
    pub fn set_for(&self, value: u32) -> Option<SetId> {
        let idx = self.triples.partition_point(|&(start, _, _)| start <= value);
        if idx == 0 {
            return None;
        }
        let (_, end, set) = self.triples[idx - 1];
        if value < end {
            Some(set)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------------------------
// State tables

/// Row representation of the DFA transition table.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum TableProfile {
    /// Dense array of `set_count` entries per state, −1 = reject. O(1) lookup.
    #[default] Flat,
    /// Sorted `(set_id, next_state)` pairs per state, binary-search lookup.
    Compact,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StateTable {
    Flat { sets: usize, cells: Vec<i32> },
    Compact { rows: Vec<Vec<(SetId, StateId)>> },
}

impl StateTable {
    pub fn from_dfa(dfa: &Dfa, profile: TableProfile) -> Self {
        match profile {
            TableProfile::Flat => {
                let sets = dfa.symbols().count_sets();
                let mut cells = vec![-1_i32; sets * dfa.count_states()];
                for state in 0..dfa.count_states() {
                    for (&set, &target) in dfa.transitions(state) {
                        cells[state * sets + set as usize] = target as i32;
                    }
                }
                StateTable::Flat { sets, cells }
            }
            TableProfile::Compact => {
                let rows = (0..dfa.count_states())
                    .map(|state| dfa.transitions(state).iter().map(|(&set, &target)| (set, target)).collect())
                    .collect();
                StateTable::Compact { rows }
            }
        }
    }

    pub fn count_states(&self) -> usize {
        match self {
            StateTable::Flat { sets, cells } => if *sets == 0 { 0 } else { cells.len() / sets },
            StateTable::Compact { rows } => rows.len(),
        }
    }

    /// Transitions of one state, in ascending set order (for table emission).
    pub fn row(&self, state: StateId) -> Vec<(SetId, StateId)> {
        match self {
            StateTable::Flat { sets, cells } => (0..*sets)
                .filter_map(|set| match cells[state * sets + set] {
                    -1 => None,
                    next => Some((set as SetId, next as StateId))
                })
                .collect(),
            StateTable::Compact { rows } => rows[state].clone(),
        }
    }

    /// Next state, `None` = reject.
    pub fn next(&self, state: StateId, set: SetId) -> Option<StateId> {
        match self {
            StateTable::Flat { sets, cells } => {
                if (set as usize) >= *sets {
                    return None;
                }
                match cells[state * sets + set as usize] {
                    -1 => None,
                    next => Some(next as StateId)
                }
            }
            StateTable::Compact { rows } => {
                let row = &rows[state];
                row.binary_search_by_key(&set, |&(s, _)| s).ok().map(|idx| row[idx].1)
            }
        }
    }
}

// ---------------------------------------------------------------------------------------------
// Lexer tables

pub type LexerToken = (TokenId, String, Pos);

#[derive(Clone, Debug, PartialEq)]
pub enum LexerError {
    /// No symbol set covers the character.
    UnrecognizedChar { c: char, pos: Pos },
    /// The scan stopped without reaching an accepting state.
    IncompleteToken { text: String, pos: Pos },
}

impl Display for LexerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LexerError::UnrecognizedChar { c, pos } =>
                write!(f, "unrecognized character '{}' at {pos}", crate::escape_char(*c)),
            LexerError::IncompleteToken { text, pos } =>
                write!(f, "incomplete token '{}' at {pos}", crate::escape_string(text)),
        }
    }
}

impl std::error::Error for LexerError {}

/// Runtime-facing lexer tables: symbol translator, transition table, accept table.
#[derive(Clone, Debug)]
pub struct LexerTables {
    pub translator: SymbolTranslator,
    pub table: StateTable,
    pub accepts: Vec<Option<TokenId>>,
    pub initial_state: StateId,
    /// Tokens dropped by the scanner (ignored symbols with no syntactic meaning).
    pub skip: BTreeSet<TokenId>,
}

impl LexerTables {
    pub fn from_dfa(dfa: &Dfa, profile: TableProfile) -> Self {
        let accepts = (0..dfa.count_states())
            .map(|state| dfa.accept_for(state).map(|action| action.symbol))
            .collect();
        LexerTables {
            translator: SymbolTranslator::from_symbol_map(dfa.symbols()),
            table: StateTable::from_dfa(dfa, profile),
            accepts,
            initial_state: dfa.initial_state(),
            skip: BTreeSet::new(),
        }
    }

    /// `table[state][translator(code)]`; −1 for a reject or an out-of-range input.
    pub fn run(&self, state: StateId, code: u32) -> i32 {
        match self.translator.set_for(code).and_then(|set| self.table.next(state, set)) {
            Some(next) => next as i32,
            None => -1
        }
    }

    pub fn accept_for(&self, state: StateId) -> Option<TokenId> {
        self.accepts.get(state).cloned().flatten()
    }

    /// Longest-match token iterator over `input`.
    pub fn tokens<'a>(&'a self, input: &str) -> Tokens<'a> {
        let mut chars = Vec::new();
        let (mut line, mut col) = (1, 1);
        for c in input.chars() {
            chars.push((c, Pos(line, col)));
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        Tokens { tables: self, chars, idx: 0 }
    }
}

pub struct Tokens<'a> {
    tables: &'a LexerTables,
    chars: Vec<(char, Pos)>,
    idx: usize,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<LexerToken, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.idx >= self.chars.len() {
                return None;
            }
            let start = self.idx;
            let start_pos = self.chars[start].1;
            let mut state = self.tables.initial_state;
            let mut last_accept: Option<(TokenId, usize)> = None;
            let mut i = start;
            while i < self.chars.len() {
                let next = self.tables.run(state, self.chars[i].0 as u32);
                if next < 0 {
                    break;
                }
                state = next as StateId;
                i += 1;
                if let Some(token) = self.tables.accept_for(state) {
                    last_accept = Some((token, i));
                }
            }
            match last_accept {
                Some((token, end)) if end > start => {
                    let text = self.chars[start..end].iter().map(|(c, _)| c).collect::<String>();
                    self.idx = end;
                    if self.tables.skip.contains(&token) {
                        continue;
                    }
                    return Some(Ok((token, text, start_pos)));
                }
                _ => {
                    // make progress past the offending character
                    let c = self.chars[start].0;
                    self.idx = start + 1;
                    return Some(Err(if self.tables.translator.set_for(c as u32).is_none() {
                        LexerError::UnrecognizedChar { c, pos: start_pos }
                    } else {
                        let text = self.chars[start..i.max(start + 1)].iter().map(|(c, _)| c).collect::<String>();
                        LexerError::IncompleteToken { text, pos: start_pos }
                    }));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------
