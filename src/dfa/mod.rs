// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

pub(crate) mod tests;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::{Display, Formatter};
use crate::segments::{Seg, Segments};
use crate::symbol_map::{RemappedSymbolMap, SymbolMap};
use crate::{CollectJoin, SetId, StateId, TokenId};

// ---------------------------------------------------------------------------------------------
// Accept actions

/// Category of the language unit a lexer symbol was defined in. The ordering below is
/// the priority order used to resolve accept conflicts (weak keywords win).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum UnitKind { WeakKeywords, WeakLexer, Keywords, Lexer, Ignore }

impl UnitKind {
    fn priority(&self) -> u8 {
        match self {
            UnitKind::WeakKeywords => 4,
            UnitKind::WeakLexer => 3,
            UnitKind::Keywords => 2,
            UnitKind::Lexer => 1,
            UnitKind::Ignore => 0,
        }
    }

    pub fn is_weak(&self) -> bool {
        matches!(self, UnitKind::WeakKeywords | UnitKind::WeakLexer)
    }
}

impl Display for UnitKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            UnitKind::WeakKeywords => "weak keywords",
            UnitKind::WeakLexer => "weak lexer",
            UnitKind::Keywords => "keywords",
            UnitKind::Lexer => "lexer",
            UnitKind::Ignore => "ignore",
        })
    }
}

/// Accept action attached to an automaton state: the symbol to emit and its priority
/// key. `kind = None` is a bare accept, outranked by any language-aware accept.
///
/// The `Ord` implementation makes the winning action the maximum:
/// 1. language-aware beats bare,
/// 2. weak beats strong,
/// 3. higher unit-kind priority wins,
/// 4. lower symbol id (earlier definition) wins.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct AcceptAction {
    pub symbol: TokenId,
    pub kind: Option<UnitKind>,
    pub weak: bool,
}

impl AcceptAction {
    pub fn bare(symbol: TokenId) -> Self {
        AcceptAction { symbol, kind: None, weak: false }
    }

    pub fn language(symbol: TokenId, kind: UnitKind, weak: bool) -> Self {
        AcceptAction { symbol, kind: Some(kind), weak }
    }
}

impl Ord for AcceptAction {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.kind, other.kind) {
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => other.symbol.cmp(&self.symbol),
            (Some(k1), Some(k2)) => self.weak.cmp(&other.weak)
                .then(k1.priority().cmp(&k2.priority()))
                .then(other.symbol.cmp(&self.symbol))
        }
    }
}

impl PartialOrd for AcceptAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for AcceptAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "<end:{} {kind}{}>", self.symbol, if self.weak { ", weak" } else { "" }),
            None => write!(f, "<end:{}>", self.symbol)
        }
    }
}

// ---------------------------------------------------------------------------------------------
// NFA

#[derive(Clone, Debug, Default)]
pub struct NfaState {
    pub transitions: Vec<(SetId, StateId)>,
    pub epsilon: Vec<StateId>,
    pub accepts: Vec<AcceptAction>,
}

/// Non-deterministic automaton. State 0 is the universal entry point; extra roots can
/// be registered for language-union construction. Transitions are labelled with the
/// ids of a [SymbolMap], which may overlap until `to_nfa_with_unique_symbols`.
#[derive(Clone, Debug, Default)]
pub struct Nfa {
    states: Vec<NfaState>,
    symbols: SymbolMap,
    roots: Vec<StateId>,
}

impl Nfa {
    pub fn new() -> Self {
        Nfa { states: vec![NfaState::default()], symbols: SymbolMap::new(), roots: vec![] }
    }

    pub fn count_states(&self) -> usize {
        self.states.len()
    }

    pub fn symbols(&self) -> &SymbolMap {
        &self.symbols
    }

    pub fn get_state(&self, id: StateId) -> &NfaState {
        &self.states[id]
    }

    pub fn add_state(&mut self) -> StateId {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    /// Registers an extra entry point (language-union construction).
    pub fn add_root(&mut self) -> StateId {
        let root = self.add_state();
        self.roots.push(root);
        root
    }

    pub fn roots(&self) -> &[StateId] {
        &self.roots
    }

    pub fn add_transition(&mut self, from: StateId, symbols: Segments, to: StateId) {
        let set = self.symbols.identifier_for_symbols(symbols);
        self.states[from].transitions.push((set, to));
    }

    pub fn add_transition_set(&mut self, from: StateId, set: SetId, to: StateId) {
        self.states[from].transitions.push((set, to));
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from].epsilon.push(to);
    }

    pub fn add_accept(&mut self, state: StateId, action: AcceptAction) {
        self.states[state].accepts.push(action);
    }

    pub fn builder(&mut self, start: StateId) -> NfaBuilder<'_> {
        NfaBuilder::new(self, start)
    }

    fn epsilon_closure(&self, states: &BTreeSet<StateId>) -> BTreeSet<StateId> {
        let mut closure = states.clone();
        let mut stack = states.iter().cloned().to_vec();
        while let Some(st) = stack.pop() {
            for &next in &self.states[st].epsilon {
                if closure.insert(next) {
                    stack.push(next);
                }
            }
        }
        closure
    }

    /// Replaces the symbol sets labelling the transitions with disjoint set ids; the
    /// resulting partition is a refinement of every original set.
    pub fn to_nfa_with_unique_symbols(self) -> Nfa {
        let remapped = RemappedSymbolMap::deduplicate(&self.symbols);
        let states = self.states.into_iter().map(|st| NfaState {
            transitions: st.transitions.iter()
                .flat_map(|&(old, target)| remapped.new_symbols(old).into_iter().flatten().map(move |&new| (new, target)))
                .collect(),
            epsilon: st.epsilon,
            accepts: st.accepts,
        }).collect();
        Nfa { states, symbols: remapped.into_map(), roots: self.roots }
    }

    /// Subset construction. The input must have unique (disjoint) symbol sets. The
    /// accept action of a combined state is the maximum of its members' actions;
    /// losing actions are recorded so that the build can report symbols that are
    /// never generated and what they clash with.
    pub fn to_dfa(self) -> Dfa {
        let mut states = Vec::<BTreeMap<SetId, StateId>>::new();
        let mut accepts = BTreeMap::<StateId, AcceptAction>::new();
        let mut overridden = BTreeMap::<StateId, Vec<AcceptAction>>::new();
        let mut clashes = BTreeMap::<TokenId, BTreeSet<TokenId>>::new();
        let mut generated = BTreeSet::<TokenId>::new();
        let mut ids = BTreeMap::<BTreeSet<StateId>, StateId>::new();
        let mut queue = VecDeque::<BTreeSet<StateId>>::new();

        let initial = self.epsilon_closure(&BTreeSet::from([0]));
        ids.insert(initial.clone(), 0);
        states.push(BTreeMap::new());
        queue.push_back(initial);
        while let Some(members) = queue.pop_front() {
            let id = ids[&members];
            // accept resolution
            let actions = members.iter().flat_map(|&st| self.states[st].accepts.iter().cloned()).to_vec();
            if let Some(&winner) = actions.iter().max() {
                accepts.insert(id, winner);
                generated.insert(winner.symbol);
                let losers = actions.iter()
                    .filter(|action| action.symbol != winner.symbol)
                    .cloned()
                    .collect::<BTreeSet<_>>();
                for action in &losers {
                    clashes.entry(action.symbol).or_default().insert(winner.symbol);
                }
                if !losers.is_empty() {
                    overridden.insert(id, losers.into_iter().to_vec());
                }
            }
            // successors
            let mut successors = BTreeMap::<SetId, BTreeSet<StateId>>::new();
            for &st in &members {
                for &(set, target) in &self.states[st].transitions {
                    successors.entry(set).or_default().insert(target);
                }
            }
            let mut transitions = BTreeMap::<SetId, StateId>::new();
            for (set, targets) in successors {
                let closure = self.epsilon_closure(&targets);
                let target_id = match ids.get(&closure) {
                    Some(&target_id) => target_id,
                    None => {
                        let target_id = states.len();
                        states.push(BTreeMap::new());
                        ids.insert(closure.clone(), target_id);
                        queue.push_back(closure);
                        target_id
                    }
                };
                transitions.insert(set, target_id);
            }
            states[id] = transitions;
        }
        Dfa { states, accepts, overridden, symbols: self.symbols, initial_state: 0, clashes, generated }
    }
}

// ---------------------------------------------------------------------------------------------
// NFA builder

struct Frame {
    entry: StateId,
    previous: StateId,
    exits: Vec<StateId>,
}

/// Imperative construction of NFA fragments. `push`/`pop` bracket a subexpression,
/// `begin_or` starts an alternative branch rejoining at the subexpression exit.
/// When case-insensitive, a literal character matches its case variants as well.
pub struct NfaBuilder<'a> {
    nfa: &'a mut Nfa,
    current: StateId,
    previous: StateId,
    stack: Vec<Frame>,
    lowercase: bool,
    uppercase: bool,
}

impl<'a> NfaBuilder<'a> {
    pub fn new(nfa: &'a mut Nfa, start: StateId) -> Self {
        NfaBuilder { nfa, current: start, previous: start, stack: Vec::new(), lowercase: false, uppercase: false }
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn previous_state(&self) -> StateId {
        self.previous
    }

    pub fn goto_state(&mut self, state: StateId) {
        self.previous = self.current;
        self.current = state;
    }

    pub fn set_case_options(&mut self, lowercase: bool, uppercase: bool) {
        self.lowercase = lowercase;
        self.uppercase = uppercase;
    }

    pub fn case_options(&self) -> (bool, bool) {
        (self.lowercase, self.uppercase)
    }

    /// Opens a subexpression frame.
    pub fn push(&mut self) {
        self.stack.push(Frame { entry: self.current, previous: self.previous, exits: Vec::new() });
    }

    /// Terminates the current branch and rewinds to the subexpression entry, so the
    /// next transitions form an alternative.
    pub fn begin_or(&mut self) {
        let frame = self.stack.last_mut().expect("begin_or without a push");
        frame.exits.push(self.current);
        self.current = frame.entry;
    }

    /// Closes the subexpression frame; all the branch ends are joined at a common
    /// exit state, which becomes the current state.
    pub fn pop(&mut self) {
        let frame = self.stack.pop().expect("pop without a push");
        if frame.exits.is_empty() {
            self.previous = frame.previous;
        } else {
            let exit = self.nfa.add_state();
            for end in frame.exits {
                self.nfa.add_epsilon(end, exit);
            }
            self.nfa.add_epsilon(self.current, exit);
            self.previous = frame.entry;
            self.current = exit;
        }
    }

    /// Moves the current state behind a fresh ε-transition, so that loop-back edges
    /// added by repetition operators cannot reach unrelated branches of the entry
    /// state.
    pub fn isolate(&mut self) -> StateId {
        let state = self.nfa.add_state();
        self.nfa.add_epsilon(self.current, state);
        self.previous = self.current;
        self.current = state;
        state
    }

    pub fn epsilon(&mut self, from: StateId, to: StateId) {
        self.nfa.add_epsilon(from, to);
    }

    /// Consumes a set of symbols.
    pub fn transit(&mut self, symbols: Segments) {
        let next = self.nfa.add_state();
        self.nfa.add_transition(self.current, symbols, next);
        self.previous = self.current;
        self.current = next;
    }

    /// Consumes one literal character, with its case variants when insensitive.
    /// Characters with multi-character case mappings keep their original case.
    pub fn literal_char(&mut self, c: char) {
        let mut symbols = Segments::from_char(c);
        if self.lowercase {
            let lower = c.to_lowercase().to_vec();
            if lower.len() == 1 {
                symbols |= Seg::from_char(lower[0]);
            }
        }
        if self.uppercase {
            let upper = c.to_uppercase().to_vec();
            if upper.len() == 1 {
                symbols |= Seg::from_char(upper[0]);
            }
        }
        self.transit(symbols);
    }

    /// Consumes a literal string, character by character.
    pub fn literal(&mut self, s: &str) {
        for c in s.chars() {
            self.literal_char(c);
        }
    }

    /// Attaches an accept action to the current state.
    pub fn accept(&mut self, action: AcceptAction) {
        self.nfa.add_accept(self.current, action);
    }
}

// ---------------------------------------------------------------------------------------------
// DFA

/// Deterministic automaton: at most one transition per (state, set id) and at most
/// one accept action per state.
#[derive(Clone, Debug)]
pub struct Dfa {
    pub(crate) states: Vec<BTreeMap<SetId, StateId>>,
    pub(crate) accepts: BTreeMap<StateId, AcceptAction>,
    pub(crate) overridden: BTreeMap<StateId, Vec<AcceptAction>>,
    pub(crate) symbols: SymbolMap,
    pub(crate) initial_state: StateId,
    pub(crate) clashes: BTreeMap<TokenId, BTreeSet<TokenId>>,
    pub(crate) generated: BTreeSet<TokenId>,
}

impl Dfa {
    pub fn count_states(&self) -> usize {
        self.states.len()
    }

    pub fn symbols(&self) -> &SymbolMap {
        &self.symbols
    }

    pub fn initial_state(&self) -> StateId {
        self.initial_state
    }

    pub fn transitions(&self, state: StateId) -> &BTreeMap<SetId, StateId> {
        &self.states[state]
    }

    pub fn accept_for(&self, state: StateId) -> Option<&AcceptAction> {
        self.accepts.get(&state)
    }

    pub fn accepts_mut(&mut self) -> &mut BTreeMap<StateId, AcceptAction> {
        &mut self.accepts
    }

    /// Accept actions that lost the priority resolution, per state.
    pub fn overridden(&self) -> &BTreeMap<StateId, Vec<AcceptAction>> {
        &self.overridden
    }

    /// Symbols emitted by at least one state.
    pub fn generated_symbols(&self) -> &BTreeSet<TokenId> {
        &self.generated
    }

    /// For a losing symbol, the symbols that are generated instead.
    pub fn clashes(&self) -> &BTreeMap<TokenId, BTreeSet<TokenId>> {
        &self.clashes
    }

    /// `δ(state, set)`, `None` = reject.
    pub fn run_set(&self, state: StateId, set: SetId) -> Option<StateId> {
        self.states[state].get(&set).cloned()
    }

    /// `δ(state, codepoint)`, `None` = reject.
    pub fn run(&self, state: StateId, value: u32) -> Option<StateId> {
        let set = self.symbols.set_for(value)?;
        self.run_set(state, set)
    }

    /// Classical minimisation by partition refinement: starts from the partition
    /// induced by the accept actions, then splits groups until every state in a
    /// group has the same transition signature over groups.
    pub fn to_compact_dfa(self) -> Dfa {
        let mut group_of = vec![0_usize; self.states.len()];
        let mut initial_groups = BTreeMap::<Option<AcceptAction>, usize>::new();
        for st in 0..self.states.len() {
            let key = self.accepts.get(&st).cloned();
            // accept keys are mapped in BTreeMap order, which is deterministic
            let next = initial_groups.len();
            let group = *initial_groups.entry(key).or_insert(next);
            group_of[st] = group;
        }
        loop {
            let mut signatures = BTreeMap::<(usize, Vec<(SetId, usize)>), usize>::new();
            let mut new_group_of = vec![0_usize; self.states.len()];
            for st in 0..self.states.len() {
                let signature = (
                    group_of[st],
                    self.states[st].iter().map(|(&set, &target)| (set, group_of[target])).to_vec()
                );
                let next = signatures.len();
                new_group_of[st] = *signatures.entry(signature).or_insert(next);
            }
            let stable = new_group_of == group_of;
            group_of = new_group_of;
            if stable {
                break;
            }
        }
        // renumbers the groups by their smallest member, which keeps the numbering
        // deterministic and the initial state first
        let mut representative = BTreeMap::<usize, StateId>::new();
        for st in (0..self.states.len()).rev() {
            representative.insert(group_of[st], st);
        }
        let mut order = representative.iter().map(|(&group, &st)| (st, group)).to_vec();
        order.sort();
        let renumber: BTreeMap<usize, StateId> = order.iter().enumerate().map(|(new, &(_, group))| (group, new)).collect();

        let mut states = Vec::<BTreeMap<SetId, StateId>>::new();
        let mut accepts = BTreeMap::<StateId, AcceptAction>::new();
        let mut overridden = BTreeMap::<StateId, Vec<AcceptAction>>::new();
        for &(st, group) in &order {
            let new_id = renumber[&group];
            debug_assert_eq!(new_id, states.len());
            states.push(self.states[st].iter().map(|(&set, &target)| (set, renumber[&group_of[target]])).collect());
            if let Some(&action) = self.accepts.get(&st) {
                accepts.insert(new_id, action);
            }
            if let Some(losers) = self.overridden.get(&st) {
                overridden.insert(new_id, losers.clone());
            }
        }
        Dfa {
            states,
            accepts,
            overridden,
            symbols: self.symbols,
            initial_state: renumber[&group_of[self.initial_state]],
            clashes: self.clashes,
            generated: self.generated,
        }
    }

    /// Coalesces the set ids whose transition behaviour is identical in every state,
    /// remapping both the transitions and the symbol map.
    pub fn to_dfa_with_merged_symbols(self) -> Dfa {
        // column of a set id = its target in every state where it appears
        let mut columns = BTreeMap::<SetId, BTreeMap<StateId, StateId>>::new();
        for (st, transitions) in self.states.iter().enumerate() {
            for (&set, &target) in transitions {
                columns.entry(set).or_default().insert(st, target);
            }
        }
        let mut merged = BTreeMap::<SetId, SetId>::new();     // old -> representative
        let mut groups = BTreeMap::<Vec<(StateId, StateId)>, SetId>::new();
        for (&set, column) in &columns {
            let key = column.iter().map(|(&a, &b)| (a, b)).to_vec();
            let repr = *groups.entry(key).or_insert(set);
            merged.insert(set, repr);
        }
        // dense new numbering in ascending representative order
        let mut new_ids = BTreeMap::<SetId, SetId>::new();
        let mut symbols = SymbolMap::new();
        for (&old, &repr) in &merged {
            if old == repr {
                let mut set = self.symbols.get(repr).clone();
                for (&other, &other_repr) in &merged {
                    if other_repr == repr && other != repr {
                        set |= self.symbols.get(other);
                    }
                }
                let new_id = symbols.identifier_for_symbols(set);
                new_ids.insert(repr, new_id);
            }
        }
        let states = self.states.iter()
            .map(|transitions| transitions.iter()
                .map(|(&set, &target)| (new_ids[&merged[&set]], target))
                .collect::<BTreeMap<_, _>>())
            .collect();
        Dfa {
            states,
            accepts: self.accepts,
            overridden: self.overridden,
            symbols,
            initial_state: self.initial_state,
            clashes: self.clashes,
            generated: self.generated,
        }
    }
}

impl Display for Dfa {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (st, transitions) in self.states.iter().enumerate() {
            write!(f, "state {st}")?;
            if let Some(action) = self.accepts.get(&st) {
                write!(f, " {action}")?;
            }
            writeln!(f)?;
            for (set, target) in transitions {
                writeln!(f, "  {} -> {target}", self.symbols.get(*set))?;
            }
        }
        Ok(())
    }
}
