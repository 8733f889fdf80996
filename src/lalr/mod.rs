// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

pub(crate) mod tests;

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt::{Display, Formatter};
use crate::grammar::{Grammar, Sym};
use crate::log::{BufLog, Logger, LR_CONFLICT};
use crate::parser::{ActionKind, LrAction, ParserTables};
use crate::{CollectJoin, RuleId, StateId, TokenId, VarId};

// ---------------------------------------------------------------------------------------------

/// Lookahead symbol: a terminal, the end-of-input marker, the end-of-guard
/// pseudo-terminal, or the probe token used to discover propagation edges.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum La {
    T(TokenId),
    End,
    EndGuard,
    Probe,
}

/// LR(0) item: rule and dot position. Kernel items have dot > 0 or belong to the
/// initial items of a start state.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Item {
    pub rule: RuleId,
    pub dot: usize,
}

impl Item {
    fn advanced(&self) -> Item {
        Item { rule: self.rule, dot: self.dot + 1 }
    }
}

/// LALR state: kernel item set (the state identity) plus the lookaheads gathered for
/// each kernel item.
#[derive(Clone, Debug, Default)]
pub struct LalrState {
    pub kernel: BTreeSet<Item>,
    pub look: BTreeMap<Item, BTreeSet<La>>,
}

// ---------------------------------------------------------------------------------------------

/// Builds a LALR(1) machine from a grammar:
/// 1. LR(0) kernel skeleton (closure, GOTO, dedup by kernel),
/// 2. spontaneous lookaheads and propagation edges through the probe token,
/// 3. worklist fixpoint pushing lookaheads along the edges,
/// 4. action emission with conflict diagnostics.
///
/// Every registered start symbol gets its own augmented rule and initial state; the
/// main language is registered first, then one start per guard.
pub struct LalrBuilder<'g> {
    grammar: &'g Grammar,
    aug: Vec<(VarId, Vec<Sym>)>,
    states: Vec<LalrState>,
    gotos: Vec<BTreeMap<Sym, StateId>>,
    ids: HashMap<BTreeSet<Item>, StateId>,
    propagate: BTreeMap<(StateId, Item), BTreeSet<(StateId, Item)>>,
    initial_states: Vec<StateId>,
    first: Vec<BTreeSet<TokenId>>,
    nullable: Vec<bool>,
    pub log: BufLog,
}

impl<'g> LalrBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        let mut builder = LalrBuilder {
            grammar,
            aug: Vec::new(),
            states: Vec::new(),
            gotos: Vec::new(),
            ids: HashMap::new(),
            propagate: BTreeMap::new(),
            initial_states: Vec::new(),
            first: Vec::new(),
            nullable: Vec::new(),
            log: BufLog::new(),
        };
        builder.calc_first();
        builder
    }

    /// Builds the parser tables for `grammar` in one call: the start symbol and every
    /// guard get an initial state, then the four phases run in order.
    pub fn build(grammar: &'g Grammar, start: VarId, ignored: &BTreeSet<TokenId>) -> (ParserTables, BufLog) {
        let mut builder = LalrBuilder::new(grammar);
        builder.add_initial_state(start);
        for &g_nt in grammar.guards() {
            builder.add_initial_state(g_nt);
        }
        builder.complete_parser();
        let tables = builder.emit_actions(ignored);
        (tables, builder.log)
    }

    pub fn count_states(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> &LalrState {
        &self.states[id]
    }

    pub fn initial_states(&self) -> &[StateId] {
        &self.initial_states
    }

    /// Lookahead propagation edges, keyed by `(state, item)`.
    pub fn propagations(&self) -> &BTreeMap<(StateId, Item), BTreeSet<(StateId, Item)>> {
        &self.propagate
    }

    // ---- rules, including the augmented ones --------------------------------------------

    fn rule_nt(&self, rule: RuleId) -> VarId {
        if rule < self.grammar.count_rules() {
            self.grammar.rule(rule).nt
        } else {
            self.aug[rule - self.grammar.count_rules()].0
        }
    }

    fn rule_syms(&self, rule: RuleId) -> &[Sym] {
        if rule < self.grammar.count_rules() {
            &self.grammar.rule(rule).syms
        } else {
            &self.aug[rule - self.grammar.count_rules()].1
        }
    }

    fn is_augmented(&self, rule: RuleId) -> bool {
        rule >= self.grammar.count_rules()
    }

    fn next_sym(&self, item: &Item) -> Option<Sym> {
        self.rule_syms(item.rule).get(item.dot).cloned()
    }

    // ---- FIRST / nullable ---------------------------------------------------------------

    fn calc_first(&mut self) {
        let n = self.grammar.nonterminals.count();
        self.first = vec![BTreeSet::new(); n];
        self.nullable = vec![false; n];
        loop {
            let mut changed = false;
            for rule in self.grammar.rules() {
                if rule.nt == VarId::MAX {
                    continue; // cleared by a replace definition
                }
                let v = rule.nt as usize;
                let mut all_nullable = true;
                for sym in &rule.syms {
                    match sym {
                        Sym::T(t) => {
                            changed |= self.first[v].insert(*t);
                            all_nullable = false;
                        }
                        Sym::NT(u) => {
                            let add = self.first[*u as usize].clone();
                            for t in add {
                                changed |= self.first[v].insert(t);
                            }
                            if !self.nullable[*u as usize] {
                                all_nullable = false;
                            }
                        }
                        Sym::Guard(g) => {
                            // a guard consumes nothing but constrains the next terminals
                            let add = self.first[self.grammar.guard_nt(*g) as usize].clone();
                            for t in add {
                                changed |= self.first[v].insert(t);
                            }
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }
                if all_nullable && !self.nullable[v] {
                    self.nullable[v] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// FIRST(syms · tail): lookaheads of a symbol string followed by `tail`.
    fn seq_first(&self, syms: &[Sym], tail: &BTreeSet<La>) -> BTreeSet<La> {
        let mut out = BTreeSet::new();
        for sym in syms {
            match sym {
                Sym::T(t) => {
                    out.insert(La::T(*t));
                    return out;
                }
                Sym::NT(v) => {
                    out.extend(self.first[*v as usize].iter().map(|&t| La::T(t)));
                    if !self.nullable[*v as usize] {
                        return out;
                    }
                }
                Sym::Guard(g) => {
                    out.extend(self.first[self.grammar.guard_nt(*g) as usize].iter().map(|&t| La::T(t)));
                    // zero-width: keep scanning
                }
            }
        }
        out.extend(tail.iter().cloned());
        out
    }

    // ---- phase 1: LR(0) skeleton --------------------------------------------------------

    /// Registers a start symbol: augmented rule `S' → S` plus its kernel state.
    pub fn add_initial_state(&mut self, language: VarId) -> StateId {
        let rule = self.grammar.count_rules() + self.aug.len();
        self.aug.push((language, vec![Sym::NT(language)]));
        let kernel = BTreeSet::from([Item { rule, dot: 0 }]);
        let (state, _) = self.state_for(kernel);
        self.initial_states.push(state);
        state
    }

    fn state_for(&mut self, kernel: BTreeSet<Item>) -> (StateId, bool) {
        match self.ids.get(&kernel) {
            Some(&id) => (id, false),
            None => {
                let id = self.states.len();
                self.ids.insert(kernel.clone(), id);
                self.states.push(LalrState { kernel, look: BTreeMap::new() });
                self.gotos.push(BTreeMap::new());
                (id, true)
            }
        }
    }

    fn closure_lr0(&self, kernel: &BTreeSet<Item>) -> BTreeSet<Item> {
        let mut closure = kernel.clone();
        let mut queue = kernel.iter().cloned().to_vec();
        while let Some(item) = queue.pop() {
            if let Some(Sym::NT(v)) = self.next_sym(&item) {
                for &rule in self.grammar.rules_for(v) {
                    let sub = Item { rule, dot: 0 };
                    if closure.insert(sub) {
                        queue.push(sub);
                    }
                }
            }
        }
        closure
    }

    fn complete_lr0(&mut self) {
        let mut queue: VecDeque<StateId> = (0..self.states.len()).collect();
        while let Some(s) = queue.pop_front() {
            let closure = self.closure_lr0(&self.states[s].kernel);
            let mut goto_kernels = BTreeMap::<Sym, BTreeSet<Item>>::new();
            for item in closure {
                if let Some(sym) = self.next_sym(&item) {
                    goto_kernels.entry(sym).or_default().insert(item.advanced());
                }
            }
            for (sym, kernel) in goto_kernels {
                let (target, new) = self.state_for(kernel);
                if new {
                    queue.push_back(target);
                }
                self.gotos[s].insert(sym, target);
            }
        }
    }

    // ---- phase 2: spontaneous lookaheads & propagation edges ----------------------------

    /// LR(1) closure of a seeded item → lookahead-set map.
    fn lr1_closure(&self, seed: BTreeMap<Item, BTreeSet<La>>) -> BTreeMap<Item, BTreeSet<La>> {
        let mut result = seed;
        let mut queue: VecDeque<Item> = result.keys().cloned().collect();
        while let Some(item) = queue.pop_front() {
            if let Some(Sym::NT(v)) = self.next_sym(&item) {
                let las = result[&item].clone();
                let beta = &self.rule_syms(item.rule)[item.dot + 1..];
                let new_las = self.seq_first(beta, &las);
                for &rule in self.grammar.rules_for(v) {
                    let sub = Item { rule, dot: 0 };
                    let entry = result.entry(sub).or_default();
                    let before = entry.len();
                    entry.extend(new_las.iter().cloned());
                    if entry.len() != before {
                        queue.push_back(sub);
                    }
                }
            }
        }
        result
    }

    /// Probes every kernel item with the probe token: a lookahead that surfaces
    /// spontaneously becomes an initial lookahead on the GOTO image; a probe that
    /// surfaces becomes a propagation edge.
    fn calc_propagation(&mut self) {
        for s in 0..self.states.len() {
            let kernel = self.states[s].kernel.clone();
            for item in kernel {
                let seed = BTreeMap::from([(item, BTreeSet::from([La::Probe]))]);
                let closure = self.lr1_closure(seed);
                for (citem, las) in closure {
                    if let Some(sym) = self.next_sym(&citem) {
                        let target = self.gotos[s][&sym];
                        let titem = citem.advanced();
                        for la in las {
                            if la == La::Probe {
                                self.propagate.entry((s, item)).or_default().insert((target, titem));
                            } else {
                                self.states[target].look.entry(titem).or_default().insert(la);
                            }
                        }
                    }
                }
            }
        }
    }

    // ---- phase 3: fixpoint --------------------------------------------------------------

    fn complete_lookaheads(&mut self) {
        for (idx, &s) in self.initial_states.iter().enumerate() {
            let la = if idx == 0 { La::End } else { La::EndGuard };
            let item = *self.states[s].kernel.first().unwrap();
            self.states[s].look.entry(item).or_default().insert(la);
        }
        let mut queue: VecDeque<(StateId, Item)> = self.propagate.keys().cloned().collect();
        while let Some((s, item)) = queue.pop_front() {
            let las = match self.states[s].look.get(&item) {
                Some(las) => las.clone(),
                None => continue
            };
            let targets = match self.propagate.get(&(s, item)) {
                Some(targets) => targets.clone(),
                None => continue
            };
            for (target, titem) in targets {
                let entry = self.states[target].look.entry(titem).or_default();
                let before = entry.len();
                entry.extend(las.iter().cloned());
                if entry.len() != before {
                    queue.push_back((target, titem));
                }
            }
        }
    }

    /// Runs phases 1–3; the machine then carries complete lookaheads.
    pub fn complete_parser(&mut self) {
        self.complete_lr0();
        self.calc_propagation();
        self.complete_lookaheads();
    }

    // ---- phase 4: action emission -------------------------------------------------------

    /// Emits the action tables. Reduces on weak terminals become weak-reduce; guard
    /// symbols produce guard actions on the terminals that can begin the guarded
    /// fragment, plus a divert on the guard's nonterminal. `ignored` terminals get
    /// ignore actions where they have no other meaning. Conflicts remaining after
    /// weak-reduce and guards are reported but do not abort; the first action in
    /// emission order wins at runtime.
    pub fn emit_actions(&mut self, ignored: &BTreeSet<TokenId>) -> ParserTables {
        let grammar = self.grammar;
        let num_nt = grammar.nonterminals.count();
        let end_of_input = num_nt as u32;
        let end_of_guard = num_nt as u32 + 1;
        let mut t_actions = Vec::<Vec<LrAction>>::new();
        let mut nt_actions = Vec::<Vec<LrAction>>::new();

        for s in 0..self.states.len() {
            let mut t_rows = BTreeMap::<u32, Vec<LrAction>>::new();
            let mut nt_rows = BTreeMap::<u32, Vec<LrAction>>::new();
            // guard actions come first: a failed guard falls through to the other actions
            for (sym, &target) in &self.gotos[s] {
                if let Sym::Guard(g) = sym {
                    let g_nt = grammar.guard_nt(*g);
                    for &t in &self.first[g_nt as usize] {
                        t_rows.entry(t as u32).or_default()
                            .push(LrAction { symbol: t as u32, kind: ActionKind::Guard, target: *g as usize });
                    }
                    nt_rows.entry(g_nt as u32).or_default()
                        .push(LrAction { symbol: g_nt as u32, kind: ActionKind::Divert, target });
                }
            }
            for (sym, &target) in &self.gotos[s] {
                match sym {
                    Sym::T(t) => t_rows.entry(*t as u32).or_default()
                        .push(LrAction { symbol: *t as u32, kind: ActionKind::Shift, target }),
                    Sym::NT(v) => nt_rows.entry(*v as u32).or_default()
                        .push(LrAction { symbol: *v as u32, kind: ActionKind::Goto, target }),
                    Sym::Guard(_) => {}
                }
            }
            // reduces, from the lookahead-annotated closure (ε-rules reduce from
            // non-kernel items, so the kernel alone is not enough)
            let mut seed = BTreeMap::new();
            for item in &self.states[s].kernel {
                let las = self.states[s].look.get(item).cloned().unwrap_or_default();
                seed.insert(*item, las);
            }
            let closure = self.lr1_closure(seed);
            for (item, las) in closure {
                if self.next_sym(&item).is_some() {
                    continue;
                }
                let accept = self.is_augmented(item.rule);
                for la in las {
                    match la {
                        La::T(t) => {
                            let kind = if grammar.terminals.is_weak(t) { ActionKind::WeakReduce } else { ActionKind::Reduce };
                            t_rows.entry(t as u32).or_default()
                                .push(LrAction { symbol: t as u32, kind, target: item.rule });
                        }
                        La::End => nt_rows.entry(end_of_input).or_default()
                            .push(LrAction {
                                symbol: end_of_input,
                                kind: if accept { ActionKind::Accept } else { ActionKind::Reduce },
                                target: item.rule,
                            }),
                        La::EndGuard => nt_rows.entry(end_of_guard).or_default()
                            .push(LrAction {
                                symbol: end_of_guard,
                                kind: if accept { ActionKind::Accept } else { ActionKind::Reduce },
                                target: item.rule,
                            }),
                        La::Probe => {}
                    }
                }
            }
            // ignored terminals are dropped where they have no other meaning
            for &t in ignored {
                t_rows.entry(t as u32).or_insert_with(||
                    vec![LrAction { symbol: t as u32, kind: ActionKind::Ignore, target: 0 }]);
            }
            self.check_conflicts(s, &t_rows);
            t_actions.push(t_rows.into_values().flatten().to_vec());
            nt_actions.push(nt_rows.into_values().flatten().to_vec());
        }

        let mut rules = grammar.rules().iter()
            .map(|rule| (rule.nt, rule.syms.len()))
            .to_vec();
        rules.extend(self.aug.iter().map(|(nt, syms)| (*nt, syms.len())));
        let guards = grammar.guards().iter().enumerate()
            .map(|(idx, &g_nt)| (self.initial_states[idx + 1], g_nt))
            .to_vec();
        ParserTables {
            num_t: grammar.terminals.count(),
            num_nt,
            t_actions,
            nt_actions,
            rules,
            guards,
            initial_state: self.initial_states[0],
        }
    }

    fn check_conflicts(&mut self, state: StateId, t_rows: &BTreeMap<u32, Vec<LrAction>>) {
        for (&symbol, row) in t_rows {
            let shifts = row.iter().filter(|a| a.kind == ActionKind::Shift).count();
            let reduces = row.iter().filter(|a| a.kind == ActionKind::Reduce).count();
            let resolved = row.iter().any(|a| matches!(a.kind, ActionKind::WeakReduce | ActionKind::Guard));
            if resolved {
                continue;
            }
            let name = self.grammar.terminals.name_for(symbol as TokenId).to_string();
            if shifts > 0 && reduces > 0 {
                self.log.add_warning(LR_CONFLICT,
                    format!("unresolved shift/reduce conflict in state {state} on '{name}'"));
            } else if reduces > 1 {
                self.log.add_warning(LR_CONFLICT,
                    format!("unresolved reduce/reduce conflict in state {state} on '{name}'"));
            }
        }
    }
}

impl Display for LalrBuilder<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (s, state) in self.states.iter().enumerate() {
            writeln!(f, "state {s}:")?;
            for item in &state.kernel {
                let syms = self.rule_syms(item.rule);
                let mut parts = syms.iter().map(|sym| sym.to_str(self.grammar)).to_vec();
                parts.insert(item.dot, "•".to_string());
                let las = state.look.get(item)
                    .map(|las| las.iter().map(|la| format!("{la:?}")).join(", "))
                    .unwrap_or_default();
                writeln!(f, "  {} -> {} [{las}]",
                         self.grammar.nonterminals.name_for(self.rule_nt(item.rule)), parts.join(" "))?;
            }
            for (sym, target) in &self.gotos[s] {
                writeln!(f, "  {} => {target}", sym.to_str(self.grammar))?;
            }
        }
        Ok(())
    }
}
