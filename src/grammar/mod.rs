// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.


use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use iter_index::IndexerIterator;
use crate::dfa::UnitKind;
use crate::{CollectJoin, GuardId, RuleId, TokenId, VarId};

// ---------------------------------------------------------------------------------------------
// Dictionaries

/// Terminal dictionary: injective name → id, insertion-ordered, append-only once the
/// grammar is closed. Each terminal carries the kind of the unit that defined it.
#[derive(Clone, Debug, Default)]
pub struct Terminals {
    names: Vec<String>,
    kinds: Vec<UnitKind>,
    by_name: HashMap<String, TokenId>,
}

impl Terminals {
    pub fn new() -> Self {
        Terminals::default()
    }

    /// Adds a terminal; `None` when the name is already defined.
    pub fn add(&mut self, name: &str, kind: UnitKind) -> Option<TokenId> {
        if self.by_name.contains_key(name) {
            return None;
        }
        let id = self.names.len() as TokenId;
        self.names.push(name.to_string());
        self.kinds.push(kind);
        self.by_name.insert(name.to_string(), id);
        Some(id)
    }

    pub fn id_for(&self, name: &str) -> Option<TokenId> {
        self.by_name.get(name).cloned()
    }

    pub fn name_for(&self, id: TokenId) -> &str {
        &self.names[id as usize]
    }

    pub fn kind_for(&self, id: TokenId) -> UnitKind {
        self.kinds[id as usize]
    }

    pub fn is_weak(&self, id: TokenId) -> bool {
        self.kinds[id as usize].is_weak()
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str)> {
        self.names.iter().index().map(|(id, name)| (id, name.as_str()))
    }
}

/// Kind of a nonterminal: plain, or the EBNF compound it was materialised from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NtKind { Plain, Optional, RepeatZero, RepeatOne, Alternative, Guard }

impl NtKind {
    fn prefix(&self) -> &'static str {
        match self {
            NtKind::Plain => "nt",
            NtKind::Optional => "opt",
            NtKind::RepeatZero => "rep0",
            NtKind::RepeatOne => "rep1",
            NtKind::Alternative => "alt",
            NtKind::Guard => "guard",
        }
    }
}

/// Nonterminal dictionary, analogous to [Terminals], with the item-kind back-reference.
#[derive(Clone, Debug, Default)]
pub struct Nonterminals {
    names: Vec<String>,
    kinds: Vec<NtKind>,
    by_name: HashMap<String, VarId>,
}

impl Nonterminals {
    pub fn new() -> Self {
        Nonterminals::default()
    }

    pub fn add(&mut self, name: &str, kind: NtKind) -> Option<VarId> {
        if self.by_name.contains_key(name) {
            return None;
        }
        let id = self.names.len() as VarId;
        self.names.push(name.to_string());
        self.kinds.push(kind);
        self.by_name.insert(name.to_string(), id);
        Some(id)
    }

    /// Id for `name`, registering it as a plain nonterminal on first reference.
    pub fn id_or_add(&mut self, name: &str) -> VarId {
        match self.by_name.get(name) {
            Some(&id) => id,
            None => self.add(name, NtKind::Plain).unwrap()
        }
    }

    pub fn id_for(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).cloned()
    }

    pub fn name_for(&self, id: VarId) -> &str {
        &self.names[id as usize]
    }

    pub fn kind_for(&self, id: VarId) -> NtKind {
        self.kinds[id as usize]
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &str)> {
        self.names.iter().index().map(|(id, name)| (id, name.as_str()))
    }
}

// ---------------------------------------------------------------------------------------------
// Items and rules

/// EBNF item of a production. Compound items own their sub-rule (item sequence) and
/// are materialised as anonymous nonterminals during lowering.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum GrItem {
    T(TokenId),
    NT(VarId),
    Optional(Vec<GrItem>),
    RepeatZero(Vec<GrItem>),
    RepeatOne(Vec<GrItem>),
    Alternative(Vec<GrItem>, Vec<GrItem>),
    Guard(Vec<GrItem>),
    Paren(Vec<GrItem>),
}

/// Plain-rule symbol after lowering. Guards are zero-width symbols checked by
/// lookahead simulation at parse time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Sym {
    T(TokenId),
    NT(VarId),
    Guard(GuardId),
}

impl Sym {
    pub fn to_str(&self, grammar: &Grammar) -> String {
        match self {
            Sym::T(id) => grammar.terminals.name_for(*id).to_string(),
            Sym::NT(id) => grammar.nonterminals.name_for(*id).to_string(),
            Sym::Guard(id) => format!("{{{{{}}}}}", grammar.nonterminals.name_for(grammar.guard_nt(*id))),
        }
    }
}

/// Plain rule: owning nonterminal and symbol sequence (empty = ε).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Rule {
    pub nt: VarId,
    pub syms: Vec<Sym>,
}

impl Rule {
    /// Content-based identifier, usable as a map key. `DefaultHasher::new()` uses
    /// fixed keys, which keeps the identifiers stable across builds.
    pub fn identifier(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.nt.hash(&mut hasher);
        self.syms.hash(&mut hasher);
        hasher.finish()
    }

    pub fn to_str(&self, grammar: &Grammar) -> String {
        format!("{} -> {}", grammar.nonterminals.name_for(self.nt),
                if self.syms.is_empty() { "ε".to_string() } else { self.syms.iter().map(|s| s.to_str(grammar)).join(" ") })
    }
}

// ---------------------------------------------------------------------------------------------
// Grammar

/// The grammar model: dictionaries, lowered rules, and the guard list. Compound EBNF
/// items become anonymous nonterminals whose identifier is a deterministic hash of
/// their contents, so identical sub-patterns share one definition.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    pub terminals: Terminals,
    pub nonterminals: Nonterminals,
    rules: Vec<Rule>,
    rules_for: Vec<Vec<RuleId>>,
    guards: Vec<VarId>,
    guard_for: HashMap<VarId, GuardId>,
    anonymous: HashMap<u64, VarId>,
    pub start: Option<VarId>,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar::default()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn count_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn rules_for(&self, nt: VarId) -> &[RuleId] {
        static EMPTY: &[RuleId] = &[];
        self.rules_for.get(nt as usize).map(|r| r.as_slice()).unwrap_or(EMPTY)
    }

    pub fn has_rules(&self, nt: VarId) -> bool {
        !self.rules_for(nt).is_empty()
    }

    /// Empties the rules of `nt` (the replace definition operator).
    pub fn clear_rules_for(&mut self, nt: VarId) {
        let cleared = std::mem::take(&mut self.rules_for[nt as usize]);
        for id in cleared {
            self.rules[id].syms.clear();
            self.rules[id].nt = VarId::MAX; // dead rule, kept to preserve rule ids
        }
    }

    pub fn guards(&self) -> &[VarId] {
        &self.guards
    }

    pub fn guard_nt(&self, guard: GuardId) -> VarId {
        self.guards[guard as usize]
    }

    /// Adds a production for `nt`, lowering compound items. Returns the rule id.
    pub fn add_rule(&mut self, nt: VarId, items: &[GrItem]) -> RuleId {
        let syms = self.lower_seq(items);
        self.push_rule(nt, syms)
    }

    fn push_rule(&mut self, nt: VarId, syms: Vec<Sym>) -> RuleId {
        let id = self.rules.len();
        self.rules.push(Rule { nt, syms });
        if self.rules_for.len() <= nt as usize {
            self.rules_for.resize(nt as usize + 1, Vec::new());
        }
        self.rules_for[nt as usize].push(id);
        id
    }

    fn lower_seq(&mut self, items: &[GrItem]) -> Vec<Sym> {
        let mut syms = Vec::new();
        for item in items {
            self.lower_item(item, &mut syms);
        }
        syms
    }

    fn lower_item(&mut self, item: &GrItem, out: &mut Vec<Sym>) {
        match item {
            GrItem::T(id) => out.push(Sym::T(*id)),
            GrItem::NT(id) => out.push(Sym::NT(*id)),
            GrItem::Paren(sub) => {
                for item in sub {
                    self.lower_item(item, out);
                }
            }
            GrItem::Optional(sub) => {
                let q = self.anonymous_for(item, NtKind::Optional, |g, q| {
                    let syms = g.lower_seq(sub);
                    g.push_rule(q, syms);
                    g.push_rule(q, vec![]);
                });
                out.push(Sym::NT(q));
            }
            GrItem::RepeatZero(sub) => {
                let q = self.anonymous_for(item, NtKind::RepeatZero, |g, q| {
                    let mut syms = vec![Sym::NT(q)];
                    syms.extend(g.lower_seq(sub));
                    g.push_rule(q, syms);
                    g.push_rule(q, vec![]);
                });
                out.push(Sym::NT(q));
            }
            GrItem::RepeatOne(sub) => {
                let q = self.anonymous_for(item, NtKind::RepeatOne, |g, q| {
                    let mut syms = vec![Sym::NT(q)];
                    syms.extend(g.lower_seq(sub));
                    g.push_rule(q, syms);
                    let syms = g.lower_seq(sub);
                    g.push_rule(q, syms);
                });
                out.push(Sym::NT(q));
            }
            GrItem::Alternative(left, right) => {
                let q = self.anonymous_for(item, NtKind::Alternative, |g, q| {
                    let syms = g.lower_seq(left);
                    g.push_rule(q, syms);
                    let syms = g.lower_seq(right);
                    g.push_rule(q, syms);
                });
                out.push(Sym::NT(q));
            }
            GrItem::Guard(sub) => {
                let q = self.anonymous_for(item, NtKind::Guard, |g, q| {
                    let syms = g.lower_seq(sub);
                    g.push_rule(q, syms);
                });
                let guard = match self.guard_for.get(&q) {
                    Some(&guard) => guard,
                    None => {
                        let guard = self.guards.len() as GuardId;
                        self.guards.push(q);
                        self.guard_for.insert(q, guard);
                        guard
                    }
                };
                out.push(Sym::Guard(guard));
            }
        }
    }

    /// Anonymous nonterminal for a compound item, shared between identical
    /// sub-patterns through the deterministic content hash. `define` synthesises the
    /// rules on first creation.
    fn anonymous_for<F>(&mut self, item: &GrItem, kind: NtKind, define: F) -> VarId
        where F: FnOnce(&mut Grammar, VarId)
    {
        let mut hasher = DefaultHasher::new();
        item.hash(&mut hasher);
        let hash = hasher.finish();
        if let Some(&q) = self.anonymous.get(&hash) {
            return q;
        }
        let name = format!("{}#{:08x}", kind.prefix(), hash as u32);
        let q = self.nonterminals.add(&name, kind)
            .unwrap_or_else(|| self.nonterminals.id_for(&name).unwrap());
        self.anonymous.insert(hash, q);
        define(self, q);
        q
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for rule in &self.rules {
            if rule.nt != VarId::MAX {
                writeln!(f, "{}", rule.to_str(self))?;
            }
        }
        Ok(())
    }
}
