// Copyright (c) 2025 Redglyph (@gmail.com). All Rights Reserved.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use iter_index::IndexerIterator;
use crate::segments::Segments;
use crate::{CollectJoin, SetId};

/// Assigns dense numeric ids to symbol sets. Two structurally equal sets get the
/// same id; nothing prevents different sets from overlapping until the map goes
/// through [RemappedSymbolMap::deduplicate].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolMap {
    sets: Vec<Segments>,
}

impl SymbolMap {
    pub fn new() -> Self {
        SymbolMap { sets: Vec::new() }
    }

    /// Returns the id of `symbols`, allocating a new one for a set not seen before.
    pub fn identifier_for_symbols(&mut self, symbols: Segments) -> SetId {
        match self.sets.iter().position(|s| *s == symbols) {
            Some(id) => id as SetId,
            None => {
                self.sets.push(symbols);
                (self.sets.len() - 1) as SetId
            }
        }
    }

    pub fn get(&self, id: SetId) -> &Segments {
        &self.sets[id as usize]
    }

    pub fn count_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SetId, &Segments)> {
        self.sets.iter().index()
    }

    /// First set containing `value`. Unique once the map is deduplicated.
    pub fn set_for(&self, value: u32) -> Option<SetId> {
        self.sets.iter().position(|s| s.contains_value(value)).map(|id| id as SetId)
    }
}

impl Display for SymbolMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.iter().map(|(id, s)| format!("{id}: {s}")).join(", "))
    }
}

// ---------------------------------------------------------------------------------------------

/// Result of deduplicating a [SymbolMap]: a map whose sets are pairwise disjoint,
/// with fresh ids, plus the reverse mapping from each new id to the old ids whose
/// ranges cover it.
#[derive(Clone, Debug)]
pub struct RemappedSymbolMap {
    map: SymbolMap,
    old_symbols: Vec<BTreeSet<SetId>>,           // new id -> old ids
    new_symbols: HashMap<SetId, BTreeSet<SetId>>, // old id -> new ids
}

impl RemappedSymbolMap {
    /// Builds the minimal partition whose blocks are whole ranges of the source map:
    /// sweeps all distinct range endpoints, labels each elementary block with the set
    /// of old ids covering it, and allocates one fresh id per distinct label, in
    /// sweep order.
    pub fn deduplicate(source: &SymbolMap) -> RemappedSymbolMap {
        let mut endpoints = BTreeSet::<u32>::new();
        for (_, set) in source.iter() {
            for seg in set.iter() {
                endpoints.insert(seg.0);
                endpoints.insert(seg.1);
            }
        }
        let mut map = SymbolMap::new();
        let mut old_symbols = Vec::<BTreeSet<SetId>>::new();
        let mut ids = HashMap::<Vec<SetId>, SetId>::new();
        let mut new_symbols = HashMap::<SetId, BTreeSet<SetId>>::new();
        let endpoints = endpoints.into_iter().collect::<Vec<_>>();
        for pair in endpoints.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let olds = source.iter()
                .filter_map(|(id, set)| if set.contains_value(a) { Some(id) } else { None })
                .to_vec();
            if olds.is_empty() {
                continue;
            }
            let new_id = *ids.entry(olds.clone()).or_insert_with(|| {
                let id = map.sets.len() as SetId;
                map.sets.push(Segments::empty());
                old_symbols.push(BTreeSet::from_iter(olds.iter().cloned()));
                for &old in &olds {
                    new_symbols.entry(old).or_default().insert(id);
                }
                id
            });
            map.sets[new_id as usize].insert(crate::segments::Seg(a, b));
        }
        for set in &mut map.sets {
            set.normalize();
        }
        RemappedSymbolMap { map, old_symbols, new_symbols }
    }

    pub fn map(&self) -> &SymbolMap {
        &self.map
    }

    pub fn into_map(self) -> SymbolMap {
        self.map
    }

    /// Old set ids covering the new set `id`.
    pub fn old_symbols(&self, id: SetId) -> &BTreeSet<SetId> {
        &self.old_symbols[id as usize]
    }

    /// New set ids making up the old set `id`.
    pub fn new_symbols(&self, id: SetId) -> Option<&BTreeSet<SetId>> {
        self.new_symbols.get(&id)
    }
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------
