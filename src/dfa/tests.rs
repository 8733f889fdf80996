#![cfg(test)]

use crate::dfa::*;
use crate::segments::{Seg, Segments};
use crate::{seg, segments};

// ---------------------------------------------------------------------------------------------
// Accept priorities

#[test]
fn accept_priority_order() {
    // (lower priority, higher priority)
    let tests = vec![
        (AcceptAction::bare(0), AcceptAction::language(5, UnitKind::Ignore, false)),
        (AcceptAction::language(0, UnitKind::Keywords, false), AcceptAction::language(5, UnitKind::WeakLexer, true)),
        (AcceptAction::language(0, UnitKind::Lexer, false), AcceptAction::language(5, UnitKind::Keywords, false)),
        (AcceptAction::language(0, UnitKind::Ignore, false), AcceptAction::language(5, UnitKind::Lexer, false)),
        (AcceptAction::language(0, UnitKind::WeakLexer, true), AcceptAction::language(5, UnitKind::WeakKeywords, true)),
        (AcceptAction::language(5, UnitKind::Lexer, false), AcceptAction::language(2, UnitKind::Lexer, false)),
        (AcceptAction::bare(5), AcceptAction::bare(2)),
    ];
    for (idx, (low, high)) in tests.into_iter().enumerate() {
        assert!(low < high, "test {idx} failed: {low} should rank below {high}");
        assert_eq!([low, high].into_iter().max(), Some(high), "test {idx} failed");
    }
}

#[test]
fn accept_priority_total() {
    // the maximum among any set of distinct language accepts is unique
    let actions = vec![
        AcceptAction::language(0, UnitKind::Keywords, false),
        AcceptAction::language(1, UnitKind::Lexer, false),
        AcceptAction::language(2, UnitKind::WeakKeywords, true),
        AcceptAction::language(3, UnitKind::Ignore, false),
        AcceptAction::bare(4),
    ];
    let max = actions.iter().max().unwrap();
    assert_eq!(max.symbol, 2);
    assert_eq!(actions.iter().filter(|a| *a == max).count(), 1);
}

// ---------------------------------------------------------------------------------------------
// Builder

/// `/a|b/` with a single accept
fn build_a_or_b() -> Nfa {
    let mut nfa = Nfa::new();
    let mut cons = nfa.builder(0);
    cons.push();
    cons.literal_char('a');
    cons.begin_or();
    cons.literal_char('b');
    cons.pop();
    cons.accept(AcceptAction::language(0, UnitKind::Lexer, false));
    nfa
}

#[test]
fn builder_alternation() {
    // scenario: /a|b/ compiled to a DFA accepting exactly 'a' and 'b'
    let dfa = build_a_or_b().to_nfa_with_unique_symbols().to_dfa();
    let st_a = dfa.run(0, 'a' as u32);
    let st_b = dfa.run(0, 'b' as u32);
    assert!(st_a.is_some());
    assert!(st_b.is_some());
    assert_eq!(dfa.run(0, 'c' as u32), None);
    assert_eq!(dfa.accept_for(st_a.unwrap()).map(|a| a.symbol), Some(0));
    assert_eq!(dfa.accept_for(st_b.unwrap()).map(|a| a.symbol), Some(0));
    assert_eq!(dfa.accept_for(0), None);
}

#[test]
fn builder_case_insensitive() {
    let mut nfa = Nfa::new();
    let mut cons = nfa.builder(0);
    cons.set_case_options(true, true);
    cons.literal("if");
    cons.accept(AcceptAction::language(1, UnitKind::Keywords, false));
    let dfa = nfa.to_nfa_with_unique_symbols().to_dfa();
    for text in ["if", "IF", "If", "iF"] {
        let mut st = 0;
        for c in text.chars() {
            st = dfa.run(st, c as u32).expect("rejected");
        }
        assert_eq!(dfa.accept_for(st).map(|a| a.symbol), Some(1), "'{text}' not accepted");
    }
    assert_eq!(dfa.run(0, 'j' as u32), None);
}

#[test]
fn builder_nested_or() {
    // (a|b)(c|d)
    let mut nfa = Nfa::new();
    let mut cons = nfa.builder(0);
    cons.push();
    cons.literal_char('a');
    cons.begin_or();
    cons.literal_char('b');
    cons.pop();
    cons.push();
    cons.literal_char('c');
    cons.begin_or();
    cons.literal_char('d');
    cons.pop();
    cons.accept(AcceptAction::language(0, UnitKind::Lexer, false));
    let dfa = nfa.to_nfa_with_unique_symbols().to_dfa();
    for (idx, (text, expected)) in [("ac", true), ("ad", true), ("bc", true), ("bd", true),
                                    ("ab", false), ("a", false), ("cd", false)].into_iter().enumerate() {
        let mut st = Some(0);
        for c in text.chars() {
            st = st.and_then(|s| dfa.run(s, c as u32));
        }
        let accepted = st.map(|s| dfa.accept_for(s).is_some()).unwrap_or(false);
        assert_eq!(accepted, expected, "test {idx} ('{text}') failed");
    }
}

// ---------------------------------------------------------------------------------------------
// Unique symbols

#[test]
fn unique_symbols_refine() {
    // [a-z] overlaps 'a': the partition must refine both
    let mut nfa = Nfa::new();
    let s1 = nfa.add_state();
    let s2 = nfa.add_state();
    nfa.add_transition(0, segments!['a'-'z'], s1);
    nfa.add_transition(0, segments!['a'], s2);
    let unique = nfa.to_nfa_with_unique_symbols();
    for (_, set) in unique.symbols().iter() {
        for (_, other) in unique.symbols().iter() {
            if set != other {
                let cmp = set.intersect(other);
                assert!(cmp.common.is_empty(), "{set} and {other} overlap");
            }
        }
    }
    // state 0 now has one transition for 'a' (to both targets) and one for [b-z]
    let sets = unique.get_state(0).transitions.iter().map(|(set, _)| *set).collect::<std::collections::BTreeSet<_>>();
    assert_eq!(sets.len(), 2);
}

#[test]
fn dfa_determinism() {
    // every (state, set) has at most one successor, even with duplicated NFA transitions
    let mut nfa = Nfa::new();
    let s1 = nfa.add_state();
    let s2 = nfa.add_state();
    nfa.add_transition(0, segments!['a'-'m'], s1);
    nfa.add_transition(0, segments!['g'-'z'], s2);
    nfa.add_accept(s1, AcceptAction::language(0, UnitKind::Lexer, false));
    nfa.add_accept(s2, AcceptAction::language(1, UnitKind::Lexer, false));
    let dfa = nfa.to_nfa_with_unique_symbols().to_dfa();
    // 'g'..='m' leads to a state accepting the earlier symbol
    let st = dfa.run(0, 'h' as u32).unwrap();
    assert_eq!(dfa.accept_for(st).map(|a| a.symbol), Some(0));
    assert_eq!(dfa.run(0, 'b' as u32).map(|st| dfa.accept_for(st).map(|a| a.symbol)), Some(Some(0)));
    assert_eq!(dfa.run(0, 'x' as u32).map(|st| dfa.accept_for(st).map(|a| a.symbol)), Some(Some(1)));
}

#[test]
fn dfa_clash_recording() {
    // 'if' is both a keyword and an identifier prefix: the keyword wins, Id clashes
    let mut nfa = Nfa::new();
    let mut cons = nfa.builder(0);
    cons.push();
    cons.literal("if");
    cons.accept(AcceptAction::language(0, UnitKind::Keywords, false));
    cons.pop();
    let mut cons = nfa.builder(0);
    cons.push();
    cons.transit(segments!['a'-'z']);
    let mark = cons.current_state();
    cons.transit(segments!['a'-'z']);
    let end = cons.current_state();
    cons.epsilon(end, mark);
    cons.goto_state(mark);
    cons.accept(AcceptAction::language(1, UnitKind::Lexer, false));
    cons.pop();
    let dfa = nfa.to_nfa_with_unique_symbols().to_dfa();
    // "if" state accepts the keyword, and Id is recorded as clashing with it
    let st = dfa.run(dfa.run(0, 'i' as u32).unwrap(), 'f' as u32).unwrap();
    assert_eq!(dfa.accept_for(st).map(|a| a.symbol), Some(0));
    assert!(dfa.clashes().get(&1).map(|set| set.contains(&0)).unwrap_or(false));
    assert!(dfa.generated_symbols().contains(&0));
    assert!(dfa.generated_symbols().contains(&1));
}

// ---------------------------------------------------------------------------------------------
// Minimisation & merged symbols

#[test]
fn compact_dfa_merges_states() {
    // a(b|c)d: after 'b' and 'c' the suffix language is the same, so the states merge
    let mut nfa = Nfa::new();
    let mut cons = nfa.builder(0);
    cons.literal_char('a');
    cons.push();
    cons.literal_char('b');
    cons.begin_or();
    cons.literal_char('c');
    cons.pop();
    cons.literal_char('d');
    cons.accept(AcceptAction::language(0, UnitKind::Lexer, false));
    let dfa = nfa.to_nfa_with_unique_symbols().to_dfa();
    let compact = dfa.to_compact_dfa();
    assert!(compact.count_states() <= 4, "expected at most 4 states, got {}", compact.count_states());
    let mut st = compact.initial_state();
    for c in "abd".chars() {
        st = compact.run(st, c as u32).expect("rejected");
    }
    assert!(compact.accept_for(st).is_some());
    let mut st = compact.initial_state();
    for c in "acd".chars() {
        st = compact.run(st, c as u32).expect("rejected");
    }
    assert!(compact.accept_for(st).is_some());
}

#[test]
fn compact_dfa_keeps_accepts_apart() {
    // two distinct tokens must not collapse into one accepting state
    let mut nfa = Nfa::new();
    let mut cons = nfa.builder(0);
    cons.push();
    cons.literal_char('a');
    cons.accept(AcceptAction::language(0, UnitKind::Lexer, false));
    cons.pop();
    let mut cons = nfa.builder(0);
    cons.push();
    cons.literal_char('b');
    cons.accept(AcceptAction::language(1, UnitKind::Lexer, false));
    cons.pop();
    let compact = nfa.to_nfa_with_unique_symbols().to_dfa().to_compact_dfa();
    let st_a = compact.run(compact.initial_state(), 'a' as u32).unwrap();
    let st_b = compact.run(compact.initial_state(), 'b' as u32).unwrap();
    assert_ne!(st_a, st_b);
    assert_eq!(compact.accept_for(st_a).map(|a| a.symbol), Some(0));
    assert_eq!(compact.accept_for(st_b).map(|a| a.symbol), Some(1));
}

#[test]
fn merged_symbols() {
    // 'a' and 'b' behave identically in every state: one merged set expected
    let dfa = build_a_or_b().to_nfa_with_unique_symbols().to_dfa().to_compact_dfa();
    assert_eq!(dfa.symbols().count_sets(), 2);
    let merged = dfa.to_dfa_with_merged_symbols();
    assert_eq!(merged.symbols().count_sets(), 1);
    assert_eq!(merged.symbols().get(0), &segments!['a'-'b']);
    let st = merged.run(merged.initial_state(), 'a' as u32).unwrap();
    assert_eq!(merged.run(merged.initial_state(), 'b' as u32), Some(st));
    assert!(merged.accept_for(st).is_some());
}

#[test]
fn merged_symbols_keeps_distinct_columns() {
    // (a|b)c: the 'c' column differs from 'a'/'b' and must remain its own set
    let mut nfa = Nfa::new();
    let mut cons = nfa.builder(0);
    cons.push();
    cons.literal_char('a');
    cons.begin_or();
    cons.literal_char('b');
    cons.pop();
    cons.literal_char('c');
    cons.accept(AcceptAction::language(0, UnitKind::Lexer, false));
    let merged = nfa.to_nfa_with_unique_symbols().to_dfa().to_compact_dfa().to_dfa_with_merged_symbols();
    assert_eq!(merged.symbols().count_sets(), 2);
    let mut st = merged.initial_state();
    for c in "bc".chars() {
        st = merged.run(st, c as u32).expect("rejected");
    }
    assert!(merged.accept_for(st).is_some());
}

#[test]
fn roots_for_language_union() {
    let mut nfa = Nfa::new();
    let root = nfa.add_root();
    assert_eq!(nfa.roots(), &[root]);
    let mut cons = nfa.builder(root);
    cons.literal_char('x');
    cons.accept(AcceptAction::bare(7));
    assert_eq!(nfa.get_state(root).transitions.len(), 1);
}

#[test]
fn seg_macro() {
    assert_eq!(seg!('a'), Seg('a' as u32, 'b' as u32));
    assert_eq!(seg!('a'-'z'), Seg('a' as u32, 'z' as u32 + 1));
    assert_eq!(segments!['a', '0'-'9'], Segments::from([seg!('a'), seg!('0'-'9')]));
}
