#![cfg(test)]

use std::collections::BTreeSet;
use crate::dfa::UnitKind;
use crate::grammar::{Grammar, GrItem, NtKind};
use crate::lalr::*;
use crate::log::{LogStatus, Pos};
use crate::parser::{ActionKind, Parser, ParserToken};
use crate::{TokenId, VarId};

fn tokens(ids: &[TokenId]) -> Vec<ParserToken> {
    ids.iter().map(|&id| (id, String::new(), Pos::default())).collect()
}

fn accepts(tables: &crate::parser::ParserTables, ids: &[TokenId]) -> bool {
    Parser::new(tables).parse(tokens(ids).into_iter()).is_ok()
}

/// `s = A s B | ε`
fn balanced_grammar() -> (Grammar, VarId) {
    let mut grammar = Grammar::new();
    grammar.terminals.add("A", UnitKind::Keywords).unwrap();
    grammar.terminals.add("B", UnitKind::Keywords).unwrap();
    let s = grammar.nonterminals.add("s", NtKind::Plain).unwrap();
    grammar.add_rule(s, &[GrItem::T(0), GrItem::NT(s), GrItem::T(1)]);
    grammar.add_rule(s, &[]);
    (grammar, s)
}

#[test]
fn balanced_pairs() {
    let (grammar, s) = balanced_grammar();
    let (tables, log) = LalrBuilder::build(&grammar, s, &BTreeSet::new());
    assert!(log.has_no_errors(), "{}", log.get_messages_str());
    assert!(log.has_no_warnings(), "{}", log.get_messages_str());
    let accepted: Vec<Vec<TokenId>> = vec![vec![], vec![0, 1], vec![0, 0, 1, 1], vec![0, 0, 0, 1, 1, 1]];
    let rejected: Vec<Vec<TokenId>> = vec![vec![0, 1, 1], vec![0, 0, 1], vec![0], vec![1], vec![0, 1, 0, 1]];
    for (idx, input) in accepted.iter().enumerate() {
        assert!(accepts(&tables, input), "accept test {idx} failed for {input:?}");
    }
    for (idx, input) in rejected.iter().enumerate() {
        assert!(!accepts(&tables, input), "reject test {idx} failed for {input:?}");
    }
}

#[test]
fn expression_grammar() {
    // e = e Plus t | t ; t = Id | LPar e RPar  (left recursion is fine for LALR)
    let mut grammar = Grammar::new();
    grammar.terminals.add("Plus", UnitKind::Keywords).unwrap();  // 0
    grammar.terminals.add("Id", UnitKind::Lexer).unwrap();       // 1
    grammar.terminals.add("LPar", UnitKind::Keywords).unwrap();  // 2
    grammar.terminals.add("RPar", UnitKind::Keywords).unwrap();  // 3
    let e = grammar.nonterminals.add("e", NtKind::Plain).unwrap();
    let t = grammar.nonterminals.add("t", NtKind::Plain).unwrap();
    grammar.add_rule(e, &[GrItem::NT(e), GrItem::T(0), GrItem::NT(t)]);
    grammar.add_rule(e, &[GrItem::NT(t)]);
    grammar.add_rule(t, &[GrItem::T(1)]);
    grammar.add_rule(t, &[GrItem::T(2), GrItem::NT(e), GrItem::T(3)]);
    let (tables, log) = LalrBuilder::build(&grammar, e, &BTreeSet::new());
    assert!(log.has_no_warnings(), "{}", log.get_messages_str());
    for input in [vec![1], vec![1, 0, 1], vec![2, 1, 3], vec![2, 1, 0, 1, 3, 0, 1]] {
        assert!(accepts(&tables, &input), "accept failed for {input:?}");
    }
    for input in [vec![], vec![1, 0], vec![0, 1], vec![2, 1], vec![1, 3]] {
        assert!(!accepts(&tables, &input), "reject failed for {input:?}");
    }
}

#[test]
fn lookahead_fixpoint() {
    // after completion, lookahead(target) ⊇ lookahead(source) for every edge
    let (grammar, s) = balanced_grammar();
    let mut builder = LalrBuilder::new(&grammar);
    builder.add_initial_state(s);
    builder.complete_parser();
    assert!(!builder.propagations().is_empty());
    for (&(src_state, src_item), targets) in builder.propagations() {
        let src_look = builder.state(src_state).look.get(&src_item).cloned().unwrap_or_default();
        for &(dst_state, dst_item) in targets {
            let dst_look = builder.state(dst_state).look.get(&dst_item).cloned().unwrap_or_default();
            assert!(src_look.is_subset(&dst_look),
                    "edge ({src_state}, {src_item:?}) -> ({dst_state}, {dst_item:?}): {src_look:?} ⊄ {dst_look:?}");
        }
    }
}

#[test]
fn conflict_warning() {
    // s = s s | A is ambiguous: a shift/reduce conflict must be reported, not fatal
    let mut grammar = Grammar::new();
    grammar.terminals.add("A", UnitKind::Keywords).unwrap();
    let s = grammar.nonterminals.add("s", NtKind::Plain).unwrap();
    grammar.add_rule(s, &[GrItem::NT(s), GrItem::NT(s)]);
    grammar.add_rule(s, &[GrItem::T(0)]);
    let (tables, log) = LalrBuilder::build(&grammar, s, &BTreeSet::new());
    assert!(log.has_no_errors());
    assert!(!log.has_no_warnings());
    assert!(log.has_code(crate::log::LR_CONFLICT));
    // first action in emission order still wins at runtime
    assert!(accepts(&tables, &[0]));
}

#[test]
fn weak_terminal_reduces_weakly() {
    // reduces with a weak terminal in the lookahead become weak-reduce
    let mut grammar = Grammar::new();
    grammar.terminals.add("If", UnitKind::WeakKeywords).unwrap(); // 0
    grammar.terminals.add("Id", UnitKind::Lexer).unwrap();        // 1
    let s = grammar.nonterminals.add("s", NtKind::Plain).unwrap();
    let x = grammar.nonterminals.add("x", NtKind::Plain).unwrap();
    grammar.add_rule(s, &[GrItem::NT(x), GrItem::T(0)]);
    grammar.add_rule(x, &[GrItem::T(1)]);
    let (tables, _) = LalrBuilder::build(&grammar, s, &BTreeSet::new());
    let weak = tables.t_actions.iter().flatten()
        .filter(|a| a.kind == ActionKind::WeakReduce)
        .collect::<Vec<_>>();
    assert!(!weak.is_empty(), "expected a weak-reduce on the weak terminal");
    assert!(weak.iter().all(|a| a.symbol == 0));
    assert!(accepts(&tables, &[1, 0]));
}

#[test]
fn guard_disambiguation() {
    // s = {{ A B }} x | y ; x = A B ; y = A C
    // "a b" picks the first alternative, "a c" the second, without consuming the A
    let mut grammar = Grammar::new();
    grammar.terminals.add("A", UnitKind::Keywords).unwrap(); // 0
    grammar.terminals.add("B", UnitKind::Keywords).unwrap(); // 1
    grammar.terminals.add("C", UnitKind::Keywords).unwrap(); // 2
    let s = grammar.nonterminals.add("s", NtKind::Plain).unwrap();
    let x = grammar.nonterminals.add("x", NtKind::Plain).unwrap();
    let y = grammar.nonterminals.add("y", NtKind::Plain).unwrap();
    grammar.add_rule(s, &[GrItem::Guard(vec![GrItem::T(0), GrItem::T(1)]), GrItem::NT(x)]);
    grammar.add_rule(s, &[GrItem::NT(y)]);
    grammar.add_rule(x, &[GrItem::T(0), GrItem::T(1)]);
    grammar.add_rule(y, &[GrItem::T(0), GrItem::T(2)]);
    let (tables, log) = LalrBuilder::build(&grammar, s, &BTreeSet::new());
    assert!(log.has_no_errors(), "{}", log.get_messages_str());
    assert_eq!(tables.guards.len(), 1);
    assert!(accepts(&tables, &[0, 1]), "guarded alternative should parse");
    assert!(accepts(&tables, &[0, 2]), "fallback alternative should parse");
    assert!(!accepts(&tables, &[0, 0]));
    assert!(!accepts(&tables, &[1, 2]));
    assert!(!accepts(&tables, &[]));
}

#[test]
fn guard_actions_precede_shifts() {
    let mut grammar = Grammar::new();
    grammar.terminals.add("A", UnitKind::Keywords).unwrap();
    grammar.terminals.add("B", UnitKind::Keywords).unwrap();
    let s = grammar.nonterminals.add("s", NtKind::Plain).unwrap();
    let x = grammar.nonterminals.add("x", NtKind::Plain).unwrap();
    grammar.add_rule(s, &[GrItem::Guard(vec![GrItem::T(0)]), GrItem::NT(x)]);
    grammar.add_rule(s, &[GrItem::T(0), GrItem::T(1)]);
    grammar.add_rule(x, &[GrItem::T(0)]);
    let (tables, _) = LalrBuilder::build(&grammar, s, &BTreeSet::new());
    let row = tables.find_terminal(tables.initial_state, 0);
    assert!(row.len() >= 2);
    assert_eq!(row[0].kind, ActionKind::Guard);
    assert!(row[1..].iter().any(|a| a.kind == ActionKind::Shift));
}

#[test]
fn ignored_terminals_get_ignore_actions() {
    let (grammar, s) = balanced_grammar();
    let mut grammar = grammar;
    let ws = grammar.terminals.add("Ws", UnitKind::Ignore).unwrap();
    let (tables, _) = LalrBuilder::build(&grammar, s, &BTreeSet::from([ws]));
    for state in 0..tables.count_states() {
        let row = tables.find_terminal(state, ws as u32);
        assert!(!row.is_empty(), "state {state} has no action for the ignored terminal");
    }
    // an ignored token in the middle of the input is dropped
    assert!(accepts(&tables, &[0, ws, 1]));
    assert!(accepts(&tables, &[ws, 0, 1, ws]));
}

#[test]
fn ebnf_operators_through_lalr() {
    // list = Id (Comma Id)*
    let mut grammar = Grammar::new();
    grammar.terminals.add("Id", UnitKind::Lexer).unwrap();     // 0
    grammar.terminals.add("Comma", UnitKind::Keywords).unwrap(); // 1
    let list = grammar.nonterminals.add("list", NtKind::Plain).unwrap();
    grammar.add_rule(list, &[GrItem::T(0), GrItem::RepeatZero(vec![GrItem::T(1), GrItem::T(0)])]);
    let (tables, log) = LalrBuilder::build(&grammar, list, &BTreeSet::new());
    assert!(log.has_no_warnings(), "{}", log.get_messages_str());
    for input in [vec![0], vec![0, 1, 0], vec![0, 1, 0, 1, 0]] {
        assert!(accepts(&tables, &input), "accept failed for {input:?}");
    }
    for input in [vec![], vec![1], vec![0, 1], vec![0, 0]] {
        assert!(!accepts(&tables, &input), "reject failed for {input:?}");
    }
}

#[test]
fn rule_table_layout() {
    let (grammar, s) = balanced_grammar();
    let (tables, _) = LalrBuilder::build(&grammar, s, &BTreeSet::new());
    // grammar rules first, augmented rule last
    assert_eq!(tables.rules.len(), grammar.count_rules() + 1);
    assert_eq!(tables.rules[0], (s, 3));
    assert_eq!(tables.rules[1], (s, 0));
    assert_eq!(tables.rules[2], (s, 1));
}

#[test]
fn action_rows_are_sorted() {
    let mut grammar = Grammar::new();
    for name in ["A", "B", "C", "D"] {
        grammar.terminals.add(name, UnitKind::Keywords).unwrap();
    }
    let s = grammar.nonterminals.add("s", NtKind::Plain).unwrap();
    grammar.add_rule(s, &[GrItem::T(3), GrItem::T(1)]);
    grammar.add_rule(s, &[GrItem::T(0), GrItem::T(2)]);
    let (tables, _) = LalrBuilder::build(&grammar, s, &BTreeSet::new());
    for state in 0..tables.count_states() {
        for row in [&tables.t_actions[state], &tables.nt_actions[state]] {
            for pair in row.windows(2) {
                assert!(pair[0].symbol <= pair[1].symbol, "state {state}: unsorted row");
            }
        }
    }
}
