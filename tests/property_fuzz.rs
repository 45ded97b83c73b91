//! Randomized operation sequences checked against a reference
//! `BTreeSet`, driven by `rand` with a fixed seed for reproducibility.

mod common;
use common::*;

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Copy, Debug)]
enum Op {
    Set(i64),
    Delete(i64),
    PopMin,
    PopMax,
}

fn run_against_reference(seed: u64, max_items: usize, ops: usize, key_span: i64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tree = new_tree(max_items);
    let mut reference: BTreeSet<i64> = BTreeSet::new();

    for step in 0..ops {
        let op = match rng.gen_range(0..4) {
            0 | 1 => Op::Set(rng.gen_range(-key_span..key_span)),
            2 => Op::Delete(rng.gen_range(-key_span..key_span)),
            _ => {
                if rng.gen_bool(0.5) {
                    Op::PopMin
                } else {
                    Op::PopMax
                }
            }
        };

        match op {
            Op::Set(v) => {
                let prev_tree = tree.set(v);
                let prev_ref = !reference.insert(v);
                assert_eq!(prev_tree.is_some(), prev_ref, "seed {seed} step {step}: set({v})");
            }
            Op::Delete(v) => {
                let removed_tree = tree.delete(&v);
                let removed_ref = reference.remove(&v);
                assert_eq!(
                    removed_tree.is_some(),
                    removed_ref,
                    "seed {seed} step {step}: delete({v})"
                );
            }
            Op::PopMin => {
                let got = tree.pop_min();
                let want = reference.iter().next().copied();
                if let Some(w) = want {
                    reference.remove(&w);
                }
                assert_eq!(got, want, "seed {seed} step {step}: pop_min");
            }
            Op::PopMax => {
                let got = tree.pop_max();
                let want = reference.iter().next_back().copied();
                if let Some(w) = want {
                    reference.remove(&w);
                }
                assert_eq!(got, want, "seed {seed} step {step}: pop_max");
            }
        }

        assert_eq!(tree.len(), reference.len(), "seed {seed} step {step}: len diverged");
    }

    assert_invariants(&tree, &format!("fuzz seed {seed}"));
    assert_eq!(
        collect_ascending(&tree),
        reference.into_iter().collect::<Vec<_>>(),
        "seed {seed}: final contents diverged"
    );
}

#[test]
fn random_set_delete_pop_sequences_match_a_btreeset() {
    for seed in 0..12u64 {
        run_against_reference(seed, 4 + (seed as usize % 9), 400, 200);
    }
}

#[test]
fn random_sequences_with_wide_fanout_match_a_btreeset() {
    for seed in 100..104u64 {
        run_against_reference(seed, 64, 800, 5000);
    }
}

#[test]
fn random_sequences_with_minimal_fanout_stress_every_rebalance_path() {
    // max_items = 3 is the smallest the spec permits; min_items = 1,
    // so nearly every delete is on the edge of triggering merge or
    // rotate.
    for seed in 200..206u64 {
        run_against_reference(seed, 3, 300, 40);
    }
}

#[test]
fn hinted_set_get_delete_agree_with_unhinted_operations() {
    let mut hinted = new_tree(6);
    let mut plain = new_tree(6);
    let mut hint = ordbtree::Hint::new();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..500 {
        let v = rng.gen_range(0..300);
        if rng.gen_bool(0.7) {
            let a = hinted.set_hint(v, &mut hint);
            let b = plain.set(v);
            assert_eq!(a, b);
        } else {
            let a = hinted.delete_hint(&v, &mut hint);
            let b = plain.delete(&v);
            assert_eq!(a, b);
        }
    }
    assert_eq!(collect_ascending(&hinted), collect_ascending(&plain));
    assert_eq!(hinted.get_hint(&150, &mut hint), plain.get(&150));
}

#[test]
fn clone_survives_interleaved_random_mutation_on_both_sides() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut a = new_tree(5);
    for v in 0..200 {
        a.set(v);
    }
    let mut b = a.clone();
    let mut reference_a: BTreeSet<i64> = (0..200).collect();
    let mut reference_b = reference_a.clone();

    for _ in 0..300 {
        let v = rng.gen_range(0..400);
        if rng.gen_bool(0.5) {
            a.set(v);
            reference_a.insert(v);
        } else {
            a.delete(&v);
            reference_a.remove(&v);
        }
        let v = rng.gen_range(0..400);
        if rng.gen_bool(0.5) {
            b.set(v);
            reference_b.insert(v);
        } else {
            b.delete(&v);
            reference_b.remove(&v);
        }
    }

    assert_eq!(collect_ascending(&a), reference_a.into_iter().collect::<Vec<_>>());
    assert_eq!(collect_ascending(&b), reference_b.into_iter().collect::<Vec<_>>());
    assert_invariants(&a, "a after interleaved mutation");
    assert_invariants(&b, "b after interleaved mutation");
}
