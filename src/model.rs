//! Model-based equivalence checks of [`AvlTree`] against the standard library.
//!
//! Used by the property tests and by the fuzz targets (with the `model` feature).

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{AvlTree, IterError};

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    /// Selects a key already in the tree, if any.
    Index(usize),
    Random(i32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in -500i32..500,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Add(ItemValue),
    Delete(ItemValue),
    Contains(ItemValue),
    First,
    Last,
    Copy,
    Clear,
}

impl Op {
    fn finalize(self, sorted: &[i32]) -> FinalOp {
        fn get_value(v: &[i32], i: ItemValue) -> i32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as i32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Add(item) => FinalOp::Add(get_value(sorted, item)),
            Op::Delete(item) => FinalOp::Delete(get_value(sorted, item)),
            Op::Contains(item) => FinalOp::Contains(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::Last => FinalOp::Last,
            Op::Copy => FinalOp::Copy,
            Op::Clear => FinalOp::Clear,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Add(i32),
    Delete(i32),
    Contains(i32),
    First,
    Last,
    Copy,
    Clear,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    // Weighted towards insertion so that trees grow deep enough to rotate.
    proptest::prop_oneof![
        8 => value_strategy().prop_map(Op::Add),
        3 => value_strategy().prop_map(Op::Delete),
        3 => value_strategy().prop_map(Op::Contains),
        1 => Just(Op::First),
        1 => Just(Op::Last),
        1 => Just(Op::Copy),
        1 => Just(Op::Clear),
    ]
}

/// Applies `ops` to both an [`AvlTree`] and a [`BTreeSet`], asserting that they agree and that
/// the tree invariants hold after every operation.
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut sorted_values = Vec::new();
    let mut btree = BTreeSet::new();
    let mut avl = AvlTree::new();

    fn insert_sorted(v: &mut Vec<i32>, value: i32) {
        if let Err(idx) = v.binary_search(&value) {
            v.insert(idx, value);
        }
    }

    fn remove_sorted(v: &mut Vec<i32>, value: i32) {
        if let Ok(idx) = v.binary_search(&value) {
            v.remove(idx);
        }
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        match op.finalize(&sorted_values) {
            FinalOp::Add(value) => {
                insert_sorted(&mut sorted_values, value);

                let from_btree = btree.insert(value);
                let from_avl = avl.add(value);

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {op:?}");
                assert_ne!(avl.contains(value), AvlTree::NOT_FOUND);
            }

            FinalOp::Delete(value) => {
                remove_sorted(&mut sorted_values, value);

                let from_btree = btree.remove(&value);
                let from_avl = avl.delete(value);

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {op:?}");
                assert_eq!(avl.contains(value), AvlTree::NOT_FOUND);
            }

            FinalOp::Contains(value) => {
                let from_btree = btree.contains(&value);
                let depth = avl.depth(value);

                assert_eq!(from_btree, depth.is_some(), "Op #{op_id}: {op:?}");

                if let Some(depth) = depth {
                    let height = avl.height().expect("non-empty tree must have a height");
                    assert!(depth as u32 <= height, "Op #{op_id}: {op:?}");
                    assert_eq!(avl.contains(value), depth as i32);
                }
            }

            FinalOp::First => {
                assert_eq!(btree.first().copied(), avl.first(), "Op #{op_id}: {op:?}");
            }

            FinalOp::Last => {
                assert_eq!(btree.last().copied(), avl.last(), "Op #{op_id}: {op:?}");
            }

            FinalOp::Copy => {
                let copy = avl.clone();
                copy.assert_invariants();
                assert_eq!(copy, avl, "Op #{op_id}: {op:?}");

                // Continue with the copy, dropping the original.
                avl = copy;
            }

            FinalOp::Clear => {
                sorted_values.clear();
                btree.clear();
                avl.clear();
            }
        }

        avl.assert_invariants();
        assert_eq!(btree.len(), avl.len());
        assert!(btree.iter().copied().eq(avl.iter()));

        if let Some(height) = avl.height() {
            assert!(avl.len() as u64 >= AvlTree::min_nodes_for_height(height));
        }
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum IterOp {
    HasNext,
    Next,
    TryNext,
    Remove,
    Restart,
}

pub fn iter_op_strategy() -> impl Strategy<Value = IterOp> {
    proptest::prop_oneof![
        Just(IterOp::HasNext),
        Just(IterOp::Next),
        Just(IterOp::TryNext),
        Just(IterOp::Remove),
        Just(IterOp::Restart),
    ]
}

#[derive(Clone, Debug)]
pub struct IterEquivalenceInput {
    pub values: Vec<i32>,
    pub ops: Vec<IterOp>,
}

impl<'a> arbitrary::Arbitrary<'a> for IterEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> i32 {
            i32::arbitrary(u).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> IterOp {
            IterOp::arbitrary(u).unwrap_or(IterOp::Next)
        }

        let num_values = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let values = core::iter::repeat_with(|| value(u))
            .take(num_values.into())
            .collect();

        let ops = core::iter::repeat_with(|| op(u))
            .take(num_ops.into())
            .collect();

        Ok(IterEquivalenceInput { values, ops })
    }
}

/// Drives an [`AvlTree`] iterator with `ops`, asserting it behaves like an index into the sorted,
/// deduplicated `values`.
pub fn run_iter_equivalence(values: Vec<i32>, ops: Vec<IterOp>) {
    let avl = AvlTree::from_slice(&values);
    avl.assert_invariants();

    let mut sorted = values;
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), avl.len());

    let mut idx = 0;
    let mut iter = avl.iter();

    for op in ops {
        match op {
            IterOp::HasNext => {
                assert_eq!(idx < sorted.len(), iter.has_next());
            }

            IterOp::Next => {
                assert_eq!(sorted.get(idx).copied(), iter.next());
                idx = (idx + 1).min(sorted.len());
            }

            IterOp::TryNext => {
                let want = sorted.get(idx).copied().ok_or(IterError::Exhausted);
                assert_eq!(want, iter.try_next());
                idx = (idx + 1).min(sorted.len());
            }

            IterOp::Remove => {
                assert_eq!(iter.remove(), Err(IterError::RemoveUnsupported));
            }

            IterOp::Restart => {
                iter = avl.iter();
                idx = 0;
            }
        }

        assert_eq!(iter.len(), sorted.len() - idx);
    }
}
