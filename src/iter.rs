use core::iter::FusedIterator;

use crate::{node::Node, AvlTree, Dir, Link};

/// Errors returned by the explicit [`Iter`] methods.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IterError {
    #[error("iterator has no more keys")]
    Exhausted,
    #[error("keys cannot be removed through an iterator")]
    RemoveUnsupported,
}

/// An iterator over the keys of an [`AvlTree`] in ascending order.
///
/// The iterator is a cursor stepping from the minimum node to each successor in turn, so it
/// allocates nothing. It borrows the tree, which therefore cannot be modified while the iterator
/// is live. Each call to [`AvlTree::iter()`] starts a new, independent traversal.
#[derive(Clone, Debug)]
pub struct Iter<'tree> {
    tree: &'tree AvlTree,
    cur: Link<Node>,

    // Number of keys yielded so far, out of `len`.
    index: usize,
    len: usize,
}

impl<'tree> Iter<'tree> {
    pub(crate) fn new(tree: &'tree AvlTree) -> Self {
        Iter {
            tree,
            cur: tree
                .root
                .map(|root| unsafe { tree.extreme_in_subtree(root, Dir::Left) }),
            index: 0,
            len: tree.len(),
        }
    }

    /// Returns `true` if a call to [`Iter::try_next()`] would yield a key.
    pub fn has_next(&self) -> bool {
        self.index < self.len
    }

    /// Returns the next key in ascending order.
    ///
    /// Returns [`IterError::Exhausted`] once every key has been yielded.
    pub fn try_next(&mut self) -> Result<i32, IterError> {
        if !self.has_next() {
            return Err(IterError::Exhausted);
        }

        let cur = self.cur.ok_or(IterError::Exhausted)?;

        unsafe {
            self.cur = self.tree.successor_raw(cur);
            self.index += 1;

            Ok(cur.as_ref().key())
        }
    }

    /// Always fails with [`IterError::RemoveUnsupported`]; use [`AvlTree::delete()`] instead.
    pub fn remove(&mut self) -> Result<(), IterError> {
        Err(IterError::RemoveUnsupported)
    }
}

impl Iterator for Iter<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}
