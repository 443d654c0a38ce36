//! An AVL tree over unique `i32` keys.

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`. A leaf has height 0 and a missing child height -1.
// - The balance factor of `x` is `h(right(x)) - h(left(x))`.
// - A node is left-heavy if its balance factor is negative and right-heavy if it is positive.
//
// The fundamental invariants of an AVL tree are:
// 1. Every key in the left subtree of `x` is less than the key of `x`, and every key in its right
//    subtree is greater.
// 2. The balance factor of every node is -1, 0 or 1.
//
// Corollaries:
// 3. The minimum number of nodes in a tree of height `h` is `N(h) = N(h-1) + N(h-2) + 1`, with
//    `N(0) = 1` and `N(1) = 2`. Thus `N(h) = F(h+3) - 1` where `F` is the Fibonacci sequence, and
//    the height of a tree of `n` nodes is at most ~1.44 log2(n).
//
//    Proof sketch: the smallest tree of height `h` has one subtree of height `h-1` and, by (2),
//    the other of height `h-2`, each of them minimal.
//
// 4. After an insertion or a removal, only the nodes on the path from the changed node to the root
//    can have their height or balance factor altered, and each by at most one.

use core::{cell::UnsafeCell, cmp::Ordering, fmt, mem, ops::Not, ptr::NonNull};

use cordyceps::Linked;

mod debug;
mod iter;
#[cfg(any(test, feature = "model"))]
pub mod model;
mod node;


pub use iter::{Iter, IterError};
use node::Node;

/// A self-balancing binary search tree of unique `i32` keys.
///
/// Every node caches its height and balance factor, and links back to its parent so that
/// rebalancing and in-order iteration walk upwards without an auxiliary stack.
pub struct AvlTree {
    root: Link<Node>,
    len: usize,
}

// SAFETY: the tree exclusively owns every node reachable from `root`, and all mutation goes through
// `&mut AvlTree`.
unsafe impl Send for AvlTree {}
unsafe impl Sync for AvlTree {}

pub(crate) struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    height: i8,
    balance: i8,
}

pub(crate) type Link<T> = Option<NonNull<T>>;

impl AvlTree {
    /// The value returned by [`AvlTree::contains()`] for a key that is not in the tree.
    pub const NOT_FOUND: i32 = -1;

    /// Returns a new empty tree.
    pub const fn new() -> AvlTree {
        AvlTree { root: None, len: 0 }
    }

    /// Returns a tree holding the unique values of `keys`.
    ///
    /// Values are added in order; repeated values are skipped.
    pub fn from_slice(keys: &[i32]) -> AvlTree {
        keys.iter().copied().collect()
    }

    /// Returns a deep copy of `other`.
    ///
    /// The copy holds the same keys, but is built by adding them in ascending order and so does
    /// not necessarily have the same shape.
    pub fn copy_of(other: &AvlTree) -> AvlTree {
        other.iter().collect()
    }

    /// Returns `true` if the tree contains no keys.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of keys in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree, or `None` if it is empty.
    ///
    /// A tree holding a single key has height 0.
    pub fn height(&self) -> Option<u32> {
        let root = self.root?;
        let height = unsafe { Node::links(root).as_ref().height() };
        u32::try_from(height).ok()
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let mut count = 0;

        if let Some(root) = self.root {
            unsafe {
                assert_eq!(
                    Node::links(root).as_ref().parent(),
                    None,
                    "root must not have a parent"
                );
                self.assert_invariants_at(root, None, None, &mut count);
            }
        }

        assert_eq!(count, self.len, "`len` must match the number of nodes");
    }

    // Checks the subtree rooted at `node`, whose keys must all lie strictly between `lower` and
    // `upper`, returning its height as recomputed from scratch.
    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(
        &self,
        node: NonNull<Node>,
        lower: Option<i32>,
        upper: Option<i32>,
        count: &mut usize,
    ) -> i8 {
        unsafe {
            *count += 1;

            let key = node.as_ref().key();
            if let Some(lower) = lower {
                assert!(lower < key, "key {key} must be greater than {lower}");
            }
            if let Some(upper) = upper {
                assert!(key < upper, "key {key} must be less than {upper}");
            }

            let mut heights = [-1; 2];
            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = Node::links(node).as_ref().child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = Node::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);

                    let (lower, upper) = match dir {
                        Dir::Left => (lower, Some(key)),
                        Dir::Right => (Some(key), upper),
                    };
                    heights[dir as usize] = self.assert_invariants_at(child, lower, upper, count);
                }
            }

            let height = 1 + heights[0].max(heights[1]);
            let balance = heights[1] - heights[0];

            let links = Node::links(node).as_ref();
            assert_eq!(links.height(), height, "stale height at key {key}");
            assert_eq!(links.balance(), balance, "stale balance at key {key}");
            assert!(
                (-1..=1).contains(&balance),
                "key {key} has balance factor {balance}"
            );

            height
        }
    }

    /// Returns the depth of the node holding `key`, with the root at depth 0.
    pub fn depth(&self, key: i32) -> Option<usize> {
        let mut opt_cur = self.root;
        let mut depth = 0;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(&cur.as_ref().key()) {
                    Ordering::Less => opt_cur = Node::links(cur).as_ref().left(),
                    Ordering::Equal => return Some(depth),
                    Ordering::Greater => opt_cur = Node::links(cur).as_ref().right(),
                }
            }

            depth += 1;
        }
    }

    /// Returns the depth of the node holding `key` (0 for the root), or [`AvlTree::NOT_FOUND`]
    /// if the tree does not contain it.
    pub fn contains(&self, key: i32) -> i32 {
        self.depth(key)
            .and_then(|depth| i32::try_from(depth).ok())
            .unwrap_or(Self::NOT_FOUND)
    }

    /// Returns the minimum key of the tree.
    pub fn first(&self) -> Option<i32> {
        let root = self.root?;
        unsafe { Some(self.extreme_in_subtree(root, Dir::Left).as_ref().key()) }
    }

    /// Returns the maximum key of the tree.
    pub fn last(&self) -> Option<i32> {
        let root = self.root?;
        unsafe { Some(self.extreme_in_subtree(root, Dir::Right).as_ref().key()) }
    }

    /// Returns an iterator over the keys of the tree in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Returns the minimum number of nodes in an AVL tree of the given height.
    ///
    /// This is computed in constant time from the closed form of the Fibonacci sequence.
    pub fn min_nodes_for_height(height: u32) -> u64 {
        let sqrt_5 = 5_f64.sqrt();
        let phi = (1.0 + sqrt_5) / 2.0;
        let height = i32::try_from(height).unwrap_or(i32::MAX);

        ((sqrt_5 + 2.0) / sqrt_5 * phi.powi(height) - 1.0).round() as u64
    }

    /// Adds `key` to the tree.
    ///
    /// Returns `false`, leaving the tree unchanged, if `key` is already present.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn add(&mut self, key: i32) -> bool {
        let root = match self.root {
            Some(root) => root,
            None => {
                // Tree is empty. Set a new node as the root and return.
                self.root = Some(Node::into_ptr(Node::new(key)));
                self.len += 1;
                return true;
            }
        };

        let mut parent = root;

        // Descend the tree, looking for a free slot.
        loop {
            let dir = match key.cmp(&unsafe { parent.as_ref().key() }) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return false,
                Ordering::Greater => Dir::Right,
            };

            unsafe {
                let parent_links = Node::links(parent).as_mut();
                match parent_links.child(dir) {
                    // Descend.
                    Some(child) => parent = child,

                    // Attach a new node as child.
                    None => {
                        let ptr = Node::into_ptr(Node::new(key));
                        parent_links.set_child(dir, Some(ptr));
                        Node::links(ptr).as_mut().set_parent(Some(parent));
                        break;
                    }
                }
            }
        }

        unsafe { self.rebalance(parent) };

        self.len += 1;
        true
    }

    /// Removes `key` from the tree.
    ///
    /// Returns `false`, leaving the tree unchanged, if `key` is not present.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn delete(&mut self, key: i32) -> bool {
        // The node holding `key` is not necessarily the one unlinked from the tree.
        //
        // The descent continues past the matching node `found` using the same ordering as
        // insertion, which leads to the minimum of its right subtree (its successor), or to
        // `found` itself if it has no right child. The last node visited, `spliced`, thus has at
        // most one child. Its key is moved into `found` and `spliced` is replaced by its child.
        let Some(root) = self.root else {
            return false;
        };

        let mut found = None;
        let mut spliced = root;
        let mut opt_cur = Some(root);

        unsafe {
            while let Some(cur) = opt_cur {
                spliced = cur;

                let cur_key = cur.as_ref().key();
                if key == cur_key {
                    found = Some(cur);
                }

                opt_cur = if key >= cur_key {
                    Node::links(cur).as_ref().right()
                } else {
                    Node::links(cur).as_ref().left()
                };
            }

            let Some(mut found) = found else {
                return false;
            };

            let successor_key = spliced.as_ref().key();
            found.as_mut().set_key(successor_key);

            let links = Node::links(spliced).as_ref();
            debug_assert!(links.left().is_none() || links.right().is_none());

            let child = links.left().or(links.right());
            let parent = links.parent();

            // Elevate the only child (which may be None) to replace `spliced`.
            self.replace_child_or_set_root(parent, spliced, child);
            self.maybe_set_parent(child, parent);

            drop(Node::from_ptr(spliced));

            if let Some(parent) = parent {
                self.rebalance(parent);
            }
        }

        self.len -= 1;
        true
    }

    /// Clears the tree, removing all keys.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = self.extreme_in_subtree(cur, Dir::Left);
                let parent = Node::links(cur).as_ref().parent();
                let right = Node::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                drop(Node::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Rebalancing ============================================================

    // Walks from `node` up to the root, recomputing the balance factor of each node on the path
    // and rotating wherever it reaches -2 or 2.
    //
    // The walk never stops early, as a change below (including a rotation) can alter the height
    // of every ancestor.
    unsafe fn rebalance(&mut self, node: NonNull<Node>) {
        let mut cur = node;

        loop {
            unsafe {
                self.set_balance(&[cur]);

                let links = Node::links(cur).as_ref();
                cur = match links.balance() {
                    -2 => {
                        let left = links.left().expect("left-heavy node must have a left child");
                        let left_links = Node::links(left).as_ref();
                        let outer = self.height_of(left_links.left());
                        let inner = self.height_of(left_links.right());

                        if outer >= inner {
                            self.rotate_right(cur)
                        } else {
                            self.rotate_left_then_right(cur)
                        }
                    }

                    2 => {
                        let right = links
                            .right()
                            .expect("right-heavy node must have a right child");
                        let right_links = Node::links(right).as_ref();
                        let outer = self.height_of(right_links.right());
                        let inner = self.height_of(right_links.left());

                        if outer >= inner {
                            self.rotate_left(cur)
                        } else {
                            self.rotate_right_then_left(cur)
                        }
                    }

                    _ => cur,
                };

                // Ascend one level. If this reaches the root, the walk is complete.
                match Node::links(cur).as_ref().parent() {
                    Some(parent) => cur = parent,
                    None => {
                        debug_assert_eq!(self.root, Some(cur));
                        break;
                    }
                }
            }
        }
    }

    // Recomputes the cached height and balance factor of each of `nodes`, in order, from the
    // cached heights of their children.
    unsafe fn set_balance(&mut self, nodes: &[NonNull<Node>]) {
        for &node in nodes {
            unsafe {
                let links = Node::links(node).as_mut();
                let left = self.height_of(links.left());
                let right = self.height_of(links.right());

                links.set_height(1 + left.max(right));
                links.set_balance(right - left);
            }
        }
    }

    // Rotates the subtree rooted at `pivot` in direction `dir`, moving the `!dir` child of `pivot`
    // up into its place. Returns the new subtree root.
    //
    // ```text
    //      pivot                                 up
    //     /     \          rotate left         /    \
    //    1       up      --------------->   pivot    3
    //           /  \                        /   \
    //       across  3                      1   across
    // ```
    //
    // Ancestors of `pivot` are not updated.
    unsafe fn rotate(&mut self, pivot: NonNull<Node>, dir: Dir) -> NonNull<Node> {
        unsafe {
            let up = Node::links(pivot)
                .as_ref()
                .child(!dir)
                .expect("pivot must have a child to rotate up");

            // - `pivot` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `pivot`.
            let across = Node::links(up).as_ref().child(dir);
            Node::links(pivot).as_mut().set_child(!dir, across);
            self.maybe_set_parent(across, Some(pivot));

            Node::links(up).as_mut().set_child(dir, Some(pivot));
            let parent = Node::links(pivot).as_mut().set_parent(Some(up));
            Node::links(up).as_mut().set_parent(parent);

            self.replace_child_or_set_root(parent, pivot, Some(up));

            // `pivot` is now below `up`, so it is updated first.
            self.set_balance(&[pivot, up]);

            up
        }
    }

    #[inline]
    unsafe fn rotate_left(&mut self, pivot: NonNull<Node>) -> NonNull<Node> {
        unsafe { self.rotate(pivot, Dir::Left) }
    }

    #[inline]
    unsafe fn rotate_right(&mut self, pivot: NonNull<Node>) -> NonNull<Node> {
        unsafe { self.rotate(pivot, Dir::Right) }
    }

    // Fixes a node whose left child is right-heavy.
    unsafe fn rotate_left_then_right(&mut self, node: NonNull<Node>) -> NonNull<Node> {
        unsafe {
            let left = Node::links(node)
                .as_ref()
                .left()
                .expect("node must have a left child");

            self.rotate_left(left);
            self.rotate_right(node)
        }
    }

    // Fixes a node whose right child is left-heavy.
    unsafe fn rotate_right_then_left(&mut self, node: NonNull<Node>) -> NonNull<Node> {
        unsafe {
            let right = Node::links(node)
                .as_ref()
                .right()
                .expect("node must have a right child");

            self.rotate_right(right);
            self.rotate_left(node)
        }
    }

    // Support methods ========================================================

    // Returns the node reached by following `dir` links from `root` as far as possible: the
    // minimum of the subtree for `Dir::Left`, the maximum for `Dir::Right`.
    #[inline]
    pub(crate) unsafe fn extreme_in_subtree(&self, root: NonNull<Node>, dir: Dir) -> NonNull<Node> {
        let mut cur = root;

        while let Some(next) = unsafe { Node::links(cur).as_ref().child(dir) } {
            cur = next;
        }

        cur
    }

    // Returns the node holding the smallest key greater than that of `node`.
    pub(crate) unsafe fn successor_raw(&self, node: NonNull<Node>) -> Link<Node> {
        unsafe {
            // The successor is the minimum of the right subtree, if there is one.
            if let Some(right) = Node::links(node).as_ref().right() {
                return Some(self.extreme_in_subtree(right, Dir::Left));
            }

            // Otherwise ascend until arriving from a left child.
            let mut cur = node;
            while let Some(parent) = Node::links(cur).as_ref().parent() {
                match self.which_child(parent, cur) {
                    Dir::Left => return Some(parent),
                    Dir::Right => cur = parent,
                }
            }

            None
        }
    }

    /// Returns the cached height of the pointed-to node, or -1 for an empty subtree.
    #[inline]
    unsafe fn height_of(&self, node: Link<Node>) -> i8 {
        node.map(|n| unsafe { Node::links(n).as_ref().height() })
            .unwrap_or(-1)
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<Node>, parent: Link<Node>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { Node::links(node).as_mut().set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<Node>,
        old_child: NonNull<Node>,
        new_child: Link<Node>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<Node>,
        old_child: NonNull<Node>,
        new_child: Link<Node>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);
            let links = Node::links(parent).as_mut();

            debug_assert_eq!(
                links.child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );
            debug_assert!(
                new_child.is_none() || links.child(!dir) != new_child,
                "`new_child` must not be a child of `parent`"
            );

            links.set_child(dir, new_child);
        }
    }

    unsafe fn which_child(&self, parent: NonNull<Node>, child: NonNull<Node>) -> Dir {
        if unsafe { Node::links(parent).as_ref().left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

impl Default for AvlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AvlTree {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Clone for AvlTree {
    fn clone(&self) -> Self {
        AvlTree::copy_of(self)
    }
}

impl fmt::Debug for AvlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Trees are equal when they hold the same keys, regardless of shape.
impl PartialEq for AvlTree {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for AvlTree {}

impl FromIterator<i32> for AvlTree {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut tree = AvlTree::new();
        tree.extend(iter);
        tree
    }
}

impl Extend<i32> for AvlTree {
    fn extend<I: IntoIterator<Item = i32>>(&mut self, iter: I) {
        for key in iter {
            self.add(key);
        }
    }
}

impl From<&[i32]> for AvlTree {
    fn from(keys: &[i32]) -> Self {
        AvlTree::from_slice(keys)
    }
}

impl<'tree> IntoIterator for &'tree AvlTree {
    type Item = i32;
    type IntoIter = Iter<'tree>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                balance: 0,
            }),
        }
    }

    #[inline]
    fn height(&self) -> i8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_height(&mut self, height: i8) {
        self.inner.get_mut().height = height;
    }

    #[inline]
    fn set_balance(&mut self, balance: i8) {
        self.inner.get_mut().balance = balance;
    }
}
