use core::ptr::NonNull;

use cordyceps::Linked;

use crate::Links;

/// A single key stored in an [`AvlTree`](crate::AvlTree).
///
/// Nodes are heap allocated and owned by the tree through raw child links; the
/// parent link is a non-owning back reference.
#[repr(C)]
pub(crate) struct Node {
    links: Links<Node>,
    key: i32,
}

impl Node {
    pub(crate) fn new(key: i32) -> Box<Node> {
        Box::new(Node {
            links: Links::new(),
            key,
        })
    }

    #[inline]
    pub(crate) fn key(&self) -> i32 {
        self.key
    }

    #[inline]
    pub(crate) fn set_key(&mut self, key: i32) {
        self.key = key;
    }
}

unsafe impl Linked<Links<Node>> for Node {
    type Handle = Box<Node>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Node>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}
