use super::{DefaultTag, Links};
use crate::{util::fmt, Linked};
use core::{marker::PhantomData, pin::Pin, ptr::NonNull};

/// A position in a [`List`](super::List).
///
/// A cursor is a plain pointer to a node: either an element's [`Links`], or a
/// list's sentinel, which is the list's [end position](super::List::end).
/// Because the list is circular, moving forward from the last element reaches
/// the end, and moving forward again wraps around to the first element.
///
/// Cursors are not invalidated by inserting or removing *other* elements. A
/// cursor pointing at an element that has since been unlinked stays valid as
/// long as the element is alive, but since an idle node is its own neighbor,
/// moving it leaves it where it is.
///
/// A cursor does not borrow the list or the element it points at, so every
/// operation that dereferences one is `unsafe`: the caller must ensure that
/// the node it points at has not been dropped.
pub struct Cursor<T, Tag = DefaultTag> {
    node: NonNull<Links<Tag>>,
    _elem: PhantomData<*const T>,
}

// === impl Cursor ===

impl<T, Tag> Cursor<T, Tag> {
    pub(crate) const fn new(node: NonNull<Links<Tag>>) -> Self {
        Self {
            node,
            _elem: PhantomData,
        }
    }

    /// Returns a pointer to the [`Links`] this cursor points at.
    #[must_use]
    #[inline]
    pub fn links_ptr(self) -> NonNull<Links<Tag>> {
        self.node
    }

    /// Moves the cursor to the next position.
    ///
    /// # Safety
    ///
    /// The node this cursor points at must still be alive.
    #[inline]
    pub unsafe fn move_next(&mut self) {
        self.node = self.node.as_ref().next_ptr();
    }

    /// Moves the cursor to the previous position.
    ///
    /// # Safety
    ///
    /// The node this cursor points at must still be alive.
    #[inline]
    pub unsafe fn move_prev(&mut self) {
        self.node = self.node.as_ref().prev_ptr();
    }

    /// Returns `true` if the node this cursor points at is linked.
    ///
    /// # Safety
    ///
    /// The node this cursor points at must still be alive.
    #[inline]
    pub unsafe fn is_linked(self) -> bool {
        self.node.as_ref().is_linked()
    }
}

impl<T: Linked<Tag>, Tag> Cursor<T, Tag> {
    /// Returns a cursor pointing at `elem`.
    ///
    /// The element need not be linked into a list.
    #[must_use]
    pub fn from_elem(elem: Pin<&T>) -> Self {
        // Safety: the pointer comes from a reference, so it is valid.
        Self::new(unsafe { T::links(NonNull::from(elem.get_ref())) })
    }

    /// Returns a pointer to the element this cursor points at.
    ///
    /// # Safety
    ///
    /// The cursor must not be at the end of a list.
    #[must_use]
    #[inline]
    pub unsafe fn as_ptr(self) -> NonNull<T> {
        T::from_links(self.node)
    }

    /// Returns a reference to the element this cursor points at.
    ///
    /// # Safety
    ///
    /// The cursor must not be at the end of a list, and the element must
    /// outlive the returned reference.
    #[must_use]
    #[inline]
    pub unsafe fn get<'a>(self) -> Pin<&'a T> {
        Pin::new_unchecked(self.as_ptr().as_ref())
    }
}

impl<T, Tag> Clone for Cursor<T, Tag> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, Tag> Copy for Cursor<T, Tag> {}

impl<T, Tag> PartialEq for Cursor<T, Tag> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<T, Tag> Eq for Cursor<T, Tag> {}

impl<T, Tag> fmt::Debug for Cursor<T, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&fmt::ptr(self.node)).finish()
    }
}
