//! An intrusive, circular doubly-linked list.
//!
//! See the [`List`] type for details.
use crate::{util::fmt, InvalidLinks, Linked};
use core::{
    cell::Cell,
    iter::FusedIterator,
    marker::{PhantomData, PhantomPinned},
    pin::Pin,
    ptr::{self, NonNull},
};

mod cursor;
pub use self::cursor::Cursor;


// Implementation safety notes:
//
// Link Valid Invariant: every link pointer reachable from a `List` or a
// `Links` points at a live `Links`. We maintain this by only ever storing the
// addresses of pinned nodes (linking an element requires a `Pin`), and by
// having the `Drop` impls of both `Links` and `List` remove their address
// from their neighbors before the memory goes away. Every `unsafe` deref of a
// `next` or `prev` link below relies on this invariant.

/// The tag used by [`Links`] and [`List`] when no tag is specified.
///
/// Types that are members of only one kind of list can use this tag. Types
/// that must be members of several lists at once should define a distinct
/// tag type for each.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DefaultTag;

/// An [intrusive], circular doubly-linked list.
///
/// A `List` does not own its elements: it only threads together [`Links`]
/// which live inside values owned by someone else. The list itself is a single
/// *sentinel* node. The sentinel's successor is the first element, its
/// predecessor is the last element, and the sentinel is also the list's
/// [end position](List::end). An empty list is a sentinel linked to itself.
///
/// In order to be part of a `List<T, Tag>`, a type `T` must contain a
/// [`Links<Tag>`] field and implement [`Linked<Tag>`].
///
/// Because nodes are addressed by pointer, both the list and its elements must
/// be pinned while they are linked. This is enforced by the API: elements are
/// inserted as `Pin<&T>`, and every operation that links nodes takes the list
/// as `Pin<&Self>`. The [`core::pin::pin!`] macro or [`Box::pin`] can be used
/// to pin lists and elements.
///
/// Either side may be dropped first. Dropping an element unlinks it from its
/// list; dropping a list unlinks all of its elements, leaving each one idle.
///
/// # Examples
///
/// ```
/// use hyphae::{Linked, Links, List};
/// use core::{pin::pin, ptr::NonNull};
///
/// #[repr(C)]
/// struct Entry {
///     links: Links,
///     val: i32,
/// }
///
/// unsafe impl Linked for Entry {
///     unsafe fn links(target: NonNull<Self>) -> NonNull<Links> {
///         target.cast()
///     }
///
///     unsafe fn from_links(links: NonNull<Links>) -> NonNull<Self> {
///         links.cast()
///     }
/// }
///
/// impl Entry {
///     fn new(val: i32) -> Self {
///         Self { links: Links::new(), val }
///     }
/// }
///
/// let list = pin!(List::<Entry>::new());
/// let list = list.as_ref();
///
/// let a = Box::pin(Entry::new(1));
/// let b = Box::pin(Entry::new(2));
/// let c = Box::pin(Entry::new(3));
/// list.push_back(a.as_ref());
/// list.push_back(b.as_ref());
/// list.push_back(c.as_ref());
///
/// // Safety: no element is dropped while the iterator is in use.
/// let vals = unsafe { list.iter() }.map(|entry| entry.val).collect::<Vec<_>>();
/// assert_eq!(vals, [1, 2, 3]);
///
/// // Dropping an element unlinks it.
/// drop(b);
/// let vals = unsafe { list.iter() }.map(|entry| entry.val).collect::<Vec<_>>();
/// assert_eq!(vals, [1, 3]);
/// ```
///
/// [intrusive]: crate
/// [`Links<Tag>`]: Links
/// [`Linked<Tag>`]: Linked
/// [`Box::pin`]: https://doc.rust-lang.org/std/boxed/struct.Box.html#method.pin
pub struct List<T, Tag = DefaultTag> {
    /// The sentinel node, which is also the end position.
    sentinel: Links<Tag>,
    _elem: PhantomData<*const T>,
}

/// Links to other nodes in a [`List`].
///
/// In order to be part of a [`List`], a type must contain an instance of this
/// type, and must implement the [`Linked`] trait for the same `Tag`.
///
/// A `Links` that is not in any list is *idle*: its `next` and `prev` links
/// both point at itself. `Links` are created idle, and become idle again when
/// they are unlinked. Dropping a linked `Links` unlinks it.
pub struct Links<Tag = DefaultTag> {
    next: Cell<Link<Tag>>,
    prev: Cell<Link<Tag>>,
    _tag: PhantomData<fn() -> Tag>,
    /// Linked list links must always be `!Unpin`, in order to ensure that they
    /// never recieve LLVM `noalias` annotations; see also
    /// <https://github.com/rust-lang/rust/issues/63818>.
    _unpin: PhantomPinned,
}

/// Iterates over the elements of a [`List`] by pinned reference.
///
/// This is returned by [`List::iter`].
pub struct Iter<'list, T, Tag = DefaultTag> {
    front: NonNull<Links<Tag>>,
    back: NonNull<Links<Tag>>,
    done: bool,
    _list: PhantomData<&'list List<T, Tag>>,
}

/// A stored link. `None` means the link points at the node that stores it,
/// which lets idle links be constructed before they have an address.
type Link<Tag> = Option<NonNull<Links<Tag>>>;

// === impl List ===

impl<T, Tag> List<T, Tag> {
    /// Returns a new empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sentinel: Links::new(),
            _elem: PhantomData,
        }
    }

    /// Returns `true` if this list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.sentinel.is_linked()
    }

    /// Returns the number of elements in this list.
    ///
    /// This is an *O*(*n*) operation, since the list does not keep a count.
    pub fn len(&self) -> usize {
        let end = self.sentinel.addr();
        let mut curr = self.sentinel.next_ptr();
        let mut len = 0;
        while curr != end {
            len += 1;
            // Safety: Link Valid Invariant.
            curr = unsafe { curr.as_ref().next_ptr() };
        }
        len
    }

    /// Returns a [`Cursor`] at the end position of this list.
    ///
    /// The end position is the list's sentinel. It does not refer to an
    /// element, and moving a cursor forward from the last element reaches it.
    #[must_use]
    #[inline]
    pub fn end(self: Pin<&Self>) -> Cursor<T, Tag> {
        Cursor::new(self.sentinel.addr())
    }

    /// Returns a [`Cursor`] at the first element of this list, or at the
    /// [end](Self::end) if the list is empty.
    #[must_use]
    #[inline]
    pub fn begin(self: Pin<&Self>) -> Cursor<T, Tag> {
        Cursor::new(self.sentinel.next_ptr())
    }

    /// Unlinks every element of this list, leaving each one idle.
    pub fn clear(self: Pin<&Self>) {
        self.get_ref().unlink_all();
    }

    /// Moves all elements of `other` into this list, in order.
    ///
    /// Any elements that were in this list beforehand are unlinked first.
    /// Afterwards, `other` is empty.
    pub fn take_from(self: Pin<&Self>, other: Pin<&Self>) {
        if ptr::eq(self.get_ref(), other.get_ref()) {
            return;
        }

        trace!(list = ?fmt::ptr(self.get_ref()), other = ?fmt::ptr(other.get_ref()), "List::take_from");
        self.get_ref().unlink_all();
        // Safety: both sentinels are pinned, since both lists are.
        unsafe { Links::transfer(&self.sentinel, &other.sentinel) }
    }

    /// Exchanges the elements of this list with those of `other`.
    pub fn swap(self: Pin<&Self>, other: Pin<&Self>) {
        trace!(list = ?fmt::ptr(self.get_ref()), other = ?fmt::ptr(other.get_ref()), "List::swap");
        // Safety: both sentinels are pinned, since both lists are.
        unsafe { Links::swap_raw(&self.sentinel, &other.sentinel) }
    }

    /// Walks the list, checking that every node's `prev` link points back at
    /// the node it was reached from, and that the walk returns to the
    /// sentinel.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidLinks`] encountered.
    pub fn check_valid(&self) -> Result<(), InvalidLinks> {
        let head = self.sentinel.addr();
        let mut prev = head;
        let mut curr = self.sentinel.next_ptr();
        let mut index = 0;
        loop {
            // Safety: Link Valid Invariant.
            let links = unsafe { curr.as_ref() };
            links.check_not_half_linked()?;
            let actual = links.prev_ptr();
            if actual != prev {
                return Err(InvalidLinks::NotReciprocal {
                    index,
                    node: curr.cast(),
                    prev: prev.cast(),
                    actual: actual.cast(),
                });
            }

            if curr == head {
                return Ok(());
            }

            prev = curr;
            curr = links.next_ptr();
            index += 1;
        }
    }

    /// Asserts the list's structural invariants.
    ///
    /// # Panics
    ///
    /// If [`List::check_valid`] returns an error.
    #[track_caller]
    pub fn assert_valid(&self) {
        if let Err(error) = self.check_valid() {
            panic!("invalid list {:p}: {error}", self);
        }
    }

    fn unlink_all(&self) {
        while let Some(first) = self.sentinel.next.get() {
            // Safety: Link Valid Invariant.
            unsafe {
                first.as_ref().unlink_raw();
            }
        }
    }
}

impl<T: Linked<Tag>, Tag> List<T, Tag> {
    /// Appends `elem` to the back of the list, and returns a cursor pointing at
    /// it.
    ///
    /// If `elem` is currently linked into any list (including this one), it is
    /// unlinked from there first.
    pub fn push_back(self: Pin<&Self>, elem: Pin<&T>) -> Cursor<T, Tag> {
        // Safety: the sentinel is always a live node of this list.
        unsafe { self.link_before(self.sentinel.addr(), elem) }
    }

    /// Prepends `elem` to the front of the list, and returns a cursor pointing
    /// at it.
    ///
    /// If `elem` is currently linked into any list (including this one), it is
    /// unlinked from there first.
    pub fn push_front(self: Pin<&Self>, elem: Pin<&T>) -> Cursor<T, Tag> {
        // Safety: the sentinel's successor is the first element or the
        // sentinel itself, both live nodes of this list.
        unsafe { self.link_before(self.sentinel.next_ptr(), elem) }
    }

    /// Inserts `elem` before the position `pos`, and returns a cursor pointing
    /// at it.
    ///
    /// If `elem` is currently linked into any list (including this one), it is
    /// unlinked from there first. Inserting an element before itself leaves it
    /// where it is.
    ///
    /// # Safety
    ///
    /// `pos` must be a position in *this* list: either its [end](Self::end),
    /// or an element that is still alive and linked into this list.
    pub unsafe fn insert(self: Pin<&Self>, pos: Cursor<T, Tag>, elem: Pin<&T>) -> Cursor<T, Tag> {
        self.link_before(pos.links_ptr(), elem)
    }

    /// Unlinks the element at `pos`, and returns a cursor pointing at its
    /// successor.
    ///
    /// If the element was not linked, the returned cursor points at the
    /// element itself, since an idle node is its own successor.
    ///
    /// # Safety
    ///
    /// `pos` must point at an element that is still alive.
    ///
    /// # Panics
    ///
    /// If `pos` is the [end](Self::end) of this list.
    pub unsafe fn erase(self: Pin<&Self>, pos: Cursor<T, Tag>) -> Cursor<T, Tag> {
        assert_ne!(pos, self.end(), "cannot erase the end of a list");
        let links = pos.links_ptr().as_ref();
        let next = links.next_ptr();
        links.unlink_raw();
        Cursor::new(next)
    }

    /// Returns a pointer to the first element of the list, if there is one.
    #[must_use]
    pub fn front(&self) -> Option<NonNull<T>> {
        let first = self.sentinel.next.get()?;
        // Safety: the sentinel's successor in a non-empty list is an element.
        Some(unsafe { T::from_links(first) })
    }

    /// Returns a pointer to the last element of the list, if there is one.
    #[must_use]
    pub fn back(&self) -> Option<NonNull<T>> {
        let last = self.sentinel.prev.get()?;
        // Safety: the sentinel's predecessor in a non-empty list is an element.
        Some(unsafe { T::from_links(last) })
    }

    /// Unlinks the first element of the list and returns a pointer to it.
    pub fn pop_front(&self) -> Option<NonNull<T>> {
        let first = self.sentinel.next.get()?;
        test_trace!(list = ?fmt::ptr(self), first = ?fmt::ptr(first), "List::pop_front");
        // Safety: Link Valid Invariant; a non-empty list's first node is an
        // element.
        unsafe {
            first.as_ref().unlink_raw();
            Some(T::from_links(first))
        }
    }

    /// Unlinks the last element of the list and returns a pointer to it.
    pub fn pop_back(&self) -> Option<NonNull<T>> {
        let last = self.sentinel.prev.get()?;
        test_trace!(list = ?fmt::ptr(self), last = ?fmt::ptr(last), "List::pop_back");
        // Safety: Link Valid Invariant; a non-empty list's last node is an
        // element.
        unsafe {
            last.as_ref().unlink_raw();
            Some(T::from_links(last))
        }
    }

    /// Returns a double-ended iterator over the elements of this list.
    ///
    /// # Safety
    ///
    /// The list does not own its elements, so borrowing the list does not
    /// prevent their owners from dropping them. The caller must ensure that
    /// no element is dropped, and that the list is not modified, while the
    /// iterator or any reference it returned is in use.
    pub unsafe fn iter(self: Pin<&Self>) -> Iter<'_, T, Tag> {
        Iter {
            front: self.sentinel.next_ptr(),
            back: self.sentinel.prev_ptr(),
            done: self.is_empty(),
            _list: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `pos` must point at a live node of this list.
    unsafe fn link_before(self: Pin<&Self>, pos: NonNull<Links<Tag>>, elem: Pin<&T>) -> Cursor<T, Tag> {
        let node = T::links(NonNull::from(elem.get_ref()));
        if node != pos {
            let links = node.as_ref();
            let rehomed = links.unlink_raw();
            test_trace!(list = ?fmt::ptr(self.get_ref()), node = ?fmt::ptr(node), pos = ?fmt::ptr(pos), rehomed, "List::insert");
            links.link_before(pos);
        }
        Cursor::new(node)
    }
}

impl<T, Tag> Drop for List<T, Tag> {
    fn drop(&mut self) {
        self.unlink_all();
    }
}

impl<T, Tag> Default for List<T, Tag> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, Tag> fmt::Debug for List<T, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("sentinel", &self.sentinel)
            .finish()
    }
}

// === impl Links ===

impl<Tag> Links<Tag> {
    /// Returns new, idle links for a [doubly-linked intrusive list](List).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: Cell::new(None),
            prev: Cell::new(None),
            _tag: PhantomData,
            _unpin: PhantomPinned,
        }
    }

    /// Returns `true` if this node is currently linked to another node.
    ///
    /// For an element, this means it is a member of some list. For a list's
    /// sentinel, it means the list is not empty.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.next.get().is_some()
    }

    /// Returns a pointer to the node after this one. An idle node returns its
    /// own address.
    #[inline]
    pub fn next_ptr(&self) -> NonNull<Self> {
        self.next.get().unwrap_or_else(|| self.addr())
    }

    /// Returns a pointer to the node before this one. An idle node returns its
    /// own address.
    #[inline]
    pub fn prev_ptr(&self) -> NonNull<Self> {
        self.prev.get().unwrap_or_else(|| self.addr())
    }

    /// Unlinks this node from whatever list it is in, stitching its neighbors
    /// together.
    ///
    /// Returns `true` if the node was linked. Unlinking an idle node does
    /// nothing.
    pub fn unlink(self: Pin<&Self>) -> bool {
        self.get_ref().unlink_raw()
    }

    /// Moves the list membership of `other` to this node.
    ///
    /// This node is unlinked from wherever it was first. If `other` was linked,
    /// this node takes its place between its neighbors, and `other` becomes
    /// idle. If `other` was idle, both nodes end up idle.
    pub fn take_from(self: Pin<&Self>, other: Pin<&Self>) {
        // Safety: both nodes are pinned.
        unsafe { Self::transfer(self.get_ref(), other.get_ref()) }
    }

    /// Exchanges the list positions of this node and `other`.
    ///
    /// The nodes may be in different lists, in the same list, or idle.
    pub fn swap(self: Pin<&Self>, other: Pin<&Self>) {
        // Safety: both nodes are pinned.
        unsafe { Self::swap_raw(self.get_ref(), other.get_ref()) }
    }

    /// Checks that this node is idle.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLinks::NotIdle`] if the node links to another node.
    pub fn check_idle(&self) -> Result<(), InvalidLinks> {
        self.check_not_half_linked()?;
        match self.next.get() {
            None => Ok(()),
            Some(next) => Err(InvalidLinks::NotIdle {
                node: self.addr().cast(),
                next: next.cast(),
            }),
        }
    }

    #[inline]
    fn addr(&self) -> NonNull<Self> {
        NonNull::from(self)
    }

    #[inline]
    fn set_next(&self, next: NonNull<Self>) {
        self.next.set(if next == self.addr() { None } else { Some(next) });
    }

    #[inline]
    fn set_prev(&self, prev: NonNull<Self>) {
        self.prev.set(if prev == self.addr() { None } else { Some(prev) });
    }

    fn check_not_half_linked(&self) -> Result<(), InvalidLinks> {
        let has_next = self.next.get().is_some();
        let has_prev = self.prev.get().is_some();
        if has_next != has_prev {
            return Err(InvalidLinks::HalfLinked {
                node: self.addr().cast(),
                has_next,
                has_prev,
            });
        }
        Ok(())
    }

    pub(crate) fn unlink_raw(&self) -> bool {
        let (prev, next) = match (self.prev.take(), self.next.take()) {
            (Some(prev), Some(next)) => (prev, next),
            (None, None) => return false,
            (prev, next) => unreachable!(
                "inconsistent state: node {:p} is half-linked (prev: {:?}, next: {:?})",
                self, prev, next,
            ),
        };
        test_trace!(node = ?fmt::ptr(self), prev = ?fmt::ptr(prev), next = ?fmt::ptr(next), "Links::unlink");

        // Safety: Link Valid Invariant.
        unsafe {
            prev.as_ref().set_next(next);
            next.as_ref().set_prev(prev);
        }
        true
    }

    /// Links this idle node in before `pos`.
    ///
    /// # Safety
    ///
    /// `self` must be idle and pinned, and `pos` must point at a live, pinned
    /// node other than `self`.
    pub(crate) unsafe fn link_before(&self, pos: NonNull<Self>) {
        debug_assert!(!self.is_linked(), "node {:p} must be idle", self);
        debug_assert_ne!(pos, self.addr(), "a node cannot be linked before itself");
        let pos_ref = pos.as_ref();
        let prev = pos_ref.prev_ptr();
        self.prev.set(Some(prev));
        self.next.set(Some(pos));
        prev.as_ref().set_next(self.addr());
        pos_ref.set_prev(self.addr());
    }

    /// # Safety
    ///
    /// Both nodes must be pinned.
    unsafe fn transfer(dst: &Self, src: &Self) {
        if ptr::eq(dst, src) {
            return;
        }

        dst.unlink_raw();
        let (Some(prev), Some(next)) = (src.prev.take(), src.next.take()) else {
            return;
        };
        test_trace!(dst = ?fmt::ptr(dst), src = ?fmt::ptr(src), "Links::transfer");
        dst.prev.set(Some(prev));
        dst.next.set(Some(next));
        prev.as_ref().set_next(dst.addr());
        next.as_ref().set_prev(dst.addr());
    }

    /// # Safety
    ///
    /// Both nodes must be pinned.
    unsafe fn swap_raw(a: &Self, b: &Self) {
        if ptr::eq(a, b) {
            return;
        }

        match (a.is_linked(), b.is_linked()) {
            (false, false) => return,
            (false, true) => return Self::transfer(a, b),
            (true, false) => return Self::transfer(b, a),
            (true, true) => {}
        }

        test_trace!(a = ?fmt::ptr(a), b = ?fmt::ptr(b), "Links::swap");
        let b_next = b.next_ptr();
        if b_next == a.addr() {
            // `b` immediately precedes `a`, so swapping them just moves `a`
            // in front of `b`.
            a.unlink_raw();
            a.link_before(b.addr());
            return;
        }

        b.unlink_raw();
        b.link_before(a.addr());
        a.unlink_raw();
        a.link_before(b_next);
    }
}

impl<Tag> Drop for Links<Tag> {
    fn drop(&mut self) {
        self.unlink_raw();
    }
}

impl<Tag> Default for Links<Tag> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tag> fmt::Debug for Links<Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("self", &fmt::ptr(self))
            .field("next", &fmt::ptr(self.next_ptr()))
            .field("prev", &fmt::ptr(self.prev_ptr()))
            .finish()
    }
}

// === impl Iter ===

impl<'list, T: Linked<Tag>, Tag> Iterator for Iter<'list, T, Tag> {
    type Item = Pin<&'list T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let curr = self.front;
        if curr == self.back {
            self.done = true;
        } else {
            // Safety: the caller of `List::iter` promised that the list is
            // not modified while iterating.
            self.front = unsafe { curr.as_ref().next_ptr() };
        }

        // Safety: `curr` is an element of the list, and elements are pinned.
        unsafe { Some(Pin::new_unchecked(T::from_links(curr).as_ref())) }
    }
}

impl<T: Linked<Tag>, Tag> DoubleEndedIterator for Iter<'_, T, Tag> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let curr = self.back;
        if curr == self.front {
            self.done = true;
        } else {
            // Safety: the caller of `List::iter` promised that the list is
            // not modified while iterating.
            self.back = unsafe { curr.as_ref().prev_ptr() };
        }

        // Safety: `curr` is an element of the list, and elements are pinned.
        unsafe { Some(Pin::new_unchecked(T::from_links(curr).as_ref())) }
    }
}

impl<T: Linked<Tag>, Tag> FusedIterator for Iter<'_, T, Tag> {}

impl<T, Tag> fmt::Debug for Iter<'_, T, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("front", &fmt::ptr(self.front))
            .field("back", &fmt::ptr(self.back))
            .field("done", &self.done)
            .finish()
    }
}
