//! Signals, and the bookkeeping for emissions in progress.
//!
//! See the [`Signal`] type for details.
use crate::{
    connection::{Connection, Slot},
    error::InvalidSignal,
    util::fmt,
};
use core::{
    cell::Cell,
    marker::PhantomPinned,
    pin::{pin, Pin},
    ptr::{self, NonNull},
};
use hyphae::{Cursor, List};

#[cfg(feature = "alloc")]
use alloc::boxed::Box;


/// An ordered set of callbacks, called in order each time the signal is
/// [emitted].
///
/// A signal does not own its callbacks. Each callback is stored in a
/// [`Connection`] owned by the caller, which is linked into the signal by
/// [`Signal::connect_pinned`] (or created and linked by [`Signal::connect`]).
/// Dropping a connection disconnects it, and dropping a signal disconnects
/// every connection, so the two may be dropped in either order.
///
/// Both the signal and its connections must be [pinned] while they are
/// connected, since each holds pointers to the other.
///
/// # Reentrancy
///
/// While a callback is running, it may do anything to the signal that is
/// emitting it: emit it again, connect or disconnect callbacks, disconnect
/// everything, or [swap] its connections with another signal's. Every
/// emission in progress observes these changes:
///
/// - a disconnected callback is never called again, including by emissions
///   that had not reached it yet,
/// - a callback connected during an emission is called by that emission,
///   after every callback connected before it, unless the emission has
///   already reached the last callback,
/// - and an emission in progress on a signal whose connections are moved away
///   by [`Signal::swap`] or [`Signal::disconnect_all`] calls no other
///   callback once the current one returns.
///
/// A callback may also cause the signal itself to be dropped. The emission
/// then returns as soon as that callback returns, without calling anything
/// else. Note that [`Signal::emit`] borrows the signal, so this can only
/// happen if the signal is dropped through a raw pointer.
///
/// A callback may *not* drop its own [`Connection`] while it runs, since that
/// would free the closure that is executing. Doing so aborts the process.
///
/// # Examples
///
/// ```
/// use core::{cell::RefCell, pin::pin};
/// use spore::Signal;
///
/// let seen = RefCell::new(Vec::new());
/// let signal = pin!(Signal::<str>::new());
/// let signal = signal.into_ref();
///
/// let first = signal.connect(|msg: &str| seen.borrow_mut().push(("first", msg.len())));
/// let second = signal.connect(|msg: &str| seen.borrow_mut().push(("second", msg.len())));
///
/// signal.emit("hello");
/// drop(first);
/// signal.emit("hi");
///
/// assert_eq!(*seen.borrow(), [("first", 5), ("second", 5), ("second", 2)]);
/// # drop(second);
/// ```
///
/// [emitted]: Signal::emit
/// [pinned]: core::pin
/// [swap]: Signal::swap
pub struct Signal<A: ?Sized> {
    slots: List<Slot<A>, SignalTag>,

    /// The innermost emission in progress, if any.
    dispatch: Cell<Option<NonNull<Dispatch<A>>>>,
}

/// Tag for the links between a [`Signal`] and its connections.
#[derive(Debug)]
pub(crate) struct SignalTag;

pub(crate) type SlotCursor<A> = Cursor<Slot<A>, SignalTag>;

/// An emission in progress.
///
/// Each call to [`Signal::emit`] keeps one of these pinned on its stack frame,
/// and pushes it onto the signal's stack of emissions in progress for as long
/// as the call lasts.
struct Dispatch<A: ?Sized> {
    /// The emission that was in progress when this one started.
    prev: Option<NonNull<Dispatch<A>>>,

    /// The connection to call next, or the end of the signal's list.
    ///
    /// This always points at a connection that is linked into the signal, or
    /// at the list's end. Everything that removes a connection from the
    /// signal moves the cursors pointing at it first.
    cursor: Cell<SlotCursor<A>>,

    /// The signal being emitted. Cleared if the signal is dropped.
    signal: Cell<Option<NonNull<Signal<A>>>>,

    _pin: PhantomPinned,
}

// === impl Signal ===

impl<A: ?Sized> Signal<A> {
    /// Returns a new signal with no connections.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: List::new(),
            dispatch: Cell::new(None),
        }
    }

    /// Connects `conn` to this signal, after every connection already
    /// connected.
    ///
    /// If `conn` is already connected, to this signal or another one, it is
    /// disconnected first. Every emission of this signal that is in progress
    /// and has not yet reached the end of the list will call `conn` once it
    /// has called the connections before it. An emission that has already
    /// started calling the last connection does not call `conn`.
    pub fn connect_pinned<F>(self: Pin<&Self>, conn: Pin<&Connection<A, F>>) {
        let slot = conn.slot();
        slot.disconnect();

        self.slots().push_back(slot);
        slot.set_signal(Some(NonNull::from(self.get_ref())));

        trace!(
            signal = ?fmt::ptr(self.get_ref()),
            connection = ?fmt::ptr(slot.get_ref()),
            "Signal::connect"
        );
    }

    /// Connects `callback` to this signal, after every connection already
    /// connected, and returns the [`Connection`] that holds it.
    ///
    /// The callback is called by every emission until the returned connection
    /// is disconnected or dropped.
    #[cfg(feature = "alloc")]
    #[must_use = "dropping the returned `Connection` disconnects it"]
    pub fn connect<F>(self: Pin<&Self>, callback: F) -> Pin<Box<Connection<A, F>>>
    where
        F: Fn(&A),
    {
        let conn = Box::pin(Connection::new(callback));
        self.connect_pinned(conn.as_ref());
        conn
    }

    /// Calls every connected callback with `args`, in the order they were
    /// connected.
    ///
    /// See [the type-level documentation](Signal#reentrancy) for what the
    /// callbacks may do to the signal while it is being emitted.
    ///
    /// # Panics
    ///
    /// If a callback panics, the panic propagates out of `emit` without
    /// calling the remaining callbacks, and the signal is left as it was when
    /// the callback panicked.
    pub fn emit(self: Pin<&Self>, args: &A) {
        let end = self.slots().end();
        let dispatch = pin!(Dispatch {
            prev: self.dispatch.get(),
            cursor: Cell::new(self.slots().begin()),
            signal: Cell::new(Some(NonNull::from(self.get_ref()))),
            _pin: PhantomPinned,
        });
        let dispatch = dispatch.into_ref();
        self.dispatch.set(Some(NonNull::from(dispatch.get_ref())));
        test_debug!(
            signal = ?fmt::ptr(self.get_ref()),
            nested = dispatch.prev.is_some(),
            "Signal::emit"
        );

        // From here on, the signal may be dropped by any callback, so it is
        // only reached through the dispatch record.
        while let Some(slot) = dispatch.advance(end) {
            // Safety: the cursor pointed at a connection linked into the
            // signal, and a connection cannot be dropped while it is linked
            // without moving the cursor off it first.
            unsafe { Slot::call(slot, args) };

            if dispatch.signal.get().is_none() {
                trace!(dispatch = ?fmt::ptr(dispatch.get_ref()), "signal dropped during emit");
                return;
            }
        }
    }

    /// Disconnects every connection.
    ///
    /// Emissions in progress call no other callback once the running one
    /// returns, even if it connects new callbacks afterwards.
    pub fn disconnect_all(self: Pin<&Self>) {
        self.halt();
        self.sever();
        trace!(signal = ?fmt::ptr(self.get_ref()), "Signal::disconnect_all");
    }

    /// Exchanges the connections of this signal with those of `other`.
    ///
    /// Each connection is moved along with its position, so both signals
    /// call the same callbacks in the same order as the other signal did.
    /// Emissions in progress on either signal call no other callback once the
    /// running one returns.
    pub fn swap(self: Pin<&Self>, other: Pin<&Self>) {
        if ptr::eq(self.get_ref(), other.get_ref()) {
            return;
        }

        self.halt();
        other.halt();
        self.slots().swap(other.slots());
        self.adopt();
        other.adopt();

        trace!(
            signal = ?fmt::ptr(self.get_ref()),
            other = ?fmt::ptr(other.get_ref()),
            "Signal::swap"
        );
    }

    /// Returns `true` if no callbacks are connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the number of connected callbacks.
    ///
    /// This walks the list of connections, so it is *O*(*n*).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the signal is being emitted.
    #[must_use]
    pub fn is_emitting(&self) -> bool {
        self.dispatch.get().is_some()
    }

    /// Checks the signal's structural invariants.
    ///
    /// This checks that the list of connections is well-formed, that every
    /// connection records this signal as its owner, and that every emission
    /// in progress is positioned at one of the connections or at the end of
    /// the list.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidSignal`] describing the first violated invariant.
    pub fn check_valid(self: Pin<&Self>) -> Result<(), InvalidSignal> {
        self.slots.check_valid()?;

        let signal = NonNull::from(self.get_ref());
        // Safety: every connection in the list is alive, and nothing is
        // linked or unlinked while iterating.
        let slots = || unsafe { self.slots().iter() };
        for (index, slot) in slots().enumerate() {
            let owner = slot.signal();
            if owner != Some(signal) {
                return Err(InvalidSignal::ForeignConnection {
                    index,
                    connection: NonNull::from(slot.get_ref()).cast(),
                    signal: signal.cast(),
                    owner: owner.map(NonNull::cast::<()>),
                });
            }
        }

        let end = self.slots().end();
        let mut next = self.dispatch.get();
        let mut depth = 0;
        while let Some(dispatch) = next {
            // Safety: dispatch records pop themselves before they are dropped.
            let dispatch = unsafe { dispatch.as_ref() };
            let owner = dispatch.signal.get();
            if owner != Some(signal) {
                return Err(InvalidSignal::ForeignDispatch {
                    depth,
                    signal: signal.cast(),
                    owner: owner.map(NonNull::cast::<()>),
                });
            }

            let cursor = dispatch.cursor.get();
            if cursor != end && !slots().any(|slot| Cursor::from_elem(slot) == cursor) {
                return Err(InvalidSignal::StrayCursor {
                    depth,
                    signal: signal.cast(),
                    node: cursor.links_ptr().cast(),
                });
            }

            next = dispatch.prev;
            depth += 1;
        }

        Ok(())
    }

    /// Asserts that the signal's structural invariants hold.
    ///
    /// # Panics
    ///
    /// If [`Signal::check_valid`] returns an error.
    #[track_caller]
    pub fn assert_valid(self: Pin<&Self>) {
        if let Err(error) = self.check_valid() {
            panic!("invalid signal {:p}: {error}", self.get_ref());
        }
    }

    /// Links `new` into this signal immediately after `old`, then disconnects
    /// `old`. Emissions that would have called `old` next call `new` instead.
    pub(crate) fn replace(self: Pin<&Self>, old: Pin<&Slot<A>>, new: Pin<&Slot<A>>) {
        debug_assert!(old.signal() == Some(NonNull::from(self.get_ref())));
        new.disconnect();

        let mut pos = Cursor::from_elem(old);
        // Safety: `old` is linked into this list, so its successor is either
        // another live connection or the end of the list.
        unsafe {
            pos.move_next();
            self.slots().insert(pos, new);
        }
        new.set_signal(Some(NonNull::from(self.get_ref())));
        old.disconnect();
    }

    /// Moves the cursor of every emission in progress to `f(cursor)`.
    pub(crate) fn steer(&self, mut f: impl FnMut(SlotCursor<A>) -> SlotCursor<A>) {
        let mut next = self.dispatch.get();
        while let Some(dispatch) = next {
            // Safety: dispatch records pop themselves before they are dropped.
            let dispatch = unsafe { dispatch.as_ref() };
            dispatch.cursor.set(f(dispatch.cursor.get()));
            next = dispatch.prev;
        }
    }

    fn slots(self: Pin<&Self>) -> Pin<&List<Slot<A>, SignalTag>> {
        // Safety: the list is structurally pinned.
        unsafe { self.map_unchecked(|signal| &signal.slots) }
    }

    /// Moves every emission in progress to the end of the list.
    fn halt(self: Pin<&Self>) {
        let end = self.slots().end();
        self.steer(|_| end);
    }

    /// Unlinks every connection and clears its owner.
    fn sever(&self) {
        while let Some(slot) = self.slots.pop_front() {
            // Safety: linked connections are alive.
            unsafe { slot.as_ref() }.set_signal(None);
        }
    }

    /// Records this signal as the owner of every connection in its list.
    fn adopt(self: Pin<&Self>) {
        let signal = NonNull::from(self.get_ref());
        // Safety: every connection in the list is alive, and nothing is
        // linked or unlinked while iterating.
        for slot in unsafe { self.slots().iter() } {
            slot.set_signal(Some(signal));
        }
    }
}

impl<A: ?Sized> Drop for Signal<A> {
    fn drop(&mut self) {
        // End every emission in progress. Each one notices when its current
        // callback returns.
        let mut next = self.dispatch.take();
        while let Some(dispatch) = next {
            // Safety: dispatch records pop themselves before they are dropped.
            let dispatch = unsafe { dispatch.as_ref() };
            dispatch.signal.set(None);
            next = dispatch.prev;
        }

        self.sever();
        test_debug!(signal = ?fmt::ptr(&*self), "Signal::drop");
    }
}

impl<A: ?Sized> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { slots, dispatch } = self;
        f.debug_struct("Signal")
            .field("slots", slots)
            .field("dispatch", &dispatch.get().map(fmt::ptr))
            .finish()
    }
}

// === impl Dispatch ===

impl<A: ?Sized> Dispatch<A> {
    /// Returns the connection to call next and moves past it, or returns
    /// `None` at the end of the list.
    fn advance(&self, end: SlotCursor<A>) -> Option<NonNull<Slot<A>>> {
        let mut cursor = self.cursor.get();
        if cursor == end {
            return None;
        }

        // Safety: the cursor is not at the end, so it points at a live,
        // linked connection.
        let slot = unsafe {
            let slot = cursor.as_ptr();
            cursor.move_next();
            slot
        };
        self.cursor.set(cursor);
        Some(slot)
    }
}

impl<A: ?Sized> Drop for Dispatch<A> {
    fn drop(&mut self) {
        let Some(signal) = self.signal.get() else {
            return;
        };
        // Safety: a signal clears the records of every emission in progress
        // when it is dropped, so if this is set, the signal is alive.
        let signal = unsafe { signal.as_ref() };
        debug_assert_eq!(signal.dispatch.get(), Some(NonNull::from(&*self)));
        signal.dispatch.set(self.prev);
    }
}
