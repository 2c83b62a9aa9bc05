//! Connections between callbacks and signals.
//!
//! See the [`Connection`] type for details.
use crate::{
    error::InvalidSignal,
    signal::{Signal, SignalTag, SlotCursor},
    util::{self, fmt},
};
use core::{any, cell::Cell, mem, pin::Pin, ptr::NonNull};
use hyphae::{Cursor, Linked, Links};
use pin_project::pin_project;

/// A callback that can be connected to a [`Signal`].
///
/// A connection is a node in the intrusive list of callbacks owned by a
/// signal. It is either *connected*, linked into exactly one signal, or
/// *idle*. A connection becomes idle when it is [disconnected], when its
/// signal is dropped, or when another connection [takes its place].
///
/// Dropping a connected `Connection` disconnects it, so a connection may be
/// dropped before or after its signal.
///
/// # Panics and aborts
///
/// While its callback is running, a connection's callback cannot be moved or
/// dropped. [`Connection::take_from`] and [`Connection::swap`] panic if
/// either connection's callback is running, and dropping a connection while
/// its callback is running aborts the process.
///
/// [disconnected]: Connection::disconnect
/// [takes its place]: Connection::take_from
#[pin_project]
#[repr(C)]
pub struct Connection<A: ?Sized, F> {
    // The slot must be the first field, so that a pointer to the slot is a
    // pointer to the whole connection.
    #[pin]
    slot: Slot<A>,
    callback: F,
}

/// The part of a [`Connection`] that does not depend on the callback's type.
///
/// This is what the signal's list links together.
#[repr(C)]
pub(crate) struct Slot<A: ?Sized> {
    links: Links<SignalTag>,

    /// The signal this slot is linked into, if any.
    signal: Cell<Option<NonNull<Signal<A>>>>,

    /// The number of emissions currently inside this slot's callback.
    running: Cell<usize>,

    /// Calls the callback of the `Connection` this slot is the head of.
    call: unsafe fn(NonNull<Slot<A>>, &A),
}

/// Decrements a slot's running count when a callback returns or unwinds.
struct Running<'slot>(&'slot Cell<usize>);

// === impl Connection ===

impl<A: ?Sized, F: Fn(&A)> Connection<A, F> {
    /// Returns a new, idle connection holding `callback`.
    ///
    /// Connect it to a signal with [`Signal::connect_pinned`].
    #[must_use]
    pub const fn new(callback: F) -> Self {
        Self {
            slot: Slot {
                links: Links::new(),
                signal: Cell::new(None),
                running: Cell::new(0),
                call: Self::call_slot,
            },
            callback,
        }
    }

    unsafe fn call_slot(slot: NonNull<Slot<A>>, args: &A) {
        // Safety: this function is only stored in slots that head a
        // `Connection<A, F>`, and `Connection` is `repr(C)`.
        let this = slot.cast::<Self>();
        let callback = &*core::ptr::addr_of!((*this.as_ptr()).callback);
        callback(args)
    }
}

impl<A: ?Sized, F> Connection<A, F> {
    /// Disconnects this connection from its signal.
    ///
    /// Returns `true` if the connection was connected. Disconnecting an idle
    /// connection does nothing.
    ///
    /// A disconnected callback is not called again, including by emissions of
    /// the signal that are in progress and have not reached it yet. A
    /// callback may disconnect itself.
    pub fn disconnect(self: Pin<&Self>) -> bool {
        self.slot().disconnect()
    }

    /// Returns `true` if this connection is connected to a signal.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.slot.signal().is_some()
    }

    /// Returns `true` if this connection is connected to `signal`.
    #[must_use]
    pub fn is_connected_to(&self, signal: &Signal<A>) -> bool {
        self.slot.signal() == Some(NonNull::from(signal))
    }

    /// Returns a reference to the callback.
    #[must_use]
    pub fn callback(&self) -> &F {
        &self.callback
    }

    /// Makes this connection take the place of `other`.
    ///
    /// This connection is disconnected, and then exchanges callbacks with
    /// `other`. If `other` was connected, this connection is connected at
    /// its position in its signal, and `other` is disconnected. Emissions in
    /// progress that would have called `other` next call this connection
    /// instead.
    ///
    /// Afterwards, `other` is idle and holds this connection's previous
    /// callback.
    ///
    /// # Panics
    ///
    /// If either connection's callback is running.
    pub fn take_from(self: Pin<&mut Self>, other: Pin<&mut Self>) {
        let this = self.project();
        let that = other.project();
        let (this_slot, that_slot) = (this.slot.into_ref(), that.slot.into_ref());
        this_slot.assert_not_running("take_from");
        that_slot.assert_not_running("take_from");

        this_slot.disconnect();
        mem::swap(this.callback, that.callback);
        if let Some(signal) = that_slot.signal() {
            // Safety: a signal clears the owner of every connection when it
            // is dropped, and connected signals are pinned.
            let signal = unsafe { Pin::new_unchecked(signal.as_ref()) };
            signal.replace(that_slot, this_slot);
        }
    }

    /// Exchanges this connection with `other`.
    ///
    /// The callbacks are exchanged along with the connections' positions, so
    /// every signal keeps calling the same callbacks in the same order.
    ///
    /// # Panics
    ///
    /// If either connection's callback is running.
    pub fn swap(self: Pin<&mut Self>, other: Pin<&mut Self>) {
        let this = self.project();
        let that = other.project();
        let (this_slot, that_slot) = (this.slot.into_ref(), that.slot.into_ref());
        this_slot.assert_not_running("swap");
        that_slot.assert_not_running("swap");

        mem::swap(this.callback, that.callback);
        Slot::exchange(this_slot, that_slot);
    }

    /// Checks that this connection is linked into a signal's list if and only
    /// if it records an owning signal.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSignal::Inconsistent`] if one holds without the
    /// other, or [`InvalidSignal::Links`] if the connection is not connected
    /// but its links are not idle.
    pub fn check_valid(&self) -> Result<(), InvalidSignal> {
        let linked = self.slot.links.is_linked();
        let connected = self.is_connected();
        if linked != connected {
            return Err(InvalidSignal::Inconsistent {
                connection: NonNull::from(self).cast(),
                linked,
                connected,
            });
        }

        if !linked {
            self.slot.links.check_idle()?;
        }

        Ok(())
    }

    pub(crate) fn slot(self: Pin<&Self>) -> Pin<&Slot<A>> {
        self.project_ref().slot
    }
}

impl<A: ?Sized, F> fmt::Debug for Connection<A, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Slot {
            links,
            signal,
            running,
            call: _,
        } = &self.slot;
        f.debug_struct("Connection")
            .field("links", links)
            .field("signal", &signal.get().map(fmt::ptr))
            .field("running", &running.get())
            .field("callback", &format_args!("{}", any::type_name::<F>()))
            .finish()
    }
}

// === impl Slot ===

impl<A: ?Sized> Slot<A> {
    pub(crate) fn signal(&self) -> Option<NonNull<Signal<A>>> {
        self.signal.get()
    }

    pub(crate) fn set_signal(&self, signal: Option<NonNull<Signal<A>>>) {
        self.signal.set(signal);
    }

    /// Calls the slot's callback.
    ///
    /// # Safety
    ///
    /// `slot` must point at a live slot.
    pub(crate) unsafe fn call(slot: NonNull<Self>, args: &A) {
        let running = &slot.as_ref().running;
        running.set(running.get() + 1);
        let _running = Running(running);
        (slot.as_ref().call)(slot, args);
    }

    /// Unlinks this slot from its signal, moving every emission that would
    /// call it next on to its successor.
    ///
    /// Returns `false` if the slot was not connected.
    pub(crate) fn disconnect(self: Pin<&Self>) -> bool {
        let Some(signal) = self.signal.take() else {
            return false;
        };
        // Safety: a signal clears the owner of every connection when it is
        // dropped, so if this was set, the signal is alive.
        let signal = unsafe { signal.as_ref() };

        let this = Cursor::from_elem(self);
        let mut next = this;
        // Safety: `self` is alive, and so is its successor, which is linked.
        unsafe { next.move_next() };
        signal.steer(|pos| if pos == this { next } else { pos });
        self.links().unlink();

        trace!(
            signal = ?fmt::ptr(signal),
            connection = ?fmt::ptr(this.links_ptr()),
            "Connection::disconnect"
        );
        true
    }

    /// Exchanges the positions and owners of two slots.
    fn exchange(a: Pin<&Self>, b: Pin<&Self>) {
        let (a_signal, b_signal) = (a.signal(), b.signal());
        let (a_pos, b_pos) = (Cursor::from_elem(a), Cursor::from_elem(b));

        a.links().swap(b.links());
        a.set_signal(b_signal);
        b.set_signal(a_signal);

        let exchange = |pos: SlotCursor<A>| match pos {
            pos if pos == a_pos => b_pos,
            pos if pos == b_pos => a_pos,
            pos => pos,
        };
        // Safety: a signal clears the owner of every connection when it is
        // dropped.
        if let Some(signal) = a_signal {
            unsafe { signal.as_ref() }.steer(exchange);
        }
        if let Some(signal) = b_signal.filter(|&signal| Some(signal) != a_signal) {
            unsafe { signal.as_ref() }.steer(exchange);
        }
    }

    #[track_caller]
    fn assert_not_running(&self, op: &str) {
        assert_eq!(
            self.running.get(),
            0,
            "cannot {op} a `Connection` while its callback is running"
        );
    }

    fn links(self: Pin<&Self>) -> Pin<&Links<SignalTag>> {
        // Safety: the links are structurally pinned.
        unsafe { self.map_unchecked(|slot| &slot.links) }
    }
}

impl<A: ?Sized> Drop for Slot<A> {
    fn drop(&mut self) {
        if self.running.get() > 0 {
            util::abort("a `Connection` was dropped while its callback was running");
        }

        // Safety: slots are never moved out of a `Connection`, which is
        // `!Unpin`, so this slot is pinned and is being dropped in place.
        unsafe { Pin::new_unchecked(&*self) }.disconnect();
    }
}

unsafe impl<A: ?Sized> Linked<SignalTag> for Slot<A> {
    unsafe fn links(target: NonNull<Self>) -> NonNull<Links<SignalTag>> {
        // Safety: the links are the first field of `Slot`, which is
        // `repr(C)`.
        target.cast()
    }

    unsafe fn from_links(links: NonNull<Links<SignalTag>>) -> NonNull<Self> {
        links.cast()
    }
}

// === impl Running ===

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}
