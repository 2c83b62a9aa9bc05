//! Errors reported when checking a signal's structural invariants.
//!
//! Connecting, disconnecting, and emitting cannot fail. These errors are
//! returned by [`Signal::check_valid`](crate::Signal::check_valid) and
//! [`Connection::check_valid`](crate::Connection::check_valid).
use core::ptr::NonNull;
use hyphae::InvalidLinks;

/// A structural invariant of a signal or one of its connections did not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidSignal {
    /// The signal's list of connections is malformed.
    #[error(transparent)]
    Links(#[from] InvalidLinks),

    /// A connection in the signal's list does not record the signal as its
    /// owner.
    #[error("connection {connection:p} at index {index} is owned by {owner:?}, not {signal:p}")]
    ForeignConnection {
        /// The position of the connection in the signal's list.
        index: usize,
        /// The connection.
        connection: NonNull<()>,
        /// The signal that was checked.
        signal: NonNull<()>,
        /// The signal the connection records as its owner, if any.
        owner: Option<NonNull<()>>,
    },

    /// An emission in progress on the signal records a different signal.
    #[error("emission at depth {depth} is dispatching {owner:?}, not {signal:p}")]
    ForeignDispatch {
        /// How many emissions were started after this one and are still in
        /// progress.
        depth: usize,
        /// The signal that was checked.
        signal: NonNull<()>,
        /// The signal the emission records.
        owner: Option<NonNull<()>>,
    },

    /// An emission in progress is positioned at a node that is neither a
    /// connection of the signal nor the end of its list.
    #[error("emission at depth {depth} is positioned at {node:p}, which is not connected to {signal:p}")]
    StrayCursor {
        /// How many emissions were started after this one and are still in
        /// progress.
        depth: usize,
        /// The signal that was checked.
        signal: NonNull<()>,
        /// The node the emission would call next.
        node: NonNull<()>,
    },

    /// A connection is linked into a list without an owning signal, or has an
    /// owning signal without being linked.
    #[error("connection {connection:p} is linked: {linked}, but has an owner: {connected}")]
    Inconsistent {
        /// The connection.
        connection: NonNull<()>,
        /// Whether the connection's node is linked.
        linked: bool,
        /// Whether the connection records an owning signal.
        connected: bool,
    },
}
