//! Errors reported when checking a list's structural invariants.
//!
//! None of the list operations themselves can fail; these errors are returned
//! by [`List::check_valid`](crate::List::check_valid) and
//! [`Links::check_idle`](crate::Links::check_idle), which walk a list and
//! report the first place where its links are inconsistent.
use core::ptr::NonNull;

/// A structural invariant of an intrusive list did not hold.
///
/// Node addresses are reported with their type erased, since they are only
/// useful for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidLinks {
    /// A node had a `next` link without a `prev` link, or the other way
    /// around.
    #[error("node {node:p} is half-linked (next: {has_next}, prev: {has_prev})")]
    HalfLinked {
        /// The inconsistent node.
        node: NonNull<()>,
        /// Whether the node had a `next` link.
        has_next: bool,
        /// Whether the node had a `prev` link.
        has_prev: bool,
    },

    /// Walking forward from `prev` reached `node`, but `node`'s `prev` link
    /// does not point back at `prev`.
    #[error(
        "node {node:p} at index {index} follows {prev:p}, but its prev link is {actual:p}"
    )]
    NotReciprocal {
        /// The position of `node` in the list, counting from the first
        /// element.
        index: usize,
        /// The node that was reached.
        node: NonNull<()>,
        /// The node it was reached from.
        prev: NonNull<()>,
        /// Where `node`'s `prev` link actually points.
        actual: NonNull<()>,
    },

    /// A node that is expected to be idle is linked to another node.
    #[error("node {node:p} should be idle, but it links to {next:p}")]
    NotIdle {
        /// The linked node.
        node: NonNull<()>,
        /// The node's successor.
        next: NonNull<()>,
    },
}
