#![cfg_attr(docsrs, doc = include_str!("../README.md"))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![warn(missing_docs, missing_debug_implementations)]
//! Intrusive, tagged, circular doubly-linked lists.
//!
//! See the [`List`] type for details.

#[cfg(test)]
extern crate std;

#[macro_use]
pub(crate) mod util;

pub mod error;
pub mod list;

#[doc(inline)]
pub use self::error::InvalidLinks;
#[doc(inline)]
pub use self::list::{Cursor, DefaultTag, Links, List};

use core::ptr::NonNull;

/// Trait implemented by types which can be members of an [intrusive list]
/// tagged with `Tag`.
///
/// In order to be part of a [`List<T, Tag>`](List), a type `T` must contain a
/// [`Links<Tag>`](Links) field, and implement this trait to translate between
/// a pointer to `T` and a pointer to that field. A type which contains several
/// `Links` fields with distinct tags implements `Linked` once per tag, and
/// may be linked into one list per tag at the same time.
///
/// # Safety
///
/// This is unsafe to implement because it's the implementation's
/// responsibility to ensure that the two conversions are exact inverses of
/// each other:
///
/// - [`Linked::links`] **must** return a pointer to a `Links<Tag>` that lives
///   inside the pointed-to `Self` value.
/// - [`Linked::from_links`] **must** return the address of the `Self` value
///   containing the `Links<Tag>` passed to it.
///
/// In addition, the type implementing this trait **must not** implement
/// [`Unpin`] (which is automatically the case for any type containing
/// [`Links`]), since elements are addressed by pointer while linked.
///
/// Failure to uphold these invariants will result in corruption of the
/// intrusive data structure, including dangling pointers.
///
/// # Examples
///
/// An element type whose links are its first field can simply cast pointers,
/// as long as it is `#[repr(C)]`:
///
/// ```
/// use hyphae::{Linked, Links};
/// use core::ptr::NonNull;
///
/// #[repr(C)]
/// struct Entry {
///     links: Links,
///     val: i32,
/// }
///
/// unsafe impl Linked for Entry {
///     unsafe fn links(target: NonNull<Self>) -> NonNull<Links> {
///         // Safety: `links` is the first field of a `repr(C)` struct.
///         target.cast()
///     }
///
///     unsafe fn from_links(links: NonNull<Links>) -> NonNull<Self> {
///         links.cast()
///     }
/// }
/// ```
///
/// An element that lives in two lists at once uses one tag per list, and
/// locates the second field with [`core::mem::offset_of!`]:
///
/// ```
/// use hyphae::{Linked, Links};
/// use core::{mem, ptr::{self, NonNull}};
///
/// struct ByAge;
/// struct ByName;
///
/// struct Person {
///     by_age: Links<ByAge>,
///     by_name: Links<ByName>,
///     name: &'static str,
/// }
///
/// unsafe impl Linked<ByAge> for Person {
///     unsafe fn links(target: NonNull<Self>) -> NonNull<Links<ByAge>> {
///         NonNull::new_unchecked(ptr::addr_of_mut!((*target.as_ptr()).by_age))
///     }
///
///     unsafe fn from_links(links: NonNull<Links<ByAge>>) -> NonNull<Self> {
///         let offset = mem::offset_of!(Person, by_age);
///         NonNull::new_unchecked(links.as_ptr().cast::<u8>().sub(offset).cast())
///     }
/// }
///
/// unsafe impl Linked<ByName> for Person {
///     unsafe fn links(target: NonNull<Self>) -> NonNull<Links<ByName>> {
///         NonNull::new_unchecked(ptr::addr_of_mut!((*target.as_ptr()).by_name))
///     }
///
///     unsafe fn from_links(links: NonNull<Links<ByName>>) -> NonNull<Self> {
///         let offset = mem::offset_of!(Person, by_name);
///         NonNull::new_unchecked(links.as_ptr().cast::<u8>().sub(offset).cast())
///     }
/// }
/// ```
///
/// [intrusive list]: crate::list
pub unsafe trait Linked<Tag = DefaultTag> {
    /// Return the links of the node pointed to by `ptr`.
    ///
    /// # Safety
    ///
    /// This function is safe to call when `ptr` points to a valid instance of
    /// `Self` (e.g. it does not dangle).
    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Tag>>;

    /// Recover a pointer to the element containing the links pointed to by
    /// `links`.
    ///
    /// # Safety
    ///
    /// This function is safe to call when `links` points to the `Links<Tag>`
    /// embedded in a valid instance of `Self`. In particular, it must not be
    /// called with the sentinel of a [`List`].
    unsafe fn from_links(links: NonNull<Links<Tag>>) -> NonNull<Self>;
}
