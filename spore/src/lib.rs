#![cfg_attr(docsrs, doc = include_str!("../README.md"))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![warn(missing_docs, missing_debug_implementations)]
//! Single-threaded signals with reentrant, mutation-safe dispatch.
//!
//! See the [`Signal`] and [`Connection`] types for details.

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(test)]
extern crate std;

#[macro_use]
pub(crate) mod util;

pub mod connection;
pub mod error;
pub mod signal;

#[doc(inline)]
pub use self::connection::Connection;
#[doc(inline)]
pub use self::error::InvalidSignal;
#[doc(inline)]
pub use self::signal::Signal;
