#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A phone directory keyed by name.
///
/// This module provides [`Directory`], which wraps the chained `HashTable`
/// with a configurable hasher and the name-to-[`Entry`] interface.
pub mod directory;

/// The record type stored in a [`Directory`].
pub mod entry;

/// Errors reported by table construction and resizing.
pub mod error;

pub mod hash_table;

pub use directory::Directory;
pub use entry::Entry;
pub use error::Error;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`Directory::with_capacity`] and
        /// [`Directory::with_capacity_and_load_factor`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`Directory::with_capacity`] and
        /// [`Directory::with_capacity_and_load_factor`].
        pub type DefaultHashBuilder = std::hash::RandomState;
    }
}
