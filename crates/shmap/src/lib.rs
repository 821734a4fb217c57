//! Shared file mappings with lock-free 64-bit compare-and-swap.
//!
//! Independent processes that map the same file can coordinate through
//! [`Mapping::compare_and_swap`] and poll with [`Mapping::read_u64`]. Framing,
//! sequencing and retry policy are left to the caller.

pub mod errors;
pub mod mapping;
mod platform;
pub mod thread_id;

pub use errors::MapError;
pub use mapping::{AccessMode, Mapping, WORD_SIZE};
pub use platform::FileHandle;
pub use thread_id::current_thread_id;
