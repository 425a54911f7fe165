//! Fixed-capacity first-fit block arena.
//!
//! A [`BlockArena`] owns one pre-reserved byte buffer and hands out
//! variable-sized blocks from it. Bookkeeping lives in the buffer itself:
//! every block is prefixed by a 4-byte header packing a free flag and a
//! 31-bit payload size, and the blocks tile the buffer exactly.
//!
//! # Architecture
//!
//! ```text
//! BlockArena
//! ├── RawBuffer (capacity bytes, zeroed, never reallocated)
//! │   └── [hdr|payload][hdr|payload]...[hdr|payload]
//! ├── ArenaConfig (capacity, invalid-handle policy)
//! └── ArenaId (stamped into every handle it mints)
//! ```
//!
//! # Operations
//!
//! - **allocate / release:** raw byte blocks via [`BlockHandle`].
//! - **construct / destroy:** typed values via [`TypedHandle`], placed at
//!   an address aligned for the type.
//! - **blocks / stats / check_layout:** read-only inspection.
//!
//! # Safety
//!
//! `unsafe` is confined to `raw` (buffer ownership and pointer access) and
//! `typed` (moving values in and out). Every other module is safe code.
//!
//! # Threading
//!
//! The arena is neither `Send` nor `Sync`. Wrap it in a lock to share it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod handle;
pub mod header;
pub mod layout;
mod raw;
mod typed;

// Public re-exports for the primary API surface.
pub use arena::BlockArena;
pub use config::{ArenaConfig, InvalidHandlePolicy};
pub use error::{ArenaError, LayoutViolation};
pub use handle::{ArenaId, BlockHandle, TypedHandle};
pub use header::{BlockHeader, HEADER_SIZE, MAX_BLOCK_SIZE};
pub use layout::{ArenaStats, BlockInfo, Blocks};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
