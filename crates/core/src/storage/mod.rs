//! Scratch storage for conversion jobs.
//!
//! Each job gets a [`ScratchPair`] (input, output and palette paths under one
//! collision-free id) wrapped in a [`ScratchGuard`] that releases the files
//! on every exit path. Converted outputs destined for download links are
//! written to a separate downloads directory with [`StorageManager::publish`].
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/inbound/<id>_<name>          staged uploads
//! <root>/outbound/<id>_<stem>.<ext>   engine output
//! <root>/outbound/<id>_palette.png    two-pass GIF palette
//! <root>/downloads/<id>_<stem>.<ext>  published results
//! ```

mod config;
mod error;
mod manager;
mod sanitize;

pub use config::StorageConfig;
pub use error::StorageError;
pub use manager::{PublishedFile, ScratchGuard, ScratchPair, StorageManager};
pub use sanitize::{sanitize_name, split_stem, MAX_NAME_LEN};
