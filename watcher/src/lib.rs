//! # Watcher
//!
//! File system monitoring for the CADRAG command library. Watches the
//! library's backing files and turns raw file system events into a single
//! debounced rebuild trigger per burst of changes.
//!
//! ```text
//! notify events ──► LibraryWatcher ──► mpsc ──► debounce ──► trigger
//! ```
//!
//! The trigger fires once per settled burst, so a bulk edit that touches a
//! source file many times in quick succession causes one rebuild, not many.

pub mod debounce;
pub mod error;
pub mod watcher;

pub use debounce::debounce;
pub use error::{Result, WatcherError};
pub use watcher::LibraryWatcher;
