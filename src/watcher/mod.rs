//! Batching file watcher over an injectable OS notification facility.
//!
//! # Architecture
//!
//! ```text
//! WatchFacility (notify or manual)
//!   - one EventStream over all roots
//!         |
//!   ChangeClassifier (existence history)
//!         |
//!   BatchingChangeWatcher
//!   - pending: path -> latest kind
//!   - timer flush every publish interval
//!         |
//!      callback(Vec<FileEvent>)
//! ```

mod batching;
mod classifier;
mod error;
mod facility;
pub mod manual;
mod notify_facility;

pub use batching::{BatchCallback, BatchingChangeWatcher, BatchingOptions, PathFilter};
pub use classifier::ChangeClassifier;
pub use error::WatchError;
pub use facility::{
    EventStream, RawEventCallback, RawEventFlags, RawNotification, StreamFlags, WatchFacility,
};
pub use manual::{ManualFacility, StreamState};
pub use notify_facility::NotifyFacility;
