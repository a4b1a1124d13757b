//! Archive layer: locating the right capture for a window and turning it
//! into normalised text.

pub mod extract;
pub mod resolver;
mod service;

#[cfg(feature = "wayback")]
pub mod wayback;

pub use extract::{ContentExtractor, normalize_content};
pub use resolver::{SnapshotResolver, select_closest};
pub use service::{ArchiveError, ArchiveService, FetchedContent};

#[cfg(feature = "wayback")]
pub use wayback::WaybackClient;
