//! Index cache, catalog merge and download engine for song replacements
//! ("nongs") in Geometry Dash.

pub mod api;
pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod index;
pub mod manager;
pub mod nongs;
pub mod registry;

// Re-export commonly used types
pub use config::JukeboxConfig;
pub use download::{DownloadHandle, DownloadOutcome, DownloadStage};
pub use error::{JukeboxError, Result};
pub use events::{ChannelSink, EventSink, JukeboxEvent, LogSink};
pub use index::{IndexMetadata, IndexSource};
pub use manager::IndexManager;
pub use nongs::{Nongs, RemoteNongs, Song};
pub use registry::{LocalRegistry, MemoryRegistry};
