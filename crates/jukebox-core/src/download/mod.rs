pub mod downloader;
pub mod orchestrator;
pub mod pipeline;
pub mod types;

pub use orchestrator::DownloadHandle;
pub use types::*;
