pub mod cache;
pub mod fetcher;
pub mod names;
pub mod types;

pub use cache::*;
pub use fetcher::*;
pub use names::NameCache;
pub use types::*;
