pub mod capabilities;
pub mod classifier;
pub mod config;
pub mod fetchers;
pub mod normalize;
pub mod posts;
pub mod queue;
pub mod registry;
pub mod review;
pub mod summarizer;
pub mod types;
pub mod utils;

pub use config::CuratorConfig;
pub use normalize::normalize_url;
pub use posts::PostStore;
pub use queue::{SeenUrls, SuggestionQueue};
pub use registry::SourceRegistry;
pub use review::ReviewWorkflow;
pub use summarizer::{SummarizerAdapter, DEFAULT_BATCH_SIZE};
pub use types::*;
