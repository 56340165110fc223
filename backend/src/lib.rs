pub mod api;
pub mod bridges;
pub mod calldata;
pub mod chains;
pub mod config;
pub mod detection;
pub mod kit;
pub mod platforms;
pub mod registry;
pub mod types;
pub mod utils;

pub use calldata::MintRecord;
pub use chains::Chain;
pub use config::KitConfig;
pub use detection::DetectionEngine;
pub use kit::{KitError, NftOpenActionKit};
pub use platforms::{PlatformError, PlatformService};
pub use registry::PlatformRegistry;
