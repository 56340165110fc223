pub mod kit_api;

pub use kit_api::{create_kit_router, ApiError, KitApiState};
