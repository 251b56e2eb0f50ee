pub mod bulk_service;
pub mod image_storage;
pub mod listing_service;
pub mod product_policy;
pub mod product_service;

pub use bulk_service::BulkDeleteOutcome;
pub use image_storage::{ImageStorage, LocalImageStorage, S3ImageStorage};
pub use listing_service::{
    DEFAULT_SESSION_IDLE_TIMEOUT, ListingController, ListingIntent, ListingSessions, ListingView,
};
pub use product_policy::{Authorizer, Capability, ProductPolicy};
pub use product_service::ProductService;
