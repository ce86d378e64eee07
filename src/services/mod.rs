pub mod cover;

pub use cover::{
    BackfillStats, CoverConfig, CoverError, CoverImage, CoverResolutionEngine, CoverService,
    ImageByteFetcher, LibraryBackfillJob,
};
