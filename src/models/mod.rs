pub mod book;
pub mod metadata;

pub use book::{Book, CoverRecord};
pub use metadata::BookMetadata;
