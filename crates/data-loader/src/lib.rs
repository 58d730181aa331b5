//! # Data Loader Crate
//!
//! Loads the MovieLens CSV files and produces the finalized movie catalog.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (MovieRecord, Item, Interaction, TagScore)
//! - **parser**: Parse the CSV files into Rust structs
//! - **enrich**: Join outside director/cast metadata onto movies
//! - **catalog**: Finalize row positions, title resolution, fingerprinting
//! - **dataset**: Load a whole data directory in parallel
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{Dataset, LoadOptions};
//! use std::path::Path;
//!
//! let dataset = Dataset::load_from_dir(Path::new("data/ml-latest-small"), &LoadOptions::default())?;
//!
//! let position = dataset.catalog.resolve_title("toy story (1995)").unwrap();
//! let item = dataset.catalog.get(position).unwrap();
//! println!("{} is row {}", item.title, item.row_position());
//! ```

pub mod catalog;
pub mod dataset;
pub mod enrich;
pub mod error;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use catalog::{Catalog, normalize_title};
pub use dataset::{Dataset, LoadOptions, TagGenome};
pub use error::{DataLoadError, Result};
pub use types::{
    // Type aliases
    MovieId,
    RowPosition,
    UserId,
    // Core types
    Interaction,
    Item,
    ItemMetadata,
    MovieRecord,
    TagScore,
    // Constants
    RATING_SCALE,
    RELEVANCE_SCALE,
    UNKNOWN,
};
