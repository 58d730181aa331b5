//! # Models Crate
//!
//! Offline builders and the artifacts they produce.
//!
//! ## Main Components
//!
//! - **linalg**: Seeded randomized truncated SVD over dense or sparse operators
//! - **features**: Genre and tag-relevance feature matrices
//! - **embeddings**: Item embeddings aligned with the catalog
//! - **ratings**: Dense id maps and the sparse rating matrix
//! - **factors**: User/item latent factors
//! - **alignment**: Row-count and fingerprint checks
//! - **artifacts**: Save and load a build run
//! - **config**: Build parameters
//! - **error**: Error taxonomy shared with the serving path

pub mod alignment;
pub mod artifacts;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod factors;
pub mod features;
pub mod linalg;
pub mod ratings;

pub use artifacts::{ArtifactSet, Manifest};
pub use config::{BuildConfig, FeatureSource};
pub use embeddings::{EmbeddingBuilder, EmbeddingMatrix, EmbeddingRow};
pub use error::{ErrorKind, IdKind, ModelError, Result};
pub use factors::{FactorModel, FactorModelBuilder};
pub use features::{FeatureMatrix, genre_features, tag_features};
pub use linalg::{LinearOperator, RandomizedSvd, TruncatedSvd};
pub use ratings::{IdMap, RatingMatrix};
