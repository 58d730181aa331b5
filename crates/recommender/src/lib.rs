//! # Recommender Crate
//!
//! The online read path over built artifacts.
//!
//! ## Main Components
//!
//! - **similarity**: Top-N cosine ranking over item embeddings
//! - **predictor**: Rating prediction from latent factors
//! - **evaluator**: RMSE against truth ratings
//! - **context**: Immutable serving context and the atomically swapped store
//!
//! ## Example Usage
//!
//! ```ignore
//! use recommender::ServingContext;
//! use std::path::Path;
//!
//! let context = ServingContext::load(Path::new("artifacts"))?;
//! for rec in context.recommend("Toy Story (1995)", 10)? {
//!     println!("{} {:.4}", rec.title, rec.score);
//! }
//! ```

pub mod context;
pub mod evaluator;
pub mod predictor;
pub mod similarity;

pub use context::{ModelStore, Recommendation, ServingContext};
pub use evaluator::{EvaluationReport, Evaluator};
pub use predictor::RatingPredictor;
pub use similarity::{ScoredItem, SimilarityRanker, cosine_similarity, round_score};
