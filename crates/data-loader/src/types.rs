//! Core domain types for the movie catalog and the rating log.
//!
//! Two shapes of movie exist on purpose:
//! - [`MovieRecord`] is the mutable, pre-finalization row produced by parsing
//!   and enrichment. It has no position.
//! - [`Item`] is a row of a finalized [`Catalog`](crate::Catalog). Its row
//!   position is stamped by the catalog and cannot be set from outside.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

// =============================================================================
// Type Aliases
// =============================================================================

/// External identifier of a user in the rating log
pub type UserId = u32;

/// External identifier of a movie (MovieLens `movieId`)
pub type MovieId = u32;

/// Dense zero-based index into every row-aligned per-item array
pub type RowPosition = usize;

/// Sentinel stored for enrichment fields that are absent
pub const UNKNOWN: &str = "Unknown";

/// Valid rating scale of the MovieLens rating log
pub const RATING_SCALE: RangeInclusive<f32> = 0.5..=5.0;

/// Valid range of a tag genome relevance score
pub const RELEVANCE_SCALE: RangeInclusive<f32> = 0.0..=1.0;

// =============================================================================
// Movies
// =============================================================================

/// A parsed movie row before the catalog is finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub id: MovieId,
    /// Title as it appears in the source, e.g. "Toy Story (1995)"
    pub title: String,
    /// Year extracted from the trailing "(YYYY)" of the title
    pub year: Option<u16>,
    /// Ordered genre names, possibly empty
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
}

impl MovieRecord {
    /// Create a record without enrichment data
    pub fn new(id: MovieId, title: impl Into<String>, genres: Vec<String>) -> Self {
        let title = title.into();
        let year = crate::parser::extract_year_from_title(&title);
        Self {
            id,
            title,
            year,
            genres,
            director: None,
            cast: None,
        }
    }
}

/// A finalized catalog row.
///
/// `row_position` indexes this item's row in the embedding matrix and any
/// other per-item array built from the same catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: MovieId,
    pub title: String,
    /// Lookup form of the title, see [`normalize_title`](crate::normalize_title)
    pub normalized_title: String,
    pub year: Option<u16>,
    pub genres: Vec<String>,
    /// Director name, `"Unknown"` when enrichment had no match
    pub director: String,
    /// Comma-separated principal cast, `"Unknown"` when enrichment had no match
    pub cast: String,
    pub(crate) row_position: RowPosition,
}

impl Item {
    pub(crate) fn from_record(record: MovieRecord, row_position: RowPosition) -> Self {
        Self {
            id: record.id,
            normalized_title: crate::normalize_title(&record.title),
            title: record.title,
            year: record.year,
            genres: record.genres,
            director: known_or_unknown(record.director),
            cast: known_or_unknown(record.cast),
            row_position,
        }
    }

    /// Index of this item in all row-aligned arrays
    pub fn row_position(&self) -> RowPosition {
        self.row_position
    }

    /// Genres joined with `|`, the MovieLens presentation form
    pub fn genre_string(&self) -> String {
        self.genres.join("|")
    }

    /// Director, or `None` when it is the `"Unknown"` sentinel
    pub fn known_director(&self) -> Option<&str> {
        Some(self.director.as_str()).filter(|d| *d != UNKNOWN)
    }

    /// Cast, or `None` when it is the `"Unknown"` sentinel
    pub fn known_cast(&self) -> Option<&str> {
        Some(self.cast.as_str()).filter(|c| *c != UNKNOWN)
    }
}

fn known_or_unknown(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNKNOWN.to_string(),
    }
}

// =============================================================================
// Ratings and tags
// =============================================================================

/// One row of the rating log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value within [`RATING_SCALE`]
    pub rating: f32,
    /// Unix timestamp when rating was made
    pub timestamp: i64,
}

impl Interaction {
    pub fn new(user_id: UserId, movie_id: MovieId, rating: f32) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
            timestamp: 0,
        }
    }
}

/// Relevance of a genome tag to a movie (`genome-scores.csv`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagScore {
    pub movie_id: MovieId,
    pub tag_id: u32,
    pub relevance: f32,
}

/// Outside metadata joined onto movies by title and year (`metadata.csv`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub title: String,
    pub year: Option<u16>,
    pub director: Option<String>,
    pub cast: Option<String>,
}
