//! Joins outside metadata (director, cast) onto parsed movies.
//!
//! Matching is by a loose title key plus a release-year tolerance. Every movie
//! comes out exactly once: unmatched movies keep the `"Unknown"` sentinel
//! instead of being dropped, so enrichment can never change the row count.

use crate::types::{ItemMetadata, MovieRecord};
use std::collections::HashMap;
use tracing::info;

/// Maximum difference between the movie year and the metadata year
pub const YEAR_TOLERANCE: u16 = 1;

/// Loose join key: lowercase, trailing "(YYYY)" removed, punctuation removed,
/// whitespace collapsed.
pub fn join_key(title: &str) -> String {
    let mut title = title.trim().to_lowercase();
    if crate::parser::extract_year_from_title(&title).is_some() {
        if let Some(start) = title.rfind('(') {
            title.truncate(start);
        }
    }
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn years_compatible(movie: Option<u16>, metadata: Option<u16>) -> bool {
    match (movie, metadata) {
        (Some(a), Some(b)) => a.abs_diff(b) <= YEAR_TOLERANCE,
        _ => true,
    }
}

/// Fill director and cast from the first qualifying metadata row.
pub fn enrich(movies: Vec<MovieRecord>, metadata: &[ItemMetadata]) -> Vec<MovieRecord> {
    let mut by_key: HashMap<String, Vec<&ItemMetadata>> = HashMap::new();
    for row in metadata {
        by_key.entry(join_key(&row.title)).or_default().push(row);
    }

    let mut with_director = 0usize;
    let mut with_cast = 0usize;
    let total = movies.len();

    let enriched: Vec<MovieRecord> = movies
        .into_iter()
        .map(|mut movie| {
            let matched = by_key.get(&join_key(&movie.title)).and_then(|rows| {
                rows.iter()
                    .find(|row| years_compatible(movie.year, row.year))
                    .copied()
            });
            if let Some(row) = matched {
                movie.director = row.director.clone();
                movie.cast = row.cast.clone();
            }
            with_director += usize::from(movie.director.is_some());
            with_cast += usize::from(movie.cast.is_some());
            movie
        })
        .collect();

    info!(
        "Enrichment: director known for {} of {}, cast known for {} of {}",
        with_director, total, with_cast, total
    );
    enriched
}
