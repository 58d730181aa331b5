//! Catalog finalization and lookups.
//!
//! Row positions are stamped here and nowhere else. Every per-item array in
//! the system (embeddings, feature matrices) is indexed by them, so the
//! catalog only hands out new positions through [`Catalog::finalize`] and
//! [`Catalog::retain`], both of which produce a fresh fingerprint.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use crate::{enrich, parser};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use tracing::{debug, info};

/// Normalize a title for lookup: trim surrounding whitespace and case-fold.
///
/// Both the catalog titles and incoming queries go through this function.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Immutable table of movies with dense row positions `0..len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Item>", into = "Vec<Item>")]
pub struct Catalog {
    items: Vec<Item>,
    /// movie id -> row position
    by_id: HashMap<MovieId, RowPosition>,
    /// normalized title -> first row position carrying it
    by_title: HashMap<String, RowPosition>,
    fingerprint: u64,
}

impl Catalog {
    /// Stamp row positions on the final table order.
    ///
    /// Call this after every filtering and merging step. Duplicate movie ids
    /// are rejected.
    pub fn finalize(records: Vec<MovieRecord>) -> Result<Self> {
        let items = records
            .into_iter()
            .enumerate()
            .map(|(position, record)| Item::from_record(record, position))
            .collect();
        Self::from_items(items)
    }

    fn from_items(items: Vec<Item>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_title = HashMap::with_capacity(items.len());
        let mut duplicate_titles = 0usize;

        for (position, item) in items.iter().enumerate() {
            if item.row_position != position {
                return Err(DataLoadError::ValidationError(format!(
                    "row position {} found at index {}",
                    item.row_position, position
                )));
            }
            if by_id.insert(item.id, position).is_some() {
                return Err(DataLoadError::DuplicateItem(item.id));
            }
            // first row position in catalog order wins
            match by_title.entry(item.normalized_title.clone()) {
                Entry::Occupied(_) => duplicate_titles += 1,
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
            }
        }
        if duplicate_titles > 0 {
            debug!(
                "{} catalog rows share a normalized title with an earlier row",
                duplicate_titles
            );
        }

        let fingerprint = fingerprint_ids(items.iter().map(|item| item.id));
        Ok(Self {
            items,
            by_id,
            by_title,
            fingerprint,
        })
    }

    /// Load and finalize the catalog from a MovieLens directory.
    ///
    /// When `metadata` is given, director and cast are joined in before row
    /// positions are stamped.
    pub fn load_from_dir(data_dir: &Path, metadata: Option<&Path>) -> Result<Self> {
        info!("Loading catalog from {:?}", data_dir);
        let movies_path = data_dir.join("movies.csv");

        let (movies, metadata) = rayon::join(
            || parser::parse_movies(&movies_path),
            || metadata.map(parser::parse_metadata).transpose(),
        );
        let mut movies = movies?;
        if let Some(metadata) = metadata? {
            movies = enrich::enrich(movies, &metadata);
        }

        let catalog = Self::finalize(movies)?;
        info!("Catalog finalized with {} items", catalog.len());
        Ok(catalog)
    }

    /// Build a new catalog from the items matching `keep`.
    ///
    /// Positions are re-stamped, so anything aligned to `self` is stale for
    /// the result (its fingerprint differs whenever rows were dropped).
    pub fn retain(&self, mut keep: impl FnMut(&Item) -> bool) -> Result<Self> {
        let records = self
            .items
            .iter()
            .filter(|item| keep(item))
            .map(|item| MovieRecord {
                id: item.id,
                title: item.title.clone(),
                year: item.year,
                genres: item.genres.clone(),
                director: item.known_director().map(str::to_string),
                cast: item.known_cast().map(str::to_string),
            })
            .collect();
        Self::finalize(records)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Deterministic hash of the item ids in row order.
    ///
    /// Arrays built from this catalog carry the value so a reordered or
    /// different catalog of the same length is still detected.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, position: RowPosition) -> Option<&Item> {
        self.items.get(position)
    }

    pub fn get_by_id(&self, id: MovieId) -> Option<&Item> {
        self.position_of(id).and_then(|p| self.items.get(p))
    }

    pub fn position_of(&self, id: MovieId) -> Option<RowPosition> {
        self.by_id.get(&id).copied()
    }

    /// Resolve a free-text title to a row position.
    ///
    /// Exact match after [`normalize_title`]. When several rows share the
    /// normalized title, the first one in catalog order is returned.
    pub fn resolve_title(&self, query: &str) -> Option<RowPosition> {
        self.by_title.get(&normalize_title(query)).copied()
    }

    /// Case-insensitive substring search, in catalog order
    pub fn search(&self, fragment: &str) -> Vec<&Item> {
        let needle = normalize_title(fragment);
        self.items
            .iter()
            .filter(|item| item.normalized_title.contains(&needle))
            .collect()
    }
}

impl TryFrom<Vec<Item>> for Catalog {
    type Error = DataLoadError;

    fn try_from(items: Vec<Item>) -> Result<Self> {
        Self::from_items(items)
    }
}

impl From<Catalog> for Vec<Item> {
    fn from(catalog: Catalog) -> Self {
        catalog.items
    }
}

/// FNV-1a over the little-endian bytes of each id
fn fingerprint_ids(ids: impl Iterator<Item = MovieId>) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    ids.flat_map(|id| id.to_le_bytes())
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        Catalog::finalize(vec![
            MovieRecord::new(1, "Toy Story", vec!["Animation".into()]),
            MovieRecord::new(2, "Heat", vec!["Action".into()]),
            MovieRecord::new(3, "Speed", vec!["Action".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_positions_are_dense_and_ordered() {
        let catalog = sample();
        for (i, item) in catalog.items().iter().enumerate() {
            assert_eq!(item.row_position(), i);
        }
        assert_eq!(catalog.position_of(3), Some(2));
    }

    #[test]
    fn test_resolve_title_normalizes_query() {
        let catalog = sample();
        assert_eq!(catalog.resolve_title("toy story "), Some(0));
        assert_eq!(catalog.resolve_title("TOY STORY"), catalog.resolve_title("Toy Story"));
        assert_eq!(catalog.resolve_title("Toy"), None);
    }

    #[test]
    fn test_duplicate_title_resolves_to_first_row() {
        let catalog = Catalog::finalize(vec![
            MovieRecord::new(10, "Hamlet", vec![]),
            MovieRecord::new(11, "Other", vec![]),
            MovieRecord::new(12, "hamlet", vec![]),
        ])
        .unwrap();
        assert_eq!(catalog.resolve_title("Hamlet"), Some(0));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = Catalog::finalize(vec![
            MovieRecord::new(1, "A", vec![]),
            MovieRecord::new(1, "B", vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateItem(1)));
    }

    #[test]
    fn test_retain_restamps_positions_and_fingerprint() {
        let catalog = sample();
        let filtered = catalog.retain(|item| item.id != 1).unwrap();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.position_of(2), Some(0));
        assert_ne!(filtered.fingerprint(), catalog.fingerprint());
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let a = sample();
        let b = Catalog::finalize(vec![
            MovieRecord::new(2, "Heat", vec![]),
            MovieRecord::new(1, "Toy Story", vec![]),
            MovieRecord::new(3, "Speed", vec![]),
        ])
        .unwrap();
        assert_eq!(a.len(), b.len());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_enrichment_defaults_to_unknown() {
        let catalog = sample();
        let item = catalog.get(0).unwrap();
        assert_eq!(item.director, UNKNOWN);
        assert_eq!(item.known_director(), None);
    }

    #[test]
    fn test_deserialize_rejects_gapped_positions() {
        let catalog = sample();
        let mut json = serde_json::to_value(&catalog).unwrap();
        json[1]["row_position"] = serde_json::json!(5);

        let result: std::result::Result<Catalog, _> = serde_json::from_value(json);
        assert!(result.is_err());

        let roundtrip: Catalog =
            serde_json::from_value(serde_json::to_value(&catalog).unwrap()).unwrap();
        assert_eq!(roundtrip, catalog);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = sample();
        let hits = catalog.search("SPE");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 3);
    }
}
