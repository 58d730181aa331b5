//! Parsers for the MovieLens CSV files and the optional metadata file.
//!
//! - movies.csv: movieId,title,genres
//! - ratings.csv: userId,movieId,rating,timestamp
//! - genome-scores.csv: movieId,tagId,relevance
//! - genome-tags.csv: tagId,tag
//! - metadata.csv: title,year,director,cast
//!
//! Each file starts with a header row. Columns are read by position, so the
//! header names are not checked. Quoted fields may contain commas and line
//! breaks, e.g. `"American President, The (1995)"`.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use csv::StringRecord;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// MovieLens marker for a movie with an empty genre set
const NO_GENRES: &str = "(no genres listed)";

#[derive(Debug, Deserialize)]
struct MovieRow {
    movie_id: MovieId,
    title: String,
    genres: String,
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    user_id: UserId,
    movie_id: MovieId,
    rating: f32,
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GenomeScoreRow {
    movie_id: MovieId,
    tag_id: u32,
    relevance: f32,
}

#[derive(Debug, Deserialize)]
struct GenomeTagRow {
    tag_id: u32,
    tag: String,
}

#[derive(Debug, Deserialize)]
struct MetadataRow {
    title: String,
    year: String,
    director: String,
    cast: String,
}

/// Read a whole file, replacing invalid UTF-8 sequences
fn read_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Line on which a record starts, 1-based
fn line_of(record: &StringRecord) -> usize {
    record.position().map_or(0, |pos| pos.line() as usize)
}

fn csv_error(file: &str, line: usize, err: csv::Error) -> DataLoadError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => DataLoadError::FieldCountMismatch {
            file: file.to_string(),
            expected: *expected_len as usize,
            found: *len as usize,
            line: pos.as_ref().map_or(line, |pos| pos.line() as usize),
        },
        csv::ErrorKind::Deserialize { err, .. } => DataLoadError::ParseError {
            file: file.to_string(),
            line,
            reason: err.to_string(),
        },
        _ => DataLoadError::ParseError {
            file: file.to_string(),
            line: err.position().map_or(line, |pos| pos.line() as usize),
            reason: err.to_string(),
        },
    }
}

/// Deserialize every data row of `content` as (line number, row).
///
/// Blank lines are skipped and fields are trimmed. Every record must have
/// as many fields as the header.
fn read_rows<T: DeserializeOwned>(content: &str, file: &str) -> Result<Vec<(usize, T)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| csv_error(file, 0, e))?;
            let line = line_of(&record);
            let row = record
                .deserialize(None)
                .map_err(|e| csv_error(file, line, e))?;
            Ok((line, row))
        })
        .collect()
}

/// Parse the movies.csv file
pub fn parse_movies(path: &Path) -> Result<Vec<MovieRecord>> {
    parse_movies_str(&read_file(path)?)
}

pub fn parse_movies_str(content: &str) -> Result<Vec<MovieRecord>> {
    const FILE: &str = "movies.csv";

    read_rows::<MovieRow>(content, FILE)?
        .into_iter()
        .map(|(line, row)| {
            if row.title.is_empty() {
                return Err(DataLoadError::ParseError {
                    file: FILE.to_string(),
                    line,
                    reason: "Missing title".to_string(),
                });
            }
            Ok(MovieRecord::new(row.movie_id, row.title, parse_genres(&row.genres)))
        })
        .collect()
}

/// Parse the ratings.csv file
pub fn parse_ratings(path: &Path) -> Result<Vec<Interaction>> {
    parse_ratings_str(&read_file(path)?)
}

pub fn parse_ratings_str(content: &str) -> Result<Vec<Interaction>> {
    const FILE: &str = "ratings.csv";

    read_rows::<RatingRow>(content, FILE)?
        .into_iter()
        .map(|(_, row)| {
            if !RATING_SCALE.contains(&row.rating) {
                return Err(DataLoadError::InvalidValue {
                    field: "rating".to_string(),
                    value: row.rating.to_string(),
                });
            }
            Ok(Interaction {
                user_id: row.user_id,
                movie_id: row.movie_id,
                rating: row.rating,
                timestamp: row.timestamp.unwrap_or(0),
            })
        })
        .collect()
}

/// Parse the genome-scores.csv file
pub fn parse_genome_scores(path: &Path) -> Result<Vec<TagScore>> {
    parse_genome_scores_str(&read_file(path)?)
}

pub fn parse_genome_scores_str(content: &str) -> Result<Vec<TagScore>> {
    const FILE: &str = "genome-scores.csv";

    read_rows::<GenomeScoreRow>(content, FILE)?
        .into_iter()
        .map(|(_, row)| {
            // NaN fails the range check too
            if !RELEVANCE_SCALE.contains(&row.relevance) {
                return Err(DataLoadError::InvalidValue {
                    field: "relevance".to_string(),
                    value: row.relevance.to_string(),
                });
            }
            Ok(TagScore {
                movie_id: row.movie_id,
                tag_id: row.tag_id,
                relevance: row.relevance,
            })
        })
        .collect()
}

/// Parse the genome-tags.csv file into (tagId, tag) pairs
pub fn parse_genome_tags(path: &Path) -> Result<Vec<(u32, String)>> {
    parse_genome_tags_str(&read_file(path)?)
}

pub fn parse_genome_tags_str(content: &str) -> Result<Vec<(u32, String)>> {
    Ok(read_rows::<GenomeTagRow>(content, "genome-tags.csv")?
        .into_iter()
        .map(|(_, row)| (row.tag_id, row.tag))
        .collect())
}

/// Parse the outside metadata file used for enrichment
pub fn parse_metadata(path: &Path) -> Result<Vec<ItemMetadata>> {
    parse_metadata_str(&read_file(path)?)
}

pub fn parse_metadata_str(content: &str) -> Result<Vec<ItemMetadata>> {
    const FILE: &str = "metadata.csv";

    read_rows::<MetadataRow>(content, FILE)?
        .into_iter()
        .map(|(line, row)| {
            let year = match optional_text(&row.year) {
                None => None,
                Some(year) => Some(year.parse::<u16>().map_err(|e| DataLoadError::ParseError {
                    file: FILE.to_string(),
                    line,
                    reason: format!("Invalid year: {}", e),
                })?),
            };
            Ok(ItemMetadata {
                title: row.title,
                year,
                director: optional_text(&row.director),
                cast: optional_text(&row.cast),
            })
        })
        .collect()
}

fn optional_text(value: &str) -> Option<String> {
    match value.trim() {
        "" | "\\N" => None,
        v => Some(v.to_string()),
    }
}

/// Extract year from movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
pub fn extract_year_from_title(title: &str) -> Option<u16> {
    let title = title.trim_end();
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end && end == title.len() - 1 {
        return title[start + 1..end].trim().parse::<u16>().ok();
    }
    None
}

/// Parse pipe-separated genres
///
/// Example: "Action|Adventure|Sci-Fi" -> ["Action", "Adventure", "Sci-Fi"]
pub fn parse_genres(s: &str) -> Vec<String> {
    let s = s.trim();
    if s.is_empty() || s == NO_GENRES {
        return Vec::new();
    }
    s.split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}
