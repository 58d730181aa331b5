//! Checks run before any positional array is indexed.
//!
//! Row-aligned arrays are only trusted after their length (and, where
//! available, the catalog fingerprint they were built against) matches the
//! catalog they are used with.

use crate::error::{ModelError, Result};
use data_loader::Catalog;

/// Fail unless an array has exactly `expected` rows
pub fn ensure_rows(what: &str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(ModelError::Alignment(format!(
            "{} has {} rows but the catalog has {}",
            what, found, expected
        )));
    }
    Ok(())
}

/// Fail unless `row` indexes into an array of `len` rows
pub fn ensure_in_bounds(what: &str, row: usize, len: usize) -> Result<()> {
    if row >= len {
        return Err(ModelError::Alignment(format!(
            "row position {} is outside {} bounds (0..{})",
            row, what, len
        )));
    }
    Ok(())
}

/// Fail unless an artifact was built from this exact catalog
pub fn ensure_built_from(what: &str, catalog: &Catalog, rows: usize, fingerprint: u64) -> Result<()> {
    ensure_rows(what, catalog.len(), rows)?;
    if catalog.fingerprint() != fingerprint {
        return Err(ModelError::Alignment(format!(
            "{} was built from catalog {:016x}, not {:016x}",
            what,
            fingerprint,
            catalog.fingerprint()
        )));
    }
    Ok(())
}
