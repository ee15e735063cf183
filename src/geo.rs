//! Area-code to US state resolution.
//!
//! The canonical table ships as a CSV data file embedded at compile time.
//! Deployments can swap in an updated table via `[geo] table_path` without a
//! rebuild; the file uses the same `area,state` format.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Returned whenever the area code is absent from the table or the number is
/// too short to carry one.
pub const UNKNOWN_STATE: &str = "Unknown";

const EMBEDDED_TABLE: &str = include_str!("../data/area_codes.csv");

/// Immutable area-code lookup table, loaded once at startup.
pub struct AreaCodeTable {
    codes: HashMap<String, String>,
}

impl AreaCodeTable {
    /// Loads the table, preferring `override_path` when configured.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let table = match override_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read area code table: {}", path.display())
                })?;
                let table = Self::parse(&raw)
                    .with_context(|| format!("Invalid area code table: {}", path.display()))?;
                info!(
                    "Loaded {} area codes from {}",
                    table.codes.len(),
                    path.display()
                );
                table
            }
            None => Self::parse(EMBEDDED_TABLE).context("Embedded area code table is invalid")?,
        };

        Ok(table)
    }

    fn parse(raw: &str) -> Result<Self> {
        let mut codes = HashMap::new();

        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || (index == 0 && line.eq_ignore_ascii_case("area,state")) {
                continue;
            }

            let (area, state) = line
                .split_once(',')
                .with_context(|| format!("Line {}: expected 'area,state'", index + 1))?;

            let area = area.trim();
            let state = state.trim();
            if area.len() != 3 || !area.bytes().all(|b| b.is_ascii_digit()) {
                anyhow::bail!("Line {}: '{}' is not a 3-digit area code", index + 1, area);
            }
            if state.is_empty() {
                anyhow::bail!("Line {}: missing state name", index + 1);
            }

            codes.insert(area.to_string(), state.to_string());
        }

        if codes.is_empty() {
            anyhow::bail!("Area code table contains no entries");
        }

        Ok(Self { codes })
    }

    /// Maps a phone number to the full US state name of its area code.
    ///
    /// The area code is the 3 digits preceding the last 7, so both 10-digit
    /// national and 11-digit (or longer) prefixed forms resolve the same way.
    /// Falls back to [`UNKNOWN_STATE`] instead of failing.
    #[must_use]
    pub fn detect_state(&self, number: &str) -> &str {
        let digits: String = number.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 10 {
            return UNKNOWN_STATE;
        }

        let area = &digits[digits.len() - 10..digits.len() - 7];
        self.codes.get(area).map_or(UNKNOWN_STATE, String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Canonical form used as the unique identity key: trimmed, a single leading
/// `+` kept when present, every other non-digit dropped. Two spellings of the
/// same number normalize identically, so duplicate detection ignores
/// formatting.
#[must_use]
pub fn normalize_number(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return String::new();
    }

    if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    }
}
