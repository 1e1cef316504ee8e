//! Ideal instrument specifications keyed by `SPACECRAFT/INSTRUMENT`.
//!
//! A built-in table ships with the crate; a user file may extend or override
//! it. Entries are kept in load order and merged field by field when resolved,
//! so a later entry only replaces the keywords it actually sets.
//!
//! # File format
//!
//! ```text
//! Object = IdealInstrumentsSpecifications
//!   # comment
//!   Group = "MARS RECONNAISSANCE ORBITER/HIRISE"
//!     DetectorSamples = 20000
//!     TransX          = -92.9979
//!     ItransL         = 7749.8250
//!   End_Group
//! End_Object
//! End
//! ```

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::error::{NoprojError, Result};

const BUILTIN_SPECS: &str = include_str!("../data/ideal_specs.pvl");

/// One `Group` of a specs file. Every keyword is optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecsEntry {
    pub instrument_key: String,
    pub detector_samples: Option<u32>,
    pub detector_lines: Option<u32>,
    /// Focal-plane x offset, mm.
    pub trans_x: Option<f64>,
    /// Focal-plane y offset, mm.
    pub trans_y: Option<f64>,
    /// Detector sample offset, pixels.
    pub itrans_s: Option<f64>,
    /// Detector line offset, pixels.
    pub itrans_l: Option<f64>,
}

impl SpecsEntry {
    fn merge_from(&mut self, later: &SpecsEntry) {
        self.detector_samples = later.detector_samples.or(self.detector_samples);
        self.detector_lines = later.detector_lines.or(self.detector_lines);
        self.trans_x = later.trans_x.or(self.trans_x);
        self.trans_y = later.trans_y.or(self.trans_y);
        self.itrans_s = later.itrans_s.or(self.itrans_s);
        self.itrans_l = later.itrans_l.or(self.itrans_l);
    }
}

/// Resolved ideal geometry for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentGeometrySpec {
    pub instrument_key: String,
    pub detector_samples: u32,
    /// `None` means use the basis camera's detector lines.
    pub detector_lines: Option<u32>,
    pub trans_x: Option<f64>,
    pub trans_y: Option<f64>,
    pub itrans_s: Option<f64>,
    pub itrans_l: Option<f64>,
}

/// Ordered collection of specs entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecsTable {
    entries: Vec<SpecsEntry>,
}

impl SpecsTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_SPECS)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading specs file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing specs file {}", path.display()))
    }

    /// Built-in table, then the entries of `overrides` if given.
    pub fn load(overrides: Option<&Path>) -> anyhow::Result<Self> {
        let mut table = Self::builtin()?;
        if let Some(path) = overrides {
            let user = Self::from_file(path)?;
            info!(
                "Loaded {} specs entries from {}",
                user.entries.len(),
                path.display()
            );
            table = table.with_overrides(user);
        }
        info!("Specs table has {} entries", table.entries.len());
        Ok(table)
    }

    /// Append `later`'s entries so they win over this table's.
    pub fn with_overrides(mut self, later: SpecsTable) -> Self {
        self.entries.extend(later.entries);
        self
    }

    pub fn entries(&self) -> &[SpecsEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge every entry matching `instrument_key` (ASCII case-insensitive),
    /// later entries winning per field.
    pub fn resolve(&self, instrument_key: &str) -> Result<InstrumentGeometrySpec> {
        let mut matches = self
            .entries
            .iter()
            .filter(|e| e.instrument_key.eq_ignore_ascii_case(instrument_key));
        let mut merged = matches
            .next()
            .cloned()
            .ok_or_else(|| NoprojError::UnknownInstrument(instrument_key.to_string()))?;
        let mut count = 1;
        for later in matches {
            merged.merge_from(later);
            count += 1;
        }
        debug!("Resolved {} from {} specs entries", instrument_key, count);

        let detector_samples = merged.detector_samples.ok_or_else(|| {
            NoprojError::IncompatibleGeometry(format!(
                "specs for \"{}\" have no DetectorSamples",
                instrument_key
            ))
        })?;
        Ok(InstrumentGeometrySpec {
            instrument_key: merged.instrument_key,
            detector_samples,
            detector_lines: merged.detector_lines,
            trans_x: merged.trans_x,
            trans_y: merged.trans_y,
            itrans_s: merged.itrans_s,
            itrans_l: merged.itrans_l,
        })
    }

    /// Parse specs text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        let mut current: Option<SpecsEntry> = None;
        let mut depth = 0usize;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let err = |message: String| NoprojError::SpecsParse {
                line: line_no,
                message,
            };
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                match line.to_ascii_lowercase().as_str() {
                    "end" => break,
                    "end_group" => match current.take() {
                        Some(entry) => entries.push(entry),
                        None => return Err(err("End_Group without Group".to_string())),
                    },
                    "end_object" => {
                        if current.is_some() {
                            return Err(err("End_Object inside a Group".to_string()));
                        }
                        depth = depth
                            .checked_sub(1)
                            .ok_or_else(|| err("End_Object without Object".to_string()))?;
                    }
                    _ => {
                        return Err(err(format!(
                            "expected \"Keyword = Value\", found \"{}\"",
                            line
                        )))
                    }
                }
                continue;
            };

            let key = key.trim();
            let value = unquote(value.trim());
            match key.to_ascii_lowercase().as_str() {
                "object" => depth += 1,
                "group" => {
                    if current.is_some() {
                        return Err(err("nested Group".to_string()));
                    }
                    current = Some(SpecsEntry {
                        instrument_key: value.to_string(),
                        ..Default::default()
                    });
                }
                keyword => {
                    let Some(entry) = current.as_mut() else {
                        // Object-level keywords (UserName, Created, ...).
                        continue;
                    };
                    match keyword {
                        "detectorsamples" => {
                            entry.detector_samples = Some(parse_count(value).map_err(err)?)
                        }
                        "detectorlines" => {
                            entry.detector_lines = Some(parse_count(value).map_err(err)?)
                        }
                        "transx" => entry.trans_x = Some(parse_real(value).map_err(err)?),
                        "transy" => entry.trans_y = Some(parse_real(value).map_err(err)?),
                        "itranss" => entry.itrans_s = Some(parse_real(value).map_err(err)?),
                        "itransl" => entry.itrans_l = Some(parse_real(value).map_err(err)?),
                        _ => {}
                    }
                }
            }
        }

        if let Some(entry) = current {
            return Err(NoprojError::SpecsParse {
                line: text.lines().count(),
                message: format!("Group \"{}\" is not closed", entry.instrument_key),
            });
        }
        Ok(Self { entries })
    }
}

fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_count(value: &str) -> std::result::Result<u32, String> {
    value
        .parse::<u32>()
        .map_err(|_| format!("expected a positive integer, found \"{}\"", value))
}

fn parse_real(value: &str) -> std::result::Result<f64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("expected a number, found \"{}\"", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let table = SpecsTable::builtin().unwrap();
        assert!(table.len() > 20);
        let viking = table
            .resolve("VIKING_ORBITER_1/VISUAL_IMAGING_SUBSYSTEM_CAMERA_B")
            .unwrap();
        assert_eq!(viking.detector_samples, 1250);
        assert_eq!(viking.detector_lines, Some(1150));

        let hirise = table.resolve("MARS RECONNAISSANCE ORBITER/HIRISE").unwrap();
        assert_eq!(hirise.detector_lines, None);
        assert_eq!(hirise.trans_x, Some(-92.9979));
        assert_eq!(hirise.itrans_l, Some(7749.825));
        assert_eq!(hirise.trans_y, None);
    }

    #[test]
    fn test_case_insensitive_exact_match() {
        let table = SpecsTable::builtin().unwrap();
        assert!(table.resolve("messenger/mdis-nac").is_ok());
        assert!(matches!(
            table.resolve("MESSENGER/MDIS"),
            Err(NoprojError::UnknownInstrument(_))
        ));
    }

    #[test]
    fn test_sparse_override() {
        let base = SpecsTable::parse(
            "Group = \"A/B\"\n  DetectorSamples = 100\n  DetectorLines = 50\n  TransX = 1.5\nEnd_Group\n",
        )
        .unwrap();
        let user_text = "Group = \"A/B\"\n  DetectorLines = 80\nEnd_Group\nEnd\n";
        let user = SpecsTable::parse(user_text).unwrap();
        let spec = base.with_overrides(user).resolve("A/B").unwrap();
        assert_eq!(spec.detector_samples, 100);
        assert_eq!(spec.detector_lines, Some(80));
        assert_eq!(spec.trans_x, Some(1.5));
    }

    #[test]
    fn test_missing_samples() {
        let table = SpecsTable::parse("Group = X/Y\n DetectorLines = 3\nEnd_Group").unwrap();
        assert!(matches!(
            table.resolve("X/Y"),
            Err(NoprojError::IncompatibleGeometry(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        let bad_number = "Object = O\n Group = \"A/B\"\n  DetectorSamples = many\n End_Group\nEnd_Object";
        match SpecsTable::parse(bad_number) {
            Err(NoprojError::SpecsParse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected a parse error, got {:?}", other),
        }
        assert!(SpecsTable::parse("Group = A/B\nGroup = C/D\n").is_err());
        assert!(SpecsTable::parse("End_Group\n").is_err());
        assert!(SpecsTable::parse("Group = A/B\n DetectorSamples = 4\n").is_err());
        assert!(SpecsTable::parse("just words\n").is_err());
    }

    #[test]
    fn test_comments_and_unknown_keywords() {
        let text = "# header\nObject = IdealInstrumentsSpecifications\n  UserName = someone\n  \
                    Group = \"A/B\" # trailing\n    DetectorSamples = 7\n    Note = ignored\n  \
                    End_Group\nEnd_Object\nEnd\nGroup = \"after/end\"\n";
        let table = SpecsTable::parse(text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("A/B").unwrap().detector_samples, 7);
    }
}
