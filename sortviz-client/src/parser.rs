//! Element set parsing
//!
//! Turns the free-form text a user types into the deduplicated set of numbers
//! that is sent to the sort service. Malformed tokens are dropped, never
//! reported.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::HashSet;

/// Separator between values in the raw input text
pub const DELIMITER: char = ',';

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Distinct finite numbers taken from user input
///
/// Iteration follows first-occurrence order of the input. The set is never
/// edited after construction; a new input produces a new set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSet {
    values: Vec<f64>,
}

impl ElementSet {
    /// Build a set from arbitrary values, dropping non-finite values and duplicates
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut seen = HashSet::new();
        let values = values
            .into_iter()
            .filter(|v| v.is_finite())
            .filter(|v| seen.insert(numeric_key(*v)))
            .collect();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.values
            .iter()
            .any(|v| numeric_key(*v) == numeric_key(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Parse comma separated text into an element set
///
/// A token survives when, after trimming whitespace, it is non-empty and
/// parses as a finite number. Everything else is silently skipped, so an
/// input with no usable token yields an empty set.
pub fn parse(raw_text: &str) -> ElementSet {
    ElementSet::from_values(raw_text.split(DELIMITER).filter_map(parse_token))
}

fn parse_token(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

// 0.0 and -0.0 compare equal and must collapse to one element
fn numeric_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Wire form of a single element: integral values go out as JSON integers
struct WireNumber(f64);

impl Serialize for WireNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER {
            serializer.serialize_i64(v as i64)
        } else {
            serializer.serialize_f64(v)
        }
    }
}

impl Serialize for ElementSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len()))?;
        for v in &self.values {
            seq.serialize_element(&WireNumber(*v))?;
        }
        seq.end()
    }
}
