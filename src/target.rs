//! Target identifiers and the delimited target-string parser.
//!
//! Target strings come in two flavours: the `|`-separated lists inside a
//! parametrize declaration (`'esp32|esp32s2'`) and the `,`-separated
//! selector a user passes on the command line (`"esp32s3,esp32s2, esp32s2"`).
//! Both go through [`parse`]; only the delimiter differs.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::CaseError;

static TARGET_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap());

/// Separator used inside multi-target parametrize values.
pub const SPEC_DELIMITER: char = '|';

/// Separator used in user-supplied selector strings.
pub const SELECTOR_DELIMITER: char = ',';

/// An opaque board/chip identifier. Equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Trims `raw` and validates identifier syntax.
    pub fn new(raw: &str) -> Result<Self, CaseError> {
        Self::parse_element(raw, raw, SELECTOR_DELIMITER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parse_element(element: &str, whole: &str, delimiter: char) -> Result<Self, CaseError> {
        let trimmed = element.trim();
        if trimmed.is_empty() {
            return Err(CaseError::invalid_target(whole, "empty target", delimiter));
        }
        if !TARGET_ID.is_match(trimmed) {
            return Err(CaseError::invalid_target(
                whole,
                format!("'{}' is not a valid target identifier", trimmed),
                delimiter,
            ));
        }
        Ok(TargetId(trimmed.to_string()))
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for TargetId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// An ordered list of targets, one per device a case needs.
///
/// Order is kept for display; matching compares the sorted form
/// ([`TargetSequence::sorted`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TargetSequence(Vec<TargetId>);

impl TargetSequence {
    pub fn new(targets: Vec<TargetId>) -> Self {
        TargetSequence(targets)
    }

    /// `target` repeated `count` times.
    pub fn repeated(target: &TargetId, count: usize) -> Self {
        TargetSequence(vec![target.clone(); count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TargetId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[TargetId] {
        &self.0
    }

    /// Sorted copy used for multiset comparison.
    pub fn sorted(&self) -> Vec<&TargetId> {
        let mut sorted: Vec<&TargetId> = self.0.iter().collect();
        sorted.sort();
        sorted
    }

    /// True when both sequences hold the same targets with the same
    /// multiplicities, in any order.
    pub fn same_multiset(&self, other: &TargetSequence) -> bool {
        self.len() == other.len() && self.sorted() == other.sorted()
    }

    /// Targets joined with `delimiter`, e.g. `esp32,esp32s2`.
    pub fn join(&self, delimiter: char) -> String {
        let mut out = String::new();
        for (i, target) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            out.push_str(target.as_str());
        }
        out
    }
}

impl fmt::Display for TargetSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.join(SELECTOR_DELIMITER))
    }
}

impl<'a> IntoIterator for &'a TargetSequence {
    type Item = &'a TargetId;
    type IntoIter = std::slice::Iter<'a, TargetId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PartialEq<[&str]> for TargetSequence {
    fn eq(&self, other: &[&str]) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for TargetSequence {
    fn eq(&self, other: &[&str; N]) -> bool {
        *self == other[..]
    }
}

/// Splits `raw` on `delimiter` into a [`TargetSequence`].
///
/// Each element is trimmed; empty or malformed elements fail with
/// `InvalidTargetSpec`. Order and duplicates are preserved.
pub fn parse(raw: &str, delimiter: char) -> Result<TargetSequence, CaseError> {
    raw.split(delimiter)
        .map(|element| TargetId::parse_element(element, raw, delimiter))
        .collect::<Result<Vec<_>, _>>()
        .map(TargetSequence)
}

/// Parses a `|`-separated declaration value such as `esp32|esp32s2`.
pub fn parse_spec(raw: &str) -> Result<TargetSequence, CaseError> {
    parse(raw, SPEC_DELIMITER)
}

/// Parses a `,`-separated selector string such as `esp32s3, esp32s2`.
pub fn parse_selector(raw: &str) -> Result<TargetSequence, CaseError> {
    parse(raw, SELECTOR_DELIMITER)
}
