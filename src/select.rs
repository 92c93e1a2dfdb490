//! Case selection: collection modes and explicit target selectors.

use std::{fmt, str::FromStr};

use clap::ValueEnum;

use crate::{
    case::{Case, ExpansionRule},
    errors::CaseError,
    target::{parse_selector, TargetSequence},
};

/// Fixed filtering policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum CollectMode {
    /// Every case.
    All,
    /// Only cases declared with an explicit multi-target parametrization.
    MultiAllWithParam,
}

impl CollectMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CollectMode::All => "all",
            CollectMode::MultiAllWithParam => "multi_all_with_param",
        }
    }
}

impl fmt::Display for CollectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to keep out of the collected cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionSelector {
    /// Cases whose targets are exactly this multiset.
    Targets(TargetSequence),
    Mode(CollectMode),
}

impl CollectionSelector {
    /// Parses a comma-separated target list such as `esp32s3,esp32s2`.
    pub fn targets(raw: &str) -> Result<Self, CaseError> {
        parse_selector(raw).map(CollectionSelector::Targets)
    }

    fn accepts(&self, case: &Case) -> bool {
        match self {
            CollectionSelector::Mode(CollectMode::All) => true,
            CollectionSelector::Mode(CollectMode::MultiAllWithParam) => {
                case.rule() == ExpansionRule::ExplicitMultiplicity
            }
            CollectionSelector::Targets(wanted) => case.targets().same_multiset(wanted),
        }
    }
}

impl From<CollectMode> for CollectionSelector {
    fn from(mode: CollectMode) -> Self {
        CollectionSelector::Mode(mode)
    }
}

impl FromStr for CollectionSelector {
    type Err = CaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::targets(s)
    }
}

impl fmt::Display for CollectionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionSelector::Targets(targets) => write!(f, "targets {}", targets),
            CollectionSelector::Mode(mode) => write!(f, "mode {}", mode),
        }
    }
}

/// Returns the cases `selector` accepts, in their original order.
///
/// Pure: the same inputs always give the same output, and an empty result
/// is a valid answer.
pub fn filter(all_cases: &[Case], selector: &CollectionSelector) -> Vec<Case> {
    if let CollectionSelector::Mode(CollectMode::All) = selector {
        return all_cases.to_vec();
    }
    all_cases
        .iter()
        .filter(|case| selector.accepts(case))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_from_str() {
        let selector: CollectionSelector = "esp32s3, esp32s2".parse().unwrap();
        let CollectionSelector::Targets(targets) = selector else {
            panic!("expected explicit targets");
        };
        assert_eq!(targets, ["esp32s3", "esp32s2"]);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(CollectMode::All.to_string(), "all");
        assert_eq!(
            CollectMode::MultiAllWithParam.to_string(),
            "multi_all_with_param"
        );
    }
}
