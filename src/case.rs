//! Case expansion.
//!
//! A test function declares the targets it needs in two ways: plain marks
//! (`@pytest.mark.esp32`) and multiplicity declarations (the `count` /
//! `target` parametrization). [`expand`] turns one function's declarations
//! into the flat list of [`Case`]s a runner has to execute.

use std::{fmt, num::NonZeroUsize};

use serde::Serialize;
use tracing::trace;

use crate::{
    errors::CaseError,
    target::{TargetId, TargetSequence, SELECTOR_DELIMITER, SPEC_DELIMITER},
};

/// A single target attached directly to a test function.
pub type Mark = TargetId;

/// A `(count, target)` parametrization value. `spec`, when present, must
/// list exactly `count` targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplicityDeclaration {
    pub count: NonZeroUsize,
    pub spec: Option<TargetSequence>,
}

impl MultiplicityDeclaration {
    pub fn explicit(count: NonZeroUsize, spec: TargetSequence) -> Self {
        Self {
            count,
            spec: Some(spec),
        }
    }

    pub fn count_only(count: NonZeroUsize) -> Self {
        Self { count, spec: None }
    }

    pub fn is_explicit(&self) -> bool {
        self.spec.is_some()
    }
}

/// Which expansion rule produced a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionRule {
    /// One case per mark, one device each.
    SimpleMark,
    /// One case per explicit `(count, target)` declaration.
    ExplicitMultiplicity,
    /// Each mark repeated `count` times, per count-only declaration.
    MarkRepeated,
}

/// One resolved run configuration: a test function and the targets of the
/// devices it runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Case {
    name: String,
    targets: TargetSequence,
    #[serde(skip)]
    rule: ExpansionRule,
}

impl Case {
    fn new(name: &str, targets: TargetSequence, rule: ExpansionRule) -> Self {
        Self {
            name: name.to_string(),
            targets,
            rule,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn targets(&self) -> &TargetSequence {
        &self.targets
    }

    pub fn rule(&self) -> ExpansionRule {
        self.rule
    }

    /// Comma-joined targets, the form CI jobs pass back as a selector.
    pub fn target_selector(&self) -> String {
        self.targets.join(SELECTOR_DELIMITER)
    }

    pub fn is_single_dut(&self) -> bool {
        self.targets.len() == 1
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.targets)
    }
}

/// Expands one test function's marks and declarations into cases.
///
/// Rules, chosen by what is declared:
/// - marks only: one single-device case per mark, in mark order;
/// - explicit declarations: one case per declaration with its targets
///   verbatim, marks ignored;
/// - count-only declarations: for each mark, for each declaration, the mark
///   repeated `count` times.
///
/// A function with nothing declared expands to no cases.
pub fn expand(
    function_name: &str,
    marks: &[Mark],
    declarations: &[MultiplicityDeclaration],
) -> Result<Vec<Case>, CaseError> {
    if declarations.is_empty() {
        let cases = marks
            .iter()
            .map(|mark| {
                Case::new(
                    function_name,
                    TargetSequence::repeated(mark, 1),
                    ExpansionRule::SimpleMark,
                )
            })
            .collect::<Vec<_>>();
        trace!(function = function_name, cases = cases.len(), "expanded marks");
        return Ok(cases);
    }

    let explicit = declarations.iter().filter(|d| d.is_explicit()).count();
    if explicit != 0 && explicit != declarations.len() {
        return Err(CaseError::AmbiguousDeclaration {
            function: function_name.to_string(),
        });
    }

    let cases = if explicit != 0 {
        expand_explicit(function_name, declarations)?
    } else {
        expand_repeated(function_name, marks, declarations)
    };
    trace!(function = function_name, cases = cases.len(), "expanded declarations");
    Ok(cases)
}

fn expand_explicit(
    function_name: &str,
    declarations: &[MultiplicityDeclaration],
) -> Result<Vec<Case>, CaseError> {
    let mut cases = Vec::with_capacity(declarations.len());
    for declaration in declarations {
        let Some(spec) = &declaration.spec else {
            continue;
        };
        if spec.len() != declaration.count.get() {
            return Err(CaseError::DeclarationLengthMismatch {
                function: function_name.to_string(),
                count: declaration.count.get(),
                spec: spec.join(SPEC_DELIMITER),
                actual: spec.len(),
            });
        }
        cases.push(Case::new(
            function_name,
            spec.clone(),
            ExpansionRule::ExplicitMultiplicity,
        ));
    }
    Ok(cases)
}

fn expand_repeated(
    function_name: &str,
    marks: &[Mark],
    declarations: &[MultiplicityDeclaration],
) -> Vec<Case> {
    marks
        .iter()
        .flat_map(|mark| {
            declarations.iter().map(move |declaration| {
                Case::new(
                    function_name,
                    TargetSequence::repeated(mark, declaration.count.get()),
                    ExpansionRule::MarkRepeated,
                )
            })
        })
        .collect()
}
