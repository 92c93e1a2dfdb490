//! Error handling for target parsing, case expansion and test discovery.
//!
//! Every failure surfaces as a single [`CaseError`]. Errors raised while
//! looking at a particular test function are wrapped in
//! [`CaseError::Located`] when the collaborator knows where that function
//! lives, so the CLI can render a `miette` report pointing at the decorator.

use std::{fmt, sync::Arc};

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use thiserror::Error;

pub type SourceArc = Arc<NamedSource<String>>;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type-safe error classification. Callers and tests match on this rather
/// than on rendered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty or malformed target identifier in a delimited target string.
    InvalidTargetSpec,
    /// An explicit target list whose length differs from the declared count.
    DeclarationLengthMismatch,
    /// Explicit-target and count-only declarations on the same function.
    AmbiguousDeclaration,
    /// Anything the static collector could not read, walk or understand.
    Discovery,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidTargetSpec => "invalid_target_spec",
            ErrorKind::DeclarationLengthMismatch => "declaration_length_mismatch",
            ErrorKind::AmbiguousDeclaration => "ambiguous_declaration",
            ErrorKind::Discovery => "discovery",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the crate.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("invalid target spec '{raw}': {reason}")]
    InvalidTargetSpec {
        raw: String,
        reason: String,
        delimiter: char,
    },

    #[error(
        "multiplicity declaration ({count}, '{spec}') on '{function}' lists {actual} target(s), expected {count}"
    )]
    DeclarationLengthMismatch {
        function: String,
        count: usize,
        spec: String,
        actual: usize,
    },

    #[error("'{function}' mixes explicit-target and count-only multiplicity declarations")]
    AmbiguousDeclaration { function: String },

    #[error("{message}")]
    Discovery {
        message: String,
        #[source]
        source: Option<BoxedError>,
    },

    /// Another error pinned to a location in a collected source file.
    #[error("{inner}")]
    Located {
        inner: Box<CaseError>,
        src: SourceArc,
        span: SourceSpan,
        label: String,
    },
}

impl CaseError {
    pub fn invalid_target(raw: &str, reason: impl Into<String>, delimiter: char) -> Self {
        CaseError::InvalidTargetSpec {
            raw: raw.to_string(),
            reason: reason.into(),
            delimiter,
        }
    }

    pub fn discovery(message: impl Into<String>) -> Self {
        CaseError::Discovery {
            message: message.into(),
            source: None,
        }
    }

    pub fn discovery_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CaseError::Discovery {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Pins this error to `span` in `src`. Already located errors keep their
    /// original, more precise location.
    pub fn located(self, src: &SourceArc, span: SourceSpan, label: impl Into<String>) -> Self {
        if let CaseError::Located { .. } = self {
            return self;
        }
        CaseError::Located {
            inner: Box::new(self),
            src: Arc::clone(src),
            span,
            label: label.into(),
        }
    }

    /// Returns the classification of this error, looking through locations.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaseError::InvalidTargetSpec { .. } => ErrorKind::InvalidTargetSpec,
            CaseError::DeclarationLengthMismatch { .. } => ErrorKind::DeclarationLengthMismatch,
            CaseError::AmbiguousDeclaration { .. } => ErrorKind::AmbiguousDeclaration,
            CaseError::Discovery { .. } => ErrorKind::Discovery,
            CaseError::Located { inner, .. } => inner.kind(),
        }
    }

    fn help_text(&self) -> Option<String> {
        match self {
            CaseError::InvalidTargetSpec { delimiter, .. } => Some(format!(
                "targets are ASCII alphanumerics, '_', '-' or '.', separated by '{}'",
                delimiter
            )),
            CaseError::DeclarationLengthMismatch { .. } => {
                Some("list exactly one '|'-separated target per device".into())
            }
            CaseError::AmbiguousDeclaration { .. } => Some(
                "give every multiplicity declaration of this function an explicit target, or none of them"
                    .into(),
            ),
            CaseError::Discovery { .. } => None,
            CaseError::Located { inner, .. } => inner.help_text(),
        }
    }
}

impl Diagnostic for CaseError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("dut_cases::{}", self.kind())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help_text()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let CaseError::Located { span, label, .. } = self else {
            return None;
        };
        let labels = vec![LabeledSpan::new_with_span(Some(label.clone()), *span)];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            CaseError::Located { src, .. } => Some(&**src),
            _ => None,
        }
    }
}

/// Prints a CaseError with full miette diagnostics.
pub fn print_error(error: CaseError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sees_through_location() {
        let src = Arc::new(NamedSource::new(
            "pytest_demo.py",
            "@pytest.mark.parametrize('count', [0])\n".to_string(),
        ));
        let err =
            CaseError::discovery("count must be positive").located(&src, (0..39).into(), "here");
        assert_eq!(err.kind(), ErrorKind::Discovery);
        assert_eq!(err.to_string(), "count must be positive");
    }

    #[test]
    fn test_located_keeps_innermost_location() {
        let src = Arc::new(NamedSource::new("a.py", "abcdef".to_string()));
        let err = CaseError::AmbiguousDeclaration {
            function: "test_x".into(),
        }
        .located(&src, (0..1).into(), "first")
        .located(&src, (2..4).into(), "second");
        let CaseError::Located { span, label, .. } = &err else {
            panic!("expected a located error");
        };
        assert_eq!(span.offset(), 0);
        assert_eq!(label, "first");
    }

    #[test]
    fn test_report_renders_code_and_help() {
        let src = Arc::new(NamedSource::new(
            "pytest_demo.py",
            "@pytest.mark.parametrize('count, target', [(2, 'esp32')])\n".to_string(),
        ));
        let err = CaseError::DeclarationLengthMismatch {
            function: "test_demo".into(),
            count: 2,
            spec: "esp32".into(),
            actual: 1,
        }
        .located(&src, (0..57).into(), "declared here");
        let output = format!("{:?}", miette::Report::new(err));
        assert!(output.contains("dut_cases::declaration_length_mismatch"));
        assert!(output.contains("one '|'-separated target per device"));
        assert!(output.contains("declared here"));
    }
}
