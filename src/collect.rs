//! The collection driver.
//!
//! [`CaseCollector::collect`] asks a [`StaticCollector`] for the test
//! functions under each path, orders them by name, expands each into cases
//! and filters the concatenation once with the requested selector.

use std::path::Path;

use miette::SourceSpan;
use tracing::{info, info_span};

use crate::{
    case::{expand, Case, Mark, MultiplicityDeclaration},
    errors::{CaseError, SourceArc},
    select::{filter, CollectMode, CollectionSelector},
};

pub mod pytest;

pub use pytest::PytestCollector;

/// Where a test function was declared, for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub source_file: SourceArc,
    pub span: SourceSpan,
}

/// One discovered test function and its raw target declarations.
#[derive(Debug, Clone)]
pub struct TestFunction {
    pub name: String,
    pub marks: Vec<Mark>,
    pub declarations: Vec<MultiplicityDeclaration>,
    pub location: Option<SourceLocation>,
}

impl TestFunction {
    pub fn new(
        name: impl Into<String>,
        marks: Vec<Mark>,
        declarations: Vec<MultiplicityDeclaration>,
    ) -> Self {
        Self {
            name: name.into(),
            marks,
            declarations,
            location: None,
        }
    }

    /// Expands this function's declarations, pinning errors to its location.
    pub fn expand(&self) -> Result<Vec<Case>, CaseError> {
        expand(&self.name, &self.marks, &self.declarations).map_err(|e| match &self.location {
            Some(location) => e.located(
                &location.source_file,
                location.span,
                format!("in '{}'", self.name),
            ),
            None => e,
        })
    }
}

/// Enumerates test functions and their declarations without running them.
pub trait StaticCollector {
    fn collect_functions(&self, root: &Path) -> Result<Vec<TestFunction>, CaseError>;
}

impl<C: StaticCollector + ?Sized> StaticCollector for &C {
    fn collect_functions(&self, root: &Path) -> Result<Vec<TestFunction>, CaseError> {
        (**self).collect_functions(root)
    }
}

/// The selector as callers hand it over: a mode, or a raw target string
/// still to be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorArg {
    Mode(CollectMode),
    Raw(String),
}

impl SelectorArg {
    pub fn resolve(self) -> Result<CollectionSelector, CaseError> {
        match self {
            SelectorArg::Mode(mode) => Ok(CollectionSelector::Mode(mode)),
            SelectorArg::Raw(raw) => CollectionSelector::targets(&raw),
        }
    }
}

impl From<CollectMode> for SelectorArg {
    fn from(mode: CollectMode) -> Self {
        SelectorArg::Mode(mode)
    }
}

impl From<&str> for SelectorArg {
    fn from(raw: &str) -> Self {
        SelectorArg::Raw(raw.to_string())
    }
}

impl From<String> for SelectorArg {
    fn from(raw: String) -> Self {
        SelectorArg::Raw(raw)
    }
}

/// Drives discovery, expansion and filtering.
#[derive(Debug, Clone, Default)]
pub struct CaseCollector<C = PytestCollector> {
    collector: C,
}

impl<C: StaticCollector> CaseCollector<C> {
    pub fn new(collector: C) -> Self {
        Self { collector }
    }

    /// Collects the cases under `paths` that `selector` accepts.
    ///
    /// Functions are ordered by name (ties keep discovery order); cases of
    /// one function keep expansion order. Any error aborts the whole call.
    pub fn collect<P: AsRef<Path>>(
        &self,
        paths: &[P],
        selector: impl Into<SelectorArg>,
    ) -> Result<Vec<Case>, CaseError> {
        let selector = selector.into().resolve()?;
        let span = info_span!("collect", selector = %selector);
        let _enter = span.enter();

        let mut functions = Vec::new();
        for path in paths {
            functions.extend(self.collector.collect_functions(path.as_ref())?);
        }
        functions.sort_by(|a, b| a.name.cmp(&b.name));

        let mut all_cases = Vec::new();
        for function in &functions {
            all_cases.extend(function.expand()?);
        }

        let selected = filter(&all_cases, &selector);
        info!(
            functions = functions.len(),
            cases = all_cases.len(),
            selected = selected.len(),
            "collected cases"
        );
        Ok(selected)
    }
}

/// Collects with the pytest source collector and default configuration.
pub fn collect_cases<P: AsRef<Path>>(
    paths: &[P],
    selector: impl Into<SelectorArg>,
) -> Result<Vec<Case>, CaseError> {
    CaseCollector::new(PytestCollector::default()).collect(paths, selector)
}
