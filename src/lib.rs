//! Resolves statically declared pytest target metadata into the cases a CI
//! runner executes per embedded target.
//!
//! Marks (`@pytest.mark.esp32`) and `count`/`target` parametrizations are
//! expanded by [`case::expand`], filtered by [`select::filter`], and driven
//! over files on disk by [`collect::CaseCollector`].

pub use crate::errors::{CaseError, ErrorKind};

pub mod case;
pub mod cli;
pub mod collect;
pub mod config;
pub mod errors;
pub mod select;
pub mod target;

pub use crate::case::{expand, Case, ExpansionRule, Mark, MultiplicityDeclaration};
pub use crate::collect::{collect_cases, CaseCollector, SelectorArg, StaticCollector, TestFunction};
pub use crate::select::{filter, CollectMode, CollectionSelector};
pub use crate::target::{TargetId, TargetSequence};
