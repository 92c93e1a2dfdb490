//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::{fs, num::NonZeroUsize, path::Path};

use dut_cases::{target::parse_spec, MultiplicityDeclaration, TargetId};

/// The three-function module used by the end-to-end scenarios.
pub const TEMPLATE_SCRIPT: &str = r#"
import pytest

@pytest.mark.esp32
@pytest.mark.esp32s2
def test_foo_single(dut):
    pass

@pytest.mark.parametrize(
    'count, target', [
        (2, 'esp32|esp32s2'),
        (3, 'esp32s2|esp32s2|esp32s3'),
    ], indirect=True
)
def test_foo_multi(dut):
    pass

@pytest.mark.esp32
@pytest.mark.esp32s2
@pytest.mark.parametrize(
    'count', [2], indirect=True
)
def test_foo_multi_with_marker(dut):
    pass
"#;

pub fn write_script(dir: &Path, file_name: &str, text: &str) {
    fs::write(dir.join(file_name), text).unwrap();
}

pub fn marks(names: &[&str]) -> Vec<TargetId> {
    names.iter().map(|n| TargetId::new(n).unwrap()).collect()
}

pub fn count_only(count: usize) -> MultiplicityDeclaration {
    MultiplicityDeclaration::count_only(NonZeroUsize::new(count).unwrap())
}

pub fn explicit(count: usize, spec: &str) -> MultiplicityDeclaration {
    MultiplicityDeclaration::explicit(NonZeroUsize::new(count).unwrap(), parse_spec(spec).unwrap())
}
