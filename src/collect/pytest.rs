//! Static collector for pytest modules.
//!
//! Reads `pytest_*.py` files without importing them and reports each
//! `test*` function with the target marks and `count`/`target`
//! parametrizations declared on it:
//!
//! ```python
//! @pytest.mark.esp32
//! @pytest.mark.parametrize('count, target', [(2, 'esp32|esp32s2')], indirect=True)
//! def test_uart(dut):
//!     ...
//! ```
//!
//! Arguments must be Python literals. Anything the collector cannot
//! evaluate is an error when it feeds a `count` or `target`, and ignored
//! otherwise.

use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

use miette::{NamedSource, SourceSpan};
use pest::{error::InputLocation, iterators::Pair, Parser};
use pest_derive::Parser;
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    case::{Mark, MultiplicityDeclaration},
    collect::{SourceLocation, StaticCollector, TestFunction},
    config::Config,
    errors::{CaseError, SourceArc},
    target::{parse_spec, TargetId, TargetSequence},
};

#[derive(Parser)]
#[grammar = "collect/pytest.pest"]
struct PytestParser;

const COUNT_ARG: &str = "count";
const TARGET_ARG: &str = "target";

// ============================================================================
// COLLECTOR
// ============================================================================

/// Scans pytest source files for target declarations.
#[derive(Debug, Clone, Default)]
pub struct PytestCollector {
    config: Config,
}

impl PytestCollector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Recursively finds test modules under `root`, sorted for a
    /// deterministic scan order. A `.py` file passed as the root itself is
    /// always scanned, whatever its name.
    pub fn discover_test_files(&self, root: &Path) -> Result<Vec<PathBuf>, CaseError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| {
                CaseError::discovery_with(format!("Failed to walk '{}'", root.display()), e)
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy();
            let explicit = entry.depth() == 0 && file_name.ends_with(".py");
            if !explicit && !self.config.is_test_file(&file_name) {
                continue;
            }

            files.push(path.to_path_buf());
        }
        files.sort();
        Ok(files)
    }

    /// Reads and scans a single module.
    pub fn collect_file(&self, path: &Path) -> Result<Vec<TestFunction>, CaseError> {
        let source = fs::read_to_string(path).map_err(|e| {
            CaseError::discovery_with(format!("Failed to read '{}'", path.display()), e)
        })?;
        let functions = self.collect_source(&path.display().to_string(), source)?;
        debug!(
            path = %path.display(),
            functions = functions.len(),
            "scanned test module"
        );
        Ok(functions)
    }

    /// Scans module text. `name` labels diagnostics.
    pub fn collect_source(
        &self,
        name: &str,
        source: String,
    ) -> Result<Vec<TestFunction>, CaseError> {
        let source_file: SourceArc = Arc::new(NamedSource::new(name, source.clone()));

        let mut pairs = PytestParser::parse(Rule::module, &source)
            .map_err(|e| convert_parse_error(e, &source_file))?;
        let Some(module) = pairs.next() else {
            return Ok(Vec::new());
        };

        let mut functions = Vec::new();
        for pair in module.into_inner() {
            if pair.as_rule() != Rule::function {
                continue;
            }
            if let Some(function) = self.build_function(pair, &source_file)? {
                functions.push(function);
            }
        }
        Ok(functions)
    }

    fn build_function(
        &self,
        pair: Pair<'_, Rule>,
        source_file: &SourceArc,
    ) -> Result<Option<TestFunction>, CaseError> {
        let span = to_source_span(&pair);
        let mut decorators = Vec::new();
        let mut name = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::decorator => decorators.push(build_decorator(inner)),
                Rule::identifier => name = Some(inner.as_str().to_string()),
                _ => {}
            }
        }

        let Some(name) = name.filter(|n| n.starts_with("test")) else {
            return Ok(None);
        };

        let mut marks = Vec::new();
        let mut declarations = Vec::new();
        for decorator in &decorators {
            self.apply_decorator(decorator, source_file, &mut marks, &mut declarations)
                .map_err(|e| e.located(source_file, decorator.span, "in this decorator"))?;
        }

        Ok(Some(TestFunction {
            name,
            marks,
            declarations,
            location: Some(SourceLocation {
                source_file: Arc::clone(source_file),
                span,
            }),
        }))
    }

    fn apply_decorator(
        &self,
        decorator: &Decorator,
        source_file: &SourceArc,
        marks: &mut Vec<Mark>,
        declarations: &mut Vec<MultiplicityDeclaration>,
    ) -> Result<(), CaseError> {
        let Some(mark_name) = decorator.mark_name() else {
            return Ok(());
        };

        if mark_name == "parametrize" {
            let args = match &decorator.args {
                DecoratorArgs::Literal(args) => args,
                DecoratorArgs::Raw => {
                    return Err(CaseError::discovery(
                        "parametrize arguments could not be read statically",
                    ))
                }
                DecoratorArgs::None => return Ok(()),
            };
            declarations.extend(parse_parametrize(args, source_file)?);
            return Ok(());
        }

        if self.config.is_target(mark_name) {
            marks.push(TargetId::new(mark_name)?);
        }
        Ok(())
    }
}

impl StaticCollector for PytestCollector {
    fn collect_functions(&self, root: &Path) -> Result<Vec<TestFunction>, CaseError> {
        let mut functions = Vec::new();
        for file in self.discover_test_files(root)? {
            functions.extend(self.collect_file(&file)?);
        }
        Ok(functions)
    }
}

// ============================================================================
// DECORATOR MODEL
// ============================================================================

#[derive(Debug)]
struct Decorator {
    path: String,
    args: DecoratorArgs,
    span: SourceSpan,
}

#[derive(Debug)]
enum DecoratorArgs {
    None,
    Literal(Vec<Argument>),
    Raw,
}

impl Decorator {
    /// `esp32` for `@pytest.mark.esp32` or `@mark.esp32`.
    fn mark_name(&self) -> Option<&str> {
        let (head, name) = self.path.rsplit_once('.')?;
        if head == "mark" || head.ends_with(".mark") {
            Some(name)
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct Argument {
    keyword: Option<String>,
    node: Node,
}

#[derive(Debug)]
struct Node {
    literal: Literal,
    span: SourceSpan,
}

#[derive(Debug)]
enum Literal {
    Str(String),
    Int(u64),
    Seq(Vec<Node>),
    Call { callee: String, args: Vec<Argument> },
    Name,
    Opaque,
}

impl Node {
    fn describe(&self) -> &'static str {
        match self.literal {
            Literal::Str(_) => "a string",
            Literal::Int(_) => "an integer",
            Literal::Seq(_) => "a sequence",
            Literal::Call { .. } => "a call",
            Literal::Name => "a name",
            Literal::Opaque => "an expression",
        }
    }

    fn invalid(&self, expected: &str, source_file: &SourceArc) -> CaseError {
        CaseError::discovery(format!("expected {}, found {}", expected, self.describe()))
            .located(source_file, self.span, "here")
    }
}

// ============================================================================
// AST BUILDERS
// ============================================================================

fn build_decorator(pair: Pair<'_, Rule>) -> Decorator {
    let span = to_source_span(&pair);
    let mut path = String::new();
    let mut args = DecoratorArgs::None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::dotted_name => path = inner.as_str().to_string(),
            Rule::call => args = DecoratorArgs::Literal(build_arguments(inner)),
            Rule::raw_call => args = DecoratorArgs::Raw,
            _ => {}
        }
    }
    Decorator { path, args, span }
}

fn build_arguments(pair: Pair<'_, Rule>) -> Vec<Argument> {
    pair.into_inner()
        .map(|inner| {
            if inner.as_rule() != Rule::keyword {
                return Argument {
                    keyword: None,
                    node: build_node(inner),
                };
            }
            let mut parts = inner.into_inner();
            let keyword = parts.next().map(|p| p.as_str().to_string());
            let node = match parts.next() {
                Some(value) => build_node(value),
                None => Node {
                    literal: Literal::Opaque,
                    span: SourceSpan::from(0..0),
                },
            };
            Argument { keyword, node }
        })
        .collect()
}

fn build_node(pair: Pair<'_, Rule>) -> Node {
    let span = to_source_span(&pair);
    let literal = match pair.as_rule() {
        Rule::string => {
            let mut raw = false;
            let mut body = "";
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::raw_prefix => raw = true,
                    _ => body = part.as_str(),
                }
            }
            Literal::Str(if raw { body.to_string() } else { unescape(body) })
        }
        Rule::integer => pair
            .as_str()
            .parse::<u64>()
            .map_or(Literal::Opaque, Literal::Int),
        Rule::paren => match pair.into_inner().next() {
            Some(inner) => return build_node(inner),
            None => Literal::Opaque,
        },
        Rule::tuple | Rule::list => Literal::Seq(pair.into_inner().map(build_node).collect()),
        Rule::call_value => {
            let mut parts = pair.into_inner();
            let callee = parts
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            let args = parts.next().map(build_arguments).unwrap_or_default();
            Literal::Call { callee, args }
        }
        Rule::name => Literal::Name,
        _ => Literal::Opaque,
    };
    Node { literal, span }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other @ ('\\' | '\'' | '"')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// PARAMETRIZE
// ============================================================================

/// Reads `count`/`target` declarations out of a parametrize call. Returns
/// nothing when the parametrization has no `count` argument.
fn parse_parametrize(
    args: &[Argument],
    src: &SourceArc,
) -> Result<Vec<MultiplicityDeclaration>, CaseError> {
    let argnames = find_argument(args, 0, "argnames")
        .ok_or_else(|| CaseError::discovery("parametrize without argnames"))?;
    let names = parse_argnames(argnames, src)?;

    let Some(count_index) = names.iter().position(|n| n == COUNT_ARG) else {
        return Ok(Vec::new());
    };
    let target_index = names.iter().position(|n| n == TARGET_ARG);

    let argvalues = find_argument(args, 1, "argvalues")
        .ok_or_else(|| CaseError::discovery("parametrize without argvalues"))?;
    let Literal::Seq(entries) = &argvalues.literal else {
        return Err(argvalues.invalid("a list of argument values", src));
    };

    let mut declarations = Vec::with_capacity(entries.len());
    for entry in entries {
        let values = entry_values(entry, names.len(), src)?;
        let count = parse_count(values[count_index], src)?;
        let declaration = match target_index {
            Some(index) => {
                MultiplicityDeclaration::explicit(count, parse_target(values[index], src)?)
            }
            None => MultiplicityDeclaration::count_only(count),
        };
        declarations.push(declaration);
    }
    Ok(declarations)
}

fn find_argument<'a>(args: &'a [Argument], position: usize, keyword: &str) -> Option<&'a Node> {
    args.iter()
        .find(|a| a.keyword.as_deref() == Some(keyword))
        .or_else(|| args.iter().filter(|a| a.keyword.is_none()).nth(position))
        .map(|a| &a.node)
}

fn parse_argnames(node: &Node, src: &SourceArc) -> Result<Vec<String>, CaseError> {
    match &node.literal {
        Literal::Str(s) => Ok(s
            .split(',')
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()),
        Literal::Seq(items) => items
            .iter()
            .map(|item| match &item.literal {
                Literal::Str(s) => Ok(s.trim().to_string()),
                _ => Err(item.invalid("an argument name string", src)),
            })
            .collect(),
        _ => Err(node.invalid("argument names as a string", src)),
    }
}

/// The values of one parametrize entry, one per argument name.
fn entry_values<'a>(
    entry: &'a Node,
    arity: usize,
    src: &SourceArc,
) -> Result<Vec<&'a Node>, CaseError> {
    let values: Vec<&'a Node> = match &entry.literal {
        Literal::Call { callee, args } if callee.ends_with("param") => args
            .iter()
            .filter(|a| a.keyword.is_none())
            .map(|a| &a.node)
            .collect(),
        _ if arity == 1 => vec![entry],
        Literal::Seq(items) => items.iter().collect(),
        _ => return Err(entry.invalid(&format!("a tuple of {} values", arity), src)),
    };
    if values.len() != arity {
        return Err(CaseError::discovery(format!(
            "parametrize entry has {} value(s), expected {}",
            values.len(),
            arity
        ))
        .located(src, entry.span, "this entry"));
    }
    Ok(values)
}

fn parse_count(node: &Node, src: &SourceArc) -> Result<NonZeroUsize, CaseError> {
    match node.literal {
        Literal::Int(n) => usize::try_from(n)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| node.invalid("a positive device count", src)),
        _ => Err(node.invalid("a positive device count", src)),
    }
}

fn parse_target(node: &Node, src: &SourceArc) -> Result<TargetSequence, CaseError> {
    match &node.literal {
        Literal::Str(s) => {
            parse_spec(s).map_err(|e| e.located(src, node.span, "in this target list"))
        }
        _ => Err(node.invalid("a target string such as 'esp32|esp32s2'", src)),
    }
}

// ============================================================================
// SPANS AND PARSE ERRORS
// ============================================================================

fn to_source_span(pair: &Pair<'_, Rule>) -> SourceSpan {
    let span = pair.as_span();
    SourceSpan::from(span.start()..span.end())
}

fn convert_parse_error(error: pest::error::Error<Rule>, source_file: &SourceArc) -> CaseError {
    let span = match error.location {
        InputLocation::Pos(pos) => SourceSpan::from(pos..pos),
        InputLocation::Span((start, end)) => SourceSpan::from(start..end),
    };
    CaseError::discovery(format!("Failed to scan test module: {}", error.variant.message()))
        .located(source_file, span, "scan stopped here")
}
