//! Handles all user-facing output for the CLI.
//!
//! Text output is colorized with `termcolor` when stdout is a terminal;
//! JSON output is meant for CI scripts.

use std::io::{self, IsTerminal};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::case::Case;

/// One line per case (`name  [targets]`), then a summary.
pub fn print_cases(cases: &[Case]) -> io::Result<()> {
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_cases(&mut stdout, cases)
}

/// Writes the text listing to any color-capable sink.
pub fn write_cases<W: WriteColor>(out: &mut W, cases: &[Case]) -> io::Result<()> {
    let width = cases.iter().map(|c| c.name().len()).max().unwrap_or(0);

    for case in cases {
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{:<width$}", case.name(), width = width)?;
        out.reset()?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(out, "  {}", case.targets())?;
        out.reset()?;
    }

    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    let multi = cases.iter().filter(|c| !c.is_single_dut()).count();
    writeln!(out, "{} case(s), {} multi-DUT", cases.len(), multi)?;
    out.reset()
}

/// Pretty JSON array of `{name, targets}` objects.
pub fn print_json(cases: &[Case]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(cases)?;
    println!("{}", json);
    Ok(())
}

pub fn print_targets(targets: &[String]) {
    if targets.is_empty() {
        println!("  No targets configured.");
        return;
    }

    for target in targets {
        println!("  {}", target);
    }
}
