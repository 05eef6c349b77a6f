//! Report rendering for scripted runs.
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use crate::scenarios::ScenarioResult;

pub fn write_console(
    writer: &mut dyn Write,
    results: &[ScenarioResult],
    elapsed: Duration,
) -> Result<()> {
    writeln!(writer)?;
    for result in results {
        let status = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        writeln!(
            writer,
            "{status} {:25} {:>6} ms",
            result.scenario_name, result.duration_ms
        )?;
        for failure in &result.failures {
            writeln!(writer, "       {} {failure}", "-".red())?;
        }
    }
    let failed = results.iter().filter(|r| !r.passed).count();
    let summary = format!(
        "{} scenarios, {} failed, {:.2}s total",
        results.len(),
        failed,
        elapsed.as_secs_f64()
    );
    writeln!(
        writer,
        "\n{}",
        if failed == 0 {
            summary.green()
        } else {
            summary.red()
        }
    )?;
    Ok(())
}

pub fn write_json(writer: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, results).context("serializing report")?;
    writeln!(writer)?;
    Ok(())
}
