mod harness;
mod reports;
mod scenarios;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use scenarios::{SCENARIO_KEYS, ScenarioResult, list_scenarios, run_scenario};

#[derive(Debug, Parser)]
#[command(name = "rangelab-tester", version)]
#[command(about = "Scripted QA runs for the Rangelab aggregation core against mock collaborators")]
struct Args {
    /// Scenarios to run (comma-separated; "all" expands to every scenario)
    #[arg(long, default_value = "all")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json"])]
    report: String,

    /// Optional path to write the report instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_scenarios {
        println!("Available scenarios:");
        for (key, description) in list_scenarios() {
            println!("  {key:20} - {description}");
        }
        return Ok(());
    }

    println!("{}", "Rangelab Aggregation Tester".bright_cyan().bold());
    println!("{}", "===========================".cyan());

    let start = Instant::now();
    let mut results = Vec::new();
    for key in expand_scenarios(&args.scenarios) {
        if args.verbose {
            println!("running {}", key.bright_white());
        }
        let result = run_scenario(&key, args.verbose).await?;
        results.push(result);
    }

    write_report(&args, &results, start)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

fn expand_scenarios(arg: &str) -> Vec<String> {
    let mut keys: Vec<String> = arg
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if keys.iter().any(|k| k == "all") {
        keys = SCENARIO_KEYS.iter().map(|k| (*k).to_string()).collect();
    }
    keys
}

fn write_report(args: &Args, results: &[ScenarioResult], start: Instant) -> Result<()> {
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(stdout()),
    };
    match args.report.as_str() {
        "json" => reports::write_json(writer.as_mut(), results),
        _ => reports::write_console(writer.as_mut(), results, start.elapsed()),
    }
}
