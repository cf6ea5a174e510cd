//! seed-runner: populate, inspect or clear the six demo bank stores.
//!
//! Usage:
//!   seed-runner all --scale 0.5 --seed 12345 --data-dir ./data
//!   seed-runner all --customers 5000 --employees 300 --json
//!   seed-runner all --config overrides.json
//!   seed-runner status --data-dir ./data
//!   seed-runner clear --confirm --data-dir ./data

use anyhow::{anyhow, bail, Context, Result};
use demobank_core::{
    config::entity,
    store::{RecordSink, StoreName, TableCount},
    GenConfig, Orchestrator, PhaseState, RunReport, StorePaths, StoreSet,
};
use std::collections::BTreeMap;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("all");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");
    let json = has_flag(&args, "--json");

    std::fs::create_dir_all(data_dir).with_context(|| format!("Cannot create {data_dir}"))?;
    let paths = StorePaths::in_dir(data_dir);

    match command {
        "all" => {
            let config = build_config(&args)?;
            let stores = StoreSet::open(&paths)?;
            // The registry is not persisted, so a run must start from empty stores.
            if stores.table_counts()?.iter().any(|t| t.rows > 0) {
                bail!("stores in {data_dir} already hold data; run `seed-runner clear --confirm` first");
            }
            let mut orchestrator = Orchestrator::new(config, stores)?;
            log::info!("seeding {data_dir} (run {})", orchestrator.run_id());
            let report = orchestrator.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, data_dir);
            }
            if !report.is_completed() {
                log::warn!("run {} aborted", report.run_id);
                std::process::exit(1);
            }
        }
        "clear" => {
            if !has_flag(&args, "--confirm") {
                bail!("clear deletes every row in {data_dir}; pass --confirm to proceed");
            }
            let mut stores = StoreSet::open(&paths)?;
            stores.clear()?;
            println!("Cleared all six stores in {data_dir}");
        }
        "status" => {
            let stores = StoreSet::open(&paths)?;
            let counts = stores.table_counts()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                print_counts(&counts);
            }
        }
        other => bail!("unknown command '{other}' (expected all, clear or status)"),
    }

    Ok(())
}

/// Base config, optionally overlaid by `--config`, then by flags.
fn build_config(args: &[String]) -> Result<GenConfig> {
    let mut config = match args.windows(2).find(|w| w[0] == "--config") {
        Some(w) => GenConfig::load(&w[1])?,
        None => GenConfig::base(),
    };
    config.seed = parse_arg(args, "--seed", config.seed)?;
    config.scale.factor = parse_arg(args, "--scale", config.scale.factor)?;
    config.batch_size = parse_arg(args, "--batch-size", config.batch_size)?;
    if let Some(n) = parse_opt::<i64>(args, "--customers")? {
        config = config.with_override(entity::CUSTOMERS, n);
    }
    if let Some(n) = parse_opt::<i64>(args, "--employees")? {
        config = config.with_override(entity::EMPLOYEES, n);
    }
    Ok(config)
}

fn print_report(report: &RunReport, data_dir: &str) {
    println!("Demo bank seed-runner");
    println!("  run:       {}", report.run_id);
    println!("  seed:      {}", report.seed);
    println!("  scale:     {}", report.scale);
    println!("  data_dir:  {data_dir}");
    println!();

    for phase in &report.phases {
        let state = match phase.state {
            PhaseState::Succeeded => "ok",
            PhaseState::FailedFatal => "FAILED",
            PhaseState::Pending => "skipped",
            PhaseState::Running | PhaseState::FailedRetryable => "incomplete",
        };
        println!(
            "  {:<16} {:<10} attempts {}  rows {}",
            phase.phase,
            state,
            phase.attempts,
            phase.rows()
        );
        for failure in &phase.failures {
            println!(
                "      attempt {}: {} ({})",
                failure.attempt,
                failure.message,
                failure.subject.as_deref().unwrap_or("-")
            );
        }
    }
    println!();
    print_counts(&report.table_counts);

    let s = &report.stats;
    println!();
    println!("  employees:           {}", s.employees);
    println!("  loan officers:       {}", s.loan_officers);
    println!("  insurance agents:    {}", s.insurance_agents);
    println!("  compliance officers: {}", s.compliance_officers);
    println!("  customers:           {}", s.customers);
    println!("  accounts:            {}", s.accounts);
    println!("  loans:               {}", s.loans);
    println!("  policies:            {}", s.policies);

    match report.failed_phase() {
        Some(phase) => println!("\nRun ABORTED in phase {}", phase.phase),
        None => println!("\nRun completed"),
    }
}

fn print_counts(counts: &[TableCount]) {
    let mut by_store: BTreeMap<StoreName, Vec<&TableCount>> = BTreeMap::new();
    for count in counts {
        by_store.entry(count.store).or_default().push(count);
    }
    for (store, tables) in by_store {
        println!("  [{store}]");
        for t in tables {
            println!("    {:<24} {:>8}", t.table, t.rows);
        }
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> Result<T> {
    Ok(parse_opt(args, flag)?.unwrap_or(default))
}

/// The value after `flag`, if the flag is present. A value that does not
/// parse is an error naming the flag.
fn parse_opt<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    match args.windows(2).find(|w| w[0] == flag) {
        Some(w) => w[1]
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("invalid value '{}' for {flag}", w[1])),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn flags_parse_or_fall_back_to_defaults() {
        let a = args("seed-runner all --scale 0.5 --customers 300");
        assert_eq!(parse_arg(&a, "--scale", 1.0).unwrap(), 0.5);
        assert_eq!(parse_arg(&a, "--seed", 42u64).unwrap(), 42);
        assert_eq!(parse_opt::<i64>(&a, "--customers").unwrap(), Some(300));
        assert_eq!(parse_opt::<i64>(&a, "--employees").unwrap(), None);
    }

    #[test]
    fn unparseable_value_names_its_flag() {
        let a = args("seed-runner all --scale abc");
        let err = parse_arg(&a, "--scale", 1.0).unwrap_err().to_string();
        assert!(err.contains("--scale") && err.contains("abc"), "{err}");
        assert!(build_config(&a).is_err());
    }
}
