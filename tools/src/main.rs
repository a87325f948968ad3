//! elliptic-runner: balanced-subset extraction and MLP evaluation.
//!
//! Usage:
//!   elliptic-runner balance [--config cfg.json] [--seed 42] [--data-dir ./data]
//!   elliptic-runner train   [--config cfg.json] [--seed 42] [--data-dir ./data]
//!   elliptic-runner run     (balance, then train)

use anyhow::{bail, Result};
use elliptic_core::{balancer, trainer, PipelineConfig};
use std::env;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let command = args
        .get(1)
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .unwrap_or("run");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    if let Some(dir) = flag_value(&args, "--data-dir") {
        config = config.with_data_dir(dir);
    }
    config.validate()?;

    let started = chrono::Utc::now();
    println!("Elliptic balanced-subset pipeline");
    println!("  command:    {command}");
    println!("  seed:       {}", config.seed);
    println!("  started_at: {}", started.to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
    println!();

    match command {
        "balance" => run_balance(&config)?,
        "train" => run_train(&config)?,
        "run" => {
            run_balance(&config)?;
            println!();
            run_train(&config)?;
        }
        other => bail!("unknown command '{other}' (expected balance, train or run)"),
    }

    let elapsed = chrono::Utc::now() - started;
    log::info!("finished in {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    Ok(())
}

fn run_balance(config: &PipelineConfig) -> Result<()> {
    let summary = balancer::run(config)?;
    println!("{summary}");
    Ok(())
}

fn run_train(config: &PipelineConfig) -> Result<()> {
    let outcome = trainer::run(config)?;
    if !outcome.fit.converged {
        eprintln!(
            "Warning: optimizer did not converge within {} iterations; metrics below are from the last iterate.",
            config.mlp.max_iterations
        );
    }
    println!("{}\n", outcome.accuracy_line());
    println!("Classification Report:");
    println!("{}", outcome.report);
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
