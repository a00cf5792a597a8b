//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use thiserror::Error;

use gosoak::core::config::Config;
use gosoak::core::errors::SoakError;
use gosoak::discovery::oracle::{GoListOracle, TargetOracle};
use gosoak::discovery::target::TestTarget;
use gosoak::exec::engine::{ExecutionEngine, ProcessEngine};
use gosoak::harness::RunOptions;
use gosoak::harness::driver::run_from_config;
use gosoak::sampler::knobs::ModifierFeatures;
use gosoak::sampler::service::SamplerService;

/// gosoak — randomized soak-test harness for Go test suites.
#[derive(Debug, Parser)]
#[command(
    name = "gosoak",
    author,
    version,
    about = "Soak Go test suites under randomized runtime tuning",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the soak harness over discovered targets.
    Run(RunArgs),
    /// List the targets a selector discovers.
    Targets(TargetsArgs),
    /// Preview sampled execution configurations for one target.
    Sample(SampleArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Sampler seed; defaults to the current time in nanoseconds.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Package selector handed to discovery.
    #[arg(long, default_value = "std", value_name = "SELECTOR")]
    list: String,
    /// Number of concurrent workers.
    #[arg(long, default_value_t = 1, value_name = "N")]
    workers: usize,
    /// Build and run with the race detector.
    #[arg(long)]
    race: bool,
    /// Force a rebuild of every test binary.
    #[arg(long)]
    rebuild: bool,
    /// Repetition budget per target.
    #[arg(long, default_value_t = 1, value_name = "N")]
    reps: u32,
    /// Wall-clock budget per target (e.g. `30s`, `5m`, `2h`).
    #[arg(long, default_value = "1m", value_name = "DURATION")]
    duration: String,
    /// Randomly prefix some executions with `sudo -E`.
    #[arg(long)]
    sudo: bool,
    /// Randomly prefix some executions with `strace`.
    #[arg(long)]
    strace: bool,
    /// Keep the discovered target order instead of shuffling.
    #[arg(long)]
    no_shuffle: bool,
}

#[derive(Debug, Clone, Args)]
struct TargetsArgs {
    /// Package selector handed to discovery.
    #[arg(long, default_value = "std", value_name = "SELECTOR")]
    list: String,
}

#[derive(Debug, Clone, Args)]
struct SampleArgs {
    /// Import path of the target to sample for.
    #[arg(value_name = "IMPORT_PATH")]
    import_path: String,
    /// Sampler seed.
    #[arg(long, default_value_t = 0, value_name = "SEED")]
    seed: u64,
    /// Number of configurations to draw.
    #[arg(long, short = 'n', default_value_t = 10, value_name = "N")]
    count: usize,
    /// Sample under race-detector constraints.
    #[arg(long)]
    race: bool,
    /// Preview with the sudo prefix feature enabled.
    #[arg(long)]
    sudo: bool,
    /// Preview with the strace prefix feature enabled.
    #[arg(long)]
    strace: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

/// CLI-layer error with operator-facing messages.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Harness failure.
    #[error("{0}")]
    Soak(#[from] SoakError),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Dispatch the parsed command line.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_soak(cli, args),
        Command::Targets(args) => run_targets(cli, args),
        Command::Sample(args) => run_sample(cli, args),
        Command::Completions(args) => {
            generate(
                args.shell,
                &mut Cli::command(),
                "gosoak",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

fn run_soak(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let duration = parse_duration(&args.duration)?;
    let seed = args.seed.unwrap_or_else(entropy_seed);

    let options = RunOptions {
        seed,
        selector: args.list.clone(),
        workers: args.workers.max(1),
        race: args.race,
        rebuild: args.rebuild,
        reps: args.reps,
        duration,
        sudo: args.sudo,
        strace: args.strace,
        shuffle: !args.no_shuffle,
    };

    let summary = run_from_config(&config, options)?;

    let status = if summary.cancelled {
        "cancelled".yellow().bold()
    } else {
        "completed".green().bold()
    };
    println!(
        "{status}: {} executions across {} targets in {}s (seed {seed})",
        summary.executions,
        summary.targets,
        summary.uptime.as_secs(),
    );
    Ok(())
}

fn run_targets(cli: &Cli, args: &TargetsArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let engine: Arc<dyn ExecutionEngine> = Arc::new(ProcessEngine::new(config.env.base_env()));
    let oracle = GoListOracle::new(engine);
    let targets = oracle.list_targets(&args.list)?;

    if cli.json {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for target in &targets {
            serde_json::to_writer(&mut out, target)?;
            writeln!(out)?;
        }
        return Ok(());
    }

    if targets.is_empty() {
        println!("no targets with tests matched {}", args.list);
        return Ok(());
    }
    let slow: std::collections::HashSet<&str> =
        config.targets.slow.iter().map(String::as_str).collect();
    for target in &targets {
        let marker = if slow.contains(target.import_path.as_str()) {
            " (slow, never sharded)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{}{marker}  {}",
            target.import_path.bold(),
            target.dir.display(),
        );
    }
    println!("{} targets", targets.len());
    Ok(())
}

fn run_sample(cli: &Cli, args: &SampleArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let sampler = SamplerService::new(args.seed, config.targets.slow.iter().cloned());
    let target = TestTarget::new(".", args.import_path.clone());
    let features = ModifierFeatures {
        sudo: args.sudo,
        strace: args.strace,
    };

    for _ in 0..args.count {
        let drawn = sampler.sample(&target, args.race);
        if cli.json {
            println!("{}", serde_json::to_string(&drawn)?);
        } else {
            println!("{}", drawn.summary(&target, features));
        }
    }
    Ok(())
}

fn entropy_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    #[allow(clippy::cast_possible_truncation)]
    let seed = nanos as u64;
    seed
}

fn parse_duration(s: &str) -> Result<Duration, CliError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CliError::User("empty duration string".to_string()));
    }
    let (digits, suffix) = s.split_at(s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len()));
    let n: u64 = digits
        .parse()
        .map_err(|_| CliError::User(format!("invalid duration value: {s}")))?;
    let multiplier = match suffix {
        "" | "s" | "sec" => 1,
        "m" | "min" => 60,
        "h" | "hr" => 3600,
        "d" | "day" => 86400,
        _ => return Err(CliError::User(format!("unknown duration suffix: {suffix}"))),
    };
    Ok(Duration::from_secs(n * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_valid_inputs() {
        let cases = [
            ("30", 30),
            ("45s", 45),
            ("1m", 60),
            ("15min", 900),
            ("2h", 7200),
            ("1d", 86400),
        ];
        for (input, secs) in cases {
            let d = parse_duration(input)
                .unwrap_or_else(|e| panic!("{input} should parse: {e}"));
            assert_eq!(d, Duration::from_secs(secs), "input {input}");
        }
    }

    #[test]
    fn parse_duration_rejects_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn cli_parses_run_defaults() {
        let cli = Cli::try_parse_from(["gosoak", "run"]).expect("parse");
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.list, "std");
        assert_eq!(args.workers, 1);
        assert_eq!(args.reps, 1);
        assert_eq!(args.duration, "1m");
        assert!(!args.race);
        assert!(args.seed.is_none());
    }

    #[test]
    fn cli_parses_full_run_flags() {
        let cli = Cli::try_parse_from([
            "gosoak", "run", "--seed", "7", "--list", "./...", "--workers", "8", "--race",
            "--rebuild", "--reps", "3", "--duration", "5m", "--sudo", "--strace", "--no-shuffle",
        ])
        .expect("parse");
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.workers, 8);
        assert!(args.race && args.rebuild && args.sudo && args.strace && args.no_shuffle);
    }

    #[test]
    fn cli_parses_sample_subcommand() {
        let cli = Cli::try_parse_from(["gosoak", "sample", "net/http", "--seed", "9", "-n", "3"])
            .expect("parse");
        let Command::Sample(args) = cli.command else {
            panic!("expected sample subcommand");
        };
        assert_eq!(args.import_path, "net/http");
        assert_eq!(args.seed, 9);
        assert_eq!(args.count, 3);
    }

    #[test]
    fn entropy_seed_is_nonzero() {
        assert_ne!(entropy_seed(), 0);
    }
}
