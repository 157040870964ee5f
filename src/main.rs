//! SwarmGate - content firewall and agent pool
//!
//! Main entry point for the SwarmGate CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use swarmgate::config::{validate_config_result, SwarmGateConfig};
use swarmgate::firewall::{Direction, Firewall, NO_RULE_MATCHED};
use swarmgate::swarm::parse_agent_result;

/// SwarmGate - screen agent content and schedule agent swarms
#[derive(Parser, Debug)]
#[command(name = "swarmgate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/swarmgate/config.yaml)
    #[arg(short, long, env = "SWARMGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate text from stdin against the firewall
    Check {
        /// Content direction (in, out, any)
        #[arg(short, long, default_value = "out")]
        direction: Direction,

        /// Print the full verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sanitize a JSON agent result from stdin
    ///
    /// An object with an "error" string is treated as a failed result.
    Sanitize {
        /// Content direction (in, out, any)
        #[arg(short, long, default_value = "out")]
        direction: Direction,
    },

    /// List the effective rule table
    Rules,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Exit code for content rejected by the firewall
const EXIT_BLOCKED: i32 = 2;

fn main() {
    if let Err(e) = swarmgate::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();
    let print_metrics = cli.metrics;

    let outcome = run(cli);
    if print_metrics {
        match swarmgate::metrics::encode_metrics() {
            Ok(text) => eprint!("{}", text),
            Err(e) => eprintln!("Failed to encode metrics: {}", e),
        }
    }

    match outcome {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(SwarmGateConfig::default_path);

    if let Commands::Init { force } = cli.command {
        handle_init_command(&config_path, force)?;
        return Ok(0);
    }

    let config = SwarmGateConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    validate_config_result(&config)?;
    let firewall = Firewall::from_config(&config.firewall)?;

    match cli.command {
        Commands::Check { direction, json } => {
            let text = read_stdin()?;
            let verdict = firewall.evaluate(&text, direction);

            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else if verdict.is_blocked() {
                let reason = verdict.reason.as_deref().unwrap_or(NO_RULE_MATCHED);
                println!("blocked: {}", reason);
            } else {
                match &verdict.tag {
                    Some(tag) => println!("pass [{}]", tag),
                    None => println!("pass"),
                }
            }

            Ok(if verdict.is_blocked() { EXIT_BLOCKED } else { 0 })
        }

        Commands::Sanitize { direction } => {
            let input = read_stdin()?;
            let result = parse_agent_result(&input).context("Invalid agent result")?;

            match firewall.sanitize(&result, direction) {
                Ok(cleaned) => {
                    println!("{}", serde_json::to_string_pretty(&cleaned)?);
                    Ok(0)
                }
                Err(e) if e.is_policy_block() => {
                    eprintln!("{}", e);
                    Ok(EXIT_BLOCKED)
                }
                Err(e) => Err(e.into()),
            }
        }

        Commands::Rules => {
            println!(
                "{:<24} {:<6} {:<4} {:<6} {:<14} PATTERN",
                "NAME", "ACTION", "DIR", "QUICK", "TAG"
            );
            for rule in firewall.rules() {
                println!(
                    "{:<24} {:<6} {:<4} {:<6} {:<14} {}",
                    rule.name(),
                    rule.action(),
                    rule.direction(),
                    if rule.is_quick() { "yes" } else { "no" },
                    rule.tag().unwrap_or("-"),
                    rule.pattern()
                );
            }
            println!();
            println!(
                "{} rules, max output size {} chars",
                firewall.rules().len(),
                firewall.max_output_size()
            );
            Ok(0)
        }

        Commands::Init { .. } => unreachable!("Init is handled before loading configuration"),
    }
}

fn handle_init_command(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        println!("SwarmGate is already initialized");
        println!("Config file: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    SwarmGateConfig::new()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created configuration at {}", path.display());
    Ok(())
}

fn read_stdin() -> anyhow::Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    Ok(input)
}
