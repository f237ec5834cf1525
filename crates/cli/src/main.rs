//! Evolve CLI - drive a self-evolving learning agent.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use evolve_core::{Context, Value};
use evolve_execution::{Agent, AgentConfig, TaskResult};
use evolve_reflection::{OllamaAdvisor, TemplateAdvisor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "evolve")]
#[command(about = "Self-evolving learning agent", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible runs (overrides the config)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Snapshot file: loaded if present, saved after the run
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Advisory collaborator for reflections
    #[arg(long, global = true, value_enum, default_value_t = AdvisorKind::None)]
    advisor: AdvisorKind,

    /// Ollama server URL (with `--advisor ollama`)
    #[arg(long, global = true, default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Ollama model (with `--advisor ollama`)
    #[arg(long, global = true, default_value = "qwen3:0.6b")]
    ollama_model: String,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AdvisorKind {
    /// Heuristic reflections only
    None,
    /// Deterministic templated advice
    Template,
    /// Advice from an Ollama server
    Ollama,
}

#[derive(Subcommand)]
enum Commands {
    /// Process tasks
    Run {
        /// Task descriptions, e.g. `search: rust traits`
        #[arg(required = true)]
        tasks: Vec<String>,
        /// Context entries as `key=value`
        #[arg(long = "context", short = 'c')]
        context: Vec<String>,
        /// Process the task list this many times
        #[arg(long, default_value = "1")]
        repeat: usize,
    },
    /// Run a built-in mixed workload and print a report
    Demo {
        /// Passes over the workload
        #[arg(long, default_value = "5")]
        rounds: usize,
    },
    /// List available tools
    Tools,
}

const DEMO_TASKS: &[(&str, &[(&str, &str)])] = &[
    ("search: rust ownership", &[("query", "rust ownership"), ("difficulty", "beginner")]),
    ("calculate: 12 * 7", &[("expression", "12 * 7"), ("difficulty", "beginner")]),
    ("analyze: server logs", &[("data", "GET /index 200; GET /api 500"), ("difficulty", "hard")]),
    ("plan: release checklist", &[("goal", "ship version 1.0")]),
    ("search: async runtimes", &[("query", "tokio vs async-std")]),
    ("calculate: 10 / 0", &[("expression", "10 / 0"), ("difficulty", "hard")]),
];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let agent = build_agent(&cli)?;

    if let Some(path) = cli.snapshot.as_ref().filter(|p| p.exists()) {
        let (experiences, strategies) = agent
            .load_snapshot(path)
            .await
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        info!("Loaded {} experiences and {} strategies", experiences, strategies);
    }

    match &cli.command {
        Commands::Run {
            tasks,
            context,
            repeat,
        } => {
            let base = parse_context(context)?;
            for _ in 0..*repeat {
                for task in tasks {
                    let result = agent.process_task(task, Some(base.clone())).await;
                    print_result(&result);
                }
            }
            println!();
            println!("{}", agent.performance_summary());
        }
        Commands::Demo { rounds } => {
            for round in 1..=*rounds {
                info!("Demo round {}/{}", round, rounds);
                for (task, entries) in DEMO_TASKS {
                    let context = entries
                        .iter()
                        .map(|(k, v)| (k.to_string(), Value::parse_literal(v)))
                        .collect();
                    let result = agent.process_task(task, Some(context)).await;
                    print_result(&result);
                }
            }
            print_report(&agent);
        }
        Commands::Tools => {
            for schema in agent.registry().schemas() {
                println!("{} - {}", schema.name, schema.description);
                for input in schema.inputs {
                    match input.default {
                        Some(default) => {
                            println!("    {}: {} (default: {})", input.name, input.description, default)
                        }
                        None => println!("    {}: {}", input.name, input.description),
                    }
                }
            }
        }
    }

    if let Some(path) = &cli.snapshot {
        agent
            .save_snapshot(path)
            .await
            .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
        info!("Saved snapshot to {}", path.display());
    }

    Ok(())
}

fn build_agent(cli: &Cli) -> Result<Agent> {
    let mut config = match &cli.config {
        Some(path) => AgentConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AgentConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let agent = Agent::new(config).context("Invalid agent configuration")?;
    Ok(match cli.advisor {
        AdvisorKind::None => agent,
        AdvisorKind::Template => agent.with_advisor(Arc::new(TemplateAdvisor::new())),
        AdvisorKind::Ollama => agent.with_advisor(Arc::new(OllamaAdvisor::new(
            cli.ollama_url.clone(),
            cli.ollama_model.clone(),
        ))),
    })
}

fn parse_context(entries: &[String]) -> Result<Context> {
    entries
        .iter()
        .map(|entry| -> Result<(String, Value)> {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Context entry must be key=value: {}", entry))?;
            Ok((key.trim().to_string(), Value::parse_literal(value.trim())))
        })
        .collect()
}

fn print_result(result: &TaskResult) {
    let mark = if result.success { "OK  " } else { "FAIL" };
    println!(
        "[{}] {} -> {} (reward {:+.2})",
        mark, result.task, result.action, result.reward
    );
    if let Some(report) = &result.evolution {
        println!(
            "      evolution: {} patterns, {} pruned, {} links, new tools {:?}",
            report.patterns.len(),
            report.pruned_strategies.len(),
            report.similarity_links,
            report.new_tools
        );
    }
}

fn print_report(agent: &Agent) {
    println!();
    println!("== Performance ==");
    println!("{}", agent.performance_summary());

    println!();
    println!("== Strategies ==");
    for strategy in agent.strategies().snapshot() {
        println!(
            "  {:<40} rate {:.2}  used {:>3}  actions {:?}",
            strategy.name, strategy.success_rate, strategy.usage_count, strategy.actions
        );
    }

    println!();
    println!("== Knowledge ==");
    let stats = agent.graph().statistics();
    println!("  concepts:  {}", stats.concept_count);
    println!("  relations: {}", stats.relation_count);
    if let Some((name, count)) = stats.most_accessed {
        println!("  most accessed: {} ({})", name, count);
    }

    println!();
    println!("== Patterns ==");
    let window = agent.memory().recent(agent.config().evolution.pattern_window);
    let patterns = agent.reflection().identify_patterns(&window);
    if patterns.is_empty() {
        warn!("No patterns found");
    }
    for pattern in &patterns {
        println!("  [{}] {} (strength {:.2})", pattern.kind, pattern.description, pattern.strength);
    }

    println!();
    println!("== Recent reflections ==");
    for record in agent.reflection().reflection_summary(3) {
        println!("  {}", record.reflection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_context() {
        let ctx = parse_context(&["difficulty=hard".into(), "n = 3".into()]).unwrap();
        assert_eq!(ctx.get("difficulty"), Some(&Value::from("hard")));
        assert_eq!(ctx.get("n"), Some(&Value::Number(3.0)));
        assert!(parse_context(&["broken".into()]).is_err());
    }

    #[test]
    fn test_cli_parses_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "evolve", "run", "search: x", "--repeat", "2", "--seed", "4", "--advisor", "template",
        ])
        .unwrap();
        assert_eq!(cli.seed, Some(4));
        assert_eq!(cli.advisor, AdvisorKind::Template);
        assert!(matches!(cli.command, Commands::Run { repeat: 2, .. }));
    }
}
