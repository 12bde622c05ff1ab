//! Agentry CLI - research and plan a task from the terminal

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use agentry_core::agents::{PlanningAgent, ResearchAgent, Task};
use agentry_core::config::Config;
use agentry_core::coordinator::{CombinedResult, TaskManager, TaskReport};
use agentry_core::cost::{CostMonitor, CostSummary};
use agentry_core::format::format_duration;
use agentry_core::llm::LlmClient;
use agentry_core::reflection::Reflector;
use agentry_core::storage::save_result;
use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

/// Cost log file name inside the config directory
const COST_LOG_FILE: &str = "api_costs.json";

#[derive(Parser)]
#[command(name = "agentry")]
#[command(author, version, about = "Research and planning agents over an LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a task and produce an implementation plan
    Run {
        /// Task description
        description: String,
        /// Task priority (low, medium, high)
        #[arg(short, long)]
        priority: Option<String>,
        /// Task deadline
        #[arg(short, long)]
        deadline: Option<String>,
        /// Requirement (repeatable)
        #[arg(short = 'r', long = "require")]
        requirements: Vec<String>,
        /// Run every agent concurrently under the coordinator deadline
        #[arg(long)]
        fan_out: bool,
        /// Save the result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// View API costs and usage
    Costs,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration
    List,
    /// Reset to defaults
    Reset,
    /// Show the configuration file path
    Path,
}

struct RunArgs {
    task: Task,
    fan_out: bool,
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = init_tracing() {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            report_error(format, &e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agentry=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run {
            description,
            priority,
            deadline,
            requirements,
            fan_out,
            output,
        } => {
            let mut task = Task::new(description);
            task.priority = priority;
            task.deadline = deadline;
            task.requirements = requirements;

            cmd_run(
                RunArgs {
                    task,
                    fan_out,
                    output,
                },
                cli.format,
                cli.quiet,
            )
            .await
        }

        Commands::Costs => cmd_costs(cli.format, cli.quiet).map(|_| ExitCode::SUCCESS),

        Commands::Config { action } => cmd_config(action, cli.quiet).map(|_| ExitCode::SUCCESS),
    }
}

fn report_error(format: OutputFormat, error: &anyhow::Error) {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "status": "error",
                "message": format!("{:#}", error),
            });
            println!("{}", value);
        }
        OutputFormat::Text => eprintln!("Error: {:#}", error),
    }
}

fn cost_log_path(config: &Config) -> anyhow::Result<PathBuf> {
    match &config.cost.log_file {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::config_dir()?.join(COST_LOG_FILE)),
    }
}

fn open_cost_monitor(path: &Path) -> anyhow::Result<CostMonitor> {
    CostMonitor::open(path)
        .with_context(|| format!("Failed to open cost log: {}", path.display()))
}

async fn cmd_run(args: RunArgs, format: OutputFormat, quiet: bool) -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    let api_key = config.llm.resolved_api_key()?.ok_or_else(|| {
        anyhow!("No API key found. Set AGENTRY_API_KEY or GROQ_API_KEY environment variable.")
    })?;

    let monitor = Arc::new(open_cost_monitor(&cost_log_path(&config)?)?);
    let client = Arc::new(
        LlmClient::builder()
            .config(config.llm.clone())
            .api_key(api_key)
            .cost_monitor(monitor.clone())
            .build()?,
    );
    debug!(model = %client.model(), "Built LLM client");

    let researcher = ResearchAgent::new(client.clone())
        .with_reflection(Reflector::with_threshold(config.research.confidence_threshold));
    let planner = PlanningAgent::new(client)
        .with_reflection(Reflector::with_threshold(config.planning.confidence_threshold));
    let manager = TaskManager::new(Arc::new(researcher), Arc::new(planner))
        .with_config(&config.coordinator);

    info!(fan_out = args.fan_out, "Processing task");
    let report = if args.fan_out {
        manager.run_fan_out(&args.task).await
    } else {
        manager.run_pipeline(&args.task).await
    };
    let result = &report.result;

    if let Some(path) = &args.output {
        save_result(path, result)
            .with_context(|| format!("Failed to save result: {}", path.display()))?;
        info!(path = %path.display(), "Saved result");
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => print_result(result, quiet),
    }

    if !quiet && format == OutputFormat::Text {
        print_run_summary(&report);
        println!("Cost: ${:.4}", monitor.total_cost());
    }

    Ok(if result.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_result(result: &CombinedResult, quiet: bool) {
    match result {
        CombinedResult::Error { message, details } => {
            println!("Status: error");
            println!("Message: {}", message);
            if !quiet
                && let Some(reason) = details
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(|m| m.as_str())
            {
                println!("Reason: {}", reason);
            }
        }
        CombinedResult::Completed {
            research_phase,
            planning_phase,
            confidence_scores,
        } => {
            println!("Status: completed");
            if quiet {
                return;
            }

            if let Some(research) = research_phase {
                println!();
                println!("== Research ==");
                print_section("Summary", &research.summary);
                print_section("Analysis", &research.detailed_analysis);
                print_section("Recommendations", &research.recommendations);
                print_section("Considerations", &research.considerations);
            }

            if let Some(plan) = planning_phase {
                println!();
                println!("== Plan ==");
                print_section("Implementation plan", &plan.plan);
                print_section("Technical specifications", &plan.technical_specifications);
                print_section("Timeline", &plan.timeline);
                print_section("Resources", &plan.resources);
                print_section("Risks and mitigations", &plan.risks_and_mitigations);
            }

            println!();
            if let Some(score) = confidence_scores.research {
                println!("Research confidence: {:.2}", score);
            }
            if let Some(score) = confidence_scores.planning {
                println!("Planning confidence: {:.2}", score);
            }
            if let Some(mean) = confidence_scores.mean() {
                println!("Overall confidence: {:.2}", mean);
            }
        }
    }
}

fn print_run_summary(report: &TaskReport) {
    let metrics = &report.metrics;
    let completed = report
        .agent_results
        .iter()
        .filter(|(_, r)| r.is_completed())
        .count();

    println!();
    println!("Elapsed: {}", format_duration(metrics.completion_time));
    println!(
        "Agents: {}/{} completed ({:.0}%)",
        completed,
        report.agent_results.len(),
        metrics.success_rate * 100.0
    );
    println!("Complexity: {}", metrics.complexity_score);
}

fn print_section(title: &str, content: &str) {
    println!();
    println!("{}:", title);
    for line in content.lines() {
        println!("  {}", line);
    }
}

fn cmd_costs(format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let monitor = open_cost_monitor(&cost_log_path(&config)?)?;
    let summary = monitor.summary();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_cost_summary(&summary, quiet),
    }
    Ok(())
}

fn print_cost_summary(summary: &CostSummary, quiet: bool) {
    if quiet {
        println!("${:.4}", summary.total_cost);
        return;
    }

    println!("Cost Summary:");
    println!("  Total: ${:.4}", summary.total_cost);
    println!(
        "  Requests: {} ({} succeeded, {} failed)",
        summary.total_requests, summary.successful_requests, summary.failed_requests
    );
    if !summary.costs_by_model.is_empty() {
        println!("  By model:");
        for (model, model_summary) in &summary.costs_by_model {
            println!(
                "    {}: ${:.4} ({} requests, {} input / {} output tokens)",
                model,
                model_summary.total_cost,
                model_summary.request_count,
                model_summary.total_input_tokens,
                model_summary.total_output_tokens
            );
        }
    }
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
