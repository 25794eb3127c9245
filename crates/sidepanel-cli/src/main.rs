//! sidepanel - replay and inspect side panel conversations

mod config;
mod render;
mod script;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sidepanel_protocol::{ToolOutcome, format_tool_output};
use tracing_subscriber::EnvFilter;

/// sidepanel - streaming conversation reconciliation, from the command line
#[derive(Parser, Debug)]
#[command(name = "sidepanel")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $SIDEPANEL_CONFIG_PATH or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSONL script of panel steps and print the resulting transcript
    Replay {
        /// Script file, one step per line
        script: PathBuf,

        /// Print the final snapshot and commands as JSON
        #[arg(long)]
        json: bool,

        /// Override the interrupt grace delay in milliseconds
        #[arg(long)]
        grace_ms: Option<u64>,

        /// Include message times in the transcript
        #[arg(long)]
        times: bool,
    },
    /// Format a raw tool result the way the transcript shows it
    Format {
        /// Tool name, e.g. navigation_tool
        tool: String,

        /// Tool result JSON: {"ok": true, "output": ...}
        result: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::Config::config_path);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init(&config_path) {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load_from(&config_path);

    // Setup tracing
    let filter = if args.verbose {
        Some("sidepanel=debug,sidepanel_core=debug,sidepanel_protocol=debug".to_string())
    } else {
        cfg.log_filter.clone()
    };
    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .init();
    }

    match args.command {
        Some(Command::Replay {
            script,
            json,
            grace_ms,
            times,
        }) => {
            let mut session_config = cfg.to_session_config();
            if let Some(ms) = grace_ms {
                session_config.interrupt_grace = std::time::Duration::from_millis(ms);
            }
            run_replay(&script, session_config, json, times).await
        }
        Some(Command::Format { tool, result }) => {
            let outcome: ToolOutcome =
                serde_json::from_str(&result).context("tool result is not valid JSON")?;
            println!("{}", format_tool_output(&tool, &outcome));
            Ok(())
        }
        None => {
            eprintln!("Nothing to do. Try `sidepanel replay <script.jsonl>` or `sidepanel --help`.");
            Ok(())
        }
    }
}

async fn run_replay(
    path: &Path,
    config: sidepanel_core::SessionConfig,
    json: bool,
    times: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let steps = script::parse_script(&text)?;
    tracing::info!(steps = steps.len(), "replaying script");

    let output = script::replay(&steps, config).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print!("{}", render::render_transcript(&output.snapshot, times));
    println!(
        "{}",
        render::status_line(&output.snapshot, output.connected, &output.draft)
    );
    if output.tab_selector_open {
        println!("Tab selector open");
    }
    if let Some(query) = &output.pending_follow_up {
        println!("Follow-up still armed: {}", query);
    }
    println!();
    println!("Outbound commands ({}):", output.commands.len());
    for command in &output.commands {
        println!("  {}", render::render_command(command));
    }
    Ok(())
}
