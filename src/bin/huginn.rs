//! huginn — explain shell commands, suggest commands, summarize docs.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use huginn::engine::open_cache;
use huginn::{
    CacheStore, Config, Engine, EngineConfig, Mode, OutputFormat, ProviderRegistry, Request,
    WriterSink,
};

/// Huginn command-line assistant
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Explain shell commands, suggest commands, and summarize docs")]
struct Args {
    /// Config file (default: {config_dir}/huginn/config.toml)
    #[arg(long, global = true, env = "HUGINN_CONFIG")]
    config: Option<PathBuf>,

    /// Force a provider (no fallback), or "auto"
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Neither read nor write the response cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Print the response only once it is complete
    #[arg(long, global = true)]
    no_stream: bool,

    /// Print the response as a JSON object (never streamed)
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Explain what a shell command does
    Explain {
        /// Command to explain (or omit to read from stdin)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Suggest shell commands for a task
    Suggest {
        /// Task description (or omit to read from stdin)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        task: Vec<String>,
    },

    /// Show practical examples for a command
    Examples {
        /// Command name (or omit to read from stdin)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Summarize documentation (e.g. `man tar | huginn summarize`)
    Summarize {
        /// Text or focus question; stdin is appended when piped
        text: Option<String>,
    },

    /// List providers in priority order and probe their availability
    Providers,

    /// Inspect or clear the response cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Print version and build information
    Version,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Show entry count and database size
    Stats,
    /// Delete every cached response
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialise tracing on stderr (default: warn; override with RUST_LOG or -v).
    let filter = if args.verbose {
        tracing_subscriber::EnvFilter::new("huginn=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(args.config.as_deref())?;

    let (mode, text) = match args.command {
        Command::Explain { command } => (Mode::Explain, resolve_text(joined(command), "explain")?),
        Command::Suggest { task } => (Mode::Suggest, resolve_text(joined(task), "suggest")?),
        Command::Examples { command } => {
            (Mode::Examples, resolve_text(joined(command), "examples")?)
        }
        Command::Summarize { text } => (Mode::Summarize, resolve_text(text, "summarize")?),

        Command::Providers => {
            let registry = ProviderRegistry::from_config(&config.providers, None);
            list_providers(&registry).await;
            return Ok(());
        }

        Command::Cache { command } => {
            let store = CacheStore::open(&config.cache)?;
            return cache_command(&store, command);
        }

        Command::Version => {
            println!("huginn {}", huginn::version_string());
            return Ok(());
        }
    };

    let mut engine_config = EngineConfig::from_config(&config);
    if let Some(provider) = args.provider {
        engine_config = engine_config.provider(provider);
    }
    if args.no_cache {
        engine_config = engine_config.cache_enabled(false);
    }
    if args.no_stream {
        engine_config = engine_config.stream(false);
    }
    if args.json {
        engine_config = engine_config.format(OutputFormat::Json);
    }

    let cache = if engine_config.cache_enabled {
        open_cache(&config.cache)
    } else {
        None
    };
    let registry = Arc::new(ProviderRegistry::from_config(
        &config.providers,
        engine_config.provider.as_deref(),
    ));
    let engine = Engine::new(registry, cache, engine_config);

    let mut sink = WriterSink::new(io::stdout());
    engine.run(&Request::new(mode, text), &mut sink).await?;
    Ok(())
}

async fn list_providers(registry: &ProviderRegistry) {
    if registry.is_empty() {
        println!("no providers configured");
        return;
    }
    for status in registry.availability().await {
        let state = match (&status.error, status.available) {
            (Some(e), _) => format!("error: {e}"),
            (None, true) => "available".to_string(),
            (None, false) => "unavailable".to_string(),
        };
        let streaming = if status.supports_streaming {
            "streaming"
        } else {
            "batch"
        };
        println!("{:<12} {:<10} {state}", status.name, streaming);
    }
}

fn cache_command(
    store: &CacheStore,
    command: CacheCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        CacheCommand::Stats => {
            let stats = store.stats()?;
            if let Some(path) = store.path() {
                println!("path:    {}", path.display());
            }
            println!("entries: {}", stats.entries);
            println!("size:    {} bytes", stats.size_bytes);
        }
        CacheCommand::Clear { yes } => {
            if !yes && !confirm("delete every cached response?") {
                println!("aborted.");
                return Ok(());
            }
            let removed = store.clear()?;
            println!("removed {removed} entries");
        }
    }
    Ok(())
}

/// confirm a prompt with the user; returns false if declined.
fn confirm(prompt: &str) -> bool {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn joined(words: Vec<String>) -> Option<String> {
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// Combination rules:
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_is_pipe = !io::stdin().is_terminal();
    let stdin_text = if stdin_is_pipe {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    } else {
        None
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
