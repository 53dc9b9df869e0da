use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campaign_research::cli::{CommandContext, commands};
use campaign_research::types::ResponseStatus;

#[derive(Parser)]
#[command(name = "campaign-research")]
#[command(
    version,
    about = "AI research and outreach drafting for sales campaigns"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Config file (defaults to global + project config)")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage campaign, users and topics from a workbook
    Setup {
        #[arg(help = "Workbook file (.json, .yaml, .yml)")]
        workbook: PathBuf,
    },

    /// Research every prospect in a workbook and stage the results
    Research {
        #[arg(help = "Workbook file (.json, .yaml, .yml)")]
        workbook: PathBuf,
        #[arg(long, help = "Use canned offline providers")]
        offline: bool,
        #[arg(long, help = "Cancel the run after this many seconds")]
        timeout_secs: Option<u64>,
    },

    /// Answer sell-side questions and stage the scripts
    SellSide {
        #[arg(help = "Workbook file (.json, .yaml, .yml)")]
        workbook: PathBuf,
        #[arg(long, help = "Use canned offline providers")]
        offline: bool,
    },

    /// Transfer staging tables into permanent tables
    Commit,

    /// Show staging and permanent row counts
    Status {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Show committed research for one buyer
    Answers {
        #[arg(help = "Buyer identifier")]
        buyer_identifier: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mcampaign-research encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(ResponseStatus::Ok) => ExitCode::SUCCESS,
        Ok(ResponseStatus::NothingToCommit) => ExitCode::from(3),
        Ok(ResponseStatus::Failed) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ResponseStatus> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Config { action } = cli.command {
        match action {
            ConfigAction::Show { format } => commands::config::show(&format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => {
                if global {
                    commands::config::init_global(force)?;
                } else {
                    commands::config::init_project()?;
                }
            }
        }
        return Ok(ResponseStatus::Ok);
    }

    let ctx = CommandContext::load(cli.config.as_deref())?;

    let status = match cli.command {
        Commands::Setup { workbook } => commands::setup::run(&ctx, &workbook)?,
        Commands::Research {
            workbook,
            offline,
            timeout_secs,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(async {
                let cancel = interrupt_token();
                commands::research::run(&ctx, &workbook, offline, timeout_secs, cancel).await
            })?
        }
        Commands::SellSide { workbook, offline } => {
            let rt = Runtime::new()?;
            rt.block_on(async {
                let cancel = interrupt_token();
                commands::sell_side::run(&ctx, &workbook, offline, cancel).await
            })?
        }
        Commands::Commit => commands::commit::run(&ctx)?,
        Commands::Status { format } => commands::status::run(&ctx, &format)?,
        Commands::Answers { buyer_identifier } => {
            commands::answers::run(&ctx, &buyer_identifier)?
        }
        Commands::Config { .. } => ResponseStatus::Ok,
    };

    Ok(status)
}

/// Token cancelled on Ctrl-C. Must be called inside the runtime.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling");
            on_interrupt.cancel();
        }
    });
    cancel
}
