use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use greenhouse_monitor::cli::commands;

#[derive(Parser)]
#[command(name = "greenhouse-monitor")]
#[command(version, about = "Plant-health analysis for greenhouse sensor readings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,

    #[arg(long = "log-json", global = true, help = "Emit logs as JSON lines")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize .greenhouse/ in the current directory
    Init {
        #[arg(long, short, help = "Overwrite existing initialization")]
        force: bool,
    },

    /// Analyze one sensor reading
    Analyze {
        #[arg(help = "Sensor JSON inline or a path to a JSON file")]
        sensor_data: String,
        #[arg(long, short, help = "Plant photo to include")]
        image: Option<PathBuf>,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Run or inspect the scenario batch
    Batch {
        #[command(subcommand)]
        action: BatchAction,
    },

    /// Start the HTTP server
    Serve {
        #[arg(long, help = "Address to bind (overrides server.bind)")]
        bind: Option<String>,
    },

    /// Show configuration and usage; --probe also contacts the provider
    Health {
        #[arg(long)]
        probe: bool,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Show today's inference calls and spend
    Usage {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum BatchAction {
    /// Run every scenario and wait for completion
    Start,
    /// Show progress and results of the last run
    Status {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
    /// Show one scenario result
    Show {
        id: String,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
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
        eprintln!("\x1b[31mgreenhouse-monitor encountered an unexpected error:\x1b[0m");
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
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Commands::Init { force } => commands::init::run(force)?,
        Commands::Analyze {
            sensor_data,
            image,
            format,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::analyze::run(
                &sensor_data,
                image.as_deref(),
                &format,
            ))?;
        }
        Commands::Batch { action } => match action {
            BatchAction::Start => {
                let rt = Runtime::new()?;
                rt.block_on(commands::batch::start())?;
            }
            BatchAction::Status { format } => commands::batch::status(&format)?,
            BatchAction::Show { id, format } => commands::batch::show(&id, &format)?,
        },
        Commands::Serve { bind } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::serve::run(bind))?;
        }
        Commands::Health { probe, format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::health::run(probe, &format))?;
        }
        Commands::Usage { format } => commands::usage::run(&format)?,
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => commands::config::show(global, &format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => commands::config::init(global, force)?,
        },
    }

    Ok(())
}
