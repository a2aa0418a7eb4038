use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{error, info};

use bootgate::{BootgateConfig, Supervisor};

#[derive(Parser, Debug)]
#[command(name = "bootgate")]
#[command(about = "Container entrypoint supervisor with dependency readiness gating")]
#[command(version)]
#[command(long_about = "A container entrypoint supervisor that gates service startup on a \
dependency becoming reachable, runs idempotent preparation commands (schema migration, \
static-asset collection), then launches and supervises the long-running server process, \
forwarding termination signals to its process group.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, help = "Path to TOML configuration file (default: bootgate.toml)")]
    config: Option<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - gate and prepare but don't launch the server
    #[arg(long, help = "Run the readiness gate and preparation phase, then exit")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config();
        return Ok(());
    }

    // Initialize logging
    init_logging(&args)?;

    info!("Starting Bootgate v{}", env!("CARGO_PKG_VERSION"));

    // An explicitly requested config file must exist
    let config_path = args.config.clone().unwrap_or_else(|| "bootgate.toml".to_string());
    if args.config.is_some() && !Path::new(&config_path).exists() {
        error!("Configuration file not found: {}", config_path);
        eprintln!("✗ Configuration file not found: {}", config_path);
        std::process::exit(1);
    }
    info!("Configuration file: {}", config_path);

    // Load and validate configuration
    let config = match BootgateConfig::load_from_file(&config_path) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", config_path);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().map_err(|e| {
        error!("Configuration validation failed: {}", e);
        e
    })?;

    info!("Bootgate configuration loaded and validated");

    let mut supervisor = Supervisor::new(config);

    // Handle dry run mode
    if args.dry_run {
        match supervisor.preflight().await {
            Ok(()) => {
                info!("Dry run mode - dependency ready and preparation completed");
                println!("✓ Dry run completed successfully - server launch skipped");
                return Ok(());
            }
            Err(e) => {
                error!("Dry run failed: {}", e);
                std::process::exit(e.exit_code());
            }
        }
    }

    // Run the startup sequence and supervise the server
    let exit_code = match supervisor.run().await {
        Ok(code) => code,
        Err(e) => {
            error!("Startup failed: {}", e);
            e.exit_code()
        }
    };

    info!("Bootgate exited with code: {}", exit_code);

    // Exit with appropriate code for the container runtime
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bootgate={}", log_level)));

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        None => fmt::layer()
            .with_target(false)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    // Initialize subscriber
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() {
    println!("# Bootgate Configuration File");
    println!("# This is the default configuration with all available options");
    println!();

    let default_config = r#"[dependency]
# Hostname of the dependency to gate on
host = "db"
# TCP port of the dependency
port = 5432
# Seconds between connection attempts
poll_interval_secs = 1
# Per-attempt connect timeout in seconds
connect_timeout_secs = 5
# Maximum connection attempts before giving up (omit to poll forever)
# max_attempts = 60

# Preparation steps run in order once the dependency is reachable.
# on_failure: "abort" stops startup with the step's exit code,
#             "continue" logs the failure and proceeds.
[[prepare]]
name = "migrate"
command = ["python", "manage.py", "migrate"]
on_failure = "abort"

[[prepare]]
name = "collectstatic"
command = ["python", "manage.py", "collectstatic", "--noinput"]
on_failure = "continue"

[server]
# Server command argv, program first
command = ["gunicorn", "core.wsgi", "--bind", "0.0.0.0:8000"]
# Launch mode: "development" appends dev_args, "production" appends prod_args
mode = "production"
# Extra args appended in development mode
dev_args = ["--reload", "--workers", "1"]
# Extra args appended in production mode
prod_args = ["--workers", "4", "--timeout", "120"]
# Environment variables passed to the server process
# [server.env]
# DJANGO_SETTINGS_MODULE = "core.settings"

[shutdown]
# Seconds to wait after forwarding SIGTERM before escalating to SIGKILL
grace_period_secs = 30
"#;

    println!("{}", default_config);
}
