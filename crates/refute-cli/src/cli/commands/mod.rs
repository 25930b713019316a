use super::args::*;
use refute_core::config::{load_config, HarnessConfig};
use refute_core::errors::HarnessError;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

pub mod ex;
pub mod prove;
pub mod score;
pub mod verify;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const CONFIG_ERROR: i32 = 2;
    pub const INTERRUPTED: i32 = 130;
}

pub const LOG_ENV: &str = "REFUTE_LOG";

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    init_logging(cli.log_json);
    match cli.cmd {
        Command::Verify(args) => verify::run(args).await,
        Command::Score(args) => score::run(args),
        Command::Ex(args) => ex::run(args).await,
        Command::Prove(args) => prove::run(args).await,
        Command::Init(args) => cmd_init(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    // a second init (tests) is harmless
    let _ = if json {
        builder
            .json()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_target(true)
            .with_current_span(false)
            .with_span_list(false)
            .try_init()
    } else {
        builder.with_target(false).compact().try_init()
    };
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if args.config.exists() {
        eprintln!("note: {} already exists", args.config.display());
        return Ok(exit_codes::OK);
    }
    if let Some(parent) = args.config.parent() {
        std::fs::create_dir_all(parent)?;
    }
    refute_core::config::write_sample_config(&args.config)?;
    eprintln!("created {}", args.config.display());
    Ok(exit_codes::OK)
}

/// Settings file (if any), then `REFUTE_*` variables, then flags.
pub(crate) fn harness_config(opts: &RunOpts, order_sensitive: bool) -> Result<HarnessConfig, i32> {
    let mut cfg = match opts.config.as_deref() {
        Some(path) => load(path)?,
        None => HarnessConfig::default(),
    };
    cfg.apply_env();
    if let Some(w) = opts.workers {
        cfg.workers = w;
    }
    if let Some(t) = opts.timeout_seconds {
        cfg.timeout_seconds = t;
    }
    if order_sensitive {
        cfg.order_sensitive = true;
    }
    if let Err(e) = cfg.validate() {
        eprintln!("config error: {}", e);
        return Err(exit_codes::CONFIG_ERROR);
    }
    tracing::debug!(event = "config.resolved", config = ?cfg);
    Ok(cfg)
}

fn load(path: &Path) -> Result<HarnessConfig, i32> {
    load_config(path).map_err(|e| {
        eprintln!("config error: {}", e);
        exit_codes::CONFIG_ERROR
    })
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
pub(crate) async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Maps batch-level failures to exit codes; anything unexpected propagates.
pub(crate) fn batch_exit(e: HarnessError) -> anyhow::Result<i32> {
    match e {
        HarnessError::Interrupted => {
            eprintln!("interrupted; partial results were discarded");
            Ok(exit_codes::INTERRUPTED)
        }
        other => Err(other.into()),
    }
}
