use clap::Parser;
use eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_appender::non_blocking::WorkerGuard;

mod cli;
mod error_fmt;
mod report;
mod rt;
mod simulate;
mod stain;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = real_main(cli) {
        let code = error_fmt::exit_code_for_error(&e);
        if json {
            println!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(code);
    }
}

fn real_main(cli: Cli) -> Result<()> {
    // Only the panic/error hooks; reports are printed by `main` itself.
    let _ = color_eyre::install();

    let cfg = load_config(&cli.config)?;
    // Dropping the guard flushes the log file, so it lives until we return.
    let _log_guard = init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run { rt } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            })
            .wrap_err("install Ctrl-C handler")?;
            let report = stain::run_machine(&cfg, &rt, shutdown)?;
            report::print_run(&report, cli.json);
        }
        Commands::Simulate { scenario } => {
            let sc = load_scenario(&scenario)?;
            let summary = simulate::run_simulation(&cfg, &sc)?;
            report::print_simulation(&summary, cli.json);
        }
        Commands::Check => {
            let machine = stainer_core::MachineCfg::from(&cfg);
            machine.validate().map_err(eyre::Report::new)?;
            report::print_check(&machine, cli.json);
        }
        Commands::SprayPlan { strokes } => {
            let machine = stainer_core::MachineCfg::from(&cfg);
            report::print_spray_plan(&machine.spray, strokes, cli.json);
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<stainer_config::Config> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = stainer_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate().wrap_err("invalid config")?;
    Ok(cfg)
}

fn load_scenario(path: &Path) -> Result<stainer_config::Scenario> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("read scenario {}", path.display()))?;
    let sc = stainer_config::load_scenario_toml(&text)
        .wrap_err_with(|| format!("parse scenario {}", path.display()))?;
    sc.validate().wrap_err("invalid scenario")?;
    Ok(sc)
}

/// Console logs go to stderr so stdout only carries results. `RUST_LOG`
/// wins over `--log-level`, which wins over `[logging].level`.
fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &stainer_config::Logging,
) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("bad log level {level:?}"))?,
    };

    let mut guard = None;
    let file_layer = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .wrap_err("init tracing")?;
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
            .wrap_err("init tracing")?;
    }
    Ok(guard)
}
