//! `placefield-cli` – interactive shell around a [`PlaceField`].
//!
//! 1. Loads `~/.placefield/config.toml`, writing the defaults when the file is
//!    absent.
//! 2. Builds a place field from the `[map]` table and the configured self id.
//! 3. Drops the user into a **REPL** that feeds change records to the map and
//!    queries the exploration tracker.
//! 4. Intercepts **Ctrl-C** and exits at the next prompt.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use placefield_map::PlaceField;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info").  PLACEFIELD_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("PLACEFIELD_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – exiting at the next prompt …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load_or_init() {
        Ok((cfg, true)) => {
            println!(
                "  {} Default config written to {}",
                "✓".green().bold(),
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok((cfg, false)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    let field = PlaceField::new(cfg.map, &cfg.self_id);
    let map = field.config();
    info!(
        self_id = %cfg.self_id,
        resolution = map.resolution,
        initial_size = map.initial_size,
        max_size = map.max_size,
        "place field ready"
    );
    println!(
        "  Grid {}×{} (max {}), resolution {}, self id {}",
        map.initial_size,
        map.initial_size,
        map.max_size,
        map.resolution,
        cfg.self_id.bold()
    );

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(shutdown, repl::Session::new(field));
}

fn print_banner() {
    println!();
    println!("{}", r#"   ___  __                 _______     __   __"#.bold().cyan());
    println!("{}", r#"  / _ \/ /__ ________ ___ / __/  _/__ / /__/ /"#.bold().cyan());
    println!("{}", r#" / ___/ / _ `/ __/ -_)___/ _/_/ // -_) / _  / "#.bold().cyan());
    println!("{}", r#"/_/  /_/\_,_/\__/\__/   /_/ /___/\__/_/\_,_/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "PlaceField".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Grid spatial memory for embodied agents");
    println!();
}
