mod cli;
mod commands;
mod error_fmt;
mod logging;

use std::path::Path;

use clap::Parser;
use nezha_core::error::NezhaError;

use crate::cli::{Cli, JSON_MODE};
use crate::commands::Session;
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn load_config(path: Option<&Path>) -> eyre::Result<nezha_config::Config> {
    let cfg = match path {
        Some(p) => nezha_config::load_file(p)
            .map_err(|e| eyre::Report::new(NezhaError::Config(format!("{e}"))))?,
        None => nezha_config::Config::default(),
    };
    cfg.validate()
        .map_err(|e| eyre::Report::new(NezhaError::Config(format!("{e}"))))?;
    Ok(cfg)
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    let session = Session::open(&cfg)?;
    if let (Some(n), Some(board)) = (cli.sim_fail_writes, session.simulator()) {
        board.fail_next_writes(n);
    }
    session.install_ctrlc();

    let outcome = commands::execute(&session, &cli.cmd)?;
    if cli.json {
        let line = serde_json::json!({
            "command": cli.cmd.name(),
            "result": outcome.data,
            "frames": session.frames_hex(),
        });
        println!("{line}");
    } else {
        println!("{}", outcome.message);
        for frame in session.frames_hex() {
            println!("  -> {frame}");
        }
    }
    Ok(())
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}
