//! phpinclude - PHP include bundler
//!
//! Usage: phpinclude [OPTIONS] [INPUT] [OUTPUT]
//!
//! Builds INPUT and every file it includes into OUTPUT. With `--watch` it
//! keeps rebuilding incrementally until interrupted.

mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;

use phpinclude::config::{diagnostics_from_env, load_builder_config};
use phpinclude::watcher::{WatchEvent, WatchOptions, WatchUseCase};
use phpinclude::{logging, Builder};

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let diagnostics = cli.dev || diagnostics_from_env();

    match run(&cli, diagnostics) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, diagnostics, cli.json);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, diagnostics: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let config = load_builder_config(cli.config.as_deref(), &cwd, diagnostics)?;
    let mut builder = Builder::new(config)?;

    if cli.watch {
        cmd_watch(&mut builder, cli)
    } else {
        cmd_build(&mut builder, &cli.input, &cli.output)
    }
}

fn cmd_build(builder: &mut Builder, input: &Path, output: &Path) -> Result<()> {
    builder.build_entry(input, output)?;
    let units = builder.registry().present_units().count();
    println!(
        "wrote {} ({} module{})",
        output.display(),
        units,
        if units == 1 { "" } else { "s" }
    );
    Ok(())
}

fn cmd_watch(builder: &mut Builder, cli: &Cli) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .context("cannot install the Ctrl+C handler")?;

    let json = cli.json;
    let use_case = WatchUseCase::new(WatchOptions::new(cli.input.clone(), cli.output.clone()));
    use_case.start(builder, running, |event| print_watch_event(&event, json))?;
    Ok(())
}

fn print_watch_event(event: &WatchEvent, json: bool) {
    if json {
        println!("{}", event.to_json());
        return;
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs() % 86_400;
            format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
        })
        .unwrap_or_else(|_| "00:00:00".to_string());

    match event {
        WatchEvent::WatchStarted { entry, output } => {
            println!("Watching {} -> {} (Ctrl+C to stop)", entry, output)
        }
        WatchEvent::FileChanged { path } => println!("[{}] changed {}", timestamp, path),
        WatchEvent::BuildStarted => {}
        WatchEvent::BuildComplete { units } => {
            println!("[{}] built {} module(s)", timestamp, units)
        }
        WatchEvent::Error { message } => eprintln!("[{}] error: {}", timestamp, message),
        WatchEvent::Shutdown => println!("Stopped watching"),
    }
}

/// The one place failures are shown to the user
fn report_error(err: &anyhow::Error, diagnostics: bool, json: bool) {
    if json {
        let output = serde_json::json!({
            "event": "error",
            "message": format!("{:#}", err),
        });
        println!("{}", output);
        return;
    }

    eprintln!("error: {}", err);
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {}", cause);
    }
    if diagnostics {
        eprintln!("\n{:?}", err);
    }
}
