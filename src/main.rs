//! Remaster - Audio Upscaling and Stem Separation CLI

use anyhow::Context;
use clap::Parser;
use remaster::config::{Cli, Command, Config};
use remaster::pipeline::{self, SeparateRequest, UpscaleRequest};
use remaster::progress::{ProgressEvent, ProgressSender};
use remaster::run::{CancelToken, RunContext};
use remaster::tool::repair_file;
use remaster::{RemasterError, Result, init_logging};
use std::path::PathBuf;
use std::process;
use std::sync::mpsc::Receiver;
use std::thread;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_cli(&cli)?;

    if config.verbose() {
        println!("{} v{}", remaster::NAME, remaster::VERSION);
        println!();
    }

    match cli.command {
        Command::Upscale {
            input, output_dir, ..
        } => {
            println!("=== Remaster: Upscale ===");
            println!("Input: {}", input.display());
            println!("Output dir: {}", output_dir.display());
            println!("Chunk length: {} s", config.chunk_seconds());
            println!("Workers: {}", config.jobs());
            println!("=========================\n");

            let keep_temp = config.run.keep_temp;
            let request = UpscaleRequest { input, output_dir };
            drive(keep_temp, move |ctx| {
                pipeline::upscale::run(&config, &request, ctx)
            })?;
        }

        Command::Separate {
            input, output_dir, ..
        } => {
            println!("=== Remaster: Separate ===");
            println!("Input: {}", input.display());
            println!("Output dir: {}", output_dir.display());
            println!("Model: {}", config.tools.separator_model);
            println!("==========================\n");

            let keep_temp = config.run.keep_temp;
            let request = SeparateRequest { input, output_dir };
            drive(keep_temp, move |ctx| {
                pipeline::separate::run(&config, &request, ctx)
            })?;
        }

        Command::Repair { input, output } => {
            println!("=== Remaster: Repair ===");
            println!("Input: {}", input.display());
            println!("========================\n");

            let written = repair_file(&config.tools, &input, &output, &CancelToken::new())?;
            println!("Repaired: {}", written.display());
        }

        Command::InitConfig { path } => {
            Config::default()
                .save_to_file(&path)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}

/// Run one pipeline on a worker thread while this thread prints progress.
fn drive<F>(keep_temp: bool, stages: F) -> Result<PathBuf>
where
    F: FnOnce(RunContext) -> Result<PathBuf> + Send + 'static,
{
    let (progress, events) = ProgressSender::channel();
    let ctx = RunContext::new(progress, CancelToken::new(), keep_temp)?;

    let handle = thread::spawn(move || stages(ctx));
    print_events(&events);

    handle
        .join()
        .map_err(|_| RemasterError::processing("pipeline thread panicked"))?
}

/// Print events until the pipeline drops its sender.
fn print_events(events: &Receiver<ProgressEvent>) {
    for event in events.iter() {
        match event {
            ProgressEvent::StageStarted { stage } => println!("[{}]", stage.label()),
            ProgressEvent::ChunkFinished { index, total } => {
                println!("  chunk {}/{} done", index + 1, total);
            }
            ProgressEvent::Completed { output } => {
                println!("\n=== Complete ===");
                println!("Output: {}", output.display());
            }
            // The error itself reaches the user through main once joined
            ProgressEvent::Failed { .. } => {}
        }
    }
}
