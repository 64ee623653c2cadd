//! docfold - Merge PDFs, slide decks and images into a single document.

mod cli;

use clap::Parser;
use std::process;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use docfold::config::{Config, OverwriteMode};
use docfold::error::DocFoldError;
use docfold::input::{load_inputs, read_input_list};
use docfold::output::{
    OutputFormatter, ProgressBar, display_outcome, display_plan, json_line,
};
use docfold::plan::{MemorySnapshot, plan};
use docfold::{MergeOutcome, MergeRequest, MergeService};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
    };
    process::exit(code);
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the defaults.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,docfold=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main application logic. Returns the process exit code.
async fn run(mut cli: Cli) -> Result<i32, DocFoldError> {
    cli.validate()?;

    if let Some(list) = cli.input_list.clone() {
        let listed = read_input_list(&list).await?;
        cli.inputs.extend(listed);
    }

    let config = cli.to_config()?;
    let formatter = OutputFormatter::from_config(&config);
    formatter.section(&format!("{} v{}", docfold::NAME, docfold::VERSION));

    let patterns: Vec<String> = config
        .inputs
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let files = load_inputs(&patterns).await?;

    if config.dry_run {
        let plan = plan(
            &files,
            &config.output,
            config.format,
            MemorySnapshot::host(),
            &config.limits,
        )
        .with_composer(&files, config.format, config.tools.deck_composer.is_some());
        if config.json {
            println!("{}", json_line(&plan));
        } else {
            display_plan(&OutputFormatter::new(false, config.verbose), &files, &plan);
        }
        plan.ensure_executable(&files, config.format)?;
        formatter.success("Dry run completed successfully");
        formatter.info(&format!("  Output would be: {}", config.output.display()));
        return Ok(0);
    }

    handle_output_overwrite(&config, &formatter)?;

    let service = MergeService::from_config(&config).await?;
    let plan = service.plan(&files, &config.output, config.format);
    if config.verbose {
        display_plan(&formatter, &files, &plan);
    }

    let canceller = service.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && canceller.request_cancel() {
            info!("interrupt received, canceling merge");
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let json = config.json;
    let mut bar = if json || config.quiet {
        ProgressBar::disabled()
    } else {
        ProgressBar::auto()
    };
    let render_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json {
                println!("{}", json_line(&event));
            } else {
                bar.apply(&event);
            }
        }
    });

    let request = MergeRequest {
        files,
        output: config.output.clone(),
        format: config.format,
        bookmarks: config.bookmarks,
    };
    let result = service.merge_with(request, plan, Some(tx)).await;

    signal_task.abort();
    // the sender is gone once the job returns, so this drains and ends
    let _ = render_task.await;

    let outcome = result?;
    if json {
        println!("{}", json_line(&outcome));
    } else {
        display_outcome(&formatter, &outcome);
    }

    Ok(match outcome {
        MergeOutcome::Canceled => DocFoldError::Cancelled.exit_code(),
        MergeOutcome::Completed { .. } => 0,
    })
}

/// Handle output file overwrite scenarios.
fn handle_output_overwrite(config: &Config, formatter: &OutputFormatter) -> Result<(), DocFoldError> {
    if !config.output.exists() {
        return Ok(());
    }

    match config.overwrite_mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(DocFoldError::output_exists(config.output.clone())),
        OverwriteMode::Prompt => {
            // Nobody to ask; treat as no-clobber.
            if formatter.is_quiet() {
                return Err(DocFoldError::output_exists(config.output.clone()));
            }

            formatter.warning(&format!(
                "Output file already exists: {}",
                config.output.display()
            ));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| DocFoldError::other(format!("Failed to read input: {err}")))?;

            let response = response.trim().to_lowercase();
            if response == "y" || response == "yes" {
                Ok(())
            } else {
                Err(DocFoldError::Cancelled)
            }
        }
    }
}
