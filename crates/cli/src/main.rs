//! CLI for preparing student submissions for anonymous marking.

use anonmark_core::{ReconcileConfig, Reconciler};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Anonymise submission folders and strip speaker notes from slide decks.
#[derive(Parser, Debug)]
#[command(name = "anonmark")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy each student's submission to <anonymous ID>.<ext>
    Rename {
        /// Folder containing one sub-folder per student
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Folder for the renamed files and the session log
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tab-separated student table with LastName and Anon columns
        #[arg(short, long)]
        roster: Option<PathBuf>,

        /// Print a JSON summary of the run
        #[arg(long)]
        json: bool,
    },

    /// Remove speaker notes from every .pptx in a folder
    StripNotes {
        /// Folder containing the .pptx files
        #[arg(short, long)]
        input: PathBuf,

        /// A different folder for the cleaned files
        #[arg(short, long)]
        output: PathBuf,

        /// Print a JSON summary of the run
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match args.command {
        Command::Rename {
            input,
            output,
            roster,
            json,
        } => rename(
            ReconcileConfig {
                input_dir: input,
                output_dir: output,
                roster_path: roster,
                quiet: json,
            },
            json,
        ),
        Command::StripNotes {
            input,
            output,
            json,
        } => strip_notes(input, output, json),
    }
}

/// Run the roster reconciliation.
fn rename(config: ReconcileConfig, json: bool) -> Result<()> {
    log::debug!("Anonymising with {:?}", config);
    let summary = Reconciler::new(config)
        .run()
        .context("Anonymisation stopped")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Copied {} of {} folders ({} errors, {} warnings). Log: {}",
            summary.copied.len(),
            summary.folders_scanned,
            summary.errors,
            summary.warnings,
            summary.log_path.display()
        );
    }

    Ok(())
}

/// Run the notes stripper over a folder.
fn strip_notes(input: PathBuf, output: PathBuf, json: bool) -> Result<()> {
    log::debug!("Stripping notes from {} into {}", input.display(), output.display());
    let summary = anonmark_pptx::strip_folder(&input, &output).with_context(|| {
        format!(
            "Failed to strip notes from {} into {}",
            input.display(),
            output.display()
        )
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for deck in &summary.stripped {
            println!("{}", deck.report.describe(&deck.source));
        }
        for failed in &summary.failed {
            eprintln!("Error processing {}: {}", failed.source.display(), failed.reason);
        }
        println!(
            "Stripped {} presentations ({} failed)",
            summary.stripped.len(),
            summary.failed.len()
        );
    }

    Ok(())
}
