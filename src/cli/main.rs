use anyhow::Result;
use clap::Parser;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use sidecar_merge::config::{Config, Mode};
use sidecar_merge::metadata::{self, EmbeddedMetadata};
use sidecar_merge::pipeline::{self, ImageKind, MergeOutcome, RunSummary};

#[derive(Parser, Debug)]
#[command(
    name = "sidecar-merge",
    version,
    about = "Merge caption/prompt sidecar files into image metadata — preserve AI generation data and embed the text as a PNG Comment"
)]
struct Cli {
    /// Directory containing images and same-base-name .txt sidecars
    #[arg(value_name = "DIR", default_value = ".")]
    dir: PathBuf,

    /// Disposition preset (copy to subfolder / replace originals / replace and delete sidecars)
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Replace the original image with the merged PNG
    #[arg(long)]
    replace: bool,

    /// Delete the sidecar .txt after its content is merged
    #[arg(long = "delete-sidecar")]
    delete_sidecar: bool,

    /// Subfolder for merged output when originals are kept
    #[arg(long, value_name = "NAME")]
    output_folder: Option<String>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Preview changes without writing or deleting files
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Display the embedded metadata of matched images and exit
    #[arg(long)]
    show: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config, then layer CLI overrides on top
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        mode.apply(&mut config.merge);
    }
    if cli.replace {
        config.merge.replace_original = true;
    }
    if cli.delete_sidecar {
        config.merge.delete_sidecar = true;
    }
    if let Some(folder) = cli.output_folder {
        config.merge.output_folder = folder;
    }
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if cli.pause {
        config.output.pause = true;
    }

    if !cli.dir.is_dir() {
        anyhow::bail!("{} is not a directory", cli.dir.display());
    }

    let pairs = pipeline::collect_pairs(&cli.dir);
    if pairs.is_empty() {
        log::info!("No image/sidecar pairs found in {}", cli.dir.display());
        pause_before_exit(config.output.pause);
        return Ok(());
    }

    // Handle --show
    if cli.show {
        for pair in &pairs {
            print_metadata(&pair.image)?;
        }
        pause_before_exit(config.output.pause);
        return Ok(());
    }

    log::info!("Found {} pair(s) in {}", pairs.len(), cli.dir.display());
    if config.output.dry_run {
        log::info!("DRY RUN — no files will be modified");
    }

    // Process each pair
    let total = pairs.len();
    let mut summary = RunSummary::default();
    let mut results = Vec::new();

    for (i, pair) in pairs.iter().enumerate() {
        log::info!(
            "[{}/{}] {}",
            i + 1,
            total,
            pair.image.file_name().unwrap_or_default().to_string_lossy()
        );

        let outcome = pipeline::merge_pair(pair, &config);
        match &outcome {
            MergeOutcome::Processed(out) => {
                summary.processed += 1;
                log::info!("  merged into {}", out.display());
            }
            MergeOutcome::Skipped(_) => summary.skipped += 1,
            MergeOutcome::Failed(_) => summary.errors += 1,
        }
        results.push((pair, outcome));
    }

    // JSON output
    if cli.json {
        let json_results: Vec<serde_json::Value> = results
            .iter()
            .map(|(pair, outcome)| {
                let (status, output, error) = match outcome {
                    MergeOutcome::Processed(out) => {
                        ("processed", Some(out.display().to_string()), None)
                    }
                    MergeOutcome::Skipped(reason) => ("skipped", None, Some(reason.to_string())),
                    MergeOutcome::Failed(err) => ("error", None, Some(err.clone())),
                };
                serde_json::json!({
                    "image": pair.image.display().to_string(),
                    "sidecar": pair.sidecar.display().to_string(),
                    "status": status,
                    "output": output,
                    "detail": error,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    // Summary
    log::info!(
        "Done: {} merged, {} skipped, {} failed out of {total} pairs",
        summary.processed,
        summary.skipped,
        summary.errors
    );

    pause_before_exit(config.output.pause);
    Ok(())
}

/// Block on a line of input so a double-clicked console window stays open.
fn pause_before_exit(pause: bool) {
    if !pause {
        return;
    }
    println!("\nPress Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 58;
/// Indent for continuation lines (tag column width + " : ").
const INDENT: &str = "               ";

/// Print the embedded metadata for a single image file.
fn print_metadata(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)?;
    let kind = image::guess_format(&bytes).ok().and_then(ImageKind::from_format);

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "─".repeat(72));

    let Some(kind) = kind else {
        println!("  {DIM}(unrecognized image format){RESET}");
        return Ok(());
    };

    if kind == ImageKind::Png {
        let fields = metadata::png_text_fields(&bytes).unwrap_or_default();
        if fields.is_empty() {
            println!("  {DIM}(no text chunks){RESET}");
        }
        for (keyword, value) in &fields {
            print_row(keyword, value);
        }
        return Ok(());
    }

    let meta = metadata::extract_metadata(kind, &bytes).unwrap_or_else(|err| {
        log::debug!("{}: {err}", path.display());
        EmbeddedMetadata::default()
    });
    match (meta.key, meta.value) {
        (Some(key), Some(value)) => print_row(key.as_str(), &value),
        _ => println!("  {DIM}(no EXIF comment found){RESET}"),
    }
    Ok(())
}

/// Print a single row in the metadata display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<12}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
