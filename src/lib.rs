//! # sidecar-merge
//!
//! Merge per-image `.txt` sidecar files (captions/prompts) into the image's
//! embedded metadata. Existing AI-generation metadata — a ComfyUI `workflow`
//! or an A1111 `parameters` block — is preserved verbatim, and the sidecar
//! text is added as a separate `Comment` text field. Output is always a PNG,
//! regardless of the input container.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is [`pipeline::run_folder`], which
//! discovers image/sidecar pairs in a flat directory and merges each one:
//!
//! ```rust,no_run
//! use sidecar_merge::config::Config;
//! use sidecar_merge::pipeline::run_folder;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Load config from file (disposition flags, output folder, etc.)
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     let summary = run_folder(Path::new("./images"), &config);
//!     println!(
//!         "{} merged, {} skipped, {} failed",
//!         summary.processed, summary.skipped, summary.errors
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! For per-pair control, collect the pairs yourself and call the merge
//! engine directly:
//!
//! ```rust,no_run
//! use sidecar_merge::config::Config;
//! use sidecar_merge::pipeline::{collect_pairs, merge_pair, MergeOutcome};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = Config::default();
//!     config.merge.replace_original = true;
//!
//!     for pair in collect_pairs(Path::new("./images")) {
//!         match merge_pair(&pair, &config) {
//!             MergeOutcome::Processed(out) => println!("wrote {}", out.display()),
//!             MergeOutcome::Skipped(reason) => println!("skipped: {reason}"),
//!             MergeOutcome::Failed(err) => eprintln!("failed: {err}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Input | Metadata read | Output |
//! |-------|---------------|--------|
//! | PNG (`.png`) | `tEXt`/`iTXt` chunks (`workflow`, `parameters`, `Comment`) | PNG |
//! | JPEG (`.jpg`, `.jpeg`) | EXIF UserComment (tag 37510) | PNG |
//! | WebP (`.webp`) | EXIF UserComment (tag 37510) | PNG |
//!
//! ## Modules
//!
//! - [`config`] — Configuration types, JSON loading/saving, and the fixed
//!   disposition presets
//! - [`metadata`] — Embedded-metadata extraction and PNG text-chunk writing
//! - [`pipeline`] — Pair discovery, the merge engine, and the folder run loop

pub mod config;
pub mod metadata;
pub mod pipeline;
