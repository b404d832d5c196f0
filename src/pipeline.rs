use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::metadata::{
    EmbeddedMetadata, KEYWORD_COMMENT, WriteError, extract_metadata, write_png_with_text,
};

/// Sidecar file extension.
const SIDECAR_EXTENSION: &str = "txt";

/// The container format of an image file.
///
/// Detection from a path looks only at the extension (used when pairing
/// files); [`ImageKind::from_format`] maps the codec's sniffed format (used
/// when extracting metadata, so a mislabeled file is read by what it
/// actually is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// PNG — metadata in `tEXt`/`iTXt` chunks
    Png,
    /// JPEG — metadata in the EXIF UserComment
    Jpeg,
    /// WebP — metadata in the EXIF UserComment
    WebP,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Map the codec's detected container format.
    pub fn from_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageKind::Png => "PNG",
            ImageKind::Jpeg => "JPEG",
            ImageKind::WebP => "WEBP",
        })
    }
}

/// An image file and its same-base-name `.txt` sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePair {
    pub image: PathBuf,
    pub sidecar: PathBuf,
}

/// Why a pair was skipped without writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The image already carries a `Comment` field from an earlier run.
    AlreadyAnnotated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyAnnotated => f.write_str("already annotated"),
        }
    }
}

/// The result of merging one image/sidecar pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The merged PNG was written to this path.
    Processed(PathBuf),
    /// Nothing was written.
    Skipped(SkipReason),
    /// The pair failed; the run continues with the next pair.
    Failed(String),
}

/// Typed failure of a single merge. Converted to [`MergeOutcome::Failed`]
/// (and a log line) at the per-pair boundary — it never propagates out of a
/// batch run.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("cannot decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("cannot read sidecar text: {0}")]
    SidecarRead(#[source] std::io::Error),
    #[error("cannot write output: {0}")]
    Write(#[source] WriteError),
    #[error("cannot remove {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate counts for a folder run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.errors
    }
}

/// Collect image/sidecar pairs from a flat directory.
///
/// Only files directly in `dir` are considered (no recursion). An image
/// qualifies when its extension is one of png/jpg/jpeg/webp
/// (case-insensitive) and a `.txt` file with the same base name sits next
/// to it. Pairs come back sorted by image path so runs are deterministic.
pub fn collect_pairs(dir: &Path) -> Vec<MergePair> {
    let mut pairs = Vec::new();

    if !dir.is_dir() {
        log::warn!("Not a directory: {}", dir.display());
        return pairs;
    }

    for entry in WalkDir::new(dir)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || ImageKind::from_path(path).is_none() {
            continue;
        }
        let sidecar = path.with_extension(SIDECAR_EXTENSION);
        if sidecar.is_file() {
            pairs.push(MergePair {
                image: path.to_path_buf(),
                sidecar,
            });
        }
    }

    pairs.sort_by(|a, b| a.image.cmp(&b.image));
    pairs
}

/// Merge one image/sidecar pair according to `config`.
///
/// This is the per-pair error boundary: any failure is logged and reported
/// as [`MergeOutcome::Failed`] so a batch run continues with the next pair.
pub fn merge_pair(pair: &MergePair, config: &Config) -> MergeOutcome {
    match try_merge(pair, config) {
        Ok(outcome) => outcome,
        Err(err) => {
            log::error!("{}: {err}", display_name(&pair.image));
            MergeOutcome::Failed(err.to_string())
        }
    }
}

/// The merge decision procedure: extract, guard, compose, write, clean up.
fn try_merge(pair: &MergePair, config: &Config) -> Result<MergeOutcome, MergeError> {
    let dry_run = config.output.dry_run;

    let bytes = fs::read(&pair.image)
        .map_err(|e| MergeError::Decode(image::ImageError::IoError(e)))?;
    let reader = image::ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| MergeError::Decode(image::ImageError::IoError(e)))?;

    // Extraction dispatches on the sniffed container format, not the file
    // extension. An unparseable metadata block downgrades to "no metadata";
    // a file the codec cannot identify falls through to the decode error
    // below.
    let kind = reader.format().and_then(ImageKind::from_format);
    let meta = match kind {
        Some(kind) => match extract_metadata(kind, &bytes) {
            Ok(meta) => meta,
            Err(err) => {
                log::debug!(
                    "{}: {err}; treating as unannotated",
                    display_name(&pair.image)
                );
                EmbeddedMetadata::default()
            }
        },
        None => EmbeddedMetadata::default(),
    };

    if meta.has_comment {
        log::warn!(
            "{}: already annotated, skipping injection",
            display_name(&pair.image)
        );
        if config.merge.delete_sidecar {
            // The sidecar's content is already in the image; consume it.
            remove_file(&pair.sidecar, dry_run)?;
        }
        return Ok(MergeOutcome::Skipped(SkipReason::AlreadyAnnotated));
    }

    let caption = fs::read_to_string(&pair.sidecar).map_err(MergeError::SidecarRead)?;
    let caption = caption.trim();

    let image = reader.decode().map_err(MergeError::Decode)?;

    let mut fields: Vec<(String, String)> = Vec::new();
    if let (Some(key), Some(value)) = (meta.key, meta.value.as_deref()) {
        if !value.is_empty() {
            fields.push((key.as_str().to_string(), value.to_string()));
            log::debug!("  preserving existing {key} metadata");
        }
    }
    if !caption.is_empty() {
        fields.push((KEYWORD_COMMENT.to_string(), caption.to_string()));
        log::debug!("  adding sidecar text as {KEYWORD_COMMENT}");
    }

    let output_path = output_path_for(&pair.image, config);
    if dry_run {
        log::info!("  dry run: would write {}", output_path.display());
    } else {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                MergeError::Write(WriteError::Io {
                    path: parent.to_path_buf(),
                    source,
                })
            })?;
        }
        write_png_with_text(&image, &fields, &output_path).map_err(MergeError::Write)?;
    }

    // Inputs go away only after the output exists, so an interrupted run
    // never loses data.
    if config.merge.delete_sidecar {
        remove_file(&pair.sidecar, dry_run)?;
    }
    if config.merge.replace_original && pair.image != output_path {
        remove_file(&pair.image, dry_run)?;
    }

    Ok(MergeOutcome::Processed(output_path))
}

/// Run the merge over every pair in a flat directory, logging per-pair
/// progress and a final summary.
pub fn run_folder(dir: &Path, config: &Config) -> RunSummary {
    let pairs = collect_pairs(dir);
    let total = pairs.len();
    let mut summary = RunSummary::default();

    for (i, pair) in pairs.iter().enumerate() {
        log::info!(
            "[{}/{}] {} + {}",
            i + 1,
            total,
            display_name(&pair.image),
            display_name(&pair.sidecar)
        );
        match merge_pair(pair, config) {
            MergeOutcome::Processed(out) => {
                summary.processed += 1;
                log::info!("  merged into {}", out.display());
            }
            MergeOutcome::Skipped(_) => summary.skipped += 1,
            MergeOutcome::Failed(_) => summary.errors += 1,
        }
    }

    log::info!(
        "Done: {} merged, {} skipped, {} failed out of {total}",
        summary.processed,
        summary.skipped,
        summary.errors
    );
    summary
}

/// Output location: same base name with a `.png` extension, either in place
/// (replace mode) or under the configured subfolder.
fn output_path_for(image: &Path, config: &Config) -> PathBuf {
    let renamed = image.with_extension("png");
    if config.merge.replace_original {
        return renamed;
    }
    let parent = image.parent().unwrap_or_else(|| Path::new("."));
    let file_name = renamed
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    parent.join(&config.merge.output_folder).join(file_name)
}

fn remove_file(path: &Path, dry_run: bool) -> Result<(), MergeError> {
    if dry_run {
        log::info!("  dry run: would remove {}", path.display());
        return Ok(());
    }
    fs::remove_file(path).map_err(|source| MergeError::Cleanup {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("  removed {}", display_name(path));
    Ok(())
}

fn display_name(path: &Path) -> Cow<'_, str> {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::png_text_fields;
    use image::{DynamicImage, RgbImage};
    use img_parts::{Bytes, ImageEXIF};
    use std::io::Cursor as IoCursor;
    use tempfile::TempDir;

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([200, 100, 50])))
    }

    fn write_png(path: &Path, fields: &[(&str, &str)]) {
        let fields: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        write_png_with_text(&test_image(), &fields, path).unwrap();
    }

    /// JPEG whose EXIF UserComment is `ASCII\0\0\0` + `text`.
    fn write_jpeg_with_comment(path: &Path, text: &str) {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x8769u16.to_le_bytes());
        tiff.extend_from_slice(&4u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&26u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        let payload = [b"ASCII\0\0\0".as_slice(), text.as_bytes()].concat();
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x9286u16.to_le_bytes());
        tiff.extend_from_slice(&7u16.to_le_bytes());
        tiff.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        tiff.extend_from_slice(&44u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        tiff.extend_from_slice(&payload);

        let mut encoded = Vec::new();
        test_image()
            .write_to(&mut IoCursor::new(&mut encoded), image::ImageFormat::Jpeg)
            .unwrap();
        let mut jpeg = img_parts::jpeg::Jpeg::from_bytes(Bytes::from(encoded)).unwrap();
        jpeg.set_exif(Some(Bytes::from(tiff)));
        std::fs::write(path, jpeg.encoder().bytes()).unwrap();
    }

    fn fields_of(path: &Path) -> Vec<(String, String)> {
        png_text_fields(&std::fs::read(path).unwrap()).unwrap()
    }

    fn config(replace: bool, delete: bool) -> Config {
        let mut config = Config::default();
        config.merge.replace_original = replace;
        config.merge.delete_sidecar = delete;
        config
    }

    // ── ImageKind ────────────────────────────────────────────────────

    #[test]
    fn image_kind_from_path() {
        assert_eq!(ImageKind::from_path(Path::new("a.png")), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_path(Path::new("a.PNG")), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_path(Path::new("a.jpg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("a.JPEG")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("a.webp")), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_path(Path::new("a.gif")), None);
        assert_eq!(ImageKind::from_path(Path::new("noext")), None);
    }

    // ── collect_pairs ────────────────────────────────────────────────

    #[test]
    fn collect_pairs_requires_sidecar() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("paired.png"), &[]);
        std::fs::write(dir.path().join("paired.txt"), "caption").unwrap();
        write_png(&dir.path().join("lonely.png"), &[]);

        let pairs = collect_pairs(dir.path());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].image, dir.path().join("paired.png"));
        assert_eq!(pairs[0].sidecar, dir.path().join("paired.txt"));
    }

    #[test]
    fn collect_pairs_is_flat_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        write_png(&sub.join("deep.png"), &[]);
        std::fs::write(sub.join("deep.txt"), "x").unwrap();

        write_png(&dir.path().join("b.png"), &[]);
        std::fs::write(dir.path().join("b.txt"), "x").unwrap();
        write_png(&dir.path().join("a.png"), &[]);
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();

        let pairs = collect_pairs(dir.path());
        let names: Vec<_> = pairs
            .iter()
            .map(|p| p.image.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.png", "b.png"]);
    }

    #[test]
    fn collect_pairs_ignores_unsupported_extensions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("doc.txt"), "x").unwrap();

        assert!(collect_pairs(dir.path()).is_empty());
    }

    #[test]
    fn collect_pairs_nonexistent_dir() {
        assert!(collect_pairs(Path::new("/nonexistent/folder")).is_empty());
    }

    // ── merge: comment injection & preservation ──────────────────────

    #[test]
    fn comment_injected_from_sidecar() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[]);
        std::fs::write(dir.path().join("img.txt"), "  a cat on a mat \n").unwrap();

        let pairs = collect_pairs(dir.path());
        let outcome = merge_pair(&pairs[0], &config(false, false));

        let out = dir.path().join("processed_images").join("img.png");
        assert_eq!(outcome, MergeOutcome::Processed(out.clone()));
        assert_eq!(
            fields_of(&out),
            vec![("Comment".to_string(), "a cat on a mat".to_string())]
        );
    }

    #[test]
    fn existing_workflow_preserved_verbatim() {
        let workflow = r#"{"nodes":[{"id":7}],"links":[]}"#;
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[("workflow", workflow)]);
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let pairs = collect_pairs(dir.path());
        merge_pair(&pairs[0], &config(false, false));

        let out = dir.path().join("processed_images").join("img.png");
        assert_eq!(
            fields_of(&out),
            vec![
                ("workflow".to_string(), workflow.to_string()),
                ("Comment".to_string(), "caption".to_string()),
            ]
        );
    }

    #[test]
    fn existing_parameters_preserved_verbatim() {
        let params = "Steps: 20, Sampler: Euler a, CFG scale: 7";
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[("parameters", params)]);
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let pairs = collect_pairs(dir.path());
        merge_pair(&pairs[0], &config(false, false));

        let out = dir.path().join("processed_images").join("img.png");
        assert_eq!(
            fields_of(&out),
            vec![
                ("parameters".to_string(), params.to_string()),
                ("Comment".to_string(), "caption".to_string()),
            ]
        );
    }

    #[test]
    fn empty_sidecar_adds_no_comment() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[("workflow", "w")]);
        std::fs::write(dir.path().join("img.txt"), "   \n\t").unwrap();

        let pairs = collect_pairs(dir.path());
        let outcome = merge_pair(&pairs[0], &config(false, false));

        assert!(matches!(outcome, MergeOutcome::Processed(_)));
        let out = dir.path().join("processed_images").join("img.png");
        assert_eq!(fields_of(&out), vec![("workflow".to_string(), "w".to_string())]);
    }

    #[test]
    fn jpeg_user_comment_becomes_parameters_field() {
        let dir = TempDir::new().unwrap();
        write_jpeg_with_comment(&dir.path().join("img.jpg"), "seed: 42");
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let pairs = collect_pairs(dir.path());
        let outcome = merge_pair(&pairs[0], &config(false, false));

        assert!(matches!(outcome, MergeOutcome::Processed(_)));
        let out = dir.path().join("processed_images").join("img.png");
        assert_eq!(
            fields_of(&out),
            vec![
                ("parameters".to_string(), "seed: 42".to_string()),
                ("Comment".to_string(), "caption".to_string()),
            ]
        );
    }

    // ── idempotence guard ────────────────────────────────────────────

    #[test]
    fn second_run_skips_and_leaves_output_unchanged() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[("workflow", "w")]);
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        // Replace in place so the second run re-pairs the same paths.
        let cfg = config(true, false);
        let pairs = collect_pairs(dir.path());
        let first = merge_pair(&pairs[0], &cfg);
        assert_eq!(first, MergeOutcome::Processed(dir.path().join("img.png")));
        let after_first = std::fs::read(dir.path().join("img.png")).unwrap();

        let pairs = collect_pairs(dir.path());
        let second = merge_pair(&pairs[0], &cfg);
        assert_eq!(second, MergeOutcome::Skipped(SkipReason::AlreadyAnnotated));
        let after_second = std::fs::read(dir.path().join("img.png")).unwrap();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn skip_still_consumes_sidecar_when_deleting() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[("Comment", "done before")]);
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let pairs = collect_pairs(dir.path());
        let outcome = merge_pair(&pairs[0], &config(false, true));

        assert_eq!(outcome, MergeOutcome::Skipped(SkipReason::AlreadyAnnotated));
        assert!(!dir.path().join("img.txt").exists());
        // The image itself is untouched.
        assert!(dir.path().join("img.png").exists());
    }

    // ── disposition matrix ───────────────────────────────────────────

    #[test]
    fn disposition_keep_both() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[]);
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let pairs = collect_pairs(dir.path());
        merge_pair(&pairs[0], &config(false, false));

        assert!(dir.path().join("img.png").exists());
        assert!(dir.path().join("img.txt").exists());
        assert!(dir.path().join("processed_images").join("img.png").exists());
    }

    #[test]
    fn disposition_replace_keeps_sidecar() {
        let dir = TempDir::new().unwrap();
        write_jpeg_with_comment(&dir.path().join("img.jpg"), "seed: 1");
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let pairs = collect_pairs(dir.path());
        let outcome = merge_pair(&pairs[0], &config(true, false));

        assert_eq!(outcome, MergeOutcome::Processed(dir.path().join("img.png")));
        assert!(!dir.path().join("img.jpg").exists(), "original removed");
        assert!(dir.path().join("img.txt").exists(), "sidecar kept");
        assert!(dir.path().join("img.png").exists());
    }

    #[test]
    fn disposition_replace_and_delete() {
        let dir = TempDir::new().unwrap();
        write_jpeg_with_comment(&dir.path().join("img.jpg"), "seed: 1");
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let pairs = collect_pairs(dir.path());
        merge_pair(&pairs[0], &config(true, true));

        assert!(!dir.path().join("img.jpg").exists());
        assert!(!dir.path().join("img.txt").exists());
        assert!(dir.path().join("img.png").exists());
    }

    #[test]
    fn replace_of_png_source_keeps_single_file() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[]);
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let pairs = collect_pairs(dir.path());
        let outcome = merge_pair(&pairs[0], &config(true, false));

        // Output path equals the source path; nothing else appears.
        assert_eq!(outcome, MergeOutcome::Processed(dir.path().join("img.png")));
        assert!(dir.path().join("img.png").exists());
    }

    #[test]
    fn custom_output_folder_is_used() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[]);
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let mut cfg = config(false, false);
        cfg.merge.output_folder = "merged".to_string();
        let pairs = collect_pairs(dir.path());
        merge_pair(&pairs[0], &cfg);

        assert!(dir.path().join("merged").join("img.png").exists());
    }

    // ── dry run ──────────────────────────────────────────────────────

    #[test]
    fn dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        write_jpeg_with_comment(&dir.path().join("img.jpg"), "seed: 1");
        std::fs::write(dir.path().join("img.txt"), "caption").unwrap();

        let mut cfg = config(true, true);
        cfg.output.dry_run = true;
        let pairs = collect_pairs(dir.path());
        let outcome = merge_pair(&pairs[0], &cfg);

        assert_eq!(outcome, MergeOutcome::Processed(dir.path().join("img.png")));
        assert!(dir.path().join("img.jpg").exists());
        assert!(dir.path().join("img.txt").exists());
        assert!(!dir.path().join("img.png").exists());
    }

    // ── failure isolation ────────────────────────────────────────────

    #[test]
    fn corrupt_image_fails_without_stopping_the_run() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("a.png"), &[]);
        std::fs::write(dir.path().join("a.txt"), "one").unwrap();
        std::fs::write(dir.path().join("b.png"), b"this is not a png").unwrap();
        std::fs::write(dir.path().join("b.txt"), "two").unwrap();
        write_png(&dir.path().join("c.png"), &[]);
        std::fs::write(dir.path().join("c.txt"), "three").unwrap();

        let summary = run_folder(dir.path(), &config(false, false));
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.skipped, 0);
        assert!(dir.path().join("processed_images").join("a.png").exists());
        assert!(dir.path().join("processed_images").join("c.png").exists());
    }

    #[test]
    fn unreadable_sidecar_is_a_failure() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("img.png"), &[]);
        // Invalid UTF-8 in the sidecar.
        std::fs::write(dir.path().join("img.txt"), [0xFF, 0xFE, 0x00, 0x41]).unwrap();

        let pairs = collect_pairs(dir.path());
        let outcome = merge_pair(&pairs[0], &config(false, false));
        assert!(matches!(outcome, MergeOutcome::Failed(_)));
    }
}
