use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the output subfolder used when originals are kept.
pub const DEFAULT_OUTPUT_FOLDER: &str = "processed_images";

/// Top-level configuration for the sidecar-merge library.
///
/// Controls what happens to the inputs after a successful merge and how the
/// run behaves (dry run, pause on exit).
///
/// # Loading
///
/// ```rust,no_run
/// use sidecar_merge::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.merge.replace_original = true;
/// config.merge.delete_sidecar = true;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Post-merge disposition of the input files and output placement.
    pub merge: MergeConfig,
    /// Run behavior (dry run, pause before exit).
    pub output: OutputConfig,
}

/// Disposition of the image/sidecar inputs and placement of the merged PNG.
///
/// `replace_original` and `delete_sidecar` are independent flags, not
/// mutually exclusive states; `output_folder` only matters when
/// `replace_original` is `false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Write the merged PNG next to the source and remove the source image
    /// (when its path differs from the output).
    pub replace_original: bool,
    /// Remove the sidecar `.txt` once its content has been merged.
    pub delete_sidecar: bool,
    /// Subfolder (under the image's directory) for merged output when
    /// originals are kept. Created on demand.
    pub output_folder: String,
}

/// Run behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// If `true`, preview what would be written without modifying any files.
    pub dry_run: bool,
    /// If `true`, wait for Enter before the process exits.
    pub pause: bool,
}

/// The three fixed disposition presets, matching the tool's original run
/// scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Mode {
    /// Keep both inputs; write the merged PNG into the output subfolder.
    Copy,
    /// Overwrite the original image in place; keep the sidecar.
    Replace,
    /// Overwrite the original image and delete the sidecar.
    ReplaceDelete,
}

impl Mode {
    /// Apply the preset's flag combination to a [`MergeConfig`].
    pub fn apply(self, merge: &mut MergeConfig) {
        let (replace, delete) = match self {
            Mode::Copy => (false, false),
            Mode::Replace => (true, false),
            Mode::ReplaceDelete => (true, true),
        };
        merge.replace_original = replace;
        merge.delete_sidecar = delete;
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merge: MergeConfig {
                replace_original: false,
                delete_sidecar: false,
                output_folder: DEFAULT_OUTPUT_FOLDER.to_string(),
            },
            output: OutputConfig {
                dry_run: false,
                pause: false,
            },
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_keeps_both_inputs() {
        let config = Config::default();
        assert!(!config.merge.replace_original);
        assert!(!config.merge.delete_sidecar);
        assert_eq!(config.merge.output_folder, DEFAULT_OUTPUT_FOLDER);
        assert!(!config.output.dry_run);
        assert!(!config.output.pause);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.merge.replace_original = true;
        config.merge.output_folder = "merged".to_string();
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert!(loaded.merge.replace_original);
        assert!(!loaded.merge.delete_sidecar);
        assert_eq!(loaded.merge.output_folder, "merged");
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.merge.output_folder, DEFAULT_OUTPUT_FOLDER);
    }

    #[test]
    fn mode_presets_set_both_flags() {
        let mut merge = Config::default().merge;

        Mode::ReplaceDelete.apply(&mut merge);
        assert!(merge.replace_original);
        assert!(merge.delete_sidecar);

        Mode::Replace.apply(&mut merge);
        assert!(merge.replace_original);
        assert!(!merge.delete_sidecar);

        Mode::Copy.apply(&mut merge);
        assert!(!merge.replace_original);
        assert!(!merge.delete_sidecar);
    }
}
