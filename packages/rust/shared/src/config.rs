//! Application configuration for docchunk.
//!
//! User config lives at `~/.docchunk/docchunk.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocChunkError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docchunk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docchunk";

// ---------------------------------------------------------------------------
// Config structs (matching docchunk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Noise classification rules.
    #[serde(default)]
    pub noise: NoiseConfig,

    /// Chunk assembly settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

impl AppConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.noise.validate()
    }
}

/// `[noise]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Section titles (case-insensitive, exact) that mark a table of contents.
    #[serde(default = "default_toc_markers")]
    pub toc_markers: Vec<String>,

    /// Action-instruction phrases that mark short UI text.
    #[serde(default = "default_ui_markers")]
    pub ui_markers: Vec<String>,

    /// Phrases that mark a copyright line. The `©` glyph always matches.
    #[serde(default = "default_copyright_markers")]
    pub copyright_markers: Vec<String>,

    /// Blocks shorter than this may be classified as dates.
    #[serde(default = "default_date_max_chars")]
    pub date_max_chars: usize,

    /// Blocks shorter than this may be classified as UI text.
    #[serde(default = "default_ui_max_chars")]
    pub ui_max_chars: usize,

    /// Enumeration lines shorter than this may be classified as TOC lines.
    #[serde(default = "default_toc_line_max_chars")]
    pub toc_line_max_chars: usize,

    /// Distinct pages a text must appear on to count as boilerplate.
    #[serde(default = "default_boilerplate_min_pages")]
    pub boilerplate_min_pages: usize,

    /// Texts shorter than this are never counted for boilerplate.
    #[serde(default = "default_boilerplate_min_chars")]
    pub boilerplate_min_chars: usize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            toc_markers: default_toc_markers(),
            ui_markers: default_ui_markers(),
            copyright_markers: default_copyright_markers(),
            date_max_chars: default_date_max_chars(),
            ui_max_chars: default_ui_max_chars(),
            toc_line_max_chars: default_toc_line_max_chars(),
            boilerplate_min_pages: default_boilerplate_min_pages(),
            boilerplate_min_chars: default_boilerplate_min_chars(),
        }
    }
}

impl NoiseConfig {
    fn validate(&self) -> Result<()> {
        if self.boilerplate_min_pages == 0 {
            return Err(DocChunkError::config(
                "noise.boilerplate_min_pages must be at least 1",
            ));
        }
        for (field, markers) in [
            ("toc_markers", &self.toc_markers),
            ("ui_markers", &self.ui_markers),
            ("copyright_markers", &self.copyright_markers),
        ] {
            if markers.iter().any(|m| m.trim().is_empty()) {
                return Err(DocChunkError::config(format!(
                    "noise.{field} contains an empty marker"
                )));
            }
        }
        Ok(())
    }
}

fn default_toc_markers() -> Vec<String> {
    ["içindekiler", "contents", "table of contents", "index"]
        .map(String::from)
        .to_vec()
}
fn default_ui_markers() -> Vec<String> {
    [
        // Turkish
        "tıklayın",
        "tıklanır",
        "tıklanacak",
        "butona",
        "butonuna",
        "menüden",
        "seçin",
        "girin",
        "ekran açılır",
        "açılır",
        "penceresi açılır",
        "görüntülenir",
        "görünür",
        "sayfa açılır",
        // English
        "click",
        "button",
        "select",
        "choose",
        "enter",
        "screen opens",
        "opens",
        "displayed",
        "shown",
    ]
    .map(String::from)
    .to_vec()
}
fn default_copyright_markers() -> Vec<String> {
    ["copyright", "all rights reserved", "tüm hakları", "her hakkı"]
        .map(String::from)
        .to_vec()
}
fn default_date_max_chars() -> usize {
    80
}
fn default_ui_max_chars() -> usize {
    120
}
fn default_toc_line_max_chars() -> usize {
    120
}
fn default_boilerplate_min_pages() -> usize {
    3
}
fn default_boilerplate_min_chars() -> usize {
    1
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Separator placed between content block texts inside a chunk.
    #[serde(default = "default_content_separator")]
    pub content_separator: String,

    /// Treat very short or single-word titles (author names, labels) as
    /// non-opening titles.
    #[serde(default)]
    pub skip_name_like_titles: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            content_separator: default_content_separator(),
            skip_name_like_titles: false,
        }
    }
}

fn default_content_separator() -> String {
    "\n\n".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docchunk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocChunkError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docchunk/docchunk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocChunkError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        DocChunkError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_at(&config_file_path()?)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| DocChunkError::io(dir, e))?;
    }

    let path = path.to_path_buf();
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocChunkError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocChunkError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
