//! File-backed layout storage.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use horizon_grid_core::logging::targets;
use serde::{Deserialize, Serialize};

use super::{ColumnLayout, LayoutStore};
use crate::error::{GridError, Result};

/// Serialization format for layout files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutFormat {
    /// JSON (`.json`).
    #[default]
    Json,
    /// TOML (`.toml`).
    Toml,
}

impl LayoutFormat {
    /// File extension used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            LayoutFormat::Json => "json",
            LayoutFormat::Toml => "toml",
        }
    }
}

/// Turns a grid id into a safe file stem.
///
/// Anything other than ASCII letters, digits, `-` and `_` becomes `_`; an
/// empty result becomes `grid`.
///
/// ```
/// use horizon_grid::layout::sanitize_grid_id;
///
/// assert_eq!(sanitize_grid_id("../boards/q3 close"), "___boards_q3_close");
/// assert_eq!(sanitize_grid_id(""), "grid");
/// ```
pub fn sanitize_grid_id(grid_id: &str) -> String {
    let stem: String = grid_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "grid".to_string() } else { stem }
}

/// Stores one layout file per grid id in a directory.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a crash never leaves a half-written layout behind.
#[derive(Debug, Clone)]
pub struct FileLayoutStore {
    dir: PathBuf,
    format: LayoutFormat,
}

impl FileLayoutStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// save.
    pub fn new(dir: impl Into<PathBuf>, format: LayoutFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    /// Creates a store in the per-user configuration directory.
    ///
    /// Returns `None` if the platform reports no home directory.
    pub fn in_user_config(format: LayoutFormat) -> Option<Self> {
        Self::default_dir().map(|dir| Self::new(dir, format))
    }

    /// The per-user directory layouts are kept in by default.
    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "Horizon Analytic Studios", "Horizon Grid")
            .map(|dirs| dirs.config_dir().join("layouts"))
    }

    /// Directory holding the layout files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Format used for reading and writing.
    pub fn format(&self) -> LayoutFormat {
        self.format
    }

    /// Path of the file holding `grid_id`'s layout.
    pub fn path_for(&self, grid_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_grid_id(grid_id), self.format.extension()))
    }

    fn encode(&self, path: &Path, layout: &ColumnLayout) -> Result<String> {
        match self.format {
            LayoutFormat::Json => serde_json::to_string_pretty(layout)
                .map_err(|e| GridError::format(path, e.to_string())),
            LayoutFormat::Toml => {
                toml::to_string_pretty(layout).map_err(|e| GridError::format(path, e.to_string()))
            }
        }
    }

    fn decode(&self, path: &Path, content: &str) -> Result<ColumnLayout> {
        match self.format {
            LayoutFormat::Json => {
                serde_json::from_str(content).map_err(|e| GridError::format(path, e.to_string()))
            }
            LayoutFormat::Toml => {
                toml::from_str(content).map_err(|e| GridError::format(path, e.to_string()))
            }
        }
    }
}

impl LayoutStore for FileLayoutStore {
    fn load(&self, grid_id: &str) -> Result<Option<ColumnLayout>> {
        let path = self.path_for(grid_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GridError::io(path, e)),
        };
        let layout = self.decode(&path, &content)?;
        tracing::debug!(target: targets::LAYOUT, grid_id, path = %path.display(), "loaded layout");
        Ok(Some(layout))
    }

    fn save(&self, grid_id: &str, layout: &ColumnLayout) -> Result<()> {
        let path = self.path_for(grid_id);
        let content = self.encode(&path, layout)?;
        fs::create_dir_all(&self.dir).map_err(|e| GridError::io(&self.dir, e))?;
        write_atomic(&path, content.as_bytes())?;
        tracing::debug!(target: targets::LAYOUT, grid_id, path = %path.display(), "saved layout");
        Ok(())
    }

    fn remove(&self, grid_id: &str) -> Result<bool> {
        let path = self.path_for(grid_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GridError::io(path, e)),
        }
    }
}

/// Writes `bytes` to a sibling temp file, syncs it and renames it over
/// `target`. The temp file is removed if any step fails.
fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "layout".to_string());
    let temp_path = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let result = (|| -> io::Result<()> {
        let mut writer = BufWriter::new(fs::File::create(&temp_path)?);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(&temp_path, target)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        GridError::io(target, e)
    })
}
