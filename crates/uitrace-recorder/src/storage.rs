//! Export storage - one JSON array per file

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const EXPORT_SUFFIX: &str = ".json";

/// Where exports go. Hosts with their own sandboxed storage implement this.
pub trait ExportTarget: Send + Sync {
    fn resolve_writable_directory(&self) -> Result<PathBuf>;
    fn write_file(&self, path: &Path, content: &str) -> Result<()>;
}

pub struct ExportStorage {
    dir: PathBuf,
}

impl ExportStorage {
    /// Platform data directory, falling back to `$HOME/.uitrace`
    pub fn new() -> Result<Self> {
        let dir = match dirs::data_local_dir() {
            Some(d) => d.join("uitrace"),
            None => {
                let home = std::env::var("HOME").context("HOME not set")?;
                PathBuf::from(home).join(".uitrace")
            }
        };
        Self::with_dir(dir)
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Read an export back as text. `name` is resolved the way
    /// `export_to_file` names files, so `session` finds `session.json`.
    pub fn load(&self, name: &str) -> Result<String> {
        let path = self.export_path(name)?;
        fs::read_to_string(&path).with_context(|| format!("reading export {}", path.display()))
    }

    /// Export file names in the directory, sorted. Subdirectories and
    /// non-JSON files are skipped.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("listing exports in {}", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(EXPORT_SUFFIX) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.export_path(name)?;
        fs::remove_file(&path).with_context(|| format!("deleting export {}", path.display()))
    }

    fn export_path(&self, name: &str) -> Result<PathBuf> {
        if name.strip_suffix(EXPORT_SUFFIX).unwrap_or(name).is_empty() {
            bail!("export name is empty");
        }
        Ok(self.dir.join(export_file_name(name)))
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl ExportTarget for ExportStorage {
    fn resolve_writable_directory(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("export directory {} is not writable", self.dir.display()))?;
        Ok(self.dir.clone())
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).with_context(|| format!("writing export {}", path.display()))
    }
}

/// `name` sanitized with a `.json` suffix; empty names get a timestamped default
pub fn export_file_name(name: &str) -> String {
    let stem = name.strip_suffix(EXPORT_SUFFIX).unwrap_or(name);
    if stem.is_empty() {
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
        return format!("interactions_{}{}", ts, EXPORT_SUFFIX);
    }
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}{}", stem, EXPORT_SUFFIX)
}
