//! Durable list of tracked stock codes.
//!
//! Only the codes survive a restart, never cached prices. The list is a JSON
//! array of strings in a single per-user file. Loading is forgiving (missing or
//! corrupt file means "nothing tracked"), saving is best-effort: a failed write
//! is logged and tracking carries on.
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracker_common::{Result, StockCode, TrackerError};

/// File name of the persisted list inside the user's home directory.
pub const FILE_NAME: &str = ".stock_tracker_config.json";

/// `~/.stock_tracker_config.json`, if a home directory is known.
pub fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(FILE_NAME))
}

/// Loads and saves the tracked code list.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    path: PathBuf,
}

impl PersistenceGateway {
    /// Gateway backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved codes in order, or an empty list if nothing usable is stored.
    pub fn load(&self) -> Vec<StockCode> {
        match self.try_load() {
            Ok(codes) => codes,
            Err(e) => {
                error!("{}", e);
                Vec::new()
            }
        }
    }

    /// Like [`load`](Self::load) but reports unreadable or corrupt files.
    ///
    /// A missing file is a cold start and yields `Ok` with an empty list.
    /// Entries that are not valid codes, and repeated codes, are skipped.
    pub fn try_load(&self) -> Result<Vec<StockCode>> {
        if !self.path.exists() {
            debug!("No saved stock list at {}", self.path.display());
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&self.path).map_err(|e| {
            TrackerError::PersistenceLoadError(format!("{}: {}", self.path.display(), e))
        })?;
        let raw: Vec<String> = serde_json::from_str(&text).map_err(|e| {
            TrackerError::PersistenceLoadError(format!("{}: {}", self.path.display(), e))
        })?;

        let mut seen = HashSet::new();
        let mut codes = Vec::with_capacity(raw.len());
        for entry in raw {
            match StockCode::parse(&entry) {
                Ok(code) => {
                    if seen.insert(code.clone()) {
                        codes.push(code);
                    }
                }
                Err(e) => warn!("Skipping saved entry: {}", e),
            }
        }
        info!("Loaded {} saved stock codes", codes.len());
        Ok(codes)
    }

    /// Persist `codes`; failures are logged, never returned.
    pub fn save(&self, codes: &[StockCode]) {
        if let Err(e) = self.try_save(codes) {
            error!("{}", e);
        }
    }

    /// Like [`save`](Self::save) but returns the failure.
    ///
    /// Writes a sibling temp file and renames it over the target.
    pub fn try_save(&self, codes: &[StockCode]) -> Result<()> {
        let json = serde_json::to_vec(codes).map_err(|e| self.save_error(e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.save_error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.save_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.save_error(e))?;
        debug!("Saved {} stock codes to {}", codes.len(), self.path.display());
        Ok(())
    }

    fn save_error(&self, cause: impl std::fmt::Display) -> TrackerError {
        TrackerError::PersistenceSaveError(format!("{}: {}", self.path.display(), cause))
    }
}
