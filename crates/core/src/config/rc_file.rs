//! `.dvswitchrc` loading
//!
//! The mixer's own configuration file is read from a fixed search path. Files
//! found later in the search order override keys from earlier ones.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// File name looked up in each search directory
pub const RC_FILE_NAME: &str = ".dvswitchrc";

/// Key holding the mixer's listen address
pub const MIXER_HOST: &str = "MIXER_HOST";

/// Key holding the mixer's listen port
pub const MIXER_PORT: &str = "MIXER_PORT";

const WILDCARD_HOST: &str = "0.0.0.0";
const LOOPBACK_HOST: &str = "127.0.0.1";

/// Merged key/value settings from every `.dvswitchrc` found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RcFile {
    values: HashMap<String, String>,
    sources: Vec<PathBuf>,
}

impl RcFile {
    /// Directories searched, in override order: home, current dir, `/etc`
    pub fn search_path() -> Vec<PathBuf> {
        let mut search = Vec::with_capacity(3);
        if let Some(home) = dirs::home_dir() {
            search.push(home);
        }
        search.push(PathBuf::from("."));
        search.push(PathBuf::from("/etc"));
        search
    }

    /// Load from the default search path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::search_path())
    }

    /// Load `.dvswitchrc` from each directory that has one
    pub fn load_from(search: &[PathBuf]) -> Result<Self> {
        let mut rc = RcFile::default();

        for dir in search {
            let path = dir.join(RC_FILE_NAME);
            if !path.is_file() {
                continue;
            }

            let text = std::fs::read_to_string(&path)?;
            let entries = parse(&text, &path)?;
            tracing::debug!("Read {} settings from {}", entries.len(), path.display());

            rc.values.extend(entries);
            rc.sources.push(path);
        }

        if rc.values.get(MIXER_HOST).map(String::as_str) == Some(WILDCARD_HOST) {
            rc.values.insert(MIXER_HOST.to_string(), LOOPBACK_HOST.to_string());
        }

        Ok(rc)
    }

    /// Look up a raw value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Mixer host, with the wildcard address already mapped to loopback
    pub fn mixer_host(&self) -> Option<&str> {
        self.get(MIXER_HOST)
    }

    /// Mixer port as written in the file
    pub fn mixer_port(&self) -> Option<&str> {
        self.get(MIXER_PORT)
    }

    /// Files that contributed settings, in load order
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

/// Parse `KEY=VALUE` lines
///
/// A `#` after the first column starts a trailing comment; a `#` in the
/// first column comments out the whole line.
pub fn parse(text: &str, origin: &Path) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = match raw.find('#') {
            Some(0) => continue,
            Some(pos) => &raw[..pos],
            None => raw,
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "{}:{}: expected KEY=VALUE, got '{}'",
                origin.display(),
                index + 1,
                line
            ))
        })?;

        entries.push((key.trim().to_string(), value.trim().to_string()));
    }

    Ok(entries)
}
