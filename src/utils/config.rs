//! Named connection profiles persisted as a single JSON file.
//!
//! The on-disk shape is a map of profile name to an object with the
//! upper-case keys `SQL_SERVER`, `USERNAME`, `PASSWORD` and `DRIVER`, so
//! profile files written by earlier tooling load unchanged. The password is
//! stored in clear text; that is the documented format of the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::connection::{ConnectionInfo, DEFAULT_DRIVER};
use crate::error::{Error, Result};

const PROFILE_FILE: &str = "profiles.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionProfile {
    #[serde(rename = "SQL_SERVER")]
    pub server: String,
    #[serde(rename = "USERNAME")]
    pub username: String,
    #[serde(rename = "PASSWORD")]
    pub password: String,
    #[serde(rename = "DRIVER", default = "default_driver")]
    pub driver: String,
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

impl ConnectionProfile {
    pub fn from_info(info: &ConnectionInfo) -> Self {
        Self {
            server: info.server.clone(),
            username: info.username.clone(),
            password: info.password.clone(),
            driver: info.driver.clone(),
        }
    }

    /// Profiles never carry the Windows-auth flag; a loaded profile always
    /// describes a SQL-authenticated login.
    pub fn to_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(&self.server, &self.username, &self.password, &self.driver, false)
    }
}

/// All saved profiles plus the file they round-trip through. Ordering is
/// kept stable so the file diffs cleanly between saves.
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, ConnectionProfile>,
}

impl ProfileStore {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("fleet_runner");
            path.push(PROFILE_FILE);
            path
        })
    }

    pub fn open_default() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| Error::Persistence("no config directory available".to_string()))?;
        Self::open(path)
    }

    /// Load the store at `path`. A missing file yields an empty store; an
    /// unreadable or malformed file does too, after a warning, so a damaged
    /// profile file never blocks a run.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let profiles = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(profiles) => profiles,
                    Err(err) => {
                        tracing::warn!(path = %path.display(), %err, "malformed profile file, starting empty");
                        BTreeMap::new()
                    }
                },
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "unreadable profile file, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, profiles })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.get(name)
    }

    pub fn insert(&mut self, name: &str, profile: ConnectionProfile) {
        self.profiles.insert(name.to_string(), profile);
    }

    /// Returns whether the profile existed. Removing an unknown name is a
    /// warning, not an error.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.profiles.remove(name).is_some() {
            true
        } else {
            tracing::warn!(profile = name, "profile not found");
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Write the whole map back. The content goes to a sibling temp file
    /// first and is renamed into place, so a crash mid-write never leaves a
    /// truncated profile file behind.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| Error::Persistence(format!("creating {}: {err}", parent.display())))?;
        }
        let content = serde_json::to_string_pretty(&self.profiles)
            .map_err(|err| Error::Persistence(err.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .map_err(|err| Error::Persistence(format!("writing {}: {err}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|err| Error::Persistence(format!("replacing {}: {err}", self.path.display())))?;
        Ok(())
    }
}
