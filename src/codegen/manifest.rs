use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ScaffoldError, ScaffoldResult};

const MANIFEST_VERSION: u32 = 1;

/// Record of the files `convert` generated into a destination directory,
/// used to refuse overwriting files that were edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub files: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub entity: String,
    pub table: String,
    pub sha256: String,
    pub generated_at: DateTime<Utc>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            files: BTreeMap::new(),
        }
    }
}

impl Manifest {
    pub fn path(dest: &Path) -> PathBuf {
        dest.join(".scaffold/entities.json")
    }

    pub fn load(dest: &Path) -> ScaffoldResult<Self> {
        let path = Self::path(dest);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path).map_err(|err| ScaffoldError::io(&path, err))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, dest: &Path) -> ScaffoldResult<()> {
        let path = Self::path(dest);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ScaffoldError::io(parent, err))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&path, contents).map_err(|err| ScaffoldError::io(&path, err))
    }

    /// An existing file may be replaced only if it still matches what was
    /// generated, or when forced.
    pub fn check_writable(&self, dest: &Path, relative: &str, force: bool) -> ScaffoldResult<()> {
        let path = dest.join(relative);
        if force || !path.exists() {
            return Ok(());
        }
        let Some(entry) = self.files.get(relative) else {
            return Err(ScaffoldError::FileExists { path });
        };
        let contents = fs::read_to_string(&path).map_err(|err| ScaffoldError::io(&path, err))?;
        if hash_str(&contents) == entry.sha256 {
            Ok(())
        } else {
            Err(ScaffoldError::ModifiedFile { path })
        }
    }

    pub fn record(&mut self, relative: &str, entity: &str, table: &str, contents: &str) {
        self.files.insert(
            relative.to_string(),
            ManifestEntry {
                entity: entity.to_string(),
                table: table.to_string(),
                sha256: hash_str(contents),
                generated_at: Utc::now(),
            },
        );
    }
}

pub fn hash_str(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    bytes_to_hex(&digest)
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
