use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{constants::DEFAULT_DIFFICULTY, HashAlgorithm, LedgerError, MineOptions, Result};

/// Tunables of a chain, fixed for its lifetime.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "difficulty": 3, "algorithm": "blake3", "mining": { "max_trials": 1000000 } }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Leading zero hex digits required of every mined block hash.
    pub difficulty: u32,
    pub algorithm: HashAlgorithm,
    pub mining: MineOptions,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            algorithm: HashAlgorithm::default(),
            mining: MineOptions::default(),
        }
    }
}

impl ChainConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| LedgerError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
