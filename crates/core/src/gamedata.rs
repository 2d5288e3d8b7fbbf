//! Gamedata key-value store
//!
//! Games rename their networked fields between titles and updates, so the
//! platform never hardcodes a field name. A gamedata file deployed next to
//! the platform maps symbolic keys to the name the running game uses, and
//! can be updated without recompiling:
//!
//! ```json
//! {
//!     "Keys": {
//!         "m_iScore": "m_iMatchScore",
//!         "m_szTeamname": "m_szTeamname"
//!     }
//! }
//! ```
//!
//! [`Gamedata`] implements [`GameConfig`], making it the game-configuration
//! service the natives consume.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use sourcerust_engine::GameConfig;

/// Errors that can occur when loading gamedata
#[derive(Debug, Error)]
pub enum GamedataError {
    #[error("Failed to read gamedata file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse gamedata JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Loaded gamedata
#[derive(Debug, Default, Deserialize)]
pub struct Gamedata {
    /// Symbolic key -> game-specific field name
    #[serde(rename = "Keys", default)]
    keys: HashMap<String, String>,
}

impl Gamedata {
    /// Load gamedata from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GamedataError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    /// Load gamedata from a JSON string
    pub fn load_from_str(json: &str) -> Result<Self, GamedataError> {
        let gamedata: Gamedata = serde_json::from_str(json)?;
        tracing::info!("Loaded gamedata: {} keys", gamedata.keys.len());
        Ok(gamedata)
    }

    /// Number of configured keys
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

impl GameConfig for Gamedata {
    fn key_value(&self, key: &str) -> Option<String> {
        self.keys.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_keys() {
        let json = r#"{
            "Keys": {
                "m_iScore": "m_iMatchScore",
                "m_szTeamname": "m_szTeamname"
            }
        }"#;

        let gd = Gamedata::load_from_str(json).unwrap();
        assert_eq!(gd.key_count(), 2);
        assert_eq!(gd.key_value("m_iScore").as_deref(), Some("m_iMatchScore"));
        assert_eq!(gd.key_value("m_iRoundsWon"), None);
    }

    #[test]
    fn test_missing_keys_section_defaults_empty() {
        let gd = Gamedata::load_from_str("{}").unwrap();
        assert_eq!(gd.key_count(), 0);
        assert_eq!(gd.key_value("m_iScore"), None);
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let err = Gamedata::load_from_str("not json").unwrap_err();
        assert!(matches!(err, GamedataError::ParseError(_)));
    }
}
