//! Asset lists and asset-list discovery.
//!
//! An asset list is a JSON file naming a set of reference media inputs.
//! Discovery walks the configured assets directories for `*.json` files,
//! parsing each into an [`AssetList`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Error type for asset-list operations
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error reading an asset-list file
    #[error("Failed to read asset list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("Failed to parse asset list {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two asset lists share the same name
    #[error("Repeated asset list with name \"{0}\"")]
    DuplicateList(String),

    /// No asset lists were found in any assets directory
    #[error("No asset lists found in \"{0}\"")]
    NoneFound(String),
}

/// One reference input media item used for testing.
///
/// Immutable once loaded; jobs reference assets, they do not own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Name, unique within its asset list
    pub name: String,
    /// Source URL the asset is downloaded from
    pub source: String,
    /// Expected SHA-256 content checksum (or the `__skip__` sentinel)
    pub checksum: String,
    /// On-disk filename under `<resources>/<list-name>/`
    pub filename: String,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename)
    }
}

/// Parsed content of an asset-list JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetListContent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// An asset list loaded from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetList {
    /// Path of the JSON file the list was loaded from
    pub path: PathBuf,
    content: AssetListContent,
}

impl AssetList {
    /// Load an asset list from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;
        let content: AssetListContent =
            serde_json::from_str(&content).map_err(|source| AssetError::Parse {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, content })
    }

    /// Asset list name
    pub fn name(&self) -> &str {
        &self.content.name
    }

    /// Asset list description
    pub fn description(&self) -> &str {
        &self.content.description
    }

    /// The assets contained in this list
    pub fn assets(&self) -> &[Asset] {
        &self.content.assets
    }
}

impl fmt::Display for AssetList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} — {} assets",
            self.content.name,
            self.content.description,
            self.content.assets.len()
        )
    }
}

/// Discover asset lists by walking the given directories for `*.json` files.
///
/// Files that fail to parse are logged and skipped; a duplicated list name is
/// an error, as is finding no list at all (a fatal configuration error for a
/// run).
pub fn discover_asset_lists(assets_dirs: &[PathBuf]) -> Result<Vec<AssetList>, AssetError> {
    let mut lists: Vec<AssetList> = Vec::new();

    for dir in assets_dirs {
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match AssetList::from_json_file(path) {
                Ok(list) => {
                    if lists.iter().any(|l| l.name() == list.name()) {
                        return Err(AssetError::DuplicateList(list.name().to_string()));
                    }
                    lists.push(list);
                }
                Err(err) => {
                    log::warn!("Error loading asset list from {}: {}", path.display(), err);
                }
            }
        }
    }

    if lists.is_empty() {
        let dirs = assets_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AssetError::NoneFound(dirs));
    }

    Ok(lists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LIST_JSON: &str = r#"{
        "name": "basic",
        "description": "Small smoke-test clips",
        "assets": [
            {
                "name": "park_joy",
                "source": "https://example.com/park_joy.y4m",
                "checksum": "__skip__",
                "filename": "park_joy.y4m"
            },
            {
                "name": "crowd_run",
                "source": "https://example.com/crowd_run.y4m",
                "checksum": "0123abcd",
                "filename": "crowd_run.y4m"
            }
        ]
    }"#;

    fn write_list(dir: &Path, fname: &str, json: &str) -> PathBuf {
        let path = dir.join(fname);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = write_list(dir.path(), "basic.json", LIST_JSON);

        let list = AssetList::from_json_file(&path).unwrap();
        assert_eq!(list.name(), "basic");
        assert_eq!(list.assets().len(), 2);
        assert_eq!(list.assets()[0].name, "park_joy");
        assert_eq!(list.assets()[1].checksum, "0123abcd");
        assert_eq!(
            list.to_string(),
            "basic: Small smoke-test clips — 2 assets"
        );
    }

    #[test]
    fn test_discover_finds_nested_lists() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        write_list(dir.path(), "basic.json", LIST_JSON);
        write_list(
            &dir.path().join("sub"),
            "other.json",
            r#"{"name": "other", "description": "", "assets": []}"#,
        );
        // Non-JSON files are ignored
        fs::write(dir.path().join("README.md"), "not a list").unwrap();

        let lists = discover_asset_lists(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(lists.len(), 2);
    }

    #[test]
    fn test_discover_rejects_duplicate_names() {
        let dir = TempDir::new().unwrap();
        write_list(dir.path(), "a.json", LIST_JSON);
        write_list(dir.path(), "b.json", LIST_JSON);

        let err = discover_asset_lists(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, AssetError::DuplicateList(name) if name == "basic"));
    }

    #[test]
    fn test_discover_errors_when_empty() {
        let dir = TempDir::new().unwrap();
        let err = discover_asset_lists(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, AssetError::NoneFound(_)));
    }

    #[test]
    fn test_discover_skips_malformed_json() {
        let dir = TempDir::new().unwrap();
        write_list(dir.path(), "broken.json", "{ not json");
        write_list(dir.path(), "basic.json", LIST_JSON);

        let lists = discover_asset_lists(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].name(), "basic");
    }
}
