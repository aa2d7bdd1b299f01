//! Extension-to-subfolder classification.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Folder used for extensions no label claims.
pub const UNMAPPED_FOLDER: &str = "other";

const AUDIO: &[&str] = &[
    ".aif", ".cda", ".mid", ".midi", ".mp3", ".mpa", ".ogg", ".wav", ".wma", ".wpl",
];
const VIDEO: &[&str] = &[
    ".3g2", ".3gp", ".avi", ".flv", ".h264", ".m4v", ".mkv", ".mov", ".mp4", ".mpg", ".mpeg",
    ".rm", ".swf", ".vob", ".wmv",
];
const IMAGE: &[&str] = &[
    ".ai", ".bmp", ".ico", ".jpeg", ".jpg", ".png", ".ps", ".psd", ".svg", ".tif", ".tiff",
];
const DOCUMENT: &[&str] = &[
    ".xls", ".xlsm", ".xlsx", ".ods", ".doc", ".odt", ".pdf", ".rtf", ".tex", ".txt", ".wpd",
    ".md",
];

fn normalize(ext: &str) -> String {
    ext.trim().to_lowercase()
}

/// Label → extensions (with leading dot), e.g. `video → [".mp4", ".mkv"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationMap(BTreeMap<String, Vec<String>>);

impl ClassificationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The audio/video/image/document categories.
    pub fn with_defaults() -> Self {
        let mut map = Self::new();
        for (label, exts) in [
            ("audio", AUDIO),
            ("video", VIDEO),
            ("image", IMAGE),
            ("document", DOCUMENT),
        ] {
            for ext in exts {
                map.add(label, ext);
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extensions(&self, label: &str) -> &[String] {
        self.0.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends `ext` under `label` unless already present (case-insensitive).
    /// Returns whether the map changed.
    pub fn add(&mut self, label: &str, ext: &str) -> bool {
        let ext = ext.trim();
        if ext.is_empty() {
            return false;
        }
        let wanted = normalize(ext);
        let list = self.0.entry(label.trim().to_string()).or_default();
        if list.iter().any(|e| normalize(e) == wanted) {
            return false;
        }
        list.push(ext.to_string());
        true
    }

    /// Adds every entry of `other`, skipping duplicates.
    pub fn merge(&mut self, other: &ClassificationMap) {
        for (label, exts) in &other.0 {
            for ext in exts {
                self.add(label, ext);
            }
        }
    }

    /// Label owning `ext` (`".mp4"`, case-insensitive), if any.
    pub fn label_for_extension(&self, ext: &str) -> Option<&str> {
        let wanted = normalize(ext);
        self.0
            .iter()
            .find(|(_, exts)| exts.iter().any(|e| normalize(e) == wanted))
            .map(|(label, _)| label.as_str())
    }

    /// Subfolder for `file_name`: its extension's label, or [`UNMAPPED_FOLDER`].
    pub fn folder_for(&self, file_name: &str) -> &str {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.label_for_extension(&format!(".{}", e)))
            .unwrap_or(UNMAPPED_FOLDER)
    }
}

/// Parses a `label:.ext1,.ext2` assignment into a map with one label.
pub fn parse_assignment(input: &str) -> Result<ClassificationMap, String> {
    let (label, exts) = input
        .split_once(':')
        .ok_or_else(|| format!("expected label:.ext1,.ext2, got {:?}", input))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("missing label in {:?}", input));
    }
    let mut map = ClassificationMap::new();
    for ext in exts.split(',') {
        map.add(label, ext);
    }
    if map.is_empty() {
        return Err(format!("no extensions in {:?}", input));
    }
    Ok(map)
}
