use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const STRIPPED: [char; 5] = ['\'', '[', ']', '"', '/'];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evidence {
    pub scenario: String,
    pub index: usize,
    pub message: String,
    pub path: PathBuf,
}

pub fn sanitize_message(message: &str) -> String {
    message.chars().filter(|c| !STRIPPED.contains(c)).collect()
}

/// `<capture_dir>/<scenario>/<index>-<sanitized message>.png`
pub fn evidence_path(capture_dir: &Path, scenario: &str, index: usize, message: &str) -> PathBuf {
    capture_dir
        .join(scenario)
        .join(format!("{index}-{}.png", sanitize_message(message)))
}
