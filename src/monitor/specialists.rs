use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory, relative to a project root, holding one folder per specialist
pub const SPECIALISTS_DIR: [&str; 2] = [".gummy", "specialists"];

/// Descriptor file inside each specialist folder
pub const DESCRIPTOR_FILE: &str = "meta.yaml";

/// A long-lived specialist agent as described by its `meta.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpecialistState {
    /// Folder name
    pub name: String,
    /// Free-form, usually `active`, `dormant` or `new`
    pub status: String,
    pub session_id: Option<String>,
    pub turns: u64,
    pub last_active: Option<String>,
    pub created: Option<String>,
}

/// Walk up from `start` to the first ancestor containing the specialists
/// directory, up to and including the filesystem root.
pub fn find_specialists_dir(start: &Path) -> Option<PathBuf> {
    find_specialists_dir_within(start, None)
}

/// Like [`find_specialists_dir`], but `stop` is the last ancestor checked.
pub fn find_specialists_dir_within(start: &Path, stop: Option<&Path>) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = SPECIALISTS_DIR.iter().fold(dir.to_path_buf(), |p, part| p.join(part));
        if candidate.is_dir() {
            return Some(candidate);
        }
        if stop == Some(dir) {
            break;
        }
    }
    None
}

/// Parse the `key: value` lines of a descriptor.
///
/// Only the first colon splits a line, so timestamps keep theirs. Lines
/// without a colon and unknown keys are ignored.
pub fn parse_descriptor(name: &str, text: &str) -> SpecialistState {
    let mut spec = SpecialistState {
        name: name.to_string(),
        ..Default::default()
    };

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "status" => spec.status = value.to_string(),
            "session_id" => spec.session_id = non_null(value),
            "turns" => spec.turns = leading_count(value),
            "last_active" => spec.last_active = non_null(value),
            "created" => spec.created = non_null(value),
            _ => {}
        }
    }

    spec
}

/// Leading decimal digits of `value`, so `3.0` and `12 # note` still
/// count. Negative or digitless values are 0.
fn leading_count(value: &str) -> u64 {
    let digits = value.strip_prefix('+').unwrap_or(value);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().unwrap_or(0)
}

fn non_null(value: &str) -> Option<String> {
    match value {
        "" | "null" => None,
        other => Some(other.to_string()),
    }
}

/// Specialists found above `start`. Folders without a readable descriptor
/// are left out; a missing specialists directory yields an empty list.
pub fn read_specialists(start: &Path) -> Vec<SpecialistState> {
    find_specialists_dir(start)
        .map(|root| read_specialists_in(&root))
        .unwrap_or_default()
}

/// Enumerate the specialist folders directly under `root`.
///
/// Descriptor bytes that are not UTF-8 are replaced; the specialist is
/// still listed.
pub fn read_specialists_in(root: &Path) -> Vec<SpecialistState> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            let bytes = fs::read(entry.path().join(DESCRIPTOR_FILE)).ok()?;
            let name = entry.file_name().to_string_lossy();
            Some(parse_descriptor(&name, &String::from_utf8_lossy(&bytes)))
        })
        .collect()
}
