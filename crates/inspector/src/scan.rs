//! Spec-file discovery and the byte-level prefilter.
//!
//! Discovery walks the project tree once; the prefilter runs a single
//! Aho-Corasick automaton over each file so that files mentioning none of the
//! dispatched method names are never parsed.

use std::path::{Path, PathBuf};

use aho_corasick::{AhoCorasick, MatchKind};
use common::FileConfig;
use tracing::warn;
use walkdir::WalkDir;

use crate::InspectorError;

/// Collects the files under `root` that the configuration selects, sorted.
///
/// A `root` that is itself a file is returned as-is, regardless of its name.
/// Excluded directories are not entered. Unreadable entries are logged and skipped.
pub fn collect_spec_files(root: &Path, files: &FileConfig) -> Result<Vec<PathBuf>, InspectorError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(InspectorError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such file or directory: {}", root.display()),
        )));
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        // Never prune the root itself, whatever it is called.
        e.depth() == 0
            || !e.file_type().is_dir()
            || !files.excludes_dir(&e.file_name().to_string_lossy())
    });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if entry.file_type().is_file() && files.includes(&entry.file_name().to_string_lossy()) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Cheap "could this file produce an offense?" check.
pub struct Prefilter {
    automaton: Option<AhoCorasick>,
}

impl Prefilter {
    /// Builds an automaton over `methods`. With no methods, nothing matches.
    pub fn new(methods: &[&str]) -> Result<Self, InspectorError> {
        if methods.is_empty() {
            return Ok(Self { automaton: None });
        }
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(methods)
            .map_err(|e| InspectorError::ParseFailure(format!("AhoCorasick build failed: {}", e)))?;
        Ok(Self {
            automaton: Some(automaton),
        })
    }

    /// `false` only when none of the method names occurs anywhere in `source`.
    pub fn might_match(&self, source: &[u8]) -> bool {
        self.automaton
            .as_ref()
            .is_some_and(|ac| ac.is_match(source))
    }
}
