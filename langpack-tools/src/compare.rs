//! Comparison of a translated language pack against its reference.
//!
//! For every compared pair two trees are derived: the reference pruned to
//! the strings the translation is missing (`<ref>_en-new.json`) and the
//! translation pruned of strings the reference no longer has
//! (`<translated>_zh-new.json`). Outputs are only produced for pairs that
//! differ. Everything is computed before the first file is written.

use crate::error::{Result, ToolError};
use crate::io::{read_json, to_pretty_json, write_all_atomic};
use crate::tree::{diff, prune_removing_paths, prune_to_paths, KeyDiff, LeafMode};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the report written next to the outputs
pub const REPORT_FILE: &str = "compare_keys.log";

/// One compared pair and the files it will produce
#[derive(Debug, Clone)]
pub struct FileComparison {
    pub translated: PathBuf,
    pub reference: PathBuf,
    /// `only_in_a` is translated-only, `only_in_b` is reference-only
    pub diff: KeyDiff,
    pub outputs: Vec<(PathBuf, Value)>,
}

#[derive(Debug, Clone, Default)]
pub struct CompareReport {
    pub comparisons: Vec<FileComparison>,
    /// Files present in the translated directory only
    pub missing_in_reference: Vec<String>,
    /// Files present in the reference directory only
    pub missing_in_translated: Vec<String>,
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Compare two parsed trees and plan the derived outputs under `out_dir`.
pub fn compare_trees(
    translated_path: &Path,
    translated: &Value,
    reference_path: &Path,
    reference: &Value,
    out_dir: &Path,
    mode: LeafMode,
) -> FileComparison {
    let key_diff = diff(translated, reference, mode);

    let outputs = if key_diff.is_empty() {
        Vec::new()
    } else {
        vec![
            (
                out_dir.join(format!("{}_en-new.json", stem(reference_path))),
                prune_to_paths(reference, &key_diff.only_in_b),
            ),
            (
                out_dir.join(format!("{}_zh-new.json", stem(translated_path))),
                prune_removing_paths(translated, &key_diff.only_in_a),
            ),
        ]
    };

    FileComparison {
        translated: translated_path.to_path_buf(),
        reference: reference_path.to_path_buf(),
        diff: key_diff,
        outputs,
    }
}

/// Compare a single translated file against a reference file.
pub fn compare_files(
    translated: &Path,
    reference: &Path,
    out_dir: &Path,
    mode: LeafMode,
) -> Result<CompareReport> {
    let translated_tree = read_json(translated)?;
    let reference_tree = read_json(reference)?;

    Ok(CompareReport {
        comparisons: vec![compare_trees(
            translated,
            &translated_tree,
            reference,
            &reference_tree,
            out_dir,
            mode,
        )],
        ..Default::default()
    })
}

fn json_file_names(dir: &Path) -> Result<BTreeSet<String>> {
    if !dir.is_dir() {
        return Err(ToolError::InputFileMissing(dir.to_path_buf()));
    }
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            if let Some(name) = path.file_name() {
                names.insert(name.to_string_lossy().into_owned());
            }
        }
    }
    Ok(names)
}

/// Compare every `*.json` file present in both directories, matched by name.
pub fn compare_dirs(
    translated_dir: &Path,
    reference_dir: &Path,
    out_dir: &Path,
    mode: LeafMode,
) -> Result<CompareReport> {
    let translated_names = json_file_names(translated_dir)?;
    let reference_names = json_file_names(reference_dir)?;

    let mut report = CompareReport {
        missing_in_reference: translated_names
            .difference(&reference_names)
            .cloned()
            .collect(),
        missing_in_translated: reference_names
            .difference(&translated_names)
            .cloned()
            .collect(),
        ..Default::default()
    };

    for name in translated_names.intersection(&reference_names) {
        debug!("Comparing {}", name);
        let single = compare_files(
            &translated_dir.join(name),
            &reference_dir.join(name),
            out_dir,
            mode,
        )?;
        report.comparisons.extend(single.comparisons);
    }

    Ok(report)
}

impl CompareReport {
    pub fn differing(&self) -> usize {
        self.comparisons.iter().filter(|c| !c.diff.is_empty()).count()
    }

    /// Write every derived tree and the report into `out_dir`. Returns the written paths.
    ///
    /// All files are staged before the first one is persisted.
    pub fn write(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;

        let mut files = Vec::new();
        for (path, value) in self.comparisons.iter().flat_map(|c| &c.outputs) {
            files.push((path.clone(), to_pretty_json(value)?));
        }
        files.push((out_dir.join(REPORT_FILE), self.to_string()));

        let written = write_all_atomic(&files)?;
        info!(
            "Compared {} pairs, {} differ",
            self.comparisons.len(),
            self.differing()
        );
        Ok(written)
    }
}

/// Human readable report listing every differing path.
impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Language pack key comparison ===")?;
        writeln!(f, "Generated: {}\n", Utc::now().to_rfc3339())?;

        for comparison in &self.comparisons {
            writeln!(f, "Translated: {}", comparison.translated.display())?;
            writeln!(f, "Reference:  {}", comparison.reference.display())?;
            if comparison.diff.is_empty() {
                writeln!(f, "Keys are identical\n")?;
                continue;
            }
            writeln!(f, "Differing keys: {}", comparison.diff.len())?;
            writeln!(f, "Only in translated:")?;
            for key in &comparison.diff.only_in_a {
                writeln!(f, "  - {}", key)?;
            }
            writeln!(f, "Only in reference:")?;
            for key in &comparison.diff.only_in_b {
                writeln!(f, "  - {}", key)?;
            }
            writeln!(f, "---------------")?;
        }

        for name in &self.missing_in_reference {
            writeln!(f, "[missing] reference directory has no {}", name)?;
        }
        for name in &self.missing_in_translated {
            writeln!(f, "[missing] translated directory has no {}", name)?;
        }

        writeln!(f, "=== Done ===")
    }
}
