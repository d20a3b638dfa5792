//! Splitting flat language packs into numbered chunk files and merging them back.

use crate::error::{Result, ToolError};
use crate::format::to_line_json;
use crate::io::{read_json_object, stage, write_atomic};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default number of top-level pairs per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Glob matching chunk files inside a directory
pub const CHUNK_PATTERN: &str = "part_*.json";

/// File name of the chunk at zero-based `index`: `part_001.json`, `part_002.json`, ...
pub fn chunk_file_name(index: usize) -> String {
    format!("part_{:03}.json", index + 1)
}

/// Cut a map into contiguous chunks of at most `chunk_size` pairs, keeping order.
pub fn split(tree: &Map<String, Value>, chunk_size: usize) -> Result<Vec<Map<String, Value>>> {
    if chunk_size == 0 {
        return Err(ToolError::InvalidChunkSize(chunk_size));
    }

    let mut chunks = Vec::with_capacity(tree.len().div_ceil(chunk_size));
    let mut current = Map::new();
    for (key, value) in tree {
        current.insert(key.clone(), value.clone());
        if current.len() == chunk_size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

/// Fold chunks left to right. A key seen again overwrites the earlier value
/// but keeps its original position.
pub fn merge<I>(chunks: I) -> Map<String, Value>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    chunks.into_iter().fold(Map::new(), |mut merged, chunk| {
        merged.extend(chunk);
        merged
    })
}

/// Split `input` into `output_dir/part_NNN.json` files. Returns the written paths.
///
/// Chunk files left in `output_dir` by an earlier, larger split are removed,
/// so merging the directory afterwards gives back exactly `input`.
pub fn split_file(input: &Path, output_dir: &Path, chunk_size: usize) -> Result<Vec<PathBuf>> {
    let tree = read_json_object(input)?;
    let chunks = split(&tree, chunk_size)?;
    info!(
        "{} has {} pairs, writing {} chunks",
        input.display(),
        tree.len(),
        chunks.len()
    );

    std::fs::create_dir_all(output_dir)?;
    let staged = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| stage(&output_dir.join(chunk_file_name(index)), &to_line_json(chunk)))
        .collect::<Result<Vec<_>>>()?;

    let fresh: HashSet<String> = (0..chunks.len()).map(chunk_file_name).collect();
    for stale in existing_chunk_files(output_dir)? {
        let keep = stale
            .file_name()
            .is_some_and(|name| fresh.contains(&*name.to_string_lossy()));
        if !keep {
            std::fs::remove_file(&stale)?;
            debug!("Removed stale chunk {}", stale.display());
        }
    }

    let written = staged
        .into_iter()
        .map(|file| file.persist())
        .collect::<Result<Vec<_>>>()?;
    for path in &written {
        debug!("Wrote {}", path.display());
    }
    Ok(written)
}

fn existing_chunk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join(CHUNK_PATTERN);
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| {
        ToolError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("bad chunk pattern {}: {}", pattern, e),
        ))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Chunk files in `dir`, in lexical order.
pub fn chunk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ToolError::InputFileMissing(dir.to_path_buf()));
    }

    let files = existing_chunk_files(dir)?;
    if files.is_empty() {
        return Err(ToolError::NoChunksFound(dir.to_path_buf()));
    }
    Ok(files)
}

/// Merge every chunk file of `input_dir` into `output`. Returns the number of pairs.
///
/// Any unreadable chunk aborts the merge before `output` is touched.
pub fn merge_dir(input_dir: &Path, output: &Path) -> Result<usize> {
    let files = chunk_files(input_dir)?;
    info!("Merging {} chunk files from {}", files.len(), input_dir.display());

    let chunks = files
        .iter()
        .map(|path| read_json_object(path))
        .collect::<Result<Vec<_>>>()?;
    let merged = merge(chunks);

    write_atomic(output, &to_line_json(&merged))?;
    Ok(merged.len())
}
