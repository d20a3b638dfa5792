//! Language pack maintenance tools.
//!
//! Diffing of nested translation trees, splitting large flat packs into
//! numbered chunk files and merging them back, sorting and line-per-pair
//! formatting, and downloading the reference pack. The `langpack` binary
//! exposes each of these as a subcommand.
//!
//! ```no_run
//! use langpack_tools::tree::{diff, LeafMode};
//! use langpack_tools::io::read_json;
//! use std::path::Path;
//!
//! let zh = read_json(Path::new("lang/zh.json"))?;
//! let en = read_json(Path::new("lang/en.json"))?;
//! let result = diff(&zh, &en, LeafMode::StringField);
//! println!("{} keys need translating", result.only_in_b.len());
//! # Ok::<(), langpack_tools::ToolError>(())
//! ```

pub mod chunk;
pub mod compare;
pub mod download;
pub mod error;
pub mod format;
pub mod io;
pub mod tree;

pub use chunk::{merge, merge_dir, split, split_file};
pub use compare::{compare_dirs, compare_files, CompareReport};
pub use download::Downloader;
pub use error::{Result, ToolError};
pub use format::{sort_by_string_length, to_line_json};
pub use tree::{diff, leaf_paths, prune_removing_paths, prune_to_paths, top_level_diff, KeyDiff, LeafMode};
