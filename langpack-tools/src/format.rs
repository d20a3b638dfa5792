//! Sorting and line-per-pair rendering of flat language packs.

use crate::tree::STRING_KEY;
use serde_json::{Map, Value};

/// Char length of an entry's `string` field, -1 when it has none.
fn string_length(value: &Value) -> i64 {
    value
        .get(STRING_KEY)
        .and_then(Value::as_str)
        .map(|s| s.chars().count() as i64)
        .unwrap_or(-1)
}

/// Stable sort of top-level entries by the length of their `string` field.
/// Entries without one come first, in their original order.
pub fn sort_by_string_length(map: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by_key(|(_, value)| string_length(value));
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Render one `"key": value` pair per line with compact values.
pub fn to_line_json(map: &Map<String, Value>) -> String {
    let lines: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("  {}: {}", Value::String(key.clone()), value))
        .collect();

    if lines.is_empty() {
        return "{\n}".to_string();
    }
    format!("{{\n{}\n}}", lines.join(",\n"))
}

/// Default output path for the formatter: `sorted_<name>` next to the input.
pub fn default_output_path(input: &std::path::Path) -> std::path::PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.json".to_string());
    input.with_file_name(format!("sorted_{}", name))
}
