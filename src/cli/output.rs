//! Output formatting for CLI commands

use crate::model::Snapshot;
use serde::Serialize;

/// Format output as pretty JSON
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// 每个分类一行：`<分类>: <条目数>`
pub fn format_counts(snapshot: &Snapshot) -> String {
    let width = snapshot
        .categories()
        .map(|c| c.label().len())
        .max()
        .unwrap_or(0);

    snapshot
        .iter()
        .map(|(category, items)| format!("{:<width$}  {}", category.label(), items.len(), width = width))
        .collect::<Vec<_>>()
        .join("\n")
}
