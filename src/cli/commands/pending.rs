//! Pending command: list buffered diff records.

use console::style;

use crate::config::Settings;
use crate::storage::{DiffBuffer, DiffKind, DiffRecord, RecordId};

/// Print every record in the diff buffer, oldest first.
pub fn run_pending(settings: &Settings, patches: bool) -> anyhow::Result<()> {
    let buffer = DiffBuffer::from_settings(settings);
    let records = buffer.pending()?;

    if records.is_empty() {
        println!("No pending diffs in {}", buffer.dir().display());
        return Ok(());
    }

    println!("{} pending diff(s) in {}", records.len(), buffer.dir().display());
    for (id, record) in &records {
        println!("{}", describe(id, record));
        if !patches {
            continue;
        }
        if let Some(patch) = record.patch() {
            for line in patch.lines() {
                println!("    {line}");
            }
        }
    }
    Ok(())
}

fn describe(id: &RecordId, record: &DiffRecord) -> String {
    let change = match &record.kind {
        DiffKind::Rename(payload) => {
            format!("{} -> {}", payload.old_rel_path, payload.new_rel_path)
        }
        _ => record.file_relative_path.clone(),
    };
    format!(
        "  {} {:<8} {}/{} {change} {}",
        style(&record.created_at).dim(),
        record.kind.label(),
        record.repo,
        record.branch,
        style(id).dim()
    )
}
