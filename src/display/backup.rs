//! Backup display formatting
//!
//! Formats backup artifacts, inspection results and restore outcomes for
//! terminal output.

use chrono::{Local, NaiveDateTime};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::backup::{BackupArtifact, BackupInfo, CreatedBackup, RestoreSummary};
use crate::models::EntityKind;
use crate::snapshot::RecordCounts;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    file_name: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Encrypted")]
    encrypted: &'static str,
}

/// Format the artifact list as a table, most recent first
pub fn format_backup_list(artifacts: &[BackupArtifact]) -> String {
    if artifacts.is_empty() {
        return "No backups found.\nCreate one with: planner backup create".to_string();
    }

    let now = Local::now().naive_local();
    let rows = artifacts.iter().enumerate().map(|(i, artifact)| ArtifactRow {
        index: i + 1,
        file_name: artifact.file_name.clone(),
        created: artifact.created_at.format(TIME_FORMAT).to_string(),
        age: format_age(now, artifact.created_at),
        size: format_size(artifact.size_bytes),
        encrypted: if artifact.is_encrypted { "yes" } else { "no" },
    });

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push_str(&format!("\n\nTotal: {} backup(s)", artifacts.len()));
    output
}

/// Format per-kind counts, one kind per line
fn format_counts(counts: &RecordCounts) -> String {
    let mut output = String::new();
    for kind in EntityKind::ALL {
        output.push_str(&format!(
            "  {:<15}{}\n",
            format!("{}:", capitalize(kind.plural())),
            counts.get(kind)
        ));
    }
    output
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format the result of `backup inspect`
pub fn format_backup_info(info: &BackupInfo) -> String {
    let mut output = String::new();
    output.push_str("Backup Details\n");
    output.push_str("==============\n");
    output.push_str(&format!("File:      {}\n", info.path.display()));
    output.push_str(&format!("Size:      {}\n", format_size(info.size_bytes)));

    let protection = match (info.is_encrypted, info.key_source) {
        (false, _) => "none".to_string(),
        (true, Some(source)) => format!("encrypted ({} key)", source),
        (true, None) => "encrypted".to_string(),
    };
    output.push_str(&format!("Protection: {}\n", protection));

    if !info.contents_readable {
        output.push('\n');
        output.push_str("Contents are encrypted. Supply the password to restore this backup.\n");
        return output;
    }

    if let Some(created_at) = info.created_at {
        output.push_str(&format!("Created:   {}\n", created_at.format(TIME_FORMAT)));
    }
    if let Some(version) = info.format_version {
        output.push_str(&format!("Format:    v{}\n", version));
    }
    if let Some(device) = info.device_info.as_deref().filter(|d| !d.is_empty()) {
        output.push_str(&format!("Device:    {}\n", device));
    }
    output.push('\n');
    output.push_str("Contents:\n");
    output.push_str(&format_counts(&info.counts));
    output.push_str(&format!("  {:<15}{}\n", "Total:", info.counts.total()));
    output
}

/// Format the result of `backup create`
pub fn format_created_backup(created: &CreatedBackup) -> String {
    format!(
        "Backup created: {}\nLocation: {}\nSize: {}{}\nContents: {} items ({})",
        created.artifact.file_name,
        created.artifact.path.display(),
        format_size(created.artifact.size_bytes),
        if created.artifact.is_encrypted {
            " (encrypted)"
        } else {
            ""
        },
        created.total(),
        created.counts
    )
}

/// Format the result of `backup restore`
pub fn format_restore_summary(summary: &RestoreSummary) -> String {
    let mut output = String::new();
    output.push_str("Restore complete!\n");
    output.push_str(&summary.summary());
    output.push('\n');
    if summary.replaced_existing {
        output.push_str("Existing data was replaced.\n");
    } else {
        output.push_str("Restored items were added alongside existing data.\n");
    }
    output
}

/// Format how long ago `then` was in compact form
pub fn format_age(now: NaiveDateTime, then: NaiveDateTime) -> String {
    let total_seconds = now.signed_duration_since(then).num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
