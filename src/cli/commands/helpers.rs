//! Shared helper functions for CLI commands.

use std::fmt::Write;

use crate::results::QueryRecord;

const TABLE_HEADERS: [&str; 7] = [
    "Instrument",
    "Data Level",
    "Descriptor",
    "Start Date",
    "Repointing",
    "Version",
    "Filename",
];

fn table_row(record: &QueryRecord) -> [String; 7] {
    let r = &record.record;
    [
        r.instrument().to_string(),
        r.data_level().to_string(),
        r.descriptor().map(|d| d.to_string()).unwrap_or_default(),
        r.start_date().format("%Y%m%d").to_string(),
        r.repointing()
            .map(|p| p.number().to_string())
            .unwrap_or_default(),
        r.version().to_string(),
        record.filename(),
    ]
}

/// Render query results as a bordered table, preceded by a match count.
pub fn render_table(records: &[QueryRecord]) -> String {
    let mut out = format!("Found [{}] matching files\n", records.len());
    if records.is_empty() {
        return out;
    }

    let rows: Vec<[String; 7]> = records.iter().map(table_row).collect();
    let mut widths = TABLE_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = format!(
        "|{}|",
        "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len() - 1)
    );
    let line = |cells: &[&str]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let _ = writeln!(out, "{}", separator);
    let _ = writeln!(out, "{}", line(&TABLE_HEADERS));
    let _ = writeln!(out, "{}", separator);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        let _ = writeln!(out, "{}", line(&cells));
    }
    let _ = writeln!(out, "{}", separator);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::map_listing;
    use serde_json::json;

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table(&[]), "Found [0] matching files\n");
    }

    #[test]
    fn test_table_layout() {
        let listing = map_listing(&[
            json!({ "file_path": "imap/swe/l0/2024/01/imap_swe_l0_sci_20240105_v001.pkts" }),
            json!({ "file_path": "imap_hi_l2_sensor45_20250101-repoint00012_v002.cdf" }),
        ]);
        let table = render_table(&listing.records);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Found [2] matching files");
        assert!(lines[2].starts_with("| Instrument | Data Level | Descriptor |"));
        assert!(lines[4].contains("| sci "));
        assert!(lines[4].contains("imap_swe_l0_sci_20240105_v001.pkts"));
        assert!(lines[5].contains("| 12 "));
        // Every line of the box has the same width.
        let width = lines[1].len();
        assert!(lines[1..].iter().all(|l| l.len() == width));
    }
}
