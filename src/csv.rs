use anyhow::{Context, Result};
use std::path::Path;

use crate::labels::parse_related;
use crate::matrix::DistanceEntry;
use crate::orchestrator::ComparisonOrchestrator;

/// One parsed import row: (query text, stored text, related).
pub type ImportedRow = (String, String, bool);

/// Parse CSV text in the import format `Query Text, Stored Text, Related`.
///
/// Best-effort policy: a malformed row (e.g. an unterminated quote) becomes an
/// empty-text pair instead of aborting, so one bad row never blocks the rest.
/// A leading header row and a trailing `Optimal Threshold` footer (as written
/// by [`export`]) are recognized and skipped. Extra columns are ignored.
pub fn parse_rows(text: &str) -> Vec<ImportedRow> {
    let records = split_records(text);
    // The footer is only ever the last record with any content; a pair whose
    // query text happens to be "Optimal Threshold" sits above it and is kept.
    let last_data = records.iter().rposition(|r| match r {
        Record::Fields(fields) => !fields.iter().all(|f| f.is_empty()),
        Record::Malformed => true,
    });

    let mut rows = Vec::new();
    for (i, record) in records.into_iter().enumerate() {
        let record = match record {
            Record::Fields(fields) => fields,
            Record::Malformed => {
                rows.push((String::new(), String::new(), false));
                continue;
            }
        };
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if i == 0 && is_header(&record) {
            continue;
        }
        if Some(i) == last_data
            && record.first().map(String::as_str) == Some("Optimal Threshold")
            && record.get(1).is_none_or(|f| f.is_empty())
        {
            continue;
        }
        let mut fields = record.into_iter();
        let query = fields.next().unwrap_or_default();
        let stored = fields.next().unwrap_or_default();
        let related = fields.next().map(|f| parse_related(&f)).unwrap_or(false);
        rows.push((query, stored, related));
    }
    rows
}

/// Read and parse an import file.
pub fn import_from_path(path: &Path) -> Result<Vec<ImportedRow>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading csv from {}", path.display()))?;
    Ok(parse_rows(&text))
}

/// Render the export format: `Query Text, Stored Text, Related, <models...>`
/// with one row per pair, distances to 4 decimal places (blank when a slot is
/// not in `Value` state), and a trailing `Optimal Threshold` row.
///
/// The `Related` column makes export → import reproduce both texts and
/// labels; distances are recomputed, never re-imported.
pub fn export(orch: &ComparisonOrchestrator) -> String {
    let models = orch.active_models();

    let mut header = vec!["Query Text".to_string(), "Stored Text".to_string(), "Related".to_string()];
    header.extend(models.iter().map(|m| m.to_string()));

    let mut out = String::new();
    push_record(&mut out, &header);

    for pair in orch.pairs() {
        let mut record = vec![
            pair.query_text.clone(),
            pair.stored_text.clone(),
            if orch.labels().get(pair.index) { "Yes" } else { "No" }.to_string(),
        ];
        for model in &models {
            record.push(match orch.entry(pair.index, model) {
                DistanceEntry::Value(v) => format!("{v:.4}"),
                _ => String::new(),
            });
        }
        push_record(&mut out, &record);
    }

    let mut footer = vec!["Optimal Threshold".to_string(), String::new(), String::new()];
    for model in &models {
        footer.push(match orch.threshold(model) {
            Some(t) => format!("{t:.4}"),
            None => String::new(),
        });
    }
    push_record(&mut out, &footer);

    out
}

/// Write the export format to a file.
pub fn export_to_path(orch: &ComparisonOrchestrator, path: &Path) -> Result<()> {
    std::fs::write(path, export(orch))
        .with_context(|| format!("writing csv to {}", path.display()))
}

fn is_header(record: &[String]) -> bool {
    record.first().is_some_and(|f| f.trim().eq_ignore_ascii_case("query text"))
        && record.get(1).is_some_and(|f| f.trim().eq_ignore_ascii_case("stored text"))
}

enum Record {
    Fields(Vec<String>),
    Malformed,
}

/// Split CSV text into records, honoring quoted fields (commas and newlines
/// inside quotes, `""` as an escaped quote). A record left open at end of
/// input is malformed.
fn split_records(text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut record_started = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                record_started = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                record_started = true;
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                fields.push(std::mem::take(&mut field));
                records.push(Record::Fields(std::mem::take(&mut fields)));
                record_started = false;
            }
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push(Record::Fields(std::mem::take(&mut fields)));
                record_started = false;
            }
            _ => {
                field.push(c);
                record_started = true;
            }
        }
    }

    if in_quotes {
        // Unterminated quote: the dangling record is unparseable.
        records.push(Record::Malformed);
    } else if record_started || !fields.is_empty() {
        fields.push(field);
        records.push(Record::Fields(fields));
    }

    records
}

fn push_record(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote(field));
    }
    out.push('\n');
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::ModelId;

    #[test]
    fn parses_plain_rows() {
        let rows = parse_rows("cat,feline,Yes\ncat,car,No\n");
        assert_eq!(
            rows,
            vec![
                ("cat".into(), "feline".into(), true),
                ("cat".into(), "car".into(), false),
            ]
        );
    }

    #[test]
    fn skips_header_row() {
        let rows = parse_rows("Query Text,Stored Text,Related\ncat,feline,related\n");
        assert_eq!(rows, vec![("cat".into(), "feline".into(), true)]);
    }

    #[test]
    fn related_column_uses_truthiness_policy() {
        let rows = parse_rows("a,b,RELATED\nc,d,true\ne,f,\ng,h\n");
        assert_eq!(rows[0].2, true);
        assert_eq!(rows[1].2, false);
        assert_eq!(rows[2].2, false);
        assert_eq!(rows[3].2, false);
    }

    #[test]
    fn quoted_fields_keep_commas_and_newlines() {
        let rows = parse_rows("\"hello, world\",\"line\nbreak\",yes\n");
        assert_eq!(rows[0].0, "hello, world");
        assert_eq!(rows[0].1, "line\nbreak");
        assert!(rows[0].2);
    }

    #[test]
    fn escaped_quotes() {
        let rows = parse_rows("\"say \"\"hi\"\"\",stored,no\n");
        assert_eq!(rows[0].0, "say \"hi\"");
    }

    #[test]
    fn malformed_row_becomes_empty_pair() {
        let rows = parse_rows("good,row,yes\n\"unterminated,oops\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("good".into(), "row".into(), true));
        assert_eq!(rows[1], (String::new(), String::new(), false));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rows = parse_rows("a,b,yes\n\n\nc,d,no\n");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn crlf_line_endings() {
        let rows = parse_rows("a,b,yes\r\nc,d,no\r\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].0, "c");
    }

    #[test]
    fn export_formats_distances_and_threshold() {
        let mut orch = ComparisonOrchestrator::new();
        let m = ModelId::from("test/model");
        orch.set_slot_model(0, Some(m.clone()));
        let related = orch.add_pair("cat", "feline");
        let unrelated = orch.add_pair("cat", "car");
        orch.set_label(related, true);
        let job = orch.begin_recompute(related, &m).unwrap();
        orch.complete(job, Ok(0.05));
        let job = orch.begin_recompute(unrelated, &m).unwrap();
        orch.complete(job, Ok(0.8));

        let csv = export(&orch);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Query Text,Stored Text,Related,test/model");
        assert_eq!(lines[1], "cat,feline,Yes,0.0500");
        assert_eq!(lines[2], "cat,car,No,0.8000");
        assert_eq!(lines[3], "Optimal Threshold,,,0.0510");
    }

    #[test]
    fn export_blanks_for_uncomputed_slots_and_unset_threshold() {
        let mut orch = ComparisonOrchestrator::new();
        let m = ModelId::from("m");
        orch.set_slot_model(0, Some(m.clone()));
        orch.add_pair("cat", "feline");

        let csv = export(&orch);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "cat,feline,No,");
        assert_eq!(lines[2], "Optimal Threshold,,,");
    }

    #[test]
    fn round_trip_preserves_texts_and_labels() {
        let mut orch = ComparisonOrchestrator::new();
        let m = ModelId::from("m");
        orch.set_slot_model(0, Some(m.clone()));
        let a = orch.add_pair("hello, world", "with \"quotes\"");
        let b = orch.add_pair("plain", "row");
        orch.set_label(a, true);
        let job = orch.begin_recompute(b, &m).unwrap();
        orch.complete(job, Ok(0.42));

        let csv = export(&orch);
        let rows = parse_rows(&csv);

        let mut reimported = ComparisonOrchestrator::new();
        reimported.load_rows(rows);

        assert_eq!(reimported.pair_count(), 2);
        assert_eq!(reimported.pair(0).unwrap().query_text, "hello, world");
        assert_eq!(reimported.pair(0).unwrap().stored_text, "with \"quotes\"");
        assert_eq!(reimported.pair(1).unwrap().query_text, "plain");
        assert!(reimported.labels().get(0));
        assert!(!reimported.labels().get(1));
    }

    #[test]
    fn pair_named_like_the_footer_round_trips() {
        let mut orch = ComparisonOrchestrator::new();
        let a = orch.add_pair("Optimal Threshold", "a stored text");
        orch.add_pair("plain", "row");
        orch.set_label(a, true);

        let rows = parse_rows(&export(&orch));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "Optimal Threshold");
        assert_eq!(rows[0].1, "a stored text");
        assert!(rows[0].2);
    }

    #[test]
    fn footer_is_skipped_even_after_trailing_blank_lines() {
        let rows = parse_rows("a,b,yes\nOptimal Threshold,,,0.1234\n\n\n");
        assert_eq!(rows, vec![("a".into(), "b".into(), true)]);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");

        let mut orch = ComparisonOrchestrator::new();
        orch.add_pair("cat", "feline");
        orch.set_label(0, true);
        export_to_path(&orch, &path).unwrap();

        let rows = import_from_path(&path).unwrap();
        assert_eq!(rows, vec![("cat".into(), "feline".into(), true)]);
    }
}
