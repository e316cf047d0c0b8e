//! # Flattened Record Export
//!
//! Converts an evaluation into an ordered flat record — identity cells
//! followed by score/comment pairs in a fixed criterion order — and renders
//! it as an escaped delimited-text line. The full export walks all 15
//! canonical criteria (34 columns); the legacy export walks the 9-criterion
//! subset (22 columns).
//!
//! Every field, header included, is wrapped in quotes with internal quotes
//! doubled, so the output round-trips through any CSV reader that
//! understands quote-doubling — commas and quote characters inside comments
//! survive unchanged.

use crate::criteria::{self, CANONICAL_ORDER, LEGACY_EXPORT_ORDER};
use crate::export::Cell;
use crate::model::Evaluation;

/// The identity columns preceding the per-criterion pairs.
const IDENTITY_HEADERS: [&str; 4] = ["Escola", "Avaliador", "E-mail", "Data"];

/// Flat record over all 15 canonical criteria.
pub fn full_record(evaluation: &Evaluation) -> Vec<Cell> {
    record(evaluation, &CANONICAL_ORDER)
}

/// Flat record over the 9-criterion legacy subset.
pub fn legacy_record(evaluation: &Evaluation) -> Vec<Cell> {
    record(evaluation, &LEGACY_EXPORT_ORDER)
}

fn record(evaluation: &Evaluation, order: &[&str]) -> Vec<Cell> {
    let mut cells: Vec<Cell> = vec![
        evaluation.school.as_str().into(),
        evaluation.user_name.as_str().into(),
        evaluation.user_email.as_str().into(),
        evaluation.timestamp.as_str().into(),
    ];
    for id in order {
        let score = evaluation.scores.get(*id).copied().unwrap_or_default();
        cells.push(Cell::Int(score as i64));
        let comment = evaluation.comments.get(*id).cloned().unwrap_or_default();
        cells.push(Cell::Text(comment));
    }
    cells
}

/// Column titles matching [`full_record`].
pub fn full_header() -> Vec<String> {
    header(&CANONICAL_ORDER)
}

/// Column titles matching [`legacy_record`].
pub fn legacy_header() -> Vec<String> {
    header(&LEGACY_EXPORT_ORDER)
}

fn header(order: &[&str]) -> Vec<String> {
    let mut titles: Vec<String> = IDENTITY_HEADERS.iter().map(|t| t.to_string()).collect();
    for id in order {
        let label = criteria::short_label(id);
        titles.push(label.to_string());
        titles.push(format!("Comentário {label}"));
    }
    titles
}

/// Render cells as one delimited line: each cell stringified (empty for
/// missing values), internal quotes doubled, the whole cell quoted, cells
/// joined with commas.
pub fn to_delimited_line(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(|cell| quote(&cell.as_text()))
        .collect::<Vec<_>>()
        .join(",")
}

fn quoted_header_line(titles: &[String]) -> String {
    titles
        .iter()
        .map(|t| quote(t))
        .collect::<Vec<_>>()
        .join(",")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Full CSV export body: quoted header line plus one data row.
pub fn full_csv(evaluation: &Evaluation) -> String {
    format!(
        "{}\n{}",
        quoted_header_line(&full_header()),
        to_delimited_line(&full_record(evaluation))
    )
}

/// Legacy CSV export body: quoted header line plus one data row.
pub fn legacy_csv(evaluation: &Evaluation) -> String {
    format!(
        "{}\n{}",
        quoted_header_line(&legacy_header()),
        to_delimited_line(&legacy_record(evaluation))
    )
}

/// Export file name: school name with whitespace runs replaced by
/// underscores, the epoch-millis stamp, and the extension.
pub fn export_file_name(school: &str, epoch_millis: i64, extension: &str) -> String {
    let slug = school.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{slug}_{epoch_millis}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Minimal quote-doubling-aware CSV reader, enough to prove the
    /// round-trip property.
    fn parse_record(line: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut buf = String::new();
        let mut in_quotes = false;
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if ch == '"' {
                if in_quotes && i + 1 < chars.len() && chars[i + 1] == '"' {
                    buf.push('"');
                    i += 2;
                    continue;
                }
                in_quotes = !in_quotes;
                i += 1;
                continue;
            }
            if ch == ',' && !in_quotes {
                out.push(std::mem::take(&mut buf));
                i += 1;
                continue;
            }
            buf.push(ch);
            i += 1;
        }
        out.push(buf);
        out
    }

    fn evaluation() -> Evaluation {
        let mut scores = BTreeMap::new();
        let mut comments = BTreeMap::new();
        let mut photos = BTreeMap::new();
        for id in CANONICAL_ORDER {
            scores.insert(id.to_string(), 7u8);
            comments.insert(id.to_string(), String::new());
            photos.insert(id.to_string(), Vec::new());
        }
        Evaluation {
            user_name: "Maria Souza".into(),
            user_email: "maria@example.com".into(),
            school: "Colégio X".into(),
            timestamp: "01/08/2026 10:30:00".into(),
            timestamp_millis: 1_700_000_000_000,
            scores,
            comments,
            photos,
            observacoes: String::new(),
        }
    }

    #[test]
    fn test_full_record_has_34_cells() {
        assert_eq!(full_record(&evaluation()).len(), 34);
        assert_eq!(full_header().len(), 34);
    }

    #[test]
    fn test_legacy_record_has_22_cells() {
        assert_eq!(legacy_record(&evaluation()).len(), 22);
        assert_eq!(legacy_header().len(), 22);
    }

    #[test]
    fn test_every_field_is_quoted() {
        let line = to_delimited_line(&full_record(&evaluation()));
        let fields: Vec<&str> = parse_raw_fields(&line);
        assert_eq!(fields.len(), 34);
        for field in fields {
            assert!(field.starts_with('"') && field.ends_with('"'), "{field}");
        }
    }

    /// Split on commas outside quotes, keeping the quotes.
    fn parse_raw_fields(line: &str) -> Vec<&str> {
        let mut fields = Vec::new();
        let mut start = 0;
        let mut in_quotes = false;
        let bytes = line.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'"' => in_quotes = !in_quotes,
                b',' if !in_quotes => {
                    fields.push(&line[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        fields.push(&line[start..]);
        fields
    }

    #[test]
    fn test_round_trip_with_quotes_and_commas() {
        let mut evaluation = evaluation();
        evaluation.comments.insert(
            "professores".to_string(),
            "He said \"great\", really".to_string(),
        );
        evaluation
            .comments
            .insert("cantina".to_string(), "bom, barato".to_string());

        let line = to_delimited_line(&full_record(&evaluation));
        let parsed = parse_record(&line);
        assert_eq!(parsed.len(), 34);
        assert_eq!(parsed[0], "Colégio X");
        assert_eq!(parsed[5], "He said \"great\", really");
        let cantina_comment = 4 + 2 * 13 + 1; // cantina is the 14th criterion
        assert_eq!(parsed[cantina_comment], "bom, barato");
    }

    #[test]
    fn test_empty_comments_round_trip_as_empty_strings() {
        let line = to_delimited_line(&full_record(&evaluation()));
        let parsed = parse_record(&line);
        for pair in 0..15 {
            assert_eq!(parsed[4 + pair * 2], "7");
            assert_eq!(parsed[4 + pair * 2 + 1], "");
        }
    }

    #[test]
    fn test_header_titles_follow_the_order() {
        let header = full_header();
        assert_eq!(&header[0..4], &["Escola", "Avaliador", "E-mail", "Data"]);
        assert_eq!(header[4], "Professores");
        assert_eq!(header[5], "Comentário Professores");
        assert_eq!(header[6], "Alunos por sala");
        assert_eq!(header[32], "Reputação");
        assert_eq!(header[33], "Comentário Reputação");
    }

    #[test]
    fn test_csv_body_is_header_plus_one_row() {
        let body = full_csv(&evaluation());
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"Escola\","));
        assert!(lines[1].starts_with("\"Colégio X\","));
    }

    #[test]
    fn test_export_file_name_replaces_whitespace_runs() {
        assert_eq!(
            export_file_name("Colégio São João", 1_700_000_000_000, "csv"),
            "Colégio_São_João_1700000000000.csv"
        );
        assert_eq!(
            export_file_name("Escola  Nova\tCentral", 42, "pdf"),
            "Escola_Nova_Central_42.pdf"
        );
    }
}
