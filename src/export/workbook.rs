//! # Overview Workbook
//!
//! Writes the stored-evaluation overview as an XLSX workbook: a ZIP
//! container holding the fixed SpreadsheetML part set, with one sheet of
//! inline-string and number cells. The part XML is small and fixed, so it
//! is emitted as literal strings, the same way the PDF serializer emits its
//! dictionaries.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::criteria::{self, OVERVIEW_EXPORT_ORDER};
use crate::error::ReportError;
use crate::export::Cell;
use crate::model::StoredEvaluation;

/// Fixed overview workbook file name.
pub const WORKBOOK_FILE_NAME: &str = "avaliacoes.xlsx";

const SHEET_NAME: &str = "Avaliações";

/// Header row plus one row per stored evaluation, in collection order.
/// Criteria missing from a record become empty cells, not zeros.
pub fn overview_rows(records: &[StoredEvaluation]) -> Vec<Vec<Cell>> {
    let mut rows = Vec::with_capacity(records.len() + 1);

    let mut header: Vec<Cell> = vec!["Escola".into(), "Avaliador".into(), "E-mail".into(), "Data".into()];
    for id in OVERVIEW_EXPORT_ORDER {
        header.push(criteria::short_label(id).into());
    }
    rows.push(header);

    for record in records {
        let mut row: Vec<Cell> = vec![
            record.school.as_str().into(),
            record.user_name.as_str().into(),
            record.user_email.as_str().into(),
            record.formatted_timestamp().into(),
        ];
        for id in OVERVIEW_EXPORT_ORDER {
            match record.scores.get(id) {
                Some(&score) => row.push(Cell::Int(score as i64)),
                None => row.push(Cell::Text(String::new())),
            }
        }
        rows.push(row);
    }

    rows
}

/// Serialize rows into XLSX bytes.
pub fn write_workbook(rows: &[Vec<Cell>]) -> Result<Vec<u8>, ReportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries: [(&str, String); 5] = [
        ("[Content_Types].xml", content_types_xml()),
        ("_rels/.rels", root_rels_xml()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", workbook_rels_xml()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ];

    for (name, content) in entries {
        zip.start_file(name, opts)
            .and_then(|_| zip.write_all(content.as_bytes()).map_err(Into::into))
            .map_err(|e| ReportError::Workbook(format!("{name}: {e}")))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| ReportError::Workbook(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn content_types_xml() -> String {
    concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
        "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
        "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        "<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
        "<Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
        "</Types>"
    )
    .to_string()
}

fn root_rels_xml() -> String {
    concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>",
        "</Relationships>"
    )
    .to_string()
}

fn workbook_xml() -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
            "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
            "<sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets>",
            "</workbook>"
        ),
        xml_escape(SHEET_NAME)
    )
}

fn workbook_rels_xml() -> String {
    concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>",
        "</Relationships>"
    )
    .to_string()
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
        "<sheetData>"
    ));
    for (i, row) in rows.iter().enumerate() {
        xml.push_str(&format!("<row r=\"{}\">", i + 1));
        for cell in row {
            match cell {
                Cell::Int(n) => xml.push_str(&format!("<c><v>{n}</v></c>")),
                Cell::Text(s) if s.is_empty() => xml.push_str("<c/>"),
                Cell::Text(s) => {
                    xml.push_str(&format!(
                        "<c t=\"inlineStr\"><is><t>{}</t></is></c>",
                        xml_escape(s)
                    ));
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn record(school: &str, scores: &[(&str, u8)]) -> StoredEvaluation {
        let mut stored = StoredEvaluation {
            school: school.into(),
            user_name: "Maria".into(),
            user_email: "m@example.com".into(),
            timestamp_millis: 1_700_000_000_000,
            ..Default::default()
        };
        for (id, score) in scores {
            stored.scores.insert(id.to_string(), *score);
        }
        stored
    }

    #[test]
    fn test_rows_have_13_columns() {
        let rows = overview_rows(&[record("Escola A", &[("professores", 8)])]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 13);
        assert_eq!(rows[1].len(), 13);
        assert_eq!(rows[0][12], Cell::Text("Inclusão".into()));
    }

    #[test]
    fn test_missing_scores_become_empty_cells() {
        let rows = overview_rows(&[record("Escola A", &[("professores", 8)])]);
        assert_eq!(rows[1][4], Cell::Int(8));
        assert_eq!(rows[1][5], Cell::Text(String::new()));
    }

    #[test]
    fn test_workbook_is_a_readable_zip_with_the_sheet() {
        let rows = overview_rows(&[record("Escola & Filhos", &[("professores", 8), ("inclusao", 9)])]);
        let bytes = write_workbook(&rows).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();
        assert!(sheet.contains("<t>Escola</t>"));
        assert!(sheet.contains("<t>Escola &amp; Filhos</t>"));
        assert!(sheet.contains("<v>8</v>"));
        assert!(sheet.contains("<v>9</v>"));
        archive.by_name("xl/workbook.xml").unwrap();
        archive.by_name("[Content_Types].xml").unwrap();
    }
}
