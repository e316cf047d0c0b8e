//! # Avalia
//!
//! A school-evaluation report engine. One submitted evaluation — 1–10
//! scores, comments and photos for 15 fixed criteria plus a free-text
//! field — becomes a paginated PDF report and a flat CSV export. A
//! collection of stored evaluations becomes a per-school averages view, a
//! multi-record overview PDF and an XLSX workbook.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/CLI)
//!       ↓
//!   [model]     — evaluation types, validation, photo assembly
//!       ↓
//!   [image]     — decode, 800-box resize, JPEG re-encode
//!       ↓
//!   [layout]    — PageCursor + report layout → pages of draw ops
//!       ↓
//!   [pdf]       — serialize pages to PDF bytes
//!       ↓
//!   [export]    — flattened CSV record / XLSX workbook
//! ```
//!
//! Layout is greedy and single-pass: content flows top to bottom behind a
//! vertical cursor, page breaks happen the moment a block (or a single
//! photo) would overflow, and placed content never moves.

pub mod aggregate;
pub mod criteria;
pub mod error;
pub mod export;
pub mod image;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod store;
pub mod text;

use layout::ReportLayout;
use model::{Evaluation, StoredEvaluation};
use pdf::PdfWriter;
use store::PhotoSource;

/// Fixed file name of the multi-evaluation overview PDF.
pub const OVERVIEW_PDF_FILE_NAME: &str = "relatorio_avaliacoes.pdf";

/// Render the single-evaluation report to PDF bytes.
///
/// This is the primary entry point of the submission path. The evaluation
/// must already be assembled (photos normalized); the bytes are only
/// returned once the whole layout pass has completed.
pub fn render_report(evaluation: &Evaluation) -> Vec<u8> {
    let layout = ReportLayout::new();
    let pages = layout.layout_report(evaluation);
    PdfWriter::new().write(&pages, "Relatório de Avaliação")
}

/// Render the multi-evaluation overview to PDF bytes, fetching stored
/// photos through `photos`.
pub fn render_overview(records: &[StoredEvaluation], photos: &dyn PhotoSource) -> Vec<u8> {
    let layout = ReportLayout::new();
    let pages = layout.layout_overview(records, photos);
    PdfWriter::new().write(&pages, "Relatório de Avaliações")
}
