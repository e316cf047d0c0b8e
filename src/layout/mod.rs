//! # Report Layout Engine
//!
//! Lays an evaluation (or a list of stored evaluations) out onto A4 pages
//! as abstract draw operations — text at a baseline, filled rectangles,
//! placed images. The PDF serializer consumes the operations; nothing in
//! here knows about PDF syntax, which keeps the layout testable against
//! the recorded operation list.
//!
//! Layout is a single greedy top-to-bottom pass over a running vertical
//! cursor. Blocks whose height is known up front reserve their space with
//! one `ensure_space` call before drawing; photo loops check per photo
//! because each photo's display height is only known once it is loaded.
//! Once an operation is placed it is never moved — a later page break can
//! leave trailing whitespace at the bottom of a page, which is accepted.

use tracing::warn;

use crate::criteria::{self, CANONICAL_ORDER, CHART_SUBSET};
use crate::error::ChartError;
use crate::export::flat;
use crate::image::{self, NormalizedPhoto};
use crate::model::{Evaluation, StoredEvaluation};
use crate::store::PhotoSource;
use crate::text::TextMetrics;
use std::collections::BTreeMap;

/// A4 in points.
pub const PAGE_WIDTH: f64 = 595.28;
pub const PAGE_HEIGHT: f64 = 841.89;

/// Uniform page margin in points.
pub const MARGIN: f64 = 40.0;

/// An RGB color with components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }
}

/// One drawing operation on a page.
///
/// `Text` y is the baseline; `Rect` and `Image` y is the top edge, height
/// extending downward. The serializer flips to PDF's bottom-left origin.
#[derive(Debug, Clone)]
pub enum DrawOp {
    Text {
        x: f64,
        y: f64,
        text: String,
        size: f64,
        bold: bool,
        color: Color,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
    },
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        photo: NormalizedPhoto,
    },
}

/// A finished page of draw operations.
#[derive(Debug, Clone)]
pub struct Page {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

/// Tracks the vertical write position during one layout run.
///
/// Owned exclusively by that run: the cursor carries the operations of the
/// in-progress page and the finished pages, and `finish` consumes it.
#[derive(Debug)]
pub struct PageCursor {
    page_width: f64,
    page_height: f64,
    margin: f64,
    y: f64,
    ops: Vec<DrawOp>,
    pages: Vec<Page>,
}

impl PageCursor {
    pub fn new(page_width: f64, page_height: f64, margin: f64) -> Self {
        Self {
            page_width,
            page_height,
            margin,
            y: margin,
            ops: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn a4() -> Self {
        Self::new(PAGE_WIDTH, PAGE_HEIGHT, MARGIN)
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Usable width between the margins.
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    /// Break the page if `required` points of vertical space would not fit
    /// above the bottom margin. A zero-height block at the limit fits.
    pub fn ensure_space(&mut self, required: f64) {
        if self.y + required > self.page_height - self.margin {
            self.break_page();
        }
    }

    /// Consume vertical space after drawing.
    pub fn advance(&mut self, consumed: f64) {
        self.y += consumed;
    }

    /// Close the current page and start a blank one at the top margin.
    pub fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(Page {
            width: self.page_width,
            height: self.page_height,
            ops,
        });
        self.y = self.margin;
    }

    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    /// Close the in-progress page and return the run's pages. A run always
    /// yields at least one page.
    pub fn finish(mut self) -> Vec<Page> {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(Page {
            width: self.page_width,
            height: self.page_height,
            ops,
        });
        self.pages
    }
}

/// The layout engine proper: walks evaluations and emits pages.
pub struct ReportLayout {
    metrics: TextMetrics,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportLayout {
    pub fn new() -> Self {
        Self {
            metrics: TextMetrics::new(),
        }
    }

    fn text(&self, cursor: &mut PageCursor, x: f64, text: impl Into<String>, size: f64, bold: bool) {
        cursor.push(DrawOp::Text {
            x,
            y: cursor.y(),
            text: text.into(),
            size,
            bold,
            color: Color::BLACK,
        });
    }

    /// Lay out the single-evaluation report.
    ///
    /// Section order is fixed: header, the 15 criterion sections, the
    /// optional free-text block, the compact score chart, the full score
    /// chart, and the flattened-record line. The chart blocks are
    /// decorative: a failure in one is logged and skips only that block.
    pub fn layout_report(&self, evaluation: &Evaluation) -> Vec<Page> {
        let mut cursor = PageCursor::a4();
        let wrap_width = cursor.content_width();

        // Header block: 18 + 14 + 14 + 20
        cursor.ensure_space(66.0);
        self.text(&mut cursor, MARGIN, "Relatório de Avaliação", 14.0, false);
        cursor.advance(18.0);
        self.text(
            &mut cursor,
            MARGIN,
            format!("Escola: {}", evaluation.school),
            12.0,
            false,
        );
        cursor.advance(14.0);
        self.text(
            &mut cursor,
            MARGIN,
            format!(
                "Avaliador: {} ({})",
                evaluation.user_name, evaluation.user_email
            ),
            12.0,
            false,
        );
        cursor.advance(14.0);
        self.text(
            &mut cursor,
            MARGIN,
            format!("Data: {}", evaluation.timestamp),
            12.0,
            false,
        );
        cursor.advance(20.0);

        // Criterion sections in canonical order
        for id in CANONICAL_ORDER {
            let Some(&score) = evaluation.scores.get(id) else {
                continue;
            };
            // Keep the label and its score on the same page.
            cursor.ensure_space(26.0);
            self.text(&mut cursor, MARGIN, criteria::label(id), 11.0, true);
            cursor.advance(14.0);
            self.text(&mut cursor, MARGIN + 10.0, format!("Nota: {score}"), 11.0, false);
            cursor.advance(12.0);

            if let Some(comment) = evaluation.comments.get(id).filter(|c| !c.is_empty()) {
                let lines =
                    self.metrics
                        .wrap(&format!("Comentário: {comment}"), wrap_width, 11.0, false);
                for line in lines {
                    cursor.ensure_space(12.0);
                    self.text(&mut cursor, MARGIN + 10.0, line, 11.0, false);
                    cursor.advance(12.0);
                }
            }

            for photo in evaluation.photos.get(id).into_iter().flatten() {
                let (width, height) = image::fit_box(photo.width, photo.height, 200.0, 150.0);
                cursor.ensure_space(height);
                cursor.push(DrawOp::Image {
                    x: MARGIN + 20.0,
                    y: cursor.y(),
                    width,
                    height,
                    photo: photo.clone(),
                });
                cursor.advance(height + 8.0);
            }

            cursor.advance(14.0);
            cursor.ensure_space(0.0);
        }

        // Free-text block
        if !evaluation.observacoes.is_empty() {
            cursor.ensure_space(MARGIN);
            self.text(&mut cursor, MARGIN, "Observações gerais", 12.0, true);
            cursor.advance(14.0);
            for line in self.metrics.wrap(&evaluation.observacoes, wrap_width, 10.0, false) {
                cursor.ensure_space(12.0);
                self.text(&mut cursor, MARGIN, line, 10.0, false);
                cursor.advance(12.0);
            }
        }

        if let Err(err) = self.subset_chart(&mut cursor, &evaluation.scores) {
            warn!("skipping score comparison chart: {err}");
        }
        if let Err(err) = self.full_chart(&mut cursor, &evaluation.scores) {
            warn!("skipping full score chart: {err}");
        }

        self.flattened_line_block(&mut cursor, evaluation);

        cursor.finish()
    }

    /// Compact bar-row chart over the 9-criterion subset: a grey reference
    /// bar at 6/10 of the bar width under a blue bar at score/10, one row
    /// per criterion, short label at the left margin.
    fn subset_chart(
        &self,
        cursor: &mut PageCursor,
        scores: &BTreeMap<String, u8>,
    ) -> Result<(), ChartError> {
        const BAR_WIDTH: f64 = 200.0;
        const BAR_HEIGHT: f64 = 10.0;
        const REFERENCE_VALUE: f64 = 6.0;

        // Resolve every row before drawing so a failure leaves no partial block.
        let rows = Self::chart_rows(&CHART_SUBSET, scores)?;

        cursor.ensure_space(rows.len() as f64 * 18.0 + 30.0);
        self.text(
            cursor,
            MARGIN,
            "Comparação de Notas (barra azul = nota, barra cinza = referência 6)",
            12.0,
            true,
        );
        cursor.advance(16.0);

        for (id, score) in rows {
            cursor.push(DrawOp::Rect {
                x: MARGIN + 150.0,
                y: cursor.y() - 6.0,
                width: REFERENCE_VALUE / 10.0 * BAR_WIDTH,
                height: BAR_HEIGHT,
                color: Color::rgb8(200, 200, 200),
            });
            cursor.push(DrawOp::Rect {
                x: MARGIN + 150.0,
                y: cursor.y() - 6.0,
                width: score as f64 / 10.0 * BAR_WIDTH,
                height: BAR_HEIGHT,
                color: Color::rgb8(0, 123, 255),
            });
            self.text(cursor, MARGIN, criteria::short_label(id), 12.0, false);
            cursor.advance(18.0);
        }
        Ok(())
    }

    /// Full bar chart over all 15 criteria: wider bars computed from the
    /// page width, full label to the right of the bars, fixed row pitch.
    fn full_chart(
        &self,
        cursor: &mut PageCursor,
        scores: &BTreeMap<String, u8>,
    ) -> Result<(), ChartError> {
        const BAR_HEIGHT: f64 = 12.0;
        const BAR_GAP: f64 = 14.0;
        const REFERENCE_VALUE: f64 = 6.0;

        let rows = Self::chart_rows(&CANONICAL_ORDER, scores)?;

        let block_height = 18.0 + rows.len() as f64 * (BAR_HEIGHT + BAR_GAP) + 10.0;
        cursor.ensure_space(block_height);
        self.text(
            cursor,
            MARGIN,
            "Comparação visual das notas (referência 6)",
            14.0,
            true,
        );
        cursor.advance(18.0);

        let chart_width = cursor.content_width() - 150.0;
        let chart_top = cursor.y();
        for (i, &(id, score)) in rows.iter().enumerate() {
            let y_pos = chart_top + i as f64 * (BAR_HEIGHT + BAR_GAP);
            cursor.push(DrawOp::Rect {
                x: MARGIN,
                y: y_pos,
                width: REFERENCE_VALUE / 10.0 * chart_width,
                height: BAR_HEIGHT,
                color: Color::rgb8(220, 220, 220),
            });
            cursor.push(DrawOp::Rect {
                x: MARGIN,
                y: y_pos,
                width: score as f64 / 10.0 * chart_width,
                height: BAR_HEIGHT,
                color: Color::rgb8(70, 130, 180),
            });
            cursor.push(DrawOp::Text {
                x: MARGIN + chart_width + 8.0,
                y: y_pos + BAR_HEIGHT - 2.0,
                text: criteria::label(id).to_string(),
                size: 10.0,
                bold: false,
                color: Color::BLACK,
            });
        }
        cursor.advance(rows.len() as f64 * (BAR_HEIGHT + BAR_GAP) + 10.0);
        Ok(())
    }

    fn chart_rows<'a>(
        order: &'a [&'a str],
        scores: &BTreeMap<String, u8>,
    ) -> Result<Vec<(&'a str, u8)>, ChartError> {
        order
            .iter()
            .map(|id| {
                scores
                    .get(*id)
                    .map(|&score| (*id, score))
                    .ok_or_else(|| ChartError::MissingScore(id.to_string()))
            })
            .collect()
    }

    /// Small-print copy of the full 34-cell delimited line, wrapped to the
    /// page, as a copy-paste aid for spreadsheets.
    fn flattened_line_block(&self, cursor: &mut PageCursor, evaluation: &Evaluation) {
        cursor.ensure_space(3.0 * MARGIN);
        self.text(
            cursor,
            MARGIN,
            "Linha para planilha (copie e cole no Excel)",
            12.0,
            true,
        );
        cursor.advance(14.0);

        let line = flat::to_delimited_line(&flat::full_record(evaluation));
        let wrap_width = cursor.content_width();
        for piece in self.metrics.wrap(&line, wrap_width, 8.0, false) {
            cursor.ensure_space(10.0);
            self.text(cursor, MARGIN, piece, 8.0, false);
            cursor.advance(10.0);
        }
    }

    /// Lay out the multi-evaluation overview: a reduced section set per
    /// stored record — header line, date, one line per present score, then
    /// every photo the store can deliver, capped to a 150×150 box. Photo
    /// failures are logged and skipped; a page break separates records only
    /// when the next header line would not fit.
    pub fn layout_overview(
        &self,
        records: &[StoredEvaluation],
        photos: &dyn PhotoSource,
    ) -> Vec<Page> {
        let mut cursor = PageCursor::a4();

        for (idx, record) in records.iter().enumerate() {
            self.text(
                &mut cursor,
                MARGIN,
                format!(
                    "Escola: {} | Avaliador: {} ({})",
                    record.school, record.user_name, record.user_email
                ),
                12.0,
                false,
            );
            cursor.advance(14.0);
            self.text(
                &mut cursor,
                MARGIN,
                format!("Data: {}", record.formatted_timestamp()),
                12.0,
                false,
            );
            cursor.advance(14.0);

            for id in record.ordered_score_ids() {
                let score = record.scores[id];
                cursor.ensure_space(12.0);
                self.text(
                    &mut cursor,
                    MARGIN + 10.0,
                    format!("{}: {}", criteria::short_label(id), score),
                    10.0,
                    false,
                );
                cursor.advance(12.0);
            }

            for id in criteria::ordered_ids(&record.photo_urls) {
                for url in &record.photo_urls[id] {
                    let photo = match photos.fetch(url).map_err(|e| e.to_string()).and_then(
                        |bytes| image::normalize(&bytes).map_err(|e| e.to_string()),
                    ) {
                        Ok(photo) => photo,
                        Err(err) => {
                            warn!("skipping photo for criterion '{id}': {err}");
                            continue;
                        }
                    };
                    let (width, height) = image::fit_box(photo.width, photo.height, 150.0, 150.0);
                    cursor.ensure_space(height);
                    cursor.push(DrawOp::Image {
                        x: MARGIN,
                        y: cursor.y(),
                        width,
                        height,
                        photo,
                    });
                    cursor.advance(height + 5.0);
                }
            }

            cursor.advance(20.0);
            if idx < records.len() - 1 {
                cursor.ensure_space(14.0);
            }
        }

        cursor.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_starts_at_the_margin() {
        let cursor = PageCursor::a4();
        assert_eq!(cursor.y(), MARGIN);
    }

    #[test]
    fn test_ensure_space_breaks_when_block_would_overflow() {
        let mut cursor = PageCursor::a4();
        cursor.advance(PAGE_HEIGHT - MARGIN - 1.0 - cursor.y());
        assert_eq!(cursor.y(), PAGE_HEIGHT - MARGIN - 1.0);

        cursor.ensure_space(5.0);
        assert_eq!(cursor.y(), MARGIN);
        let pages = cursor.finish();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_ensure_space_zero_height_fits_at_the_limit() {
        let mut cursor = PageCursor::a4();
        cursor.advance(PAGE_HEIGHT - MARGIN - 1.0 - cursor.y());
        cursor.ensure_space(0.0);
        assert_eq!(cursor.y(), PAGE_HEIGHT - MARGIN - 1.0);
        assert_eq!(cursor.finish().len(), 1);
    }

    #[test]
    fn test_advance_accumulates() {
        let mut cursor = PageCursor::a4();
        cursor.advance(10.0);
        cursor.advance(2.5);
        assert_eq!(cursor.y(), MARGIN + 12.5);
    }

    #[test]
    fn test_finish_always_yields_a_page() {
        assert_eq!(PageCursor::a4().finish().len(), 1);
    }

    #[test]
    fn test_chart_rows_require_every_score() {
        let mut scores = BTreeMap::new();
        for id in CHART_SUBSET {
            scores.insert(id.to_string(), 5u8);
        }
        assert!(ReportLayout::chart_rows(&CHART_SUBSET, &scores).is_ok());

        scores.remove("limpeza");
        let err = ReportLayout::chart_rows(&CHART_SUBSET, &scores).unwrap_err();
        assert!(matches!(err, ChartError::MissingScore(id) if id == "limpeza"));
    }
}
