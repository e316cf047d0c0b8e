//! # Evaluation Model
//!
//! The input representation for the report engine. An [`EvaluationForm`] is
//! the raw submission as it comes off the wire (JSON, camelCase keys);
//! validation and photo normalization turn it into an immutable
//! [`Evaluation`] that one render pass consumes. Stored evaluations read
//! back from the collection use their own type because the stored schema is
//! a superset of the submission schema.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::criteria::{self, CANONICAL_ORDER};
use crate::error::ValidationError;
use crate::image::{self, NormalizedPhoto};
use crate::store::PhotoSource;

/// Photos accepted per criterion; anything beyond is dropped at assembly.
pub const MAX_PHOTOS_PER_CRITERION: usize = 3;

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// A raw form submission: identity fields, per-criterion scores, comments
/// and photo sources, plus the free-text field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationForm {
    pub user_name: String,
    pub user_email: String,
    pub school: String,
    #[serde(default)]
    pub scores: BTreeMap<String, i64>,
    #[serde(default)]
    pub comments: BTreeMap<String, String>,
    /// Photo sources per criterion: file paths or `data:image/...` URIs.
    #[serde(default)]
    pub photos: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub observacoes: String,
}

impl EvaluationForm {
    /// Check the submission before any processing: identity fields must be
    /// non-blank and every canonical criterion needs a score in 1..=10.
    /// Both bounds are accepted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_name.trim().is_empty() {
            return Err(ValidationError::MissingField("userName"));
        }
        if self.user_email.trim().is_empty() {
            return Err(ValidationError::MissingField("userEmail"));
        }
        if self.school.trim().is_empty() {
            return Err(ValidationError::MissingField("school"));
        }
        for id in CANONICAL_ORDER {
            match self.scores.get(id) {
                None => return Err(ValidationError::MissingScore(id.to_string())),
                Some(&value) if !(1..=10).contains(&value) => {
                    return Err(ValidationError::ScoreOutOfRange {
                        criterion: id.to_string(),
                        value,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Validate and assemble the immutable evaluation, loading and
    /// normalizing photos one at a time in submission order. A photo that
    /// fails to load or decode is logged and skipped; it never aborts the
    /// submission. At most [`MAX_PHOTOS_PER_CRITERION`] photos per
    /// criterion survive.
    pub fn assemble(&self, photos: &dyn PhotoSource) -> Result<Evaluation, ValidationError> {
        self.validate()?;

        let now = Local::now();
        let mut scores = BTreeMap::new();
        let mut comments = BTreeMap::new();
        let mut photo_map = BTreeMap::new();

        for id in CANONICAL_ORDER {
            scores.insert(id.to_string(), self.scores[id] as u8);
            let comment = self
                .comments
                .get(id)
                .map(|c| c.trim().to_string())
                .unwrap_or_default();
            comments.insert(id.to_string(), comment);

            let mut normalized = Vec::new();
            let sources = self.photos.get(id).map(Vec::as_slice).unwrap_or(&[]);
            for src in sources.iter().take(MAX_PHOTOS_PER_CRITERION) {
                let bytes = match photos.fetch(src) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!("skipping photo for criterion '{id}': {err}");
                        continue;
                    }
                };
                match image::normalize(&bytes) {
                    Ok(photo) => normalized.push(photo),
                    Err(err) => warn!("skipping photo for criterion '{id}': {err}"),
                }
            }
            photo_map.insert(id.to_string(), normalized);
        }

        Ok(Evaluation {
            user_name: self.user_name.trim().to_string(),
            user_email: self.user_email.trim().to_string(),
            school: self.school.trim().to_string(),
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            timestamp_millis: now.timestamp_millis(),
            scores,
            comments,
            photos: photo_map,
            observacoes: self.observacoes.trim().to_string(),
        })
    }
}

/// A validated, assembled evaluation. Built once per submission, immutable
/// thereafter, consumed by exactly one report generation pass.
///
/// Invariants: every canonical criterion has entries in `scores`,
/// `comments` (possibly empty) and `photos` (at most
/// [`MAX_PHOTOS_PER_CRITERION`] each); scores are within 1..=10.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub user_name: String,
    pub user_email: String,
    pub school: String,
    /// Local date-time string shown in the report header.
    pub timestamp: String,
    /// Epoch milliseconds, used for export file names.
    pub timestamp_millis: i64,
    pub scores: BTreeMap<String, u8>,
    pub comments: BTreeMap<String, String>,
    pub photos: BTreeMap<String, Vec<NormalizedPhoto>>,
    pub observacoes: String,
}

/// An evaluation read back from the store. The criterion set is a superset
/// of the submission form's — overview rendering must not assume the
/// canonical 15.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvaluation {
    pub school: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    /// Store-native timestamp in epoch milliseconds; 0 when absent.
    #[serde(default)]
    pub timestamp_millis: i64,
    #[serde(default)]
    pub scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub comments: BTreeMap<String, String>,
    #[serde(default)]
    pub photo_urls: BTreeMap<String, Vec<String>>,
}

impl StoredEvaluation {
    /// Local date-time string for the overview, empty when the record has
    /// no usable timestamp.
    pub fn formatted_timestamp(&self) -> String {
        if self.timestamp_millis <= 0 {
            return String::new();
        }
        Local
            .timestamp_millis_opt(self.timestamp_millis)
            .single()
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default()
    }

    /// Score ids in deterministic render order: canonical criteria first,
    /// then ids outside the canonical set lexicographically.
    pub fn ordered_score_ids(&self) -> Vec<&str> {
        criteria::ordered_ids(&self.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalPhotoSource;

    fn complete_form() -> EvaluationForm {
        let mut form = EvaluationForm {
            user_name: "Maria Souza".into(),
            user_email: "maria@example.com".into(),
            school: "Colégio X".into(),
            ..Default::default()
        };
        for id in CANONICAL_ORDER {
            form.scores.insert(id.to_string(), 7);
        }
        form
    }

    #[test]
    fn test_complete_form_validates() {
        assert!(complete_form().validate().is_ok());
    }

    #[test]
    fn test_blank_identity_fields_are_rejected() {
        let mut form = complete_form();
        form.school = "   ".into();
        assert!(matches!(
            form.validate(),
            Err(ValidationError::MissingField("school"))
        ));
    }

    #[test]
    fn test_score_bounds_are_inclusive() {
        for accepted in [1, 10] {
            let mut form = complete_form();
            form.scores.insert("limpeza".to_string(), accepted);
            assert!(form.validate().is_ok(), "score {accepted} must pass");
        }
        for rejected in [0, 11, -1] {
            let mut form = complete_form();
            form.scores.insert("limpeza".to_string(), rejected);
            assert!(
                matches!(form.validate(), Err(ValidationError::ScoreOutOfRange { .. })),
                "score {rejected} must fail"
            );
        }
    }

    #[test]
    fn test_missing_score_is_rejected() {
        let mut form = complete_form();
        form.scores.remove("cantina");
        assert!(matches!(
            form.validate(),
            Err(ValidationError::MissingScore(id)) if id == "cantina"
        ));
    }

    #[test]
    fn test_non_numeric_score_fails_at_parse() {
        let raw = r#"{
            "userName": "Maria",
            "userEmail": "m@example.com",
            "school": "Colégio X",
            "scores": { "professores": "abc" }
        }"#;
        assert!(serde_json::from_str::<EvaluationForm>(raw).is_err());
    }

    #[test]
    fn test_assemble_fills_empty_comment_and_photo_entries() {
        let evaluation = complete_form().assemble(&LocalPhotoSource).unwrap();
        for id in CANONICAL_ORDER {
            assert_eq!(evaluation.comments[id], "");
            assert!(evaluation.photos[id].is_empty());
        }
        assert_eq!(evaluation.scores.len(), 15);
        assert!(evaluation.timestamp_millis > 0);
    }

    #[test]
    fn test_assemble_skips_undecodable_photo() {
        use base64::Engine;

        let garbage = base64::engine::general_purpose::STANDARD.encode(b"not an image");
        let mut form = complete_form();
        form.photos.insert(
            "estrutura".to_string(),
            vec![format!("data:image/jpeg;base64,{garbage}")],
        );

        let evaluation = form.assemble(&LocalPhotoSource).unwrap();
        assert!(evaluation.photos["estrutura"].is_empty());
    }

    #[test]
    fn test_assemble_caps_photos_at_three() {
        use base64::Engine;

        let img = ::image::RgbImage::from_pixel(4, 4, ::image::Rgb([10, 20, 30]));
        let mut jpeg = Vec::new();
        ::image::codecs::jpeg::JpegEncoder::new(&mut jpeg)
            .encode(img.as_raw(), 4, 4, ::image::ColorType::Rgb8)
            .unwrap();
        let uri = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&jpeg)
        );

        let mut form = complete_form();
        form.photos
            .insert("esportes".to_string(), vec![uri.clone(), uri.clone(), uri.clone(), uri]);

        let evaluation = form.assemble(&LocalPhotoSource).unwrap();
        assert_eq!(evaluation.photos["esportes"].len(), 3);
    }

    #[test]
    fn test_stored_ordering_lists_unknown_ids_last() {
        let mut stored = StoredEvaluation {
            school: "Escola A".into(),
            ..Default::default()
        };
        stored.scores.insert("inclusao".to_string(), 9);
        stored.scores.insert("professores".to_string(), 8);
        stored.scores.insert("reputacao".to_string(), 6);
        assert_eq!(
            stored.ordered_score_ids(),
            vec!["professores", "reputacao", "inclusao"]
        );
    }

    #[test]
    fn test_stored_timestamp_formatting() {
        let stored = StoredEvaluation {
            school: "Escola A".into(),
            timestamp_millis: 0,
            ..Default::default()
        };
        assert_eq!(stored.formatted_timestamp(), "");

        let stored = StoredEvaluation {
            timestamp_millis: 1_700_000_000_000,
            ..stored
        };
        let formatted = stored.formatted_timestamp();
        assert!(!formatted.is_empty());
        assert!(formatted.contains('/'));
    }
}
