//! # Evaluation Store
//!
//! The engine only ever reads from the store: the overview fetches all
//! records of a collection and resolves per-criterion photo references.
//! Both operations sit behind traits so layout code can be exercised with
//! in-memory fakes; the shipped implementations read a JSON collection
//! file and resolve photo sources as data URIs or file paths.

use std::path::PathBuf;

use crate::error::StoreError;
use crate::model::StoredEvaluation;

/// Read access to a collection of stored evaluations.
pub trait EvaluationStore {
    fn fetch_all(&self) -> Result<Vec<StoredEvaluation>, StoreError>;
}

/// Resolves a photo reference to raw image bytes.
pub trait PhotoSource {
    fn fetch(&self, src: &str) -> Result<Vec<u8>, StoreError>;
}

/// A collection stored as a JSON array of evaluation records.
pub struct JsonCollection {
    path: PathBuf,
}

impl JsonCollection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EvaluationStore for JsonCollection {
    fn fetch_all(&self) -> Result<Vec<StoredEvaluation>, StoreError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Read(format!("{}: {}", self.path.display(), e)))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Photo source for local references.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` — data URI
/// - File path starting with `/`, `./` or `../` — reads from disk.
///   Only explicit path prefixes are treated as paths, so raw base64
///   payloads (which contain `/`) are never mistaken for files.
/// - Anything else — raw base64-encoded image data
pub struct LocalPhotoSource;

impl PhotoSource for LocalPhotoSource {
    fn fetch(&self, src: &str) -> Result<Vec<u8>, StoreError> {
        if src.starts_with("data:image/") {
            let comma = src.find(',').ok_or_else(|| StoreError::PhotoFetch {
                source_ref: display_ref(src),
                reason: "invalid data URI: missing comma".to_string(),
            })?;
            return base64_decode(&src[comma + 1..]).map_err(|reason| StoreError::PhotoFetch {
                source_ref: display_ref(src),
                reason,
            });
        }

        if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
            return std::fs::read(src).map_err(|e| StoreError::PhotoFetch {
                source_ref: display_ref(src),
                reason: e.to_string(),
            });
        }

        base64_decode(src).map_err(|reason| StoreError::PhotoFetch {
            source_ref: display_ref(src),
            reason,
        })
    }
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| format!("base64 decode error: {e}"))
}

/// Photo references can be kilobytes of base64; keep error messages short.
fn display_ref(src: &str) -> String {
    if src.chars().count() <= 48 {
        src.to_string()
    } else {
        let head: String = src.chars().take(48).collect();
        format!("{head}…")
    }
}
