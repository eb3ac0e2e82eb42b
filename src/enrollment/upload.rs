//! Payment screenshot: the proof file, its preview, and the upload state machine.

use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::EnrollmentResult;
use crate::error::ValidationError;

/// A payment-confirmation screenshot selected by the student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProof {
    /// Distinguishes successive selections.
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PaymentProof {
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("screenshot");
        let content_type = guess_content_type(path);
        Ok(Self::new(file_name, content_type.as_ref(), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Parsed MIME type, if the declared content type is well-formed.
    pub fn mime(&self) -> Option<mime::Mime> {
        self.content_type.parse().ok()
    }

    /// Only `image/*` files up to `max_bytes` are accepted.
    pub fn validate(&self, max_bytes: u64) -> Result<(), ValidationError> {
        let is_image = self.mime().is_some_and(|m| m.type_() == mime::IMAGE);
        if !is_image {
            return Err(ValidationError::UnsupportedFileType {
                content_type: self.content_type.clone(),
            });
        }
        if self.size() > max_bytes {
            return Err(ValidationError::FileTooLarge {
                size: self.size(),
                max_mb: max_bytes / (1024 * 1024),
            });
        }
        Ok(())
    }
}

fn guess_content_type(path: &Path) -> mime::Mime {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        Some("gif") => mime::IMAGE_GIF,
        Some("bmp") => mime::IMAGE_BMP,
        Some("svg") => mime::IMAGE_SVG,
        Some("webp") => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        Some("pdf") => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Displayable rendition of a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub proof_id: Uuid,
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
}

/// Encode the proof as a data URL. CPU-bound; run off the async threads.
pub fn decode_preview(proof: &PaymentProof) -> Preview {
    Preview {
        proof_id: proof.id,
        data_url: format!(
            "data:{};base64,{}",
            proof.content_type,
            STANDARD.encode(&proof.bytes)
        ),
    }
}

/// Coarse upload phase, for display and transition checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Idle,
    Uploading,
    Uploaded,
    Submitting,
    Succeeded,
}

impl UploadPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: UploadPhase) -> bool {
        use UploadPhase::*;
        matches!(
            (self, target),
            (Idle, Uploading)
                | (Uploading, Uploading)
                | (Uploading, Uploaded)
                | (Uploading, Idle)
                | (Uploaded, Uploading)
                | (Uploaded, Idle)
                | (Uploaded, Submitting)
                | (Submitting, Uploaded)
                | (Submitting, Succeeded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
        };
        write!(f, "{s}")
    }
}

/// Upload state with the data each phase owns.
#[derive(Debug, Clone, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading {
        proof: Arc<PaymentProof>,
    },
    Uploaded {
        proof: Arc<PaymentProof>,
        preview: Preview,
    },
    Submitting {
        proof: Arc<PaymentProof>,
        preview: Preview,
    },
    Succeeded {
        result: EnrollmentResult,
    },
}

impl UploadState {
    pub fn phase(&self) -> UploadPhase {
        match self {
            Self::Idle => UploadPhase::Idle,
            Self::Uploading { .. } => UploadPhase::Uploading,
            Self::Uploaded { .. } => UploadPhase::Uploaded,
            Self::Submitting { .. } => UploadPhase::Submitting,
            Self::Succeeded { .. } => UploadPhase::Succeeded,
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        match self {
            Self::Uploaded { preview, .. } | Self::Submitting { preview, .. } => Some(preview),
            _ => None,
        }
    }

    /// Start uploading a (validated) proof, replacing any previous one.
    pub fn begin_upload(&mut self, proof: Arc<PaymentProof>) -> Result<(), ValidationError> {
        self.guard_transition(UploadPhase::Uploading)?;
        *self = Self::Uploading { proof };
        Ok(())
    }

    /// Complete the upload. Ignored unless `preview` belongs to the proof
    /// currently uploading.
    pub fn finish_upload(&mut self, preview: Preview) -> bool {
        match self {
            Self::Uploading { proof } if proof.id == preview.proof_id => {
                let proof = Arc::clone(proof);
                *self = Self::Uploaded { proof, preview };
                true
            }
            _ => false,
        }
    }

    /// Drop the selected file. Not allowed mid-submission or after success.
    pub fn remove(&mut self) -> Result<(), ValidationError> {
        if matches!(self, Self::Idle) {
            return Ok(());
        }
        self.guard_transition(UploadPhase::Idle)?;
        *self = Self::Idle;
        Ok(())
    }

    /// Move to `Submitting`, returning the proof to send.
    pub fn begin_submit(&mut self) -> Result<Arc<PaymentProof>, ValidationError> {
        match std::mem::take(self) {
            Self::Uploaded { proof, preview } => {
                *self = Self::Submitting {
                    proof: Arc::clone(&proof),
                    preview,
                };
                Ok(proof)
            }
            other => {
                let err = match other.phase() {
                    UploadPhase::Submitting => ValidationError::SubmissionInProgress,
                    UploadPhase::Succeeded => ValidationError::AlreadySubmitted,
                    _ => ValidationError::UploadMissing,
                };
                *self = other;
                Err(err)
            }
        }
    }

    /// Return to `Uploaded` after a failed submission; the preview survives.
    pub fn fail_submit(&mut self) {
        if let Self::Submitting { proof, preview } = std::mem::take(self) {
            *self = Self::Uploaded { proof, preview };
        } else {
            tracing::warn!("fail_submit called outside of Submitting");
        }
    }

    pub fn succeed(&mut self, result: EnrollmentResult) {
        debug_assert_eq!(self.phase(), UploadPhase::Submitting);
        *self = Self::Succeeded { result };
    }

    fn guard_transition(&self, target: UploadPhase) -> Result<(), ValidationError> {
        let phase = self.phase();
        if phase.can_transition_to(target) {
            return Ok(());
        }
        Err(match phase {
            UploadPhase::Submitting => ValidationError::SubmissionInProgress,
            _ => ValidationError::AlreadySubmitted,
        })
    }
}
