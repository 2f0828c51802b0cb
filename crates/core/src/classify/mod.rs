mod azure;
mod parse;
mod scripted;

use crate::frames::FrameImage;
use crate::roles::{FrameRole, Role};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use azure::AzureVisionClient;
pub use parse::{extract_json_object, parse_classification, parse_presence};
pub use scripted::{ScriptedClassifier, ScriptedPresence};

pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// What the vision model said about one frame, already coerced into range.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub role: Role,
    pub confidence: f64,
    pub explanation: String,
    pub primary_ratio: f64,
    pub supporting_ratio: f64,
}

impl Classification {
    /// Substitute used whenever a frame could not be classified.
    pub fn fallback() -> Self {
        Self {
            role: Role::Supporting,
            confidence: FALLBACK_CONFIDENCE,
            explanation: String::new(),
            primary_ratio: 0.0,
            supporting_ratio: 1.0,
        }
    }

    pub fn into_frame_role(self, frame: impl Into<String>) -> (FrameRole, String) {
        let fr = FrameRole::new(
            frame,
            self.role,
            self.confidence,
            self.primary_ratio,
            self.supporting_ratio,
        );
        (fr, self.explanation)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClassifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub trait FrameClassifier: Send + Sync {
    fn classify<'a>(
        &'a self,
        image: &'a FrameImage,
    ) -> BoxFuture<'a, Result<Classification, ClassifyError>>;
}

/// Answers "is someone talking to the camera in this frame?".
pub trait PresenceCheck: Send + Sync {
    fn has_talking_head<'a>(
        &'a self,
        image: &'a FrameImage,
    ) -> BoxFuture<'a, Result<bool, ClassifyError>>;
}

pub async fn classify_or_fallback<C>(classifier: &C, image: &FrameImage) -> Classification
where
    C: FrameClassifier + ?Sized,
{
    match classifier.classify(image).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(frame = %image.name, error = %e, "classification failed, using fallback");
            Classification::fallback()
        }
    }
}

/// A failed presence check counts as "nobody on camera".
pub async fn presence_or_absent<P>(presence: &P, image: &FrameImage) -> bool
where
    P: PresenceCheck + ?Sized,
{
    match presence.has_talking_head(image).await {
        Ok(present) => present,
        Err(e) => {
            tracing::warn!(frame = %image.name, error = %e, "presence check failed, treating as absent");
            false
        }
    }
}
