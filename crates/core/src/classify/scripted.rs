use crate::classify::{Classification, ClassifyError, FrameClassifier, PresenceCheck};
use crate::frames::FrameImage;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Replays canned classifications keyed by frame name. Unknown frames fail.
#[derive(Clone, Default)]
pub struct ScriptedClassifier {
    replies: HashMap<String, Classification>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, frame: &str, reply: Classification) -> Self {
        self.replies.insert(frame.to_owned(), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl FrameClassifier for ScriptedClassifier {
    fn classify<'a>(
        &'a self,
        image: &'a FrameImage,
    ) -> BoxFuture<'a, Result<Classification, ClassifyError>> {
        async move {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.replies.get(&image.name).cloned().ok_or_else(|| {
                ClassifyError::InvalidResponse(format!("no scripted reply for {}", image.name))
            })
        }
        .boxed()
    }
}

/// Presence answers keyed by frame name. Unknown frames are absent.
#[derive(Clone, Default)]
pub struct ScriptedPresence {
    present: HashSet<String>,
    failing: HashSet<String>,
    fail_all: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedPresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every check errors out.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn present_in<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.present.extend(frames.into_iter().map(Into::into));
        self
    }

    pub fn failing_in<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(frames.into_iter().map(Into::into));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl PresenceCheck for ScriptedPresence {
    fn has_talking_head<'a>(
        &'a self,
        image: &'a FrameImage,
    ) -> BoxFuture<'a, Result<bool, ClassifyError>> {
        async move {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_all || self.failing.contains(&image.name) {
                return Err(ClassifyError::InvalidResponse(format!(
                    "scripted failure for {}",
                    image.name
                )));
            }
            Ok(self.present.contains(&image.name))
        }
        .boxed()
    }
}
