//! Fixed-response transcriber for testing audio-response scoring.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use examkit_core::traits::AudioTranscriber;

/// A transcriber that answers from a clip-to-transcript map, with call
/// counting so tests can assert the engine actually transcribed.
pub struct FixedTranscriber {
    transcripts: HashMap<String, String>,
    call_count: AtomicU32,
}

impl FixedTranscriber {
    pub fn new(transcripts: HashMap<String, String>) -> Self {
        Self {
            transcripts,
            call_count: AtomicU32::new(0),
        }
    }

    /// A transcriber knowing a single clip.
    pub fn with_clip(clip: &str, transcript: &str) -> Self {
        Self::new(HashMap::from([(clip.to_string(), transcript.to_string())]))
    }

    /// A transcriber that fails every request.
    pub fn failing() -> Self {
        Self::new(HashMap::new())
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AudioTranscriber for FixedTranscriber {
    async fn transcribe(&self, clip: &str) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.transcripts
            .get(clip)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no transcript available for clip {clip}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_clip_transcribes() {
        let t = FixedTranscriber::with_clip("clip-1", "hello world");
        assert_eq!(t.transcribe("clip-1").await.unwrap(), "hello world");
        assert!(t.transcribe("clip-2").await.is_err());
        assert_eq!(t.call_count(), 2);
    }
}
