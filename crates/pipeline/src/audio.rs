//! AudioSource (C3): produces `AudioFrame`s from a named device (or a
//! synthetic source for tests) with gated auto-reconnect.
//!
//! Grounded on the teacher's event-driven producer pattern
//! (`pipeline/orchestrator.rs`'s `PipelineEvent` enum fed by a
//! `tokio::sync::mpsc` channel) generalized from VAD/STT/TTS events to
//! the spec's `data/error/reconnecting/reconnected` surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use castbot_core::AudioFrame;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct AudioSourceConfig {
    pub auto_reconnect: bool,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub max_attempts: u32,
}

impl Default for AudioSourceConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AudioSourceEvent {
    Data(AudioFrame),
    Error(String),
    Reconnecting { attempt: u32 },
    Reconnected,
}

#[derive(Debug, Error)]
pub enum AudioSourceError {
    #[error("failed to open device {0}")]
    DeviceUnavailable(String),
}

impl From<AudioSourceError> for castbot_core::Error {
    fn from(err: AudioSourceError) -> Self {
        castbot_core::Error::Internal(err.to_string())
    }
}

/// Abstracts a device (or synthetic generator) that yields raw frames
/// one capture cycle at a time; implementations may fail transiently
/// (`Err` is treated as a transport error subject to reconnect).
#[async_trait::async_trait]
pub trait AudioDevice: Send + Sync {
    async fn open(&self) -> Result<(), AudioSourceError>;
    async fn capture_one(&self) -> Result<AudioFrame, String>;
    async fn close(&self);
}

/// Synthetic device for tests: yields frames from a fixed queue, then
/// errors forever (simulating an unplugged device) unless refilled.
pub struct SyntheticAudioDevice {
    frames: parking_lot::Mutex<std::collections::VecDeque<AudioFrame>>,
    fail_after_empty: bool,
}

impl SyntheticAudioDevice {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self { frames: parking_lot::Mutex::new(frames.into()), fail_after_empty: true }
    }

    pub fn push(&self, frame: AudioFrame) {
        self.frames.lock().push_back(frame);
    }
}

#[async_trait::async_trait]
impl AudioDevice for SyntheticAudioDevice {
    async fn open(&self) -> Result<(), AudioSourceError> {
        Ok(())
    }

    async fn capture_one(&self) -> Result<AudioFrame, String> {
        match self.frames.lock().pop_front() {
            Some(frame) => Ok(frame),
            None if self.fail_after_empty => Err("no more frames".to_string()),
            None => std::future::pending().await,
        }
    }

    async fn close(&self) {}
}

/// Drives an `AudioDevice`, emitting `AudioSourceEvent`s on a bounded
/// channel and reconnecting with exponential backoff on transport
/// error, gated by `config.auto_reconnect` (spec §4.3).
pub struct AudioSource<D: AudioDevice> {
    device: Arc<D>,
    config: AudioSourceConfig,
    stopped: Arc<AtomicBool>,
}

impl<D: AudioDevice + 'static> AudioSource<D> {
    pub fn new(device: Arc<D>, config: AudioSourceConfig) -> Self {
        Self { device, config, stopped: Arc::new(AtomicBool::new(false)) }
    }

    /// Opens the device and starts emitting. Startup errors surface
    /// synchronously; errors after startup are emitted as events
    /// (spec §4.3).
    pub async fn start(&self, channel_capacity: usize) -> Result<mpsc::Receiver<AudioSourceEvent>, AudioSourceError> {
        self.device.open().await?;
        let (tx, rx) = mpsc::channel(channel_capacity);

        let device = self.device.clone();
        let config = self.config;
        let stopped = self.stopped.clone();
        self.stopped.store(false, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                match device.capture_one().await {
                    Ok(frame) => {
                        attempt = 0;
                        // backpressure: a full channel suspends the producer rather
                        // than dropping the frame (spec §5).
                        if tx.send(AudioSourceEvent::Data(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(message) => {
                        let _ = tx.send(AudioSourceEvent::Error(message.clone())).await;
                        if !config.auto_reconnect || attempt >= config.max_attempts {
                            warn!(%message, "audio source exhausted reconnect attempts");
                            break;
                        }
                        attempt += 1;
                        let _ = tx.send(AudioSourceEvent::Reconnecting { attempt }).await;
                        let delay = backoff_delay(attempt, config.backoff_base, config.backoff_cap);
                        tokio::time::sleep(delay).await;
                        if device.open().await.is_ok() {
                            let _ = tx.send(AudioSourceEvent::Reconnected).await;
                        }
                    }
                }
            }
            device.close().await;
        });

        Ok(rx)
    }

    /// Ceases emission and releases the device within a bounded time.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.device.close().await;
        info!("audio source stopped");
    }
}

fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let scaled = base.saturating_mul(1u32 << attempt.min(16));
    scaled.min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use castbot_core::{Channels, SampleRate};

    fn frame() -> AudioFrame {
        AudioFrame::new(vec![0u8; 320], SampleRate::HZ_16K, Channels::Mono)
    }

    #[tokio::test]
    async fn emits_data_events_for_queued_frames() {
        let device = Arc::new(SyntheticAudioDevice::new(vec![frame(), frame()]));
        let source = AudioSource::new(device, AudioSourceConfig { auto_reconnect: false, ..Default::default() });
        let mut rx = source.start(8).await.unwrap();

        let mut data_count = 0;
        while let Some(event) = rx.recv().await {
            match event {
                AudioSourceEvent::Data(_) => data_count += 1,
                AudioSourceEvent::Error(_) => break,
                _ => {}
            }
        }
        assert_eq!(data_count, 2);
    }

    #[test]
    fn backoff_is_capped() {
        let base = Duration::from_millis(100);
        let cap = Duration::from_secs(1);
        assert!(backoff_delay(20, base, cap) <= cap);
    }

    #[tokio::test]
    async fn stop_halts_further_emission() {
        let device = Arc::new(SyntheticAudioDevice::new(vec![frame()]));
        let source = AudioSource::new(device, AudioSourceConfig::default());
        let _rx = source.start(8).await.unwrap();
        source.stop().await;
        assert!(source.stopped.load(Ordering::SeqCst));
    }
}
