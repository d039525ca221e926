//! AudioSource (C3), STTPipeline (C4), ContextStore (C5), and
//! OpportunityDetector (C6): the producer-side half of the pipeline,
//! upstream of the PipelineCoordinator.

pub mod audio;
pub mod context_store;
pub mod opportunity;
pub mod stt;

pub use audio::{AudioDevice, AudioSource, AudioSourceConfig, AudioSourceError, AudioSourceEvent, SyntheticAudioDevice};
pub use context_store::{ContextStore, ContextStoreConfig};
pub use opportunity::{OpportunityDetector, OpportunityDetectorConfig};
pub use stt::{drive_stream, normalize_transcript, synthesize_word_segments, SttError, SttPipeline, StreamEvent, StreamReconnectConfig, BATCH_STT_TIMEOUT};
