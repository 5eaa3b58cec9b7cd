use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::detector::{BackchannelEvent, DetectorConfig};

/// One fired backchannel, as kept in the session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackchannelRecord {
    pub sequence: u64,
    /// Offset from the start of the session
    pub offset_ms: u64,
    pub pause_ms: u64,
    pub utterance_ms: u64,
    pub detected_at: DateTime<Utc>,
}

impl BackchannelRecord {
    pub fn from_event(event: &BackchannelEvent, offset: Duration) -> Self {
        Self {
            sequence: event.sequence,
            offset_ms: offset.as_millis() as u64,
            pause_ms: event.pause_ms(),
            utterance_ms: event.utterance_ms(),
            detected_at: Utc::now(),
        }
    }

    /// `MM:SS.mmm` offset for console output
    pub fn offset_label(&self) -> String {
        format!(
            "{:02}:{:02}.{:03}",
            self.offset_ms / 60000,
            (self.offset_ms % 60000) / 1000,
            self.offset_ms % 1000
        )
    }
}

/// Where the session's audio came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "name")]
pub enum SessionSource {
    Microphone(String),
    File(String),
}

/// A complete detection session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub source: SessionSource,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub config: DetectorConfig,
    pub backchannels: Vec<BackchannelRecord>,

    // Stats
    pub frames_processed: u64,
    pub total_duration_ms: u64,
}

impl SessionRecord {
    pub fn new(source: SessionSource, config: DetectorConfig) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            source,
            started_at: Utc::now(),
            ended_at: None,
            config,
            backchannels: Vec::new(),
            frames_processed: 0,
            total_duration_ms: 0,
        }
    }

    pub fn add_backchannel(&mut self, record: BackchannelRecord) {
        self.backchannels.push(record);
    }

    pub fn finalize(&mut self, frames_processed: u64) {
        self.ended_at = Some(Utc::now());
        self.frames_processed = frames_processed;
        self.total_duration_ms =
            (frames_processed as f64 * self.config.frame_duration_ms()).round() as u64;
    }

    /// Backchannels per minute of processed audio
    pub fn rate_per_minute(&self) -> f64 {
        if self.total_duration_ms == 0 {
            return 0.0;
        }
        self.backchannels.len() as f64 * 60_000.0 / self.total_duration_ms as f64
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write session report {:?}", path))
    }
}
