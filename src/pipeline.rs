//! Pipeline orchestration
//!
//! This module provides the public API for turning a saved coding session into
//! statistics and reports.
//!
//! Pipeline: Session JSON → Parse/Validate → Turn Log → Aggregator → Encoder

use crate::encoder::{render_statistics_text, render_turn_log_text, StatisticsEncoder};
use crate::error::CodingError;
use crate::features::compute_statistics;
use crate::session::{parse_session, SessionFile, TurnLog};
use crate::types::{Classification, CodedTurn, StatisticsSnapshot};
use chrono::Utc;
use tracing::info;

/// Convert session JSON to a statistics report JSON (stateless, one-shot).
///
/// # Arguments
/// * `session_json` - Saved session JSON
///
/// # Returns
/// Statistics report JSON string
///
/// # Example
/// ```ignore
/// let report_json = session_to_statistics(session_json)?;
/// ```
pub fn session_to_statistics(session_json: String) -> Result<String, CodingError> {
    // Stage 1: Parse and validate
    let session = parse_session(&session_json)?;

    // Stage 2: Order turns
    let log = TurnLog::from_session(&session)?;

    // Stage 3: Aggregate
    let statistics = log.statistics();

    // Stage 4: Encode
    let encoder = StatisticsEncoder::new();
    encoder.encode_to_json(&session.video_filename, log.turns(), &statistics)
}

/// Convert session JSON to the plain-text turn log report
pub fn session_to_turn_report(session_json: String) -> Result<String, CodingError> {
    let session = parse_session(&session_json)?;
    let log = TurnLog::from_session(&session)?;
    Ok(render_turn_log_text(log.turns()))
}

/// Convert session JSON to the plain-text statistics report
pub fn session_to_statistics_text(session_json: String) -> Result<String, CodingError> {
    let session = parse_session(&session_json)?;
    let log = TurnLog::from_session(&session)?;
    Ok(render_statistics_text(&log.statistics(), Utc::now()))
}

/// Stateful processor for an annotation session in progress.
///
/// Holds the turn log while turns are added, classified and deleted;
/// statistics are recomputed from the full log on every request.
pub struct CodingProcessor {
    video_filename: String,
    log: TurnLog,
    encoder: StatisticsEncoder,
}

impl CodingProcessor {
    /// Create a processor for a new, empty session
    pub fn new(video_filename: impl Into<String>) -> Self {
        Self {
            video_filename: video_filename.into(),
            log: TurnLog::new(),
            encoder: StatisticsEncoder::new(),
        }
    }

    /// Replace the current session with one loaded from JSON
    pub fn load_session(&mut self, session_json: &str) -> Result<(), CodingError> {
        let session = parse_session(session_json)?;
        self.log = TurnLog::from_session(&session)?;
        self.video_filename = session.video_filename;
        info!(
            video = %self.video_filename,
            turns = self.log.len(),
            "loaded coding session"
        );
        Ok(())
    }

    /// Save the current session to JSON
    pub fn save_session(&self) -> Result<String, CodingError> {
        self.session().to_json()
    }

    /// Current session as a session file
    pub fn session(&self) -> SessionFile {
        self.log.to_session(&self.video_filename)
    }

    /// Record a new unclassified turn at a video timestamp and return its id
    pub fn add_turn(&mut self, mut turn: CodedTurn) -> Result<u64, CodingError> {
        if self.log.get(turn.id).is_some() {
            turn.id = self.log.next_id();
        }
        let id = turn.id;
        self.log.insert(turn)?;
        Ok(id)
    }

    /// Attach the annotator's classification to a recorded turn
    pub fn classify_turn(
        &mut self,
        id: u64,
        classification: Classification,
    ) -> Result<(), CodingError> {
        self.log.classify(id, classification)
    }

    /// Delete a turn by id
    pub fn delete_turn(&mut self, id: u64) -> Result<(), CodingError> {
        self.log.remove(id).map(|_| ())
    }

    pub fn turns(&self) -> &[CodedTurn] {
        self.log.turns()
    }

    pub fn video_filename(&self) -> &str {
        &self.video_filename
    }

    /// Statistics over the current turns
    pub fn statistics(&self) -> StatisticsSnapshot {
        compute_statistics(self.log.turns())
    }

    /// Statistics report JSON over the current turns
    pub fn statistics_json(&self) -> Result<String, CodingError> {
        let statistics = self.statistics();
        self.encoder.encode_to_json(&self.video_filename, self.log.turns(), &statistics)
    }

    /// Plain-text turn log for the current turns
    pub fn turn_report(&self) -> String {
        render_turn_log_text(self.log.turns())
    }

    /// Drop all turns, keeping the video name
    pub fn clear(&mut self) {
        self.log.clear();
    }
}
