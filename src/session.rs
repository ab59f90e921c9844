//! Coding sessions and the turn log
//!
//! A session file is the JSON document the annotation tool saves and reloads:
//! the source video name, when the analysis was made, and every recorded turn.
//! The turn log keeps those turns ordered by video timestamp while the
//! annotator adds, classifies and deletes them.

use crate::error::CodingError;
use crate::features::compute_statistics;
use crate::scheme;
use crate::types::{Classification, CodedTurn, StatisticsSnapshot, TurnCoding};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Saved annotation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    /// Name of the video the turns were coded from
    pub video_filename: String,
    /// When the session was saved; unreadable values load as `None`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_analysis_date"
    )]
    pub analysis_date: Option<DateTime<Utc>>,
    /// Recorded turns
    pub turns: Vec<CodedTurn>,
}

/// A flagged strategy id that the coding scheme does not know
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownStrategy {
    pub turn_id: u64,
    pub strategy_id: String,
}

/// Parse a session JSON string.
///
/// The document must carry a non-empty `videoFilename` and a `turns` array.
pub fn parse_session(json: &str) -> Result<SessionFile, CodingError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| CodingError::ParseError(e.to_string()))?;

    let has_filename = value
        .get("videoFilename")
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.trim().is_empty());
    if !has_filename {
        return Err(CodingError::MissingField("videoFilename".to_string()));
    }

    if !value.get("turns").is_some_and(|v| v.is_array()) {
        return Err(CodingError::MissingField("turns".to_string()));
    }

    serde_json::from_value(value)
        .map_err(|e| CodingError::ParseError(format!("Invalid session: {}", e)))
}

/// `analysisDate` is informational only, so a value that is not an RFC3339
/// timestamp or a `YYYY-MM-DD` date is dropped instead of rejecting the session.
fn lenient_analysis_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let parsed = raw.as_str().and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            })
    });

    if parsed.is_none() {
        warn!(analysis_date = %raw, "unreadable analysisDate, ignored");
    }
    Ok(parsed)
}

impl SessionFile {
    /// Start an empty session for a video
    pub fn new(video_filename: impl Into<String>) -> Self {
        Self {
            video_filename: video_filename.into(),
            analysis_date: None,
            turns: Vec::new(),
        }
    }

    /// Check turn shape before the turns reach the aggregator.
    ///
    /// Rejects negative or non-finite timestamps and duplicate ids. Unknown
    /// strategy ids are only logged; the aggregator ignores them.
    pub fn validate(&self) -> Result<(), CodingError> {
        validate_turns(&self.turns)?;

        for unknown in self.unknown_strategies() {
            warn!(
                turn_id = unknown.turn_id,
                strategy_id = %unknown.strategy_id,
                "strategy id not in coding scheme, ignored for style statistics"
            );
        }

        Ok(())
    }

    /// Flagged strategy ids missing from the coding scheme
    pub fn unknown_strategies(&self) -> Vec<UnknownStrategy> {
        self.turns
            .iter()
            .filter_map(|t| t.classification().map(|c| (t.id, c)))
            .flat_map(|(turn_id, c)| {
                c.active_strategies()
                    .filter(|id| scheme::strategy(id).is_none())
                    .map(move |id| UnknownStrategy {
                        turn_id,
                        strategy_id: id.to_string(),
                    })
            })
            .collect()
    }

    /// Serialize to pretty-printed JSON for saving
    pub fn to_json(&self) -> Result<String, CodingError> {
        serde_json::to_string_pretty(self).map_err(CodingError::JsonError)
    }
}

fn validate_turns(turns: &[CodedTurn]) -> Result<(), CodingError> {
    let mut seen = HashSet::with_capacity(turns.len());
    for turn in turns {
        validate_timestamp(turn)?;
        if !seen.insert(turn.id) {
            return Err(CodingError::DuplicateTurnId(turn.id));
        }
    }
    Ok(())
}

fn validate_timestamp(turn: &CodedTurn) -> Result<(), CodingError> {
    if !turn.timestamp.is_finite() || turn.timestamp < 0.0 {
        return Err(CodingError::InvalidTimestamp {
            id: turn.id,
            timestamp: turn.timestamp,
        });
    }
    Ok(())
}

/// Ordered log of recorded turns.
///
/// Turns are kept sorted by timestamp; turns sharing a timestamp stay in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct TurnLog {
    turns: Vec<CodedTurn>,
}

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from imported turns, validating and ordering them
    pub fn from_turns(mut turns: Vec<CodedTurn>) -> Result<Self, CodingError> {
        validate_turns(&turns)?;
        turns.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(Self { turns })
    }

    /// Build a log from a session file
    pub fn from_session(session: &SessionFile) -> Result<Self, CodingError> {
        session.validate()?;
        Self::from_turns(session.turns.clone())
    }

    /// Insert a turn at its timestamp position
    pub fn insert(&mut self, turn: CodedTurn) -> Result<(), CodingError> {
        validate_timestamp(&turn)?;
        if self.get(turn.id).is_some() {
            return Err(CodingError::DuplicateTurnId(turn.id));
        }
        let index = self
            .turns
            .partition_point(|t| t.timestamp <= turn.timestamp);
        self.turns.insert(index, turn);
        Ok(())
    }

    /// Delete a turn by id
    pub fn remove(&mut self, id: u64) -> Result<CodedTurn, CodingError> {
        let index = self
            .turns
            .iter()
            .position(|t| t.id == id)
            .ok_or(CodingError::TurnNotFound(id))?;
        Ok(self.turns.remove(index))
    }

    /// Attach (or replace) the classification of a turn
    pub fn classify(&mut self, id: u64, classification: Classification) -> Result<(), CodingError> {
        let turn = self
            .turns
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(CodingError::TurnNotFound(id))?;
        turn.classification = TurnCoding::Classified(classification);
        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<&CodedTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn turns(&self) -> &[CodedTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// An id greater than every id in the log
    pub fn next_id(&self) -> u64 {
        self.turns.iter().map(|t| t.id).max().map_or(1, |max| max + 1)
    }

    /// Recompute statistics over the current turns
    pub fn statistics(&self) -> StatisticsSnapshot {
        compute_statistics(&self.turns)
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Snapshot the log as a session file stamped with the current time
    pub fn to_session(&self, video_filename: &str) -> SessionFile {
        SessionFile {
            video_filename: video_filename.to_string(),
            analysis_date: Some(Utc::now()),
            turns: self.turns.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::CommunicationMode;
    use pretty_assertions::assert_eq;

    fn sample_session_json() -> &'static str {
        r#"{
            "videoFilename": "playtime_session_03.mp4",
            "analysisDate": "2024-05-01T10:15:00.000Z",
            "turns": [
                {
                    "id": 1714558000001,
                    "timestamp": 4.2,
                    "parentAction": "holds up a toy car",
                    "parentSpeech": "what is this?",
                    "childSpeech": "car",
                    "childAction": "reaches for the car",
                    "eyeContact": true,
                    "overlappingDialogue": false,
                    "classification": {
                        "communicationMode": "VERBAL (VT)",
                        "vocalizationType": "SV",
                        "sharedAttention": "OBSERVED",
                        "parentCommunication": { "closedQuestions": true, "repeat": false },
                        "isInadequate": false,
                        "childProvidesNewInfo": false,
                        "childUnderstandsSemantic": "SI",
                        "usesOnlyAuditoryChannel": false,
                        "isEyeContactAdequate": true
                    }
                },
                {
                    "id": 1714558000002,
                    "timestamp": 9.75,
                    "parentAction": "",
                    "parentSpeech": "good job!",
                    "childSpeech": "",
                    "childAction": "claps",
                    "eyeContact": false,
                    "overlappingDialogue": true,
                    "classification": null
                }
            ]
        }"#
    }

    #[test]
    fn test_parse_session() {
        let session = parse_session(sample_session_json()).unwrap();
        assert_eq!(session.video_filename, "playtime_session_03.mp4");
        assert!(session.analysis_date.is_some());
        assert_eq!(session.turns.len(), 2);
        assert!(session.turns[0].classification.is_classified());
        assert!(!session.turns[1].classification.is_classified());
        assert!(session.validate().is_ok());
    }

    #[test]
    fn test_parse_session_requires_filename_and_turns() {
        let missing_name = r#"{ "turns": [] }"#;
        assert!(matches!(
            parse_session(missing_name),
            Err(CodingError::MissingField(f)) if f == "videoFilename"
        ));

        let missing_turns = r#"{ "videoFilename": "a.mp4" }"#;
        assert!(matches!(
            parse_session(missing_turns),
            Err(CodingError::MissingField(f)) if f == "turns"
        ));

        let turns_not_array = r#"{ "videoFilename": "a.mp4", "turns": {} }"#;
        assert!(parse_session(turns_not_array).is_err());

        assert!(matches!(
            parse_session("not json"),
            Err(CodingError::ParseError(_))
        ));
    }

    #[test]
    fn test_analysis_date_is_parsed_leniently() {
        let with_date = |date: &str| {
            format!(r#"{{ "videoFilename": "a.mp4", "analysisDate": {date}, "turns": [] }}"#)
        };

        let session = parse_session(&with_date(r#""2024-05-01""#)).unwrap();
        assert_eq!(
            session.analysis_date.unwrap().to_rfc3339(),
            "2024-05-01T00:00:00+00:00"
        );

        for unreadable in [r#""yesterday""#, "1714558000", "null", r#"{"day": 1}"#] {
            let session = parse_session(&with_date(unreadable)).unwrap();
            assert_eq!(session.analysis_date, None, "analysisDate {unreadable}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_turns() {
        let mut session = SessionFile::new("clip.mp4");
        session.turns.push(CodedTurn::new(1, -1.0));
        assert!(matches!(
            session.validate(),
            Err(CodingError::InvalidTimestamp { id: 1, .. })
        ));

        session.turns = vec![CodedTurn::new(1, f64::NAN)];
        assert!(session.validate().is_err());

        session.turns = vec![CodedTurn::new(2, 1.0), CodedTurn::new(2, 3.0)];
        assert!(matches!(
            session.validate(),
            Err(CodingError::DuplicateTurnId(2))
        ));
    }

    #[test]
    fn test_unknown_strategies_are_reported_not_rejected() {
        let mut c = Classification::with_mode(CommunicationMode::Verbal);
        c.flag_strategy("repeat");
        c.flag_strategy("legacyStrategy");
        let mut session = SessionFile::new("clip.mp4");
        session.turns.push(CodedTurn::new(5, 1.0).classified(c));

        assert!(session.validate().is_ok());
        assert_eq!(
            session.unknown_strategies(),
            vec![UnknownStrategy {
                turn_id: 5,
                strategy_id: "legacyStrategy".to_string()
            }]
        );
    }

    #[test]
    fn test_session_json_round_trip() {
        let session = parse_session(sample_session_json()).unwrap();
        let json = session.to_json().unwrap();
        let reparsed = parse_session(&json).unwrap();
        assert_eq!(reparsed, session);
    }

    #[test]
    fn test_turn_log_keeps_timestamp_order_with_stable_ties() {
        let mut log = TurnLog::new();
        log.insert(CodedTurn::new(1, 10.0)).unwrap();
        log.insert(CodedTurn::new(2, 2.0)).unwrap();
        log.insert(CodedTurn::new(3, 10.0)).unwrap();
        log.insert(CodedTurn::new(4, 5.5)).unwrap();

        let ids: Vec<u64> = log.turns().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_turn_log_insert_rejects_duplicates() {
        let mut log = TurnLog::new();
        log.insert(CodedTurn::new(1, 1.0)).unwrap();
        assert!(matches!(
            log.insert(CodedTurn::new(1, 2.0)),
            Err(CodingError::DuplicateTurnId(1))
        ));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_turn_log_remove_and_classify() {
        let mut log =
            TurnLog::from_turns(vec![CodedTurn::new(1, 3.0), CodedTurn::new(2, 1.0)]).unwrap();
        assert_eq!(log.turns()[0].id, 2);

        log.classify(1, Classification::with_mode(CommunicationMode::Gestural))
            .unwrap();
        assert!(log.get(1).unwrap().classification.is_classified());

        let removed = log.remove(2).unwrap();
        assert_eq!(removed.id, 2);
        assert_eq!(log.len(), 1);

        assert!(matches!(log.remove(99), Err(CodingError::TurnNotFound(99))));
        assert!(matches!(
            log.classify(99, Classification::default()),
            Err(CodingError::TurnNotFound(99))
        ));
    }

    #[test]
    fn test_statistics_recomputed_after_each_change() {
        let mut log = TurnLog::new();
        assert_eq!(log.statistics().tt_cons, 0.0);

        log.insert(CodedTurn::new(1, 1.0).classified(Classification::with_mode(
            CommunicationMode::Verbal,
        )))
        .unwrap();
        assert_eq!(log.statistics().tt_cons, 1.0);

        log.insert(CodedTurn::new(2, 2.0)).unwrap();
        assert_eq!(log.statistics().tt_cons, 0.5);

        log.remove(2).unwrap();
        assert_eq!(log.statistics().tt_cons, 1.0);
    }

    #[test]
    fn test_next_id() {
        let mut log = TurnLog::new();
        assert_eq!(log.next_id(), 1);
        log.insert(CodedTurn::new(41, 0.0)).unwrap();
        assert_eq!(log.next_id(), 42);
    }

    #[test]
    fn test_from_session_and_back() {
        let session = parse_session(sample_session_json()).unwrap();
        let log = TurnLog::from_session(&session).unwrap();
        assert_eq!(log.len(), 2);

        let saved = log.to_session(&session.video_filename);
        assert_eq!(saved.video_filename, "playtime_session_03.mp4");
        assert_eq!(saved.turns, session.turns);
        assert!(saved.analysis_date.is_some());
    }
}
