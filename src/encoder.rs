//! Report encoder
//!
//! Encodes a statistics snapshot into a JSON report for downstream consumers
//! and renders the plain-text turn log and statistics reports annotators share
//! with clinicians.

use crate::error::CodingError;
use crate::features::TurnTally;
use crate::scheme::{self, SCHEME_VERSION};
use crate::types::{CodedTurn, ReportProducer, StatisticsReport, StatisticsSnapshot, TurnSummary};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Separator closing each turn block in the text turn log
const TURN_SEPARATOR: &str = "--------------------------------------------";

/// Statistics report encoder
pub struct StatisticsEncoder {
    instance_id: String,
}

impl Default for StatisticsEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build a report for a session's turns and their snapshot
    pub fn encode(
        &self,
        video_filename: &str,
        turns: &[CodedTurn],
        statistics: &StatisticsSnapshot,
    ) -> StatisticsReport {
        let tally = TurnTally::from_turns(turns);

        StatisticsReport {
            scheme_version: SCHEME_VERSION.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            video_filename: video_filename.to_string(),
            turn_summary: TurnSummary {
                total_turns: tally.total,
                classified_turns: tally.classified,
                unclassified_turns: tally.unclassified(),
                verbal_turns: tally.verbal,
                gestural_turns: tally.gestural,
            },
            statistics: statistics.clone(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        video_filename: &str,
        turns: &[CodedTurn],
        statistics: &StatisticsSnapshot,
    ) -> Result<String, CodingError> {
        let report = self.encode(video_filename, turns, statistics);
        serde_json::to_string_pretty(&report)
            .map_err(|e| CodingError::EncodingError(e.to_string()))
    }
}

/// Format seconds as `MM:SS.ss`
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0).floor();
    let secs = seconds - mins * 60.0;
    format!("{:02}:{:05.2}", mins as u64, secs)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

fn render_turn(turn: &CodedTurn, index: usize) -> String {
    let mut out = format!(
        "--- TURN {} @ {} ---\n\n",
        index + 1,
        format_timestamp(turn.timestamp)
    );

    out.push_str("[DESCRIPTION]\n");
    out.push_str(&format!("Parent Action: {}\n", or_na(&turn.parent_action)));
    out.push_str(&format!("Parent Speech: {}\n", or_na(&turn.parent_speech)));
    out.push_str(&format!("Child Action: {}\n", or_na(&turn.child_action)));
    out.push_str(&format!("Child Speech: {}\n", or_na(&turn.child_speech)));
    out.push_str(&format!("Eye Contact Present: {}\n", yes_no(turn.eye_contact)));
    out.push_str(&format!(
        "Overlapping Dialogue: {}\n",
        yes_no(turn.overlapping_dialogue)
    ));
    out.push('\n');

    match turn.classification() {
        Some(c) => {
            out.push_str("[CLASSIFICATION]\n");
            out.push_str(&format!(
                "1. Communication Mode: {}\n",
                c.communication_mode.map_or("N/A", |m| m.label())
            ));
            out.push_str(&format!(
                "2. Vocalization Type: {}\n",
                c.vocalization_type.map_or("N/A", |v| v.label())
            ));
            out.push_str(&format!(
                "3. Shared Attention: {}\n",
                c.shared_attention.map_or("N/A", |a| a.label())
            ));

            // Registry order, not the order strategies were ticked
            let strategies: Vec<&str> = scheme::list_strategies()
                .iter()
                .filter(|s| c.parent_communication.get(s.id).copied().unwrap_or(false))
                .map(|s| s.label)
                .collect();

            out.push_str("4. Parent Communication:\n");
            if strategies.is_empty() {
                out.push_str("   - None\n");
            } else {
                for label in strategies {
                    out.push_str(&format!("   - {}\n", label));
                }
            }

            out.push_str(&format!(
                "5. Is the turn inadequate?: {}\n",
                yes_no(c.is_inadequate)
            ));
            out.push_str(&format!(
                "6. Is the child providing new information?: {}\n",
                yes_no(c.child_provides_new_info)
            ));
            out.push_str(&format!(
                "7. Does the child understand the semantic referent?: {}\n",
                c.child_understands_semantic.map_or("N/A", |s| s.label())
            ));
            out.push_str(&format!(
                "8. Uses only auditory channel?: {}\n",
                yes_no(c.uses_only_auditory_channel)
            ));
            out.push_str(&format!(
                "9. Is eye contact adequate?: {}\n",
                yes_no(c.is_eye_contact_adequate)
            ));
        }
        None => out.push_str("[CLASSIFICATION NOT COMPLETED]\n"),
    }

    out.push_str(&format!("\n{}\n\n", TURN_SEPARATOR));
    out
}

/// Render every turn as a numbered plain-text block
pub fn render_turn_log_text(turns: &[CodedTurn]) -> String {
    turns
        .iter()
        .enumerate()
        .map(|(index, turn)| render_turn(turn, index))
        .collect()
}

/// Render the statistics snapshot as a plain-text report
pub fn render_statistics_text(stats: &StatisticsSnapshot, exported_at: DateTime<Utc>) -> String {
    let mut out = String::from("--- INTERACTION STATISTICS ---\n\n");
    out.push_str(&format!(
        "Exported: {}\n\n",
        exported_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out.push_str("--- COMMUNICATIVE PROFILE ---\n");
    out.push_str(&format!(
        "Predominant Communicative Mode: {}\n",
        stats.communicative_mode
    ));
    out.push_str(&format!(
        "Predominant Vocalization Type: {}\n\n",
        stats.predominant_vocalization_label()
    ));

    out.push_str("--- KEY METRICS ---\n");
    out.push_str(&format!("Consistency of Turn-Taking (TT-CONS): {:.2}\n", stats.tt_cons));
    out.push_str(&format!("Adequacy of Turn-Taking (TT-AD): {:.2}\n", stats.tt_ad));
    out.push_str(&format!("Presence of Eye Contact (EC-PRES): {:.2}\n", stats.ec_pres));
    out.push_str(&format!("Adequacy of Eye Contact (EC-AD): {:.2}\n", stats.ec_ad));
    out.push_str(&format!("Auditory Autonomy (AUT): {:.2}\n", stats.aut));
    out.push_str(&format!("Initiative (IN): {:.2}\n\n", stats.initiative));

    let style = &stats.parental_style;
    out.push_str("--- PARENTAL COMMUNICATION STYLE ---\n");
    out.push_str(&format!("Predominant Style: {}\n", style.predominant_style));
    out.push_str("Distribution:\n");
    out.push_str(&format!("  - Tutorial: {:.1}%\n", style.percentages.tutorial));
    out.push_str(&format!("  - Didactic: {:.1}%\n", style.percentages.didactic));
    out.push_str(&format!("  - Directive: {:.1}%\n", style.percentages.directive));
    out.push_str(&format!(
        "  - Conversational: {:.1}%\n",
        style.percentages.conversational
    ));

    out
}
