//! Core data types for turncoder
//!
//! This module defines the turns an annotator records and the statistics
//! snapshot derived from them.

use crate::scheme::{
    label_or_empty, CommunicationMode, ParentalStyle, SemanticUnderstanding, SharedAttention,
    VocalizationType,
};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Manual coding applied to one turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Child communication mode
    #[serde(default, with = "label_or_empty")]
    pub communication_mode: Option<CommunicationMode>,
    /// Child vocalization code
    #[serde(default, with = "label_or_empty")]
    pub vocalization_type: Option<VocalizationType>,
    /// Shared attention observation
    #[serde(default, with = "label_or_empty")]
    pub shared_attention: Option<SharedAttention>,
    /// Parental strategies keyed by strategy id, `true` when exhibited
    #[serde(default)]
    pub parent_communication: IndexMap<String, bool>,
    #[serde(default)]
    pub is_inadequate: bool,
    #[serde(default)]
    pub child_provides_new_info: bool,
    #[serde(default, with = "label_or_empty")]
    pub child_understands_semantic: Option<SemanticUnderstanding>,
    #[serde(default)]
    pub uses_only_auditory_channel: bool,
    #[serde(default)]
    pub is_eye_contact_adequate: bool,
}

impl Classification {
    /// Create a classification with the given communication mode and everything else unset
    pub fn with_mode(mode: CommunicationMode) -> Self {
        Self {
            communication_mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn is_verbal(&self) -> bool {
        self.communication_mode == Some(CommunicationMode::Verbal)
    }

    pub fn is_gestural(&self) -> bool {
        self.communication_mode == Some(CommunicationMode::Gestural)
    }

    /// True for turns in the VT ∪ GT subset
    pub fn is_verbal_or_gestural(&self) -> bool {
        self.is_verbal() || self.is_gestural()
    }

    /// Mark a strategy as exhibited
    pub fn flag_strategy(&mut self, strategy_id: &str) {
        self.parent_communication.insert(strategy_id.to_string(), true);
    }

    /// Ids of strategies flagged `true`, in the order they appear in the map
    pub fn active_strategies(&self) -> impl Iterator<Item = &str> {
        self.parent_communication
            .iter()
            .filter(|(_, checked)| **checked)
            .map(|(id, _)| id.as_str())
    }
}

/// Coding state of a turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Classification>", into = "Option<Classification>")]
pub enum TurnCoding {
    /// Pending manual coding
    #[default]
    Unclassified,
    Classified(Classification),
}

impl TurnCoding {
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            TurnCoding::Unclassified => None,
            TurnCoding::Classified(c) => Some(c),
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, TurnCoding::Classified(_))
    }
}

impl From<Option<Classification>> for TurnCoding {
    fn from(value: Option<Classification>) -> Self {
        match value {
            Some(c) => TurnCoding::Classified(c),
            None => TurnCoding::Unclassified,
        }
    }
}

impl From<TurnCoding> for Option<Classification> {
    fn from(value: TurnCoding) -> Self {
        match value {
            TurnCoding::Unclassified => None,
            TurnCoding::Classified(c) => Some(c),
        }
    }
}

/// One observed parent-child interaction unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodedTurn {
    /// Stable identifier for the lifetime of the session
    pub id: u64,
    /// Seconds into the source video
    pub timestamp: f64,
    /// What the parent is doing
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parent_action: String,
    /// What the parent is saying
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parent_speech: String,
    /// What the child is saying
    #[serde(default, deserialize_with = "null_as_empty")]
    pub child_speech: String,
    /// What the child is doing
    #[serde(default, deserialize_with = "null_as_empty")]
    pub child_action: String,
    /// Eye contact observed, independent of classification
    #[serde(default)]
    pub eye_contact: bool,
    /// Parent and child spoke over each other
    #[serde(default)]
    pub overlapping_dialogue: bool,
    #[serde(default)]
    pub classification: TurnCoding,
}

impl CodedTurn {
    /// Create an unclassified turn with empty descriptions
    pub fn new(id: u64, timestamp: f64) -> Self {
        Self {
            id,
            timestamp,
            parent_action: String::new(),
            parent_speech: String::new(),
            child_speech: String::new(),
            child_action: String::new(),
            eye_contact: false,
            overlapping_dialogue: false,
            classification: TurnCoding::Unclassified,
        }
    }

    pub fn with_eye_contact(mut self, eye_contact: bool) -> Self {
        self.eye_contact = eye_contact;
        self
    }

    pub fn classified(mut self, classification: Classification) -> Self {
        self.classification = TurnCoding::Classified(classification);
        self
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.classification()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Child communicative mode category, banded on the verbal share of all turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicativeMode {
    #[serde(rename = "Predominantly Verbal")]
    PredominantlyVerbal,
    #[serde(rename = "Mixed to Predominantly Verbal")]
    MixedToPredominantlyVerbal,
    #[serde(rename = "Mixed")]
    Mixed,
    #[serde(rename = "Mixed Predominantly Gestural")]
    MixedPredominantlyGestural,
    #[serde(rename = "Predominantly Gestural")]
    PredominantlyGestural,
    /// No verbal or gestural turn was coded
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl CommunicativeMode {
    pub fn label(&self) -> &'static str {
        match self {
            CommunicativeMode::PredominantlyVerbal => "Predominantly Verbal",
            CommunicativeMode::MixedToPredominantlyVerbal => "Mixed to Predominantly Verbal",
            CommunicativeMode::Mixed => "Mixed",
            CommunicativeMode::MixedPredominantlyGestural => "Mixed Predominantly Gestural",
            CommunicativeMode::PredominantlyGestural => "Predominantly Gestural",
            CommunicativeMode::NotAvailable => "N/A",
        }
    }
}

impl fmt::Display for CommunicativeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Share of style occurrences per parental style (0-100)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StylePercentages {
    pub tutorial: f64,
    pub didactic: f64,
    pub directive: f64,
    pub conversational: f64,
}

impl StylePercentages {
    pub fn get(&self, style: ParentalStyle) -> f64 {
        match style {
            ParentalStyle::Tutorial => self.tutorial,
            ParentalStyle::Didactic => self.didactic,
            ParentalStyle::Directive => self.directive,
            ParentalStyle::Conversational => self.conversational,
        }
    }

    pub fn total(&self) -> f64 {
        self.tutorial + self.didactic + self.directive + self.conversational
    }
}

/// Categorical parental style label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredominantStyle {
    NoSpecificStyle,
    Single(ParentalStyle),
    Combined(ParentalStyle, ParentalStyle),
}

impl fmt::Display for PredominantStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredominantStyle::NoSpecificStyle => f.write_str("No Specific Style"),
            PredominantStyle::Single(style) => write!(f, "{style}"),
            PredominantStyle::Combined(first, second) => write!(f, "{first} & {second}"),
        }
    }
}

impl Serialize for PredominantStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parental style distribution and its label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentalStyleProfile {
    pub percentages: StylePercentages,
    pub predominant_style: PredominantStyle,
}

/// Statistics derived from a turn sequence, recomputed from scratch on every change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub communicative_mode: CommunicativeMode,
    /// Most frequent vocalization code, `None` when no turn carries one
    #[serde(serialize_with = "label_or_na")]
    pub predominant_vocalization: Option<VocalizationType>,
    /// [TT-CONS] consistency of turn-taking
    pub tt_cons: f64,
    /// [TT-AD] adequacy of turn-taking
    pub tt_ad: f64,
    /// [EC-PRES] presence of eye contact
    pub ec_pres: f64,
    /// [EC-AD] adequacy of eye contact
    pub ec_ad: f64,
    /// [AUT] auditory autonomy
    pub aut: f64,
    /// [IN] initiative, relative to verbal or gestural turns
    #[serde(rename = "in")]
    pub initiative: f64,
    pub parental_style: ParentalStyleProfile,
}

impl StatisticsSnapshot {
    /// Vocalization label, or "N/A"
    pub fn predominant_vocalization_label(&self) -> &'static str {
        self.predominant_vocalization
            .map(|v| v.label())
            .unwrap_or("N/A")
    }

    /// The six ratios in report order: TT-CONS, TT-AD, EC-PRES, EC-AD, AUT, IN
    pub fn ratios(&self) -> [(&'static str, f64); 6] {
        [
            ("TT-CONS", self.tt_cons),
            ("TT-AD", self.tt_ad),
            ("EC-PRES", self.ec_pres),
            ("EC-AD", self.ec_ad),
            ("AUT", self.aut),
            ("IN", self.initiative),
        ]
    }
}

fn label_or_na<S: Serializer>(
    value: &Option<VocalizationType>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.map(|v| v.label()).unwrap_or("N/A"))
}

// ============================================================================
// Encoded report types
// ============================================================================

/// Producer metadata stamped into every report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// Turn counts behind the ratios
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TurnSummary {
    pub total_turns: usize,
    pub classified_turns: usize,
    pub unclassified_turns: usize,
    pub verbal_turns: usize,
    pub gestural_turns: usize,
}

/// Statistics report handed to downstream consumers
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    /// Coding scheme the turns were classified against
    pub scheme_version: String,
    /// When the report was computed (RFC3339)
    pub computed_at_utc: String,
    pub producer: ReportProducer,
    /// Source video of the session
    pub video_filename: String,
    pub turn_summary: TurnSummary,
    pub statistics: StatisticsSnapshot,
}
