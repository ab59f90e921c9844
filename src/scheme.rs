//! Coding scheme registry
//!
//! Static, versioned catalog of the labels a turn can be coded with, plus the
//! table mapping each parental-communication strategy to its style tags.
//! Nothing here is mutable at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current coding scheme version
pub const SCHEME_VERSION: &str = "ptc.coding_scheme.v1";

/// Child communication mode for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommunicationMode {
    #[serde(rename = "VERBAL (VT)", alias = "VERBAL")]
    Verbal,
    #[serde(rename = "GESTURAL (GT)", alias = "GESTURAL")]
    Gestural,
    #[serde(rename = "BOTH GESTURAL AND VERBAL", alias = "BOTH")]
    Both,
    #[serde(rename = "NO RESPONSE WAS PROVIDED (*)", alias = "NO_RESPONSE")]
    NoResponse,
}

impl CommunicationMode {
    pub const ALL: [CommunicationMode; 4] = [
        CommunicationMode::Verbal,
        CommunicationMode::Gestural,
        CommunicationMode::Both,
        CommunicationMode::NoResponse,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CommunicationMode::Verbal => "VERBAL (VT)",
            CommunicationMode::Gestural => "GESTURAL (GT)",
            CommunicationMode::Both => "BOTH GESTURAL AND VERBAL",
            CommunicationMode::NoResponse => "NO RESPONSE WAS PROVIDED (*)",
        }
    }
}

/// Child vocalization code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VocalizationType {
    #[serde(rename = "SVI")]
    Svi,
    #[serde(rename = "SV")]
    Sv,
    #[serde(rename = "SVC")]
    Svc,
    #[serde(rename = "SV+C")]
    SvPlusC,
    #[serde(rename = "PB")]
    Pb,
    #[serde(rename = "P")]
    P,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "S")]
    S,
    /// Sentinel for turns where the child answered with gestures only
    #[serde(rename = "NONE (IF THE MODE WAS GESTURAL)", alias = "NONE")]
    None,
}

impl VocalizationType {
    pub const ALL: [VocalizationType; 9] = [
        VocalizationType::Svi,
        VocalizationType::Sv,
        VocalizationType::Svc,
        VocalizationType::SvPlusC,
        VocalizationType::Pb,
        VocalizationType::P,
        VocalizationType::F,
        VocalizationType::S,
        VocalizationType::None,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VocalizationType::Svi => "SVI",
            VocalizationType::Sv => "SV",
            VocalizationType::Svc => "SVC",
            VocalizationType::SvPlusC => "SV+C",
            VocalizationType::Pb => "PB",
            VocalizationType::P => "P",
            VocalizationType::F => "F",
            VocalizationType::S => "S",
            VocalizationType::None => "NONE (IF THE MODE WAS GESTURAL)",
        }
    }
}

/// Whether shared attention was observed during the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharedAttention {
    #[serde(rename = "OBSERVED")]
    Observed,
    #[serde(rename = "NOT OBSERVED", alias = "NOT_OBSERVED")]
    NotObserved,
}

impl SharedAttention {
    pub fn label(&self) -> &'static str {
        match self {
            SharedAttention::Observed => "OBSERVED",
            SharedAttention::NotObserved => "NOT OBSERVED",
        }
    }
}

/// Whether the child understands the semantic referent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticUnderstanding {
    #[serde(rename = "SI", alias = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl SemanticUnderstanding {
    pub fn label(&self) -> &'static str {
        match self {
            SemanticUnderstanding::Yes => "SI",
            SemanticUnderstanding::No => "NO",
        }
    }
}

/// Parental communication style bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParentalStyle {
    Tutorial,
    Didactic,
    Directive,
    Conversational,
}

impl ParentalStyle {
    /// Enumeration order, also used to break ties between equal percentages
    pub const ALL: [ParentalStyle; 4] = [
        ParentalStyle::Tutorial,
        ParentalStyle::Didactic,
        ParentalStyle::Directive,
        ParentalStyle::Conversational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParentalStyle::Tutorial => "TUTORIAL",
            ParentalStyle::Didactic => "DIDACTIC",
            ParentalStyle::Directive => "DIRECTIVE",
            ParentalStyle::Conversational => "CONVERSATIONAL",
        }
    }

    /// Short code used by the coding manual (T, D, DC, C)
    pub fn code(&self) -> &'static str {
        match self {
            ParentalStyle::Tutorial => "T",
            ParentalStyle::Didactic => "D",
            ParentalStyle::Directive => "DC",
            ParentalStyle::Conversational => "C",
        }
    }
}

impl fmt::Display for ParentalStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parental-communication strategy in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Strategy {
    /// Stable identifier used as the key in session files
    pub id: &'static str,
    /// Display label, prefixed with its letter in the coding manual
    pub label: &'static str,
    /// Style buckets this strategy contributes to (zero, one or two)
    pub styles: &'static [ParentalStyle],
}

use ParentalStyle::{Conversational as C, Didactic as D, Directive as DC, Tutorial as T};

static STRATEGIES: [Strategy; 26] = [
    Strategy {
        id: "repeat",
        label: "a. Repeat the child’s verbalization",
        styles: &[T],
    },
    Strategy {
        id: "expand",
        label: "b. Expand/restructure child’s verbal or gestural turn",
        styles: &[T],
    },
    Strategy {
        id: "reformulate",
        label: "c. Verbally reformulate/denominate child’s actions",
        styles: &[T],
    },
    Strategy {
        id: "paraphrase",
        label: "d. Paraphrase child’s verbalization",
        styles: &[T],
    },
    Strategy {
        id: "reference",
        label: "e. Make references to shared experiences, roles, format, routines",
        styles: &[T],
    },
    Strategy {
        id: "encourage",
        label: "f. Encourage the child",
        styles: &[T],
    },
    Strategy {
        id: "attention",
        label: "g. Pay attention to the child",
        styles: &[T],
    },
    Strategy {
        id: "closedQuestions",
        label: "h. Ask closed questions",
        styles: &[D, DC],
    },
    Strategy {
        id: "complexInfo",
        label: "i. Provide complex descriptions or complex verbal information",
        styles: &[D],
    },
    Strategy {
        id: "denominate",
        label: "j. Denominate objects",
        styles: &[D],
    },
    Strategy {
        id: "demonstrate",
        label: "k. Demonstrate actions",
        styles: &[D],
    },
    Strategy {
        id: "askRepetitions",
        label: "l. Ask for repetitions",
        styles: &[D],
    },
    Strategy {
        id: "correct",
        label: "m. Correct child’s verbal or non-verbal behavior",
        styles: &[D],
    },
    Strategy {
        id: "controlAttention",
        label: "n. Control child’s attention",
        styles: &[DC],
    },
    Strategy {
        id: "initiative",
        label: "o. Show communicative initiative",
        styles: &[DC],
    },
    Strategy {
        id: "openQuestions",
        label: "p. Formulate open questions",
        styles: &[C],
    },
    Strategy {
        id: "selfAnswers",
        label: "q. Self-answers",
        styles: &[C],
    },
    Strategy {
        id: "empathic",
        label: "r. Make empathic comments",
        styles: &[C],
    },
    Strategy {
        id: "topicChange",
        label: "s. Sudden topic changes",
        styles: &[C],
    },
    Strategy {
        id: "selfReformulate",
        label: "t. Self-reformulate",
        styles: &[C],
    },
    Strategy {
        id: "intrusion",
        label: "u. Make intrusion in the child’s turn",
        styles: &[],
    },
    Strategy {
        id: "missVocal",
        label: "v. Miss response to child’s vocal turn",
        styles: &[],
    },
    Strategy {
        id: "missTurn",
        label: "z. Miss response to child’s turn",
        styles: &[],
    },
    Strategy {
        id: "unknownWords",
        label: "a1. Use unknown/complicated words",
        styles: &[],
    },
    Strategy {
        id: "selfReformulate2",
        label: "a2. Self-reformulate",
        styles: &[C],
    },
    Strategy {
        id: "intrusion2",
        label: "a3. Make intrusions into the child’s turn",
        styles: &[],
    },
];

/// All strategies in manual order
pub fn list_strategies() -> &'static [Strategy] {
    &STRATEGIES
}

/// Look up a strategy by id
pub fn strategy(id: &str) -> Option<&'static Strategy> {
    STRATEGIES.iter().find(|s| s.id == id)
}

/// Style tags for a strategy id; unknown ids map to no styles
pub fn style_tags_for(id: &str) -> &'static [ParentalStyle] {
    strategy(id).map(|s| s.styles).unwrap_or(&[])
}

/// Serde adapter for optional scheme labels where the empty string means unset.
///
/// Session files written by the annotation tool store unanswered radio groups
/// as `""` rather than `null`; both read back as `None`.
pub(crate) mod label_or_empty {
    use serde::de::{self, DeserializeOwned, IntoDeserializer};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, L>(value: &Option<L>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        L: Serialize,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, R, L>(deserializer: R) -> Result<Option<L>, R::Error>
    where
        R: Deserializer<'de>,
        L: DeserializeOwned,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let trimmed = match raw.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(s) => s.to_string(),
        };
        let value_de: de::value::StringDeserializer<de::value::Error> = trimmed.into_deserializer();
        L::deserialize(value_de).map(Some).map_err(de::Error::custom)
    }
}
