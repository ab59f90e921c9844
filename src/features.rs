//! Statistics aggregation
//!
//! Derives interaction ratios, the communicative mode label and the parental
//! style profile from a sequence of coded turns. Every function here is pure:
//! the same turns always produce the same snapshot, and degenerate inputs fall
//! back to "N/A" / 0 / "No Specific Style" instead of failing.

use crate::scheme::{self, ParentalStyle, VocalizationType};
use crate::types::{
    CodedTurn, CommunicativeMode, ParentalStyleProfile, PredominantStyle, StatisticsSnapshot,
    StylePercentages,
};
use indexmap::IndexMap;
use tracing::debug;

/// Verbal share (percent) above which a session is predominantly verbal
const VERBAL_PREDOMINANT_PCT: f64 = 50.0;
/// Lower bound (inclusive) of the mixed-to-predominantly-verbal band
const VERBAL_MIXED_HIGH_PCT: f64 = 40.0;
/// Lower bound (inclusive) of the mixed band
const VERBAL_MIXED_PCT: f64 = 30.0;

/// Top style share (percent) at which that style stands alone
const STYLE_DOMINANT_PCT: f64 = 40.0;
/// Top style share (percent) required for any style label
const STYLE_MIN_PCT: f64 = 25.0;

/// Per-session turn counts feeding the ratios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnTally {
    /// All turns, classified or not
    pub total: usize,
    pub classified: usize,
    pub verbal: usize,
    pub gestural: usize,
    /// Classified turns flagged inadequate
    pub inadequate: usize,
    pub auditory_only: usize,
    /// VT or GT turns where the child provides new information
    pub new_info: usize,
    /// Turn-level eye contact over all turns
    pub eye_contact: usize,
    pub adequate_eye_contact: usize,
}

impl TurnTally {
    /// Count a turn sequence in a single pass
    pub fn from_turns(turns: &[CodedTurn]) -> Self {
        let mut tally = TurnTally {
            total: turns.len(),
            ..Self::default()
        };

        for turn in turns {
            if turn.eye_contact {
                tally.eye_contact += 1;
            }

            let Some(c) = turn.classification() else {
                continue;
            };

            tally.classified += 1;
            if c.is_verbal() {
                tally.verbal += 1;
            }
            if c.is_gestural() {
                tally.gestural += 1;
            }
            if c.is_inadequate {
                tally.inadequate += 1;
            }
            if c.uses_only_auditory_channel {
                tally.auditory_only += 1;
            }
            if c.is_verbal_or_gestural() && c.child_provides_new_info {
                tally.new_info += 1;
            }
            if c.is_eye_contact_adequate {
                tally.adequate_eye_contact += 1;
            }
        }

        tally
    }

    pub fn verbal_or_gestural(&self) -> usize {
        self.verbal + self.gestural
    }

    pub fn unclassified(&self) -> usize {
        self.total - self.classified
    }
}

/// Aggregator turning coded turns into a statistics snapshot
pub struct StatisticsAggregator;

impl StatisticsAggregator {
    /// Compute the full snapshot. Never fails.
    pub fn compute(turns: &[CodedTurn]) -> StatisticsSnapshot {
        let tally = TurnTally::from_turns(turns);
        let total = tally.total as f64;
        let vt_or_gt = tally.verbal_or_gestural();

        let communicative_mode = classify_communicative_mode(tally.verbal, vt_or_gt, tally.total);
        let predominant_vocalization = predominant_vocalization(turns);

        let tt_cons = safe_divide(vt_or_gt as f64, total);
        let tt_ad = safe_divide((tally.classified - tally.inadequate) as f64, total);
        let aut = safe_divide(tally.auditory_only as f64, total);
        let initiative = safe_divide(tally.new_info as f64, vt_or_gt as f64);
        let ec_pres = safe_divide(tally.eye_contact as f64, total);
        let ec_ad = safe_divide(tally.adequate_eye_contact as f64, total);

        let (style_counts, occurrences) = count_style_occurrences(turns);
        let percentages = style_percentages(&style_counts, occurrences);
        let predominant_style = predominant_style(&percentages, occurrences);

        debug!(
            total = tally.total,
            classified = tally.classified,
            verbal = tally.verbal,
            gestural = tally.gestural,
            style_occurrences = occurrences,
            "computed turn statistics"
        );

        StatisticsSnapshot {
            communicative_mode,
            predominant_vocalization,
            tt_cons,
            tt_ad,
            ec_pres,
            ec_ad,
            aut,
            initiative,
            parental_style: ParentalStyleProfile {
                percentages,
                predominant_style,
            },
        }
    }
}

/// Compute statistics for a turn sequence (stateless, one-shot)
pub fn compute_statistics(turns: &[CodedTurn]) -> StatisticsSnapshot {
    StatisticsAggregator::compute(turns)
}

/// Division where a zero denominator yields 0
fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Band the verbal share of all turns into a communicative mode label.
///
/// Only `verbal / total` drives the bands; gestural turns matter solely for
/// the "N/A" override when neither mode was ever coded.
fn classify_communicative_mode(verbal: usize, vt_or_gt: usize, total: usize) -> CommunicativeMode {
    if vt_or_gt == 0 {
        return CommunicativeMode::NotAvailable;
    }

    let pct = safe_divide(verbal as f64, total as f64) * 100.0;
    if pct > VERBAL_PREDOMINANT_PCT {
        CommunicativeMode::PredominantlyVerbal
    } else if pct >= VERBAL_MIXED_HIGH_PCT {
        CommunicativeMode::MixedToPredominantlyVerbal
    } else if pct >= VERBAL_MIXED_PCT {
        CommunicativeMode::Mixed
    } else if pct > 0.0 {
        CommunicativeMode::MixedPredominantlyGestural
    } else {
        CommunicativeMode::PredominantlyGestural
    }
}

/// Most frequent vocalization among classified turns; ties go to the value seen first
fn predominant_vocalization(turns: &[CodedTurn]) -> Option<VocalizationType> {
    let mut counts: IndexMap<VocalizationType, usize> = IndexMap::new();
    for vocalization in turns
        .iter()
        .filter_map(|t| t.classification())
        .filter_map(|c| c.vocalization_type)
    {
        *counts.entry(vocalization).or_insert(0) += 1;
    }

    let mut best: Option<(VocalizationType, usize)> = None;
    for (&vocalization, &count) in &counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((vocalization, count)),
        }
    }
    best.map(|(vocalization, _)| vocalization)
}

/// Count style occurrences across all flagged strategies of classified turns.
///
/// A strategy mapped to two styles adds one occurrence to each. Unknown or
/// unmapped strategy ids add nothing.
fn count_style_occurrences(turns: &[CodedTurn]) -> ([usize; 4], usize) {
    let mut counts = [0usize; 4];
    let mut occurrences = 0;

    for classification in turns.iter().filter_map(|t| t.classification()) {
        for strategy_id in classification.active_strategies() {
            for style in scheme::style_tags_for(strategy_id) {
                counts[style_index(*style)] += 1;
                occurrences += 1;
            }
        }
    }

    (counts, occurrences)
}

fn style_index(style: ParentalStyle) -> usize {
    match style {
        ParentalStyle::Tutorial => 0,
        ParentalStyle::Didactic => 1,
        ParentalStyle::Directive => 2,
        ParentalStyle::Conversational => 3,
    }
}

fn style_percentages(counts: &[usize; 4], occurrences: usize) -> StylePercentages {
    let pct = |count: usize| safe_divide(count as f64, occurrences as f64) * 100.0;
    StylePercentages {
        tutorial: pct(counts[0]),
        didactic: pct(counts[1]),
        directive: pct(counts[2]),
        conversational: pct(counts[3]),
    }
}

/// Pick the style label from the sorted distribution.
///
/// Styles are ranked by percentage descending; equal percentages keep
/// enumeration order (TUTORIAL, DIDACTIC, DIRECTIVE, CONVERSATIONAL).
fn predominant_style(percentages: &StylePercentages, occurrences: usize) -> PredominantStyle {
    if occurrences == 0 {
        return PredominantStyle::NoSpecificStyle;
    }

    let mut ranked: Vec<(ParentalStyle, f64)> = ParentalStyle::ALL
        .iter()
        .map(|&style| (style, percentages.get(style)))
        .collect();
    // sort_by is stable, so ties stay in enumeration order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (top, top_pct) = ranked[0];
    let (second, second_pct) = ranked[1];

    if top_pct >= STYLE_DOMINANT_PCT {
        PredominantStyle::Single(top)
    } else if top_pct >= STYLE_MIN_PCT && second_pct > 0.0 {
        PredominantStyle::Combined(top, second)
    } else if top_pct >= STYLE_MIN_PCT {
        PredominantStyle::Single(top)
    } else {
        PredominantStyle::NoSpecificStyle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::CommunicationMode;
    use crate::types::Classification;
    use pretty_assertions::assert_eq;

    const EPS: f64 = 1e-9;

    fn coded(id: u64, mode: CommunicationMode) -> CodedTurn {
        CodedTurn::new(id, id as f64).classified(Classification::with_mode(mode))
    }

    fn with_strategies(id: u64, strategies: &[&str]) -> CodedTurn {
        let mut c = Classification::with_mode(CommunicationMode::Verbal);
        for s in strategies {
            c.flag_strategy(s);
        }
        CodedTurn::new(id, id as f64).classified(c)
    }

    fn with_vocalization(id: u64, vocalization: VocalizationType) -> CodedTurn {
        let mut c = Classification::with_mode(CommunicationMode::Verbal);
        c.vocalization_type = Some(vocalization);
        CodedTurn::new(id, id as f64).classified(c)
    }

    fn assert_snapshot_in_range(stats: &StatisticsSnapshot) {
        for (name, value) in stats.ratios() {
            assert!((0.0..=1.0).contains(&value), "{name} out of range: {value}");
        }
        for style in ParentalStyle::ALL {
            let pct = stats.parental_style.percentages.get(style);
            assert!((0.0..=100.0).contains(&pct), "{style} out of range: {pct}");
        }
    }

    #[test]
    fn test_empty_input_yields_defaults() {
        let stats = compute_statistics(&[]);
        assert_snapshot_in_range(&stats);

        assert_eq!(stats.communicative_mode, CommunicativeMode::NotAvailable);
        assert_eq!(stats.predominant_vocalization_label(), "N/A");
        for (_, value) in stats.ratios() {
            assert_eq!(value, 0.0);
        }
        assert_eq!(stats.parental_style.percentages, StylePercentages::default());
        assert_eq!(
            stats.parental_style.predominant_style,
            PredominantStyle::NoSpecificStyle
        );
    }

    #[test]
    fn test_all_unclassified_turns() {
        let turns: Vec<CodedTurn> = (0..4)
            .map(|i| CodedTurn::new(i, i as f64).with_eye_contact(i % 2 == 0))
            .collect();
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);

        assert_eq!(stats.communicative_mode, CommunicativeMode::NotAvailable);
        assert_eq!(stats.tt_cons, 0.0);
        assert_eq!(stats.tt_ad, 0.0);
        assert_eq!(stats.initiative, 0.0);
        // eye contact presence still counts unclassified turns
        assert!((stats.ec_pres - 0.5).abs() < EPS);
    }

    #[test]
    fn test_scenario_verbal_majority_with_unclassified_turns() {
        let mut turns = Vec::new();
        for i in 0..6 {
            turns.push(coded(i, CommunicationMode::Verbal));
        }
        for i in 6..8 {
            turns.push(coded(i, CommunicationMode::Gestural));
        }
        for i in 8..10 {
            turns.push(CodedTurn::new(i, i as f64));
        }

        let tally = TurnTally::from_turns(&turns);
        assert_eq!(tally.verbal_or_gestural(), 8);
        assert_eq!(tally.unclassified(), 2);

        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert!((stats.tt_cons - 0.8).abs() < EPS);
        assert_eq!(stats.communicative_mode, CommunicativeMode::PredominantlyVerbal);
        // unclassified turns inflate the adequacy denominator
        assert!((stats.tt_ad - 0.8).abs() < EPS);
    }

    #[test]
    fn test_scenario_style_tie_combines_top_two() {
        let turns = vec![
            with_strategies(1, &["repeat"]),
            with_strategies(2, &["closedQuestions"]),
            with_strategies(3, &["openQuestions"]),
            with_strategies(4, &[]),
        ];
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);

        let p = stats.parental_style.percentages;
        assert!((p.tutorial - 25.0).abs() < EPS);
        assert!((p.didactic - 25.0).abs() < EPS);
        assert!((p.directive - 25.0).abs() < EPS);
        assert!((p.conversational - 25.0).abs() < EPS);
        assert_eq!(
            stats.parental_style.predominant_style.to_string(),
            "TUTORIAL & DIDACTIC"
        );
    }

    #[test]
    fn test_scenario_all_inadequate() {
        let turns: Vec<CodedTurn> = (0..5)
            .map(|i| {
                let mut c = Classification::with_mode(CommunicationMode::Verbal);
                c.is_inadequate = true;
                CodedTurn::new(i, i as f64).classified(c)
            })
            .collect();

        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert_eq!(stats.tt_ad, 0.0);
    }

    #[test]
    fn test_scenario_eye_contact_presence_vs_adequacy() {
        let turns: Vec<CodedTurn> = (0..3)
            .map(|i| {
                let mut c = Classification::with_mode(CommunicationMode::Verbal);
                c.is_eye_contact_adequate = i == 0;
                CodedTurn::new(i, i as f64).with_eye_contact(true).classified(c)
            })
            .collect();
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);

        assert!((stats.ec_pres - 1.0).abs() < EPS);
        assert!((stats.ec_ad - 1.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_communicative_mode_bands() {
        use CommunicativeMode::*;

        let cases = [
            ((6, 6, 10), PredominantlyVerbal),
            ((5, 5, 10), MixedToPredominantlyVerbal),
            ((4, 4, 10), MixedToPredominantlyVerbal),
            ((3, 9, 10), Mixed),
            ((1, 9, 10), MixedPredominantlyGestural),
            ((0, 9, 10), PredominantlyGestural),
            ((0, 0, 10), NotAvailable),
            ((0, 0, 0), NotAvailable),
        ];
        for ((verbal, vt_or_gt, total), expected) in cases {
            assert_eq!(
                classify_communicative_mode(verbal, vt_or_gt, total),
                expected,
                "verbal={verbal} vt_or_gt={vt_or_gt} total={total}"
            );
        }
    }

    #[test]
    fn test_gestural_only_session_is_predominantly_gestural() {
        let turns: Vec<CodedTurn> = (0..3).map(|i| coded(i, CommunicationMode::Gestural)).collect();
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert_eq!(stats.communicative_mode, CommunicativeMode::PredominantlyGestural);
        assert!((stats.tt_cons - 1.0).abs() < EPS);
    }

    #[test]
    fn test_both_and_no_response_do_not_count_as_vt_or_gt() {
        let turns = vec![
            coded(1, CommunicationMode::Both),
            coded(2, CommunicationMode::NoResponse),
        ];
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert_eq!(stats.communicative_mode, CommunicativeMode::NotAvailable);
        assert_eq!(stats.tt_cons, 0.0);
        assert!((stats.tt_ad - 1.0).abs() < EPS);
    }

    #[test]
    fn test_initiative_uses_vt_or_gt_denominator() {
        let mut verbal = Classification::with_mode(CommunicationMode::Verbal);
        verbal.child_provides_new_info = true;
        let mut both = Classification::with_mode(CommunicationMode::Both);
        both.child_provides_new_info = true;

        let turns = vec![
            CodedTurn::new(1, 1.0).classified(verbal),
            CodedTurn::new(2, 2.0).classified(both),
            coded(3, CommunicationMode::Gestural),
            CodedTurn::new(4, 4.0),
        ];
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);

        // 1 new-info VT turn out of 2 VT/GT turns; the BOTH turn is ignored
        assert!((stats.initiative - 0.5).abs() < EPS);
    }

    #[test]
    fn test_auditory_autonomy() {
        let mut auditory = Classification::with_mode(CommunicationMode::Verbal);
        auditory.uses_only_auditory_channel = true;
        let turns = vec![
            CodedTurn::new(1, 1.0).classified(auditory),
            coded(2, CommunicationMode::Verbal),
            CodedTurn::new(3, 3.0),
            CodedTurn::new(4, 4.0),
        ];
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert!((stats.aut - 0.25).abs() < EPS);
    }

    #[test]
    fn test_predominant_vocalization_first_seen_wins_ties() {
        let turns = vec![
            with_vocalization(1, VocalizationType::Sv),
            with_vocalization(2, VocalizationType::Pb),
            with_vocalization(3, VocalizationType::Pb),
            with_vocalization(4, VocalizationType::Sv),
        ];
        assert_eq!(predominant_vocalization(&turns), Some(VocalizationType::Sv));

        let reversed: Vec<CodedTurn> = turns.into_iter().rev().collect();
        assert_eq!(predominant_vocalization(&reversed), Some(VocalizationType::Sv));

        let pb_first = vec![
            with_vocalization(1, VocalizationType::Pb),
            with_vocalization(2, VocalizationType::Sv),
        ];
        assert_eq!(predominant_vocalization(&pb_first), Some(VocalizationType::Pb));
    }

    #[test]
    fn test_predominant_vocalization_majority() {
        let turns = vec![
            with_vocalization(1, VocalizationType::Svi),
            with_vocalization(2, VocalizationType::SvPlusC),
            with_vocalization(3, VocalizationType::SvPlusC),
            coded(4, CommunicationMode::Gestural),
        ];
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert_eq!(stats.predominant_vocalization_label(), "SV+C");
    }

    #[test]
    fn test_gestural_sentinel_counts_as_a_vocalization() {
        let turns = vec![
            with_vocalization(1, VocalizationType::None),
            with_vocalization(2, VocalizationType::None),
            with_vocalization(3, VocalizationType::S),
        ];
        assert_eq!(predominant_vocalization(&turns), Some(VocalizationType::None));
    }

    #[test]
    fn test_single_dominant_style() {
        let turns = vec![
            with_strategies(1, &["repeat", "expand"]),
            with_strategies(2, &["encourage"]),
            with_strategies(3, &["openQuestions"]),
        ];
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert!((stats.parental_style.percentages.tutorial - 75.0).abs() < EPS);
        assert_eq!(
            stats.parental_style.predominant_style,
            PredominantStyle::Single(ParentalStyle::Tutorial)
        );
    }

    #[test]
    fn test_predominant_style_thresholds() {
        // top >= 25 with a non-zero second → combined, ranked by percentage
        let p = StylePercentages {
            tutorial: 20.0,
            didactic: 35.0,
            directive: 20.0,
            conversational: 25.0,
        };
        assert_eq!(
            predominant_style(&p, 20),
            PredominantStyle::Combined(ParentalStyle::Didactic, ParentalStyle::Conversational)
        );

        // top exactly 40 stands alone
        let p = StylePercentages {
            tutorial: 30.0,
            didactic: 40.0,
            directive: 30.0,
            conversational: 0.0,
        };
        assert_eq!(
            predominant_style(&p, 10),
            PredominantStyle::Single(ParentalStyle::Didactic)
        );

        // top below 25 → no specific style
        let p = StylePercentages {
            tutorial: 24.0,
            didactic: 24.0,
            directive: 24.0,
            conversational: 24.5,
        };
        assert_eq!(predominant_style(&p, 100), PredominantStyle::NoSpecificStyle);

        assert_eq!(
            predominant_style(&StylePercentages::default(), 0),
            PredominantStyle::NoSpecificStyle
        );
    }

    #[test]
    fn test_unknown_and_unmapped_strategies_are_ignored() {
        let turns = vec![
            with_strategies(1, &["notInTheScheme", "intrusion", "missTurn"]),
            with_strategies(2, &["unknownWords"]),
        ];
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert_eq!(stats.parental_style.percentages.total(), 0.0);
        assert_eq!(
            stats.parental_style.predominant_style,
            PredominantStyle::NoSpecificStyle
        );
    }

    #[test]
    fn test_unchecked_strategies_do_not_count() {
        let mut c = Classification::with_mode(CommunicationMode::Verbal);
        c.parent_communication.insert("repeat".to_string(), false);
        c.flag_strategy("empathic");
        let stats = compute_statistics(&[CodedTurn::new(1, 1.0).classified(c)]);
        assert_snapshot_in_range(&stats);
        assert!((stats.parental_style.percentages.conversational - 100.0).abs() < EPS);
        assert_eq!(stats.parental_style.percentages.tutorial, 0.0);
    }

    #[test]
    fn test_style_percentages_sum_to_zero_or_hundred() {
        let turns = vec![
            with_strategies(1, &["closedQuestions", "correct", "initiative"]),
            with_strategies(2, &["reference", "selfAnswers"]),
            with_strategies(3, &["closedQuestions"]),
        ];
        let stats = compute_statistics(&turns);
        assert_snapshot_in_range(&stats);
        assert!((stats.parental_style.percentages.total() - 100.0).abs() < 1e-6);

        let empty = compute_statistics(&[CodedTurn::new(1, 0.0)]);
        assert_snapshot_in_range(&empty);
        assert_eq!(empty.parental_style.percentages.total(), 0.0);
    }

    #[test]
    fn test_idempotent_and_order_independent_ratios() {
        let mut turns = vec![
            coded(1, CommunicationMode::Verbal),
            with_strategies(2, &["denominate", "paraphrase"]),
            coded(3, CommunicationMode::Gestural).with_eye_contact(true),
            CodedTurn::new(4, 4.0).with_eye_contact(true),
            coded(5, CommunicationMode::NoResponse),
        ];

        let first = compute_statistics(&turns);
        let second = compute_statistics(&turns);
        assert_eq!(first, second);
        assert_snapshot_in_range(&first);

        turns.reverse();
        let permuted = compute_statistics(&turns);
        assert_snapshot_in_range(&permuted);
        assert_eq!(first.ratios(), permuted.ratios());
        assert_eq!(first.communicative_mode, permuted.communicative_mode);
        assert_eq!(first.parental_style, permuted.parental_style);
    }
}
