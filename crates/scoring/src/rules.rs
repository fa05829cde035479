//! Weighted-sum rule engine.

use tracing::debug;
use vouch_core::Signal;

/// Sum signal weights and clamp into `0..=100`.
///
/// Deterministic, total, pure: `ok` signals carry weight 0 and do not
/// affect the score.
#[must_use]
pub fn rule_score(signals: &[Signal]) -> i16 {
    let raw: u32 = signals.iter().map(|s| u32::from(s.weight)).sum();
    let score = raw.min(100);
    debug!(raw, score, "rule score computed");

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    {
        score as i16
    }
}

/// Combine the rule score with the LLM adjustment, clamped into `0..=100`.
#[must_use]
pub fn hybrid_score(rule_score: i16, llm_adjustment: i16) -> i16 {
    (rule_score + llm_adjustment).clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_core::{SignalSeverity, SignalStatus};

    fn weighted(weight: u8) -> Signal {
        Signal::new(
            "domain_age",
            SignalStatus::Suspicious,
            "Check failed",
            weight,
            SignalSeverity::High,
        )
    }

    #[test]
    fn empty_signals_score_zero() {
        assert_eq!(rule_score(&[]), 0);
    }

    #[test]
    fn ok_signals_do_not_count() {
        let signals = vec![Signal::ok("domain_age", "812 days"), weighted(25)];
        assert_eq!(rule_score(&signals), 25);
    }

    #[test]
    fn sums_are_clamped_to_100() {
        let signals = vec![weighted(50), weighted(50), weighted(50)];
        assert_eq!(rule_score(&signals), 100);
    }

    #[test]
    fn hybrid_adds_adjustment() {
        assert_eq!(hybrid_score(65, 10), 75);
        assert_eq!(hybrid_score(30, -20), 10);
    }

    #[test]
    fn hybrid_clamps_both_ends() {
        assert_eq!(hybrid_score(95, 20), 100);
        assert_eq!(hybrid_score(5, -20), 0);
    }
}
