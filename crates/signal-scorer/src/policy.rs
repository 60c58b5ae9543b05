//! Component E (selection half): the Selection Policy, preventing strategy
//! thrashing via cooldown + hysteresis.
//!
//! Grounded on `original_source/app/adaptive/policy.py::SelectionPolicy`
//! exactly: no prior commitment always allows; inside the cooldown window
//! only the already-committed strategy is allowed; past the cooldown,
//! switching requires the candidate to beat the last score by at least
//! `hysteresis_delta`.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct SelectionPolicyState {
    pub cooldown_seconds: i64,
    pub hysteresis_delta: f64,
    pub last_strategy: Option<String>,
    pub last_selected_at: Option<DateTime<Utc>>,
    pub last_score: Option<f64>,
}

impl SelectionPolicyState {
    pub fn new(cooldown_seconds: i64, hysteresis_delta: f64) -> Self {
        Self {
            cooldown_seconds,
            hysteresis_delta,
            last_strategy: None,
            last_selected_at: None,
            last_score: None,
        }
    }

    pub fn allow(&self, now: DateTime<Utc>, candidate_strategy: &str, candidate_score: f64) -> bool {
        let (last_strategy, last_selected_at, last_score) =
            match (&self.last_strategy, self.last_selected_at, self.last_score) {
                (Some(s), Some(t), Some(sc)) => (s, t, sc),
                _ => return true,
            };

        if now - last_selected_at < chrono::Duration::seconds(self.cooldown_seconds) {
            return candidate_strategy == last_strategy;
        }

        if candidate_strategy != last_strategy {
            return (candidate_score - last_score) >= self.hysteresis_delta;
        }

        true
    }

    pub fn commit(&mut self, now: DateTime<Utc>, strategy: &str, score: f64) {
        self.last_strategy = Some(strategy.to_string());
        self.last_selected_at = Some(now);
        self.last_score = Some(score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::seconds(offset_secs)
    }

    #[test]
    fn no_prior_commitment_always_allows() {
        let policy = SelectionPolicyState::new(120, 12.0);
        assert!(policy.allow(t(0), "smc_trend", 50.0));
    }

    #[test]
    fn cooldown_blocks_switching_to_a_different_strategy() {
        let mut policy = SelectionPolicyState::new(120, 12.0);
        policy.commit(t(0), "smc_trend", 50.0);
        assert!(!policy.allow(t(30), "vp_range", 80.0));
        assert!(policy.allow(t(30), "smc_trend", 55.0));
    }

    #[test]
    fn past_cooldown_requires_hysteresis_margin_to_switch() {
        let mut policy = SelectionPolicyState::new(120, 12.0);
        policy.commit(t(0), "smc_trend", 50.0);
        assert!(!policy.allow(t(200), "vp_range", 55.0));
        assert!(policy.allow(t(200), "vp_range", 63.0));
    }

    #[test]
    fn commit_updates_state() {
        let mut policy = SelectionPolicyState::new(120, 12.0);
        policy.commit(t(0), "smc_trend", 50.0);
        assert_eq!(policy.last_strategy.as_deref(), Some("smc_trend"));
        assert_eq!(policy.last_score, Some(50.0));
    }
}
