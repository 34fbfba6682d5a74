//! Bias correction of raw polls with a fixed data defect correlation.
//!
//! Unlike the estimator in [`crate::defect`], nothing here needs the actual results,
//! so the correction can be applied before an election.

use log::{debug, warn};
use snafu::ensure;

use crate::config::*;
use crate::defect::{bernoulli_sigma, check_proportion, check_sample_ratio, design_factor};

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Corrected {
    pub f: f64,
    pub sigma: f64,
    pub bias_correction_term: f64,
    /// The corrected estimate for the candidate whose poll was corrected.
    pub corrected: f64,
    /// `1 - corrected`. This ignores third parties.
    pub complement: f64,
}

/// `poll - rho * sqrt((1 - f) / f) * sqrt(poll (1 - poll))`
pub fn correct_poll(poll: f64, f: f64, rules: &CorrectionRules) -> DefectResult<Corrected> {
    check_proportion(poll, "poll estimate")?;
    check_sample_ratio(f)?;
    ensure!(
        f.is_nan() || f >= rules.min_sample_ratio,
        SampleRatioBelowThresholdSnafu {
            f,
            threshold: rules.min_sample_ratio
        }
    );
    let sigma = bernoulli_sigma(poll);
    let bias_correction_term = rules.rho * design_factor(f) * sigma;
    let corrected = poll - bias_correction_term;
    Ok(Corrected {
        f,
        sigma,
        bias_correction_term,
        corrected,
        complement: 1.0 - corrected,
    })
}

/// The turnout figures used to estimate the number of voters of a state.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Turnout {
    /// Turnout rate of the voting-eligible population at a previous election, in [0, 1].
    pub prior_turnout_rate: f64,
    /// Voting-eligible population at the current election.
    pub current_vep: f64,
}

/// The denominator of the sample ratio, and whether it had to fall back on the
/// certified total.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Population {
    pub votes: f64,
    pub fallback: bool,
}

/// Picks the population used for the sample ratio according to the policy.
///
/// Under [`SampleRatioPolicy::EstimatedVotes`], a state without usable turnout figures
/// falls back to `total_votes`. The fallback is logged and reported in the result.
pub fn population(
    policy: SampleRatioPolicy,
    state: &str,
    turnout: Option<&Turnout>,
    total_votes: f64,
) -> Population {
    match policy {
        SampleRatioPolicy::TotalVotes => Population {
            votes: total_votes,
            fallback: false,
        },
        SampleRatioPolicy::EstimatedVotes => {
            let estimated = turnout
                .map(|t| t.prior_turnout_rate * t.current_vep)
                .filter(|v| v.is_finite());
            match estimated {
                Some(votes) => {
                    debug!("population: {}: estimated votes {}", state, votes);
                    Population {
                        votes,
                        fallback: false,
                    }
                }
                None => {
                    warn!(
                        "population: {}: no turnout data, using total votes {} instead",
                        state, total_votes
                    );
                    Population {
                        votes: total_votes,
                        fallback: true,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn worked_example() {
        let f = 1000.0 / 3_000_000.0;
        let c = correct_poll(0.52, f, &CorrectionRules::DEFAULT_RULES).unwrap();
        assert!(close(c.sigma, 0.4996, 1e-4));
        assert!(close(c.bias_correction_term, -0.1231, 1e-3));
        assert!(close(c.corrected, 0.6431, 1e-3));
        assert!(close(c.complement, 1.0 - c.corrected, 1e-15));
    }

    #[test]
    fn zero_rho_is_identity() {
        let rules = CorrectionRules {
            rho: 0.0,
            ..CorrectionRules::DEFAULT_RULES
        };
        for (poll, f) in [(0.52, 1e-4), (0.31, 0.2), (0.9, 0.999)] {
            let c = correct_poll(poll, f, &rules).unwrap();
            assert_eq!(c.corrected, poll);
        }
    }

    #[test]
    fn term_vanishes_when_everyone_is_polled() {
        let rules = CorrectionRules::DEFAULT_RULES;
        let near = correct_poll(0.52, 1.0 - 1e-12, &rules).unwrap();
        assert!(near.bias_correction_term.abs() < 1e-8);
        let far = correct_poll(0.52, 1e-3, &rules).unwrap();
        assert!(far.bias_correction_term.abs() > near.bias_correction_term.abs());
    }

    #[test]
    fn tiny_sample_ratio_is_rejected() {
        let res = correct_poll(0.52, 1e-9, &CorrectionRules::DEFAULT_RULES);
        assert!(matches!(
            res,
            Err(DefectError::SampleRatioBelowThreshold { .. })
        ));
        let res = correct_poll(0.52, 0.0, &CorrectionRules::DEFAULT_RULES);
        assert!(matches!(res, Err(DefectError::SampleRatioOutOfRange { .. })));
        let res = correct_poll(0.52, 1.0, &CorrectionRules::DEFAULT_RULES);
        assert!(matches!(res, Err(DefectError::SampleRatioOutOfRange { .. })));
    }

    #[test]
    fn poll_given_as_percent_is_rejected() {
        let f = 1000.0 / 3_000_000.0;
        let res = correct_poll(52.0, f, &CorrectionRules::DEFAULT_RULES);
        assert!(matches!(
            res,
            Err(DefectError::ProportionOutOfRange { value, .. }) if value == 52.0
        ));
        assert!(correct_poll(1.0, f, &CorrectionRules::DEFAULT_RULES).is_ok());
    }

    #[test]
    fn missing_poll_stays_missing() {
        let c = correct_poll(f64::NAN, 1e-3, &CorrectionRules::DEFAULT_RULES).unwrap();
        assert!(c.corrected.is_nan());
        assert!(c.complement.is_nan());
    }

    #[test]
    fn population_policies() {
        let t = Turnout {
            prior_turnout_rate: 0.6,
            current_vep: 1_000_000.0,
        };
        let p = population(SampleRatioPolicy::TotalVotes, "Ohio", Some(&t), 5e5);
        assert_eq!(p.votes, 5e5);
        assert!(!p.fallback);

        let p = population(SampleRatioPolicy::EstimatedVotes, "Ohio", Some(&t), 5e5);
        assert!(close(p.votes, 600_000.0, 1e-6));
        assert!(!p.fallback);

        let p = population(SampleRatioPolicy::EstimatedVotes, "Ohio", None, 5e5);
        assert_eq!(p.votes, 5e5);
        assert!(p.fallback);

        let broken = Turnout {
            prior_turnout_rate: f64::NAN,
            current_vep: 1_000_000.0,
        };
        let p = population(SampleRatioPolicy::EstimatedVotes, "Ohio", Some(&broken), 5e5);
        assert!(p.fallback);
    }
}
