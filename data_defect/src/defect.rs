//! The data defect correlation of a poll and the statistics derived from it.
//!
//! All the quantities are computed per state and per candidate, independently of
//! the other rows. Missing inputs (NaN) flow through to NaN outputs: the checks
//! below only reject values that are known to be invalid.

use log::debug;
use snafu::ensure;

use crate::config::*;

/// The inputs for one candidate in one state.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct DefectInput {
    /// Poll estimate of the vote share.
    pub poll: f64,
    /// Actual vote share.
    pub share: f64,
    /// Number of respondents (the sample size `n`).
    pub respondents: f64,
    /// Number of votes cast (the population size `N`).
    pub total_votes: f64,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct DefectStats {
    pub error: f64,
    pub sigma_g: f64,
    pub sample_ratio: f64,
    pub data_defect_correlation: f64,
    pub data_defect_index_lower_bound: f64,
    pub effective_sample_size: f64,
    pub percentage_reduction: f64,
    pub s_g_sq: f64,
    pub var_srs: f64,
    /// `Z_{n,N}`: the error in units of the finite-population SRS standard error.
    pub z_n_n: f64,
    /// `Z_n`: the error in units of the standard error estimated from the poll itself.
    pub z_n: f64,
}

/// `f = n / N`, which must lie strictly between 0 and 1.
pub fn sample_ratio(respondents: f64, population: f64) -> DefectResult<f64> {
    let f = respondents / population;
    check_sample_ratio(f)?;
    Ok(f)
}

pub(crate) fn check_sample_ratio(f: f64) -> DefectResult<()> {
    ensure!(f.is_nan() || (f > 0.0 && f < 1.0), SampleRatioOutOfRangeSnafu { f });
    Ok(())
}

/// A vote share or poll estimate must lie in [0, 1] unless it is missing.
pub(crate) fn check_proportion(value: f64, what: &'static str) -> DefectResult<()> {
    ensure!(
        value.is_nan() || (0.0..=1.0).contains(&value),
        ProportionOutOfRangeSnafu { value, what }
    );
    Ok(())
}

/// Bernoulli standard deviation `sqrt(p (1 - p))`.
pub fn bernoulli_sigma(p: f64) -> f64 {
    (p * (1.0 - p)).sqrt()
}

/// `sqrt((1 - f) / f)`: the factor that the data defect correlation is scaled by.
pub fn design_factor(f: f64) -> f64 {
    ((1.0 - f) / f).sqrt()
}

/// `Z_n = (poll - share) / sqrt(poll (1 - poll) / n)`.
pub fn z_score(poll: f64, share: f64, respondents: f64) -> DefectResult<f64> {
    ensure!(
        respondents.is_nan() || respondents > 0.0,
        NoRespondentsSnafu { count: respondents }
    );
    ensure!(
        poll.is_nan() || (poll > 0.0 && poll < 1.0),
        PollOutOfRangeSnafu { poll }
    );
    Ok((poll - share) / (poll * (1.0 - poll) / respondents).sqrt())
}

pub fn estimate_defect(input: &DefectInput) -> DefectResult<DefectStats> {
    let n = input.respondents;
    let big_n = input.total_votes;
    check_proportion(input.poll, "poll estimate")?;
    check_proportion(input.share, "vote share")?;

    let error = input.poll - input.share;
    let sigma_g = bernoulli_sigma(input.share);
    let f = sample_ratio(n, big_n)?;

    let data_defect_correlation = error / (sigma_g * design_factor(f));
    let data_defect_index_lower_bound = data_defect_correlation.powi(2);

    ensure!(
        big_n.is_nan() || big_n > 1.0,
        PopulationTooSmallSnafu { total_votes: big_n }
    );
    let s_g_sq = big_n / (big_n - 1.0) * sigma_g.powi(2);
    let var_srs = (1.0 - f) / n * s_g_sq;
    ensure!(
        var_srs.is_nan() || var_srs > 0.0,
        NonPositiveVarianceSnafu { var: var_srs }
    );
    let z_n_n = error / var_srs.sqrt();

    ensure!(data_defect_correlation != 0.0, ZeroCorrelationSnafu {});
    let effective_sample_size = (f / (1.0 - f)) / data_defect_index_lower_bound;
    let percentage_reduction = (1.0 - effective_sample_size / n) * 100.0;

    let z_n = z_score(input.poll, input.share, n)?;

    let res = DefectStats {
        error,
        sigma_g,
        sample_ratio: f,
        data_defect_correlation,
        data_defect_index_lower_bound,
        effective_sample_size,
        percentage_reduction,
        s_g_sq,
        var_srs,
        z_n_n,
        z_n,
    };
    debug!("estimate_defect: {:?} -> {:?}", input, res);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn base() -> DefectInput {
        DefectInput {
            poll: 0.52,
            share: 0.50,
            respondents: 1000.0,
            total_votes: 3_000_000.0,
        }
    }

    #[test]
    fn worked_example() {
        let s = estimate_defect(&base()).unwrap();
        assert!(close(s.error, 0.02, 1e-12));
        assert!(close(s.sigma_g, 0.5, 1e-12));
        assert!(close(s.sample_ratio, 1.0 / 3000.0, 1e-15));
        assert!(close(s.data_defect_correlation, 7.3042e-4, 1e-7));
        // With f / (1 - f) cancelling out, n_eff = sigma_g^2 / error^2.
        assert!(close(s.effective_sample_size, 625.0, 1e-6));
        assert!(close(s.percentage_reduction, 37.5, 1e-6));
        assert!(close(s.s_g_sq, 0.25, 1e-6));
        assert!(close(s.z_n_n, 1.2651, 1e-3));
        assert!(close(s.z_n, 1.2659, 1e-3));
    }

    #[test]
    fn correlation_sign_follows_error() {
        let over = estimate_defect(&base()).unwrap();
        let under = estimate_defect(&DefectInput {
            poll: 0.47,
            ..base()
        })
        .unwrap();
        assert!(over.error > 0.0 && over.data_defect_correlation > 0.0);
        assert!(under.error < 0.0 && under.data_defect_correlation < 0.0);
        assert!(under.z_n_n < 0.0 && under.z_n < 0.0);
    }

    #[test]
    fn correlation_scales_inversely_with_design_factor() {
        let a = estimate_defect(&base()).unwrap();
        // Four times more respondents: sqrt((1 - f) / f) is roughly halved.
        let b = estimate_defect(&DefectInput {
            respondents: 4000.0,
            ..base()
        })
        .unwrap();
        let scale_a = a.sigma_g * design_factor(a.sample_ratio);
        let scale_b = b.sigma_g * design_factor(b.sample_ratio);
        assert!(close(
            a.data_defect_correlation * scale_a,
            b.data_defect_correlation * scale_b,
            1e-12
        ));
        assert!(b.data_defect_correlation > a.data_defect_correlation);
    }

    #[test]
    fn deterministic() {
        assert_eq!(estimate_defect(&base()).unwrap(), estimate_defect(&base()).unwrap());
    }

    #[test]
    fn sample_ratio_out_of_range() {
        for (n, big_n) in [(0.0, 100.0), (100.0, 100.0), (200.0, 100.0), (-1.0, 10.0)] {
            let res = estimate_defect(&DefectInput {
                respondents: n,
                total_votes: big_n,
                ..base()
            });
            assert!(
                matches!(res, Err(DefectError::SampleRatioOutOfRange { .. })),
                "{:?}",
                res
            );
        }
    }

    #[test]
    fn zero_correlation() {
        let res = estimate_defect(&DefectInput {
            poll: 0.5,
            ..base()
        });
        assert!(matches!(res, Err(DefectError::ZeroCorrelation {})));
    }

    #[test]
    fn degenerate_share() {
        let res = estimate_defect(&DefectInput {
            share: 0.0,
            ..base()
        });
        assert!(matches!(res, Err(DefectError::NonPositiveVariance { .. })));
    }

    #[test]
    fn nan_propagates() {
        let s = estimate_defect(&DefectInput {
            poll: f64::NAN,
            ..base()
        })
        .unwrap();
        assert!(s.error.is_nan());
        assert!(s.data_defect_correlation.is_nan());
        assert!(s.effective_sample_size.is_nan());
        assert!(s.z_n_n.is_nan());
        assert!(s.z_n.is_nan());
        // The columns that do not depend on the poll are still computed.
        assert!(close(s.sigma_g, 0.5, 1e-12));

        let s = estimate_defect(&DefectInput {
            respondents: f64::NAN,
            ..base()
        })
        .unwrap();
        assert!(s.sample_ratio.is_nan());
        assert!(s.var_srs.is_nan());
    }

    #[test]
    fn proportions_out_of_range() {
        for input in [
            DefectInput {
                share: 1.5,
                ..base()
            },
            DefectInput {
                poll: 52.0,
                ..base()
            },
            DefectInput {
                poll: -0.1,
                ..base()
            },
        ] {
            let res = estimate_defect(&input);
            assert!(
                matches!(res, Err(DefectError::ProportionOutOfRange { .. })),
                "{:?}",
                res
            );
        }
    }

    #[test]
    fn z_score_domain() {
        assert!(matches!(
            z_score(1.0, 0.5, 100.0),
            Err(DefectError::PollOutOfRange { .. })
        ));
        assert!(matches!(
            z_score(0.5, 0.5, 0.0),
            Err(DefectError::NoRespondents { .. })
        ));
        assert!(close(z_score(0.55, 0.5, 100.0).unwrap(), 1.00504, 1e-4));
    }
}
