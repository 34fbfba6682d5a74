//! Collapses individual survey responses into per-state poll estimates.

use log::{debug, info};
use std::collections::BTreeMap;

use crate::config::*;

/// One survey respondent, as read from the survey export.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Response {
    /// FIPS code of the state of residence.
    pub state_fips: u32,
    /// The answer to the preference question. A missing answer means that the
    /// respondent is out of scope for every indicator.
    pub preference: Option<PreferenceCode>,
    pub likely_voter: bool,
}

/// Decides which candidate, if any, a response supports.
///
/// Closures can be used directly:
///
/// ```
/// use data_defect::*;
///
/// let everyone_for_harris = |_code: PreferenceCode| Stance::Supports(Candidate::Harris);
/// assert_eq!(
///     everyone_for_harris.classify(PreferenceCode::Other),
///     Stance::Supports(Candidate::Harris)
/// );
/// ```
pub trait PreferencePolicy {
    fn classify(&self, code: PreferenceCode) -> Stance;
}

impl<F> PreferencePolicy for F
where
    F: Fn(PreferenceCode) -> Stance,
{
    fn classify(&self, code: PreferenceCode) -> Stance {
        self(code)
    }
}

/// The standard reading of the preference question, with an optional
/// re-coding of the "not sure" answers.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct PreferenceRules {
    pub unsure_as: Option<Candidate>,
}

impl PreferenceRules {
    pub const DEFAULT_RULES: PreferenceRules = PreferenceRules { unsure_as: None };
}

impl PreferencePolicy for PreferenceRules {
    fn classify(&self, code: PreferenceCode) -> Stance {
        match (code, self.unsure_as) {
            (PreferenceCode::Harris, _) => Stance::Supports(Candidate::Harris),
            (PreferenceCode::Trump, _) => Stance::Supports(Candidate::Trump),
            (PreferenceCode::NotSure, Some(c)) => Stance::Supports(c),
            _ => Stance::Abstain,
        }
    }
}

/// The poll estimates for one state and one subpopulation.
#[derive(PartialEq, Debug, Clone)]
pub struct StatePoll {
    pub state_fips: u32,
    pub trump: f64,
    pub harris: f64,
    pub respondents: u64,
}

impl StatePoll {
    pub fn poll(&self, candidate: Candidate) -> f64 {
        match candidate {
            Candidate::Trump => self.trump,
            Candidate::Harris => self.harris,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct AggregatedPolls {
    /// Ordered by FIPS code. States without respondents are absent.
    pub all: Vec<StatePoll>,
    /// Ordered by FIPS code. States without likely voters are absent.
    pub likely: Vec<StatePoll>,
}

impl AggregatedPolls {
    pub fn get(&self, sub: Subpopulation) -> &[StatePoll] {
        match sub {
            Subpopulation::All => &self.all,
            Subpopulation::Likely => &self.likely,
        }
    }
}

#[derive(Default, Debug, Clone, Copy)]
struct Tally {
    trump: u64,
    harris: u64,
    count: u64,
}

impl Tally {
    fn add(&mut self, stance: Stance) {
        self.count += 1;
        match stance {
            Stance::Supports(Candidate::Trump) => self.trump += 1,
            Stance::Supports(Candidate::Harris) => self.harris += 1,
            Stance::Abstain => {}
        }
    }
}

fn finish(tallies: BTreeMap<u32, Tally>) -> Vec<StatePoll> {
    tallies
        .into_iter()
        // Never zero-fill: a state without respondents would divide by zero later.
        .filter(|(_, t)| t.count > 0)
        .map(|(state_fips, t)| StatePoll {
            state_fips,
            trump: t.trump as f64 / t.count as f64,
            harris: t.harris as f64 / t.count as f64,
            respondents: t.count,
        })
        .collect()
}

/// Computes the per-state mean support of each candidate, for all the respondents
/// with a preference and for the likely voters among them.
pub fn aggregate_responses<P: PreferencePolicy + ?Sized>(
    responses: &[Response],
    policy: &P,
) -> AggregatedPolls {
    info!("aggregate_responses: processing {} responses", responses.len());
    let mut all: BTreeMap<u32, Tally> = BTreeMap::new();
    let mut likely: BTreeMap<u32, Tally> = BTreeMap::new();
    let mut out_of_scope: usize = 0;

    for r in responses.iter() {
        let code = match r.preference {
            Some(code) => code,
            None => {
                out_of_scope += 1;
                continue;
            }
        };
        let stance = policy.classify(code);
        all.entry(r.state_fips).or_default().add(stance);
        if r.likely_voter {
            likely.entry(r.state_fips).or_default().add(stance);
        }
    }

    debug!(
        "aggregate_responses: {} responses without preference, {} states, {} states with likely voters",
        out_of_scope,
        all.len(),
        likely.len()
    );

    AggregatedPolls {
        all: finish(all),
        likely: finish(likely),
    }
}

/// Whether an answer to the turnout intent question marks a likely voter.
pub fn is_likely_intent(code: u32) -> bool {
    LIKELY_VOTER_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(state_fips: u32, code: Option<u32>, likely_voter: bool) -> Response {
        Response {
            state_fips,
            preference: code.map(PreferenceCode::from_code),
            likely_voter,
        }
    }

    fn sample() -> Vec<Response> {
        vec![
            resp(55, Some(2), true),
            resp(55, Some(1), true),
            resp(55, Some(5), false),
            resp(55, Some(3), true),
            resp(55, None, true),
            resp(6, Some(1), false),
            resp(6, Some(2), false),
        ]
    }

    #[test]
    fn standard_rules() {
        let res = aggregate_responses(&sample(), &PreferenceRules::DEFAULT_RULES);
        assert_eq!(
            res.all,
            vec![
                StatePoll {
                    state_fips: 6,
                    trump: 0.5,
                    harris: 0.5,
                    respondents: 2
                },
                StatePoll {
                    state_fips: 55,
                    trump: 0.25,
                    harris: 0.25,
                    respondents: 4
                },
            ]
        );
        // California has no likely voters: it is omitted rather than zero-filled.
        assert_eq!(res.likely.len(), 1);
        assert_eq!(res.likely[0].state_fips, 55);
        assert_eq!(res.likely[0].respondents, 3);
        assert!((res.likely[0].trump - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn unsure_counts_as_trump() {
        let rules = PreferenceRules {
            unsure_as: Some(Candidate::Trump),
        };
        let res = aggregate_responses(&sample(), &rules);
        let wi = &res.all[1];
        assert_eq!(wi.respondents, 4);
        assert_eq!(wi.trump, 0.5);
        assert_eq!(wi.harris, 0.25);
    }

    #[test]
    fn closure_policy() {
        let only_trump = |code: PreferenceCode| match code {
            PreferenceCode::Trump => Stance::Supports(Candidate::Trump),
            _ => Stance::Abstain,
        };
        let res = aggregate_responses(&sample(), &only_trump);
        assert!(res.all.iter().all(|p| p.harris == 0.0));
        assert_eq!(res.all[0].trump, 0.5);
    }

    #[test]
    fn shares_stay_in_unit_interval() {
        let res = aggregate_responses(&sample(), &PreferenceRules::DEFAULT_RULES);
        for p in res.all.iter().chain(res.likely.iter()) {
            assert!(p.trump >= 0.0 && p.harris >= 0.0);
            assert!(p.trump + p.harris <= 1.0);
        }
    }

    #[test]
    fn intent_codes() {
        assert!(is_likely_intent(1));
        assert!(is_likely_intent(4));
        assert!(!is_likely_intent(5));
        assert!(!is_likely_intent(6));
    }
}
