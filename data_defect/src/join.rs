//! Joins the aggregated polls with the certified results, keyed by state.

use log::{debug, warn};
use std::collections::{HashMap, HashSet};

use crate::aggregate::StatePoll;
use crate::config::*;
use crate::states::{self, normalize_state_name};

/// The certified outcome of the election in one state.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResult {
    pub state: String,
    pub trump_votes: u64,
    pub harris_votes: u64,
    pub total_votes: u64,
}

impl ElectionResult {
    /// Checks that the candidate votes fit in the total.
    pub fn validate(&self) -> DefectResult<()> {
        let candidates = self.trump_votes.checked_add(self.harris_votes);
        if candidates.map_or(true, |votes| votes > self.total_votes) {
            return InconsistentVotesSnafu {
                trump_votes: self.trump_votes,
                harris_votes: self.harris_votes,
                total_votes: self.total_votes,
            }
            .fail();
        }
        Ok(())
    }

    /// The vote share of a candidate, third parties included in the denominator.
    pub fn share(&self, candidate: Candidate) -> f64 {
        let votes = match candidate {
            Candidate::Trump => self.trump_votes,
            Candidate::Harris => self.harris_votes,
        };
        votes as f64 / self.total_votes as f64
    }
}

/// A state with both its poll estimate and its certified result.
#[derive(PartialEq, Debug, Clone)]
pub struct StateRecord {
    /// Title-cased state name, the join key.
    pub state: String,
    pub state_abbr: &'static str,
    pub state_fips: u32,
    pub trump_votes: u64,
    pub harris_votes: u64,
    pub total_votes: u64,
    pub trump_share: f64,
    pub harris_share: f64,
    pub classification: Option<Classification>,
    pub poll: StatePoll,
}

/// What a join left behind.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct JoinReport {
    pub matched: usize,
    /// Poll states without a certified result (or with an unknown FIPS code).
    pub unmatched_polls: Vec<String>,
    /// Result rows without a poll estimate.
    pub unmatched_results: Vec<String>,
}

impl JoinReport {
    pub fn dropped(&self) -> usize {
        self.unmatched_polls.len() + self.unmatched_results.len()
    }
}

/// Inner join of the polls with the results on the normalized state name, then a left
/// join with the classifications. The output follows the order of `results`.
///
/// Rows without a match are dropped and listed in the report.
pub fn join_polls(
    polls: &[StatePoll],
    results: &[ElectionResult],
    classifications: &HashMap<String, Classification>,
) -> DefectResult<(Vec<StateRecord>, JoinReport)> {
    let mut report = JoinReport::default();

    let mut polls_by_name: HashMap<String, &StatePoll> = HashMap::new();
    for p in polls.iter() {
        match states::by_fips(p.state_fips) {
            Some(info) => {
                polls_by_name.insert(normalize_state_name(info.name), p);
            }
            None => {
                warn!("join_polls: unknown FIPS code {}", p.state_fips);
                report
                    .unmatched_polls
                    .push(format!("FIPS {}", p.state_fips));
            }
        }
    }
    let classifications: HashMap<String, Classification> = classifications
        .iter()
        .map(|(k, v)| (normalize_state_name(k), *v))
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut records: Vec<StateRecord> = Vec::new();
    for r in results.iter() {
        let key = normalize_state_name(&r.state);
        let poll = match polls_by_name.get(&key) {
            Some(p) => *p,
            None => {
                debug!("join_polls: no poll for {:?}", r.state);
                report.unmatched_results.push(key);
                continue;
            }
        };
        r.validate()?;
        let classification = classifications.get(&key).cloned();
        if classification.is_none() {
            debug!("join_polls: no classification for {:?}", key);
        }
        let info = states::by_fips(poll.state_fips);
        seen.insert(key.clone());
        records.push(StateRecord {
            state: key,
            state_abbr: info.map(|i| i.abbr).unwrap_or(""),
            state_fips: poll.state_fips,
            trump_votes: r.trump_votes,
            harris_votes: r.harris_votes,
            total_votes: r.total_votes,
            trump_share: r.share(Candidate::Trump),
            harris_share: r.share(Candidate::Harris),
            classification,
            poll: poll.clone(),
        });
    }

    let mut missing: Vec<String> = polls_by_name
        .keys()
        .filter(|k| !seen.contains(*k))
        .cloned()
        .collect();
    missing.sort();
    report.unmatched_polls.extend(missing);
    report.matched = records.len();

    if report.dropped() > 0 {
        warn!(
            "join_polls: dropped {} row(s): polls without results {:?}, results without polls {:?}",
            report.dropped(),
            report.unmatched_polls,
            report.unmatched_results
        );
    }
    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(state: &str, t: u64, h: u64, total: u64) -> ElectionResult {
        ElectionResult {
            state: state.to_string(),
            trump_votes: t,
            harris_votes: h,
            total_votes: total,
        }
    }

    fn poll(state_fips: u32) -> StatePoll {
        StatePoll {
            state_fips,
            trump: 0.5,
            harris: 0.4,
            respondents: 100,
        }
    }

    #[test]
    fn drops_and_reports_unmatched() {
        let polls = vec![poll(55), poll(11), poll(72)];
        let results = vec![
            result("WISCONSIN", 1_700_000, 1_660_000, 3_420_000),
            result("district of columbia", 21_000, 295_000, 325_000),
            result("Texas", 6_390_000, 4_830_000, 11_390_000),
        ];
        let mut classes = HashMap::new();
        classes.insert("\"Wisconsin\"".to_string(), Classification::Swing);

        let (records, report) = join_polls(&polls, &results, &classes).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].state, "Wisconsin");
        assert_eq!(records[0].state_abbr, "WI");
        assert_eq!(records[0].classification, Some(Classification::Swing));
        assert_eq!(records[1].state, "District Of Columbia");
        assert_eq!(records[1].classification, None);
        assert_eq!(report.matched, 2);
        assert_eq!(report.unmatched_polls, vec!["FIPS 72".to_string()]);
        assert_eq!(report.unmatched_results, vec!["Texas".to_string()]);
        assert_eq!(report.dropped(), 2);
    }

    #[test]
    fn shares_are_bounded() {
        let (records, _) = join_polls(
            &[poll(55)],
            &[result("Wisconsin", 1_697_626, 1_668_229, 3_422_918)],
            &HashMap::new(),
        )
        .unwrap();
        let r = &records[0];
        assert!(r.trump_share >= 0.0 && r.trump_share <= 1.0);
        assert!(r.harris_share >= 0.0 && r.harris_share <= 1.0);
        assert!(r.trump_share + r.harris_share <= 1.0);
    }

    #[test]
    fn inconsistent_votes() {
        let res = join_polls(
            &[poll(55)],
            &[result("Wisconsin", 600, 500, 1000)],
            &HashMap::new(),
        );
        assert!(matches!(res, Err(DefectError::InconsistentVotes { .. })));
    }

    #[test]
    fn vote_counts_that_overflow() {
        let r = result("Wisconsin", u64::MAX, 1, u64::MAX);
        assert!(matches!(
            r.validate(),
            Err(DefectError::InconsistentVotes { .. })
        ));
    }
}
