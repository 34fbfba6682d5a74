// ********* Constants ***********

use snafu::Snafu;
use std::fmt::Display;
use std::str::FromStr;

/// Empirical data defect correlation used to correct raw polls before the
/// ground truth is known.
pub const RHO: f64 = -0.0045;

/// Sample ratios below this value are rejected by the bias corrector: the
/// correction term grows like `1 / sqrt(f)`.
pub const DEFAULT_MIN_SAMPLE_RATIO: f64 = 1e-6;

/// Answers to the turnout intent question that mark a respondent as a likely voter:
/// 1 = yes definitely, 2 = probably, 3 = already voted, 4 = plan to vote.
/// (5 = no and 6 = undecided are not likely voters.)
pub const LIKELY_VOTER_CODES: [u32; 4] = [1, 2, 3, 4];

// ********* Input data structures ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Candidate {
    Trump,
    Harris,
}

impl Candidate {
    pub const ALL: [Candidate; 2] = [Candidate::Trump, Candidate::Harris];

    /// The column prefix used for this candidate in all the tables.
    pub fn prefix(&self) -> &'static str {
        match self {
            Candidate::Trump => "trump",
            Candidate::Harris => "harris",
        }
    }

    pub fn other(&self) -> Candidate {
        match self {
            Candidate::Trump => Candidate::Harris,
            Candidate::Harris => Candidate::Trump,
        }
    }
}

impl Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// The population of respondents a poll estimate is computed over.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Subpopulation {
    /// Every respondent who answered the preference question.
    All,
    /// Only the respondents who also said they were likely to vote.
    Likely,
}

impl Subpopulation {
    pub const ALL: [Subpopulation; 2] = [Subpopulation::All, Subpopulation::Likely];

    pub fn suffix(&self) -> &'static str {
        match self {
            Subpopulation::All => "all",
            Subpopulation::Likely => "likely",
        }
    }

    pub fn poll_column(&self, candidate: Candidate) -> String {
        format!("{}_poll_{}", candidate.prefix(), self.suffix())
    }

    pub fn respondents_column(&self) -> String {
        format!("num_respondents_{}", self.suffix())
    }
}

/// Answer codes of the presidential preference question.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum PreferenceCode {
    Harris,
    Trump,
    Other,
    WontVote,
    NotSure,
    /// Any code outside of the questionnaire. It is treated like `Other`
    /// by the standard rules.
    Unlisted(u32),
}

impl PreferenceCode {
    pub fn from_code(code: u32) -> PreferenceCode {
        match code {
            1 => PreferenceCode::Harris,
            2 => PreferenceCode::Trump,
            3 => PreferenceCode::Other,
            4 => PreferenceCode::WontVote,
            5 => PreferenceCode::NotSure,
            x => PreferenceCode::Unlisted(x),
        }
    }
}

/// How a single response counts towards the candidates.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Stance {
    Supports(Candidate),
    Abstain,
}

/// The pre-election rating of a state. Only used for display purposes downstream.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Classification {
    Red,
    Blue,
    LikelyBlue,
    Swing,
}

impl FromStr for Classification {
    type Err = DefectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Red" => Ok(Classification::Red),
            "Blue" => Ok(Classification::Blue),
            "Likely Blue" => Ok(Classification::LikelyBlue),
            "Swing" => Ok(Classification::Swing),
            x => UnknownClassificationSnafu {
                label: x.to_string(),
            }
            .fail(),
        }
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::Red => "Red",
            Classification::Blue => "Blue",
            Classification::LikelyBlue => "Likely Blue",
            Classification::Swing => "Swing",
        };
        write!(f, "{}", s)
    }
}

// ********* Configuration **********

/// The denominator used for the sample ratio `f`.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SampleRatioPolicy {
    /// `f = respondents / total_votes`, using certified results.
    TotalVotes,
    /// `f = respondents / (prior turnout rate * current VEP)`, usable before the
    /// results are known. States without turnout data fall back to `total_votes`.
    EstimatedVotes,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CorrectionRules {
    pub rho: f64,
    pub min_sample_ratio: f64,
    pub sample_ratio_policy: SampleRatioPolicy,
}

impl CorrectionRules {
    pub const DEFAULT_RULES: CorrectionRules = CorrectionRules {
        rho: RHO,
        min_sample_ratio: DEFAULT_MIN_SAMPLE_RATIO,
        sample_ratio_policy: SampleRatioPolicy::TotalVotes,
    };
}

// ******** Errors *********

/// Errors that prevent a statistic from being computed.
///
/// All of them are deterministic: running again on the same input fails the same way.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DefectError {
    #[snafu(display("sample ratio {f} is outside of (0, 1)"))]
    SampleRatioOutOfRange { f: f64 },

    #[snafu(display("sample ratio {f} is below the minimum of {threshold}"))]
    SampleRatioBelowThreshold { f: f64, threshold: f64 },

    #[snafu(display(
        "data defect correlation is exactly zero: the effective sample size is unbounded"
    ))]
    ZeroCorrelation {},

    #[snafu(display("total votes must be greater than 1, got {total_votes}"))]
    PopulationTooSmall { total_votes: f64 },

    #[snafu(display("simple random sampling variance must be positive, got {var}"))]
    NonPositiveVariance { var: f64 },

    #[snafu(display("poll estimate {poll} is outside of (0, 1)"))]
    PollOutOfRange { poll: f64 },

    #[snafu(display("{what} {value} is outside of [0, 1]"))]
    ProportionOutOfRange { value: f64, what: &'static str },

    #[snafu(display("number of respondents must be positive, got {count}"))]
    NoRespondents { count: f64 },

    #[snafu(display("cannot take the logarithm of {value} ({what})"))]
    NonPositiveLog { value: f64, what: &'static str },

    #[snafu(display("regression needs at least 3 valid rows, got {n}"))]
    InsufficientData { n: usize },

    #[snafu(display("regression needs as many responses as regressors: {x} x values, {y} y values"))]
    MismatchedLengths { x: usize, y: usize },

    #[snafu(display("all the regressor values are equal ({value}): the slope is undefined"))]
    ConstantRegressor { value: f64 },

    #[snafu(display(
        "candidate votes ({trump_votes} + {harris_votes}) exceed the total votes {total_votes}"
    ))]
    InconsistentVotes {
        trump_votes: u64,
        harris_votes: u64,
        total_votes: u64,
    },

    #[snafu(display("unknown state classification {label:?}"))]
    UnknownClassification { label: String },
}

pub type DefectResult<T> = Result<T, DefectError>;
