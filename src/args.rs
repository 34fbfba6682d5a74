use clap::{Parser, Subcommand, ValueEnum};

/// This is a program to measure and correct the data defect of state-level election polls.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, global = true, takes_value = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Aggregates the survey responses per state and joins them with the election results.
    Aggregate(AggregateArgs),
    /// Computes the data defect correlation, the effective sample size and the Z-scores.
    Estimate(EstimateArgs),
    /// Corrects the raw polls with a fixed data defect correlation.
    Correct(CorrectArgs),
    /// Fits log10 |Z_n_N| against log10 (total votes) for each candidate.
    Regress(RegressArgs),
    /// Runs all the stages from a JSON configuration file.
    Run(RunArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateArg {
    Trump,
    Harris,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpopulationArg {
    All,
    Likely,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikelyFromArg {
    /// The column holds the answer to the turnout intent question (1-4 are likely voters).
    Intent,
    /// The column holds a boolean flag.
    Flag,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AggregateArgs {
    /// (file path) The survey responses, one row per respondent. Files ending in .xlsx are
    /// read as Excel workbooks, everything else as CSV.
    #[clap(long, value_parser)]
    pub responses: String,

    /// (file path) The certified results: state, trump_votes, harris_votes, total_votes.
    #[clap(long, value_parser)]
    pub results: String,

    /// (file path, optional) The pre-election classification of the states.
    #[clap(long, value_parser)]
    pub classification: Option<String>,

    /// (optional) Counts the "not sure" answers as support for this candidate.
    #[clap(long, value_enum)]
    pub unsure_as: Option<CandidateArg>,

    /// (default intent) How to read the likely-voter column.
    #[clap(long, value_enum)]
    pub likely_from: Option<LikelyFromArg>,

    /// (default inputstate) The column with the FIPS code of the state.
    #[clap(long, value_parser)]
    pub state_column: Option<String>,

    /// (default CC24_364b) The column with the preference code.
    #[clap(long, value_parser)]
    pub preference_column: Option<String>,

    /// (default CC24_363) The column with the turnout intent or likely-voter flag.
    #[clap(long, value_parser)]
    pub likely_column: Option<String>,

    /// (default: first sheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// Fails instead of dropping the states that are missing from one of the tables.
    #[clap(long, takes_value = false)]
    pub strict_join: bool,

    /// (file path) Output table for all the respondents.
    #[clap(long, value_parser)]
    pub out_all: String,

    /// (file path) Output table for the likely voters.
    #[clap(long, value_parser)]
    pub out_likely: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct EstimateArgs {
    /// (file path) A table written by the aggregate stage.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (file path or 'stdout') Where to write the table with the statistics.
    #[clap(short, long, value_parser)]
    pub out: String,

    /// (default all) The subpopulation whose poll columns are read.
    #[clap(long, value_enum)]
    pub subpopulation: Option<SubpopulationArg>,

    /// (file path) A reference table. If provided, the output must match it exactly.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CorrectArgs {
    /// (file path) A table written by the aggregate stage.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (file path or 'stdout') Where to write the corrected table.
    #[clap(short, long, value_parser)]
    pub out: String,

    /// (default all) The subpopulation whose poll columns are read.
    #[clap(long, value_enum)]
    pub subpopulation: Option<SubpopulationArg>,

    /// (default -0.0045) The data defect correlation used for the correction.
    #[clap(long, value_parser, allow_hyphen_values = true)]
    pub rho: Option<f64>,

    /// (default 1e-6) Sample ratios below this value are rejected.
    #[clap(long, value_parser)]
    pub min_sample_ratio: Option<f64>,

    /// (file path, optional) Turnout rates of the prior election (STATE, VEP_TURNOUT_RATE).
    /// Together with --vep-current, switches the sample ratio to estimated votes.
    #[clap(long, value_parser, requires = "vep_current")]
    pub turnout_prior: Option<String>,

    /// (file path, optional) Voting-eligible population of the current election (STATE, VEP).
    #[clap(long, value_parser, requires = "turnout_prior")]
    pub vep_current: Option<String>,

    /// (file path) A reference table. If provided, the output must match it exactly.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RegressArgs {
    /// (file path) A table written by the estimate stage.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (file path, 'stdout' or empty) If specified, the JSON summary is written to this location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference JSON summary. If provided, the summary must match it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// (file path) The JSON configuration of the run.
    /// For more information about the file format, read the manual of the data_defect crate.
    #[clap(short, long, value_parser)]
    pub config: String,
}
