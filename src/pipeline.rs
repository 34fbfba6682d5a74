use log::{debug, info, warn};

use data_defect::states::normalize_state_name;
use data_defect::*;
use snafu::{prelude::*, Snafu};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;

use crate::pipeline::config_reader::*;
use crate::pipeline::io_common::*;
use crate::pipeline::io_csv::*;

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error writing CSV data"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{path}: missing required column(s) {missing:?}"))]
    Schema { path: String, missing: Vec<String> },
    #[snafu(display("{path}, line {lineno}: {cells} cells for {columns} columns"))]
    RowTooLong {
        path: String,
        lineno: usize,
        cells: usize,
        columns: usize,
    },
    #[snafu(display("{path}, line {lineno}: cannot parse {value:?} in column {column}"))]
    CellParse {
        path: String,
        column: String,
        lineno: usize,
        value: String,
    },
    #[snafu(display(
        "Joining {left} with {right} dropped {dropped} state(s): {states:?}"
    ))]
    JoinMismatch {
        left: String,
        right: String,
        dropped: usize,
        states: Vec<String>,
    },
    #[snafu(display("{state}: {source}"))]
    Domain { source: DefectError, state: String },
    #[snafu(display("Regression for {candidate}: {source}"))]
    Regression {
        source: DefectError,
        candidate: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("No worksheet named {name:?} in {path}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Unexpected cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Output differs from the reference {path}"))]
    ReferenceMismatch { path: String },
    #[snafu(display("Cannot find the directory of {path}"))]
    MissingParentDir { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// How the likely-voter column of the survey is read.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum LikelySource {
    /// Answer to the turnout intent question.
    IntentCode,
    /// A boolean flag.
    Flag,
}

/// The columns read from the survey responses.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseColumns {
    pub state: String,
    pub preference: String,
    pub likely: String,
    pub likely_from: LikelySource,
}

impl Default for ResponseColumns {
    fn default() -> Self {
        ResponseColumns {
            state: "inputstate".to_string(),
            preference: "CC24_364b".to_string(),
            likely: "CC24_363".to_string(),
            likely_from: LikelySource::IntentCode,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ResponseFormat {
    Csv,
    Excel,
}

impl ResponseFormat {
    pub fn from_path(path: &str) -> ResponseFormat {
        let lower = path.to_lowercase();
        if lower.ends_with(".xlsx") || lower.ends_with(".xlsm") {
            ResponseFormat::Excel
        } else {
            ResponseFormat::Csv
        }
    }
}

/// What happens to the states that appear in only one of the joined tables.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum JoinPolicy {
    /// Drop them with a warning. Fails only if nothing is left.
    Drop,
    /// Fail on the first mismatch.
    Strict,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregateSettings {
    pub responses: String,
    pub format: ResponseFormat,
    pub columns: ResponseColumns,
    pub excel_worksheet_name: Option<String>,
    pub results: String,
    pub classification: Option<String>,
    pub preference: PreferenceRules,
    pub join: JoinPolicy,
}

// ********* Readers ***********

pub fn read_responses(settings: &AggregateSettings) -> PipelineResult<Vec<Response>> {
    info!("Reading survey responses from {:?}", settings.responses);
    let responses = match settings.format {
        ResponseFormat::Csv => read_csv_responses(&settings.responses, &settings.columns)?,
        ResponseFormat::Excel => io_excel::read_excel_responses(
            &settings.responses,
            &settings.columns,
            settings.excel_worksheet_name.as_deref(),
        )?,
    };
    info!("Read {} responses", responses.len());
    Ok(responses)
}

pub fn read_results(path: &str) -> PipelineResult<Vec<ElectionResult>> {
    let table = Table::read(path)?;
    table.require(&["state", "trump_votes", "harris_votes", "total_votes"])?;
    let states = table.column("state")?;
    let trump = table.count_column("trump_votes")?;
    let harris = table.count_column("harris_votes")?;
    let total = table.count_column("total_votes")?;

    let mut res: Vec<ElectionResult> = Vec::new();
    for (idx, state) in states.iter().enumerate() {
        let r = ElectionResult {
            state: state.to_string(),
            trump_votes: trump[idx],
            harris_votes: harris[idx],
            total_votes: total[idx],
        };
        res.push(r);
    }
    validate_results(&res)?;
    debug!("read_results: {} rows", res.len());
    Ok(res)
}

pub fn read_classifications(path: &str) -> PipelineResult<HashMap<String, Classification>> {
    let table = Table::read(path)?;
    table.require(&["State", "Pre-Election Classification"])?;
    let states = table.column("State")?;
    let labels = table.column("Pre-Election Classification")?;
    let mut res: HashMap<String, Classification> = HashMap::new();
    for (state, label) in states.iter().zip(labels.iter()) {
        let c: Classification = label.parse().context(DomainSnafu { state: *state })?;
        res.insert(normalize_state_name(state), c);
    }
    Ok(res)
}

/// Inner join of the prior turnout rates with the current voting-eligible population,
/// keyed by normalized state name.
pub fn read_turnout(prior_path: &str, current_path: &str) -> PipelineResult<HashMap<String, Turnout>> {
    let prior = Table::read(prior_path)?;
    prior.require(&["STATE", "VEP_TURNOUT_RATE"])?;
    let current = Table::read(current_path)?;
    current.require(&["STATE", "VEP"])?;

    let mut rates: HashMap<String, f64> = HashMap::new();
    for (idx, (state, rate)) in prior
        .column("STATE")?
        .iter()
        .zip(prior.column("VEP_TURNOUT_RATE")?.iter())
        .enumerate()
    {
        let x = clean_percentage(rate).context(CellParseSnafu {
            path: prior_path,
            column: "VEP_TURNOUT_RATE",
            lineno: idx + 2,
            value: *rate,
        })?;
        rates.insert(normalize_state_name(state), x);
    }

    let mut res: HashMap<String, Turnout> = HashMap::new();
    let mut unmatched: Vec<String> = Vec::new();
    for (idx, (state, vep)) in current
        .column("STATE")?
        .iter()
        .zip(current.column("VEP")?.iter())
        .enumerate()
    {
        let current_vep = clean_numeric(vep).context(CellParseSnafu {
            path: current_path,
            column: "VEP",
            lineno: idx + 2,
            value: *vep,
        })?;
        let key = normalize_state_name(state);
        match rates.get(&key) {
            Some(rate) => {
                res.insert(
                    key,
                    Turnout {
                        prior_turnout_rate: *rate,
                        current_vep,
                    },
                );
            }
            None => unmatched.push(key),
        }
    }
    if !unmatched.is_empty() {
        warn!(
            "read_turnout: no prior turnout rate for {} state(s): {:?}",
            unmatched.len(),
            unmatched
        );
    }
    info!("read_turnout: turnout figures for {} states", res.len());
    Ok(res)
}

// ********* Stages ***********

fn validate_results(results: &[ElectionResult]) -> PipelineResult<()> {
    for r in results.iter() {
        r.validate().context(DomainSnafu {
            state: r.state.as_str(),
        })?;
    }
    Ok(())
}

/// The first state whose certified result does not validate.
fn invalid_result_state(results: &[ElectionResult]) -> String {
    results
        .iter()
        .find(|r| r.validate().is_err())
        .map(|r| r.state.clone())
        .unwrap_or_default()
}

/// The merged table of one subpopulation: the poll estimates next to the certified results.
pub fn aggregate_tables(
    responses: &[Response],
    settings: &AggregateSettings,
    results: &[ElectionResult],
    classifications: &HashMap<String, Classification>,
) -> PipelineResult<Vec<(Subpopulation, Table)>> {
    validate_results(results)?;
    let polls = aggregate_responses(responses, &settings.preference);
    let mut res: Vec<(Subpopulation, Table)> = Vec::new();
    for sub in Subpopulation::ALL {
        let (records, report) = join_polls(polls.get(sub), results, classifications)
            .with_context(|_| DomainSnafu {
                state: invalid_result_state(results),
            })?;
        let left = format!("{} ({})", settings.responses, sub.suffix());
        if records.is_empty() || (settings.join == JoinPolicy::Strict && report.dropped() > 0) {
            let mut states = report.unmatched_polls.clone();
            states.extend(report.unmatched_results.iter().cloned());
            return JoinMismatchSnafu {
                left,
                right: settings.results.clone(),
                dropped: report.dropped(),
                states,
            }
            .fail();
        }
        info!(
            "aggregate: {}: {} states, {} dropped by the join",
            left,
            report.matched,
            report.dropped()
        );
        res.push((sub, records_table(&records, sub)));
    }
    Ok(res)
}

fn records_table(records: &[StateRecord], sub: Subpopulation) -> Table {
    let mut headers: Vec<String> = [
        "state",
        "state_abbr",
        "inputstate",
        "trump_votes",
        "harris_votes",
        "total_votes",
        "trump_share",
        "harris_share",
        "classification",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    headers.push(sub.poll_column(Candidate::Trump));
    headers.push(sub.poll_column(Candidate::Harris));
    headers.push(sub.respondents_column());

    let mut table = Table::new("aggregate", headers);
    for r in records.iter() {
        table.push_row(vec![
            r.state.clone(),
            r.state_abbr.to_string(),
            r.state_fips.to_string(),
            r.trump_votes.to_string(),
            r.harris_votes.to_string(),
            r.total_votes.to_string(),
            format_f64(r.trump_share),
            format_f64(r.harris_share),
            r.classification.map(|c| c.to_string()).unwrap_or_default(),
            format_f64(r.poll.trump),
            format_f64(r.poll.harris),
            r.poll.respondents.to_string(),
        ]);
    }
    table
}

/// Adds the data defect statistics of both candidates to a merged table.
///
/// Existing columns with the same names are replaced, so the stage can run on its own
/// output.
pub fn estimate_table(table: &mut Table, sub: Subpopulation) -> PipelineResult<()> {
    let respondents_col = sub.respondents_column();
    let mut required: Vec<String> = vec![
        "state".to_string(),
        "total_votes".to_string(),
        respondents_col.clone(),
    ];
    for c in Candidate::ALL {
        required.push(format!("{}_share", c.prefix()));
        required.push(sub.poll_column(c));
    }
    table.require_all(&required)?;

    let states: Vec<String> = table.column("state")?.iter().map(|s| s.to_string()).collect();
    let total_votes = table.f64_column("total_votes")?;
    let respondents = table.f64_column(&respondents_col)?;

    let sample_ratio: Vec<f64> = respondents
        .iter()
        .zip(total_votes.iter())
        .map(|(n, big_n)| n / big_n)
        .collect();
    table.set_f64_column("sample_ratio", &sample_ratio);
    table.set_f64_column("sample_size", &respondents);

    for c in Candidate::ALL {
        let polls = table.f64_column(&sub.poll_column(c))?;
        let shares = table.f64_column(&format!("{}_share", c.prefix()))?;
        let mut stats: Vec<DefectStats> = Vec::with_capacity(states.len());
        for (idx, state) in states.iter().enumerate() {
            let input = DefectInput {
                poll: polls[idx],
                share: shares[idx],
                respondents: respondents[idx],
                total_votes: total_votes[idx],
            };
            let s = estimate_defect(&input).context(DomainSnafu {
                state: format!("{} ({})", state, c),
            })?;
            stats.push(s);
        }

        let p = c.prefix();
        let columns: [(&str, fn(&DefectStats) -> f64); 10] = [
            ("error", |s: &DefectStats| s.error),
            ("sigma_g", |s: &DefectStats| s.sigma_g),
            ("data_defect_correlation", |s: &DefectStats| {
                s.data_defect_correlation
            }),
            ("data_defect_index_lower_bound", |s: &DefectStats| {
                s.data_defect_index_lower_bound
            }),
            ("effective_sample_size", |s: &DefectStats| {
                s.effective_sample_size
            }),
            ("percentage_reduction", |s: &DefectStats| s.percentage_reduction),
            ("s_g_sq", |s: &DefectStats| s.s_g_sq),
            ("var_srs", |s: &DefectStats| s.var_srs),
            ("Z_n_N", |s: &DefectStats| s.z_n_n),
            ("Z_n", |s: &DefectStats| s.z_n),
        ];
        for (name, get) in columns.iter() {
            let values: Vec<f64> = stats.iter().map(get).collect();
            table.set_f64_column(&format!("{}_{}", p, name), &values);
        }

        let reductions: Vec<f64> = stats
            .iter()
            .map(|s| s.percentage_reduction)
            .filter(|x| !x.is_nan())
            .collect();
        let mean = reductions.iter().sum::<f64>() / reductions.len() as f64;
        info!(
            "estimate: {}: {} states, mean percentage reduction {:.2}%",
            c,
            states.len(),
            mean
        );
    }
    Ok(())
}

/// Corrects the Trump poll of each state with the fixed data defect correlation, and
/// derives the Harris estimate as its complement.
pub fn correct_table(
    table: &mut Table,
    sub: Subpopulation,
    rules: &CorrectionRules,
    turnout: Option<&HashMap<String, Turnout>>,
) -> PipelineResult<()> {
    let respondents_col = sub.respondents_column();
    let poll_col = sub.poll_column(Candidate::Trump);
    table.require_all(&[
        "state".to_string(),
        "total_votes".to_string(),
        respondents_col.clone(),
        poll_col.clone(),
    ])?;

    let states: Vec<String> = table.column("state")?.iter().map(|s| s.to_string()).collect();
    let total_votes = table.f64_column("total_votes")?;
    let respondents = table.f64_column(&respondents_col)?;
    let polls = table.f64_column(&poll_col)?;

    let mut populations: Vec<Population> = Vec::with_capacity(states.len());
    let mut corrections: Vec<Corrected> = Vec::with_capacity(states.len());
    for (idx, state) in states.iter().enumerate() {
        let t = turnout.and_then(|m| m.get(&normalize_state_name(state)));
        let pop = population(rules.sample_ratio_policy, state, t, total_votes[idx]);
        let f = respondents[idx] / pop.votes;
        let c = correct_poll(polls[idx], f, rules).context(DomainSnafu {
            state: state.clone(),
        })?;
        populations.push(pop);
        corrections.push(c);
    }

    if rules.sample_ratio_policy == SampleRatioPolicy::EstimatedVotes {
        let votes: Vec<f64> = populations.iter().map(|p| p.votes).collect();
        table.set_f64_column("estimated_votes", &votes);
        let fallbacks: Vec<String> = populations.iter().map(|p| p.fallback.to_string()).collect();
        table.set_column("estimated_votes_fallback", fallbacks);
        let count = populations.iter().filter(|p| p.fallback).count();
        if count > 0 {
            warn!(
                "correct: {} state(s) fell back on the total votes for the sample ratio",
                count
            );
        }
    }

    let columns: [(&str, fn(&Corrected) -> f64); 5] = [
        ("f", |c: &Corrected| c.f),
        ("sigma", |c: &Corrected| c.sigma),
        ("bias_correction_term", |c: &Corrected| c.bias_correction_term),
        ("trump_poll_corrected", |c: &Corrected| c.corrected),
        ("harris_poll_corrected", |c: &Corrected| c.complement),
    ];
    for (name, get) in columns.iter() {
        let values: Vec<f64> = corrections.iter().map(get).collect();
        table.set_f64_column(name, &values);
    }
    info!(
        "correct: {} states with rho = {}",
        states.len(),
        rules.rho
    );
    Ok(())
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Residual {
    pub state: String,
    pub x: f64,
    pub y: f64,
    pub residual: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRegression {
    pub candidate: String,
    pub slope: f64,
    #[serde(rename = "standardError")]
    pub standard_error: f64,
    pub intercept: f64,
    pub n: usize,
    pub label: String,
    pub residuals: Vec<Residual>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RegressionSummary {
    pub results: Vec<CandidateRegression>,
}

/// Fits `log10 |Z_n_N|` against `log10 (total votes)`, Harris first.
pub fn regress_table(table: &Table) -> PipelineResult<RegressionSummary> {
    let order = [Candidate::Harris, Candidate::Trump];
    let mut required: Vec<String> = vec!["state".to_string(), "total_votes".to_string()];
    required.extend(order.iter().map(|c| format!("{}_Z_n_N", c.prefix())));
    table.require_all(&required)?;

    let states = table.column("state")?;
    let total_votes = table.f64_column("total_votes")?;

    let mut results: Vec<CandidateRegression> = Vec::new();
    for c in order {
        let z = table.f64_column(&format!("{}_Z_n_N", c.prefix()))?;
        let fit = fit_log_log(&total_votes, &z).context(RegressionSnafu {
            candidate: c.to_string(),
        })?;
        let residuals: Vec<Residual> = fit
            .points
            .iter()
            .zip(fit.fit.residuals.iter())
            .map(|(p, r)| Residual {
                state: states[p.index].to_string(),
                x: p.x,
                y: p.y,
                residual: *r,
            })
            .collect();
        info!(
            "regress: {}: slope {} (se {}) over {} states",
            c, fit.fit.slope, fit.fit.slope_std_error, fit.fit.n
        );
        results.push(CandidateRegression {
            candidate: c.to_string(),
            slope: fit.fit.slope,
            standard_error: fit.fit.slope_std_error,
            intercept: fit.fit.intercept,
            n: fit.fit.n,
            label: fit.label(),
            residuals,
        });
    }
    Ok(RegressionSummary { results })
}

// ********* Runners ***********

pub fn run_aggregate(settings: &AggregateSettings, out_all: &str, out_likely: &str) -> PipelineResult<()> {
    let responses = read_responses(settings)?;
    let results = read_results(&settings.results)?;
    let classifications = match &settings.classification {
        Some(p) => read_classifications(p)?,
        None => HashMap::new(),
    };
    for (sub, table) in aggregate_tables(&responses, settings, &results, &classifications)? {
        let out = match sub {
            Subpopulation::All => out_all,
            Subpopulation::Likely => out_likely,
        };
        write_output(out, &table.to_csv_string()?)?;
    }
    Ok(())
}

fn finish_table(table: &Table, out: &str, reference: Option<&str>) -> PipelineResult<()> {
    let contents = table.to_csv_string()?;
    write_output(out, &contents)?;
    if let Some(reference_path) = reference {
        check_reference(&contents, reference_path)?;
    }
    Ok(())
}

pub fn run_estimate(
    input: &str,
    out: &str,
    sub: Subpopulation,
    reference: Option<&str>,
) -> PipelineResult<()> {
    let mut table = Table::read(input)?;
    estimate_table(&mut table, sub)?;
    finish_table(&table, out, reference)
}

pub fn run_correct(
    input: &str,
    out: &str,
    sub: Subpopulation,
    rules: &CorrectionRules,
    turnout_files: Option<(&str, &str)>,
    reference: Option<&str>,
) -> PipelineResult<()> {
    let turnout = match turnout_files {
        Some((prior, current)) => Some(read_turnout(prior, current)?),
        None => None,
    };
    let mut table = Table::read(input)?;
    correct_table(&mut table, sub, rules, turnout.as_ref())?;
    finish_table(&table, out, reference)
}

pub fn run_regress(input: &str, out: Option<&str>, reference: Option<&str>) -> PipelineResult<()> {
    let table = Table::read(input)?;
    let summary = regress_table(&table)?;
    let js = serde_json::to_value(&summary).context(ParsingJsonSnafu {})?;
    let pretty = serde_json::to_string_pretty(&js).context(ParsingJsonSnafu {})?;
    match out {
        Some(o) if !o.is_empty() => write_output(o, &pretty)?,
        _ => {
            for r in summary.results.iter() {
                info!("{}: {}", r.candidate, r.label.replace('\n', " "));
            }
        }
    }
    if let Some(reference_path) = reference {
        check_reference_json(&js, reference_path)?;
    }
    Ok(())
}

/// Runs the four stages from a JSON configuration file. The intermediate tables are
/// written to the output directory.
pub fn run_pipeline(config_path: &str) -> PipelineResult<()> {
    let config = read_config(config_path)?;
    info!("config: {:?}", config);
    let root: PathBuf = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu { path: config_path })?
        .to_path_buf();
    let resolve = |p: &str| root.join(p).display().to_string();

    let sources = &config.sources;
    let turnout_files = match (&sources.turnout_prior, &sources.vep_current) {
        (Some(prior), Some(current)) => Some((resolve(prior), resolve(current))),
        (None, None) => None,
        _ => whatever!("turnoutPrior and vepCurrent must be provided together"),
    };
    let rules = validate_rules(&config.rules, turnout_files.is_some())?;
    let settings = AggregateSettings {
        responses: resolve(&sources.responses.file_path),
        format: sources.responses.format()?,
        columns: sources.responses.columns()?,
        excel_worksheet_name: sources.responses.excel_worksheet_name.clone(),
        results: resolve(&sources.election_results),
        classification: sources.classification.as_deref().map(resolve),
        preference: rules.preference,
        join: rules.join,
    };

    let out_dir = match &config.output_settings.output_directory {
        Some(d) => root.join(d),
        None => root.clone(),
    };
    let out = |name: &str| out_dir.join(name).display().to_string();

    let responses = read_responses(&settings)?;
    let results = read_results(&settings.results)?;
    let classifications = match &settings.classification {
        Some(p) => read_classifications(p)?,
        None => HashMap::new(),
    };
    let tables = aggregate_tables(&responses, &settings, &results, &classifications)?;
    let mut selected: Option<Table> = None;
    for (sub, table) in tables {
        write_output(&out(&format!("polls_{}.csv", sub.suffix())), &table.to_csv_string()?)?;
        if sub == rules.subpopulation {
            selected = Some(table);
        }
    }
    let polls = selected.whatever_context("no table for the selected subpopulation")?;

    let mut estimated = polls.clone();
    estimate_table(&mut estimated, rules.subpopulation)?;
    write_output(&out("defect.csv"), &estimated.to_csv_string()?)?;

    let turnout = match &turnout_files {
        Some((prior, current)) => Some(read_turnout(prior, current)?),
        None => None,
    };
    let mut corrected = polls;
    correct_table(
        &mut corrected,
        rules.subpopulation,
        &rules.correction,
        turnout.as_ref(),
    )?;
    write_output(&out("corrected.csv"), &corrected.to_csv_string()?)?;

    let summary = regress_table(&estimated)?;
    let pretty = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    write_output(&out("regression.json"), &pretty)?;
    Ok(())
}

/// The validated rules of a run.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct RunSettings {
    pub preference: PreferenceRules,
    pub correction: CorrectionRules,
    pub join: JoinPolicy,
    pub subpopulation: Subpopulation,
}

fn validate_rules(rules: &RunRules, has_turnout: bool) -> PipelineResult<RunSettings> {
    let unsure_as = match rules.unsure_as.as_deref() {
        None => None,
        Some("trump") => Some(Candidate::Trump),
        Some("harris") => Some(Candidate::Harris),
        Some(x) => whatever!("Cannot use unsureAs {:?}: expected trump or harris", x),
    };
    let sample_ratio_policy = match (rules.sample_ratio.as_deref(), has_turnout) {
        (None, false) | (Some("totalVotes"), _) => SampleRatioPolicy::TotalVotes,
        (None, true) | (Some("estimatedVotes"), true) => SampleRatioPolicy::EstimatedVotes,
        (Some("estimatedVotes"), false) => {
            whatever!("sampleRatio estimatedVotes needs the turnoutPrior and vepCurrent sources")
        }
        (Some(x), _) => whatever!("Cannot use sampleRatio {:?}", x),
    };
    let min_sample_ratio = rules.min_sample_ratio.unwrap_or(DEFAULT_MIN_SAMPLE_RATIO);
    if !(min_sample_ratio >= 0.0 && min_sample_ratio < 1.0) {
        whatever!("minSampleRatio must lie in [0, 1), got {}", min_sample_ratio)
    }
    let rho = rules.rho.unwrap_or(RHO);
    if !rho.is_finite() {
        whatever!("rho must be finite, got {}", rho)
    }
    let subpopulation = match rules.subpopulation.as_deref() {
        None | Some("all") => Subpopulation::All,
        Some("likely") => Subpopulation::Likely,
        Some(x) => whatever!("Cannot use subpopulation {:?}: expected all or likely", x),
    };
    Ok(RunSettings {
        preference: PreferenceRules { unsure_as },
        correction: CorrectionRules {
            rho,
            min_sample_ratio,
            sample_ratio_policy,
        },
        join: if rules.strict_join.unwrap_or(false) {
            JoinPolicy::Strict
        } else {
            JoinPolicy::Drop
        },
        subpopulation,
    })
}
