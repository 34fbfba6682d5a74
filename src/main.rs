mod args;
mod pipeline;

use clap::Parser;
use log::{debug, warn, LevelFilter};
use snafu::ErrorCompat;

use data_defect::{Candidate, CorrectionRules, PreferenceRules, SampleRatioPolicy, Subpopulation};

use crate::args::*;
use crate::pipeline::*;

fn candidate(c: CandidateArg) -> Candidate {
    match c {
        CandidateArg::Trump => Candidate::Trump,
        CandidateArg::Harris => Candidate::Harris,
    }
}

fn subpopulation(s: Option<SubpopulationArg>) -> Subpopulation {
    match s {
        Some(SubpopulationArg::Likely) => Subpopulation::Likely,
        Some(SubpopulationArg::All) | None => Subpopulation::All,
    }
}

fn aggregate_settings(args: &AggregateArgs) -> AggregateSettings {
    let default = ResponseColumns::default();
    AggregateSettings {
        responses: args.responses.clone(),
        format: ResponseFormat::from_path(&args.responses),
        columns: ResponseColumns {
            state: args.state_column.clone().unwrap_or(default.state),
            preference: args.preference_column.clone().unwrap_or(default.preference),
            likely: args.likely_column.clone().unwrap_or(default.likely),
            likely_from: match args.likely_from {
                Some(LikelyFromArg::Flag) => LikelySource::Flag,
                Some(LikelyFromArg::Intent) | None => LikelySource::IntentCode,
            },
        },
        excel_worksheet_name: args.excel_worksheet_name.clone(),
        results: args.results.clone(),
        classification: args.classification.clone(),
        preference: PreferenceRules {
            unsure_as: args.unsure_as.map(candidate),
        },
        join: if args.strict_join {
            JoinPolicy::Strict
        } else {
            JoinPolicy::Drop
        },
    }
}

fn run(args: &Args) -> PipelineResult<()> {
    match &args.command {
        Command::Aggregate(a) => run_aggregate(&aggregate_settings(a), &a.out_all, &a.out_likely),
        Command::Estimate(a) => run_estimate(
            &a.input,
            &a.out,
            subpopulation(a.subpopulation),
            a.reference.as_deref(),
        ),
        Command::Correct(a) => {
            let turnout_files = match (&a.turnout_prior, &a.vep_current) {
                (Some(prior), Some(current)) => Some((prior.as_str(), current.as_str())),
                _ => None,
            };
            let defaults = CorrectionRules::DEFAULT_RULES;
            let rules = CorrectionRules {
                rho: a.rho.unwrap_or(defaults.rho),
                min_sample_ratio: a.min_sample_ratio.unwrap_or(defaults.min_sample_ratio),
                sample_ratio_policy: if turnout_files.is_some() {
                    SampleRatioPolicy::EstimatedVotes
                } else {
                    SampleRatioPolicy::TotalVotes
                },
            };
            run_correct(
                &a.input,
                &a.out,
                subpopulation(a.subpopulation),
                &rules,
                turnout_files,
                a.reference.as_deref(),
            )
        }
        Command::Regress(a) => run_regress(&a.input, a.out.as_deref(), a.reference.as_deref()),
        Command::Run(a) => run_pipeline(&a.config),
    }
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init();
    }
    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
