/*!

This is the long-form manual for `data_defect` and `polldefect`.

## Stages

The analysis runs in four stages. Each stage reads a CSV table and writes a new one;
nothing is kept between runs.

1. `aggregate`: survey responses to per-state poll estimates, joined with the certified
   results.
2. `estimate`: data defect correlation, effective sample size and Z-scores.
3. `correct`: bias-corrected poll estimates, usable before the results are known.
4. `regress`: slope of `log10 |Z_{n,N}|` against `log10 (total votes)`.

## Input formats

### Survey responses

One row per respondent, in CSV or Excel (`.xlsx`) format. Three columns are read:

| column (default) | content |
|------------------|---------|
| `inputstate`     | FIPS code of the state |
| `CC24_364b`      | preference: 1 = Harris, 2 = Trump, 3 = other, 4 = won't vote, 5 = not sure |
| `CC24_363`       | turnout intent: 1 = definitely, 2 = probably, 3 = already voted, 4 = plan to vote, 5 = no, 6 = undecided |

An empty preference means that the respondent did not answer: it is not counted.
The likely-voter column can also hold a boolean flag (`--likely-from flag`), in which
case `true`, `yes`, `y`, `t` and `1` mark a likely voter.

With `--unsure-as trump` (or `harris`), "not sure" answers count as support for that
candidate.

### Election results

`state, trump_votes, harris_votes, total_votes`, one row per state. State names are
matched irrespective of their case.

### Classification

`State, Pre-Election Classification`, with the classification one of `Red`, `Blue`,
`Likely Blue` or `Swing`. Optional.

### Turnout

For the estimated-votes sample ratio:
- prior election: `STATE, VEP_TURNOUT_RATE` with rates like `59.2%`
- current election: `STATE, VEP` with numbers like `1,234,567`

## Output formats

Missing values are written as empty cells. The `aggregate` stage writes one table per
subpopulation (`all` and `likely`), the column names end with the name of the
subpopulation: `trump_poll_all`, `num_respondents_likely`, ...

The `estimate` stage adds, for each candidate: `*_error`, `*_sigma_g`,
`*_data_defect_correlation`, `*_data_defect_index_lower_bound`, `*_effective_sample_size`,
`*_percentage_reduction`, `*_s_g_sq`, `*_var_srs`, `*_Z_n_N`, `*_Z_n`, plus `sample_ratio`
and `sample_size`.

The `correct` stage adds `f`, `sigma`, `bias_correction_term`, `trump_poll_corrected` and
`harris_poll_corrected` (and `estimated_votes`, `estimated_votes_fallback` with turnout data).

The `regress` stage writes a JSON summary, for example:

```json
{
  "results": [
    {
      "candidate": "harris",
      "slope": 0.6,
      "standardError": 0.1414,
      "intercept": -2.75,
      "n": 4,
      "label": "0.60\n(0.14)",
      "residuals": [ { "state": "Alabama", "x": 6.35, "y": 0.82, "residual": -0.01 } ]
    }
  ]
}
```

## Configuration

`polldefect run --config run.json` runs all the stages:

```json
{
  "outputSettings": { "outputDirectory": "out" },
  "sources": {
    "responses": { "provider": "csv", "filePath": "CES24_Common.csv" },
    "electionResults": "2024_us_election_results_by_state.csv",
    "classification": "State-Pre-ElectionClassification.csv",
    "turnoutPrior": "Turnout_2016G_v1.0.csv",
    "vepCurrent": "Turnout_2024G_v0.3.csv"
  },
  "rules": {
    "unsureAs": null,
    "sampleRatio": "estimatedVotes",
    "rho": -0.0045,
    "minSampleRatio": 1e-6,
    "strictJoin": false,
    "subpopulation": "all"
  }
}
```

Relative paths are resolved against the directory of the configuration file. The
`provider` of the responses is `csv` or `excel`; the responses source also accepts
`stateColumn`, `preferenceColumn`, `likelyColumn`, `likelyFrom` (`intent` or `flag`) and
`excelWorksheetName`. Every key of `rules` is optional.

The run writes `polls_all.csv`, `polls_likely.csv`, `defect.csv`, `corrected.csv` and
`regression.json` to the output directory. `defect.csv` and `corrected.csv` are computed
on the subpopulation selected by `subpopulation`.

*/
