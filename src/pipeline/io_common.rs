use std::fs;
use std::path::Path;

use crate::pipeline::*;

/// Parses a numeric cell. Empty cells and the usual spellings of a missing value
/// are read as NaN.
pub fn parse_f64(cell: &str) -> Option<f64> {
    match cell.trim() {
        "" | "nan" | "NaN" | "NA" | "null" => Some(f64::NAN),
        s => s.parse::<f64>().ok(),
    }
}

/// Missing values are written as empty cells.
pub fn format_f64(x: f64) -> String {
    if x.is_nan() {
        String::new()
    } else {
        x.to_string()
    }
}

/// Reads numbers written with thousands separators: `"1,234,567"`.
pub fn clean_numeric(cell: &str) -> Option<f64> {
    let s: String = cell.chars().filter(|c| *c != ',').collect();
    parse_f64(&s)
}

/// Reads a percentage as a proportion: both `"59.2%"` and `"59.2"` give `0.592`.
pub fn clean_percentage(cell: &str) -> Option<f64> {
    let s = cell.trim();
    let s = s.strip_suffix('%').unwrap_or(s);
    clean_numeric(s).map(|x| x / 100.0)
}

/// Reads a questionnaire code. `Ok(None)` for an empty cell.
pub fn parse_code(
    source: &str,
    lineno: usize,
    column: &str,
    cell: &str,
) -> PipelineResult<Option<u32>> {
    match parse_f64(cell) {
        Some(x) if x.is_nan() => Ok(None),
        Some(x) if x >= 0.0 && x.fract() == 0.0 && x <= u32::MAX as f64 => Ok(Some(x as u32)),
        _ => CellParseSnafu {
            path: source,
            column,
            lineno,
            value: cell,
        }
        .fail(),
    }
}

/// Reads a boolean-like cell. Empty cells are false.
pub fn parse_flag(cell: &str) -> Option<bool> {
    match cell.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "0.0" | "" => Some(false),
        _ => None,
    }
}

/// Turns the three raw cells of a survey row into a response.
pub fn parse_response(
    source: &str,
    lineno: usize,
    columns: &ResponseColumns,
    state: &str,
    preference: &str,
    likely: &str,
) -> PipelineResult<Response> {
    let code = |column: &str, cell: &str| parse_code(source, lineno, column, cell);
    let state_fips = match code(&columns.state, state)? {
        Some(x) => x,
        None => {
            return CellParseSnafu {
                path: source,
                column: columns.state.as_str(),
                lineno,
                value: state,
            }
            .fail()
        }
    };
    let preference = code(&columns.preference, preference)?.map(PreferenceCode::from_code);
    let likely_voter = match columns.likely_from {
        LikelySource::IntentCode => code(&columns.likely, likely)?
            .map(is_likely_intent)
            .unwrap_or(false),
        LikelySource::Flag => match parse_flag(likely) {
            Some(b) => b,
            None => {
                return CellParseSnafu {
                    path: source,
                    column: columns.likely.as_str(),
                    lineno,
                    value: likely,
                }
                .fail()
            }
        },
    };
    Ok(Response {
        state_fips,
        preference,
        likely_voter,
    })
}

/// Writes to a file, or to the standard output if the path is `stdout`.
pub fn write_output(out: &str, contents: &str) -> PipelineResult<()> {
    if out == "stdout" {
        println!("{}", contents);
        return Ok(());
    }
    if let Some(parent) = Path::new(out).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingFileSnafu { path: out })?;
        }
    }
    info!("Writing {:?}", out);
    fs::write(out, contents).context(WritingFileSnafu { path: out })
}

/// Fails if the output differs from the reference, after printing the differences.
pub fn check_reference(produced: &str, reference_path: &str) -> PipelineResult<()> {
    let reference = fs::read_to_string(reference_path).context(OpeningJsonSnafu {
        path: reference_path,
    })?;
    compare_texts(&reference, produced, reference_path)
}

/// Same as [check_reference] for JSON summaries: both sides are pretty-printed first so
/// that only the content is compared.
pub fn check_reference_json(produced: &JSValue, reference_path: &str) -> PipelineResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_ref = serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    let pretty = serde_json::to_string_pretty(produced).context(ParsingJsonSnafu {})?;
    compare_texts(&pretty_ref, &pretty, reference_path)
}

fn compare_texts(reference: &str, produced: &str, reference_path: &str) -> PipelineResult<()> {
    // Line endings may differ when the reference was produced on another platform.
    let reference = reference.replace("\r\n", "\n");
    if reference.trim_end() != produced.trim_end() {
        warn!("Found differences with the reference {:?}", reference_path);
        print_diff(reference.trim_end(), produced.trim_end(), "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("Output matches the reference {:?}", reference_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_f64(" 0.25 "), Some(0.25));
        assert!(parse_f64("").unwrap().is_nan());
        assert!(parse_f64("NaN").unwrap().is_nan());
        assert_eq!(parse_f64("abc"), None);
        assert_eq!(clean_numeric("1,234,567"), Some(1_234_567.0));
        assert_eq!(clean_percentage("59.5%"), Some(0.595));
        assert_eq!(clean_percentage("50"), Some(0.5));
        assert!(clean_percentage("").unwrap().is_nan());
    }

    #[test]
    fn float_cells_round_trip() {
        for x in [0.1, 1.0 / 3.0, 1e-7, 3_000_000.0, -0.0045] {
            assert_eq!(parse_f64(&format_f64(x)), Some(x));
        }
        assert_eq!(format_f64(f64::NAN), "");
    }

    #[test]
    fn codes_and_flags() {
        let code = |cell: &str| parse_code("t.csv", 2, "CC24_364b", cell);
        assert_eq!(code("2").unwrap(), Some(2));
        assert_eq!(code("5.0").unwrap(), Some(5));
        assert_eq!(code("").unwrap(), None);
        assert!(matches!(
            code("2.5"),
            Err(PipelineError::CellParse { lineno: 2, value, .. }) if value == "2.5"
        ));
        assert!(code("-1").is_err());
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn responses() {
        let columns = ResponseColumns::default();
        let r = parse_response("t.csv", 2, &columns, "55", "5", "3").unwrap();
        assert_eq!(r.state_fips, 55);
        assert_eq!(r.preference, Some(PreferenceCode::NotSure));
        assert!(r.likely_voter);

        let r = parse_response("t.csv", 3, &columns, "55", "", "6").unwrap();
        assert_eq!(r.preference, None);
        assert!(!r.likely_voter);

        let res = parse_response("t.csv", 4, &columns, "Wisconsin", "1", "1");
        assert!(matches!(
            res,
            Err(PipelineError::CellParse { lineno: 4, .. })
        ));

        let flags = ResponseColumns {
            likely_from: LikelySource::Flag,
            ..ResponseColumns::default()
        };
        let r = parse_response("t.csv", 5, &flags, "6", "1", "yes").unwrap();
        assert!(r.likely_voter);
    }
}
