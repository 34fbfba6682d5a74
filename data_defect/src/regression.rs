//! Log-log regression of the Z-scores against the size of the electorate.

use log::debug;
use snafu::ensure;

use crate::config::*;

#[derive(PartialEq, Debug, Clone)]
pub struct OlsFit {
    pub intercept: f64,
    pub slope: f64,
    /// Standard error of the slope.
    pub slope_std_error: f64,
    /// Number of points used for the fit.
    pub n: usize,
    /// `y - (intercept + slope * x)`, one per point, in input order.
    pub residuals: Vec<f64>,
}

/// A point of the log-log fit. `index` refers to the row of the input.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct LogPoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct LogLogFit {
    pub points: Vec<LogPoint>,
    pub fit: OlsFit,
}

impl LogLogFit {
    /// The slope and its standard error, as displayed next to the plots.
    pub fn label(&self) -> String {
        slope_label(self.fit.slope, self.fit.slope_std_error)
    }
}

/// Ordinary least squares with one regressor and an intercept.
///
/// `se(b) = sqrt(RSS / (n - 2) / sum((x - mean(x))^2))`
pub fn simple_ols(x: &[f64], y: &[f64]) -> DefectResult<OlsFit> {
    ensure!(
        x.len() == y.len(),
        MismatchedLengthsSnafu {
            x: x.len(),
            y: y.len()
        }
    );
    let n = x.len();
    ensure!(n >= 3, InsufficientDataSnafu { n });

    let nf = n as f64;
    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        sxx += (xi - mean_x).powi(2);
        sxy += (xi - mean_x) * (yi - mean_y);
    }
    ensure!(
        sxx > 0.0 && x.iter().any(|xi| *xi != x[0]),
        ConstantRegressorSnafu { value: x[0] }
    );
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let residuals: Vec<f64> = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| yi - (intercept + slope * xi))
        .collect();
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let slope_std_error = (rss / (nf - 2.0) / sxx).sqrt();

    Ok(OlsFit {
        intercept,
        slope,
        slope_std_error,
        n,
        residuals,
    })
}

/// Fits `log10(|z|) = a + b * log10(total_votes)`.
///
/// Rows where either value is missing are skipped. A present but non-positive
/// `total_votes`, or a zero `z`, has no logarithm and fails the fit.
pub fn fit_log_log(total_votes: &[f64], z: &[f64]) -> DefectResult<LogLogFit> {
    ensure!(
        total_votes.len() == z.len(),
        MismatchedLengthsSnafu {
            x: total_votes.len(),
            y: z.len()
        }
    );
    let mut points: Vec<LogPoint> = Vec::new();
    for (index, (tv, zv)) in total_votes.iter().zip(z.iter()).enumerate() {
        if tv.is_nan() || zv.is_nan() {
            debug!("fit_log_log: skipping row {}: missing value", index);
            continue;
        }
        ensure!(
            *tv > 0.0,
            NonPositiveLogSnafu {
                value: *tv,
                what: "total votes"
            }
        );
        ensure!(
            *zv != 0.0,
            NonPositiveLogSnafu {
                value: *zv,
                what: "absolute Z-score"
            }
        );
        let (x, y) = (tv.log10(), zv.abs().log10());
        if !(x.is_finite() && y.is_finite()) {
            debug!("fit_log_log: skipping row {}: infinite value", index);
            continue;
        }
        points.push(LogPoint { index, x, y });
    }

    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let fit = simple_ols(&xs, &ys)?;
    debug!(
        "fit_log_log: n={} slope={} se={}",
        fit.n, fit.slope, fit.slope_std_error
    );
    Ok(LogLogFit { points, fit })
}

/// `"<slope>\n(<standard error>)"`, both with two significant figures.
pub fn slope_label(slope: f64, std_error: f64) -> String {
    format!("{}\n({})", format_2sig(slope), format_2sig(std_error))
}

/// Two significant figures in the style of C's `%.2g`, with the trailing zeros of
/// numbers below one put back so that they always show two decimals
/// (`0.6` -> `"0.60"`, `-0.045` -> `"-0.045"`, `12.3` -> `"12"`, `0.00001234` -> `"1.2e-05"`).
pub fn format_2sig(value: f64) -> String {
    let formatted = format_g(value, 2);
    if formatted.contains('e') {
        return formatted;
    }
    match formatted.split_once('.') {
        Some(("0", dec)) if dec.len() < 2 => format!("{}{}", formatted, "0".repeat(2 - dec.len())),
        _ => formatted,
    }
}

/// `%.<precision>g`: scientific notation when the exponent is below -4 or at least the
/// precision, fixed notation otherwise; trailing zeros are removed in both cases.
fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let p = precision.max(1);
    // Rounding to the requested precision first gives the exponent of the output.
    let sci = format!("{:.*e}", p - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };
    if exp < -4 || exp >= p as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_zeros(&mantissa), sign, exp.abs())
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, value))
    }
}

fn strip_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn closed_form_fit() {
        let fit = simple_ols(&[5.5, 6.0, 6.5, 7.0], &[0.5, 1.0, 1.0, 1.5]).unwrap();
        // sxy = 0.75, sxx = 1.25
        assert!(close(fit.slope, 0.6, 1e-12));
        assert!(close(fit.intercept, -2.75, 1e-12));
        // rss = 0.05
        assert!(close(fit.slope_std_error, 0.02f64.sqrt(), 1e-12));
        assert!(fit.slope_std_error > 0.0);
        let expected = [-0.05, 0.15, -0.15, 0.05];
        for (r, e) in fit.residuals.iter().zip(expected.iter()) {
            assert!(close(*r, *e, 1e-12));
        }
        assert_eq!(fit.n, 4);
    }

    #[test]
    fn needs_three_points() {
        let res = simple_ols(&[1.0, 2.0], &[1.0, 2.0]);
        assert!(matches!(res, Err(DefectError::InsufficientData { n: 2 })));
    }

    #[test]
    fn lengths_must_match() {
        let res = simple_ols(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(
            res,
            Err(DefectError::MismatchedLengths { x: 4, y: 3 })
        ));
    }

    #[test]
    fn constant_regressor() {
        let res = simple_ols(&[3.0, 3.0, 3.0], &[0.1, 0.2, 0.4]);
        assert!(matches!(res, Err(DefectError::ConstantRegressor { .. })));
        // Same number of votes in every state.
        let res = fit_log_log(&[1000.0, 1000.0, 1000.0], &[1.5, -2.0, 0.7]);
        assert!(matches!(res, Err(DefectError::ConstantRegressor { .. })));
    }

    #[test]
    fn log_log_skips_missing_rows() {
        let total_votes = [
            10f64.powf(5.5),
            10f64.powf(6.0),
            f64::NAN,
            10f64.powf(6.5),
            10f64.powf(7.0),
        ];
        let z = [
            -(10f64.powf(0.5)),
            10.0,
            3.0,
            -10.0,
            10f64.powf(1.5),
        ];
        let fit = fit_log_log(&total_votes, &z).unwrap();
        assert_eq!(fit.fit.n, 4);
        assert_eq!(
            fit.points.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![0, 1, 3, 4]
        );
        assert!(close(fit.fit.slope, 0.6, 1e-9));
        assert_eq!(fit.label(), "0.60\n(0.14)");
    }

    #[test]
    fn log_of_non_positive() {
        let res = fit_log_log(&[100.0, 0.0, 1000.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(res, Err(DefectError::NonPositiveLog { .. })));
        let res = fit_log_log(&[100.0, 10.0, 1000.0], &[1.0, 0.0, 3.0]);
        assert!(matches!(res, Err(DefectError::NonPositiveLog { .. })));
        let res = fit_log_log(&[100.0, f64::NAN, 1000.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(res, Err(DefectError::InsufficientData { n: 2 })));
    }

    #[test]
    fn two_significant_figures() {
        assert_eq!(format_2sig(-0.045), "-0.045");
        assert_eq!(format_2sig(0.012), "0.012");
        assert_eq!(format_2sig(0.6), "0.60");
        assert_eq!(format_2sig(0.14142), "0.14");
        assert_eq!(format_2sig(1.0), "1");
        assert_eq!(format_2sig(1.5), "1.5");
        assert_eq!(format_2sig(12.3), "12");
        assert_eq!(format_2sig(9.96), "10");
        assert_eq!(format_2sig(123.0), "1.2e+02");
        assert_eq!(format_2sig(0.00001234), "1.2e-05");
        assert_eq!(format_2sig(0.0), "0");
        assert_eq!(slope_label(-0.045, 0.012), "-0.045\n(0.012)");
    }
}
