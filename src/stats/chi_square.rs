//! Chi-square independence test and Cramér's V
//!
//! [`chi2_and_cramers_v`] is the entry point used for similarity checks. It
//! never fails: degenerate tables and numerical problems come back as NaN.

use anyhow::{anyhow, bail, ensure, Result};
use statrs::function::gamma::checked_gamma_ur;
use tracing::warn;

use super::contingency::ContingencyTable;

/// Result pair for two sources that cannot be told apart.
const INDISTINGUISHABLE: (f64, f64) = (1.0, 0.0);
const UNDEFINED: (f64, f64) = (f64::NAN, f64::NAN);

/// Outcome of a chi-square test of independence.
#[derive(Debug, Clone)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub p_value: f64,
    pub dof: usize,
    pub expected: Vec<Vec<f64>>,
}

/// Chi-square test of independence on an r×c table.
///
/// Expected frequencies come from the margins. With one degree of freedom
/// Yates' continuity correction is applied; with zero degrees of freedom the
/// statistic is 0 and p is 1.
pub fn chi2_contingency(table: &ContingencyTable) -> Result<ChiSquareTest> {
    let (rows, cols) = (table.rows(), table.cols());
    ensure!(rows > 0 && cols > 0, "empty contingency table");

    let n = table.total() as f64;
    let row_totals = table.row_totals();
    let col_totals = table.col_totals();

    let expected: Vec<Vec<f64>> = row_totals
        .iter()
        .map(|&rt| {
            col_totals
                .iter()
                .map(|&ct| rt as f64 * ct as f64 / n)
                .collect()
        })
        .collect();

    if expected.iter().flatten().any(|&e| !(e > 0.0)) {
        bail!("contingency table has a zero expected frequency");
    }

    let dof = rows * cols + 1 - rows - cols;
    if dof == 0 {
        return Ok(ChiSquareTest {
            statistic: 0.0,
            p_value: 1.0,
            dof,
            expected,
        });
    }

    let mut statistic = 0.0;
    for (r, expected_row) in expected.iter().enumerate() {
        for (c, &e) in expected_row.iter().enumerate() {
            let mut observed = table.get(r, c) as f64;
            if dof == 1 {
                let diff = e - observed;
                observed += diff.abs().min(0.5) * diff.signum();
            }
            statistic += (observed - e).powi(2) / e;
        }
    }

    let p_value = chi2_survival(statistic, dof)?;
    Ok(ChiSquareTest {
        statistic,
        p_value,
        dof,
        expected,
    })
}

/// `P(X > x)` for a chi-square distribution with `dof` degrees of freedom.
fn chi2_survival(x: f64, dof: usize) -> Result<f64> {
    ensure!(x.is_finite(), "chi-square statistic is not finite ({})", x);
    if x <= 0.0 {
        return Ok(1.0);
    }
    checked_gamma_ur(dof as f64 / 2.0, x / 2.0)
        .map_err(|e| anyhow!("chi-square survival function failed: {}", e))
}

/// p-value and Cramér's V for a two-source contingency table.
///
/// Empty tables give `(NaN, NaN)`. All-zero rows and columns are dropped
/// first. Two identical sources give `(1.0, 0.0)`.
pub fn chi2_and_cramers_v(table: &ContingencyTable) -> (f64, f64) {
    if table.total() == 0 {
        return UNDEFINED;
    }

    let reduced = table.without_empty_lines();

    if reduced.rows() < 2 || reduced.cols() < 1 {
        return match reduced.first_columns_identical() {
            Some(true) => INDISTINGUISHABLE,
            _ => UNDEFINED,
        };
    }

    match test_with_effect_size(&reduced) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("chi-square test failed: {:#}", e);
            if reduced.cols() > 1 && reduced.first_columns_identical() == Some(true) {
                INDISTINGUISHABLE
            } else {
                UNDEFINED
            }
        }
    }
}

fn test_with_effect_size(reduced: &ContingencyTable) -> Result<(f64, f64)> {
    let test = chi2_contingency(reduced)?;

    let n = reduced.total() as f64;
    let k = reduced.rows().min(reduced.cols());
    let phi2 = test.statistic / n;

    let cramers_v = if k == 1 {
        let v = if phi2 == 0.0 { f64::NAN } else { phi2.sqrt() };
        match reduced.first_columns_identical() {
            Some(true) => 0.0,
            Some(false) => v,
            None => bail!("single-column table has no second source to compare"),
        }
    } else {
        (phi2 / (k - 1) as f64).sqrt()
    };

    Ok((test.p_value, cramers_v))
}
