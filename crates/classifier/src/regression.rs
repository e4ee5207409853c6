use chrono::NaiveDate;

/// Calendar days per year used to convert date offsets into fractional years.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Ordinary least squares fit of `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub samples: usize,
}

impl LinearFit {
    /// Compounded yearly growth implied by a log-price slope, in percent.
    pub fn annualized_return_pct(&self) -> f64 {
        (self.slope.exp() - 1.0) * 100.0
    }
}

/// Fits a straight line through `(xs, ys)`.
///
/// Returns `None` for fewer than two points, mismatched lengths or a constant `x`.
/// A constant `y` fits with `r_squared = 0`.
pub fn ols(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let r_squared = if syy == 0.0 {
        0.0
    } else {
        // Clamp tiny float overshoot above 1 on perfect fits.
        (sxy * sxy / (sxx * syy)).min(1.0)
    };

    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r_squared,
        samples: n,
    })
}

/// Regresses `ln(close)` on calendar time in years since the first date.
///
/// Using calendar time rather than the bar index keeps holidays and trading-calendar gaps
/// from distorting the slope. Returns `None` if any close is not strictly positive.
pub fn fit_log_linear(dates: &[NaiveDate], closes: &[f64]) -> Option<LinearFit> {
    let origin = *dates.first()?;
    if closes.iter().any(|&c| !(c > 0.0 && c.is_finite())) {
        return None;
    }
    let xs: Vec<f64> = dates
        .iter()
        .map(|d| (*d - origin).num_days() as f64 / DAYS_PER_YEAR)
        .collect();
    let ys: Vec<f64> = closes.iter().map(|c| c.ln()).collect();
    ols(&xs, &ys)
}
