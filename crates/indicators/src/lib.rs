//! # Indicators
//!
//! Array-at-a-time technical indicators over a close-price slice. Every output has the same
//! length as its input; positions without enough history are `None` rather than a partial
//! value, so downstream code can drop them explicitly.

pub mod error;
pub mod frame;

pub use error::IndicatorError;
pub use frame::{FrameSpec, IndicatorFrame};

use ta::Next;
use ta::indicators::SimpleMovingAverage as Sma;

/// Simple moving average. `None` until `window` values have been seen.
pub fn sma(values: &[f64], window: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    if window == 0 {
        return Err(IndicatorError::InvalidWindow(window));
    }
    let mut indicator = Sma::new(window)?;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let avg = indicator.next(v);
            (i + 1 >= window).then_some(avg)
        })
        .collect())
}

/// Bias ratio `(close - ma) / ma`. `None` when the MA is missing or zero.
pub fn bias(close: f64, ma: Option<f64>) -> Option<f64> {
    match ma {
        Some(m) if m != 0.0 && m.is_finite() => Some((close - m) / m),
        _ => None,
    }
}

/// Element-wise bias ratios for a close array against its moving average.
pub fn bias_series(closes: &[f64], ma: &[Option<f64>]) -> Vec<Option<f64>> {
    closes
        .iter()
        .zip(ma)
        .map(|(&c, &m)| bias(c, m))
        .collect()
}

/// Wilder-smoothed RSI.
///
/// Gains and losses are averaged with an exponentially weighted mean of `alpha = 1/period`
/// (centre of mass `period - 1`), using the bias-adjusted weighting
/// `sum((1-alpha)^k * x[t-k]) / sum((1-alpha)^k)`. The first value is produced once
/// `period` price changes exist. A flat window reads 50; a window without losses reads 100.
pub fn rsi(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidWindow(period));
    }
    let mut out = vec![None; closes.len()];
    let decay = 1.0 - 1.0 / period as f64;

    let (mut gain_num, mut loss_num, mut weight) = (0.0_f64, 0.0_f64, 0.0_f64);
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        gain_num = change.max(0.0) + decay * gain_num;
        loss_num = (-change).max(0.0) + decay * loss_num;
        weight = 1.0 + decay * weight;

        if i >= period {
            let avg_gain = gain_num / weight;
            let avg_loss = loss_num / weight;
            out[i] = Some(if avg_loss == 0.0 {
                if avg_gain == 0.0 { 50.0 } else { 100.0 }
            } else {
                100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_has_warm_up_gap() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[4], Some(4.0));
    }

    #[test]
    fn sma_rejects_zero_window() {
        assert_eq!(sma(&[1.0], 0), Err(IndicatorError::InvalidWindow(0)));
    }

    #[test]
    fn bias_ratio() {
        assert_eq!(bias(90.0, Some(100.0)), Some(-0.1));
        assert_eq!(bias(90.0, None), None);
        assert_eq!(bias(90.0, Some(0.0)), None);
    }

    #[test]
    fn rsi_extremes() {
        let rising: Vec<f64> = (1..=30).map(|v| v as f64).collect();
        let out = rsi(&rising, 14).unwrap();
        assert_eq!(out[13], None);
        assert_eq!(out[14], Some(100.0));

        let flat = vec![10.0; 20];
        assert_eq!(rsi(&flat, 14).unwrap()[19], Some(50.0));
    }

    #[test]
    fn rsi_matches_hand_computed_weights() {
        // period 2 => alpha 0.5; changes: +1, -1, +2
        let out = rsi(&[10.0, 11.0, 10.0, 12.0], 2).unwrap();
        // after 2 changes: gains (1, 0) => (0 + 0.5*1)/(1 + 0.5) ; losses (0, 1) => 1/1.5
        let g2 = 0.5 / 1.5;
        let l2 = 1.0 / 1.5;
        let expected2 = 100.0 - 100.0 / (1.0 + g2 / l2);
        assert!((out[2].unwrap() - expected2).abs() < 1e-12);

        // after 3 changes: weight 1 + 0.5 + 0.25
        let g3 = (2.0 + 0.5 * 0.0 + 0.25 * 1.0) / 1.75;
        let l3 = (0.0 + 0.5 * 1.0 + 0.25 * 0.0) / 1.75;
        let expected3 = 100.0 - 100.0 / (1.0 + g3 / l3);
        assert!((out[3].unwrap() - expected3).abs() < 1e-12);
    }
}
