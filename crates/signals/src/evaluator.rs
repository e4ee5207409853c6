use crate::error::SignalError;
use crate::message::describe;
use chrono::NaiveDate;
use configuration::{SignalConfig, StrategyConfig};
use core_types::{PriceSeries, SignalHit, SignalKind, StockListing, StrategyParams};
use indicators::{FrameSpec, IndicatorFrame};
use tracing::debug;

/// Why a stock produced no evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer trailing bars than the long MA needs.
    InsufficientHistory { bars: usize },
    /// The latest bar is older than the staleness limit.
    Stale { latest: NaiveDate },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Zero, one or two hits (at most one buy-side and one sell-side).
    Checked(Vec<SignalHit>),
    Skipped(SkipReason),
}

impl Evaluation {
    pub fn hits(&self) -> &[SignalHit] {
        match self {
            Evaluation::Checked(hits) => hits,
            Evaluation::Skipped(_) => &[],
        }
    }
}

/// Evaluates optimized thresholds against the latest bar of each stock.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    strategy: StrategyConfig,
    config: SignalConfig,
}

/// Indicator values of the bar being evaluated, in percent.
struct Reading {
    short_bias_pct: f64,
    long_bias_pct: f64,
    rsi: Option<f64>,
}

impl SignalEvaluator {
    pub fn new(strategy: StrategyConfig, config: SignalConfig) -> Self {
        Self { strategy, config }
    }

    /// Checks one stock as of `as_of` (today in production).
    ///
    /// Buy and sell sides are independent. A side reports a near miss only when it did not
    /// trigger. Triggered hits carry how many consecutive bars the condition has held.
    pub fn evaluate(
        &self,
        listing: &StockListing,
        params: &StrategyParams,
        series: &PriceSeries,
        as_of: NaiveDate,
    ) -> Result<Evaluation, SignalError> {
        let trailing = series.tail(self.config.history_bars);
        let Some(latest) = trailing.latest().copied() else {
            return Ok(Evaluation::Skipped(SkipReason::InsufficientHistory {
                bars: 0,
            }));
        };
        if trailing.len() < self.strategy.long_ma_window {
            return Ok(Evaluation::Skipped(SkipReason::InsufficientHistory {
                bars: trailing.len(),
            }));
        }
        if (as_of - latest.date).num_days() > self.config.max_staleness_days {
            debug!(code = %listing.code, latest = %latest.date, "Skipping stale price data");
            return Ok(Evaluation::Skipped(SkipReason::Stale {
                latest: latest.date,
            }));
        }

        let uses_rsi = params.variant.uses_rsi();
        let frame = IndicatorFrame::compute(
            &trailing.closes(),
            FrameSpec {
                short_window: self.strategy.short_ma_window,
                long_window: self.strategy.long_ma_window,
                rsi_period: uses_rsi.then_some(self.strategy.rsi_period),
            },
        )?;
        let last = frame.len() - 1;
        let Some(now) = reading(&frame, last) else {
            return Ok(Evaluation::Skipped(SkipReason::InsufficientHistory {
                bars: trailing.len(),
            }));
        };

        let buy_pct = params.buy_threshold_pct();
        let sell_pct = params.sell_threshold_pct();
        let buffer = self.config.approach_buffer;
        let dates = trailing.dates();
        let mut hits = Vec::new();

        let hit = |kind, bias_pct, threshold_pct, early_exit, streak: Option<usize>| {
            let (duration_days, active_since) = match streak {
                Some(n) if self.config.report_duration => (Some(n), Some(dates[last + 1 - n])),
                _ => (None, None),
            };
            let mut hit = SignalHit {
                code: listing.code.clone(),
                name: listing.name.clone(),
                kind,
                date: latest.date,
                close: latest.close,
                bias_pct,
                threshold_pct,
                rsi: now.rsi.filter(|_| uses_rsi),
                early_exit,
                duration_days,
                active_since,
                message: String::new(),
            };
            hit.message = describe(&hit);
            hit
        };

        // Buy side.
        if self.buy_triggered(&now, buy_pct, uses_rsi) {
            let streak = self.streak(&frame, last, |r| self.buy_triggered(r, buy_pct, uses_rsi));
            hits.push(hit(SignalKind::Buy, now.long_bias_pct, buy_pct, false, Some(streak)));
        } else if now.long_bias_pct - buy_pct <= (buy_pct * buffer).abs() {
            hits.push(hit(SignalKind::NearBuy, now.long_bias_pct, buy_pct, false, None));
        }

        // Sell side.
        if let Some(early) = self.sell_triggered(&now, sell_pct, uses_rsi) {
            let streak = self.streak(&frame, last, |r| {
                self.sell_triggered(r, sell_pct, uses_rsi).is_some()
            });
            hits.push(hit(SignalKind::Sell, now.short_bias_pct, sell_pct, early, Some(streak)));
        } else if sell_pct - now.short_bias_pct <= (sell_pct * buffer).abs() {
            hits.push(hit(SignalKind::NearSell, now.short_bias_pct, sell_pct, false, None));
        }

        Ok(Evaluation::Checked(hits))
    }

    fn buy_triggered(&self, r: &Reading, buy_pct: f64, uses_rsi: bool) -> bool {
        let rsi_ok = !uses_rsi || r.rsi.is_some_and(|v| v < self.strategy.rsi_buy_ceiling);
        r.long_bias_pct <= buy_pct && rsi_ok
    }

    /// `Some(early_exit)` when the sell rule fires.
    fn sell_triggered(&self, r: &Reading, sell_pct: f64, uses_rsi: bool) -> Option<bool> {
        if r.short_bias_pct >= sell_pct {
            return Some(false);
        }
        let early = uses_rsi
            && r.short_bias_pct >= sell_pct * self.strategy.early_exit_ratio
            && r.rsi.is_some_and(|v| v > self.strategy.rsi_exit_floor);
        early.then_some(true)
    }

    /// Consecutive bars ending at `last` on which `holds` is true.
    fn streak(&self, frame: &IndicatorFrame, last: usize, holds: impl Fn(&Reading) -> bool) -> usize {
        (0..=last)
            .rev()
            .map_while(|i| reading(frame, i))
            .take_while(|r| holds(r))
            .count()
    }
}

fn reading(frame: &IndicatorFrame, i: usize) -> Option<Reading> {
    let short = frame.short_bias.get(i).copied().flatten()?;
    let long = frame.long_bias.get(i).copied().flatten()?;
    Some(Reading {
        short_bias_pct: short * 100.0,
        long_bias_pct: long * 100.0,
        rsi: frame.rsi_at(i),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use core_types::{PricePoint, StrategyVariant};
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn params(variant: StrategyVariant, buy: f64, sell: f64) -> StrategyParams {
        StrategyParams {
            variant,
            period_years: 3,
            buy_bias_threshold_pct: Decimal::from_f64(buy).unwrap(),
            sell_bias_threshold_pct: Decimal::from_f64(sell).unwrap(),
            total_return_pct: Decimal::from(25),
            benchmark_return_pct: Decimal::from(10),
            win_rate_pct: Decimal::from(80),
            trade_count: 5,
        }
    }

    fn listing() -> StockListing {
        StockListing {
            code: "00700".to_string(),
            name: "Tencent".to_string(),
        }
    }

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn series(closes: &[f64]) -> PriceSeries {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: d0() + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect();
        PriceSeries::new("00700", points)
    }

    fn last_date(closes: &[f64]) -> NaiveDate {
        d0() + Duration::days(closes.len() as i64 - 1)
    }

    fn evaluator() -> SignalEvaluator {
        SignalEvaluator::new(StrategyConfig::default(), SignalConfig::default())
    }

    /// 90 flat bars at 100 followed by `tail` bars.
    fn flat_then(tail: &[f64]) -> Vec<f64> {
        let mut closes = vec![100.0; 90];
        closes.extend_from_slice(tail);
        closes
    }

    #[test]
    fn stale_data_is_skipped() {
        let closes = flat_then(&[]);
        let as_of = last_date(&closes) + Duration::days(6);
        let out = evaluator()
            .evaluate(&listing(), &params(StrategyVariant::Plain, -5.0, 5.0), &series(&closes), as_of)
            .unwrap();
        assert!(matches!(out, Evaluation::Skipped(SkipReason::Stale { .. })));
    }

    #[test]
    fn short_history_is_skipped() {
        let closes = vec![100.0; 59];
        let out = evaluator()
            .evaluate(
                &listing(),
                &params(StrategyVariant::Plain, -5.0, 5.0),
                &series(&closes),
                last_date(&closes),
            )
            .unwrap();
        assert_eq!(
            out,
            Evaluation::Skipped(SkipReason::InsufficientHistory { bars: 59 })
        );
    }

    #[test]
    fn plunge_triggers_buy_with_duration() {
        // Two days far below the 60-day mean.
        let closes = flat_then(&[80.0, 80.0]);
        let out = evaluator()
            .evaluate(
                &listing(),
                &params(StrategyVariant::Plain, -5.0, 5.0),
                &series(&closes),
                last_date(&closes),
            )
            .unwrap();

        let buy = out.hits().iter().find(|h| h.kind == SignalKind::Buy).unwrap();
        assert_eq!(buy.duration_days, Some(2));
        assert_eq!(buy.active_since, Some(last_date(&closes) - Duration::days(1)));
        assert!(buy.message.contains("**Tencent** (00700)"));
        assert!(buy.message.contains("crossed -5%"));
        // Far below the short MA as well, so no sell-side hit.
        assert!(out.hits().iter().all(|h| h.kind != SignalKind::Sell));
    }

    #[test]
    fn near_buy_when_within_buffer() {
        // Long bias of about -4.4% against a -5% threshold: inside the 1-point buffer.
        let closes = flat_then(&[95.5]);
        let out = evaluator()
            .evaluate(
                &listing(),
                &params(StrategyVariant::Plain, -5.0, 5.0),
                &series(&closes),
                last_date(&closes),
            )
            .unwrap();
        let kinds: Vec<_> = out.hits().iter().map(|h| h.kind).collect();
        assert_eq!(kinds, vec![SignalKind::NearBuy]);
        assert_eq!(out.hits()[0].duration_days, None);
    }

    #[test]
    fn quiet_stock_has_no_hits() {
        let closes = flat_then(&[]);
        let out = evaluator()
            .evaluate(
                &listing(),
                &params(StrategyVariant::Plain, -5.0, 5.0),
                &series(&closes),
                last_date(&closes),
            )
            .unwrap();
        assert_eq!(out, Evaluation::Checked(Vec::new()));
    }

    #[test]
    fn spike_triggers_sell() {
        let closes = flat_then(&[110.0]);
        let out = evaluator()
            .evaluate(
                &listing(),
                &params(StrategyVariant::Plain, -5.0, 5.0),
                &series(&closes),
                last_date(&closes),
            )
            .unwrap();
        let sell = out.hits().iter().find(|h| h.kind == SignalKind::Sell).unwrap();
        // MA5 = 102, bias = 7.84%.
        assert!((sell.bias_pct - 800.0 / 102.0).abs() < 1e-9);
        assert!(!sell.early_exit);
        assert_eq!(sell.duration_days, Some(1));
    }

    fn hits_for(tail: &[f64]) -> Vec<SignalHit> {
        let closes = flat_then(tail);
        evaluator()
            .evaluate(
                &listing(),
                &params(StrategyVariant::Plain, -5.0, 5.0),
                &series(&closes),
                last_date(&closes),
            )
            .unwrap()
            .hits()
            .to_vec()
    }

    #[test]
    fn near_sell_boundary() {
        // Short bias 4(x - 100) / (400 + x). The buffer is 20% of 5%, so near starts at 4%.
        let inside = hits_for(&[105.7]); // 4.51%
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].kind, SignalKind::NearSell);
        assert!((inside[0].bias_pct - 2280.0 / 505.7).abs() < 1e-9);
        assert_eq!(inside[0].threshold_pct, 5.0);
        assert_eq!(inside[0].duration_days, None);

        let outside = hits_for(&[104.9]); // 3.88%
        assert!(outside.is_empty());
    }

    #[test]
    fn sell_streak_counts_consecutive_days() {
        // 112 then 125: short bias 9.4% then 16.2%, after a flat stretch at 0%.
        let closes = flat_then(&[112.0, 125.0]);
        let hits = hits_for(&[112.0, 125.0]);
        let sell = hits.iter().find(|h| h.kind == SignalKind::Sell).unwrap();
        assert_eq!(sell.duration_days, Some(2));
        assert_eq!(sell.active_since, Some(last_date(&closes) - Duration::days(1)));
        assert!(hits.iter().all(|h| h.kind != SignalKind::NearSell));
    }

    #[test]
    fn rsi_variant_reports_early_exit() {
        // A steady climb: short bias 6/124 = 4.84% with RSI at 100. Early exit starts at 4%.
        let mut closes = flat_then(&[]);
        closes.extend((1..=10).map(|i| 100.0 + 3.0 * i as f64));
        let out = evaluator()
            .evaluate(
                &listing(),
                &params(StrategyVariant::RsiFiltered, -5.0, 5.0),
                &series(&closes),
                last_date(&closes),
            )
            .unwrap();
        let sell = out.hits().iter().find(|h| h.kind == SignalKind::Sell).unwrap();
        assert!(sell.early_exit);
        assert_eq!(sell.rsi, Some(100.0));
        assert!(sell.message.contains("early exit"));
    }
}
