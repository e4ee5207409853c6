use chrono::{Duration, NaiveDate};
use classifier::TrendClassifier;
use configuration::TrendConfig;
use core_types::{Classification, Fundamentals, PricePoint, PriceSeries, RejectReason};

const DAYS_PER_YEAR: f64 = 365.25;

fn healthy() -> Fundamentals {
    Fundamentals {
        market_cap: Some(5e10),
        roe_pct: Some(12.0),
    }
}

fn bar(date: NaiveDate, close: f64) -> PricePoint {
    PricePoint {
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 10_000_000.0,
    }
}

/// One bar per calendar day following `c0 * exp(rate * t)`, t in years since `start`.
fn exponential(start: NaiveDate, days: i64, c0: f64, rate: f64) -> Vec<PricePoint> {
    (0..=days)
        .map(|i| {
            let t = i as f64 / DAYS_PER_YEAR;
            bar(start + Duration::days(i), c0 * (rate * t).exp())
        })
        .collect()
}

fn classifier() -> TrendClassifier {
    TrendClassifier::new(TrendConfig::default()).unwrap()
}

#[test]
fn exact_exponential_over_one_year_recovers_the_rate() {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let days = (end - start).num_days();
    let series = PriceSeries::new("00700", exponential(start, days, 10.0, 0.2));

    let result = classifier().classify(&series, &healthy()).unwrap();
    let verdict = result.verdict().expect("a clean exponential should qualify");

    assert_eq!(verdict.period_years, 1);
    assert_eq!(verdict.label.to_string(), "bull-1y");
    assert!((verdict.slope - 0.2).abs() < 1e-9);
    assert!((verdict.r_squared - 1.0).abs() < 1e-9);
}

#[test]
fn longest_qualifying_window_wins() {
    let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
    let series = PriceSeries::new("00005", exponential(start, 5 * 365 + 30, 20.0, 0.15));

    let five = classifier().classify(&series, &healthy()).unwrap();
    assert_eq!(five.label().map(|l| l.years()), Some(5));

    // The same series also qualifies on its own for three years.
    let only_three = TrendClassifier::new(TrendConfig {
        window_years: vec![3],
        ..TrendConfig::default()
    })
    .unwrap();
    let three = only_three.classify(&series, &healthy()).unwrap();
    assert_eq!(three.label().map(|l| l.years()), Some(3));
}

#[test]
fn small_market_cap_short_circuits_a_perfect_series() {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let series = PriceSeries::new("01234", exponential(start, 3 * 365, 10.0, 0.2));
    let small = Fundamentals {
        market_cap: Some(5e9),
        roe_pct: Some(20.0),
    };

    let result = classifier().classify(&series, &small).unwrap();
    assert_eq!(
        result,
        Classification::Unqualified(RejectReason::MarketCapBelowFloor)
    );
}

#[test]
fn missing_or_negative_roe_rejects() {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let series = PriceSeries::new("01234", exponential(start, 400, 10.0, 0.2));
    let clf = classifier();

    for roe in [None, Some(0.0), Some(-3.0)] {
        let f = Fundamentals {
            market_cap: Some(5e10),
            roe_pct: roe,
        };
        assert_eq!(
            clf.classify(&series, &f).unwrap(),
            Classification::Unqualified(RejectReason::NonPositiveRoe)
        );
    }
    let no_mcap = Fundamentals {
        market_cap: None,
        roe_pct: Some(10.0),
    };
    assert_eq!(
        clf.classify(&series, &no_mcap).unwrap(),
        Classification::Unqualified(RejectReason::MarketCapBelowFloor)
    );
}

#[test]
fn dead_cross_with_falling_long_ma_vetoes_everything() {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut points = exponential(start, 700, 10.0, 0.3);
    let peak = points.last().unwrap().close;
    let peak_date = points.last().unwrap().date;
    // Two months of 2% daily declines.
    points.extend((1..=60).map(|i| bar(peak_date + Duration::days(i), peak * 0.98_f64.powi(i as i32))));
    let series = PriceSeries::new("02318", points);

    let clf = classifier();
    assert_eq!(
        clf.classify(&series, &healthy()).unwrap(),
        Classification::Unqualified(RejectReason::TrendBroken)
    );

    let diag = clf.diagnose(&series, &healthy()).unwrap();
    assert!(diag.breaker.evaluated);
    assert!(diag.breaker.tripped);
    assert_eq!(diag.windows.len(), 5);
}

#[test]
fn trend_break_veto_beats_a_qualifying_window() {
    // Short averages so twelve days of 2% declines produce a dead cross with a falling long
    // MA, while the three-year regression barely notices them.
    let clf = TrendClassifier::new(TrendConfig {
        short_ma_window: 5,
        long_ma_window: 20,
        max_interruption_days: 1_000,
        ..TrendConfig::default()
    })
    .unwrap();

    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut points = exponential(start, 3 * 365 + 30, 10.0, 0.3);
    let peak = points.last().unwrap().close;
    let peak_date = points.last().unwrap().date;
    points.extend((1..=12).map(|i| bar(peak_date + Duration::days(i), peak * 0.98_f64.powi(i as i32))));
    let series = PriceSeries::new("02318", points);

    let diag = clf.diagnose(&series, &healthy()).unwrap();
    assert!(diag.breaker.tripped);
    let three = diag.windows.iter().find(|w| w.years == 3).unwrap();
    assert!(three.passed(), "failed gates: {:?}", three.checks.failures());

    assert_eq!(
        clf.classify(&series, &healthy()).unwrap(),
        Classification::Unqualified(RejectReason::TrendBroken)
    );
    assert_eq!(diag.classification, Classification::Unqualified(RejectReason::TrendBroken));
}

#[test]
fn windows_out_of_order_are_rejected() {
    let result = TrendClassifier::new(TrendConfig {
        window_years: vec![1, 3],
        ..TrendConfig::default()
    });
    assert!(result.is_err());
}

/// Three years of steady growth with `dip_days` consecutive closes knocked 15% below trend
/// about eighteen months before the latest bar.
fn series_with_dip(dip_days: i64) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let total = 3 * 365 + 40;
    let dip_start = total - 545;
    let points = exponential(start, total, 10.0, 0.2)
        .into_iter()
        .enumerate()
        .map(|(i, mut p)| {
            let i = i as i64;
            if (dip_start..dip_start + dip_days).contains(&i) {
                p.close *= 0.85;
            }
            p
        })
        .collect();
    PriceSeries::new("00388", points)
}

#[test]
fn five_day_interruption_fails_windows_containing_it() {
    let clf = classifier();
    let series = series_with_dip(5);

    let result = clf.classify(&series, &healthy()).unwrap();
    // Only the one-year window lies entirely after the dip.
    assert_eq!(result.label().map(|l| l.years()), Some(1));

    let diag = clf.diagnose(&series, &healthy()).unwrap();
    let three = diag.windows.iter().find(|w| w.years == 3).unwrap();
    assert_eq!(three.longest_below_run, Some(5));
    assert!(!three.checks.interruption);
    assert!(three.checks.r_squared);
}

#[test]
fn four_day_dip_is_tolerated() {
    let result = classifier().classify(&series_with_dip(4), &healthy()).unwrap();
    assert_eq!(result.label().map(|l| l.years()), Some(3));
}

#[test]
fn classification_is_deterministic() {
    let clf = classifier();
    let series = series_with_dip(5);
    let a = clf.classify(&series, &healthy()).unwrap();
    let b = clf.classify(&series, &healthy()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn illiquid_stock_fails_every_window() {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let points = exponential(start, 2 * 365, 10.0, 0.2)
        .into_iter()
        .map(|mut p| {
            p.volume = 1_000.0;
            p
        })
        .collect();
    let series = PriceSeries::new("09999", points);

    let clf = classifier();
    assert_eq!(
        clf.classify(&series, &healthy()).unwrap(),
        Classification::Unqualified(RejectReason::NoQualifyingWindow)
    );
    let diag = clf.diagnose(&series, &healthy()).unwrap();
    assert!(diag.windows.iter().all(|w| !w.checks.turnover));
}
