use chrono::{Duration, Months, NaiveDate};

/// Start of a trailing window of `years` calendar years ending at `latest`.
///
/// Month arithmetic clamps to the end of the month, so 2024-02-29 minus one year is
/// 2023-02-28. Falls back to `365 * years` days if the date cannot be represented.
pub fn window_start(latest: NaiveDate, years: u32) -> NaiveDate {
    latest
        .checked_sub_months(Months::new(12 * years))
        .or_else(|| latest.checked_sub_signed(Duration::days(365 * i64::from(years))))
        .unwrap_or(NaiveDate::MIN)
}

/// The longest streak of consecutive closes below their moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BelowRun {
    pub length: usize,
    /// Row index where the longest streak starts; `None` when there is no streak.
    pub start: Option<usize>,
}

/// Scans rows `from..closes.len()` that have a moving-average value.
///
/// Returns `None` when no row in range has one (the check cannot be made).
/// Rows without a value are skipped, so a streak continues across them.
pub fn longest_run_below(closes: &[f64], ma: &[Option<f64>], from: usize) -> Option<BelowRun> {
    let mut any_valid = false;
    let mut best = BelowRun::default();
    let mut current = 0usize;
    let mut current_start = 0usize;

    for i in from..closes.len().min(ma.len()) {
        let Some(avg) = ma[i] else { continue };
        any_valid = true;
        if closes[i] < avg {
            if current == 0 {
                current_start = i;
            }
            current += 1;
            if current > best.length {
                best = BelowRun {
                    length: current,
                    start: Some(current_start),
                };
            }
        } else {
            current = 0;
        }
    }

    any_valid.then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_start_handles_leap_day() {
        assert_eq!(window_start(d(2024, 2, 29), 1), d(2023, 2, 28));
        assert_eq!(window_start(d(2024, 6, 14), 5), d(2019, 6, 14));
    }

    #[test]
    fn longest_run_picks_the_longest_streak() {
        let closes = [1.0, 0.5, 0.5, 1.0, 0.5, 0.5, 0.5, 1.0];
        let ma = vec![Some(0.8); closes.len()];
        let run = longest_run_below(&closes, &ma, 0).unwrap();
        assert_eq!(run.length, 3);
        assert_eq!(run.start, Some(4));
    }

    #[test]
    fn longest_run_respects_start_row_and_missing_values() {
        let closes = [0.5, 0.5, 0.5, 1.0];
        let ma = [Some(0.8), Some(0.8), None, Some(0.8)];
        assert_eq!(longest_run_below(&closes, &ma, 1).unwrap().length, 1);
        assert_eq!(longest_run_below(&closes, &[None; 4], 0), None);
    }
}
