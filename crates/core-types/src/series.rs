use crate::structs::PricePoint;
use chrono::NaiveDate;

/// An immutable, date-ordered price history for one stock.
///
/// Construction is the normalization step: invalid bars (non-positive or non-finite close)
/// are dropped, bars are sorted by date, and for a duplicated date the last record wins.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(code: impl Into<String>, points: Vec<PricePoint>) -> Self {
        let code = code.into();
        let total = points.len();

        let mut valid: Vec<PricePoint> = points.into_iter().filter(PricePoint::is_valid).collect();
        // Stable sort keeps the original order among equal dates, so "last wins" is well defined.
        valid.sort_by_key(|p| p.date);

        let mut normalized: Vec<PricePoint> = Vec::with_capacity(valid.len());
        for point in valid {
            match normalized.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => normalized.push(point),
            }
        }

        if normalized.len() != total {
            tracing::debug!(
                code = %code,
                dropped = total - normalized.len(),
                "Normalized price series dropped invalid or duplicate bars"
            );
        }

        Self {
            code,
            points: normalized,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Index of the first bar dated on or after `date`, if any.
    pub fn index_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.points.partition_point(|p| p.date < date);
        (idx < self.points.len()).then_some(idx)
    }

    /// The trailing `n` bars (or the whole series when shorter).
    pub fn tail(&self, n: usize) -> PriceSeries {
        let start = self.points.len().saturating_sub(n);
        Self {
            code: self.code.clone(),
            points: self.points[start..].to_vec(),
        }
    }

    /// The series as it looked at the close of `date`.
    pub fn up_to(&self, date: NaiveDate) -> PriceSeries {
        let end = self.points.partition_point(|p| p.date <= date);
        Self {
            code: self.code.clone(),
            points: self.points[..end].to_vec(),
        }
    }
}
