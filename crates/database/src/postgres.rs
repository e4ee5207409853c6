use crate::error::DbError;
use crate::repository::{LabeledStock, StockRepository, stored_verdict};
use async_trait::async_trait;
use core_types::{
    Fundamentals, PricePoint, StockListing, StockSnapshot, StrategyParams, StrategyVariant,
    TrendLabel, TrendVerdict,
};
use events::RunSummary;
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

/// The PostgreSQL-backed [`StockRepository`].
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Creates a new `PgRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bar_from_row(row: &PgRow) -> Result<PricePoint, sqlx::Error> {
    Ok(PricePoint {
        date: row.try_get("trade_date")?,
        open: row.try_get("open")?,
        high: row.try_get("high")?,
        low: row.try_get("low")?,
        close: row.try_get("close")?,
        volume: row.try_get("volume")?,
    })
}

fn verdict_from_row(row: &PgRow) -> Result<TrendVerdict, DbError> {
    let label: String = row.try_get("label")?;
    let period_years: i32 = row.try_get("period_years")?;
    Ok(TrendVerdict {
        label: label.parse::<TrendLabel>()?,
        period_years: period_years.max(0) as u32,
        r_squared: row.try_get("r_squared")?,
        annualized_return_pct: row.try_get("annualized_return_pct")?,
        slope: row.try_get("slope")?,
        avg_turnover: row.try_get("avg_turnover")?,
    })
}

/// Strategy columns come from a LEFT JOIN, so a NULL variant means "no strategy".
fn strategy_from_row(row: &PgRow) -> Result<Option<StrategyParams>, DbError> {
    let variant: Option<String> = row.try_get("variant")?;
    let Some(variant) = variant else {
        return Ok(None);
    };
    let period_years: i32 = row.try_get("strategy_period_years")?;
    let trade_count: i32 = row.try_get("trade_count")?;
    Ok(Some(StrategyParams {
        variant: variant.parse::<StrategyVariant>()?,
        period_years: period_years.max(0) as u32,
        buy_bias_threshold_pct: row.try_get::<Decimal, _>("buy_bias_threshold_pct")?,
        sell_bias_threshold_pct: row.try_get::<Decimal, _>("sell_bias_threshold_pct")?,
        total_return_pct: row.try_get::<Decimal, _>("total_return_pct")?,
        benchmark_return_pct: row.try_get::<Decimal, _>("benchmark_return_pct")?,
        win_rate_pct: row.try_get::<Decimal, _>("win_rate_pct")?,
        trade_count: trade_count.max(0) as u32,
    }))
}

#[async_trait]
impl StockRepository for PgRepository {
    async fn list_stocks(&self) -> Result<Vec<StockListing>, DbError> {
        let rows = sqlx::query("SELECT code, name FROM stocks ORDER BY code ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<StockListing, DbError> {
                Ok(StockListing {
                    code: row.try_get("code")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn load_snapshot(&self, code: &str) -> Result<StockSnapshot, DbError> {
        let stock = sqlx::query("SELECT code, name, market_cap, roe_pct FROM stocks WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(code.to_string()))?;

        let rows = sqlx::query(
            r#"
            SELECT trade_date, open, high, low, close, volume
            FROM price_history
            WHERE code = $1
            ORDER BY trade_date ASC
            "#,
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        let history = rows
            .iter()
            .map(bar_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StockSnapshot {
            code: stock.try_get("code")?,
            name: stock.try_get("name")?,
            fundamentals: Fundamentals {
                market_cap: stock.try_get("market_cap")?,
                roe_pct: stock.try_get("roe_pct")?,
            },
            history,
        })
    }

    async fn load_recent_history(
        &self,
        code: &str,
        bars: usize,
    ) -> Result<Vec<PricePoint>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT trade_date, open, high, low, close, volume
            FROM price_history
            WHERE code = $1
            ORDER BY trade_date DESC
            LIMIT $2
            "#,
        )
        .bind(code)
        .bind(i64::try_from(bars).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut history = rows
            .iter()
            .map(bar_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        history.reverse();
        Ok(history)
    }

    async fn upsert_stock(&self, snapshot: &StockSnapshot) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO stocks (code, name, market_cap, roe_pct, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (code) DO UPDATE SET
                name = EXCLUDED.name,
                market_cap = EXCLUDED.market_cap,
                roe_pct = EXCLUDED.roe_pct,
                updated_at = NOW()
            "#,
        )
        .bind(&snapshot.code)
        .bind(&snapshot.name)
        .bind(snapshot.fundamentals.market_cap)
        .bind(snapshot.fundamentals.roe_pct)
        .execute(&mut *tx)
        .await?;

        for bar in &snapshot.history {
            sqlx::query(
                r#"
                INSERT INTO price_history (code, trade_date, open, high, low, close, volume)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (code, trade_date) DO UPDATE SET
                    open = EXCLUDED.open,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    close = EXCLUDED.close,
                    volume = EXCLUDED.volume
                "#,
            )
            .bind(&snapshot.code)
            .bind(bar.date)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(code = %snapshot.code, bars = snapshot.history.len(), "Upserted stock");
        Ok(())
    }

    async fn save_verdict(
        &self,
        code: &str,
        verdict: Option<&TrendVerdict>,
    ) -> Result<(), DbError> {
        let Some(verdict) = verdict else {
            sqlx::query("DELETE FROM trend_verdicts WHERE code = $1")
                .bind(code)
                .execute(&self.pool)
                .await?;
            return Ok(());
        };

        let stored = stored_verdict(verdict);
        sqlx::query(
            r#"
            INSERT INTO trend_verdicts
                (code, label, period_years, r_squared, annualized_return_pct, slope, avg_turnover, classified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (code) DO UPDATE SET
                label = EXCLUDED.label,
                period_years = EXCLUDED.period_years,
                r_squared = EXCLUDED.r_squared,
                annualized_return_pct = EXCLUDED.annualized_return_pct,
                slope = EXCLUDED.slope,
                avg_turnover = EXCLUDED.avg_turnover,
                classified_at = NOW()
            "#,
        )
        .bind(code)
        .bind(stored.label.to_string())
        .bind(stored.period_years as i32)
        .bind(stored.r_squared)
        .bind(stored.annualized_return_pct)
        .bind(stored.slope)
        .bind(stored.avg_turnover)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_labeled(&self) -> Result<Vec<LabeledStock>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT
                s.code, s.name,
                v.label, v.period_years, v.r_squared, v.annualized_return_pct, v.slope, v.avg_turnover,
                p.variant, p.period_years AS strategy_period_years,
                p.buy_bias_threshold_pct, p.sell_bias_threshold_pct,
                p.total_return_pct, p.benchmark_return_pct, p.win_rate_pct, p.trade_count
            FROM trend_verdicts AS v
            JOIN stocks AS s ON s.code = v.code
            LEFT JOIN strategy_params AS p ON p.code = v.code
            ORDER BY s.code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<LabeledStock, DbError> {
                Ok(LabeledStock {
                    listing: StockListing {
                        code: row.try_get("code")?,
                        name: row.try_get("name")?,
                    },
                    verdict: verdict_from_row(row)?,
                    strategy: strategy_from_row(row)?,
                })
            })
            .collect()
    }

    async fn save_strategy(
        &self,
        code: &str,
        params: Option<&StrategyParams>,
    ) -> Result<(), DbError> {
        let Some(params) = params else {
            sqlx::query("DELETE FROM strategy_params WHERE code = $1")
                .bind(code)
                .execute(&self.pool)
                .await?;
            return Ok(());
        };

        sqlx::query(
            r#"
            INSERT INTO strategy_params
                (code, variant, period_years, buy_bias_threshold_pct, sell_bias_threshold_pct,
                 total_return_pct, benchmark_return_pct, win_rate_pct, trade_count, optimized_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (code) DO UPDATE SET
                variant = EXCLUDED.variant,
                period_years = EXCLUDED.period_years,
                buy_bias_threshold_pct = EXCLUDED.buy_bias_threshold_pct,
                sell_bias_threshold_pct = EXCLUDED.sell_bias_threshold_pct,
                total_return_pct = EXCLUDED.total_return_pct,
                benchmark_return_pct = EXCLUDED.benchmark_return_pct,
                win_rate_pct = EXCLUDED.win_rate_pct,
                trade_count = EXCLUDED.trade_count,
                optimized_at = NOW()
            "#,
        )
        .bind(code)
        .bind(params.variant.as_str())
        .bind(params.period_years as i32)
        .bind(params.buy_bias_threshold_pct)
        .bind(params.sell_bias_threshold_pct)
        .bind(params.total_return_pct)
        .bind(params.benchmark_return_pct)
        .bind(params.win_rate_pct)
        .bind(i32::try_from(params.trade_count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn start_run(&self, summary: &RunSummary) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO analysis_runs (run_id, stage, status, started_at, total)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(summary.run_id)
        .bind(summary.stage.as_str())
        .bind(summary.status.as_str())
        .bind(summary.started_at)
        .bind(summary.total as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finish_run(&self, summary: &RunSummary) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE analysis_runs SET
                status = $2,
                finished_at = $3,
                processed = $4,
                updated = $5,
                cleared = $6,
                skipped = $7,
                failed = $8
            WHERE run_id = $1
            "#,
        )
        .bind(summary.run_id)
        .bind(summary.status.as_str())
        .bind(summary.finished_at)
        .bind(summary.processed as i64)
        .bind(summary.updated as i64)
        .bind(summary.cleared as i64)
        .bind(summary.skipped as i64)
        .bind(summary.failed as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
