use crate::dingtalk::DingTalkNotifier;
use crate::error::AlerterError;
use crate::render::{render_failure, render_report};
use async_trait::async_trait;
use configuration::NotifierConfig;
use core_types::{SignalKind, SignalReport};
use std::sync::Arc;

/// Where signal reports and failure notices end up.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, report: &SignalReport) -> Result<(), AlerterError>;

    /// Reports that a scheduled run aborted.
    async fn deliver_failure(&self, error: &str) -> Result<(), AlerterError>;
}

/// Sends rendered markdown to a DingTalk robot.
pub struct DingTalkSink {
    notifier: DingTalkNotifier,
    title: String,
}

impl DingTalkSink {
    pub fn new(notifier: DingTalkNotifier, title: impl Into<String>) -> Self {
        Self {
            notifier,
            title: title.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for DingTalkSink {
    async fn deliver(&self, report: &SignalReport) -> Result<(), AlerterError> {
        let text = render_report(&self.title, report);
        self.notifier.send_markdown(&self.title, &text).await
    }

    async fn deliver_failure(&self, error: &str) -> Result<(), AlerterError> {
        let now = chrono::Local::now().naive_local();
        let title = format!("{} task failed", self.title);
        let text = render_failure(&self.title, error, &now);
        self.notifier.send_markdown(&title, &text).await
    }
}

/// Writes reports through `tracing` only.
#[derive(Debug, Default, Clone)]
pub struct LogSink {
    title: String,
}

impl LogSink {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, report: &SignalReport) -> Result<(), AlerterError> {
        tracing::info!(
            buy = report.count(SignalKind::Buy),
            sell = report.count(SignalKind::Sell),
            near_buy = report.count(SignalKind::NearBuy),
            near_sell = report.count(SignalKind::NearSell),
            "{}",
            self.title
        );
        for hit in &report.hits {
            tracing::info!(code = %hit.code, kind = %hit.kind, "{}", hit.message);
        }
        Ok(())
    }

    async fn deliver_failure(&self, error: &str) -> Result<(), AlerterError> {
        tracing::error!(error, "{} task failed", self.title);
        Ok(())
    }
}

/// Builds the sink described by the configuration.
///
/// A disabled or unconfigured notifier falls back to [`LogSink`] so signal runs still leave a
/// record.
pub fn sink_from_config(config: &NotifierConfig) -> Arc<dyn NotificationSink> {
    if !config.enabled {
        tracing::info!("Notifications disabled; signal reports go to the log only.");
        return Arc::new(LogSink::new(config.title.clone()));
    }
    match DingTalkNotifier::new(config) {
        Ok(notifier) => Arc::new(DingTalkSink::new(notifier, config.title.clone())),
        Err(e) => {
            tracing::warn!(error = %e, "DingTalk notifier unavailable; falling back to log sink.");
            Arc::new(LogSink::new(config.title.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn log_sink_accepts_everything() {
        let sink = LogSink::new("Signals");
        let report = SignalReport::new(
            NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        );
        assert!(sink.deliver(&report).await.is_ok());
        assert!(sink.deliver_failure("boom").await.is_ok());
    }

    #[tokio::test]
    async fn unconfigured_notifier_falls_back_to_log_sink() {
        let sink = sink_from_config(&NotifierConfig::default());
        assert!(sink.deliver_failure("store offline").await.is_ok());
    }
}
