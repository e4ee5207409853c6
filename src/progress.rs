use events::PipelineEvent;
use indicatif::ProgressStyle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{Span, info_span, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Draws one progress bar per stage from the pipeline's events until the channel closes.
pub fn spawn(mut rx: broadcast::Receiver<PipelineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current: Option<Span> = None;
        loop {
            match rx.recv().await {
                Ok(PipelineEvent::StageStarted { stage, total, .. }) => {
                    let span = info_span!("stage", %stage);
                    span.pb_set_style(&bar_style());
                    span.pb_set_length(total as u64);
                    span.pb_set_message(stage.as_str());
                    span.pb_start();
                    current = Some(span);
                }
                Ok(PipelineEvent::StockProcessed { code, .. }) => {
                    if let Some(span) = &current {
                        span.pb_inc(1);
                        span.pb_set_message(&code);
                    }
                }
                Ok(PipelineEvent::StageFinished(_)) | Ok(PipelineEvent::StageFailed { .. }) => {
                    current = None;
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Progress display lagged, skipped {} events.", n);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
