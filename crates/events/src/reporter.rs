use crate::messages::PipelineEvent;
use tokio::sync::broadcast;

/// Publishes [`PipelineEvent`]s to any number of observers.
///
/// Publishing never blocks and never fails: with no subscribers the event is dropped, and a
/// slow subscriber sees `Lagged` rather than stalling the pipeline.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: broadcast::Sender<PipelineEvent>,
}

impl ProgressReporter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Progress event dropped: no subscribers");
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(1024)
    }
}
