//! # Alerter
//!
//! Delivers signal reports and failure notices. The pipeline only sees the
//! [`NotificationSink`] trait; transport formatting (DingTalk markdown, request signing) lives
//! here.

pub mod dingtalk;
pub mod error;
pub mod render;
pub mod sink;

pub use dingtalk::{DingTalkNotifier, sign};
pub use error::AlerterError;
pub use render::{render_failure, render_report};
pub use sink::{DingTalkSink, LogSink, NotificationSink, sink_from_config};
