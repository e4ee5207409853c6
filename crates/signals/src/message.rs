use core_types::{SignalHit, SignalKind};
use std::fmt::Write;

/// One markdown-friendly line per hit: who, price, bias against threshold, then context.
pub(crate) fn describe(hit: &SignalHit) -> String {
    let mut line = match hit.kind {
        SignalKind::Buy | SignalKind::Sell => format!("**{}** ({})", hit.name, hit.code),
        SignalKind::NearBuy | SignalKind::NearSell => format!("{} ({})", hit.name, hit.code),
    };

    let relation = if hit.kind.is_triggered() {
        "crossed"
    } else {
        "near"
    };
    let ma = match hit.kind {
        SignalKind::Buy | SignalKind::NearBuy => "long MA",
        SignalKind::Sell | SignalKind::NearSell => "short MA",
    };
    let _ = write!(
        line,
        ": close {:.2}, {} bias {:.2}% ({} {}%)",
        hit.close, ma, hit.bias_pct, relation, hit.threshold_pct
    );

    if let Some(rsi) = hit.rsi {
        let _ = write!(line, ", RSI {:.1}", rsi);
    }
    if hit.early_exit {
        line.push_str(", early exit on RSI");
    }
    if let (Some(days), Some(since)) = (hit.duration_days, hit.active_since) {
        let _ = write!(line, ", active {} day(s) since {}", days, since);
    }
    line
}
