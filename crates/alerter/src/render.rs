use chrono::NaiveDateTime;
use core_types::{SignalKind, SignalReport};

struct Section {
    kind: SignalKind,
    heading: &'static str,
    /// Triggered signals are quoted so they stand out; near misses are a plain list.
    bullet: &'static str,
}

const SECTIONS: [Section; 4] = [
    Section {
        kind: SignalKind::Buy,
        heading: "### 🟢 Buy triggered",
        bullet: "> ",
    },
    Section {
        kind: SignalKind::Sell,
        heading: "### 🔴 Sell triggered",
        bullet: "> ",
    },
    Section {
        kind: SignalKind::NearBuy,
        heading: "#### 📉 Approaching buy (watch)",
        bullet: "- ",
    },
    Section {
        kind: SignalKind::NearSell,
        heading: "#### 📈 Approaching sell (watch)",
        bullet: "- ",
    },
];

fn stamp(at: &NaiveDateTime) -> String {
    at.format("%m-%d %H:%M").to_string()
}

/// Renders a signal report as DingTalk-flavoured markdown. Empty sections are omitted.
pub fn render_report(title: &str, report: &SignalReport) -> String {
    let when = stamp(&report.generated_at);
    let mut lines = vec![format!("## 📢 {} ({})", title, when), "---".to_string()];

    for section in &SECTIONS {
        let mut hits = report.of_kind(section.kind).peekable();
        if hits.peek().is_none() {
            continue;
        }
        lines.push(format!("\n{}", section.heading));
        lines.extend(hits.map(|hit| format!("{}{}", section.bullet, hit.message)));
    }

    lines.push("\n---".to_string());
    lines.push(format!("###### 🤖 Generated at {}", when));
    lines.join("\n")
}

/// Renders the alert sent when a scheduled run aborts.
pub fn render_failure(title: &str, error: &str, at: &NaiveDateTime) -> String {
    format!(
        "## 🚨 {} task failed\n---\n**Time**: {}\n\n**Error**:\n> {}",
        title,
        at.format("%Y-%m-%d %H:%M:%S"),
        error.replace('\n', "\n> ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::SignalHit;

    fn hit(code: &str, kind: SignalKind, message: &str) -> SignalHit {
        SignalHit {
            code: code.to_string(),
            name: code.to_string(),
            kind,
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            close: 10.0,
            bias_pct: -6.0,
            threshold_pct: -5.0,
            rsi: None,
            early_exit: false,
            duration_days: None,
            active_since: None,
            message: message.to_string(),
        }
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(16, 30, 0)
            .unwrap()
    }

    #[test]
    fn report_groups_hits_and_skips_empty_sections() {
        let mut report = SignalReport::new(at());
        report.hits.push(hit("00700", SignalKind::Buy, "buy line"));
        report.hits.push(hit("00005", SignalKind::NearSell, "near sell line"));

        let text = render_report("Signals", &report);
        assert!(text.starts_with("## 📢 Signals (06-02 16:30)"));
        assert!(text.contains("### 🟢 Buy triggered\n> buy line"));
        assert!(text.contains("#### 📈 Approaching sell (watch)\n- near sell line"));
        assert!(!text.contains("Sell triggered"));
        assert!(!text.contains("Approaching buy"));
        assert!(text.ends_with("###### 🤖 Generated at 06-02 16:30"));
    }

    #[test]
    fn buy_section_precedes_near_misses() {
        let mut report = SignalReport::new(at());
        report.hits.push(hit("00001", SignalKind::NearBuy, "WATCH-00001"));
        report.hits.push(hit("00002", SignalKind::Buy, "TRIGGER-00002"));

        let text = render_report("Signals", &report);
        assert!(text.find("TRIGGER-00002").unwrap() < text.find("WATCH-00001").unwrap());
    }

    #[test]
    fn failure_notice_quotes_every_error_line() {
        let text = render_failure("Long-bull", "store offline\nretry later", &at());
        assert!(text.contains("2025-06-02 16:30:00"));
        assert!(text.contains("> store offline\n> retry later"));
    }
}
