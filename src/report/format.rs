//! Formatted terminal output.
//!
//! Formatting lives here so the numeric code never prints; every function
//! returns a `String` for the caller to write.

use crate::error::Result;
use crate::metrics::QualityReport;
use crate::methods::REGISTRY;

/// What a smoothing or interpolation run did, for the header block.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub title: &'static str,
    pub input: String,
    pub method: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub groups: usize,
    /// `(group, reason)` for every group left out with `--skip-failed`.
    pub skipped: Vec<(String, String)>,
}

pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== ferm - {} ===\n", summary.title));
    out.push_str(&format!("Input: {}\n", summary.input));
    out.push_str(&format!("Method: {}\n", summary.method));
    out.push_str(&format!(
        "Rows: {} in -> {} out | groups={}\n",
        summary.rows_in, summary.rows_out, summary.groups
    ));
    for (group, reason) in &summary.skipped {
        out.push_str(&format!("  (skipped {group}) {reason}\n"));
    }
    out
}

/// Aligned text table, one line per group.
pub fn format_quality_report(report: &QualityReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Quality: {} vs {}\n",
        report.original, report.smoothed
    ));
    out.push_str(
        format!(
            "{:<16} {:>12} {:>12} {:>12} {:>10}\n",
            "group", "tv_original", "tv_smoothed", "rmse", "r2"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<12} {:-<12} {:-<12} {:-<10}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for row in &report.rows {
        let group = row.key.as_ref().map(ToString::to_string).unwrap_or_else(|| "(all)".to_string());
        out.push_str(
            format!(
                "{:<16} {:>12} {:>12} {:>12} {:>10}\n",
                truncate(&group, 16),
                fmt_metric(row.original_smoothness, 4),
                fmt_metric(row.smoothed_smoothness, 4),
                fmt_metric(row.fit.rmse, 6),
                fmt_metric(row.fit.r2, 4),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Every registered method with its parameters and defaults.
pub fn format_registry() -> String {
    let mut out = String::new();
    for info in REGISTRY {
        out.push_str(&format!("{:<8} [{}] {}\n", info.name, info.role, info.summary));
        for (key, default) in info.params {
            out.push_str(&format!("    {key:<18} default {default}\n"));
        }
    }
    out
}

/// The method registry as a JSON array, for scripts.
pub fn format_registry_json() -> Result<String> {
    Ok(serde_json::to_string_pretty(REGISTRY)?)
}

fn fmt_metric(v: f64, decimals: usize) -> String {
    if v.is_nan() {
        "-".to_string()
    } else {
        format!("{v:.decimals$}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GroupKey;
    use crate::metrics::{FitQuality, QualityRow};

    #[test]
    fn quality_report_renders_one_line_per_group() {
        let report = QualityReport {
            original: "ph".to_string(),
            smoothed: "ph_smooth".to_string(),
            group: Some("sample_id".to_string()),
            rows: vec![
                QualityRow {
                    key: Some(GroupKey::from("A")),
                    original_smoothness: 3.0,
                    smoothed_smoothness: 1.0,
                    fit: FitQuality { rmse: 0.1, r2: 0.95 },
                },
                QualityRow {
                    key: Some(GroupKey::from("a-very-long-sample-name")),
                    original_smoothness: f64::NAN,
                    smoothed_smoothness: f64::NAN,
                    fit: FitQuality { rmse: f64::NAN, r2: f64::NAN },
                },
            ],
        };
        let text = format_quality_report(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[3].starts_with("A "));
        assert!(lines[3].contains("0.950"));
        assert!(lines[4].starts_with("a-very-long-sam."));
        assert!(lines[4].ends_with('-'));
    }

    #[test]
    fn registry_listing_mentions_every_method_and_default() {
        let text = format_registry();
        for name in ["rolling", "ema", "savgol", "linear", "spline"] {
            assert!(text.contains(name));
        }
        assert!(text.contains("window_length"));
        assert!(text.contains("default extrapolate"));
    }

    #[test]
    fn registry_json_lists_defaults_by_name() {
        let json: serde_json::Value = serde_json::from_str(&format_registry_json().unwrap()).unwrap();
        let methods = json.as_array().unwrap();
        assert_eq!(methods.len(), 5);
        assert_eq!(methods[2]["name"], "savgol");
        assert_eq!(methods[2]["role"], "smoothing");
        assert_eq!(methods[2]["params"]["window_length"], "5");
        assert_eq!(methods[4]["role"], "both");
    }

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 4), "abc.");
    }
}
