//! Output formatting utilities

use analyzer_lib::{Anomaly, SeverityLevel};
use anyhow::Result;
use chrono::SecondsFormat;
use clap::ValueEnum;
use colored::Colorize;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Numbered human-readable list (default)
    #[default]
    Text,
    /// One row per anomaly
    Table,
    /// Pretty-printed JSON array
    Json,
}

impl OutputFormat {
    pub fn renderer(&self) -> Box<dyn AnomalyRenderer> {
        match self {
            OutputFormat::Text => Box::new(TextRenderer),
            OutputFormat::Table => Box::new(TableRenderer),
            OutputFormat::Json => Box::new(JsonRenderer),
        }
    }
}

/// Turns a detection result into printable output
pub trait AnomalyRenderer {
    fn render(&self, anomalies: &[Anomaly]) -> Result<String>;
}

pub fn render_anomalies(anomalies: &[Anomaly], format: OutputFormat) -> Result<String> {
    format.renderer().render(anomalies)
}

const NO_ANOMALIES: &str = "No anomalies detected.\n";

pub struct TextRenderer;

impl AnomalyRenderer for TextRenderer {
    fn render(&self, anomalies: &[Anomaly]) -> Result<String> {
        if anomalies.is_empty() {
            return Ok(NO_ANOMALIES.to_string());
        }

        let mut out = String::new();
        writeln!(out, "Found {} anomalies:\n", anomalies.len())?;
        for (i, anomaly) in anomalies.iter().enumerate() {
            writeln!(
                out,
                "{}. {} [{}]",
                i + 1,
                anomaly.description,
                color_severity(anomaly.level())
            )?;
            writeln!(out, "   Entity: {}", anomaly.entity)?;
            writeln!(out, "   Type: {}", anomaly.anomaly_type)?;
            writeln!(out, "   Severity: {:.2}", anomaly.severity)?;
            writeln!(
                out,
                "   Time: {}",
                anomaly.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
            )?;
            if !anomaly.metrics.is_empty() {
                writeln!(out, "   Metrics:")?;
                for (key, value) in &anomaly.metrics {
                    writeln!(out, "     {}: {:.2}", key, value)?;
                }
            }
            if !anomaly.labels.is_empty() {
                let labels: Vec<String> = anomaly
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                writeln!(out, "   Labels: {}", labels.join(", "))?;
            }
            out.push('\n');
        }
        Ok(out)
    }
}

#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Type")]
    anomaly_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Description")]
    description: String,
}

pub struct TableRenderer;

impl AnomalyRenderer for TableRenderer {
    fn render(&self, anomalies: &[Anomaly]) -> Result<String> {
        if anomalies.is_empty() {
            return Ok(NO_ANOMALIES.to_string());
        }

        let rows: Vec<AnomalyRow> = anomalies
            .iter()
            .map(|a| AnomalyRow {
                entity: truncate(&a.entity, 24),
                anomaly_type: a.anomaly_type.to_string(),
                severity: color_severity(a.level()),
                score: format!("{:.2}", a.severity),
                time: a.timestamp.format("%H:%M:%S").to_string(),
                description: truncate(&a.description, 48),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        Ok(format!("{}\n", table))
    }
}

pub struct JsonRenderer;

impl AnomalyRenderer for JsonRenderer {
    fn render(&self, anomalies: &[Anomaly]) -> Result<String> {
        let mut json = serde_json::to_string_pretty(anomalies)?;
        json.push('\n');
        Ok(json)
    }
}

/// Shorten to at most `max_len` characters, marking the cut with "..."
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub fn color_severity(level: SeverityLevel) -> String {
    let label = level.to_string();
    match level {
        SeverityLevel::Critical => label.red().bold().to_string(),
        SeverityLevel::High => label.red().to_string(),
        SeverityLevel::Medium => label.yellow().to_string(),
        SeverityLevel::Low => label.green().to_string(),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer_lib::AnomalyType;

    fn anomalies() -> Vec<Anomaly> {
        let json = r#"[
            {"type": "traffic_spike", "entity": "checkout", "severity": 2.5,
             "description": "Traffic spike detected: 250.00 requests",
             "timestamp": "2024-01-15T14:30:00Z",
             "metrics": {"current_traffic": 250.0}},
            {"type": "error_rate_high", "entity": "payments", "severity": 4.0,
             "description": "High error rate: 20.00%",
             "timestamp": "2024-01-15T14:30:05Z",
             "metrics": {"error_rate": 0.2}, "labels": {"namespace": "shop"}}
        ]"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_result_message() {
        for format in [OutputFormat::Text, OutputFormat::Table] {
            assert_eq!(render_anomalies(&[], format).unwrap(), NO_ANOMALIES);
        }
        assert_eq!(render_anomalies(&[], OutputFormat::Json).unwrap().trim(), "[]");
    }

    #[test]
    fn test_text_output() {
        let text = render_anomalies(&anomalies(), OutputFormat::Text).unwrap();
        assert!(text.starts_with("Found 2 anomalies:"));
        assert!(text.contains("1. Traffic spike detected: 250.00 requests"));
        assert!(text.contains("   Entity: payments"));
        assert!(text.contains("   Type: error_rate_high"));
        assert!(text.contains("   Time: 2024-01-15T14:30:00Z"));
        assert!(text.contains("     current_traffic: 250.00"));
        assert!(text.contains("   Labels: namespace=shop"));
    }

    #[test]
    fn test_table_output() {
        let table = render_anomalies(&anomalies(), OutputFormat::Table).unwrap();
        assert!(table.contains("Entity"));
        assert!(table.contains("checkout"));
        assert!(table.contains("traffic_spike"));
        assert!(table.contains("4.00"));
    }

    #[test]
    fn test_json_output_round_trips() {
        let json = render_anomalies(&anomalies(), OutputFormat::Json).unwrap();
        let parsed: Vec<Anomaly> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].anomaly_type, AnomalyType::ErrorRateHigh);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-service-name", 10), "a-very-...");
    }
}
