//! Terminal output for trainer commands

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use trainer_lib::{AttackClassifier, ArtifactInfo, Evaluation, PipelineReport, PredictionRecord};

/// Output format for trainer commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for the per-class evaluation table
#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "Attack Type")]
    label: String,
    #[tabled(rename = "Support")]
    support: usize,
    #[tabled(rename = "Correct")]
    correct: usize,
    #[tabled(rename = "Recall")]
    recall: String,
}

/// Row for key/value summaries
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct ModelSummary<'a> {
    labels: &'a [String],
    n_trees: usize,
    max_depth: Option<usize>,
    seed: Option<u64>,
    feature_columns: &'a [String],
    n_train_samples: usize,
    trained_at: i64,
    artifact: &'a ArtifactInfo,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_fields(rows: Vec<FieldRow>) {
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print the summary of a finished training run
pub fn print_report(report: &PipelineReport, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(report);
    }

    println!("{}", "Training Run".bold());
    println!("{}", "=".repeat(60));
    print_fields(vec![
        FieldRow {
            field: "Run ID",
            value: report.run_id.clone(),
        },
        FieldRow {
            field: "Rows loaded",
            value: report.rows_loaded.to_string(),
        },
        FieldRow {
            field: "Train / test",
            value: format!("{} / {}", report.train_rows, report.test_rows),
        },
        FieldRow {
            field: "Attack types",
            value: report.labels.join(", "),
        },
        FieldRow {
            field: "Model",
            value: report.artifact.path.display().to_string(),
        },
        FieldRow {
            field: "Size",
            value: format_bytes(report.artifact.size_bytes),
        },
        FieldRow {
            field: "SHA-256",
            value: report.artifact.checksum.clone(),
        },
    ]);

    println!();
    print_evaluation(&report.evaluation);

    println!();
    let kind = if report.live_prediction {
        "model prediction"
    } else {
        "sample document"
    };
    print_success(&format!(
        "Indexed {} {} as {}",
        kind,
        describe_prediction(&report.published),
        report.receipt.id.cyan()
    ));
    Ok(())
}

fn print_evaluation(evaluation: &Evaluation) {
    println!(
        "Held-out accuracy: {} ({}/{})",
        color_confidence(evaluation.accuracy),
        evaluation.correct,
        evaluation.samples
    );
    if evaluation.unlabeled > 0 {
        print_warning(&format!(
            "{} held-out rows had no attack_type and were not scored",
            evaluation.unlabeled
        ));
    }

    if evaluation.per_class.is_empty() {
        print_warning("No labeled test rows to score");
        return;
    }

    let rows: Vec<ClassRow> = evaluation
        .per_class
        .iter()
        .map(|c| ClassRow {
            label: c.label.clone(),
            support: c.support,
            correct: c.correct,
            recall: format_confidence(c.recall()),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Print a single prediction
pub fn print_prediction(prediction: &PredictionRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(prediction),
        OutputFormat::Table => {
            print_info(&format!("Predicted {}", describe_prediction(prediction)));
            Ok(())
        }
    }
}

/// Print metadata of a persisted model
pub fn print_model(
    model: &AttackClassifier,
    artifact: &ArtifactInfo,
    format: OutputFormat,
) -> Result<()> {
    let summary = ModelSummary {
        labels: model.labels(),
        n_trees: model.n_trees(),
        max_depth: model.params().max_depth,
        seed: model.params().seed,
        feature_columns: model.feature_columns(),
        n_train_samples: model.n_train_samples(),
        trained_at: model.trained_at(),
        artifact,
    };

    if let OutputFormat::Json = format {
        return print_json(&summary);
    }

    let trained_at = chrono::DateTime::from_timestamp(summary.trained_at, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| summary.trained_at.to_string());

    println!("{}", "Attack Classifier".bold());
    println!("{}", "=".repeat(60));
    print_fields(vec![
        FieldRow {
            field: "Path",
            value: artifact.path.display().to_string(),
        },
        FieldRow {
            field: "Size",
            value: format_bytes(artifact.size_bytes),
        },
        FieldRow {
            field: "SHA-256",
            value: artifact.checksum.clone(),
        },
        FieldRow {
            field: "Attack types",
            value: summary.labels.join(", "),
        },
        FieldRow {
            field: "Trees",
            value: summary.n_trees.to_string(),
        },
        FieldRow {
            field: "Max depth",
            value: summary
                .max_depth
                .map_or_else(|| "unlimited".to_string(), |d| d.to_string()),
        },
        FieldRow {
            field: "Features",
            value: summary.feature_columns.join(", "),
        },
        FieldRow {
            field: "Training rows",
            value: summary.n_train_samples.to_string(),
        },
        FieldRow {
            field: "Trained at",
            value: trained_at,
        },
    ]);
    Ok(())
}

fn describe_prediction(prediction: &PredictionRecord) -> String {
    format!(
        "{} ({})",
        prediction.attack_type.bold(),
        color_confidence(prediction.confidence)
    )
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a ratio as percentage
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Color a ratio based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_confidence(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.00Ki");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00Mi");
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.95), "95%");
        assert_eq!(format_confidence(1.0), "100%");
        assert_eq!(format_confidence(0.0), "0%");
    }
}
