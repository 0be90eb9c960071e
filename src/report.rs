//! Run reports for split and export runs.
//!
//! Problems that only affect one label file or one shape do not abort a
//! run; they are collected here so the caller can print or serialize them.

use serde::Serialize;
use std::fmt;

use crate::error::RsLabelError;

/// What happened during one split or export run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    /// The action that produced this report (`split`, `coco`, `voc`).
    pub action: String,
    pub counts: RunCounts,
    /// Labels in first-seen order.
    pub labels: Vec<String>,
    pub issues: Vec<RunIssue>,
}

impl RunReport {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, issue: RunIssue) {
        self.issues.push(issue);
    }

    /// Records `label` unless it has been seen before.
    pub fn note_label(&mut self, label: &str) {
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
    }

    /// Folds a nested run (the splitter inside an export) into this one.
    pub fn absorb(&mut self, other: RunReport) {
        self.counts.label_files += other.counts.label_files;
        self.counts.skipped_label_files += other.counts.skipped_label_files;
        self.counts.tiles_written += other.counts.tiles_written;
        self.counts.tiles_skipped += other.counts.tiles_skipped;
        self.counts.images += other.counts.images;
        self.counts.annotations += other.counts.annotations;
        for label in &other.labels {
            self.note_label(label);
        }
        self.issues.extend(other.issues);
    }

    /// Counts a label file that could not be parsed as skipped.
    pub fn skip_invalid_label_file(&mut self, err: &RsLabelError) {
        log::warn!("{err}; skipping");
        self.counts.skipped_label_files += 1;
        self.add(RunIssue::warning(RunIssueCode::InvalidLabelFile, err.to_string()));
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == RunSeverity::Warning)
            .count()
    }

    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == RunSeverity::Info)
            .count()
    }

    pub fn issues_with(&self, code: RunIssueCode) -> impl Iterator<Item = &RunIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} label files ({} skipped), {} labels",
            self.counts.label_files,
            self.counts.skipped_label_files,
            self.labels.len()
        )?;
        if self.counts.tiles_written > 0 || self.counts.tiles_skipped > 0 {
            writeln!(
                f,
                "  {} tiles written, {} empty tiles skipped",
                self.counts.tiles_written, self.counts.tiles_skipped
            )?;
        }
        if self.counts.images > 0 || self.counts.annotations > 0 {
            writeln!(
                f,
                "  {} images, {} annotations",
                self.counts.images, self.counts.annotations
            )?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == RunSeverity::Warning)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == RunSeverity::Info)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    /// Label files processed.
    pub label_files: usize,
    /// Label files skipped (no raster, invalid JSON, unknown class).
    pub skipped_label_files: usize,
    pub tiles_written: usize,
    pub tiles_skipped: usize,
    /// Images written to a dataset.
    pub images: usize,
    /// Annotations written to a dataset.
    pub annotations: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunIssue {
    pub severity: RunSeverity,
    pub code: RunIssueCode,
    pub message: String,
}

impl RunIssue {
    pub fn warning(code: RunIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: RunSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn info(code: RunIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: RunSeverity::Info,
            code,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSeverity {
    /// Something was left out of the output.
    Warning,
    Info,
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunIssueCode {
    /// A label file has no sibling raster with a configured extension.
    MissingRaster,
    /// A `.json` file is not valid label JSON; it was skipped.
    InvalidLabelFile,
    /// A label is not in the class list; the raster's annotation was not written.
    UnknownClass,
    /// A shape the VOC exporter does not write: an unsupported kind, or too
    /// few points for a box.
    UnsupportedShapeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_first_seen_unique() {
        let mut report = RunReport::new("split");
        for label in ["a", "b", "a", "c"] {
            report.note_label(label);
        }
        assert_eq!(report.labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn absorb_merges_counts_labels_and_issues() {
        let mut outer = RunReport::new("coco");
        outer.note_label("b");
        outer.counts.images = 2;

        let mut inner = RunReport::new("split");
        inner.note_label("a");
        inner.note_label("b");
        inner.counts.tiles_written = 3;
        inner.add(RunIssue::warning(RunIssueCode::MissingRaster, "x.json"));

        outer.absorb(inner);
        assert_eq!(outer.labels, vec!["b", "a"]);
        assert_eq!(outer.counts.images, 2);
        assert_eq!(outer.counts.tiles_written, 3);
        assert_eq!(outer.warning_count(), 1);
    }

    #[test]
    fn display_lists_warnings_and_notes() {
        let mut report = RunReport::new("voc");
        report.counts.label_files = 2;
        report.add(RunIssue::warning(
            RunIssueCode::UnknownClass,
            "label 'x' in a.json is not in labels.txt",
        ));
        report.add(RunIssue::info(
            RunIssueCode::UnsupportedShapeKind,
            "line shapes are not written to VOC",
        ));

        let text = report.to_string();
        assert!(text.contains("2 label files (0 skipped)"));
        assert!(text.contains("Warnings (1):"));
        assert!(text.contains("Notes (1):"));
    }

    #[test]
    fn invalid_label_file_is_a_skipped_warning() {
        let mut report = RunReport::new("split");
        let err = RsLabelError::LabelFileInvalid {
            path: "notes.json".into(),
            message: "geoTrans must have 6 numbers".to_string(),
        };
        report.skip_invalid_label_file(&err);

        assert_eq!(report.counts.skipped_label_files, 1);
        assert_eq!(report.warning_count(), 1);
        let issue = report.issues_with(RunIssueCode::InvalidLabelFile).next().unwrap();
        assert!(issue.message.contains("notes.json"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"][0]["code"], "invalid_label_file");
    }

    #[test]
    fn json_uses_snake_case_codes() {
        let mut report = RunReport::new("split");
        report.add(RunIssue::info(RunIssueCode::UnsupportedShapeKind, "circle"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"][0]["code"], "unsupported_shape_kind");
        assert_eq!(json["issues"][0]["severity"], "info");
    }
}
