//! CLI output formatting.
//!
//! Every command has a `format_*` function returning `Vec<String>` for
//! testability; `main` prints the lines. Format functions are pure: no I/O,
//! no side effects.
//!
//! # Output Format
//!
//! ## Detect
//!
//! ```text
//! 001 beach.jpg
//!     Focal point: (412, 230)
//! 002 sky.png
//!     Focal point: none found
//! 003 broken.jpg
//!     Skipped: could not decode
//!
//! Detected 1 focal point, cleared 1, skipped 1
//! ```
//!
//! ## Scale
//!
//! ```text
//! beach.jpg → beach-400x400.jpg
//!     Size: 400 x 400 (jpeg)
//!     Cache: 0 cached, 1 created (1 total)
//! ```

use crate::pipeline::Detection;
use crate::scaling::ScaleOutcome;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One file's detection result: header plus indented outcome.
pub fn format_detection(index: usize, path: &Path, outcome: &Detection) -> Vec<String> {
    let detail = match outcome {
        Detection::Found((x, y)) => format!("Focal point: ({x}, {y})"),
        Detection::Cleared => "Focal point: none found".to_string(),
        Detection::Skipped => "Skipped: could not decode".to_string(),
    };
    vec![
        format!("{} {}", format_index(index), display_name(path)),
        format!("    {detail}"),
    ]
}

/// Totals line closing a `detect` run.
pub fn format_detect_summary(outcomes: &[Detection]) -> String {
    let found = outcomes
        .iter()
        .filter(|o| matches!(o, Detection::Found(_)))
        .count();
    let cleared = outcomes
        .iter()
        .filter(|o| matches!(o, Detection::Cleared))
        .count();
    let skipped = outcomes.len() - found - cleared;
    let noun = if found == 1 { "point" } else { "points" };
    format!("Detected {found} focal {noun}, cleared {cleared}, skipped {skipped}")
}

/// Result of a `scale` command.
pub fn format_scale_outcome(
    source: &Path,
    written: Option<&Path>,
    outcome: &ScaleOutcome,
) -> Vec<String> {
    let target = written
        .map(display_name)
        .unwrap_or_else(|| "(not written)".to_string());
    let mut lines = vec![format!("{} → {}", display_name(source), target)];
    match outcome {
        ScaleOutcome::Original {
            format,
            width,
            height,
        } => {
            lines.push(format!("    Original: {width} x {height} ({format})"));
        }
        ScaleOutcome::Passthrough {
            format,
            width,
            height,
            ..
        } => {
            lines.push(format!("    Passed through: {width} x {height} ({format})"));
        }
        ScaleOutcome::Scaled(stored) => {
            lines.push(format!(
                "    Size: {} x {} ({})",
                stored.entry.width, stored.entry.height, stored.entry.format
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ScaleEntry, StoredScale};
    use crate::imaging::OutputFormat;

    #[test]
    fn detection_found() {
        let lines = format_detection(1, Path::new("/photos/beach.jpg"), &Detection::Found((412, 230)));
        assert_eq!(lines, vec!["001 beach.jpg", "    Focal point: (412, 230)"]);
    }

    #[test]
    fn detection_cleared_and_skipped() {
        let cleared = format_detection(2, Path::new("sky.png"), &Detection::Cleared);
        assert_eq!(cleared[1], "    Focal point: none found");
        let skipped = format_detection(12, Path::new("x.jpg"), &Detection::Skipped);
        assert_eq!(skipped[0], "012 x.jpg");
        assert_eq!(skipped[1], "    Skipped: could not decode");
    }

    #[test]
    fn detect_summary_counts() {
        let outcomes = [
            Detection::Found((1, 1)),
            Detection::Cleared,
            Detection::Skipped,
            Detection::Skipped,
        ];
        assert_eq!(
            format_detect_summary(&outcomes),
            "Detected 1 focal point, cleared 1, skipped 2"
        );
        assert_eq!(
            format_detect_summary(&[]),
            "Detected 0 focal points, cleared 0, skipped 0"
        );
    }

    #[test]
    fn scale_outcome_scaled() {
        let outcome = ScaleOutcome::Scaled(StoredScale {
            entry: ScaleEntry {
                uid: "u".into(),
                fieldname: "image".into(),
                width: 400,
                height: 300,
                format: OutputFormat::Jpeg,
                filename: "u.jpg".into(),
                created: 0,
                source_hash: "h".into(),
            },
            data: vec![],
        });
        let lines = format_scale_outcome(
            Path::new("beach.jpg"),
            Some(Path::new("out/beach-400x300.jpg")),
            &outcome,
        );
        assert_eq!(
            lines,
            vec!["beach.jpg → beach-400x300.jpg", "    Size: 400 x 300 (jpeg)"]
        );
    }

    #[test]
    fn scale_outcome_original() {
        let outcome = ScaleOutcome::Original {
            format: "png".into(),
            width: 10,
            height: 20,
        };
        let lines = format_scale_outcome(Path::new("a.png"), None, &outcome);
        assert_eq!(lines[0], "a.png → (not written)");
        assert_eq!(lines[1], "    Original: 10 x 20 (png)");
    }
}
