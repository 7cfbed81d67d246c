//! CSV report for batch essay grading.
//!
//! One header line, then one line per graded essay. Fields containing a
//! comma or a double quote are quoted, with inner quotes doubled. Line
//! breaks inside a field are collapsed to a single space so each record
//! stays on one line.

use std::borrow::Cow;

use crate::flows::essay_grading::EssayGradingResult;

/// Header row of the grading CSV.
pub const CSV_HEADER: &str = "fileName,grade,feedback,reasoning";

/// Render batch grading results as CSV text (no trailing newline).
pub fn grading_csv(results: &[EssayGradingResult]) -> String {
    let mut out = String::from(CSV_HEADER);
    for r in results {
        out.push('\n');
        let fields = [&r.file_name, &r.grade, &r.feedback, &r.reasoning];
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&escape_field(field));
        }
    }
    out
}

/// Escape one CSV field.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    let field = collapse_line_breaks(field);
    if field.contains(',') || field.contains('"') {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        field
    }
}

fn collapse_line_breaks(field: &str) -> Cow<'_, str> {
    if !field.contains(['\n', '\r']) {
        return Cow::Borrowed(field);
    }
    let mut out = String::with_capacity(field.len());
    let mut in_break = false;
    for c in field.chars() {
        if c == '\n' || c == '\r' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(c);
            in_break = false;
        }
    }
    Cow::Owned(out)
}
