//! Praat TextGrid serialization.
//!
//! Emits the "ooTextFile short" format: a bare header, then per tier the
//! class, name, bounds, interval count, and one start/end/label triple per
//! interval. All times are rounded to millisecond precision.

use crate::error::Result;
use crate::timeline::AnnotationDocument;
use std::fs;
use std::path::Path;

/// Rounds to 3 decimals and formats with a decimal point, `2.5` not `2.500`.
fn fmt_time(t: f64) -> String {
    let rounded = (t * 1000.0).round() / 1000.0;
    let s = format!("{rounded}");
    if s.contains('.') { s } else { format!("{s}.0") }
}

/// Doubles embedded quotes, the TextGrid string escape.
fn escape_label(label: &str) -> String {
    label.replace('"', "\"\"")
}

/// Renders the document as an ooTextFile short TextGrid.
pub fn to_textgrid_string(doc: &AnnotationDocument) -> String {
    let mut out = String::new();
    out.push_str("File type = \"ooTextFile short\"\n");
    out.push_str("\"TextGrid\"\n");
    out.push('\n');
    out.push_str("0\n");
    out.push_str(&fmt_time(doc.duration));
    out.push('\n');
    out.push_str("<exists>\n");
    out.push_str(&format!("{}\n", doc.tiers.len()));

    for tier in &doc.tiers {
        out.push_str("\"IntervalTier\"\n");
        out.push_str(&format!("\"{}\"\n", escape_label(&tier.name())));
        out.push_str("0\n");
        out.push_str(&fmt_time(doc.duration));
        out.push('\n');
        out.push_str(&format!("{}\n", tier.intervals.len()));
        for interval in &tier.intervals {
            out.push_str(&fmt_time(interval.start));
            out.push('\n');
            out.push_str(&fmt_time(interval.end));
            out.push('\n');
            out.push_str(&format!("\"{}\"\n", escape_label(&interval.label)));
        }
    }
    out
}

/// Writes the document to `path` as a TextGrid.
pub fn write_textgrid(doc: &AnnotationDocument, path: &Path) -> Result<()> {
    fs::write(path, to_textgrid_string(doc))?;
    Ok(())
}
