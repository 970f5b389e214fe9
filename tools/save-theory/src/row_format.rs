//! Text rendering of header labels and data rows.

use crate::types::ParamId;
use std::fmt::Write as _;

pub const COMMENT_MARKER: char = '#';
pub const LABEL_SEPARATOR: &str = "  ";
pub const VALUE_SEPARATOR: char = ' ';

/// `#group--name  group--name  ` with no trailing newline.
pub fn header_prefix(params: &[ParamId]) -> String {
    let mut out = String::new();
    out.push(COMMENT_MARKER);
    for param in params {
        out.push_str(&param.label());
        out.push_str(LABEL_SEPARATOR);
    }
    out
}

/// `d_0  d_1  ...` for `count` vector elements, terminated by a newline.
pub fn header_suffix(count: usize) -> String {
    let mut out = String::with_capacity(count * 6 + 1);
    for index in 0..count {
        let _ = write!(out, "d_{index}{LABEL_SEPARATOR}");
    }
    out.push('\n');
    out
}

/// One newline-terminated row. `{:?}` is the shortest text that parses back
/// to the same `f64` and always keeps a decimal point or exponent.
pub fn format_row(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 20 + 1);
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            out.push(VALUE_SEPARATOR);
        }
        let _ = write!(out, "{value:?}");
    }
    out.push('\n');
    out
}
