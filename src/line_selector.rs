//! Line-range specifications such as `4-7,11-,9,1`.
//!
//! Numbers are 1-indexed and inclusive. `-b` starts at the first line, `a-`
//! runs to the last one. Selection never reorders text: the result is the
//! sorted set of chosen lines, whatever order the tokens came in.

use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineSpecError {
    #[error("empty entry in line specification '{spec}'")]
    EmptyToken { spec: String },
    #[error("'-' without bounds in line specification '{spec}'")]
    BareDash { spec: String },
    #[error("invalid line number '{token}' in line specification '{spec}'")]
    InvalidNumber { token: String, spec: String },
}

/// One comma-separated entry of a specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRange {
    Single(usize),
    /// `start` and `end` are `None` for an open bound.
    Span { start: Option<usize>, end: Option<usize> },
}

/// A parsed line-range specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    ranges: Vec<LineRange>,
}

impl LineSpec {
    pub fn parse(spec: &str) -> Result<Self, LineSpecError> {
        let mut ranges = Vec::new();
        for token in spec.split(',').map(str::trim) {
            if token.is_empty() {
                return Err(LineSpecError::EmptyToken { spec: spec.to_string() });
            }
            let number = |value: &str| {
                value.trim().parse::<usize>().map_err(|_| LineSpecError::InvalidNumber {
                    token: token.to_string(),
                    spec: spec.to_string(),
                })
            };
            let range = match token.split_once('-') {
                None => LineRange::Single(number(token)?),
                Some((start, end)) => {
                    let (start, end) = (start.trim(), end.trim());
                    if start.is_empty() && end.is_empty() {
                        return Err(LineSpecError::BareDash { spec: spec.to_string() });
                    }
                    LineRange::Span {
                        start: if start.is_empty() { None } else { Some(number(start)?) },
                        end: if end.is_empty() { None } else { Some(number(end)?) },
                    }
                }
            };
            ranges.push(range);
        }
        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[LineRange] {
        &self.ranges
    }

    /// Line numbers to keep for a text of `line_count` lines, clamped to
    /// `1..=line_count`.
    pub fn select(&self, line_count: usize) -> BTreeSet<usize> {
        let mut selected = BTreeSet::new();
        if line_count == 0 {
            return selected;
        }
        let clamp = |n: usize| n.clamp(1, line_count);
        for range in &self.ranges {
            match *range {
                LineRange::Single(n) => {
                    selected.insert(clamp(n));
                }
                LineRange::Span { start, end } => {
                    let start = clamp(start.unwrap_or(1));
                    let end = clamp(end.unwrap_or(line_count));
                    selected.extend(start..=end);
                }
            }
        }
        selected
    }
}

/// Line numbers selected by an optional specification; `None` or a blank
/// specification keeps all.
pub fn select_lines(spec: Option<&str>, line_count: usize) -> Result<Vec<usize>, LineSpecError> {
    match spec.filter(|s| !s.trim().is_empty()) {
        None => Ok((1..=line_count).collect()),
        Some(spec) => Ok(LineSpec::parse(spec)?.select(line_count).into_iter().collect()),
    }
}

/// Keeps only the lines of `text` chosen by `spec`, in document order.
pub fn filter_lines(text: &str, spec: &str) -> Result<String, LineSpecError> {
    if spec.trim().is_empty() {
        return Ok(text.to_string());
    }
    let lines: Vec<&str> = text.lines().collect();
    let selected = LineSpec::parse(spec)?.select(lines.len());
    Ok(selected.into_iter().map(|n| lines[n - 1]).collect::<Vec<_>>().join("\n"))
}
