//! Recent controller output, kept for failure reports

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::DIAGNOSTIC_CAPACITY;

/// Ring buffer of the most recent controller lines, oldest evicted first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Diagnostics {
    lines: VecDeque<String>,
}

impl Diagnostics {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line, dropping the oldest one when full
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == DIAGNOSTIC_CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Forget every recorded line
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines from oldest to newest
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Owned copy of the lines, oldest first
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// Number of lines held, at most [`DIAGNOSTIC_CAPACITY`]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True before the controller has said anything
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<Vec<String>> for Diagnostics {
    fn from(lines: Vec<String>) -> Self {
        let mut diagnostics = Self::new();
        for line in lines {
            diagnostics.push(line);
        }
        diagnostics
    }
}

impl From<Diagnostics> for Vec<String> {
    fn from(diagnostics: Diagnostics) -> Self {
        diagnostics.lines.into()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            return write!(f, "<no output>");
        }
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}
