//! Pass/fail report.
//!
//! A check writes into a [`Transcript`] while it runs; the runner wraps the
//! transcript and the outcome into a [`Section`], and sections accumulate in
//! a [`Report`].

use std::io::Write;

use serde::Serialize;

use crate::check::CheckKind;

const PASS_MARK: &str = "✓";
const FAIL_MARK: &str = "✗";

/// One line of check output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Line {
    /// Informational line, indented by `indent` levels.
    Detail {
        /// Indentation level (two spaces each).
        indent: u8,
        /// Line text.
        text: String,
    },
    /// A step succeeded.
    Pass {
        /// Line text.
        text: String,
    },
    /// A step failed.
    Fail {
        /// Line text.
        text: String,
    },
}

/// Output collected while a check runs.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<Line>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful step.
    pub fn pass(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Pass { text: text.into() });
    }

    /// Record a first-level detail line.
    pub fn detail(&mut self, text: impl Into<String>) {
        self.indented(1, text);
    }

    /// Record a second-level detail line.
    pub fn nested(&mut self, text: impl Into<String>) {
        self.indented(2, text);
    }

    /// Record a detail line at an explicit indentation level.
    pub fn indented(&mut self, indent: u8, text: impl Into<String>) {
        self.lines.push(Line::Detail {
            indent,
            text: text.into(),
        });
    }

    /// Lines recorded so far.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub(crate) fn fail(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Fail { text: text.into() });
    }

    pub(crate) fn into_lines(self) -> Vec<Line> {
        self.lines
    }
}

/// How a check ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every step succeeded.
    Passed,
    /// A step failed and the check stopped.
    Failed {
        /// Error message.
        message: String,
        /// Operator hint, when the failure is a well-known one.
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

impl Outcome {
    /// Whether the check passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// A finished check.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    /// 1-based position in the run.
    pub index: usize,
    /// Which check produced this section.
    pub check: CheckKind,
    /// Heading, e.g. "Testing basic connection".
    pub title: String,
    /// Output in the order it was produced.
    pub lines: Vec<Line>,
    /// How the check ended.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Wall-clock duration.
    pub elapsed_ms: u64,
}

impl Section {
    /// Render this section as text.
    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{}. {}...", self.index, self.title)?;
        for line in &self.lines {
            match line {
                Line::Detail { indent, text } => {
                    let pad = "  ".repeat(usize::from(*indent));
                    writeln!(out, "{pad}{text}")?;
                }
                Line::Pass { text } => writeln!(out, "{PASS_MARK} {text}")?,
                Line::Fail { text } => writeln!(out, "{FAIL_MARK} {text}")?,
            }
        }
        if let Outcome::Failed {
            hint: Some(hint), ..
        } = &self.outcome
        {
            writeln!(out, "  hint: {hint}")?;
        }
        writeln!(out)
    }
}

/// Results of a probe run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Run title.
    pub title: String,
    /// Finished checks in execution order.
    pub sections: Vec<Section>,
}

impl Report {
    /// Create an empty report.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
        }
    }

    /// Number of passed checks.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.outcome.is_passed())
            .count()
    }

    /// Number of failed checks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.sections.len() - self.passed()
    }

    /// Whether every check passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Process exit status: 0 when every check passed, 1 otherwise.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        u8::from(!self.is_success())
    }

    /// Render the report header.
    pub fn write_header<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "=== {} ===", self.title)?;
        writeln!(out)
    }

    /// Render the report footer.
    pub fn write_footer<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(
            out,
            "=== All tests completed: {} passed, {} failed ===",
            self.passed(),
            self.failed()
        )
    }

    /// Render the whole report as text.
    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        self.write_header(out)?;
        for section in &self.sections {
            section.write_text(out)?;
        }
        self.write_footer(out)
    }

    /// Render the whole report as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, out: &mut W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out).map_err(serde_json::Error::io)
    }
}
