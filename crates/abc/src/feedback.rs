//! Parser feedback.
//!
//! Parsing never stops at the first problem. Everything odd is recorded
//! with its position and the parse carries on; callers decide what level
//! of feedback is fatal.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub level: FeedbackLevel,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub suggestion: Option<String>,
}

impl Feedback {
    fn at(level: FeedbackLevel, message: impl Into<String>, line: usize, column: usize) -> Self {
        Feedback {
            level,
            message: message.into(),
            line,
            column,
            suggestion: None,
        }
    }

    pub fn error(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::at(FeedbackLevel::Error, message, line, column)
    }

    pub fn warning(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::at(FeedbackLevel::Warning, message, line, column)
    }

    pub fn info(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::at(FeedbackLevel::Info, message, line, column)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line, self.column, self.level, self.message
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackLevel {
    /// Part of the input could not be understood and was dropped
    Error,
    /// Parsed with an assumption the writer may not have intended
    Warning,
    Info,
}

impl fmt::Display for FeedbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeedbackLevel::Error => "error",
            FeedbackLevel::Warning => "warning",
            FeedbackLevel::Info => "info",
        })
    }
}

/// Collects feedback at a moving position while parsing
#[derive(Debug)]
pub struct FeedbackCollector {
    feedback: Vec<Feedback>,
    line: usize,
    column: usize,
}

impl Default for FeedbackCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackCollector {
    pub fn new() -> Self {
        FeedbackCollector {
            feedback: Vec::new(),
            line: 1,
            column: 1,
        }
    }

    pub fn set_position(&mut self, line: usize, column: usize) {
        self.line = line;
        self.column = column;
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.feedback
            .push(Feedback::error(message, self.line, self.column));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.feedback
            .push(Feedback::warning(message, self.line, self.column));
    }

    pub fn warning_with_suggestion(
        &mut self,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.feedback.push(
            Feedback::warning(message, self.line, self.column).with_suggestion(suggestion),
        );
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.feedback
            .push(Feedback::info(message, self.line, self.column));
    }

    pub fn has_errors(&self) -> bool {
        self.feedback
            .iter()
            .any(|f| f.level == FeedbackLevel::Error)
    }

    pub fn into_feedback(self) -> Vec<Feedback> {
        self.feedback
    }
}

/// A value plus everything the parser had to say about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult<T> {
    pub value: T,
    pub feedback: Vec<Feedback>,
}

impl<T> ParseResult<T> {
    pub fn new(value: T, feedback: Vec<Feedback>) -> Self {
        ParseResult { value, feedback }
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Feedback> {
        self.feedback
            .iter()
            .filter(|f| f.level == FeedbackLevel::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Feedback> {
        self.feedback
            .iter()
            .filter(|f| f.level == FeedbackLevel::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_display() {
        let fb = Feedback::warning("Missing M: field", 1, 1).with_suggestion("Add M:4/4");
        assert_eq!(fb.to_string(), "1:1: warning: Missing M: field (Add M:4/4)");

        let fb = Feedback::error("Unterminated chord", 4, 7);
        assert_eq!(fb.to_string(), "4:7: error: Unterminated chord");
    }

    #[test]
    fn test_feedback_collector_positions() {
        let mut collector = FeedbackCollector::new();

        collector.warning("Missing M: field");
        collector.set_position(5, 10);
        collector.error("Invalid key signature");
        assert!(collector.has_errors());

        let feedback = collector.into_feedback();
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[0].line, 1);
        assert_eq!((feedback[1].line, feedback[1].column), (5, 10));
    }

    #[test]
    fn test_parse_result_filters() {
        let result: ParseResult<i32> = ParseResult::new(
            42,
            vec![
                Feedback::warning("test warning", 1, 1),
                Feedback::error("test error", 2, 1),
                Feedback::info("test info", 3, 1),
            ],
        );

        assert!(result.has_errors());
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(result.errors().count(), 1);
    }
}
