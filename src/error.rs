// Xn Error Handling Module
// Error reporting with line/col spans and colored terminal output

use colored::*;
use std::fmt;

/// Represents a position in the source code; line 0 means "unknown"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Represents a span in the source code (start to end position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn single(line: usize, column: usize) -> Self {
        let pos = Position::new(line, column);
        Self { start: pos, end: pos }
    }

    /// Merge two spans into one covering both
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
        }
    }

    pub fn is_known(&self) -> bool {
        self.start.line != 0
    }
}

/// Types of errors in xn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SyntaxError,
    CompileError,
    TypeError,
    NameError,
    IndexError,
    ArgumentError,
    DivisionByZero,
    ImportError,
    RuntimeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SyntaxError => write!(f, "SyntaxError"),
            ErrorKind::CompileError => write!(f, "CompileError"),
            ErrorKind::TypeError => write!(f, "TypeError"),
            ErrorKind::NameError => write!(f, "NameError"),
            ErrorKind::IndexError => write!(f, "IndexError"),
            ErrorKind::ArgumentError => write!(f, "ArgumentError"),
            ErrorKind::DivisionByZero => write!(f, "DivisionByZero"),
            ErrorKind::ImportError => write!(f, "ImportError"),
            ErrorKind::RuntimeError => write!(f, "RuntimeError"),
        }
    }
}

/// Main error type for xn
#[derive(Debug, Clone)]
pub struct XnError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub file: String,
    pub help: Option<String>,
}

impl XnError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        span: Span,
        file: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            file: file.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Format the error for terminal display
    pub fn format(&self) -> String {
        let mut output = String::new();

        let location = if self.span.is_known() {
            format!(
                " at {}:{}:{}",
                self.file, self.span.start.line, self.span.start.column
            )
        } else if !self.file.is_empty() {
            format!(" in {}", self.file)
        } else {
            String::new()
        };

        output.push_str(&format!(
            "{}: {}{}",
            self.kind.to_string().red().bold(),
            self.message.white().bold(),
            location.dimmed()
        ));

        if let Some(ref help) = self.help {
            output.push_str(&format!("\n  {}: {}", "help".cyan().bold(), help));
        }

        output
    }
}

impl fmt::Display for XnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl std::error::Error for XnError {}

/// Result type for xn operations
pub type XnResult<T> = Result<T, XnError>;

// Convenience constructors for common errors
impl XnError {
    pub fn syntax_error(message: impl Into<String>, span: Span, file: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, message, span, file)
    }

    pub fn compile_error(message: impl Into<String>, span: Span, file: impl Into<String>) -> Self {
        Self::new(ErrorKind::CompileError, message, span, file)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message, Span::default(), "")
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message, Span::default(), "")
    }

    pub fn name_error(message: impl Into<String>, span: Span, file: impl Into<String>) -> Self {
        Self::new(ErrorKind::NameError, message, span, file)
    }

    pub fn import_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ImportError, message, Span::default(), "")
    }
}
