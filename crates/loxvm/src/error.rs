//! Error surface: a lightweight kind plus a human-readable message.
//! Embedders can match on the kind without string-sniffing while still
//! getting a `Display`/`std::error::Error` impl for `?`-propagation.

use std::fmt;

/// One accumulated problem found while compiling a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub line: u32,
    /// The lexeme the error was reported at, if any (`None` means "at end").
    pub lexeme: Option<String>,
    pub message: String,
}

impl CompileError {
    pub fn new(line: u32, lexeme: Option<String>, message: impl Into<String>) -> Self {
        Self { line, lexeme, message: message.into() }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lexeme {
            Some(lexeme) => write!(f, "[line {}] Error at '{}': {}", self.line, lexeme, self.message),
            None => write!(f, "[line {}] Error at end: {}", self.line, self.message),
        }
    }
}

impl std::error::Error for CompileError {}

/// A runtime fault, carrying the rendered message and the call-stack trace
/// that was printed alongside it at the point of failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    /// One line per call frame, innermost first, e.g. `[line 4] in fn()`.
    pub trace: Vec<String>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, trace: Vec<String>) -> Self {
        Self { message: message.into(), trace }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        for line in &self.trace {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Outcome of [`crate::Vm::interpret`] / the free [`crate::run`] function.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpretError {
    Compile(Vec<CompileError>),
    Runtime(RuntimeError),
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpretError::Compile(errs) => {
                for (i, e) in errs.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
            InterpretError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InterpretError {}

pub type InterpretResult = Result<(), InterpretError>;
