use std::fmt;

/// Why a program could not be turned into a compiled function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    Lex {
        line: usize,
        column: usize,
        message: String,
    },
    Parse {
        line: usize,
        column: usize,
        message: String,
    },
    UnknownIdentifier(String),
    UnknownLibrary(String),
    InvalidLibraryName(String),
    InvalidLocal(String),
    DuplicateLocal(String),
    NotAssignable(String),
    NotCallable(String),
    NotConstructible(String),
    NotAValue(String),
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::Lex {
                line,
                column,
                message,
            } => write!(f, "lexer error at {line}:{column}: {message}"),
            SynthesisError::Parse {
                line,
                column,
                message,
            } => write!(f, "parser error at {line}:{column}: {message}"),
            SynthesisError::UnknownIdentifier(name) => write!(f, "unknown identifier '{name}'"),
            SynthesisError::UnknownLibrary(name) => {
                write!(f, "library does not provide '{name}'")
            }
            SynthesisError::InvalidLibraryName(name) => {
                write!(f, "library entry '{name}' is not a bindable identifier")
            }
            SynthesisError::InvalidLocal(name) => {
                write!(f, "local '{name}' is not a valid or free identifier")
            }
            SynthesisError::DuplicateLocal(name) => write!(f, "local '{name}' declared twice"),
            SynthesisError::NotAssignable(what) => write!(f, "cannot assign to {what}"),
            SynthesisError::NotCallable(what) => write!(f, "{what} is not callable"),
            SynthesisError::NotConstructible(what) => {
                write!(f, "{what} cannot be used with 'new'")
            }
            SynthesisError::NotAValue(what) => write!(f, "{what} cannot be used as a value"),
        }
    }
}

impl std::error::Error for SynthesisError {}

/// A failed `compile`, chaining the underlying [`SynthesisError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    program: String,
    source: SynthesisError,
}

impl CompileError {
    pub fn new(program: impl Into<String>, source: SynthesisError) -> Self {
        Self {
            program: program.into(),
            source,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn cause(&self) -> &SynthesisError {
        &self.source
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to compile '{}'", self.program)
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Failures raised while a compiled function runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    Type {
        expected: &'static str,
        found: &'static str,
    },
    OperandIndex {
        index: i64,
        len: usize,
    },
    UnknownPath(String),
    InvalidKey(&'static str),
    DivisionByZero,
    Argument {
        function: String,
        message: String,
    },
    Host(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Type { expected, found } => {
                write!(f, "type error: expected {expected}, found {found}")
            }
            ExecError::OperandIndex { index, len } => {
                write!(f, "operand index {index} out of range for {len} operand(s)")
            }
            ExecError::UnknownPath(path) => write!(f, "context has no entry at '{path}'"),
            ExecError::InvalidKey(found) => write!(f, "{found} cannot be used as a property key"),
            ExecError::DivisionByZero => write!(f, "division by zero"),
            ExecError::Argument { function, message } => {
                write!(f, "bad argument to '{function}': {message}")
            }
            ExecError::Host(msg) => write!(f, "host error: {msg}"),
        }
    }
}

impl std::error::Error for ExecError {}
