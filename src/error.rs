use std::error;
use std::fmt;

/// A syntax problem found while parsing a pattern.
///
/// Diagnostics never abort compilation: the parser recovers with a
/// best-effort structure and the pattern still compiles to some automaton.
/// [`Pattern::compile`](crate::Pattern::compile) surfaces them;
/// [`Pattern::new`](crate::Pattern::new) logs and discards them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    kind: DiagnosticKind,
    offset: usize,
}

/// The kind of syntax problem that was found.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DiagnosticKind {
    /// A group was opened with `(` but never closed.
    UnclosedGroup,
    /// A bracket expression was opened with `[` but never closed.
    UnclosedClass,
    /// A repetition bound was opened with `{` but never closed.
    UnclosedBound,
    /// A `{` was not followed by a decimal digit.
    MalformedBound,
    /// A `-` appeared in a bracket expression where no range can start.
    MisplacedDash,
    /// An anchor appeared more than once, or somewhere other than the
    /// start/end of the whole pattern.
    DuplicateAnchor,
    /// A named reference was used before any group of that name was defined.
    UnresolvedReference(String),
}

impl Diagnostic {
    pub(crate) fn new(kind: DiagnosticKind, offset: usize) -> Diagnostic {
        Diagnostic { kind, offset }
    }

    /// Return the kind of this diagnostic.
    pub fn kind(&self) -> &DiagnosticKind {
        &self.kind
    }

    /// Return the byte offset in the pattern at which the problem was found.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl error::Error for Diagnostic {}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            DiagnosticKind::UnclosedGroup => {
                write!(f, "missing ')' for group at offset {}", self.offset)
            }
            DiagnosticKind::UnclosedClass => {
                write!(f, "missing ']' for class at offset {}", self.offset)
            }
            DiagnosticKind::UnclosedBound => {
                write!(f, "missing '}}' for bound at offset {}", self.offset)
            }
            DiagnosticKind::MalformedBound => {
                write!(f, "malformed bound at offset {}", self.offset)
            }
            DiagnosticKind::MisplacedDash => {
                write!(f, "'-' is not part of a range at offset {}", self.offset)
            }
            DiagnosticKind::DuplicateAnchor => {
                write!(f, "duplicate anchor at offset {}", self.offset)
            }
            DiagnosticKind::UnresolvedReference(ref name) => {
                write!(
                    f,
                    "reference to undefined group '{}' at offset {}",
                    name, self.offset
                )
            }
        }
    }
}
