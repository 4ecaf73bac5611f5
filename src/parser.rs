use std::collections::HashMap;
use std::rc::Rc;

use crate::classes::{self, ByteSet};
use crate::error::{Diagnostic, DiagnosticKind};

/// An abstract syntax tree for one pattern.
///
/// Children are reference counted so that a named group and every later
/// reference to it can share the same subtree. Sharing is structural only:
/// both occurrences compile to the same grammar, not to a backreference.
#[derive(Clone, Debug)]
pub enum Ast {
    /// Matches the empty string. Degenerate bounds, empty groups and
    /// unresolved references all recover to this.
    Empty,
    /// Matches a single byte.
    Leaf(u8),
    /// Matches any byte in the set.
    Class(ByteSet),
    /// Matches any byte except `classes::DOT_EXCLUDED`.
    Dot,
    Concat(Rc<Ast>, Rc<Ast>),
    Alternate(Rc<Ast>, Rc<Ast>),
    /// Zero or more repetitions.
    Closure(Rc<Ast>),
    Repeat(Rc<Ast>, Repetition),
}

/// A counted repetition, from `{n}`, `{n,}`, `{n,m}`, `+` or `?`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Repetition {
    Exactly(u32),
    AtLeast(u32),
    Bounded(u32, u32),
}

/// The outcome of parsing a pattern.
///
/// Parsing never fails. Syntax problems are collected as diagnostics and the
/// AST is a best-effort structure; `ast` is `None` only for the empty
/// pattern (or a pattern that reduces to it), which matches exactly the
/// empty string.
#[derive(Debug)]
pub struct Parsed {
    pub ast: Option<Rc<Ast>>,
    pub begin: bool,
    pub end: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// A recursive descent parser for the pattern language.
///
/// The parser owns its cursor, anchor flags and named-reference table; one
/// parser instance handles exactly one pattern.
#[derive(Debug)]
pub struct Parser<'p> {
    pattern: &'p [u8],
    pos: usize,
    begin: bool,
    end: bool,
    refs: HashMap<String, Rc<Ast>>,
    diagnostics: Vec<Diagnostic>,
}

/// What an escape sequence resolved to.
enum Escape {
    Byte(u8),
    Class(ByteSet),
}

impl<'p> Parser<'p> {
    pub fn new(pattern: &'p str) -> Parser<'p> {
        Parser {
            pattern: pattern.as_bytes(),
            pos: 0,
            begin: false,
            end: false,
            refs: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Parsed {
        let ast = self.expr();
        Parsed {
            ast,
            begin: self.begin,
            end: self.end,
            diagnostics: self.diagnostics,
        }
    }

    /// Parse one alternation expression. Stops at `)`, at a terminating `$`
    /// or at the end of the pattern.
    fn expr(&mut self) -> Option<Rc<Ast>> {
        if self.peek() == Some(b'^') {
            // An anchor only at the very start of the whole pattern. At the
            // head of a later branch it is reported and dropped; anywhere
            // else it is an ordinary literal.
            if self.pos == 0 {
                self.begin = true;
            } else {
                self.diagnostic(DiagnosticKind::DuplicateAnchor);
            }
            self.bump();
        }
        if self.peek() == Some(b'$') && self.pos + 1 == self.pattern.len() {
            self.bump();
            self.set_end_anchor();
            return None;
        }

        let mut node = match self.peek() {
            Some(b'(') => {
                let open = self.pos;
                self.bump();
                self.group(open)
            }
            Some(b'[') => {
                let open = self.pos;
                self.bump();
                Rc::new(Ast::Class(self.class(open)))
            }
            Some(b'.') => {
                self.bump();
                Rc::new(Ast::Dot)
            }
            Some(b'\\') => self.escape_atom()?,
            Some(c) if c != b'|' && c != b')' => {
                self.bump();
                Rc::new(Ast::Leaf(c))
            }
            _ => return None,
        };

        // The term loop. `node` accumulates finished atoms while `right`
        // holds the most recent one, so that a postfix quantifier can still
        // reach it.
        let mut right: Option<Rc<Ast>> = None;
        loop {
            let c = match self.peek() {
                None => break,
                Some(c) => c,
            };
            if c == b'|' || c == b')' || c == b'$' {
                break;
            }
            match c {
                b'(' => {
                    let open = self.pos;
                    self.bump();
                    if let Some(r) = right.take() {
                        node = Rc::new(Ast::Concat(node, r));
                    }
                    right = Some(self.group(open));
                }
                b'[' => {
                    let open = self.pos;
                    self.bump();
                    if let Some(r) = right.take() {
                        node = Rc::new(Ast::Concat(node, r));
                    }
                    right = Some(Rc::new(Ast::Class(self.class(open))));
                }
                b'{' => {
                    let open = self.pos;
                    self.bump();
                    if let Some(rep) = self.bound(open) {
                        match right.take() {
                            Some(r) => {
                                right = Some(Rc::new(Ast::Repeat(r, rep)));
                            }
                            None => {
                                node = Rc::new(Ast::Repeat(node, rep));
                            }
                        }
                    }
                }
                b'*' => {
                    self.bump();
                    match right.take() {
                        Some(r) => right = Some(Rc::new(Ast::Closure(r))),
                        None => node = Rc::new(Ast::Closure(node)),
                    }
                }
                b'+' => {
                    self.bump();
                    let rep = Repetition::AtLeast(1);
                    match right.take() {
                        Some(r) => right = Some(Rc::new(Ast::Repeat(r, rep))),
                        None => node = Rc::new(Ast::Repeat(node, rep)),
                    }
                }
                b'?' => {
                    self.bump();
                    let rep = Repetition::Bounded(0, 1);
                    match right.take() {
                        Some(r) => right = Some(Rc::new(Ast::Repeat(r, rep))),
                        None => node = Rc::new(Ast::Repeat(node, rep)),
                    }
                }
                b'.' => {
                    self.bump();
                    if let Some(r) = right.take() {
                        node = Rc::new(Ast::Concat(node, r));
                    }
                    right = Some(Rc::new(Ast::Dot));
                }
                b'\\' => {
                    if let Some(r) = right.take() {
                        node = Rc::new(Ast::Concat(node, r));
                    }
                    right = self.escape_atom();
                }
                _ => {
                    self.bump();
                    if let Some(r) = right.take() {
                        node = Rc::new(Ast::Concat(node, r));
                    }
                    right = Some(Rc::new(Ast::Leaf(c)));
                }
            }
        }

        if self.peek() == Some(b'|') {
            self.bump();
            if let Some(r) = right.take() {
                node = Rc::new(Ast::Concat(node, r));
            }
            let rhs = self.expr().unwrap_or_else(|| Rc::new(Ast::Empty));
            node = Rc::new(Ast::Alternate(node, rhs));
        } else if let Some(r) = right.take() {
            node = Rc::new(Ast::Concat(node, r));
        }
        if self.peek() == Some(b'$') {
            self.bump();
            self.set_end_anchor();
        }
        Some(node)
    }

    /// Parse a group body. The cursor sits just past the `(`; this consumes
    /// the closing `)` as well (or reports it missing).
    ///
    /// `(?...)` is the named form: `(?:<name>body)` binds `name` to the
    /// parsed body, while a bare `(?:<name>)` reuses the grammar previously
    /// bound to `name`. The `:` and angle brackets are each optional.
    fn group(&mut self, open: usize) -> Rc<Ast> {
        let node = if self.peek() == Some(b'?') {
            self.bump();
            if self.peek() == Some(b':') {
                self.bump();
            }
            if self.peek() == Some(b'<') {
                self.bump();
            }
            let name_at = self.pos;
            let mut name = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == b'_' {
                    name.push(char::from(c));
                    self.bump();
                } else {
                    break;
                }
            }
            if self.peek() == Some(b'>') {
                self.bump();
            }
            if self.peek() == Some(b')') {
                match self.refs.get(&name) {
                    Some(ast) => Rc::clone(ast),
                    None => {
                        self.diagnostic_at(
                            DiagnosticKind::UnresolvedReference(name),
                            name_at,
                        );
                        Rc::new(Ast::Empty)
                    }
                }
            } else {
                let body =
                    self.expr().unwrap_or_else(|| Rc::new(Ast::Empty));
                self.refs.insert(name, Rc::clone(&body));
                body
            }
        } else {
            self.expr().unwrap_or_else(|| Rc::new(Ast::Empty))
        };
        if self.peek() == Some(b')') {
            self.bump();
        } else {
            self.diagnostic_at(DiagnosticKind::UnclosedGroup, open);
        }
        node
    }

    /// Parse a bracket expression. The cursor sits just past the `[`; this
    /// consumes the closing `]` as well (or reports it missing).
    fn class(&mut self, open: usize) -> ByteSet {
        let mut set = ByteSet::empty();
        let mut left: Option<u8> = None;
        let mut range = false;
        let mut exclude = false;

        if self.peek() == Some(b'^') {
            self.bump();
            exclude = true;
        }
        if self.peek() == Some(b']') {
            // The empty class matches nothing, negated or not.
            self.bump();
            return set;
        }

        loop {
            let c = match self.peek() {
                None => {
                    self.diagnostic_at(DiagnosticKind::UnclosedClass, open);
                    break;
                }
                Some(b']') => {
                    self.bump();
                    break;
                }
                Some(c) => c,
            };
            if c == b'-' {
                if !range && left.is_some() {
                    range = true;
                } else {
                    self.diagnostic(DiagnosticKind::MisplacedDash);
                }
                self.bump();
            } else if range {
                if c == b'\\' {
                    self.bump();
                    match self.escape() {
                        Some(Escape::Byte(b)) => {
                            if let Some(l) = left {
                                if l <= b {
                                    set.add_all(l, b);
                                }
                            }
                        }
                        // A class escape cannot end a range; the pending
                        // left endpoint is dropped.
                        Some(Escape::Class(cls)) => set.union(cls),
                        None => {}
                    }
                } else {
                    self.bump();
                    if let Some(l) = left {
                        if l <= c {
                            set.add_all(l, c);
                        }
                    }
                }
                left = None;
                range = false;
            } else {
                if let Some(l) = left {
                    set.add(l);
                }
                if c == b'\\' {
                    self.bump();
                    match self.escape() {
                        Some(Escape::Byte(b)) => left = Some(b),
                        Some(Escape::Class(cls)) => {
                            set.union(cls);
                            left = None;
                        }
                        None => left = None,
                    }
                } else {
                    self.bump();
                    left = Some(c);
                }
            }
        }

        if let Some(l) = left {
            set.add(l);
        }
        if exclude {
            set.negate();
        }
        set
    }

    /// Parse the bounds of a `{...}` repetition. The cursor sits just past
    /// the `{`. Bounds are a single decimal digit each.
    fn bound(&mut self, open: usize) -> Option<Repetition> {
        let n = match self.peek() {
            Some(c) if c.is_ascii_digit() => {
                self.bump();
                u32::from(c - b'0')
            }
            _ => {
                self.diagnostic_at(DiagnosticKind::MalformedBound, open);
                return None;
            }
        };
        let rep = if self.peek() == Some(b',') {
            self.bump();
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {
                    self.bump();
                    Repetition::Bounded(n, u32::from(c - b'0'))
                }
                _ => Repetition::AtLeast(n),
            }
        } else {
            Repetition::Exactly(n)
        };
        if self.peek() == Some(b'}') {
            self.bump();
        } else {
            self.diagnostic_at(DiagnosticKind::UnclosedBound, open);
        }
        Some(rep)
    }

    /// Parse an escape sequence as a single atom.
    fn escape_atom(&mut self) -> Option<Rc<Ast>> {
        self.bump();
        match self.escape()? {
            Escape::Byte(b) => Some(Rc::new(Ast::Leaf(b))),
            Escape::Class(set) => Some(Rc::new(Ast::Class(set))),
        }
    }

    /// Resolve the escape sequence whose backslash has just been consumed.
    ///
    /// Returns `None` only for a lone trailing backslash. An escaped byte
    /// that names neither a control escape nor a predefined class resolves
    /// to that byte itself.
    fn escape(&mut self) -> Option<Escape> {
        let c = self.peek()?;
        self.bump();
        if let Some(set) = classes::escape_class(c) {
            return Some(Escape::Class(set));
        }
        let byte = match c {
            b'0' => b'\0',
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0B,
            b'f' => 0x0C,
            b'r' => b'\r',
            b'e' => 0x1B,
            b'c' => match self.peek() {
                Some(x) if x.is_ascii_alphabetic() || (x > 63 && x < 94) => {
                    self.bump();
                    x.to_ascii_uppercase().wrapping_sub(64)
                }
                _ => b'c',
            },
            _ => c,
        };
        Some(Escape::Byte(byte))
    }

    fn set_end_anchor(&mut self) {
        if self.end {
            self.diagnostic_at(DiagnosticKind::DuplicateAnchor, self.pos - 1);
        }
        self.end = true;
    }

    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn diagnostic(&mut self, kind: DiagnosticKind) {
        let offset = self.pos;
        self.diagnostic_at(kind, offset);
    }

    fn diagnostic_at(&mut self, kind: DiagnosticKind, offset: usize) {
        self.diagnostics.push(Diagnostic::new(kind, offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pattern: &str) -> Parsed {
        Parser::new(pattern).parse()
    }

    #[test]
    fn empty_pattern() {
        let p = parse("");
        assert!(p.ast.is_none());
        assert!(!p.begin && !p.end);
        assert!(p.diagnostics.is_empty());
    }

    #[test]
    fn anchors() {
        let p = parse("^ab$");
        assert!(p.begin && p.end);
        assert!(p.ast.is_some());
        assert!(p.diagnostics.is_empty());

        let p = parse("^$");
        assert!(p.begin && p.end);
        assert!(p.ast.is_none());
    }

    #[test]
    fn duplicate_anchor_is_reported_but_parsing_continues() {
        let p = parse("^a|^b");
        assert!(p.begin);
        assert!(p.ast.is_some());
        assert_eq!(p.diagnostics.len(), 1);
        assert_eq!(
            *p.diagnostics[0].kind(),
            DiagnosticKind::DuplicateAnchor
        );
    }

    #[test]
    fn quantifier_binds_to_last_atom() {
        // ab* is a(b*), not (ab)*.
        let p = parse("ab*");
        match p.ast.as_deref() {
            Some(Ast::Concat(l, r)) => {
                assert!(matches!(**l, Ast::Leaf(b'a')));
                assert!(matches!(**r, Ast::Closure(_)));
            }
            other => panic!("unexpected ast: {:?}", other),
        }
    }

    #[test]
    fn named_reference_shares_the_subtree() {
        let p = parse("(?:<digit>[0-9])x(?:<digit>)");
        // Concat(Concat(digit, x), digit) with both digit nodes being the
        // same allocation.
        match p.ast.as_deref() {
            Some(Ast::Concat(lx, d2)) => match &**lx {
                Ast::Concat(d1, _) => assert!(Rc::ptr_eq(d1, d2)),
                other => panic!("unexpected ast: {:?}", other),
            },
            other => panic!("unexpected ast: {:?}", other),
        }
        assert!(p.diagnostics.is_empty());
    }

    #[test]
    fn forward_reference_is_unresolved() {
        let p = parse("(?:<sec>)(?:<sec>a)");
        assert_eq!(p.diagnostics.len(), 1);
        match p.diagnostics[0].kind() {
            DiagnosticKind::UnresolvedReference(name) => {
                assert_eq!(name, "sec");
            }
            other => panic!("unexpected diagnostic: {:?}", other),
        }
    }

    #[test]
    fn unclosed_delimiters() {
        let p = parse("(ab");
        assert_eq!(p.diagnostics.len(), 1);
        assert_eq!(*p.diagnostics[0].kind(), DiagnosticKind::UnclosedGroup);
        assert_eq!(p.diagnostics[0].offset(), 0);

        let p = parse("x[ab");
        assert_eq!(p.diagnostics.len(), 1);
        assert_eq!(*p.diagnostics[0].kind(), DiagnosticKind::UnclosedClass);
        assert_eq!(p.diagnostics[0].offset(), 1);

        let p = parse("a{2,3");
        assert_eq!(p.diagnostics.len(), 1);
        assert_eq!(*p.diagnostics[0].kind(), DiagnosticKind::UnclosedBound);
    }

    #[test]
    fn malformed_bound_is_reported() {
        let p = parse("a{x}");
        assert!(p.ast.is_some());
        assert_eq!(*p.diagnostics[0].kind(), DiagnosticKind::MalformedBound);
    }

    #[test]
    fn misplaced_dash_is_reported() {
        let p = parse("[-a]");
        assert!(p.ast.is_some());
        assert_eq!(*p.diagnostics[0].kind(), DiagnosticKind::MisplacedDash);
    }

    #[test]
    fn single_digit_bounds() {
        let p = parse("a{2,5}");
        match p.ast.as_deref() {
            Some(Ast::Repeat(_, rep)) => {
                assert_eq!(*rep, Repetition::Bounded(2, 5));
            }
            other => panic!("unexpected ast: {:?}", other),
        }
    }

    #[test]
    fn class_with_ranges_and_escapes() {
        let p = parse(r"[a-c\d]");
        match p.ast.as_deref() {
            Some(Ast::Class(set)) => {
                for &b in b"abc0189" {
                    assert!(set.contains(b), "missing {}", b);
                }
                assert!(!set.contains(b'd'));
            }
            other => panic!("unexpected ast: {:?}", other),
        }
    }

    #[test]
    fn negated_class() {
        let p = parse("[^abc]");
        match p.ast.as_deref() {
            Some(Ast::Class(set)) => {
                assert!(!set.contains(b'a'));
                assert!(set.contains(b'd'));
                assert!(set.contains(b'\n'));
            }
            other => panic!("unexpected ast: {:?}", other),
        }
    }

    #[test]
    fn unknown_escape_is_the_literal_byte() {
        let p = parse(r"\q");
        assert!(matches!(p.ast.as_deref(), Some(Ast::Leaf(b'q'))));
    }

    #[test]
    fn control_escape() {
        let p = parse(r"\cJ");
        assert!(matches!(p.ast.as_deref(), Some(Ast::Leaf(10))));
    }
}
