use crate::classes::{self, ByteSet};
use crate::parser::{Ast, Repetition};

pub type StateID = usize;

/// A nondeterministic finite automaton compiled from an AST by Thompson
/// construction.
///
/// States live in an arena and refer to each other by index, so the closure
/// back-edges that make the graph cyclic are ordinary indices. Once built,
/// the automaton is read only.
#[derive(Debug)]
pub struct NFA {
    states: Vec<State>,
    start: StateID,
    end: StateID,
}

/// A single NFA state.
#[derive(Clone, Debug)]
pub enum State {
    /// An unconditional transition to one or two successors.
    Epsilon { next: StateID, next2: Option<StateID> },
    /// A transition to `next` guarded by a byte set.
    Class { set: ByteSet, next: StateID },
    /// A state with no outgoing transitions. The automaton's end state is
    /// always `Empty`; so is every fragment exit until a parent patches it.
    Empty,
}

impl NFA {
    /// Compile the given AST into an NFA.
    pub fn compile(ast: &Ast) -> NFA {
        Compiler::new().compile(ast)
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn start(&self) -> StateID {
        self.start
    }

    pub fn end(&self) -> StateID {
        self.end
    }
}

/// A sub-automaton with exactly one entry and one exit state.
///
/// Every compiler case below both consumes and produces fragments of this
/// shape; composition relies on it.
#[derive(Clone, Copy, Debug)]
struct ThompsonRef {
    start: StateID,
    end: StateID,
}

#[derive(Debug)]
struct Compiler {
    states: Vec<State>,
}

impl Compiler {
    fn new() -> Compiler {
        Compiler { states: Vec::new() }
    }

    fn compile(mut self, ast: &Ast) -> NFA {
        let frag = self.c(ast);
        trace!("thompson construction: {} NFA states", self.states.len());
        NFA { states: self.states, start: frag.start, end: frag.end }
    }

    fn c(&mut self, ast: &Ast) -> ThompsonRef {
        match *ast {
            Ast::Empty => self.c_empty(),
            Ast::Leaf(byte) => self.c_class(ByteSet::singleton(byte)),
            Ast::Class(set) => self.c_class(set),
            Ast::Dot => self.c_class(classes::dot()),
            Ast::Concat(ref left, ref right) => {
                let l = self.c(left);
                let r = self.c(right);
                self.join(l, r)
            }
            Ast::Alternate(ref left, ref right) => {
                let l = self.c(left);
                let r = self.c(right);
                let end = self.add_empty();
                let start = self.add_epsilon(l.start, Some(r.start));
                self.patch(l.end, end, None);
                self.patch(r.end, end, None);
                ThompsonRef { start, end }
            }
            Ast::Closure(ref x) => self.c_closure(x),
            Ast::Repeat(ref x, Repetition::Exactly(n)) => {
                self.c_exactly(x, n)
            }
            Ast::Repeat(ref x, Repetition::AtLeast(n)) => {
                self.c_at_least(x, n)
            }
            Ast::Repeat(ref x, Repetition::Bounded(n, m)) => {
                self.c_bounded(x, n, m)
            }
        }
    }

    fn c_empty(&mut self) -> ThompsonRef {
        let end = self.add_empty();
        let start = self.add_epsilon(end, None);
        ThompsonRef { start, end }
    }

    fn c_class(&mut self, set: ByteSet) -> ThompsonRef {
        let end = self.add_empty();
        let start = self.add(State::Class { set, next: end });
        ThompsonRef { start, end }
    }

    fn c_closure(&mut self, x: &Ast) -> ThompsonRef {
        let inner = self.c(x);
        let end = self.add_empty();
        let start = self.add_epsilon(inner.start, Some(end));
        // The repeat edge: this is what makes the graph cyclic.
        self.patch(inner.end, inner.start, Some(end));
        ThompsonRef { start, end }
    }

    /// `{n}`: n chained copies. Shared subtrees are compiled once per copy,
    /// so each copy is a structurally identical, independent fragment.
    fn c_exactly(&mut self, x: &Ast, n: u32) -> ThompsonRef {
        if n == 0 {
            return self.c_empty();
        }
        let mut frag = self.c(x);
        for _ in 1..n {
            let next = self.c(x);
            frag = self.join(frag, next);
        }
        frag
    }

    /// `{n,}`: n chained copies followed by a closure of the same
    /// expression; `{0,}` is just the closure.
    fn c_at_least(&mut self, x: &Ast, n: u32) -> ThompsonRef {
        if n == 0 {
            return self.c_closure(x);
        }
        let mut frag = self.c(x);
        for _ in 1..n {
            let next = self.c(x);
            frag = self.join(frag, next);
        }
        let rest = self.c_closure(x);
        self.join(frag, rest)
    }

    /// `{n,m}` with `n < m`: a chain of m copies where the junction after
    /// copy i can bypass straight to the exit once i >= n, making every
    /// copy past the n-th optional. Degenerate bounds (`n >= m`) match the
    /// empty string; that fallback is deliberate.
    fn c_bounded(&mut self, x: &Ast, n: u32, m: u32) -> ThompsonRef {
        if n >= m {
            return self.c_empty();
        }
        let end = self.add_empty();
        let first = self.c(x);
        let bypass = if n == 0 { Some(end) } else { None };
        let start = self.add_epsilon(first.start, bypass);
        let mut pre = first;
        for i in 1..m {
            let now = self.c(x);
            let bypass = if i >= n { Some(end) } else { None };
            self.patch(pre.end, now.start, bypass);
            pre = now;
        }
        self.patch(pre.end, end, None);
        ThompsonRef { start, end }
    }

    /// Chain two fragments by turning the first one's exit into an epsilon
    /// transition to the second one's entry.
    fn join(&mut self, a: ThompsonRef, b: ThompsonRef) -> ThompsonRef {
        self.patch(a.end, b.start, None);
        ThompsonRef { start: a.start, end: b.end }
    }

    /// Turn a fragment's `Empty` exit state into an epsilon state in place.
    fn patch(&mut self, id: StateID, next: StateID, next2: Option<StateID>) {
        debug_assert!(matches!(self.states[id], State::Empty));
        self.states[id] = State::Epsilon { next, next2 };
    }

    fn add_epsilon(
        &mut self,
        next: StateID,
        next2: Option<StateID>,
    ) -> StateID {
        self.add(State::Epsilon { next, next2 })
    }

    fn add_empty(&mut self) -> StateID {
        self.add(State::Empty)
    }

    fn add(&mut self, state: State) -> StateID {
        let id = self.states.len();
        self.states.push(state);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn nfa(pattern: &str) -> NFA {
        let parsed = Parser::new(pattern).parse();
        NFA::compile(&parsed.ast.expect("non-empty pattern"))
    }

    #[test]
    fn end_state_is_terminal() {
        for pattern in &["a", "ab|c", "a*", "a{2,4}", "(?:<x>ab)(?:<x>)"] {
            let nfa = nfa(pattern);
            assert!(
                matches!(*nfa.state(nfa.end()), State::Empty),
                "pattern {}",
                pattern
            );
        }
    }

    #[test]
    fn closure_introduces_a_back_edge() {
        let nfa = nfa("a*");
        // The inner fragment's exit must loop back to its entry.
        let mut found = false;
        for id in 0..nfa.len() {
            if let State::Epsilon { next, .. } = *nfa.state(id) {
                if next < id {
                    found = true;
                }
            }
        }
        assert!(found);
    }

    #[test]
    fn shared_subtrees_compile_to_disjoint_fragments() {
        // Both uses of the named group compile separately, so the automaton
        // for "(?:<x>ab)(?:<x>)" is as large as the one for "abab".
        let shared = nfa("(?:<x>ab)(?:<x>)");
        let unrolled = nfa("abab");
        assert_eq!(shared.len(), unrolled.len());
    }

    #[test]
    fn degenerate_bounds_match_empty() {
        let parsed = Parser::new("a{3,2}").parse();
        let ast = parsed.ast.expect("ast");
        assert!(matches!(&*ast, Ast::Repeat(..)));
        let nfa = NFA::compile(&ast);
        // One epsilon state into one empty state: the empty-match fragment.
        assert_eq!(nfa.len(), 2);
    }
}
