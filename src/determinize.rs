use std::collections::HashMap;

use crate::classes::ALPHABET_LEN;
use crate::dfa::{self, DFA};
use crate::nfa::{self, State, NFA};

/// Converts an NFA into an equivalent DFA by subset construction.
///
/// Each DFA state stands for the set of NFA states the automaton could be
/// in. Sets are canonicalized by sorting, and set equality (not identity)
/// decides whether a subset has been seen before. A DFA state is accepting
/// if and only if its set contains the NFA's end state.
#[derive(Debug)]
pub struct Determinizer<'a> {
    /// The NFA being converted.
    nfa: &'a NFA,
    /// The DFA under construction.
    dfa: DFA,
    /// The NFA state set backing each DFA state, by DFA state id.
    sets: Vec<Vec<nfa::StateID>>,
    /// Maps a canonical NFA state set to its DFA state.
    cache: HashMap<Vec<nfa::StateID>, dfa::StateID>,
    /// Scratch stack for the epsilon closure walk.
    stack: Vec<nfa::StateID>,
    /// Scratch set for the epsilon closure walk.
    seen: SparseSet,
}

impl<'a> Determinizer<'a> {
    pub fn new(nfa: &'a NFA) -> Determinizer<'a> {
        let seen = SparseSet::new(nfa.len());
        Determinizer {
            nfa,
            dfa: DFA::empty(),
            sets: Vec::new(),
            cache: HashMap::new(),
            stack: Vec::new(),
            seen,
        }
    }

    pub fn build(mut self) -> DFA {
        let q0 = self.epsilon_closure(&[self.nfa.start()]);
        let start = self.add_state(q0);
        let mut worklist = vec![start];

        while let Some(id) = worklist.pop() {
            for b in 0..ALPHABET_LEN as u8 {
                let next = self.next(id, b);
                if next.is_empty() {
                    continue;
                }
                let next_id = match self.cache.get(&next) {
                    Some(&cached) => cached,
                    None => {
                        let new_id = self.add_state(next);
                        worklist.push(new_id);
                        new_id
                    }
                };
                self.dfa.set_transition(id, b, next_id);
            }
        }

        trace!(
            "subset construction: {} NFA states -> {} DFA states",
            self.nfa.len(),
            self.dfa.len()
        );
        self.dfa
    }

    /// The canonical set reachable from the given DFA state on `byte`:
    /// delta over the class states, then the epsilon closure of the result.
    fn next(&mut self, from: dfa::StateID, byte: u8) -> Vec<nfa::StateID> {
        let mut step = Vec::new();
        for &id in &self.sets[from] {
            if let State::Class { ref set, next } = *self.nfa.state(id) {
                if set.contains(byte) {
                    step.push(next);
                }
            }
        }
        if step.is_empty() {
            return step;
        }
        self.epsilon_closure(&step)
    }

    /// Expand a set of NFA states across every epsilon edge until a
    /// fixpoint. The walk is iterative; the sparse set remembers visited
    /// states so closure cycles terminate.
    fn epsilon_closure(&mut self, seeds: &[nfa::StateID]) -> Vec<nfa::StateID> {
        self.seen.clear();
        self.stack.extend_from_slice(seeds);
        while let Some(id) = self.stack.pop() {
            if self.seen.contains(id) {
                continue;
            }
            self.seen.insert(id);
            if let State::Epsilon { next, next2 } = *self.nfa.state(id) {
                self.stack.push(next);
                if let Some(next2) = next2 {
                    self.stack.push(next2);
                }
            }
        }
        let mut closure = self.seen.elements().to_vec();
        closure.sort_unstable();
        closure
    }

    fn add_state(&mut self, set: Vec<nfa::StateID>) -> dfa::StateID {
        let is_match = set.binary_search(&self.nfa.end()).is_ok();
        let id = self.dfa.add_state(is_match);
        self.cache.insert(set.clone(), id);
        self.sets.push(set);
        id
    }
}

/// A sparse set over NFA state ids.
///
/// Constant time insertion, membership testing and clearing; iteration in
/// insertion order. Based on https://research.swtch.com/sparse, without the
/// uninitialized-memory trick.
#[derive(Debug)]
struct SparseSet {
    len: usize,
    dense: Vec<nfa::StateID>,
    sparse: Vec<usize>,
}

impl SparseSet {
    fn new(capacity: usize) -> SparseSet {
        SparseSet {
            len: 0,
            dense: vec![0; capacity],
            sparse: vec![0; capacity],
        }
    }

    fn insert(&mut self, id: nfa::StateID) {
        self.dense[self.len] = id;
        self.sparse[id] = self.len;
        self.len += 1;
    }

    fn contains(&self, id: nfa::StateID) -> bool {
        let i = self.sparse[id];
        i < self.len && self.dense[i] == id
    }

    fn clear(&mut self) {
        self.len = 0;
    }

    fn elements(&self) -> &[nfa::StateID] {
        &self.dense[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::NFA;
    use crate::parser::Parser;

    fn dfa(pattern: &str) -> DFA {
        let parsed = Parser::new(pattern).parse();
        let nfa = NFA::compile(&parsed.ast.expect("non-empty pattern"));
        Determinizer::new(&nfa).build()
    }

    fn accepts(dfa: &DFA, input: &str) -> bool {
        let mut state = dfa.start();
        for &b in input.as_bytes() {
            state = match dfa.next_state(state, b) {
                None => return false,
                Some(next) => next,
            };
        }
        dfa.is_match_state(state)
    }

    #[test]
    fn literal_concatenation() {
        let dfa = dfa("abc");
        assert!(accepts(&dfa, "abc"));
        assert!(!accepts(&dfa, "ab"));
        assert!(!accepts(&dfa, "abd"));
    }

    #[test]
    fn alternation_and_closure() {
        let dfa = dfa("a(b|c)*");
        assert!(accepts(&dfa, "a"));
        assert!(accepts(&dfa, "abcbcb"));
        assert!(!accepts(&dfa, "abd"));
    }

    #[test]
    fn equal_subsets_are_reused() {
        // In a*, every repetition after the first reaches the same NFA
        // state set, so the cache collapses them into one DFA state with
        // a self loop and the whole automaton has two states.
        let dfa = dfa("a*");
        let after_one = dfa.next_state(dfa.start(), b'a').expect("a");
        assert_eq!(dfa.next_state(after_one, b'a'), Some(after_one));
        assert_eq!(dfa.len(), 2);
    }

    #[test]
    fn no_transitions_outside_classes() {
        let dfa = dfa("[0-9]");
        assert_eq!(dfa.next_state(dfa.start(), b'a'), None);
        assert!(dfa.next_state(dfa.start(), b'7').is_some());
    }
}
