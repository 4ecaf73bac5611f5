use crate::classes::ALPHABET_LEN;
use crate::dfa::{StateID, DFA};

/// Shrinks a DFA by merging indistinguishable states.
///
/// This is a greedy partition refinement, not Hopcroft's algorithm. It
/// starts from the match/non-match partition and repeatedly splits a block
/// on the first byte that separates its members, until no block can be
/// split. Simpler and smaller than Hopcroft, at the cost of a worse worst
/// case; the automata this crate builds are small enough not to care.
#[derive(Debug)]
pub struct Minimizer<'a> {
    dfa: &'a DFA,
    /// The current partition of DFA states into blocks.
    blocks: Vec<Vec<StateID>>,
    /// Maps a state to the index of the block containing it.
    block_of: Vec<usize>,
}

impl<'a> Minimizer<'a> {
    pub fn new(dfa: &'a DFA) -> Minimizer<'a> {
        Minimizer { dfa, blocks: Vec::new(), block_of: vec![0; dfa.len()] }
    }

    pub fn build(mut self) -> DFA {
        self.initial_partition();
        while self.refine() {}
        let minimized = self.rebuild();
        debug!(
            "minimization: {} DFA states -> {} DFA states",
            self.dfa.len(),
            minimized.len()
        );
        minimized
    }

    /// Seed the partition with the match and non-match blocks. Either one
    /// may be empty, in which case it is dropped.
    fn initial_partition(&mut self) {
        let mut matches = Vec::new();
        let mut non_matches = Vec::new();
        for id in 0..self.dfa.len() {
            if self.dfa.is_match_state(id) {
                matches.push(id);
            } else {
                non_matches.push(id);
            }
        }
        for block in [matches, non_matches] {
            if !block.is_empty() {
                self.add_block(block);
            }
        }
    }

    /// One refinement pass over every block. Each block is split at most
    /// once per pass, on the first byte that distinguishes its members.
    /// Returns whether anything changed.
    fn refine(&mut self) -> bool {
        let mut changed = false;
        let mut i = 0;
        while i < self.blocks.len() {
            if let Some((s1, s2)) = self.split(&self.blocks[i]) {
                self.blocks[i] = s1;
                for &id in &self.blocks[i] {
                    self.block_of[id] = i;
                }
                self.add_block(s2);
                changed = true;
            }
            i += 1;
        }
        changed
    }

    /// Find the first byte, in ascending order, on which the block's
    /// members disagree. Members agree on a byte when they all transition
    /// into the same block; a member with no transition, or a transition
    /// into a different block, disagrees with the first member that has
    /// one.
    fn split(
        &self,
        block: &[StateID],
    ) -> Option<(Vec<StateID>, Vec<StateID>)> {
        if block.len() < 2 {
            return None;
        }
        for b in 0..ALPHABET_LEN as u8 {
            let target = match self.target_block(block, b) {
                None => continue,
                Some(target) => target,
            };
            let mut s1 = Vec::new();
            let mut s2 = Vec::new();
            for &id in block {
                match self.dfa.next_state(id, b) {
                    Some(next) if self.block_of[next] == target => {
                        s1.push(id)
                    }
                    _ => s2.push(id),
                }
            }
            if !s2.is_empty() {
                return Some((s1, s2));
            }
        }
        None
    }

    /// The block reached on `byte` by the first member of `block` that has
    /// a transition on it.
    fn target_block(&self, block: &[StateID], byte: u8) -> Option<usize> {
        for &id in block {
            if let Some(next) = self.dfa.next_state(id, byte) {
                return Some(self.block_of[next]);
            }
        }
        None
    }

    fn add_block(&mut self, block: Vec<StateID>) {
        let index = self.blocks.len();
        for &id in &block {
            self.block_of[id] = index;
        }
        self.blocks.push(block);
    }

    /// Collapse each block into a single state. Blocks are ordered by their
    /// smallest member so the output does not depend on refinement order.
    fn rebuild(&mut self) -> DFA {
        for block in &mut self.blocks {
            block.sort_unstable();
        }
        self.blocks.sort_unstable();
        for (index, block) in self.blocks.iter().enumerate() {
            for &id in block {
                self.block_of[id] = index;
            }
        }

        let mut dfa = DFA::empty();
        for block in &self.blocks {
            dfa.add_state(self.dfa.is_match_state(block[0]));
        }
        for (index, block) in self.blocks.iter().enumerate() {
            // At the fixpoint all members of a block agree on every byte,
            // so the first member's transitions stand for the whole block.
            for (byte, next) in self.dfa.transitions(block[0]) {
                dfa.set_transition(index, byte, self.block_of[next]);
            }
        }
        dfa.set_start(self.block_of[self.dfa.start()]);
        dfa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::determinize::Determinizer;
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
    fn merges_equivalent_branches() {
        // Both alternatives end in the same one-state tail, so the two
        // accepting states collapse into one.
        let big = dfa("ab|cb");
        let small = Minimizer::new(&big).build();
        assert!(small.len() < big.len());
        for input in &["ab", "cb", "a", "c", "bb", ""] {
            assert_eq!(accepts(&big, input), accepts(&small, input));
        }
    }

    #[test]
    fn preserves_the_language() {
        for pattern in &["a(b|c)*", "2{3,}", "[a-c]+[A-C]", "1[0-9]{2}"] {
            let big = dfa(pattern);
            let small = Minimizer::new(&big).build();
            for input in &[
                "", "a", "ab", "abcbc", "222", "22", "2222222", "abA",
                "cA", "100", "199", "19", "1999",
            ] {
                assert_eq!(
                    accepts(&big, input),
                    accepts(&small, input),
                    "pattern {} input {}",
                    pattern,
                    input
                );
            }
        }
    }

    #[test]
    fn already_minimal_stays_put() {
        let big = dfa("abc");
        let small = Minimizer::new(&big).build();
        assert_eq!(small.len(), big.len());
    }
}
