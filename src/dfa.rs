use std::collections::BTreeMap;

pub type StateID = usize;

/// A deterministic finite automaton.
///
/// Transitions are sparse: a state stores only the bytes it can actually
/// consume, and the absence of a transition means the scan is stuck. There
/// is no dead-state sentinel. A DFA is immutable once its builder
/// (determinizer or minimizer) hands it out.
#[derive(Clone, Debug)]
pub struct DFA {
    states: Vec<State>,
    start: StateID,
}

#[derive(Clone, Debug)]
struct State {
    is_match: bool,
    trans: BTreeMap<u8, StateID>,
}

impl DFA {
    /// Create a DFA with no states. Builders start from this.
    pub fn empty() -> DFA {
        DFA { states: Vec::new(), start: 0 }
    }

    /// The automaton of the empty pattern: one accepting state with no
    /// outgoing transitions. It accepts exactly the empty string.
    pub fn empty_match() -> DFA {
        let mut dfa = DFA::empty();
        dfa.add_state(true);
        dfa
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn start(&self) -> StateID {
        self.start
    }

    pub fn is_match_state(&self, id: StateID) -> bool {
        self.states[id].is_match
    }

    /// Follow the transition out of `id` on `byte`, if there is one.
    pub fn next_state(&self, id: StateID, byte: u8) -> Option<StateID> {
        self.states[id].trans.get(&byte).copied()
    }

    /// Iterate over the transitions of one state in ascending byte order.
    pub fn transitions(
        &self,
        id: StateID,
    ) -> impl Iterator<Item = (u8, StateID)> + '_ {
        self.states[id].trans.iter().map(|(&b, &next)| (b, next))
    }

    pub(crate) fn add_state(&mut self, is_match: bool) -> StateID {
        let id = self.states.len();
        self.states.push(State { is_match, trans: BTreeMap::new() });
        id
    }

    pub(crate) fn set_transition(
        &mut self,
        from: StateID,
        byte: u8,
        to: StateID,
    ) {
        self.states[from].trans.insert(byte, to);
    }

    pub(crate) fn set_start(&mut self, id: StateID) {
        self.start = id;
    }
}
