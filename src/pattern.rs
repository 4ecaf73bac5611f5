use std::collections::VecDeque;
use std::sync::Arc;

use crate::determinize::Determinizer;
use crate::dfa::{StateID, DFA};
use crate::error::Diagnostic;
use crate::minimize::Minimizer;
use crate::nfa::NFA;
use crate::parser::Parser;

/// A compiled pattern, ready for matching.
///
/// A `Pattern` owns an immutable DFA and its failure-link table. It is
/// cheap to clone and safe to share: every matching operation takes `&self`
/// and allocates its own scratch space, so a single `Pattern` may be used
/// from many threads at once.
///
/// Construction never fails. Syntax problems in the pattern string are
/// reported as [`Diagnostic`]s by [`Pattern::compile`] while the pattern
/// still compiles to a best-effort automaton; [`Pattern::new`] logs the
/// diagnostics and discards them.
///
/// # Example
///
/// ```
/// use cre::Pattern;
///
/// let pat = Pattern::new("a(b|c)*");
/// assert_eq!(pat.match_("abbbbbc"), "abbbbbc");
/// assert_eq!(pat.match_("a"), "a");
/// assert_eq!(pat.match_("xa"), "");
/// ```
#[derive(Clone, Debug)]
pub struct Pattern(Arc<Inner>);

#[derive(Debug)]
struct Inner {
    dfa: DFA,
    fail: Vec<Link>,
    prefilter: Option<Prefilter>,
    begin: bool,
    end: bool,
}

/// A failure transition out of one state: where to resume the scan when
/// no byte transition exists, and how many of the bytes consumed so far
/// remain valid in the resumed state.
#[derive(Clone, Copy, Debug)]
struct Link {
    state: StateID,
    len: usize,
}

/// A builder for configuring pattern compilation.
///
/// # Example
///
/// This skips the minimization pass, trading automaton size for faster
/// compilation:
///
/// ```
/// use cre::PatternBuilder;
///
/// let (pat, diagnostics) = PatternBuilder::new()
///     .minimize(false)
///     .build("1[0-9]{2}");
/// assert!(diagnostics.is_empty());
/// assert_eq!(pat.search("a192b"), "192");
/// ```
#[derive(Clone, Debug)]
pub struct PatternBuilder {
    minimize: bool,
}

impl PatternBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> PatternBuilder {
        PatternBuilder { minimize: true }
    }

    /// Whether to minimize the DFA after subset construction. Enabled by
    /// default.
    pub fn minimize(mut self, yes: bool) -> PatternBuilder {
        self.minimize = yes;
        self
    }

    /// Compile `pattern`, returning the compiled pattern along with every
    /// diagnostic the parser reported. Compilation never aborts: a pattern
    /// with syntax problems still yields a usable (if degenerate) matcher.
    pub fn build(&self, pattern: &str) -> (Pattern, Vec<Diagnostic>) {
        let parsed = Parser::new(pattern).parse();
        for d in &parsed.diagnostics {
            debug!("pattern {:?}: {}", pattern, d);
        }
        let dfa = match parsed.ast {
            None => DFA::empty_match(),
            Some(ref ast) => {
                let nfa = NFA::compile(ast);
                let dfa = Determinizer::new(&nfa).build();
                if self.minimize {
                    Minimizer::new(&dfa).build()
                } else {
                    dfa
                }
            }
        };
        let fail = failure_links(&dfa);
        let prefilter =
            if parsed.begin { None } else { Prefilter::from_dfa(&dfa) };
        let inner = Inner {
            dfa,
            fail,
            prefilter,
            begin: parsed.begin,
            end: parsed.end,
        };
        (Pattern(Arc::new(inner)), parsed.diagnostics)
    }
}

impl Default for PatternBuilder {
    fn default() -> PatternBuilder {
        PatternBuilder::new()
    }
}

impl Pattern {
    /// Compile `pattern` with the default configuration, logging and
    /// discarding any diagnostics.
    pub fn new(pattern: &str) -> Pattern {
        PatternBuilder::new().build(pattern).0
    }

    /// Compile `pattern` with the default configuration and return the
    /// parser's diagnostics alongside the compiled pattern.
    pub fn compile(pattern: &str) -> (Pattern, Vec<Diagnostic>) {
        PatternBuilder::new().build(pattern)
    }

    /// Return the longest prefix of `text` accepted by this pattern, or
    /// the empty string if no prefix is accepted.
    ///
    /// The scan is greedy: reaching an accepting state commits the bytes
    /// consumed so far and the scan keeps going, so `233?` against `2333`
    /// yields `233`, not `23`. If the pattern is end-anchored, a byte with
    /// no transition fails the whole match.
    ///
    /// ```
    /// use cre::Pattern;
    ///
    /// let pat = Pattern::new("233?");
    /// assert_eq!(pat.match_("2333"), "233");
    /// assert_eq!(pat.match_("2233"), "");
    /// ```
    pub fn match_(&self, text: &str) -> String {
        let bytes = text.as_bytes();
        let dfa = &self.0.dfa;
        let mut state = dfa.start();
        let mut res = 0;
        for (i, &b) in bytes.iter().enumerate() {
            state = match dfa.next_state(state, b) {
                Some(next) => next,
                None => {
                    if self.0.end {
                        return String::new();
                    }
                    break;
                }
            };
            if dfa.is_match_state(state) {
                res = i + 1;
            }
        }
        String::from_utf8_lossy(&bytes[..res]).into_owned()
    }

    /// Return the leftmost substring of `text` matched by this pattern,
    /// extended greedily, or the empty string if there is none.
    ///
    /// The scan never rewinds: on a byte with no transition it follows the
    /// failure link to the longest state consistent with a suffix of the
    /// current candidate and retries, so every byte of `text` is examined
    /// a bounded number of times.
    ///
    /// ```
    /// use cre::Pattern;
    ///
    /// let pat = Pattern::new("[^abc]+");
    /// assert_eq!(pat.search("defghijk\n \taxixixi"), "defghijk\n \t");
    /// ```
    pub fn search(&self, text: &str) -> String {
        if self.0.begin {
            return self.match_(text);
        }
        let inner = &*self.0;
        let bytes = text.as_bytes();
        let start = inner.dfa.start();
        let mut state = start;
        let mut cand = 0;
        let mut res = 0;
        let mut i = 0;
        while i < bytes.len() {
            match inner.dfa.next_state(state, bytes[i]) {
                Some(next) => {
                    state = next;
                    cand += 1;
                    if inner.dfa.is_match_state(state) {
                        res = cand;
                    }
                    i += 1;
                }
                None => {
                    if res > 0 && !inner.end {
                        let at = i - cand;
                        let m = &bytes[at..at + res];
                        return String::from_utf8_lossy(m).into_owned();
                    }
                    res = 0;
                    if state == start {
                        i += 1;
                        cand = 0;
                        if let Some(ref pre) = inner.prefilter {
                            match pre.find(&bytes[i..]) {
                                Some(off) => i += off,
                                None => break,
                            }
                        }
                    } else {
                        let link = inner.fail[state];
                        cand = link.len;
                        state = link.state;
                    }
                }
            }
        }
        if res > 0 {
            let at = i - cand;
            String::from_utf8_lossy(&bytes[at..at + res]).into_owned()
        } else {
            String::new()
        }
    }

    /// Replace every match in `text` with `target` and return the result.
    ///
    /// Bytes that are not part of any match are copied through unchanged.
    /// A begin-anchored pattern replaces only the matched prefix, even
    /// when that prefix is empty.
    ///
    /// ```
    /// use cre::Pattern;
    ///
    /// let pat = Pattern::new("[0-9]+");
    /// assert_eq!(pat.replace("a12b345c", "N"), "aNbNc");
    /// ```
    pub fn replace(&self, text: &str, target: &str) -> String {
        if self.0.begin {
            let m = self.match_(text);
            let rest = &text.as_bytes()[m.len()..];
            let mut out = String::with_capacity(target.len() + rest.len());
            out.push_str(target);
            out.push_str(&String::from_utf8_lossy(rest));
            return out;
        }
        let inner = &*self.0;
        let bytes = text.as_bytes();
        let start = inner.dfa.start();
        let mut out = Vec::with_capacity(bytes.len());
        let mut state = start;
        let mut cand = 0;
        let mut res = 0;
        let mut i = 0;
        while i < bytes.len() {
            match inner.dfa.next_state(state, bytes[i]) {
                Some(next) => {
                    state = next;
                    cand += 1;
                    if inner.dfa.is_match_state(state) {
                        res = cand;
                    }
                    i += 1;
                }
                None => {
                    if res > 0 && !inner.end {
                        out.extend_from_slice(target.as_bytes());
                        // Bytes consumed past the committed match did not
                        // end up matching anything; copy them through.
                        out.extend_from_slice(&bytes[i - cand + res..i]);
                        state = start;
                        cand = 0;
                        res = 0;
                    } else {
                        res = 0;
                        if state == start {
                            out.extend_from_slice(&bytes[i - cand..=i]);
                            i += 1;
                            cand = 0;
                            if let Some(ref pre) = inner.prefilter {
                                match pre.find(&bytes[i..]) {
                                    Some(off) => {
                                        out.extend_from_slice(
                                            &bytes[i..i + off],
                                        );
                                        i += off;
                                    }
                                    None => {
                                        out.extend_from_slice(&bytes[i..]);
                                        i = bytes.len();
                                    }
                                }
                            }
                        } else {
                            let link = inner.fail[state];
                            // The failure jump invalidates the front of
                            // the candidate; those bytes are unmatched.
                            out.extend_from_slice(
                                &bytes[i - cand..i - link.len],
                            );
                            cand = link.len;
                            state = link.state;
                        }
                    }
                }
            }
        }
        if res > 0 {
            out.extend_from_slice(target.as_bytes());
            out.extend_from_slice(&bytes[i - cand + res..i]);
        } else {
            out.extend_from_slice(&bytes[i - cand..i]);
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Return every non-overlapping match in `text`, leftmost first.
    ///
    /// A begin-anchored pattern yields exactly one element, the result of
    /// [`Pattern::match_`]. An end-anchored pattern is all or nothing: if
    /// the scan stalls anywhere before the end of `text`, the result is
    /// empty.
    ///
    /// ```
    /// use cre::Pattern;
    ///
    /// let pat = Pattern::new("[0-9]+");
    /// assert_eq!(pat.matches("a12b345"), vec!["12", "345"]);
    /// ```
    pub fn matches(&self, text: &str) -> Vec<String> {
        if self.0.begin {
            return vec![self.match_(text)];
        }
        let inner = &*self.0;
        let bytes = text.as_bytes();
        let start = inner.dfa.start();
        let mut out = Vec::new();
        let mut state = start;
        let mut cand = 0;
        let mut res = 0;
        let mut i = 0;
        while i < bytes.len() {
            match inner.dfa.next_state(state, bytes[i]) {
                Some(next) => {
                    state = next;
                    cand += 1;
                    if inner.dfa.is_match_state(state) {
                        res = cand;
                    }
                    i += 1;
                }
                None => {
                    if inner.end {
                        return Vec::new();
                    }
                    if res > 0 {
                        let at = i - cand;
                        let m = &bytes[at..at + res];
                        out.push(String::from_utf8_lossy(m).into_owned());
                        state = start;
                        cand = 0;
                        res = 0;
                    } else if state == start {
                        i += 1;
                        cand = 0;
                        if let Some(ref pre) = inner.prefilter {
                            match pre.find(&bytes[i..]) {
                                Some(off) => i += off,
                                None => break,
                            }
                        }
                    } else {
                        let link = inner.fail[state];
                        cand = link.len;
                        state = link.state;
                    }
                }
            }
        }
        if res > 0 {
            let at = i - cand;
            out.push(String::from_utf8_lossy(&bytes[at..at + res]).into_owned());
        }
        out
    }
}

/// Compile `pattern` and return the longest accepted prefix of `text`.
///
/// Equivalent to `Pattern::new(pattern).match_(text)`; compile the pattern
/// once with [`Pattern::new`] if it will be reused.
pub fn match_(pattern: &str, text: &str) -> String {
    Pattern::new(pattern).match_(text)
}

/// Compile `pattern` and return the leftmost match in `text`.
pub fn search(pattern: &str, text: &str) -> String {
    Pattern::new(pattern).search(text)
}

/// Compile `pattern` and replace every match in `text` with `target`.
pub fn replace(pattern: &str, text: &str, target: &str) -> String {
    Pattern::new(pattern).replace(text, target)
}

/// Compile `pattern` and return every non-overlapping match in `text`.
pub fn matches(pattern: &str, text: &str) -> Vec<String> {
    Pattern::new(pattern).matches(text)
}

/// Compute the failure-link table of a DFA by breadth-first traversal
/// from its start state.
///
/// The link of a state reached from `u` on `b` is found by walking `u`'s
/// own failure chain until some state has a transition on `b`; its target
/// is the link. States one step from the start, and states whose walk
/// exhausts the chain, link to the start. A link is assigned when a state
/// is first discovered and never revised, and always points to a state of
/// strictly smaller BFS depth, so every failure chain terminates at the
/// start state.
///
/// Each link also carries its target's BFS depth. That depth is the
/// length of the longest proper suffix of the dead candidate that is
/// still a viable match prefix, which is exactly the candidate length the
/// scan must resume with after the jump.
fn failure_links(dfa: &DFA) -> Vec<Link> {
    let start = dfa.start();
    let mut fail = vec![start; dfa.len()];
    let mut depth = vec![0; dfa.len()];
    let mut discovered = vec![false; dfa.len()];
    let mut queue = VecDeque::new();
    discovered[start] = true;
    queue.push_back(start);
    while let Some(u) = queue.pop_front() {
        for (b, v) in dfa.transitions(u) {
            if discovered[v] {
                continue;
            }
            discovered[v] = true;
            depth[v] = depth[u] + 1;
            fail[v] = if u == start {
                start
            } else {
                link_target(dfa, &fail, u, b, v)
            };
            queue.push_back(v);
        }
    }
    fail.into_iter().map(|f| Link { state: f, len: depth[f] }).collect()
}

fn link_target(
    dfa: &DFA,
    fail: &[StateID],
    u: StateID,
    byte: u8,
    v: StateID,
) -> StateID {
    let start = dfa.start();
    let mut f = fail[u];
    loop {
        if let Some(t) = dfa.next_state(f, byte) {
            return if t == v { start } else { t };
        }
        if f == start {
            return start;
        }
        f = fail[f];
    }
}

/// Accelerates the scan loop when it sits in the start state with no
/// partial match: if the start state has at most three outgoing bytes, a
/// vectorized byte search skips ahead to the next possible match start.
#[derive(Clone, Debug)]
enum Prefilter {
    Byte(u8),
    Byte2(u8, u8),
    Byte3(u8, u8, u8),
}

impl Prefilter {
    fn from_dfa(dfa: &DFA) -> Option<Prefilter> {
        let bytes: Vec<u8> =
            dfa.transitions(dfa.start()).map(|(b, _)| b).collect();
        match *bytes.as_slice() {
            [a] => {
                debug!("prefilter: memchr({:?})", a);
                Some(Prefilter::Byte(a))
            }
            [a, b] => {
                debug!("prefilter: memchr2({:?}, {:?})", a, b);
                Some(Prefilter::Byte2(a, b))
            }
            [a, b, c] => {
                debug!("prefilter: memchr3({:?}, {:?}, {:?})", a, b, c);
                Some(Prefilter::Byte3(a, b, c))
            }
            _ => None,
        }
    }

    fn find(&self, haystack: &[u8]) -> Option<usize> {
        match *self {
            Prefilter::Byte(a) => memchr::memchr(a, haystack),
            Prefilter::Byte2(a, b) => memchr::memchr2(a, b, haystack),
            Prefilter::Byte3(a, b, c) => memchr::memchr3(a, b, c, haystack),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_links_point_at_longest_proper_suffix() {
        // For the literal "aab" the state reached by "aa" must fall back
        // to the state reached by "a" when 'a' keeps arriving.
        let pat = Pattern::new("aab");
        let dfa = &pat.0.dfa;
        let s1 = dfa.next_state(dfa.start(), b'a').expect("a");
        let s2 = dfa.next_state(s1, b'a').expect("aa");
        assert_eq!(pat.0.fail[s2].state, s1);
        assert_eq!(pat.0.fail[s2].len, 1);
        assert_eq!(pat.0.fail[s1].state, dfa.start());
        assert_eq!(pat.0.fail[s1].len, 0);
    }

    #[test]
    fn failure_jump_resumes_with_the_suffix_length() {
        // The "ab" candidate dies on 'd' and the jump lands on the state
        // for "b". The resumed candidate must be one byte long, so the
        // match is "bd" starting at the 'b', not a fragment starting at
        // the dead byte.
        let pat = Pattern::new("abc|bd");
        assert_eq!(pat.search("abd"), "bd");
        assert_eq!(pat.replace("abd", "X"), "aX");
        assert_eq!(pat.matches("abd"), vec!["bd"]);
    }

    #[test]
    fn search_reuses_overlapping_prefixes() {
        // "aaab" against "aaaab": the first candidate dies after "aaa"
        // plus 'a', and the failure link must keep two of the three a's.
        assert_eq!(Pattern::new("aaab").search("aaaab"), "aaab");
        assert_eq!(Pattern::new("aab").search("aaab"), "aab");
    }

    #[test]
    fn match_is_greedy() {
        let pat = Pattern::new("a(b|c)*");
        assert_eq!(pat.match_("abcbcb"), "abcbcb");
        assert_eq!(pat.match_("abd"), "ab");
    }

    #[test]
    fn end_anchored_match_fails_hard() {
        let pat = Pattern::new("abc$");
        assert_eq!(pat.match_("abc"), "abc");
        assert_eq!(pat.match_("abcd"), "");
    }

    #[test]
    fn replace_copies_unmatched_bytes() {
        let pat = Pattern::new("ab");
        assert_eq!(pat.replace("xabyab", "Z"), "xZyZ");
        assert_eq!(pat.replace("no hits", "Z"), "no hits");
    }

    #[test]
    fn replace_emits_consumed_but_unmatched_tail() {
        // The dangling 'a' after the second match must survive.
        let pat = Pattern::new("ab");
        assert_eq!(pat.replace("ababa", "Z"), "ZZa");
    }

    #[test]
    fn begin_anchored_replace_touches_only_the_prefix() {
        let pat = Pattern::new("^ab");
        assert_eq!(pat.replace("abab", "Z"), "Zab");
        // No match still substitutes the empty prefix.
        assert_eq!(pat.replace("xx", "Z"), "Zxx");
    }

    #[test]
    fn matches_is_all_or_nothing_when_end_anchored() {
        let pat = Pattern::new("ab$");
        assert_eq!(pat.matches("ab"), vec!["ab"]);
        assert!(pat.matches("abab").is_empty());
    }

    #[test]
    fn empty_pattern_matches_empty_everywhere() {
        let pat = Pattern::new("");
        assert_eq!(pat.match_(""), "");
        assert_eq!(pat.match_("abcdefg"), "");
        assert_eq!(pat.search("abc"), "");
        assert!(pat.matches("abc").is_empty());
    }

    #[test]
    fn builder_minimize_toggle_preserves_results() {
        for pattern in &["a(b|c)*", "[a-c]+[A-C]", "2{3,}"] {
            let (fast, _) = PatternBuilder::new().build(pattern);
            let (big, _) =
                PatternBuilder::new().minimize(false).build(pattern);
            for text in &["abcbc", "aA", "ccA", "22222", "x22y222z"] {
                assert_eq!(fast.search(text), big.search(text));
                assert_eq!(fast.matches(text), big.matches(text));
            }
        }
    }

    #[test]
    fn free_functions_delegate() {
        assert_eq!(super::match_("233?", "2333"), "233");
        assert_eq!(super::search("b+", "abbc"), "bb");
        assert_eq!(super::replace("b+", "abbc", "-"), "a-c");
        assert_eq!(super::matches("b+", "abbcb"), vec!["bb", "b"]);
    }
}
