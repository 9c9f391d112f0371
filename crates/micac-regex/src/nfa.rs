//! Thompson construction and NFA execution.
//!
//! States live in an arena indexed by [`StateId`]; each construction rule
//! allocates its states there and wires transitions between ids, so the
//! NFA is a flat table rather than a pointer graph. Execution is subset
//! simulation: carry the ε-closure of the current state set, feed it one
//! character at a time, and remember the last position at which the
//! accept state was in the set.

use micac_util::{Idx, IndexVec};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::parser::{self, RegexAst};

/// NFA state id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(pub u32);

impl Idx for StateId {
    fn from_usize(idx: usize) -> Self {
        StateId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct State {
    /// ε-transitions
    eps: Vec<StateId>,
    /// Labeled transitions
    edges: FxHashMap<char, Vec<StateId>>,
}

/// A compiled NFA with a single start and a single accept state.
#[derive(Debug)]
pub struct Nfa {
    states: IndexVec<StateId, State>,
    start: StateId,
    accept: StateId,
}

impl Nfa {
    /// Compile a parsed regex into an NFA.
    pub fn compile(ast: &RegexAst) -> Nfa {
        let mut builder = Builder {
            states: IndexVec::new(),
        };
        let (start, accept) = builder.build(ast);
        Nfa {
            states: builder.states,
            start,
            accept,
        }
    }

    /// Length in bytes of the longest non-empty prefix of `text` this NFA
    /// accepts, or `None` when no non-empty prefix matches.
    pub fn find_longest_match(&self, text: &str) -> Option<usize> {
        let mut current: FxHashSet<StateId> = FxHashSet::default();
        current.insert(self.start);
        self.epsilon_closure(&mut current);

        let mut longest = None;
        for (pos, ch) in text.char_indices() {
            current = self.step(&current, ch);
            if current.is_empty() {
                break;
            }
            self.epsilon_closure(&mut current);
            if current.contains(&self.accept) {
                longest = Some(pos + ch.len_utf8());
            }
        }
        longest
    }

    /// Extend `states` with everything reachable over ε-transitions.
    fn epsilon_closure(&self, states: &mut FxHashSet<StateId>) {
        let mut stack: Vec<StateId> = states.iter().copied().collect();
        while let Some(state) = stack.pop() {
            for &next in &self.states[state].eps {
                if states.insert(next) {
                    stack.push(next);
                }
            }
        }
    }

    /// States reachable from `states` over one `ch` transition.
    fn step(&self, states: &FxHashSet<StateId>, ch: char) -> FxHashSet<StateId> {
        let mut next = FxHashSet::default();
        for &state in states {
            if let Some(targets) = self.states[state].edges.get(&ch) {
                next.extend(targets.iter().copied());
            }
        }
        next
    }
}

struct Builder {
    states: IndexVec<StateId, State>,
}

impl Builder {
    fn state(&mut self) -> StateId {
        self.states.push(State::default())
    }

    fn eps(&mut self, from: StateId, to: StateId) {
        self.states[from].eps.push(to);
    }

    fn edge(&mut self, from: StateId, ch: char, to: StateId) {
        self.states[from].edges.entry(ch).or_default().push(to);
    }

    fn build(&mut self, ast: &RegexAst) -> (StateId, StateId) {
        match ast {
            RegexAst::Empty => {
                let start = self.state();
                let end = self.state();
                self.eps(start, end);
                (start, end)
            }
            RegexAst::Char(c) => {
                let start = self.state();
                let end = self.state();
                self.edge(start, *c, end);
                (start, end)
            }
            RegexAst::Class(set) => {
                let start = self.state();
                let end = self.state();
                for &c in set {
                    self.edge(start, c, end);
                }
                (start, end)
            }
            RegexAst::Concat(left, right) => {
                let (ls, le) = self.build(left);
                let (rs, re) = self.build(right);
                self.eps(le, rs);
                (ls, re)
            }
            RegexAst::Union(left, right) => {
                let start = self.state();
                let end = self.state();
                let (ls, le) = self.build(left);
                let (rs, re) = self.build(right);
                self.eps(start, ls);
                self.eps(start, rs);
                self.eps(le, end);
                self.eps(re, end);
                (start, end)
            }
            RegexAst::Star(inner) => {
                let start = self.state();
                let end = self.state();
                let (is, ie) = self.build(inner);
                self.eps(start, end);
                self.eps(start, is);
                self.eps(ie, end);
                self.eps(ie, is);
                (start, end)
            }
        }
    }
}

/// A pattern compiled once and matched many times.
#[derive(Debug)]
pub struct RegexEngine {
    nfa: Nfa,
}

impl RegexEngine {
    /// Compile a pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let ast = parser::parse(pattern)?;
        Ok(Self {
            nfa: Nfa::compile(&ast),
        })
    }

    /// Length in bytes of the longest non-empty matching prefix of `text`.
    pub fn find_longest_match(&self, text: &str) -> Option<usize> {
        self.nfa.find_longest_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine(pattern: &str) -> RegexEngine {
        RegexEngine::new(pattern).unwrap()
    }

    #[test]
    fn test_literal_match() {
        let e = engine("while");
        assert_eq!(e.find_longest_match("while x"), Some(5));
        assert_eq!(e.find_longest_match("whil"), None);
    }

    #[test]
    fn test_union_picks_either_arm() {
        let e = engine("(int|bool)");
        assert_eq!(e.find_longest_match("int x"), Some(3));
        assert_eq!(e.find_longest_match("bool x"), Some(4));
        assert_eq!(e.find_longest_match("float"), None);
    }

    #[test]
    fn test_star_matches_longest() {
        let e = engine("[0-9]+");
        assert_eq!(e.find_longest_match("12345;"), Some(5));
        assert_eq!(e.find_longest_match(";"), None);
    }

    #[test]
    fn test_empty_prefix_never_reported() {
        // a* accepts "", but the matcher only reports non-empty prefixes
        let e = engine("a*");
        assert_eq!(e.find_longest_match("bbb"), None);
        assert_eq!(e.find_longest_match("aab"), Some(2));
    }

    #[test]
    fn test_identifier_pattern() {
        let e = engine("[A-Za-z][A-Za-z0-9_]*");
        assert_eq!(e.find_longest_match("counter_2 = 1"), Some(9));
        assert_eq!(e.find_longest_match("2counter"), None);
    }

    #[test]
    fn test_signed_number() {
        let e = engine("-[0-9]+");
        assert_eq!(e.find_longest_match("-42;"), Some(3));
        assert_eq!(e.find_longest_match("42"), None);
        assert_eq!(e.find_longest_match("-"), None);
    }

    #[test]
    fn test_escaped_metacharacters() {
        let e = engine("(\\+|-|\\*|/)");
        assert_eq!(e.find_longest_match("+"), Some(1));
        assert_eq!(e.find_longest_match("*"), Some(1));
        assert_eq!(e.find_longest_match("%"), None);
    }

    #[test]
    fn test_two_char_operators() {
        let e = engine("(<|>|==|<=|>=|!=)");
        assert_eq!(e.find_longest_match("<= 3"), Some(2));
        assert_eq!(e.find_longest_match("< 3"), Some(1));
        assert_eq!(e.find_longest_match("!= 3"), Some(2));
        assert_eq!(e.find_longest_match("! "), None);
    }

    #[test]
    fn test_optional() {
        let e = engine("ab?c");
        assert_eq!(e.find_longest_match("abc"), Some(3));
        assert_eq!(e.find_longest_match("ac"), Some(2));
        assert_eq!(e.find_longest_match("abbc"), None);
    }

    proptest! {
        #[test]
        fn prop_match_is_deterministic(input in "[a-z0-9 ]{0,20}") {
            let e = engine("[a-z]+");
            prop_assert_eq!(e.find_longest_match(&input), e.find_longest_match(&input));
        }

        #[test]
        fn prop_match_is_a_prefix(input in "\\PC{0,20}") {
            let e = engine("[A-Za-z][A-Za-z0-9_]*");
            if let Some(len) = e.find_longest_match(&input) {
                prop_assert!(len <= input.len());
                prop_assert!(input.is_char_boundary(len));
            }
        }
    }
}
