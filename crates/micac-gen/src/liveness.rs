//! Liveness analysis over a TAC stream.
//!
//! Backward may-liveness at instruction granularity, computed on the
//! control-flow graph rather than the linear instruction order so that
//! values carried around loop back edges stay live through the loop
//! body. Block-level sets are iterated to a fixed point, then each block
//! is walked backward once to produce per-instruction live-in sets.

use micac_tac::{leaders, Instr, Operand};
use rustc_hash::{FxHashMap, FxHashSet};

/// Set of live `Var`/`Temp` operands.
pub type LiveSet = FxHashSet<Operand>;

/// Per-instruction liveness for one stream.
pub struct Liveness {
    live_in: Vec<LiveSet>,
    empty: LiveSet,
}

impl Liveness {
    /// Operands live at entry to instruction `i`.
    pub fn live_at(&self, i: usize) -> &LiveSet {
        self.live_in.get(i).unwrap_or(&self.empty)
    }

    /// Operands live after instruction `i` completes.
    ///
    /// Within a block this is the next instruction's live-in; past the
    /// end of the stream nothing is live.
    pub fn live_after(&self, i: usize) -> &LiveSet {
        self.live_at(i + 1)
    }

    /// Number of instructions covered.
    pub fn len(&self) -> usize {
        self.live_in.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_in.is_empty()
    }
}

/// `Var`/`Temp` operands an instruction reads.
pub fn uses(instr: &Instr) -> Vec<Operand> {
    let mut ops = Vec::new();
    match instr {
        Instr::Bin { lhs, rhs, .. } => {
            ops.push(*lhs);
            ops.push(*rhs);
        }
        Instr::Assign { src, .. } => ops.push(*src),
        Instr::If { cond, .. } => ops.push(*cond),
        Instr::Print { value } | Instr::Arg { value } | Instr::Ret { value } => ops.push(*value),
        _ => {}
    }
    ops.retain(Operand::is_place);
    ops
}

/// The `Var`/`Temp` operand an instruction defines, if any.
pub fn defs(instr: &Instr) -> Option<Operand> {
    match instr {
        Instr::Def { var, .. } | Instr::Assign { dst: var, .. } | Instr::Param { var } => {
            Some(Operand::Var(*var))
        }
        Instr::Bin { dst, .. } | Instr::Call { dst, .. } => Some(Operand::Temp(*dst)),
        _ => None,
    }
}

/// Compute per-instruction liveness for a stream.
pub fn analyze(instrs: &[Instr]) -> Liveness {
    let n = instrs.len();
    if n == 0 {
        return Liveness {
            live_in: Vec::new(),
            empty: LiveSet::default(),
        };
    }

    // Block ranges from the leader partition.
    let leader_indices = leaders(instrs);
    let mut ranges: Vec<(usize, usize)> = Vec::with_capacity(leader_indices.len());
    for (b, &start) in leader_indices.iter().enumerate() {
        let end = leader_indices.get(b + 1).copied().unwrap_or(n);
        ranges.push((start, end));
    }

    let label_block: FxHashMap<&str, usize> = {
        let mut map = FxHashMap::default();
        for (b, &(start, end)) in ranges.iter().enumerate() {
            for instr in &instrs[start..end] {
                if let Instr::Label(label) = instr {
                    map.insert(label.as_str(), b);
                }
            }
        }
        map
    };

    let successors: Vec<Vec<usize>> = ranges
        .iter()
        .enumerate()
        .map(|(b, &(_, end))| {
            let mut succ = Vec::new();
            match &instrs[end - 1] {
                Instr::Goto(target) => {
                    if let Some(&t) = label_block.get(target.as_str()) {
                        succ.push(t);
                    }
                }
                Instr::If { target, .. } => {
                    if let Some(&t) = label_block.get(target.as_str()) {
                        succ.push(t);
                    }
                    if b + 1 < ranges.len() {
                        succ.push(b + 1);
                    }
                }
                Instr::Ret { .. } => {}
                _ => {
                    if b + 1 < ranges.len() {
                        succ.push(b + 1);
                    }
                }
            }
            succ
        })
        .collect();

    // Iterate block live-in/out to a fixed point.
    let block_count = ranges.len();
    let mut block_in: Vec<LiveSet> = vec![LiveSet::default(); block_count];
    let mut block_out: Vec<LiveSet> = vec![LiveSet::default(); block_count];

    let mut changed = true;
    while changed {
        changed = false;
        for b in (0..block_count).rev() {
            let mut out = LiveSet::default();
            for &s in &successors[b] {
                out.extend(block_in[s].iter().copied());
            }

            let (start, end) = ranges[b];
            let mut live = out.clone();
            for instr in instrs[start..end].iter().rev() {
                if let Some(def) = defs(instr) {
                    live.remove(&def);
                }
                live.extend(uses(instr));
            }

            if live != block_in[b] {
                block_in[b] = live;
                changed = true;
            }
            block_out[b] = out;
        }
    }

    // One backward walk per block for instruction granularity.
    let mut live_in: Vec<LiveSet> = vec![LiveSet::default(); n];
    for (b, &(start, end)) in ranges.iter().enumerate() {
        let mut live = block_out[b].clone();
        for i in (start..end).rev() {
            if let Some(def) = defs(&instrs[i]) {
                live.remove(&def);
            }
            live.extend(uses(&instrs[i]));
            live_in[i] = live.clone();
        }
    }

    Liveness {
        live_in,
        empty: LiveSet::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micac_lex::language_tokenizer;
    use micac_par::parse;
    use micac_tac::TacProgram;

    fn lower(source: &str) -> TacProgram {
        let tokens = language_tokenizer().unwrap().tokenize(source).unwrap();
        let mut program = parse(tokens).unwrap();
        micac_sem::analyze(&mut program).unwrap();
        micac_tac::generate(&program).unwrap()
    }

    fn named(set: &LiveSet, name: &str) -> bool {
        set.iter().any(|op| match op {
            Operand::Var(v) => v.name.as_str() == name,
            _ => false,
        })
    }

    #[test]
    fn test_straight_line_liveness() {
        // x = 1; y = x + 1; print(y)
        let tac = lower("var int x; x = 1; var int y; y = x + 1; print(y);");
        let live = analyze(&tac.top_level);
        // Stream: eq 1 x ; t0 = x + 1 ; eq t0 y ; print y
        assert!(!named(live.live_at(0), "x"));
        assert!(named(live.live_at(1), "x"));
        assert!(!named(live.live_at(2), "x"));
        assert!(named(live.live_at(3), "y"));
    }

    #[test]
    fn test_loop_carried_variable_stays_live() {
        let tac = lower("var int x = 10; while x > 0 do { x = x - 1; }");
        let live = analyze(&tac.top_level);
        // Stream:
        //   0 label L0 ; 1 t0 = x > 0 ; 2 if t0 L1 ; 3 goto L2
        //   4 label L1 ; 5 t1 = x - 1 ; 6 eq t1 x ; 7 goto L0 ; 8 label L2
        // x is carried around the back edge, so it must be live at the
        // loop header and at the back-edge goto. A linear walk would
        // kill it after its last textual use at instruction 5.
        for i in [0, 1, 2, 4, 5, 7] {
            assert!(
                named(live.live_at(i), "x"),
                "x dead at instruction {i}: {}",
                tac.top_level[i]
            );
        }
        // Dead on the loop-exit path and right before its own store.
        assert!(!named(live.live_at(3), "x"));
        assert!(!named(live.live_at(6), "x"));
    }

    #[test]
    fn test_liveness_closure_property() {
        let source =
            "var int a = 6; var int b = 4; if a > b do { print(a - b); } print(a * b);";
        let tac = lower(source);
        let live = analyze(&tac.top_level);
        for (i, instr) in tac.top_level.iter().enumerate() {
            let d = defs(instr);
            for used in uses(instr) {
                if Some(used) != d {
                    assert!(
                        live.live_at(i).contains(&used),
                        "use {used} not live at {i}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_temp_live_range_is_tight() {
        let tac = lower("var int x = 1; var int y; y = x + 2;");
        let live = analyze(&tac.top_level);
        // Stream: t0 = x + 2 ; eq t0 y. t0 is live only at the eq.
        let temp = tac
            .top_level
            .iter()
            .find_map(|i| match i {
                Instr::Bin { dst, .. } => Some(Operand::Temp(*dst)),
                _ => None,
            })
            .unwrap();
        assert!(!live.live_at(0).contains(&temp));
        assert!(live.live_at(1).contains(&temp));
        assert!(live.live_after(1).is_empty() || !live.live_after(1).contains(&temp));
    }

    #[test]
    fn test_ret_ends_flow() {
        let tac = lower("int f(int a) { return a; a = 2; } int main() { print(f(1)); return 0; }");
        let f = &tac.functions[&micac_util::Symbol::intern("f")];
        let live = analyze(f);
        // param a ; ret a ; eq 2 a -- nothing after ret keeps `a` alive
        // at the ret itself beyond its own use.
        assert!(named(live.live_at(1), "a"));
        assert!(!named(live.live_after(1), "a"));
    }

    #[test]
    fn test_empty_stream() {
        let live = analyze(&[]);
        assert!(live.is_empty());
        assert!(live.live_at(0).is_empty());
    }
}
