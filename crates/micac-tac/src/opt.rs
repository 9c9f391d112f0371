//! TAC optimizer: constant folding and constant propagation.
//!
//! Both passes are local to a basic block. Blocks are found by the
//! classic leader rule: the first instruction, every jump target, and
//! every instruction following a `goto`/`if`. Folding and propagation
//! alternate on each block until neither changes it, and the whole
//! optimizer is idempotent: running it twice produces the same program
//! the second time.
//!
//! Global `def` initializers are hoisted out of the top-level stream
//! during splitting, so their constants are re-introduced as the entry
//! environment of the first top-level block. The seed is skipped when
//! that block is a jump target, where a back edge could carry a
//! different value.

use rustc_hash::FxHashMap;

use crate::error::{Result, TacError};
use crate::tac::{BinOp, Const, Instr, Operand, TacProgram, Temp, Var};

/// Optimize every stream of the program in place.
pub fn optimize(program: &mut TacProgram) -> Result<()> {
    let globals_env: FxHashMap<Var, Const> = program
        .globals
        .iter()
        .filter_map(|instr| match instr {
            Instr::Def { var, init: Some(c) } => Some((*var, *c)),
            _ => None,
        })
        .collect();

    optimize_stream(&mut program.top_level, &globals_env)?;
    let empty = FxHashMap::default();
    for body in program.functions.values_mut() {
        optimize_stream(body, &empty)?;
    }
    Ok(())
}

fn optimize_stream(instrs: &mut Vec<Instr>, entry_env: &FxHashMap<Var, Const>) -> Result<()> {
    // When the stream opens with a label, the first block can be entered
    // from a back edge as well and must not assume the entry constants.
    let seed_first = !matches!(instrs.first(), Some(Instr::Label(_)));
    let empty = FxHashMap::default();

    let mut blocks = split_blocks(std::mem::take(instrs));
    for (index, block) in blocks.iter_mut().enumerate() {
        let env = if index == 0 && seed_first {
            entry_env
        } else {
            &empty
        };
        loop {
            let folded = constant_folding(block)?;
            let propagated = constant_propagation(block, env);
            if !folded && !propagated {
                break;
            }
        }
    }
    *instrs = blocks.into_iter().flatten().collect();
    Ok(())
}

/// Leader indices for a linear instruction stream.
pub fn leaders(instrs: &[Instr]) -> Vec<usize> {
    let mut result = Vec::new();
    if instrs.is_empty() {
        return result;
    }

    let label_map: FxHashMap<&str, usize> = instrs
        .iter()
        .enumerate()
        .filter_map(|(i, instr)| match instr {
            Instr::Label(label) => Some((label.as_str(), i)),
            _ => None,
        })
        .collect();

    let mut is_leader = vec![false; instrs.len()];
    is_leader[0] = true;
    for (i, instr) in instrs.iter().enumerate() {
        match instr {
            Instr::Goto(target) | Instr::If { target, .. } => {
                if let Some(&target_idx) = label_map.get(target.as_str()) {
                    is_leader[target_idx] = true;
                }
                if i + 1 < instrs.len() {
                    is_leader[i + 1] = true;
                }
            }
            _ => {}
        }
    }

    for (i, &leader) in is_leader.iter().enumerate() {
        if leader {
            result.push(i);
        }
    }
    result
}

/// Split a stream into its basic blocks.
fn split_blocks(instrs: Vec<Instr>) -> Vec<Vec<Instr>> {
    let leader_indices = leaders(&instrs);
    let mut blocks = Vec::with_capacity(leader_indices.len());
    let mut rest = instrs;
    // Split back to front so each split is O(tail).
    for &start in leader_indices.iter().rev() {
        blocks.push(rest.split_off(start));
    }
    blocks.reverse();
    blocks
}

/// Fold binary ops whose operands are both constants.
///
/// The folded instruction is removed and every later use of its temp in
/// the block is rewritten to the constant.
fn constant_folding(block: &mut Vec<Instr>) -> Result<bool> {
    let mut temp_map: FxHashMap<Temp, Const> = FxHashMap::default();
    let mut changed = false;

    let mut i = 0;
    while i < block.len() {
        if let Instr::Bin { op, lhs, rhs, dst } = &block[i] {
            if let (Some(a), Some(b)) = (lhs.as_const(), rhs.as_const()) {
                let value = eval(*op, a.value, b.value)?;
                temp_map.insert(*dst, Const { value, ty: dst.ty });
                block.remove(i);
                changed = true;
                continue;
            }
        }
        i += 1;
    }

    for instr in block.iter_mut() {
        for operand in use_slots(instr) {
            if let Operand::Temp(t) = operand {
                if let Some(&constant) = temp_map.get(t) {
                    *operand = Operand::Const(constant);
                    changed = true;
                }
            }
        }
    }

    Ok(changed)
}

/// 32-bit signed evaluation with `idiv` semantics for division.
fn eval(op: BinOp, a: i32, b: i32) -> Result<i32> {
    let value = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(TacError::DivByZero);
            }
            a.wrapping_div(b)
        }
        BinOp::And => a & b,
        BinOp::Or => a | b,
        BinOp::Lt => i32::from(a < b),
        BinOp::Gt => i32::from(a > b),
        BinOp::Le => i32::from(a <= b),
        BinOp::Ge => i32::from(a >= b),
        BinOp::Eq => i32::from(a == b),
        BinOp::Ne => i32::from(a != b),
    };
    Ok(value)
}

/// Propagate known variable constants forward through the block.
///
/// A binding is valid from the defining instruction up to the next
/// redefinition; uses are rewritten as the scan passes them, so a
/// redefinition invalidates the binding for everything after it and
/// nothing before it. `print` operands are never rewritten.
fn constant_propagation(block: &mut [Instr], entry_env: &FxHashMap<Var, Const>) -> bool {
    let mut env = entry_env.clone();
    let mut changed = false;

    for instr in block.iter_mut() {
        if !matches!(instr, Instr::Print { .. }) {
            for operand in use_slots(instr) {
                if let Operand::Var(v) = operand {
                    if let Some(&constant) = env.get(v) {
                        *operand = Operand::Const(constant);
                        changed = true;
                    }
                }
            }
        }

        match instr {
            Instr::Assign { src, dst } => match src.as_const() {
                Some(constant) => {
                    env.insert(*dst, constant);
                }
                None => {
                    env.remove(dst);
                }
            },
            Instr::Def { var, init } => match init {
                Some(constant) => {
                    env.insert(*var, *constant);
                }
                None => {
                    env.remove(var);
                }
            },
            Instr::Param { var } => {
                env.remove(var);
            }
            _ => {}
        }
    }

    changed
}

/// Mutable references to every operand slot an instruction reads.
fn use_slots(instr: &mut Instr) -> Vec<&mut Operand> {
    match instr {
        Instr::Bin { lhs, rhs, .. } => vec![lhs, rhs],
        Instr::Assign { src, .. } => vec![src],
        Instr::If { cond, .. } => vec![cond],
        Instr::Print { value } | Instr::Arg { value } | Instr::Ret { value } => vec![value],
        _ => Vec::new(),
    }
}
