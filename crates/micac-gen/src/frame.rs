//! Stack frame layout and slot assignment.
//!
//! Temporaries and local variables live in `[ebp - 4k]` slots. Slots are
//! assigned by a linear scan over live intervals with a free list: when
//! an interval ends its slot returns to the pool, and a fresh slot is
//! cut only when the pool is empty, so the frame is exactly as deep as
//! the peak number of overlapping intervals. Operands that are never
//! live get no slot at all; stores into them are dropped.
//!
//! Interval starts and expiries are ordered by a total operand ordering
//! so that identical input always produces identical slot assignments.

use micac_par::Storage;
use micac_tac::Operand;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::liveness::Liveness;

/// Width of one stack slot in bytes. Booleans occupy a byte of their
/// slot; the slot itself stays uniform.
pub const SLOT_SIZE: u32 = 4;

/// Slot assignment for one stream.
#[derive(Debug)]
pub struct StackFrame {
    slots: FxHashMap<Operand, String>,
    /// Total frame size in bytes (`sub esp, N`).
    pub size: u32,
}

impl StackFrame {
    /// Stack address of a frame-resident operand, or `None` when the
    /// operand was never live.
    pub fn slot(&self, op: &Operand) -> Option<&str> {
        self.slots.get(op).map(String::as_str)
    }
}

/// True for operands that live in the frame: temporaries and local
/// variables. Globals live in `.data`, parameters above `ebp`.
pub fn is_frame_operand(op: &Operand) -> bool {
    match op {
        Operand::Temp(_) => true,
        Operand::Var(v) => v.storage == Storage::Local,
        Operand::Const(_) => false,
    }
}

/// Total ordering over operands, used wherever hash-set contents must be
/// walked deterministically.
pub fn operand_order(a: &Operand, b: &Operand) -> std::cmp::Ordering {
    operand_key(a).cmp(&operand_key(b))
}

fn operand_key(op: &Operand) -> (u8, u32, &'static str, u8, u32) {
    match op {
        Operand::Temp(t) => (0, t.id, "", 0, 0),
        Operand::Var(v) => {
            let storage = match v.storage {
                Storage::Global => 0,
                Storage::Local => 1,
                Storage::Param => 2,
            };
            (1, 0, v.name.as_str(), storage, v.scope_id)
        }
        Operand::Const(c) => (2, c.value as u32, "", 0, 0),
    }
}

/// Assign stack slots for one stream from its liveness.
pub fn assign_slots(liveness: &Liveness) -> StackFrame {
    // Live interval per frame operand: first and last instruction index
    // at which it appears live. Holes inside the interval keep the slot;
    // reusing a slot across a hole could alias two operands.
    let mut intervals: FxHashMap<Operand, (usize, usize)> = FxHashMap::default();
    for i in 0..liveness.len() {
        for op in liveness.live_at(i) {
            if is_frame_operand(op) {
                intervals
                    .entry(*op)
                    .and_modify(|range| range.1 = i)
                    .or_insert((i, i));
            }
        }
    }

    let mut starts: Vec<(Operand, usize, usize)> = intervals
        .iter()
        .map(|(op, &(start, end))| (*op, start, end))
        .collect();
    starts.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| operand_order(&a.0, &b.0)));

    let mut slots: FxHashMap<Operand, String> = FxHashMap::default();
    let mut free: VecDeque<String> = VecDeque::new();
    let mut active: Vec<(usize, String)> = Vec::new();
    let mut slot_count: u32 = 0;

    for (op, start, end) in starts {
        // Expire intervals that ended before this one starts.
        let mut expired: Vec<String> = Vec::new();
        active.retain(|(active_end, slot)| {
            if *active_end < start {
                expired.push(slot.clone());
                false
            } else {
                true
            }
        });
        expired.sort();
        free.extend(expired);

        let slot = match free.pop_front() {
            Some(slot) => slot,
            None => {
                slot_count += 1;
                format!("[ebp - {}]", slot_count * SLOT_SIZE)
            }
        };
        slots.insert(op, slot.clone());
        active.push((end, slot));
    }

    StackFrame {
        slots,
        size: slot_count * SLOT_SIZE,
    }
}
