//! x86 instruction selection and emission.
//!
//! Each stream (the `_start` body and every function body) is emitted
//! independently: its own liveness, its own frame, its own descriptor
//! state. Register allocation is strictly block-local; at every block
//! boundary live register-resident operands are written back to their
//! home locations and the register file is cleared, so control-flow
//! edges always meet with all values in memory.
//!
//! Output is NASM syntax for 32-bit x86, sections `.data`/`.bss`/`.text`,
//! entry `_start`, syscalls via `int 0x80`.

use std::fmt::Write;

use micac_par::{Storage, Ty};
use micac_tac::{BinOp, Const, Instr, Operand, TacProgram, Var};
use micac_util::Symbol;

use crate::error::{GenError, Result};
use crate::frame::{self, StackFrame};
use crate::liveness::{self, Liveness};
use crate::regs::{Descriptors, Reg};
use crate::runtime::merge_runtime;

/// Data-section directive and memory size specifier for a type.
pub fn specifiers(ty: Ty) -> (&'static str, &'static str) {
    match ty {
        Ty::Int => ("dd", "dword"),
        Ty::Bool => ("db", "byte"),
    }
}

/// Generate the complete assembly text for a program.
///
/// `runtime` is the runtime assembly source; its sections are merged
/// into the emitted sections.
pub fn generate(tac: &TacProgram, runtime: &str) -> Result<String> {
    let mut data = String::from("section .data\n");
    let mut bss = String::from("section .bss\n");
    let mut text = String::from("section .text\nglobal _start\n_start:\n");

    for instr in &tac.globals {
        match instr {
            Instr::Def { var, init } => {
                let (directive, _) = specifiers(var.ty);
                let value = init.map_or(0, |c| c.value);
                let _ = writeln!(data, "{} {} {}", var.name, directive, value);
            }
            other => {
                return Err(GenError::Internal(format!(
                    "non-def instruction in globals: {other}"
                )))
            }
        }
    }

    emit_stream(&mut text, &tac.top_level)?;
    if tac.functions.contains_key(&Symbol::intern("main")) {
        text.push_str("call main\n");
    }
    text.push_str("mov eax, 1\nxor ebx, ebx\nint 0x80\n");

    for (name, body) in &tac.functions {
        let _ = writeln!(text, "{}:", name);
        emit_stream(&mut text, body)?;
        // Reached only when the body falls off the end without a return.
        text.push_str("mov esp, ebp\npop ebp\nret\n");
    }

    merge_runtime(runtime, &mut data, &mut bss, &mut text);
    Ok(format!("{data}{bss}{text}"))
}

fn emit_stream(text: &mut String, instrs: &[Instr]) -> Result<()> {
    let liveness = liveness::analyze(instrs);
    let frame = frame::assign_slots(&liveness);

    let mut params = rustc_hash::FxHashMap::default();
    for instr in instrs {
        if let Instr::Param { var } = instr {
            let index = params.len() as u32;
            params.insert(*var, index);
        }
    }

    let _ = writeln!(text, "push ebp\nmov ebp, esp\nsub esp, {}", frame.size);

    let mut emitter = StreamEmitter {
        text,
        liveness,
        frame,
        params,
        descriptors: Descriptors::new(),
        counter: 0,
    };
    for (i, instr) in instrs.iter().enumerate() {
        emitter.counter = i;
        emitter.emit_instr(instr)?;
    }
    Ok(())
}

/// Resolved right-hand operand of a binary op.
enum RhsLoc {
    Imm(i32),
    Reg(Reg),
    Mem(String),
}

struct StreamEmitter<'a> {
    text: &'a mut String,
    liveness: Liveness,
    frame: StackFrame,
    params: rustc_hash::FxHashMap<Var, u32>,
    descriptors: Descriptors,
    counter: usize,
}

impl StreamEmitter<'_> {
    fn emit(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Home memory address of a place operand. `None` for frame operands
    /// that were never live and therefore own no slot.
    fn home_of(&self, op: &Operand) -> Result<Option<String>> {
        match op {
            Operand::Var(v) => match v.storage {
                Storage::Global => Ok(Some(format!("[{}]", v.name))),
                Storage::Param => {
                    let index = self.params.get(v).ok_or_else(|| {
                        GenError::Internal(format!("unknown parameter '{}'", v.name))
                    })?;
                    Ok(Some(format!("[ebp + {}]", 8 + 4 * index)))
                }
                Storage::Local => Ok(self.frame.slot(op).map(str::to_string)),
            },
            Operand::Temp(_) => Ok(self.frame.slot(op).map(str::to_string)),
            Operand::Const(_) => Err(GenError::Internal(
                "constant operand has no home location".to_string(),
            )),
        }
    }

    /// Home address of a live place operand; an error when missing,
    /// since a live operand always has one.
    fn live_home(&self, op: &Operand) -> Result<String> {
        self.home_of(op)?
            .ok_or_else(|| GenError::Internal(format!("live operand without a home: {op}")))
    }

    fn emit_instr(&mut self, instr: &Instr) -> Result<()> {
        match instr {
            Instr::Def { var, init } => self.emit_def(var, init),
            Instr::Assign { src, dst } => self.emit_assign(src, dst),
            Instr::Bin { op, lhs, rhs, dst } => {
                if op.is_comparison() {
                    self.emit_comparison(*op, lhs, rhs, &Operand::Temp(*dst))
                } else {
                    self.emit_binary(*op, lhs, rhs, &Operand::Temp(*dst))
                }
            }
            Instr::Label(label) => {
                self.flush_block_boundary()?;
                self.emit(&format!("{label}:"));
                Ok(())
            }
            Instr::Goto(label) => {
                self.flush_block_boundary()?;
                self.emit(&format!("jmp {label}"));
                Ok(())
            }
            Instr::If { cond, target } => self.emit_if(cond, target),
            Instr::Param { .. } => Ok(()),
            Instr::Arg { value } => self.emit_arg(value),
            Instr::Call { func, argc, dst } => self.emit_call(*func, *argc, &Operand::Temp(*dst)),
            Instr::Ret { value } => self.emit_ret(value),
            Instr::Print { value } => self.emit_print(value),
            Instr::FuncStart(name) | Instr::FuncEnd(name) => Err(GenError::Internal(format!(
                "function marker for '{name}' inside a stream"
            ))),
        }
    }

    fn emit_def(&mut self, var: &Var, init: &Option<Const>) -> Result<()> {
        if var.storage != Storage::Local {
            return Err(GenError::Internal(format!(
                "def for non-local '{}' inside a stream",
                var.name
            )));
        }
        if let Some(c) = init {
            let op = Operand::Var(*var);
            if let Some(slot) = self.frame.slot(&op).map(str::to_string) {
                let (_, size) = specifiers(var.ty);
                self.emit(&format!("mov {size} {slot}, {}", c.value));
                self.descriptors.write_home(op, slot);
            }
        }
        Ok(())
    }

    fn emit_assign(&mut self, src: &Operand, dst: &Var) -> Result<()> {
        let dst_op = Operand::Var(*dst);
        let Some(home) = self.home_of(&dst_op)? else {
            // Never-live local: the store has no observable effect.
            return Ok(());
        };
        let (_, size) = specifiers(dst.ty);
        match src {
            Operand::Const(c) => {
                self.emit(&format!("mov {size} {home}, {}", c.value));
            }
            place => {
                let r = self.get_register(place, &[])?;
                self.emit(&format!("mov {size} {home}, {}", r.part(dst.ty)));
            }
        }
        self.descriptors.write_home(dst_op, home);
        Ok(())
    }

    fn emit_binary(&mut self, op: BinOp, lhs: &Operand, rhs: &Operand, dst: &Operand) -> Result<()> {
        let r1 = self.get_register(lhs, &[])?;

        // The result will clobber r1; preserve lhs when it outlives this
        // instruction.
        if lhs.is_place() && self.liveness.live_after(self.counter).contains(lhs) {
            let home = self.live_home(lhs)?;
            let (_, size) = specifiers(lhs.ty());
            self.emit(&format!("mov {size} {home}, {}", r1.part(lhs.ty())));
            self.descriptors.write_home(*lhs, home);
        }

        let rhs_loc = self.resolve_rhs(rhs, r1)?;
        if op == BinOp::Div {
            self.emit_division(r1, &rhs_loc)?;
        } else {
            let mnemonic = match op {
                BinOp::Add => "add",
                BinOp::Sub => "sub",
                BinOp::Mul => "imul",
                BinOp::And => "and",
                BinOp::Or => "or",
                other => {
                    return Err(GenError::Internal(format!(
                        "'{other}' handled as arithmetic"
                    )))
                }
            };
            let operand = match &rhs_loc {
                RhsLoc::Imm(value) => value.to_string(),
                RhsLoc::Reg(r) => r.name().to_string(),
                RhsLoc::Mem(mem) => mem.clone(),
            };
            self.emit(&format!("{mnemonic} {}, {operand}", r1.name()));
        }

        self.descriptors.attach(r1, *dst);
        Ok(())
    }

    /// Resolve the second operand as immediate, register, or dword
    /// memory. Bool memory operands are loaded through a register, since
    /// a byte location cannot combine with a 32-bit register operand.
    fn resolve_rhs(&mut self, rhs: &Operand, protected: Reg) -> Result<RhsLoc> {
        match rhs {
            Operand::Const(c) => Ok(RhsLoc::Imm(c.value)),
            place => {
                if let Some(r) = self.descriptors.register_holding(place) {
                    return Ok(RhsLoc::Reg(r));
                }
                if place.ty() == Ty::Int {
                    if let Some(mem) = self.descriptors.memory_location(place) {
                        return Ok(RhsLoc::Mem(mem.to_string()));
                    }
                }
                Ok(RhsLoc::Reg(self.get_register(place, &[protected])?))
            }
        }
    }

    fn emit_comparison(
        &mut self,
        op: BinOp,
        lhs: &Operand,
        rhs: &Operand,
        dst: &Operand,
    ) -> Result<()> {
        let r1 = self.get_register(lhs, &[])?;
        let (rhs_text, rhs_reg) = match rhs {
            Operand::Const(c) => (c.value.to_string(), None),
            place => {
                let r = self.get_register(place, &[r1])?;
                (r.name().to_string(), Some(r))
            }
        };

        let mut protected = vec![r1];
        protected.extend(rhs_reg);
        let rd = self.allocate_register(dst, &protected)?;

        self.emit(&format!("xor {0}, {0}", rd.name()));
        self.emit(&format!("cmp {}, {rhs_text}", r1.name()));
        let set = match op {
            BinOp::Lt => "setl",
            BinOp::Le => "setle",
            BinOp::Gt => "setg",
            BinOp::Ge => "setge",
            BinOp::Eq => "sete",
            BinOp::Ne => "setne",
            other => {
                return Err(GenError::Internal(format!(
                    "'{other}' handled as comparison"
                )))
            }
        };
        self.emit(&format!("{set} {}", rd.byte_name()));
        Ok(())
    }

    fn emit_if(&mut self, cond: &Operand, target: &str) -> Result<()> {
        let reg_name = match cond {
            Operand::Const(c) => {
                self.emit(&format!("mov edi, {}", c.value));
                "edi".to_string()
            }
            place => self.get_register(place, &[])?.name().to_string(),
        };
        // Write-backs are plain movs, so flags set by the cmp below are
        // not at risk; flush first, then compare and branch.
        self.flush_block_boundary()?;
        self.emit(&format!("cmp {reg_name}, 0"));
        self.emit(&format!("jne {target}"));
        Ok(())
    }

    fn emit_arg(&mut self, value: &Operand) -> Result<()> {
        match value {
            Operand::Const(c) => self.emit(&format!("push {}", c.value)),
            place => {
                if let Some(r) = self.descriptors.register_holding(place) {
                    self.emit(&format!("push {}", r.name()));
                } else {
                    let home = self.live_home(place)?;
                    match place.ty() {
                        Ty::Int => self.emit(&format!("push dword {home}")),
                        Ty::Bool => {
                            self.emit(&format!("movzx edi, byte {home}"));
                            self.emit("push edi");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn emit_call(&mut self, func: Symbol, argc: usize, dst: &Operand) -> Result<()> {
        // The callee may clobber every allocatable register: park live
        // values in memory and forget the register file.
        self.flush_block_boundary()?;
        self.emit(&format!("call {func}"));
        if argc > 0 {
            self.emit(&format!("add esp, {}", 4 * argc));
        }
        self.descriptors.attach(Reg::Eax, *dst);
        Ok(())
    }

    fn emit_ret(&mut self, value: &Operand) -> Result<()> {
        match value {
            Operand::Const(c) => self.emit(&format!("mov eax, {}", c.value)),
            place => match self.descriptors.register_holding(place) {
                Some(Reg::Eax) => {}
                Some(r) => self.emit(&format!("mov eax, {}", r.name())),
                None => {
                    let home = self.live_home(place)?;
                    match place.ty() {
                        Ty::Int => self.emit(&format!("mov eax, dword {home}")),
                        Ty::Bool => self.emit(&format!("movzx eax, byte {home}")),
                    }
                }
            },
        }
        self.emit("mov esp, ebp\npop ebp\nret");
        self.descriptors.clear_registers();
        Ok(())
    }

    fn emit_print(&mut self, value: &Operand) -> Result<()> {
        // One symmetric save region around the call and the newline
        // syscall: push every register holding a live operand, restore
        // in reverse.
        let mut saved: Vec<Reg> = Vec::new();
        for r in Reg::ALL {
            if let Some(op) = self.descriptors.holder(r) {
                if self.liveness.live_at(self.counter).contains(&op) {
                    self.emit(&format!("push {}", r.name()));
                    saved.push(r);
                }
            }
        }

        match value {
            Operand::Const(c) => self.emit(&format!("mov eax, {}", c.value)),
            place => match self.descriptors.register_holding(place) {
                Some(Reg::Eax) => {}
                Some(r) => self.emit(&format!("mov eax, {}", r.name())),
                None => {
                    let home = self.live_home(place)?;
                    match place.ty() {
                        Ty::Int => self.emit(&format!("mov eax, dword {home}")),
                        Ty::Bool => self.emit(&format!("movzx eax, byte {home}")),
                    }
                }
            },
        }
        match value.ty() {
            Ty::Bool => self.emit("call print_boolean"),
            Ty::Int => self.emit("call print_integer"),
        }
        self.emit("mov eax, 4\nmov ebx, 1\nmov ecx, newline\nmov edx, 1\nint 0x80");

        for r in saved.iter().rev() {
            self.emit(&format!("pop {}", r.name()));
        }

        // Registers whose holders died at this print are free again.
        for r in Reg::ALL {
            if let Some(op) = self.descriptors.holder(r) {
                if !self.liveness.live_at(self.counter).contains(&op) {
                    self.descriptors.free_register(r);
                }
            }
        }
        Ok(())
    }

    /// Signed division. `idiv` wants the dividend in `edx:eax` and
    /// clobbers both; the cases are keyed by which of the two the
    /// operands already occupy, staging through `edi` where needed and
    /// saving `eax`/`edx` only when they hold live values.
    fn emit_division(&mut self, r1: Reg, rhs: &RhsLoc) -> Result<()> {
        match (r1, rhs) {
            (Reg::Eax, RhsLoc::Reg(Reg::Edx)) => {
                self.emit("mov edi, edx\ncdq\nidiv edi\nmov edx, edi");
            }
            (Reg::Edx, RhsLoc::Reg(Reg::Eax)) => {
                self.emit("mov edi, eax\nmov eax, edx\ncdq\nidiv edi\nmov edx, eax\nmov eax, edi");
            }
            (Reg::Eax, rhs) => {
                let edx_saved = self.save_if_live(Reg::Edx);
                let divisor = self.stage_divisor(rhs);
                self.emit("cdq");
                self.emit(&format!("idiv {divisor}"));
                if edx_saved {
                    self.emit("pop edx");
                }
            }
            (r1, RhsLoc::Reg(Reg::Eax)) => {
                let edx_saved = self.save_if_live(Reg::Edx);
                self.emit("mov edi, eax");
                self.emit(&format!("mov eax, {}", r1.name()));
                self.emit("cdq\nidiv edi");
                self.emit(&format!("mov {}, eax", r1.name()));
                self.emit("mov eax, edi");
                if edx_saved {
                    self.emit("pop edx");
                }
            }
            (Reg::Edx, rhs) => {
                let eax_saved = self.save_if_live(Reg::Eax);
                let divisor = match rhs {
                    // edx is about to be overwritten by cdq; park the
                    // divisor first.
                    RhsLoc::Reg(Reg::Edx) => {
                        self.emit("mov edi, edx");
                        "edi".to_string()
                    }
                    other => self.stage_divisor(other),
                };
                self.emit("mov eax, edx\ncdq");
                self.emit(&format!("idiv {divisor}"));
                self.emit("mov edx, eax");
                if eax_saved {
                    self.emit("pop eax");
                }
            }
            (r1, RhsLoc::Reg(Reg::Edx)) => {
                let eax_saved = self.save_if_live(Reg::Eax);
                self.emit(&format!("mov eax, {}", r1.name()));
                self.emit("mov edi, edx\ncdq\nidiv edi");
                self.emit(&format!("mov {}, eax", r1.name()));
                self.emit("mov edx, edi");
                if eax_saved {
                    self.emit("pop eax");
                }
            }
            (r1, rhs) => {
                let eax_saved = self.save_if_live(Reg::Eax);
                let edx_saved = self.save_if_live(Reg::Edx);
                let divisor = self.stage_divisor(rhs);
                self.emit(&format!("mov eax, {}", r1.name()));
                self.emit("cdq");
                self.emit(&format!("idiv {divisor}"));
                self.emit(&format!("mov {}, eax", r1.name()));
                if edx_saved {
                    self.emit("pop edx");
                }
                if eax_saved {
                    self.emit("pop eax");
                }
            }
        }
        Ok(())
    }

    /// `idiv` takes no immediates; constants go through `edi`. Memory
    /// divisors need an explicit size.
    fn stage_divisor(&mut self, rhs: &RhsLoc) -> String {
        match rhs {
            RhsLoc::Imm(value) => {
                self.emit(&format!("mov edi, {value}"));
                "edi".to_string()
            }
            RhsLoc::Reg(r) => r.name().to_string(),
            RhsLoc::Mem(mem) => format!("dword {mem}"),
        }
    }

    /// Push `r` when it holds a value that must survive the division.
    fn save_if_live(&mut self, r: Reg) -> bool {
        if let Some(op) = self.descriptors.holder(r) {
            if self.liveness.live_at(self.counter).contains(&op) {
                self.emit(&format!("push {}", r.name()));
                return true;
            }
        }
        false
    }

    /// Write live register-resident operands back to their homes and
    /// clear the register file. Called at block boundaries and calls so
    /// every control-flow edge meets with all values in memory.
    fn flush_block_boundary(&mut self) -> Result<()> {
        for r in Reg::ALL {
            if let Some(op) = self.descriptors.holder(r) {
                if self.liveness.live_at(self.counter).contains(&op) {
                    let home = self.live_home(&op)?;
                    let (_, size) = specifiers(op.ty());
                    self.emit(&format!("mov {size} {home}, {}", r.part(op.ty())));
                    self.descriptors.write_home(op, home);
                }
            }
        }
        self.descriptors.clear_registers();
        Ok(())
    }

    /// The five-step register policy: reuse, free, dead holder, spill a
    /// global, spill anything.
    fn select_register(&mut self, protected: &[Reg]) -> Result<Reg> {
        for r in Reg::ALL {
            if !protected.contains(&r) && self.descriptors.holder(r).is_none() {
                return Ok(r);
            }
        }
        for r in Reg::ALL {
            if protected.contains(&r) {
                continue;
            }
            if let Some(op) = self.descriptors.holder(r) {
                if !self.liveness.live_at(self.counter).contains(&op) {
                    self.descriptors.free_register(r);
                    return Ok(r);
                }
            }
        }
        for r in Reg::ALL {
            if protected.contains(&r) {
                continue;
            }
            if let Some(Operand::Var(v)) = self.descriptors.holder(r) {
                if v.storage == Storage::Global {
                    self.spill(r)?;
                    return Ok(r);
                }
            }
        }
        for r in Reg::ALL {
            if !protected.contains(&r) {
                self.spill(r)?;
                return Ok(r);
            }
        }
        Err(GenError::Internal(
            "no allocatable register available".to_string(),
        ))
    }

    /// Write the holder of `r` back to its home and unbind it.
    fn spill(&mut self, r: Reg) -> Result<()> {
        let Some(op) = self.descriptors.holder(r) else {
            return Err(GenError::Internal(format!(
                "spill of empty register {}",
                r.name()
            )));
        };
        if matches!(op, Operand::Const(_)) {
            // Constants are rematerialized on demand.
            self.descriptors.free_register(r);
            return Ok(());
        }
        let home = self.live_home(&op)?;
        let (_, size) = specifiers(op.ty());
        self.emit(&format!("mov {size} {home}, {}", r.part(op.ty())));
        self.descriptors.write_home(op, home);
        Ok(())
    }

    /// Get `op` into a register, loading it from memory (or
    /// materializing a constant) when it is not already in one.
    fn get_register(&mut self, op: &Operand, protected: &[Reg]) -> Result<Reg> {
        if let Some(r) = self.descriptors.register_holding(op) {
            return Ok(r);
        }
        let r = self.select_register(protected)?;
        match op {
            Operand::Const(c) => {
                self.emit(&format!("mov {}, {}", r.name(), c.value));
            }
            place => {
                let home = self.live_home(place)?;
                match place.ty() {
                    Ty::Int => self.emit(&format!("mov {}, dword {home}", r.name())),
                    Ty::Bool => self.emit(&format!("movzx {}, byte {home}", r.name())),
                }
            }
        }
        self.descriptors.attach(r, *op);
        Ok(r)
    }

    /// Allocate a destination register for a freshly defined operand
    /// without loading its (meaningless) old value.
    fn allocate_register(&mut self, op: &Operand, protected: &[Reg]) -> Result<Reg> {
        if let Some(r) = self.descriptors.register_holding(op) {
            return Ok(r);
        }
        let r = self.select_register(protected)?;
        self.descriptors.attach(r, *op);
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micac_lex::language_tokenizer;
    use micac_par::parse;

    const TEST_RUNTIME: &str = "section .data\nnewline db 0xA\nsection .text\nprint_integer:\nret\nprint_boolean:\nret\n";

    fn compile(source: &str, optimize: bool) -> String {
        let tokens = language_tokenizer().unwrap().tokenize(source).unwrap();
        let mut program = parse(tokens).unwrap();
        micac_sem::analyze(&mut program).unwrap();
        let mut tac = micac_tac::generate(&program).unwrap();
        if optimize {
            micac_tac::optimize(&mut tac).unwrap();
        }
        generate(&tac, TEST_RUNTIME).unwrap()
    }

    #[test]
    fn test_sections_and_entry() {
        let asm = compile("var int x = 3; print(x);", false);
        assert!(asm.starts_with("section .data\n"));
        assert!(asm.contains("section .bss\n"));
        assert!(asm.contains("section .text\nglobal _start\n_start:\n"));
        // exit epilogue
        assert!(asm.contains("mov eax, 1\nxor ebx, ebx\nint 0x80\n"));
    }

    #[test]
    fn test_global_defs_in_data_section() {
        let asm = compile("var int x = 3; var bool t = true; var int u; print(x);", false);
        let data = &asm[..asm.find("section .text").unwrap()];
        assert!(data.contains("x dd 3\n"));
        assert!(data.contains("t db 1\n"));
        assert!(data.contains("u dd 0\n"));
    }

    #[test]
    fn test_print_integer_call_and_newline() {
        let asm = compile("var int x = 3; print(x);", false);
        assert!(asm.contains("call print_integer\n"));
        assert!(asm.contains("mov eax, 4\nmov ebx, 1\nmov ecx, newline\nmov edx, 1\nint 0x80\n"));
    }

    #[test]
    fn test_print_boolean_by_type() {
        let asm = compile("var bool t = true; print(t);", false);
        assert!(asm.contains("call print_boolean\n"));
        assert!(!asm.contains("call print_integer\n"));
    }

    #[test]
    fn test_comparison_lowering() {
        let asm = compile("var int a = 6; var int b = 4; if a > b do { print(a); }", false);
        assert!(asm.contains("setg "));
        assert!(asm.contains("jne L0\n"));
        assert!(asm.contains("jmp L1\n"));
        assert!(asm.contains("L0:\n"));
        assert!(asm.contains("L1:\n"));
    }

    #[test]
    fn test_division_uses_cdq_idiv() {
        let asm = compile("var int a = 7; var int b = 2; var int c; c = a / b; print(c);", false);
        assert!(asm.contains("cdq\n"));
        assert!(asm.contains("idiv "));
        // No immediate-form idiv can ever be emitted.
        for line in asm.lines() {
            if let Some(rest) = line.strip_prefix("idiv ") {
                assert!(
                    rest.chars().next().is_some_and(|c| !c.is_ascii_digit() && c != '-'),
                    "immediate idiv emitted: {line}"
                );
            }
        }
    }

    #[test]
    fn test_constant_divisor_staged_through_edi() {
        let asm = compile("var int a = 7; var int c; c = a / 2; print(c);", false);
        assert!(asm.contains("mov edi, 2\n"));
        assert!(asm.contains("idiv edi\n"));
    }

    #[test]
    fn test_function_gets_label_prologue_and_ret() {
        let asm = compile(
            "int add(int a, int b) { return a + b; } int main() { print(add(2, 40)); return 0; }",
            false,
        );
        assert!(asm.contains("add:\npush ebp\nmov ebp, esp\n"));
        assert!(asm.contains("main:\npush ebp\nmov ebp, esp\n"));
        assert!(asm.contains("mov esp, ebp\npop ebp\nret\n"));
        assert!(asm.contains("call main\n"));
        assert!(asm.contains("call add\n"));
        assert!(asm.contains("add esp, 8\n"));
    }

    #[test]
    fn test_params_read_above_ebp() {
        let asm = compile(
            "int first(int a, int b) { return a; } int main() { print(first(1, 2)); return 0; }",
            false,
        );
        assert!(asm.contains("[ebp + 8]"));
    }

    #[test]
    fn test_args_pushed_before_call() {
        let asm = compile(
            "int add(int a, int b) { return a + b; } int main() { print(add(2, 40)); return 0; }",
            true,
        );
        let push_40 = asm.find("push 40").unwrap();
        let push_2 = asm.find("push 2").unwrap();
        let call = asm.find("call add").unwrap();
        assert!(push_40 < push_2, "args must be pushed right-to-left");
        assert!(push_2 < call);
    }

    #[test]
    fn test_if_on_constant_uses_edi() {
        // Optimization folds the condition to a constant.
        let asm = compile("var int x = 7; if 1 < 2 do { x = 1; } print(x);", true);
        assert!(asm.contains("mov edi, 1\ncmp edi, 0\njne "));
    }

    #[test]
    fn test_reproducible_output() {
        let source = "var int x = 10; while x > 0 do { print(x); x = x - 1; }";
        assert_eq!(compile(source, true), compile(source, true));
        assert_eq!(compile(source, false), compile(source, false));
    }

    #[test]
    fn test_runtime_sections_merged() {
        let asm = compile("var int x = 1; print(x);", false);
        let data_end = asm.find("section .bss").unwrap();
        assert!(asm[..data_end].contains("newline db 0xA"));
        assert!(asm[asm.find("section .text").unwrap()..].contains("print_integer:"));
    }

    #[test]
    fn test_loop_variable_written_back_before_back_edge() {
        // x lives in a register inside the body; before the jump back to
        // the header it must be in memory, because the header reloads it.
        let asm = compile("var int x = 3; while x > 0 do { x = x - 1; }", false);
        let back_edge = asm.rfind("jmp L0").unwrap();
        let header = asm.find("L0:").unwrap();
        // The comparison after the header loads x from memory.
        let after_header = &asm[header..];
        assert!(after_header.contains("mov eax, dword [x]"));
        // Between body start and the back edge there is a store to [x].
        let body = &asm[asm.find("L1:").unwrap()..back_edge];
        assert!(body.contains("mov dword [x], "));
    }
}
