//! The execution engine: base interpreter, recording, and trace dispatch.
//!
//! The driver loop arbitrates between three modes. In the common case it
//! runs the classical fetch-dispatch-execute loop. When a program counter
//! becomes hot (its jump-target count reaches the threshold) the recorder
//! starts buffering the instructions the base loop executes, rewriting
//! conditional branches and returns into guards; when control returns to
//! the head PC the buffer is committed as a trace. Thereafter, arriving at
//! a traced PC hands control to the dispatcher, which replays the trace
//! cyclically until a guard fires and returns a fall-through PC.
//!
//! Recording and replay never change observable semantics: a guard's exit
//! PC is exactly the branch the recorded iteration did not take, so any
//! divergent input falls back to the base interpreter at the right place.

use crate::{
    error::{VmError, VmResult},
    inst::{Cell, Inst, Program},
    io::DiagSink,
    observer::VmObserver,
    profile::Profile,
    stack::OperandStack,
    trace::{Recorder, TRACE_LIMIT, Trace, TraceTable},
};

/// Final state of a run that reached HALT.
#[derive(Debug)]
pub struct Halted {
    /// The operand stack at HALT, bottom first. This is the program's
    /// result.
    pub stack: Vec<Cell>,
    /// Jump-target counts accumulated over the run.
    pub profile: Profile,
    /// Traces committed during the run.
    pub traces: TraceTable,
}

/// The virtual machine for one run of a program.
///
/// Owns the operand stack, profile, trace table, and recorder; borrows the
/// program and the diagnostic sink. The observer is carried by value as a
/// type parameter so no-op observation compiles away.
pub struct Vm<'p, D: DiagSink, O: VmObserver> {
    program: &'p Program,
    diag: &'p mut D,
    observer: O,
    stack: OperandStack,
    profile: Profile,
    traces: TraceTable,
    recorder: Recorder,
    tracing: bool,
    pc: usize,
}

impl<'p, D: DiagSink, O: VmObserver> Vm<'p, D, O> {
    /// Creates a machine positioned at PC 0 with an empty stack.
    ///
    /// When `tracing` is false the machine is a pure base interpreter: no
    /// profile-triggered recording and no trace dispatch.
    #[must_use]
    pub fn new(program: &'p Program, tracing: bool, diag: &'p mut D, observer: O) -> Self {
        Self {
            program,
            diag,
            observer,
            stack: OperandStack::new(),
            profile: Profile::new(),
            traces: TraceTable::new(),
            recorder: Recorder::default(),
            tracing,
            pc: 0,
        }
    }

    /// Drives the program to HALT and returns the final state.
    pub fn run(mut self) -> VmResult<Halted> {
        loop {
            if self.recorder.is_recording() && self.recorder.len() >= TRACE_LIMIT {
                // Saturated: this loop does not close on itself within the
                // cap. Abandon the buffer; the head may be re-attempted.
                let head_pc = self.recorder.head_pc();
                let len = self.recorder.len();
                self.recorder.abort();
                self.observer.on_record_abort(head_pc, len);
            } else if self.tracing
                && !self.recorder.is_recording()
                && !self.recorder.has_buffered()
                && self.profile.is_hot(self.pc)
                && !self.traces.contains(self.pc)
            {
                self.recorder.start(self.pc);
                self.observer.on_record_start(self.pc);
            } else if self.recorder.is_recording()
                && self.pc == self.recorder.head_pc()
                && self.recorder.has_buffered()
            {
                // Control returned to the head: the loop closed.
                let trace = self.recorder.commit();
                trace.dump(self.pc, self.diag);
                self.observer.on_trace_commit(self.pc, trace.len());
                self.traces.insert(self.pc, trace);
            }

            if !self.recorder.is_recording()
                && let Some(trace) = self.traces.get(self.pc)
            {
                let head_pc = self.pc;
                self.observer.on_trace_enter(head_pc);
                let exit_pc = replay(trace, &mut self.stack)?;
                self.observer.on_trace_exit(head_pc, exit_pc);
                self.profile.bump(exit_pc);
                self.pc = exit_pc;
                continue;
            }

            if self.step()? {
                break;
            }
        }

        Ok(Halted {
            stack: self.stack.into_cells(),
            profile: self.profile,
            traces: self.traces,
        })
    }

    /// Executes one instruction in the base interpreter, recording it if a
    /// trace is being built. Returns true on HALT.
    fn step(&mut self) -> VmResult<bool> {
        let inst = self.program.fetch(self.pc)?;
        self.observer.on_instruction(self.pc, inst.kind(), self.stack.depth());

        match inst {
            Inst::Halt => {
                // An in-progress recording dies with the run.
                self.profile.dump(self.diag);
                return Ok(true);
            }
            Inst::Label(_) => self.pc += 1,
            Inst::Jump(target) => {
                // Merges are implicit in a straight-line trace; nothing is
                // recorded.
                self.pc = *target;
                self.profile.bump(*target);
            }
            Inst::Jz(target) => {
                let fall_through = self.pc + 1;
                if self.stack.pop()?.as_bool() {
                    // Not taken at record time: replay must exit to the
                    // branch target if the condition ever turns false.
                    self.record(Inst::GuardFalse(*target));
                    self.pc = fall_through;
                } else {
                    self.record(Inst::GuardTrue(fall_through));
                    self.pc = *target;
                }
            }
            Inst::Ret => {
                let target = self.stack.pop()?.as_pc();
                // Pin the return PC seen at record time; replay bails out to
                // whatever other PC a later return produces.
                self.record(Inst::GuardRet(target));
                self.pc = target;
            }
            Inst::Dup(offset) => {
                self.record(Inst::Dup(*offset));
                let cell = self.stack.peek(*offset)?;
                self.stack.push(cell)?;
                self.pc += 1;
            }
            Inst::Swap(offset) => {
                self.record(Inst::Swap(*offset));
                self.stack.swap(*offset)?;
                self.pc += 1;
            }
            Inst::Drop(count) => {
                self.record(Inst::Drop(*count));
                self.stack.truncate(*count)?;
                self.pc += 1;
            }
            Inst::PushInt(value) => {
                self.record(Inst::PushInt(*value));
                self.stack.push(Cell::from_int(*value))?;
                self.pc += 1;
            }
            Inst::PushLabel(target) => {
                self.record(Inst::PushLabel(*target));
                self.stack.push(Cell::from_pc(*target))?;
                self.pc += 1;
            }
            Inst::Eq => {
                self.record(Inst::Eq);
                binary_op(&mut self.stack, |a, b| Cell::from_bool(a == b))?;
                self.pc += 1;
            }
            Inst::Ge => {
                self.record(Inst::Ge);
                binary_op(&mut self.stack, |a, b| Cell::from_bool(a >= b))?;
                self.pc += 1;
            }
            Inst::Add => {
                self.record(Inst::Add);
                binary_op(&mut self.stack, |a, b| Cell::from_int(a.wrapping_add(b)))?;
                self.pc += 1;
            }
            Inst::GuardFalse(_) | Inst::GuardTrue(_) | Inst::GuardRet(_) => {
                return Err(VmError::GuardOutsideTrace { pc: self.pc });
            }
        }

        Ok(false)
    }

    fn record(&mut self, inst: Inst) {
        if self.recorder.is_recording() {
            self.recorder.record(inst);
        }
    }
}

/// Pops `b`, then `a`, and pushes `op(a, b)` interpreted as signed integers.
fn binary_op(stack: &mut OperandStack, op: impl FnOnce(i64, i64) -> Cell) -> VmResult<()> {
    let b = stack.pop()?;
    let a = stack.pop()?;
    stack.push(op(a.as_int(), b.as_int()))
}

/// Replays a committed trace cyclically until a guard fires, returning the
/// fall-through PC for the base interpreter.
///
/// The trace index wraps modulo the trace length, so reaching the end of
/// the sequence re-enters the loop at its head. Control-flow instructions
/// cannot appear here: recording rewrote or elided them all, and replaying
/// one is a fatal invariant violation rather than an assumed impossibility.
fn replay(trace: &Trace, stack: &mut OperandStack) -> VmResult<usize> {
    let insts = trace.insts();
    let len = insts.len();

    let mut index = 0;
    loop {
        match &insts[index] {
            Inst::Dup(offset) => {
                let cell = stack.peek(*offset)?;
                stack.push(cell)?;
            }
            Inst::Swap(offset) => stack.swap(*offset)?,
            Inst::Drop(count) => stack.truncate(*count)?,
            Inst::PushInt(value) => stack.push(Cell::from_int(*value))?,
            Inst::PushLabel(target) => stack.push(Cell::from_pc(*target))?,
            Inst::Eq => binary_op(stack, |a, b| Cell::from_bool(a == b))?,
            Inst::Ge => binary_op(stack, |a, b| Cell::from_bool(a >= b))?,
            Inst::Add => binary_op(stack, |a, b| Cell::from_int(a.wrapping_add(b)))?,
            Inst::GuardFalse(exit) => {
                if !stack.pop()?.as_bool() {
                    return Ok(*exit);
                }
            }
            Inst::GuardTrue(exit) => {
                if stack.pop()?.as_bool() {
                    return Ok(*exit);
                }
            }
            Inst::GuardRet(expected) => {
                let target = stack.pop()?.as_pc();
                if target != *expected {
                    return Ok(target);
                }
            }
            other => {
                return Err(VmError::UnexpectedInTrace { kind: other.kind() });
            }
        }
        index = (index + 1) % len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{inst::InstKind, io::NoDiag, observer::NoopObserver};

    #[test]
    fn guard_in_loaded_program_is_fatal() {
        let program = Program::new(vec![Inst::PushInt(1), Inst::GuardTrue(0), Inst::Halt]);
        let mut diag = NoDiag;
        let err = Vm::new(&program, false, &mut diag, NoopObserver).run().unwrap_err();
        assert_eq!(err, VmError::GuardOutsideTrace { pc: 1 });
    }

    #[test]
    fn running_off_the_end_is_fatal() {
        let program = Program::new(vec![Inst::PushInt(1)]);
        let mut diag = NoDiag;
        let err = Vm::new(&program, false, &mut diag, NoopObserver).run().unwrap_err();
        assert_eq!(err, VmError::PcOutOfBounds { pc: 1 });
    }

    #[test]
    fn control_flow_inside_a_trace_is_fatal() {
        // Hand-build a malformed trace via the recorder to exercise the
        // dispatcher's invariant check.
        let mut recorder = Recorder::default();
        recorder.start(0);
        recorder.record(Inst::Ret);
        let trace = recorder.commit();

        let mut stack = OperandStack::new();
        let err = replay(&trace, &mut stack).unwrap_err();
        assert_eq!(err, VmError::UnexpectedInTrace { kind: InstKind::Ret });
    }
}
