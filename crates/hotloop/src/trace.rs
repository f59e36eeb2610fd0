//! Recorded traces, the trace table, and the recorder state machine.
//!
//! A trace is the straight-line instruction sequence observed while a hot
//! loop ran once: straight-line operations are kept verbatim, conditional
//! branches and returns become guards, and unconditional jumps vanish. The
//! recorder accumulates the in-progress sequence; the driver commits it into
//! the [`TraceTable`] when control returns to the head PC, or abandons it at
//! [`TRACE_LIMIT`].

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{inst::Inst, io::DiagSink};

/// Maximum instructions a recording may accumulate before it is abandoned.
pub const TRACE_LIMIT: usize = 100;

/// A committed straight-line trace, replayed cyclically from its head PC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    insts: Vec<Inst>,
}

impl Trace {
    /// The recorded instruction sequence.
    #[must_use]
    pub fn insts(&self) -> &[Inst] {
        &self.insts
    }

    /// Number of recorded instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.insts.len()
    }

    /// True when the trace holds no instructions. Committed traces never
    /// are; this exists for completeness of the container API.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    /// Emits the commit-time dump: the head PC, then each instruction
    /// indented four spaces.
    pub(crate) fn dump(&self, head_pc: usize, sink: &mut impl DiagSink) {
        sink.write(&format!("{head_pc}: [\n"));
        for inst in &self.insts {
            sink.write(&format!("    {inst}\n"));
        }
        sink.write("]\n\n");
    }
}

/// Committed traces keyed by their head PC.
#[derive(Debug, Default)]
pub struct TraceTable {
    traces: AHashMap<usize, Trace>,
}

impl TraceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            traces: AHashMap::new(),
        }
    }

    /// The trace whose head is `head_pc`, if one has been committed.
    #[must_use]
    pub fn get(&self, head_pc: usize) -> Option<&Trace> {
        self.traces.get(&head_pc)
    }

    /// True when a trace has been committed for `head_pc`.
    #[must_use]
    pub fn contains(&self, head_pc: usize) -> bool {
        self.traces.contains_key(&head_pc)
    }

    /// Number of committed traces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// True when no trace has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Head PCs with committed traces, sorted.
    #[must_use]
    pub fn heads(&self) -> Vec<usize> {
        let mut heads: Vec<usize> = self.traces.keys().copied().collect();
        heads.sort_unstable();
        heads
    }

    pub(crate) fn insert(&mut self, head_pc: usize, trace: Trace) {
        self.traces.insert(head_pc, trace);
    }
}

/// The in-progress recording state.
///
/// Holds at most [`TRACE_LIMIT`] instructions; most committed traces are
/// short, so the buffer stores the common case inline.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    recording: bool,
    head_pc: usize,
    buffer: SmallVec<[Inst; 16]>,
}

impl Recorder {
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn head_pc(&self) -> usize {
        self.head_pc
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Begins recording with `head_pc` as the replay entry point.
    pub fn start(&mut self, head_pc: usize) {
        debug_assert!(!self.recording);
        self.recording = true;
        self.head_pc = head_pc;
        self.buffer.clear();
    }

    pub fn record(&mut self, inst: Inst) {
        self.buffer.push(inst);
    }

    /// Discards the in-progress buffer without committing.
    pub fn abort(&mut self) {
        self.recording = false;
        self.buffer.clear();
    }

    /// Ends the recording and hands the buffered sequence over as a trace.
    pub fn commit(&mut self) -> Trace {
        self.recording = false;
        Trace {
            insts: self.buffer.drain(..).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CollectDiag;

    #[test]
    fn recorder_lifecycle() {
        let mut recorder = Recorder::default();
        assert!(!recorder.is_recording());

        recorder.start(8);
        assert!(recorder.is_recording());
        assert_eq!(recorder.head_pc(), 8);
        assert!(!recorder.has_buffered());

        recorder.record(Inst::Dup(1));
        recorder.record(Inst::GuardFalse(20));
        assert_eq!(recorder.len(), 2);

        let trace = recorder.commit();
        assert!(!recorder.is_recording());
        assert!(!recorder.has_buffered());
        assert_eq!(trace.insts(), &[Inst::Dup(1), Inst::GuardFalse(20)]);
    }

    #[test]
    fn abort_discards_the_buffer() {
        let mut recorder = Recorder::default();
        recorder.start(3);
        recorder.record(Inst::Add);
        recorder.abort();
        assert!(!recorder.is_recording());
        assert!(!recorder.has_buffered());

        // An abandoned head may be re-attempted later.
        recorder.start(3);
        assert!(recorder.is_recording());
    }

    #[test]
    fn commit_dump_format() {
        let mut recorder = Recorder::default();
        recorder.start(8);
        recorder.record(Inst::PushInt(-1));
        recorder.record(Inst::Add);
        recorder.record(Inst::GuardFalse(20));
        let trace = recorder.commit();

        let mut sink = CollectDiag::new();
        trace.dump(8, &mut sink);
        assert_eq!(sink.output(), "8: [\n    push-int -1\n    add\n    guard-false 20\n]\n\n");
    }
}
