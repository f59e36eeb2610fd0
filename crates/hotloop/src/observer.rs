//! Execution observability hooks.
//!
//! The engine carries an observer as a type parameter, so with
//! [`NoopObserver`] every hook monomorphizes to nothing and the dispatch
//! loops pay no cost. Implementations override only the hooks they care
//! about.
//!
//! | Observer | Purpose |
//! |----------|---------|
//! | [`NoopObserver`] | Zero-cost no-op (production default) |
//! | [`StderrObserver`] | Human-readable execution log to stderr |
//! | [`StatsObserver`] | Instruction frequency and trace-lifecycle counters |

use std::fmt;

use ahash::AHashMap;

use crate::inst::InstKind;

/// Trait for observing engine execution.
///
/// All methods have default no-op bodies. `on_instruction` fires for every
/// base-interpreter dispatch (not for instructions replayed inside a trace);
/// the trace-lifecycle hooks fire as the recorder and dispatcher change
/// state.
pub trait VmObserver: fmt::Debug {
    /// Called before each base-interpreter dispatch.
    #[inline]
    fn on_instruction(&mut self, _pc: usize, _kind: InstKind, _stack_depth: usize) {}

    /// Called when the recorder starts at a hot PC.
    #[inline]
    fn on_record_start(&mut self, _head_pc: usize) {}

    /// Called when a recording is abandoned at the length cap.
    #[inline]
    fn on_record_abort(&mut self, _head_pc: usize, _len: usize) {}

    /// Called when a recording closes and its trace is committed.
    #[inline]
    fn on_trace_commit(&mut self, _head_pc: usize, _len: usize) {}

    /// Called when the dispatcher enters a committed trace.
    #[inline]
    fn on_trace_enter(&mut self, _head_pc: usize) {}

    /// Called when a guard fires and the trace returns an exit PC.
    #[inline]
    fn on_trace_exit(&mut self, _head_pc: usize, _exit_pc: usize) {}
}

/// Mutable references forward every hook, so a caller can lend an observer
/// to a run and inspect it afterwards.
impl<O: VmObserver> VmObserver for &mut O {
    #[inline]
    fn on_instruction(&mut self, pc: usize, kind: InstKind, stack_depth: usize) {
        (**self).on_instruction(pc, kind, stack_depth);
    }

    #[inline]
    fn on_record_start(&mut self, head_pc: usize) {
        (**self).on_record_start(head_pc);
    }

    #[inline]
    fn on_record_abort(&mut self, head_pc: usize, len: usize) {
        (**self).on_record_abort(head_pc, len);
    }

    #[inline]
    fn on_trace_commit(&mut self, head_pc: usize, len: usize) {
        (**self).on_trace_commit(head_pc, len);
    }

    #[inline]
    fn on_trace_enter(&mut self, head_pc: usize) {
        (**self).on_trace_enter(head_pc);
    }

    #[inline]
    fn on_trace_exit(&mut self, head_pc: usize, exit_pc: usize) {
        (**self).on_trace_exit(head_pc, exit_pc);
    }
}

/// An observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl VmObserver for NoopObserver {}

/// Observer that prints a human-readable execution log to stderr.
///
/// Output format:
/// ```text
/// [    2] PushInt  stack=1
/// [    3] Add  stack=2
///   >>> RECORD @2
///   +++ COMMIT @2 (4 insts)
///   <<< EXIT @2 -> 8
/// ```
#[derive(Debug)]
pub struct StderrObserver {
    /// Maximum number of instructions to log before going quiet (prevents
    /// runaway output on loops). None = unlimited.
    limit: Option<usize>,
    /// Number of instructions logged so far.
    count: usize,
    /// Whether logging stopped (hit the limit).
    stopped: bool,
}

impl StderrObserver {
    /// Creates a stderr observer with no instruction limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: None,
            count: 0,
            stopped: false,
        }
    }

    /// Creates a stderr observer that goes quiet after `limit` instructions.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
            stopped: false,
        }
    }
}

impl Default for StderrObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl VmObserver for StderrObserver {
    #[inline]
    fn on_instruction(&mut self, pc: usize, kind: InstKind, stack_depth: usize) {
        if self.stopped {
            return;
        }
        eprintln!("[{pc:>5}] {kind:?}  stack={stack_depth}");
        self.count += 1;
        if let Some(limit) = self.limit
            && self.count >= limit
        {
            eprintln!("--- log limit reached ({limit} instructions) ---");
            self.stopped = true;
        }
    }

    fn on_record_start(&mut self, head_pc: usize) {
        if self.stopped {
            return;
        }
        eprintln!("  >>> RECORD @{head_pc}");
    }

    fn on_record_abort(&mut self, head_pc: usize, len: usize) {
        if self.stopped {
            return;
        }
        eprintln!("  xxx ABORT @{head_pc} after {len} insts");
    }

    fn on_trace_commit(&mut self, head_pc: usize, len: usize) {
        if self.stopped {
            return;
        }
        eprintln!("  +++ COMMIT @{head_pc} ({len} insts)");
    }

    fn on_trace_enter(&mut self, head_pc: usize) {
        if self.stopped {
            return;
        }
        eprintln!("  --- TRACE @{head_pc}");
    }

    fn on_trace_exit(&mut self, head_pc: usize, exit_pc: usize) {
        if self.stopped {
            return;
        }
        eprintln!("  <<< EXIT @{head_pc} -> {exit_pc}");
    }
}

/// Observer that collects execution statistics.
///
/// Retrieve results via [`StatsObserver::report`] after the run.
#[derive(Debug, Default)]
pub struct StatsObserver {
    kind_counts: AHashMap<InstKind, u64>,
    instructions: u64,
    records_started: u64,
    records_aborted: u64,
    traces_committed: u64,
    trace_entries: u64,
    guard_exits: u64,
    max_stack_depth: usize,
}

/// Summary report from a [`StatsObserver`].
#[derive(Debug)]
pub struct StatsReport {
    /// Per-kind dispatch counts, sorted by frequency (highest first).
    pub kind_counts: Vec<(InstKind, u64)>,
    /// Total base-interpreter dispatches.
    pub instructions: u64,
    /// Recordings started.
    pub records_started: u64,
    /// Recordings abandoned at the length cap.
    pub records_aborted: u64,
    /// Traces committed.
    pub traces_committed: u64,
    /// Times the dispatcher entered a trace.
    pub trace_entries: u64,
    /// Guard-triggered trace exits.
    pub guard_exits: u64,
    /// Maximum operand-stack depth observed at dispatch time.
    pub max_stack_depth: usize,
}

impl StatsObserver {
    /// Creates a stats observer with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a report from the collected counters.
    #[must_use]
    pub fn report(&self) -> StatsReport {
        let mut kind_counts: Vec<_> = self.kind_counts.iter().map(|(&k, &v)| (k, v)).collect();
        kind_counts.sort_by(|a, b| b.1.cmp(&a.1));
        StatsReport {
            kind_counts,
            instructions: self.instructions,
            records_started: self.records_started,
            records_aborted: self.records_aborted,
            traces_committed: self.traces_committed,
            trace_entries: self.trace_entries,
            guard_exits: self.guard_exits,
            max_stack_depth: self.max_stack_depth,
        }
    }
}

impl VmObserver for StatsObserver {
    #[inline]
    fn on_instruction(&mut self, _pc: usize, kind: InstKind, stack_depth: usize) {
        *self.kind_counts.entry(kind).or_insert(0) += 1;
        self.instructions += 1;
        if stack_depth > self.max_stack_depth {
            self.max_stack_depth = stack_depth;
        }
    }

    fn on_record_start(&mut self, _head_pc: usize) {
        self.records_started += 1;
    }

    fn on_record_abort(&mut self, _head_pc: usize, _len: usize) {
        self.records_aborted += 1;
    }

    fn on_trace_commit(&mut self, _head_pc: usize, _len: usize) {
        self.traces_committed += 1;
    }

    fn on_trace_enter(&mut self, _head_pc: usize) {
        self.trace_entries += 1;
    }

    fn on_trace_exit(&mut self, _head_pc: usize, _exit_pc: usize) {
        self.guard_exits += 1;
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Execution Report ===")?;
        writeln!(f, "Instructions dispatched: {}", self.instructions)?;
        writeln!(f, "Recordings started:      {}", self.records_started)?;
        writeln!(f, "Recordings aborted:      {}", self.records_aborted)?;
        writeln!(f, "Traces committed:        {}", self.traces_committed)?;
        writeln!(f, "Trace entries:           {}", self.trace_entries)?;
        writeln!(f, "Guard exits:             {}", self.guard_exits)?;
        writeln!(f, "Max stack depth:         {}", self.max_stack_depth)?;
        writeln!(f)?;
        writeln!(f, "--- Instruction Frequency ---")?;
        for (kind, count) in &self.kind_counts {
            writeln!(f, "  {kind:<10?} {count:>10}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_collects_counts() {
        let mut observer = StatsObserver::new();
        observer.on_instruction(0, InstKind::PushInt, 0);
        observer.on_instruction(1, InstKind::PushInt, 1);
        observer.on_instruction(2, InstKind::Add, 2);
        observer.on_record_start(2);
        observer.on_trace_commit(2, 4);
        observer.on_trace_enter(2);
        observer.on_trace_exit(2, 8);

        let report = observer.report();
        assert_eq!(report.instructions, 3);
        assert_eq!(report.kind_counts[0], (InstKind::PushInt, 2));
        assert_eq!(report.max_stack_depth, 2);
        assert_eq!(report.traces_committed, 1);
        assert_eq!(report.guard_exits, 1);
    }
}
