//! Top-level embedding API.

use crate::{
    error::{LoadError, VmResult},
    inst::Program,
    io::{DiagSink, NoDiag},
    observer::{NoopObserver, VmObserver},
    parse,
    vm::{Halted, Vm},
};

/// Loads a program once and runs it any number of times.
///
/// Each run starts from a fresh machine: an empty stack, a zeroed profile,
/// and an empty trace table. Trace formation is a per-run optimization, not
/// persisted state.
#[derive(Debug, Clone)]
pub struct Runner {
    program: Program,
}

impl Runner {
    /// Parses and resolves `source` into an executable program.
    pub fn new(source: &str) -> Result<Self, LoadError> {
        Ok(Self {
            program: parse::load(source)?,
        })
    }

    /// The loaded program.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Runs the program with the given diagnostic sink and observer.
    ///
    /// When `tracing` is false the run is pure base interpretation; the
    /// returned trace table is then always empty.
    pub fn run<D: DiagSink, O: VmObserver>(&self, tracing: bool, diag: &mut D, observer: O) -> VmResult<Halted> {
        Vm::new(&self.program, tracing, diag, observer).run()
    }

    /// Runs with diagnostics and observation disabled.
    pub fn run_silent(&self, tracing: bool) -> VmResult<Halted> {
        self.run(tracing, &mut NoDiag, NoopObserver)
    }
}
