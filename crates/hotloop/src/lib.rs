#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_wrap, reason = "cell reinterpretation is intentional")]
#![expect(clippy::cast_sign_loss, reason = "cell reinterpretation is intentional")]
#![expect(clippy::cast_possible_truncation, reason = "cells and pointers share a width")]

mod error;
mod inst;
mod io;
mod observer;
mod parse;
mod profile;
mod run;
mod stack;
mod trace;
mod vm;

pub use crate::{
    error::{LoadError, VmError, VmResult},
    inst::{Cell, Inst, InstKind, Program, format_stack},
    io::{CollectDiag, DiagSink, NoDiag, StdDiag},
    observer::{NoopObserver, StatsObserver, StatsReport, StderrObserver, VmObserver},
    parse::load,
    profile::{HOT_THRESHOLD, Profile},
    run::Runner,
    stack::{OperandStack, STACK_CAPACITY},
    trace::{TRACE_LIMIT, Trace, TraceTable},
    vm::{Halted, Vm},
};
