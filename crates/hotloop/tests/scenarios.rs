//! End-to-end programs driven through the public Runner API.
//!
//! Each program runs with tracing disabled and enabled; the final stack must
//! be identical either way, since trace formation never changes observable
//! results.

use hotloop::{Runner, VmError};

/// Runs `source` and returns the final stack as signed integers, bottom first.
fn run_stack(source: &str, tracing: bool) -> Vec<i64> {
    let runner = Runner::new(source).unwrap();
    let halted = runner.run_silent(tracing).unwrap();
    halted.stack.iter().map(|cell| cell.as_int()).collect()
}

/// The canonical loop + subroutine program: sums the integers 0..=100.
const SUM_1_TO_N: &str = "
        push .return
        push 100
        jump sum_1_to_n
.return:
        halt
sum_1_to_n:
        push 0
.ws:
        dup 1
        push 0
        ge
        jz .we
        dup 1
        add
        swap 1
        push -1
        add
        swap 1
        jump .ws
.we:
        swap 1
        drop 1
        swap 1
        ret
";

#[test]
fn trivial_halt() {
    assert_eq!(run_stack("halt", false), Vec::<i64>::new());
    assert_eq!(run_stack("halt", true), Vec::<i64>::new());
}

#[test]
fn integer_identity() {
    assert_eq!(run_stack("push 7  halt", false), [7]);
    assert_eq!(run_stack("push 7  halt", true), [7]);
}

#[test]
fn comparisons() {
    assert_eq!(run_stack("push 3 push 3 eq halt", false), [1]);
    assert_eq!(run_stack("push 2 push 5 eq halt", false), [0]);
    assert_eq!(run_stack("push 2 push 5 ge halt", false), [0]);
    assert_eq!(run_stack("push 5 push 2 ge halt", false), [1]);
    assert_eq!(run_stack("push 5 push 5 ge halt", false), [1]);
}

#[test]
fn swap_and_drop() {
    assert_eq!(run_stack("push 1 push 2 push 3 swap 2 drop 1 halt", false), [3, 2]);
    assert_eq!(run_stack("push 1 push 2 push 3 swap 2 drop 1 halt", true), [3, 2]);
}

#[test]
fn add_wraps_two_complement() {
    let source = "push 9223372036854775807 push 1 add halt";
    assert_eq!(run_stack(source, false), [i64::MIN]);
}

#[test]
fn sum_1_to_100_without_tracing() {
    assert_eq!(run_stack(SUM_1_TO_N, false), [5050]);
}

#[test]
fn sum_1_to_100_with_tracing() {
    let runner = Runner::new(SUM_1_TO_N).unwrap();
    let halted = runner.run_silent(true).unwrap();

    assert_eq!(halted.stack.len(), 1);
    assert_eq!(halted.stack[0].as_int(), 5050);

    // One trace forms, headed at the loop label `.ws` (instruction index 8).
    assert_eq!(halted.traces.len(), 1);
    let trace = halted.traces.get(8).expect("loop head should be traced");
    assert!(trace.len() <= hotloop::TRACE_LIMIT);
}

#[test]
fn subroutine_return_lands_after_the_call() {
    // The pushed label resolves past the `jump`, so `ret` resumes there.
    let source = "
push .back
jump sub
.back:
push 1
halt
sub:
push 2
swap 1
ret
";
    assert_eq!(run_stack(source, false), [2, 1]);
    assert_eq!(run_stack(source, true), [2, 1]);
}

#[test]
fn runtime_faults_are_fatal() {
    let fault = |source: &str| Runner::new(source).unwrap().run_silent(false).unwrap_err();

    assert_eq!(fault("push 1 swap 0 halt"), VmError::SwapTop);
    assert_eq!(fault("add halt"), VmError::StackUnderflow);
    assert_eq!(fault("push 1 drop 2 halt"), VmError::StackUnderflow);
    assert_eq!(fault("push 1 dup 3 halt"), VmError::StackUnderflow);
    assert_eq!(fault("ret"), VmError::StackUnderflow);
    assert_eq!(fault("push 1"), VmError::PcOutOfBounds { pc: 1 });
}
