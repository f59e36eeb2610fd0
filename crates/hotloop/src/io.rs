//! Diagnostic output sinks.
//!
//! The engine never writes to a process-wide stream; it is parameterized
//! over a [`DiagSink`] that receives the trace dumps emitted on commit and
//! the jump-target profile emitted on HALT. [`StdDiag`] is the default for
//! command-line use; [`CollectDiag`] captures output for tests and
//! embedders.

use std::io::{self, Write as _};

/// Receiver for the engine's diagnostic stream.
pub trait DiagSink {
    /// Called with each chunk of diagnostic text. Chunks carry their own
    /// newlines; the sink must not add separators.
    fn write(&mut self, text: &str);
}

/// Default sink that writes diagnostics to stdout.
#[derive(Debug, Default)]
pub struct StdDiag;

impl DiagSink for StdDiag {
    fn write(&mut self, text: &str) {
        let _ = io::stdout().write_all(text.as_bytes());
    }
}

/// Sink that collects all diagnostics into a string.
#[derive(Debug, Default)]
pub struct CollectDiag(String);

impl CollectDiag {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self(String::new())
    }

    /// The collected output so far.
    #[must_use]
    pub fn output(&self) -> &str {
        self.0.as_str()
    }

    /// Consumes the sink and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl DiagSink for CollectDiag {
    fn write(&mut self, text: &str) {
        self.0.push_str(text);
    }
}

/// Sink that discards all diagnostics.
#[derive(Debug, Default)]
pub struct NoDiag;

impl DiagSink for NoDiag {
    fn write(&mut self, _text: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_preserves_chunks_verbatim() {
        let mut sink = CollectDiag::new();
        sink.write("8: [\n");
        sink.write("    add\n");
        sink.write("]\n\n");
        assert_eq!(sink.output(), "8: [\n    add\n]\n\n");
        assert_eq!(sink.into_output(), "8: [\n    add\n]\n\n");
    }
}
