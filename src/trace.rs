// src/trace.rs

//! Plain-text decision trace.
//!
//! Separate from `tracing` logs: the trace is a fixed, line-oriented record
//! of every scheduling decision, meant to be diffed against a known-good run.
//! Lines look like
//!
//! ```text
//! Taskmaster:     Considering node <no_state   0   'n3'> and its children:
//! Task.prepare():      node <executing  0   'n1'>
//! ```

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared handle to the trace sink.
#[derive(Clone)]
pub struct Trace {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Trace {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// A trace writing into memory, plus a handle to read it back.
    pub fn buffer() -> (Self, TraceBuffer) {
        let buffer = TraceBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write raw text. Failures to write are ignored; the trace is advisory.
    pub fn write(&self, text: &str) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = sink.write_all(text.as_bytes());
        let _ = sink.flush();
    }

    /// `Taskmaster: <message>\n`
    pub fn taskmaster(&self, message: &str) {
        self.write(&format!("Taskmaster: {message}\n"));
    }

    /// `<method>: <description> <node>\n`, method padded to 20 columns.
    pub fn task(&self, method: &str, description: &str, node: &str) {
        self.write(&format!("{:<20} {} {}\n", format!("{method}:"), description, node));
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace").finish_non_exhaustive()
    }
}

/// In-memory trace target.
#[derive(Debug, Clone, Default)]
pub struct TraceBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl TraceBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for TraceBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
