use std::cell::RefCell;
use std::io::{self, Result as IoResult, Write};
use std::rc::Rc;

/// Where built-ins write their output.
///
/// `@echo off` disables the sink; writes are then swallowed. Error reports
/// and the prompt do not go through it.
pub struct OutputSink {
    enabled: bool,
    inner: Box<dyn Write>,
}

impl OutputSink {
    pub fn new(inner: Box<dyn Write>) -> Self {
        Self {
            enabled: true,
            inner,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Writes regardless of the enabled flag.
    pub fn raw(&mut self) -> &mut dyn Write {
        &mut *self.inner
    }
}

impl Write for OutputSink {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        if self.enabled {
            self.inner.write(data)
        } else {
            Ok(data.len())
        }
    }

    fn flush(&mut self) -> IoResult<()> {
        self.inner.flush()
    }
}

/// Memory-backed writer for capturing output in tests and embedders.
#[derive(Clone, Default)]
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer and return a handle to the bytes it collects.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }

    /// Collected output as text.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}
