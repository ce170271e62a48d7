//! The terminal seam.
//!
//! The engine types through this trait and reads raw keys from it; the
//! binary implements it over the real terminal, and tests capture output in
//! memory. Output translation (CR before LF) is applied by the engine, not
//! here, because it depends on the flag registers.

use std::collections::VecDeque;

pub trait Terminal {
    /// Write already-translated bytes.
    fn write(&mut self, bytes: &[u8]);

    /// Read one raw key, or None when input is exhausted (^T then yields -1).
    fn read_key(&mut self) -> Option<u8>;

    fn flush(&mut self) {}
}

/// In-memory terminal for tests and batch use.
#[derive(Default)]
pub struct CaptureTerminal {
    pub output: Vec<u8>,
    pub keys: VecDeque<u8>,
}

impl CaptureTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: &[u8]) -> Self {
        Self {
            output: Vec::new(),
            keys: keys.iter().copied().collect(),
        }
    }
}

impl Terminal for CaptureTerminal {
    fn write(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    fn read_key(&mut self) -> Option<u8> {
        self.keys.pop_front()
    }
}

/// Capture terminal whose output buffer is shared with the test that owns
/// the engine (the engine boxes its terminal, so a plain field would be out
/// of reach).
pub struct SharedCapture {
    buf: std::rc::Rc<std::cell::RefCell<Vec<u8>>>,
    pub keys: VecDeque<u8>,
}

impl SharedCapture {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Self, std::rc::Rc<std::cell::RefCell<Vec<u8>>>) {
        let buf = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        (
            Self {
                buf: buf.clone(),
                keys: VecDeque::new(),
            },
            buf,
        )
    }
}

impl Terminal for SharedCapture {
    fn write(&mut self, bytes: &[u8]) {
        self.buf.borrow_mut().extend_from_slice(bytes);
    }

    fn read_key(&mut self) -> Option<u8> {
        self.keys.pop_front()
    }
}
