//! Shared harness for the language tests: an engine wired to a shared
//! capture terminal, plus small helpers for running command strings.

use core_exec::{CommandBuf, Engine};
use std::cell::RefCell;
use std::rc::Rc;

pub struct Session {
    pub eng: Engine,
    pub out: Rc<RefCell<Vec<u8>>>,
}

impl Session {
    pub fn new() -> Self {
        let (term, out) = core_exec::term::SharedCapture::new();
        Session {
            eng: Engine::new(Box::new(term)),
            out,
        }
    }

    #[allow(dead_code)]
    pub fn with_keys(keys: &[u8]) -> Self {
        let (mut term, out) = core_exec::term::SharedCapture::new();
        term.keys = keys.iter().copied().collect();
        Session {
            eng: Engine::new(Box::new(term)),
            out,
        }
    }

    /// Run one command string; `$` in the source is translated to ESC for
    /// readability, `$$` terminates it the way the prompt would.
    pub fn run(&mut self, cmds: &str) -> core_model::Result<()> {
        let bytes: Vec<u8> = cmds.bytes().map(|c| if c == b'$' { 0x1b } else { c }).collect();
        self.eng.cbuf = CommandBuf::from_bytes(bytes);
        self.eng.run_command()
    }

    /// Run raw bytes without the `$` convenience.
    #[allow(dead_code)]
    pub fn run_raw(&mut self, cmds: &[u8]) -> core_model::Result<()> {
        self.eng.cbuf = CommandBuf::from_bytes(cmds.to_vec());
        self.eng.run_command()
    }

    pub fn buffer(&self) -> Vec<u8> {
        self.eng.buffer.copy_range(0, self.eng.buffer.zed())
    }

    pub fn output(&self) -> Vec<u8> {
        self.out.borrow().clone()
    }

    #[allow(dead_code)]
    pub fn clear_output(&mut self) {
        self.out.borrow_mut().clear();
    }

    pub fn qnum(&self, name: u8) -> i64 {
        self.eng
            .qregs
            .num(core_qreg::QregRef::resolve(name, false).unwrap())
    }
}
