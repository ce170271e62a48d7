//! The command interpreter: scanner, expression stack, dispatch, and the
//! per-command executors, tied together by the engine context.
//!
//! Everything the language touches is owned by one [`Engine`] value: the
//! edit buffer and its page list, the Q-register file, the file streams,
//! the flag registers, the command buffer with its macro frame stack, and
//! the expression stack. There are no globals; errors are ordinary `Result`
//! values that unwind to the caller's main loop, which calls
//! [`Engine::recover`] and resumes the prompt.

use core_buffer::{EditBuffer, PageList, EDIT_MAX_FLAT, EDIT_MAX_PAGING};
use core_file::Files;
use core_model::{Error, Flags, Int, Result, CR, LF};
use core_qreg::QregFile;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

pub mod build;
pub mod cbuf;
pub mod command;
pub mod estack;
mod exec;
mod scan;
mod skip;
pub mod tables;
pub mod term;

pub use cbuf::CommandBuf;
pub use command::{Command, Opts};
pub use estack::ExprStack;
pub use term::{CaptureTerminal, Terminal};

/// Loop nesting ceiling.
pub const MAX_LOOPS: usize = 32;
/// Macro recursion ceiling.
pub const MAX_MACROS: usize = 16;

/// One active iteration.
#[derive(Debug, Clone, Copy)]
struct Loop {
    /// Remaining iterations; None iterates until an explicit exit.
    iter: Option<Int>,
    /// Command-buffer position of the byte after `<`.
    pos: usize,
    /// Conditional depth at loop entry.
    if_depth: usize,
}

/// Saved state for a macro invocation.
struct Frame {
    cbuf: CommandBuf,
    loops: Vec<Loop>,
    if_depth: usize,
    nparens: usize,
    /// This frame pushed a local Q-register frame that must be popped.
    local_frame: bool,
}

pub struct Engine {
    pub cbuf: CommandBuf,
    frames: Vec<Frame>,
    pub estack: ExprStack,
    pub buffer: EditBuffer,
    pub pages: PageList,
    pub qregs: QregFile,
    pub files: Files,
    pub flags: Flags,
    loops: Vec<Loop>,
    if_depth: usize,
    nparens: usize,
    /// Modifiers and arguments accumulated for the command being scanned.
    pending: Command,
    pub last_search: Vec<u8>,
    /// Length of the last insertion, search match, or `G` (for ^S, ^Y, FR).
    pub last_len: usize,
    pub term: Box<dyn Terminal>,
    pub interrupt: Arc<AtomicBool>,
    /// Set by EX: exit status for the host.
    pub exit_requested: Option<i32>,
    /// Command registered by EG to run after exit.
    pub eg_at_exit: Option<String>,
    /// Backward paging held in memory; off means P writes straight through.
    vm_paging: bool,
}

impl Engine {
    pub fn new(term: Box<dyn Terminal>) -> Self {
        Self::with_buffer_config(term, core_buffer::EDIT_INIT, 0, true)
    }

    /// `max` of 0 picks the default ceiling for the paging mode.
    pub fn with_buffer_config(
        term: Box<dyn Terminal>,
        init: usize,
        max: usize,
        vm_paging: bool,
    ) -> Self {
        let max = if max != 0 {
            max
        } else if vm_paging {
            EDIT_MAX_PAGING
        } else {
            EDIT_MAX_FLAT
        };
        Self {
            cbuf: CommandBuf::new(),
            frames: Vec::new(),
            estack: ExprStack::new(),
            buffer: EditBuffer::new(init, max),
            pages: PageList::new(),
            qregs: QregFile::new(),
            files: Files::new(),
            flags: Flags::default(),
            loops: Vec::new(),
            if_depth: 0,
            nparens: 0,
            pending: Command::default(),
            last_search: Vec::new(),
            last_len: 0,
            term,
            interrupt: Arc::new(AtomicBool::new(false)),
            exit_requested: None,
            eg_at_exit: None,
            vm_paging,
        }
    }

    /// Execute one whole command string already loaded into the command
    /// buffer. The expression stack starts clean.
    pub fn run_command(&mut self) -> Result<()> {
        self.estack.clear();
        self.pending = Command::default();
        self.cbuf.set_pos(0);
        self.run()
    }

    /// Execute the current command buffer until it is exhausted. Used both
    /// at top level and for macro bodies.
    pub(crate) fn run(&mut self) -> Result<()> {
        loop {
            if self.interrupt.load(Ordering::Relaxed) {
                return Err(Error::Aborted);
            }
            if self.exit_requested.is_some() {
                return Ok(());
            }
            let Some(c) = self.cbuf.next() else {
                break;
            };
            if self.flags.trace {
                trace!(byte = c, pos = self.cbuf.pos(), "command byte");
            }
            self.dispatch_byte(c)?;
        }
        // The buffer ran out: every structure must be closed.
        if !self.loops.is_empty() {
            return Err(Error::MissingRightAngle);
        }
        if self.if_depth != 0 {
            return Err(Error::MissingApostrophe);
        }
        if self.nparens != 0 {
            return Err(Error::MissingRightParen);
        }
        Ok(())
    }

    /// Reset to a clean prompt state after an error unwound out of
    /// [`Engine::run_command`]: discard the command buffer and any macro
    /// frames, throw away local Q-register frames those macros pushed, and
    /// zero the control-flow depths. The edit buffer, globals, files, and
    /// flags keep their state.
    pub fn recover(&mut self) {
        self.cbuf.reset();
        self.frames.clear();
        self.estack.clear();
        self.pending = Command::default();
        self.qregs.reset_locals();
        self.loops.clear();
        self.if_depth = 0;
        self.nparens = 0;
        self.interrupt.store(false, Ordering::Relaxed);
    }

    pub fn in_macro(&self) -> bool {
        !self.frames.is_empty()
    }

    pub(crate) fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    // ----- type-out ----------------------------------------------------------

    /// Type bytes through the output translation: each LF not preceded by
    /// CR goes out as CR+LF when CR/LF output mode is on. Image mode (ET&1)
    /// suppresses all translation. Output is mirrored to the log stream
    /// when EL has one open.
    pub fn type_bytes(&mut self, bytes: &[u8]) {
        use core_model::EtFlags;
        let translate = !self.flags.et.contains(EtFlags::IMAGE)
            && self.flags.e3.contains(core_model::E3Flags::CR_OUT);
        if !translate {
            self.emit(bytes);
            return;
        }
        let mut out = Vec::with_capacity(bytes.len() + 8);
        let mut last = 0u8;
        for &c in bytes {
            if c == LF && last != CR {
                out.push(CR);
            }
            out.push(c);
            last = c;
        }
        self.emit(&out);
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.term.write(bytes);
        if let Some(log) = self.files.output_on(core_file::OSTREAM_LOG) {
            // A full log disk is not worth killing the session over.
            let _ = std::io::Write::write_all(log.writer(), bytes);
        }
    }

    pub fn type_str(&mut self, s: &str) {
        self.type_bytes(s.as_bytes());
    }

    /// The line terminator for generated output, per the CR/LF output mode.
    pub(crate) fn type_newline(&mut self) {
        if self.flags.e3.contains(core_model::E3Flags::CR_OUT) {
            self.emit(b"\r\n");
        } else {
            self.emit(b"\n");
        }
    }

    /// Format a number in the current radix.
    pub(crate) fn format_radix(&self, n: Int) -> String {
        match self.flags.radix {
            core_model::Radix::Octal => {
                if n < 0 {
                    format!("-{:o}", n.unsigned_abs())
                } else {
                    format!("{n:o}")
                }
            }
            core_model::Radix::Decimal => format!("{n}"),
            core_model::Radix::Hex => {
                if n < 0 {
                    format!("-{:x}", n.unsigned_abs())
                } else {
                    format!("{n:x}")
                }
            }
        }
    }
}
