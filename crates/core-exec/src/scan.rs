//! The scanner: one fused pass over the command buffer.
//!
//! Expression atoms (digits, operators, `.`/`Z`/`B`, the ^-variables)
//! execute immediately by pushing onto the expression stack. Modifiers
//! accumulate in the pending command. When an executable command byte
//! arrives, its numeric argument is bound from the stack top, modifier
//! legality is checked against the command's option mask, any Q-register
//! name and text arguments are consumed, and the executor runs.
//!
//! The same table knowledge drives a purely syntactic skip used by flow
//! control (loop exits, conditional branches, tag search), so text
//! arguments can never be mistaken for structure.

use crate::command::{Command, Opts};
use crate::estack::Op;
use crate::exec;
use crate::tables::{self, Entry, Kind, OperKind, ValKind};
use crate::Engine;
use core_model::{E2Flags, E3Flags, Error, Int, Result, CTRL_A, ESC};
use tracing::trace;

impl Engine {
    pub(crate) fn dispatch_byte(&mut self, c: u8) -> Result<()> {
        let entry = tables::lookup(c);
        match entry.kind {
            Kind::Nop => Ok(()),
            Kind::Bad => Err(Error::IllegalCommand(c)),
            Kind::Digit => self.scan_number(c),
            Kind::Oper(op) => self.scan_oper(op),
            Kind::Val(v) => self.push_value(v),
            Kind::HFlag => {
                self.pending.h = true;
                Ok(())
            }
            Kind::Comma => {
                let n = self
                    .estack
                    .pop_operand()?
                    .ok_or(Error::NoArgBeforeComma)?;
                self.pending.m = Some(n);
                Ok(())
            }
            Kind::Colon => {
                if self.cbuf.peek() == Some(b':') {
                    self.cbuf.next();
                    if self.pending.dcolon && self.flags.e2.contains(E2Flags::COLON) {
                        return Err(Error::Colon);
                    }
                    self.pending.dcolon = true;
                }
                self.pending.colon = true;
                Ok(())
            }
            Kind::Atsign => {
                if self.pending.atsign && self.flags.e2.contains(E2Flags::ATSIGN) {
                    return Err(Error::Atsign);
                }
                self.pending.atsign = true;
                Ok(())
            }
            Kind::Caret => {
                let c2 = self.require_byte()?;
                self.dispatch_byte(caret_control(c2)?)
            }
            Kind::EPrefix => {
                let c2 = self.require_byte()?;
                let entry2 = tables::lookup_e(c2)?;
                self.exec_entry(entry2, b'E', c2.to_ascii_uppercase())
            }
            Kind::FPrefix => {
                let c2 = self.require_byte()?;
                let entry2 = tables::lookup_f(c2)?;
                self.exec_entry(entry2, b'F', c2.to_ascii_uppercase())
            }
            Kind::Exec(_) => {
                // Inside parentheses the angle brackets and equals sign are
                // extended operators, not commands.
                if matches!(c, b'<' | b'>' | b'=')
                    && self.nparens > 0
                    && self.flags.e1.contains(core_model::E1Flags::XOPER)
                    && self.estack.top_is_value()
                {
                    return self.scan_xoper(c);
                }
                self.exec_entry(entry, c.to_ascii_uppercase(), 0)
            }
        }
    }

    // ----- expression atoms --------------------------------------------------

    fn scan_number(&mut self, first: u8) -> Result<()> {
        let base = self.flags.radix.base() as Int;
        let mut value = digit_value(first, base)?;
        while let Some(c @ b'0'..=b'9') = self.cbuf.peek() {
            self.cbuf.next();
            value = value
                .wrapping_mul(base)
                .wrapping_add(digit_value(c, base)?);
        }
        self.estack.push_val(value)
    }

    fn scan_oper(&mut self, op: OperKind) -> Result<()> {
        match op {
            OperKind::Add => self.estack.push_op(Op::Add),
            OperKind::Sub => self.estack.push_op(Op::Sub),
            OperKind::Mul => self.estack.push_op(Op::Mul),
            OperKind::Div => {
                if self.cbuf.peek() == Some(b'/') {
                    self.cbuf.next();
                    self.estack.push_op(Op::Rem)
                } else {
                    self.estack.push_op(Op::Div)
                }
            }
            OperKind::And => self.estack.push_op(Op::And),
            OperKind::Or => self.estack.push_op(Op::Or),
            OperKind::Xor => self.estack.push_op(Op::Xor),
            OperKind::LParen => {
                self.nparens += 1;
                self.estack.push_op(Op::LParen)
            }
            OperKind::RParen => {
                if self.nparens == 0 {
                    return Err(Error::MissingLeftParen);
                }
                self.nparens -= 1;
                self.estack.close_paren()
            }
            OperKind::OnesComp => self.estack.complement(),
        }
    }

    /// Two-character comparison and shift operators, valid only inside
    /// parentheses (checked by the caller).
    fn scan_xoper(&mut self, c: u8) -> Result<()> {
        let op = match c {
            b'<' => match self.cbuf.peek() {
                Some(b'<') => {
                    self.cbuf.next();
                    Op::Shl
                }
                Some(b'=') => {
                    self.cbuf.next();
                    Op::Le
                }
                Some(b'>') => {
                    self.cbuf.next();
                    Op::Ne
                }
                _ => Op::Lt,
            },
            b'>' => match self.cbuf.peek() {
                Some(b'>') => {
                    self.cbuf.next();
                    Op::Shr
                }
                Some(b'=') => {
                    self.cbuf.next();
                    Op::Ge
                }
                _ => Op::Gt,
            },
            _ => {
                // '==' is equality; a single '=' inside parens is malformed.
                if self.cbuf.peek() == Some(b'=') {
                    self.cbuf.next();
                    Op::Eq
                } else {
                    return Err(Error::Arguments);
                }
            }
        };
        self.estack.push_op(op)
    }

    fn push_value(&mut self, v: ValKind) -> Result<()> {
        let value = match v {
            ValKind::Dot => self.buffer.dot() as Int,
            ValKind::Zed => self.buffer.zed() as Int,
            ValKind::Bgn => 0,
            ValKind::CtrlS => -(self.last_len as Int),
            ValKind::CtrlY => {
                // The last-insert span behaves like the pair m,n.
                let dot = self.buffer.dot() as Int;
                self.pending.m = Some(dot - self.last_len as Int);
                dot
            }
            ValKind::CtrlZ => self.qregs.total_bytes() as Int,
            ValKind::CtrlB => date_word(),
            ValKind::CtrlH => millis_since_midnight(),
            ValKind::AsciiNext => {
                let b = self.require_byte()?;
                b as Int
            }
        };
        self.estack.push_val(value)
    }

    // ----- command execution -------------------------------------------------

    fn exec_entry(&mut self, entry: Entry, c1: u8, c2: u8) -> Result<()> {
        let Kind::Exec(what) = entry.kind else {
            return Err(Error::IllegalCommand(c1));
        };
        let mut cmd = std::mem::take(&mut self.pending);
        cmd.c1 = c1;
        cmd.c2 = c2;

        // Bind n from the expression stack.
        if entry.opts.intersects(Opts::N | Opts::FLAG) {
            if let Some(v) = self.estack.pop_operand()? {
                cmd.n = Some(v);
            }
        }
        // H expands to the whole buffer.
        if cmd.h {
            cmd.m = Some(0);
            cmd.n = Some(self.buffer.zed() as Int);
        }
        if let Some(m) = cmd.m {
            if !entry.opts.contains(Opts::M) {
                return Err(Error::InvalidM);
            }
            if m < 0 {
                return Err(Error::NegativeComma);
            }
            if cmd.n.is_none() {
                return Err(Error::NoNAfterM);
            }
        }
        if cmd.colon && !entry.opts.intersects(Opts::COLON | Opts::DCOLON) {
            return Err(Error::Colon);
        }
        if cmd.dcolon && !entry.opts.contains(Opts::DCOLON) {
            return Err(Error::Colon);
        }
        if cmd.atsign && !entry.opts.contains(Opts::ATSIGN) {
            return Err(Error::Atsign);
        }
        if entry.opts.contains(Opts::QREG) {
            cmd.qreg = Some(self.scan_qreg()?);
        }
        if entry.opts.contains(Opts::T1) {
            let delim = self.text_delimiter(&cmd)?;
            cmd.text1 = self.scan_text(delim)?;
            if entry.opts.contains(Opts::T2) {
                cmd.text2 = self.scan_text(delim)?;
            }
        }
        if self.flags.trace {
            trace!(c1 = ?(c1 as char), c2 = ?(c2 as char), n = ?cmd.n, m = ?cmd.m, "exec");
        }
        exec::dispatch(self, &mut cmd, what)
    }

    fn text_delimiter(&mut self, cmd: &Command) -> Result<u8> {
        if cmd.atsign {
            // The first non-whitespace byte after the command names the
            // delimiter.
            while matches!(self.cbuf.peek(), Some(b' ') | Some(b'\t')) {
                self.cbuf.next();
            }
            self.require_byte()
        } else {
            Ok(match cmd.c1 {
                b'!' => b'!',
                CTRL_A => CTRL_A,
                _ => ESC,
            })
        }
    }

    fn scan_text(&mut self, delim: u8) -> Result<Vec<u8>> {
        let mut text = Vec::new();
        loop {
            let c = self.require_byte()?;
            if c == delim {
                return Ok(text);
            }
            text.push(c);
        }
    }

    pub(crate) fn scan_qreg(&mut self) -> Result<core_qreg::QregRef> {
        let mut c = self.require_byte().map_err(|_| Error::MissingQName)?;
        let local = c == b'.';
        if local {
            c = self.require_byte().map_err(|_| Error::MissingQName)?;
        }
        core_qreg::QregRef::resolve(c, local)
    }

    pub(crate) fn require_byte(&mut self) -> Result<u8> {
        self.cbuf.next().ok_or_else(|| {
            if self.in_macro() {
                Error::UnterminatedMacro
            } else {
                Error::UnterminatedCommand
            }
        })
    }

    // ----- macro frames ------------------------------------------------------

    pub(crate) fn push_macro_frame(&mut self, body: Vec<u8>, local: bool) -> Result<()> {
        if self.frames.len() >= crate::MAX_MACROS {
            return Err(Error::LimitReached);
        }
        let frame = crate::Frame {
            cbuf: std::mem::replace(&mut self.cbuf, crate::CommandBuf::from_bytes(body)),
            loops: std::mem::take(&mut self.loops),
            if_depth: self.if_depth,
            nparens: self.nparens,
            local_frame: local,
        };
        self.if_depth = 0;
        self.nparens = 0;
        if local {
            self.qregs.push_local_frame();
        }
        self.frames.push(frame);
        Ok(())
    }

    pub(crate) fn pop_macro_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.cbuf = frame.cbuf;
            self.loops = frame.loops;
            self.if_depth = frame.if_depth;
            self.nparens = frame.nparens;
            if frame.local_frame {
                self.qregs.pop_local_frame();
            }
        }
    }

    // ----- smart CR/LF plumbing ----------------------------------------------

    /// Build the append options from the flag registers and the input
    /// stream's terminator latch.
    pub(crate) fn append_options(&self, seen_terminator: bool) -> core_buffer::AppendOptions {
        core_buffer::AppendOptions {
            cr_in: self.flags.e3.contains(E3Flags::CR_IN),
            cr_out: self.flags.e3.contains(E3Flags::CR_OUT),
            nopage: self.flags.e3.contains(E3Flags::NOPAGE),
            keep_nul: self.flags.e3.contains(E3Flags::KEEPNUL),
            smart: self.flags.e3.contains(E3Flags::SMART),
            seen_terminator,
        }
    }

    /// Fold smart-detection results back into the flag registers.
    pub(crate) fn absorb_append_options(&mut self, opts: &core_buffer::AppendOptions) {
        self.flags.e3.set(E3Flags::CR_IN, opts.cr_in);
        self.flags.e3.set(E3Flags::CR_OUT, opts.cr_out);
    }
}

/// `^x` to its control character. Only `@` through `_` (after case folding)
/// are legal.
pub(crate) fn caret_control(c: u8) -> Result<u8> {
    let up = c.to_ascii_uppercase();
    if (b'@'..=b'_').contains(&up) {
        Ok(up & 0x1f)
    } else {
        Err(Error::InvalidUparrow(c))
    }
}

fn digit_value(c: u8, base: Int) -> Result<Int> {
    let d = (c - b'0') as Int;
    if d >= base {
        // Digits 8 and 9 in octal radix.
        return Err(Error::InvalidNumber);
    }
    Ok(d)
}

fn date_word() -> Int {
    use chrono::Datelike;
    let now = chrono::Local::now();
    let year = now.year() as Int;
    let month = now.month() as Int;
    let day = now.day() as Int;
    ((year - 1900) * 16 + month) * 32 + day
}

fn millis_since_midnight() -> Int {
    use chrono::Timelike;
    let now = chrono::Local::now();
    (now.num_seconds_from_midnight() as Int) * 1000 + (now.nanosecond() / 1_000_000) as Int
}
