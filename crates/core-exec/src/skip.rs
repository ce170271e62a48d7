//! Purely syntactic command skipping.
//!
//! Flow control (loop exits, conditional branches, tag search) has to move
//! the read cursor over commands without executing them. The skip walks one
//! command at a time using the same dispatch tables as the scanner, so text
//! arguments, Q-register names, and delimiter overrides are consumed exactly
//! as the executing scan would consume them, and structural bytes inside
//! text can never be miscounted.

use crate::scan::caret_control;
use crate::tables::{self, Entry, Kind, ValKind};
use crate::Engine;
use core_model::{Error, Result, CTRL_A, ESC};

/// One skipped command: its (case-folded) primary byte and the location of
/// its first text argument, if any.
pub(crate) struct Skipped {
    pub byte: u8,
    pub text1: Option<(usize, usize)>,
}

/// Where a conditional skip stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CondEnd {
    /// The matching apostrophe.
    Apos,
    /// The else-branch bar at this nesting level.
    Else,
}

impl Engine {
    pub(crate) fn skip_one(&mut self, atsign: &mut bool) -> Result<Skipped> {
        let c = self.require_byte()?;
        self.skip_unit(c, atsign)
    }

    fn skip_unit(&mut self, c: u8, atsign: &mut bool) -> Result<Skipped> {
        let entry = tables::lookup(c);
        let byte = c.to_ascii_uppercase();
        match entry.kind {
            Kind::Val(ValKind::AsciiNext) => {
                self.require_byte()?;
                Ok(Skipped { byte, text1: None })
            }
            Kind::Nop
            | Kind::Bad
            | Kind::Digit
            | Kind::Oper(_)
            | Kind::Val(_)
            | Kind::HFlag
            | Kind::Comma
            | Kind::Colon => Ok(Skipped { byte, text1: None }),
            Kind::Atsign => {
                *atsign = true;
                Ok(Skipped { byte, text1: None })
            }
            Kind::Caret => {
                let c2 = self.require_byte()?;
                self.skip_unit(caret_control(c2)?, atsign)
            }
            Kind::EPrefix => {
                let c2 = self.require_byte()?;
                let entry2 = tables::lookup_e(c2)?;
                self.skip_exec(byte, entry2, atsign)
            }
            Kind::FPrefix => {
                let c2 = self.require_byte()?;
                let entry2 = tables::lookup_f(c2)?;
                self.skip_exec(byte, entry2, atsign)
            }
            Kind::Exec(_) => self.skip_exec(byte, entry, atsign),
        }
    }

    fn skip_exec(&mut self, byte: u8, entry: Entry, atsign: &mut bool) -> Result<Skipped> {
        use crate::command::Opts;
        if byte == b'"' {
            // The condition selector is not a command byte.
            self.require_byte()?;
        }
        if entry.opts.contains(Opts::QREG) {
            let c = self.require_byte()?;
            if c == b'.' {
                self.require_byte()?;
            }
        }
        let mut text1 = None;
        if entry.opts.contains(Opts::T1) {
            let delim = if *atsign {
                while matches!(self.cbuf.peek(), Some(b' ') | Some(b'\t')) {
                    self.cbuf.next();
                }
                self.require_byte()?
            } else {
                match byte {
                    b'!' => b'!',
                    CTRL_A => CTRL_A,
                    _ => ESC,
                }
            };
            text1 = Some(self.skip_text(delim)?);
            if entry.opts.contains(Opts::T2) {
                self.skip_text(delim)?;
            }
        }
        *atsign = false;
        Ok(Skipped { byte, text1 })
    }

    fn skip_text(&mut self, delim: u8) -> Result<(usize, usize)> {
        let start = self.cbuf.pos();
        loop {
            let c = self.require_byte()?;
            if c == delim {
                return Ok((start, self.cbuf.pos() - 1));
            }
        }
    }

    // ----- structural skips --------------------------------------------------

    /// Skip forward past the matching `>`. With `consume` false the cursor
    /// stops just before the `>` so that it executes next.
    pub(crate) fn skip_to_loop_end(&mut self, consume: bool) -> Result<()> {
        let mut atsign = false;
        let mut depth = 0usize;
        loop {
            let before = self.cbuf.pos();
            let sk = match self.skip_one(&mut atsign) {
                Ok(sk) => sk,
                Err(Error::UnterminatedCommand | Error::UnterminatedMacro) => {
                    return Err(Error::MissingRightAngle)
                }
                Err(e) => return Err(e),
            };
            match sk.byte {
                b'<' => depth += 1,
                b'>' => {
                    if depth == 0 {
                        if !consume {
                            self.cbuf.set_pos(before);
                        }
                        return Ok(());
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }

    /// Skip forward inside a conditional: past the matching `'`, or (when
    /// requested) to just after the `|` at this nesting level.
    pub(crate) fn skip_cond(&mut self, stop_at_else: bool) -> Result<CondEnd> {
        let mut atsign = false;
        let mut depth = 0usize;
        loop {
            let sk = match self.skip_one(&mut atsign) {
                Ok(sk) => sk,
                Err(Error::UnterminatedCommand | Error::UnterminatedMacro) => {
                    return Err(Error::MissingApostrophe)
                }
                Err(e) => return Err(e),
            };
            match sk.byte {
                b'"' => depth += 1,
                b'\'' => {
                    if depth == 0 {
                        return Ok(CondEnd::Apos);
                    }
                    depth -= 1;
                }
                b'|' if stop_at_else && depth == 0 => return Ok(CondEnd::Else),
                _ => {}
            }
        }
    }

    /// Exit the current iteration: skip past the matching `>` and pop the
    /// loop frame.
    pub(crate) fn exit_loop(&mut self) -> Result<()> {
        self.skip_to_loop_end(true)?;
        if let Some(frame) = self.loops.pop() {
            self.if_depth = frame.if_depth;
        }
        Ok(())
    }

    /// Locate the position just past `!tag!`. The whole buffer is scanned;
    /// a missing tag and an ambiguous tag are both hard errors.
    pub(crate) fn find_tag(&mut self, tag: &[u8]) -> Result<usize> {
        let saved = self.cbuf.pos();
        self.cbuf.set_pos(0);
        let mut atsign = false;
        let mut found = Vec::new();
        while !self.cbuf.is_done() {
            match self.skip_one(&mut atsign) {
                Ok(sk) => {
                    if sk.byte == b'!' {
                        if let Some((s, e)) = sk.text1 {
                            if self.cbuf.slice(s, e) == tag {
                                found.push(self.cbuf.pos());
                            }
                        }
                    }
                }
                // A malformed tail cannot contain a well-formed tag.
                Err(_) => break,
            }
        }
        self.cbuf.set_pos(saved);
        let name = || String::from_utf8_lossy(tag).into_owned();
        match found.len() {
            0 => Err(Error::MissingTag(name())),
            1 => Ok(found[0]),
            _ => Err(Error::DuplicateTag(name())),
        }
    }
}
