//! The command descriptor: the parsed representation of one command.

use bitflags::bitflags;
use core_model::Int;
use core_qreg::QregRef;

bitflags! {
    /// What a command accepts. Scanned modifiers and arguments are checked
    /// against this mask before execution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Opts: u16 {
        /// m,n argument pair.
        const M = 1 << 0;
        /// n argument.
        const N = 1 << 1;
        /// Colon modifier.
        const COLON = 1 << 2;
        /// Double-colon modifier.
        const DCOLON = 1 << 3;
        /// At-sign modifier (text delimiter override).
        const ATSIGN = 1 << 4;
        /// Q-register name follows the command.
        const QREG = 1 << 5;
        /// One text argument.
        const T1 = 1 << 6;
        /// Two text arguments.
        const T2 = 1 << 7;
        /// Flag command: a bare use pushes the register value instead.
        const FLAG = 1 << 8;
        /// Negative n is allowed.
        const NEG_N = 1 << 9;
    }
}

/// One in-flight command. The scanner accumulates modifiers and arguments
/// here; executors read it. Reset after every executed command.
#[derive(Debug, Clone, Default)]
pub struct Command {
    /// Primary command byte (upper case for letters).
    pub c1: u8,
    /// Secondary byte for E, F, and ^ commands.
    pub c2: u8,
    pub qreg: Option<QregRef>,
    pub m: Option<Int>,
    pub n: Option<Int>,
    /// H was seen: expands to the whole-buffer pair 0,Z at binding time.
    pub h: bool,
    pub colon: bool,
    pub dcolon: bool,
    pub atsign: bool,
    pub text1: Vec<u8>,
    pub text2: Vec<u8>,
}

impl Command {
    /// n, or a default for commands where a bare use means 1 (C, L, D, ...).
    pub fn n_or(&self, default: Int) -> Int {
        self.n.unwrap_or(default)
    }

    /// The resolved Q-register; scanning guarantees presence when the
    /// command's option mask includes QREG.
    pub fn qreg(&self) -> core_model::Result<QregRef> {
        self.qreg.ok_or(core_model::Error::MissingQName)
    }
}
