//! User-visible mode flag registers.
//!
//! Each register is readable and settable as a plain integer through the
//! corresponding flag command (`ED`, `ET`, `E1`, ...). The bit registers keep
//! their raw value so that bits this build does not interpret still round
//! trip through get/set.

use bitflags::bitflags;

use crate::Int;

/// Current numeric radix for literals, `\`, and `=` type-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Radix {
    Octal,
    #[default]
    Decimal,
    Hex,
}

impl Radix {
    pub fn base(self) -> u32 {
        match self {
            Radix::Octal => 8,
            Radix::Decimal => 10,
            Radix::Hex => 16,
        }
    }

    pub fn from_int(n: Int) -> Option<Self> {
        match n {
            8 => Some(Radix::Octal),
            10 => Some(Radix::Decimal),
            16 => Some(Radix::Hex),
            _ => None,
        }
    }
}

bitflags! {
    /// ED: edit mode control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EdFlags: u32 {
        /// Caret in a search string is a literal character, not a prefix.
        const CARET = 1 << 0;
        /// Allow Y and non-stop searches to discard an unwritten buffer.
        const YANK = 1 << 1;
        /// Allow the edit buffer to grow automatically.
        const EXPAND = 1 << 2;
        /// Preserve dot on a failed search.
        const KEEPDOT = 1 << 4;
        /// Advance one byte (not the match length) between occurrences.
        const MOVEDOT = 1 << 6;
    }

    /// ET: terminal mode control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EtFlags: u32 {
        /// Type-out is image mode: no output translation at all.
        const IMAGE = 1 << 0;
        /// Convert input to lower case at the prompt.
        const LOWER = 1 << 2;
        /// Read without echo.
        const NOECHO = 1 << 3;
        /// ^T reads return -1 immediately when no key is pending.
        const NOWAIT = 1 << 7;
        /// Abort on error (batch behaviour).
        const ABORT = 1 << 15;
    }

    /// E1: dialect extensions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct E1Flags: u32 {
        /// Extended operators inside parentheses (== <> <= >= << >> //).
        const XOPER = 1 << 0;
        /// Dollar sign is a symbol constituent for ^EC matching.
        const DOLLAR = 1 << 1;
        /// Underscore is a symbol constituent for ^EC matching.
        const UBAR = 1 << 2;
    }

    /// E2: strictness checks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct E2Flags: u32 {
        /// Error on a repeated at-sign modifier.
        const ATSIGN = 1 << 0;
        /// Error on extraneous colons.
        const COLON = 1 << 1;
        /// Error on a colon-modified m,nP or PW.
        const PAGE = 1 << 2;
        /// Error on numeric arguments a command cannot consume.
        const ARGS = 1 << 3;
    }

    /// E3: byte-stream conversion modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct E3Flags: u32 {
        /// First line terminator read decides the CR modes below.
        const SMART = 1 << 0;
        /// Store CR+LF pairs as read (otherwise the CR is dropped).
        const CR_IN = 1 << 1;
        /// Emit CR before each bare LF on output.
        const CR_OUT = 1 << 2;
        /// Form feed is an ordinary character, not a page boundary.
        const NOPAGE = 1 << 3;
        /// Keep NUL bytes on input.
        const KEEPNUL = 1 << 4;
    }
}

/// Every user-settable flag register, owned by the engine context.
#[derive(Debug, Clone)]
pub struct Flags {
    /// Form feed ended the last append/yank (read back as `^E`).
    pub ctrl_e: bool,
    /// Search case mode: +1 fold case, 0 fold case plus the old pairings,
    /// -1 exact.
    pub ctrl_x: Int,
    pub radix: Radix,
    pub ed: EdFlags,
    /// EE: surrogate escape character (0 = none).
    pub ee: Int,
    /// EH: error verbosity (1 = code only, 2 = code and message,
    /// 3 = verbose; 0 acts as 2).
    pub eh: Int,
    /// ES: search verification.
    pub es: Int,
    pub et: EtFlags,
    /// EU: case flagging on type-out (-1 off).
    pub eu: Int,
    /// EV: edit verify.
    pub ev: Int,
    pub e1: E1Flags,
    pub e2: E2Flags,
    pub e3: E3Flags,
    /// E4 is display-only in this build but still round-trips.
    pub e4: Int,
    /// Trace mode set by `?`.
    pub trace: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            ctrl_e: false,
            ctrl_x: 0,
            radix: Radix::Decimal,
            ed: EdFlags::EXPAND,
            ee: 0,
            eh: 0,
            es: 0,
            et: EtFlags::ABORT,
            eu: -1,
            ev: 0,
            e1: E1Flags::XOPER | E1Flags::DOLLAR | E1Flags::UBAR,
            e2: E2Flags::empty(),
            e3: E3Flags::SMART,
            e4: 0,
            trace: false,
        }
    }
}

/// Apply the m,n update convention shared by every flag command: a lone n
/// replaces the register, while `m,n` clears the m bits and sets the n bits.
pub fn update_flag(current: Int, m: Option<Int>, n: Int) -> Int {
    match m {
        None => n,
        Some(m) => {
            let mut value = current;
            if m != 0 {
                value &= !m;
            }
            if n != 0 {
                value |= n;
            }
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_update_replaces_without_m() {
        assert_eq!(update_flag(0b1111, None, 0b0001), 0b0001);
    }

    #[test]
    fn flag_update_masks_with_m() {
        // 5,1 ET: clear bits 101, set bit 001.
        assert_eq!(update_flag(0b1111, Some(0b0101), 0b0001), 0b1011);
        // m of zero clears nothing.
        assert_eq!(update_flag(0b1000, Some(0), 0b0001), 0b1001);
        // n of zero sets nothing.
        assert_eq!(update_flag(0b1010, Some(0b0010), 0), 0b1000);
    }

    #[test]
    fn radix_round_trip() {
        for n in [8, 10, 16] {
            assert_eq!(Radix::from_int(n).unwrap().base() as Int, n);
        }
        assert!(Radix::from_int(2).is_none());
    }

    #[test]
    fn default_flags() {
        let f = Flags::default();
        assert_eq!(f.ctrl_x, 0);
        assert!(f.e3.contains(E3Flags::SMART));
        assert!(!f.e3.contains(E3Flags::CR_OUT));
        assert!(f.et.contains(EtFlags::ABORT));
    }
}
