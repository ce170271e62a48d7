//! The pattern matcher.
//!
//! A search string is never pre-compiled: the raw bytes are re-interpreted
//! at every match attempt, because constructs like `^EGq` refer to Q-register
//! contents whose current value must be used. The driver slides a start
//! position across the page, one byte at a time, attempting a full match at
//! each spot.
//!
//! Match constructs (all raw control bytes; the scanner's caret conversion
//! has already happened by the time a pattern reaches this crate):
//!
//! * `^E A/B/C/D/L/R/S/V/W/X` character classes, `^E G q` any-byte-in-register,
//!   `^E nnn` decimal byte value
//! * `^N` negates the following construct
//! * `^S` any non-alphanumeric, `^X` wildcard
//! * `^Q c` / `^R c` match `c` exactly, bypassing case folding
//! * `^V c` / `^V ^V` lowercase next / all following literals, `^W` likewise
//!   for uppercase
//! * any other byte matches itself under the CTRL/X case mode

use core_buffer::EditBuffer;
use core_model::{is_delim, Error, Int, Result, CTRL_E, CTRL_N, CTRL_Q, CTRL_R, CTRL_S, CTRL_V, CTRL_W, CTRL_X};
use core_qreg::{QregFile, QregRef};

/// Matching modes lifted from the flag registers by the caller.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// CTRL/X mode: +1 fold case, 0 fold case plus the old character
    /// pairings (`` ` ``≡`@`, `{`≡`[`, `|`≡`\`, `}`≡`]`, `~`≡`^`), -1 exact.
    pub ctrl_x: Int,
    /// `$` is a symbol constituent for `^EC`.
    pub symbol_dollar: bool,
    /// `_` is a symbol constituent for `^EC`.
    pub symbol_ubar: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ctrl_x: 0,
            symbol_dollar: true,
            symbol_ubar: true,
        }
    }
}

/// A successful match: absolute half-open byte range in the edit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

pub struct Matcher<'a> {
    buffer: &'a EditBuffer,
    qregs: &'a QregFile,
    cfg: MatchConfig,
}

/// Pattern read cursor with the sticky case-conversion state.
struct Pattern<'p> {
    bytes: &'p [u8],
    i: usize,
    lower_all: bool,
    upper_all: bool,
}

impl<'p> Pattern<'p> {
    fn new(bytes: &'p [u8]) -> Self {
        Self {
            bytes,
            i: 0,
            lower_all: false,
            upper_all: false,
        }
    }

    fn done(&self) -> bool {
        self.i >= self.bytes.len()
    }

    fn next(&mut self) -> Result<u8> {
        let c = self
            .bytes
            .get(self.i)
            .copied()
            .ok_or(Error::InvalidSearchString)?;
        self.i += 1;
        Ok(c)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.i).copied()
    }
}

impl<'a> Matcher<'a> {
    pub fn new(buffer: &'a EditBuffer, qregs: &'a QregFile, cfg: MatchConfig) -> Self {
        Self {
            buffer,
            qregs,
            cfg,
        }
    }

    /// Attempt a full pattern match starting at the absolute position.
    /// Returns the end position of the match.
    pub fn match_at(&self, pattern: &[u8], start: usize) -> Result<Option<usize>> {
        let mut pat = Pattern::new(pattern);
        let mut tpos = start;
        while !pat.done() {
            if !self.match_one(&mut pat, &mut tpos, false)? {
                return Ok(None);
            }
        }
        Ok(Some(tpos))
    }

    /// Search forward for the nth occurrence, sliding the attempt position
    /// through `[start, bound)`. With `movedot` the position advances one
    /// byte between occurrences instead of the matched length.
    pub fn find_forward(
        &self,
        pattern: &[u8],
        start: usize,
        bound: usize,
        count: usize,
        movedot: bool,
    ) -> Result<Option<Span>> {
        let mut remaining = count.max(1);
        let mut at = start;
        while at < bound {
            match self.match_at(pattern, at)? {
                Some(end) => {
                    remaining -= 1;
                    if remaining == 0 {
                        return Ok(Some(Span { start: at, end }));
                    }
                    at = if movedot || end == at { at + 1 } else { end };
                }
                None => at += 1,
            }
        }
        Ok(None)
    }

    /// Search backward: attempt positions from `start` down to `bound`,
    /// inclusive of `bound`.
    pub fn find_backward(
        &self,
        pattern: &[u8],
        start: usize,
        bound: usize,
        count: usize,
    ) -> Result<Option<Span>> {
        let mut remaining = count.max(1);
        let mut at = start;
        loop {
            if at < bound {
                return Ok(None);
            }
            if let Some(end) = self.match_at(pattern, at)? {
                remaining -= 1;
                if remaining == 0 {
                    return Ok(Some(Span { start: at, end }));
                }
            }
            if at == bound {
                return Ok(None);
            }
            at -= 1;
        }
    }

    // ----- construct interpretation -----------------------------------------

    /// Match one construct at the text position, advancing both cursors.
    /// With `negated` the sense is inverted and run constructs consume a
    /// single byte only.
    fn match_one(&self, pat: &mut Pattern, tpos: &mut usize, negated: bool) -> Result<bool> {
        let Some(c) = self.buffer.at(*tpos) else {
            // Off the end of the buffer: nothing matches, although an
            // exhausted pattern never gets here.
            return Ok(false);
        };
        let construct = pat.next()?;
        let matched = match construct {
            CTRL_E => return self.match_ctrl_e(pat, tpos, negated),
            CTRL_N => return self.match_one(pat, tpos, !negated),
            CTRL_S => {
                *tpos += 1;
                !c.is_ascii_alphanumeric()
            }
            CTRL_X => {
                *tpos += 1;
                true
            }
            CTRL_Q | CTRL_R => {
                let lit = pat.next()?;
                *tpos += 1;
                c == lit
            }
            CTRL_V => {
                if pat.peek() == Some(CTRL_V) {
                    pat.next()?;
                    pat.lower_all = true;
                    pat.upper_all = false;
                    return Ok(true); // consumed no text
                }
                let lit = pat.next()?.to_ascii_lowercase();
                *tpos += 1;
                self.literal_match(c, lit)
            }
            CTRL_W => {
                if pat.peek() == Some(CTRL_W) {
                    pat.next()?;
                    pat.upper_all = true;
                    pat.lower_all = false;
                    return Ok(true);
                }
                let lit = pat.next()?.to_ascii_uppercase();
                *tpos += 1;
                self.literal_match(c, lit)
            }
            lit => {
                let lit = if pat.lower_all {
                    lit.to_ascii_lowercase()
                } else if pat.upper_all {
                    lit.to_ascii_uppercase()
                } else {
                    lit
                };
                *tpos += 1;
                self.literal_match(c, lit)
            }
        };
        Ok(matched != negated)
    }

    fn match_ctrl_e(&self, pat: &mut Pattern, tpos: &mut usize, negated: bool) -> Result<bool> {
        let Some(c) = self.buffer.at(*tpos) else {
            return Ok(false);
        };
        let sel = pat.next()?;
        let matched = match sel.to_ascii_uppercase() {
            b'A' => simple(tpos, c.is_ascii_alphabetic()),
            b'B' | b'S' => {
                if c == b' ' || c == b'\t' {
                    *tpos += 1;
                    if !negated {
                        // A blank run swallows every adjacent blank.
                        while matches!(self.buffer.at(*tpos), Some(b' ') | Some(b'\t')) {
                            *tpos += 1;
                        }
                    }
                    true
                } else {
                    *tpos += 1;
                    false
                }
            }
            b'C' => simple(tpos, self.is_symbol(c)),
            b'D' => simple(tpos, c.is_ascii_digit()),
            b'G' => {
                let r = self.scan_qname(pat)?;
                simple(tpos, self.qregs.text(r).contains(&c))
            }
            b'L' => simple(tpos, is_delim(c)),
            b'R' => simple(tpos, c.is_ascii_alphanumeric()),
            b'V' => simple(tpos, c.is_ascii_lowercase()),
            b'W' => simple(tpos, c.is_ascii_uppercase()),
            b'X' => simple(tpos, true),
            b'0'..=b'9' => {
                let mut value = (sel - b'0') as u32;
                while let Some(d @ b'0'..=b'9') = pat.peek() {
                    pat.next()?;
                    value = value * 10 + (d - b'0') as u32;
                }
                simple(tpos, value <= u8::MAX as u32 && c == value as u8)
            }
            _ => return Err(Error::InvalidCtrlE),
        };
        Ok(matched != negated)
    }

    fn scan_qname(&self, pat: &mut Pattern) -> Result<QregRef> {
        let mut name = pat.next().map_err(|_| Error::InvalidQName(0))?;
        let local = name == b'.';
        if local {
            name = pat.next().map_err(|_| Error::InvalidQName(0))?;
        }
        QregRef::resolve(name, local)
    }

    fn is_symbol(&self, c: u8) -> bool {
        c.is_ascii_alphanumeric()
            || c == b'.'
            || (self.cfg.symbol_dollar && c == b'$')
            || (self.cfg.symbol_ubar && c == b'_')
    }

    fn literal_match(&self, c: u8, lit: u8) -> bool {
        match self.cfg.ctrl_x {
            -1 => c == lit,
            0 => fold_old(c) == fold_old(lit),
            _ => c.to_ascii_uppercase() == lit.to_ascii_uppercase(),
        }
    }
}

fn simple(tpos: &mut usize, matched: bool) -> bool {
    *tpos += 1;
    matched
}

/// The pre-ASCII-1977 folding: case-insensitive, with the five punctuation
/// pairs that differ only in bit 6 treated as equal.
fn fold_old(c: u8) -> u8 {
    let c = c.to_ascii_uppercase();
    if matches!(c, b'`' | b'{' | b'|' | b'}' | b'~') {
        c - 0x20
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_buffer::{EDIT_MAX_FLAT, EDIT_MIN};

    fn fixture(text: &[u8]) -> (EditBuffer, QregFile) {
        let mut b = EditBuffer::new(EDIT_MIN, EDIT_MAX_FLAT);
        b.insert(text).unwrap();
        b.set_dot(0);
        (b, QregFile::new())
    }

    fn cfg(ctrl_x: Int) -> MatchConfig {
        MatchConfig {
            ctrl_x,
            ..MatchConfig::default()
        }
    }

    #[test]
    fn plain_forward_search() {
        let (b, q) = fixture(b"the quick brown fox");
        let m = Matcher::new(&b, &q, cfg(0));
        let span = m.find_forward(b"quick", 0, b.zed(), 1, false).unwrap();
        assert_eq!(span, Some(Span { start: 4, end: 9 }));
    }

    #[test]
    fn nth_occurrence_and_movedot() {
        let (b, q) = fixture(b"aaaa");
        let m = Matcher::new(&b, &q, cfg(0));
        // Default stepping skips the match length: "aa" at 0, then at 2.
        let span = m.find_forward(b"aa", 0, b.zed(), 2, false).unwrap();
        assert_eq!(span, Some(Span { start: 2, end: 4 }));
        // movedot steps one byte: second occurrence starts at 1.
        let span = m.find_forward(b"aa", 0, b.zed(), 2, true).unwrap();
        assert_eq!(span, Some(Span { start: 1, end: 3 }));
    }

    #[test]
    fn backward_search_finds_nearest_first() {
        let (b, q) = fixture(b"ab ab ab");
        let m = Matcher::new(&b, &q, cfg(0));
        let span = m.find_backward(b"ab", 7, 0, 1).unwrap();
        assert_eq!(span, Some(Span { start: 6, end: 8 }));
        let span = m.find_backward(b"ab", 5, 0, 2).unwrap();
        assert_eq!(span, Some(Span { start: 0, end: 2 }));
    }

    #[test]
    fn case_folding_modes() {
        let (b, q) = fixture(b"Hello{World");
        let m = Matcher::new(&b, &q, cfg(1));
        assert!(m.match_at(b"hello", 0).unwrap().is_some());
        // Mode 0 additionally pairs '[' with '{'.
        let m = Matcher::new(&b, &q, cfg(0));
        assert!(m.match_at(b"HELLO[WORLD", 0).unwrap().is_some());
        // Exact mode rejects the case difference.
        let m = Matcher::new(&b, &q, cfg(-1));
        assert!(m.match_at(b"hello", 0).unwrap().is_none());
        assert!(m.match_at(b"Hello", 0).unwrap().is_some());
    }

    #[test]
    fn quoted_literal_bypasses_folding() {
        let (b, q) = fixture(b"aXb");
        let m = Matcher::new(&b, &q, cfg(1));
        assert!(m.match_at(&[b'a', CTRL_Q, b'X', b'b'], 0).unwrap().is_some());
        assert!(m.match_at(&[b'a', CTRL_Q, b'x', b'b'], 0).unwrap().is_none());
    }

    #[test]
    fn class_constructs() {
        let (b, q) = fixture(b"a1 \t!\n");
        let m = Matcher::new(&b, &q, cfg(0));
        // ^EA ^ED ^EB (blank run) then a literal and ^EL.
        let pat = [
            CTRL_E, b'A', CTRL_E, b'D', CTRL_E, b'B', b'!', CTRL_E, b'L',
        ];
        assert_eq!(m.match_at(&pat, 0).unwrap(), Some(6));
    }

    #[test]
    fn wildcard_and_nonalnum() {
        let (b, q) = fixture(b"x.y");
        let m = Matcher::new(&b, &q, cfg(0));
        assert_eq!(m.match_at(&[CTRL_X, CTRL_S, CTRL_X], 0).unwrap(), Some(3));
        assert!(m.match_at(&[CTRL_S], 0).unwrap().is_none()); // 'x' is alnum
    }

    #[test]
    fn negation() {
        let (b, q) = fixture(b"a1");
        let m = Matcher::new(&b, &q, cfg(0));
        // ^N^ED: not a digit.
        assert!(m.match_at(&[CTRL_N, CTRL_E, b'D'], 0).unwrap().is_some());
        assert!(m.match_at(&[CTRL_N, CTRL_E, b'A'], 0).unwrap().is_none());
    }

    #[test]
    fn qreg_membership() {
        let (b, mut q) = fixture(b"x");
        q.store_text(QregRef::resolve(b'V', false).unwrap(), b"aeioux".to_vec());
        let m = Matcher::new(&b, &q, cfg(0));
        assert!(m.match_at(&[CTRL_E, b'G', b'V'], 0).unwrap().is_some());
        q.store_text(QregRef::resolve(b'V', false).unwrap(), b"aeiou".to_vec());
        let m = Matcher::new(&b, &q, cfg(0));
        assert!(m.match_at(&[CTRL_E, b'G', b'V'], 0).unwrap().is_none());
    }

    #[test]
    fn byte_value_construct() {
        let (b, q) = fixture(b"\x07z");
        let m = Matcher::new(&b, &q, cfg(0));
        assert_eq!(m.match_at(&[CTRL_E, b'7', b'z'], 0).unwrap(), Some(2));
    }

    #[test]
    fn case_conversion_constructs() {
        let (b, q) = fixture(b"abC");
        let m = Matcher::new(&b, &q, cfg(-1));
        // ^V forces the next pattern byte to lower case.
        assert!(m.match_at(&[CTRL_V, b'A', b'b', b'C'], 0).unwrap().is_some());
        // ^W^W forces the rest upper; 'c' in the pattern then matches 'C'.
        assert!(m
            .match_at(&[b'a', b'b', CTRL_W, CTRL_W, b'c'], 0)
            .unwrap()
            .is_some());
    }

    #[test]
    fn bad_constructs_are_errors() {
        let (b, q) = fixture(b"x");
        let m = Matcher::new(&b, &q, cfg(0));
        assert_eq!(m.match_at(&[CTRL_E, b'!'], 0), Err(Error::InvalidCtrlE));
        assert_eq!(m.match_at(&[CTRL_Q], 0), Err(Error::InvalidSearchString));
    }
}
