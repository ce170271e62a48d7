//! Gap-buffered edit buffer.
//!
//! The buffer is laid out as `[left region][gap][right region]` with
//! `size = left + gap + right`. Dot is a logical position in `[0, Z]` where
//! `Z = left + right`. Before any insertion or deletion the gap is shifted so
//! that dot coincides with its left edge; positive deletions then eat the
//! front of the right region and negative ones the tail of the left region.
//!
//! Alongside dot the buffer maintains the derived line quantities (`line`,
//! `pos`, `len`, `nlines`) so that they always describe the line actually
//! containing dot. Line terminators are LF, VT, and FF; CR is ordinary data.
//!
//! Growth is by half again, rounded up to a 1 KiB boundary and capped at the
//! configured ceiling. The buffer only shrinks on an explicit resize.

use core_model::{is_delim, Error, Int, Result, CR, FF, KB, LF, MB, NUL};
use std::io::BufRead;
use tracing::debug;

pub mod page;
pub use page::{Page, PageList};

/// Minimum edit buffer size.
pub const EDIT_MIN: usize = KB;
/// Default initial size.
pub const EDIT_INIT: usize = 8 * KB;
/// Default ceiling with backward paging enabled.
pub const EDIT_MAX_PAGING: usize = core_model::GB;
/// Default ceiling without paging.
pub const EDIT_MAX_FLAT: usize = MB;

/// Input conversion modes consulted while appending from a reader. The
/// append updates `cr_in`/`cr_out` itself when `smart` is set and the first
/// line terminator decides the convention.
#[derive(Debug, Clone, Copy)]
pub struct AppendOptions {
    /// Store CR+LF pairs as two bytes (otherwise the CR is dropped).
    pub cr_in: bool,
    /// Emit CR before bare LF on output (updated by smart detection only).
    pub cr_out: bool,
    /// Form feed is ordinary data, not a page boundary.
    pub nopage: bool,
    /// Keep NUL bytes instead of stripping them.
    pub keep_nul: bool,
    /// First terminator seen decides `cr_in`/`cr_out`.
    pub smart: bool,
    /// A line terminator has already been seen on this input stream.
    pub seen_terminator: bool,
}

/// Why an append stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendStop {
    /// Input exhausted.
    Eof,
    /// A form feed ended the page (not stored).
    FormFeed,
    /// A single requested line was completed.
    Line,
}

pub struct EditBuffer {
    buf: Vec<u8>,
    left: usize,
    right: usize,
    min: usize,
    max: usize,
    dot: usize,
    line: usize,
    pos: usize,
    len: usize,
    nlines: usize,
}

impl EditBuffer {
    pub fn new(init: usize, max: usize) -> Self {
        let size = round_kb(init.clamp(EDIT_MIN, max.max(EDIT_MIN)));
        Self {
            buf: vec![0; size],
            left: 0,
            right: 0,
            min: EDIT_MIN,
            max: max.max(size),
            dot: 0,
            line: 0,
            pos: 0,
            len: 0,
            nlines: 0,
        }
    }

    // ----- derived quantities ------------------------------------------------

    /// Total stored length (the TECO variable Z).
    pub fn zed(&self) -> usize {
        self.left + self.right
    }

    pub fn dot(&self) -> usize {
        self.dot
    }

    /// 0-based number of the line containing dot.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Byte offset of dot from the start of its line.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Length, terminator included, of the line containing dot.
    pub fn line_len(&self) -> usize {
        self.len
    }

    /// Total number of line terminators stored.
    pub fn nlines(&self) -> usize {
        self.nlines
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zed() == 0
    }

    fn gap(&self) -> usize {
        self.buf.len() - self.left - self.right
    }

    /// Translate a logical position to its physical index in storage.
    #[inline]
    fn phys(&self, logical: usize) -> usize {
        if logical >= self.left {
            logical + self.gap()
        } else {
            logical
        }
    }

    /// Byte at an absolute position, or None outside `[0, Z)`.
    pub fn at(&self, abs: usize) -> Option<u8> {
        if abs < self.zed() {
            Some(self.buf[self.phys(abs)])
        } else {
            None
        }
    }

    /// Byte at dot+offset, or None outside the buffer (the EOF sentinel at
    /// the command level).
    pub fn read(&self, offset: Int) -> Option<u8> {
        let abs = self.dot as Int + offset;
        if abs < 0 {
            None
        } else {
            self.at(abs as usize)
        }
    }

    /// Overwrite the byte at an absolute position in place. Only sensible
    /// for substitutions that cannot change the line structure (case
    /// conversion); a line terminator must not be written or overwritten.
    pub fn replace_at(&mut self, abs: usize, c: u8) {
        if abs < self.zed() && !is_delim(c) {
            let i = self.phys(abs);
            if !is_delim(self.buf[i]) {
                self.buf[i] = c;
            }
        }
    }

    /// Copy an absolute half-open range out of the buffer.
    pub fn copy_range(&self, start: usize, end: usize) -> Vec<u8> {
        let end = end.min(self.zed());
        let start = start.min(end);
        (start..end).map(|i| self.buf[self.phys(i)]).collect()
    }

    // ----- dot movement ------------------------------------------------------

    /// Move dot to an absolute position, clamped to `[0, Z]`, re-deriving the
    /// line quantities.
    pub fn set_dot(&mut self, target: Int) {
        let new = target.clamp(0, self.zed() as Int) as usize;
        if new == self.dot {
            return;
        }
        // Adjust the line number by the terminators crossed, then re-derive
        // pos and len from the line boundaries around the new dot.
        if new > self.dot {
            self.line += self.count_delims(self.dot, new);
        } else {
            self.line -= self.count_delims(new, self.dot);
        }
        self.dot = new;
        self.rederive();
    }

    /// Move dot relative to its current position.
    pub fn move_dot(&mut self, delta: Int) {
        self.set_dot(self.dot as Int + delta);
    }

    fn count_delims(&self, start: usize, end: usize) -> usize {
        (start..end)
            .filter(|&i| is_delim(self.buf[self.phys(i)]))
            .count()
    }

    fn rederive(&mut self) {
        let prev = self.prev_line_start(self.dot, 0);
        self.pos = self.dot - prev;
        self.len = self.next_line_pos(self.dot, 1) - prev;
    }

    /// Position just past the nth terminator at or after `from`, or Z.
    fn next_line_pos(&self, from: usize, mut nlines: usize) -> usize {
        for i in from..self.zed() {
            if is_delim(self.buf[self.phys(i)]) {
                nlines -= 1;
                if nlines == 0 {
                    return i + 1;
                }
            }
        }
        self.zed()
    }

    /// Start of the line `nlines` before the one containing `from`, or 0.
    fn prev_line_start(&self, from: usize, mut nlines: usize) -> usize {
        for i in (0..from).rev() {
            if is_delim(self.buf[self.phys(i)]) {
                if nlines == 0 {
                    return i + 1;
                }
                nlines -= 1;
            }
        }
        0
    }

    /// Signed distance from dot to the nth line terminator: forward for
    /// n > 0, backward for n <= 0 (n = 0 is the start of the current line).
    pub fn len_to_line(&self, n: Int) -> Int {
        if n > 0 {
            self.next_line_pos(self.dot, n as usize) as Int - self.dot as Int
        } else {
            self.prev_line_start(self.dot, (-n) as usize) as Int - self.dot as Int
        }
    }

    // ----- mutation ----------------------------------------------------------

    /// Insert bytes at dot. Dot ends up after the insertion.
    pub fn insert(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.start_insert(bytes.len())?;
        self.buf[self.left..self.left + bytes.len()].copy_from_slice(bytes);
        let ndelims = bytes.iter().filter(|&&c| is_delim(c)).count();
        self.nlines += ndelims;
        self.line += ndelims;
        self.left += bytes.len();
        self.dot += bytes.len();
        self.rederive();
        Ok(())
    }

    /// Delete n bytes forward (n > 0) or backward (n < 0) from dot.
    pub fn delete(&mut self, n: Int) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        if n > 0 {
            if self.dot as Int + n > self.zed() as Int {
                return Err(Error::DeleteTooBig);
            }
        } else if (self.dot as Int) + n < 0 {
            return Err(Error::DeleteTooBig);
        }
        if self.dot == 0 && n == self.zed() as Int {
            self.kill();
            return Ok(());
        }
        self.move_gap_to_dot();
        if n < 0 {
            let nbytes = (-n) as usize;
            let ndelims = self.count_phys_delims(self.left - nbytes, self.left);
            self.left -= nbytes;
            self.dot -= nbytes;
            self.nlines -= ndelims;
            self.line -= ndelims;
        } else {
            let nbytes = n as usize;
            let start = self.buf.len() - self.right;
            let ndelims = self.count_phys_delims(start, start + nbytes);
            self.right -= nbytes;
            self.nlines -= ndelims;
        }
        self.rederive();
        Ok(())
    }

    fn count_phys_delims(&self, start: usize, end: usize) -> usize {
        self.buf[start..end].iter().filter(|&&c| is_delim(c)).count()
    }

    /// Clear the buffer contents and reset the derived quantities. The
    /// storage keeps its current size.
    pub fn kill(&mut self) {
        self.left = 0;
        self.right = 0;
        self.dot = 0;
        self.line = 0;
        self.pos = 0;
        self.len = 0;
        self.nlines = 0;
    }

    /// Resize the storage: rounded up to 1 KiB, bounded by the configured
    /// minimum and maximum, never below the live contents. Returns the new
    /// size, or None if nothing changed.
    pub fn set_size(&mut self, requested: usize) -> Option<usize> {
        let size = round_kb(requested.clamp(self.min, self.max));
        if size == self.buf.len() || size <= self.left + self.right {
            return None;
        }
        // Close the gap, resize, then restore it so logical content and dot
        // survive the reallocation.
        let right = self.right;
        self.shift_left(right);
        self.buf.resize(size, 0);
        self.shift_right(right);
        debug!(size, "edit buffer resized");
        Some(size)
    }

    fn start_insert(&mut self, nbytes: usize) -> Result<()> {
        while self.gap() < nbytes {
            let want = self.buf.len() + self.buf.len() / 2;
            if self.set_size(want.max(self.left + self.right + nbytes)).is_none() {
                return Err(Error::MemoryOverflow);
            }
        }
        self.move_gap_to_dot();
        Ok(())
    }

    fn move_gap_to_dot(&mut self) {
        if self.dot < self.left {
            self.shift_right(self.left - self.dot);
        } else if self.dot > self.left {
            self.shift_left(self.dot - self.left);
        }
    }

    /// Move bytes from the front of the right region to the end of the left.
    fn shift_left(&mut self, nbytes: usize) {
        if nbytes == 0 {
            return;
        }
        let src = self.buf.len() - self.right;
        let dst = self.left;
        self.buf.copy_within(src..src + nbytes, dst);
        self.left += nbytes;
        self.right -= nbytes;
    }

    /// Move bytes from the end of the left region to the front of the right.
    fn shift_right(&mut self, nbytes: usize) {
        if nbytes == 0 {
            return;
        }
        self.left -= nbytes;
        self.right += nbytes;
        let src = self.left;
        let dst = self.buf.len() - self.right;
        self.buf.copy_within(src..src + nbytes, dst);
    }

    // ----- reader append -----------------------------------------------------

    /// Append bytes read from `src` at dot, applying the input conversions:
    /// CR+LF pairs collapse to LF unless `cr_in`, NULs are stripped unless
    /// `keep_nul`, and a form feed ends the page (unstored) unless `nopage`.
    /// With `single` set, reading stops after one complete line.
    pub fn append_from<R: BufRead>(
        &mut self,
        src: &mut R,
        opts: &mut AppendOptions,
        single: bool,
    ) -> Result<AppendStop> {
        let mut staged: Vec<u8> = Vec::new();
        let stop = loop {
            let Some(mut c) = next_byte(src)? else {
                break AppendStop::Eof;
            };
            if c == CR {
                if peek_byte(src)? == Some(LF) {
                    next_byte(src)?;
                    if opts.smart && !opts.seen_terminator {
                        opts.seen_terminator = true;
                        opts.cr_in = true;
                        opts.cr_out = true;
                    }
                    if opts.cr_in {
                        staged.push(CR);
                    }
                    c = LF;
                } else {
                    staged.push(CR);
                    continue;
                }
            } else if c == LF && opts.smart && !opts.seen_terminator {
                opts.seen_terminator = true;
                opts.cr_in = false;
                opts.cr_out = false;
            }
            if c == FF && !opts.nopage {
                break AppendStop::FormFeed;
            }
            if c == NUL && !opts.keep_nul {
                continue;
            }
            staged.push(c);
            if is_delim(c) && single {
                break AppendStop::Line;
            }
        };
        self.insert(&staged)?;
        Ok(stop)
    }
}

fn next_byte<R: BufRead>(src: &mut R) -> Result<Option<u8>> {
    let buf = src.fill_buf().map_err(|e| Error::SystemCall(e.to_string()))?;
    if buf.is_empty() {
        Ok(None)
    } else {
        let b = buf[0];
        src.consume(1);
        Ok(Some(b))
    }
}

fn peek_byte<R: BufRead>(src: &mut R) -> Result<Option<u8>> {
    let buf = src.fill_buf().map_err(|e| Error::SystemCall(e.to_string()))?;
    Ok(buf.first().copied())
}

fn round_kb(size: usize) -> usize {
    let runt = size & (KB - 1);
    if runt != 0 {
        size + KB - runt
    } else {
        size
    }
}
