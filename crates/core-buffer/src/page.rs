//! Page bookkeeping for the paging commands.
//!
//! The edit buffer holds one logical page at a time. Pages the user has
//! moved past are owned by this list: a queue of pages waiting to be written
//! on flush, and a stack of pages available for backward paging. Each page
//! snapshots the CR/LF output mode that was current when it was cut, plus
//! the number of CRs that the output translation will inject, so late flag
//! changes cannot corrupt already-paged data.

use crate::EditBuffer;
use core_model::{Error, Result, CR, FF, LF, NUL};
use std::collections::VecDeque;
use std::io::Write;

#[derive(Debug, Clone)]
pub struct Page {
    pub data: Vec<u8>,
    /// CRs the output translation will add in front of bare LFs.
    pub cr_count: usize,
    /// Emit CR before bare LF when writing this page.
    pub crlf_out: bool,
    /// A form feed terminates this page on output.
    pub ff: bool,
}

impl Page {
    /// Snapshot an absolute range of the edit buffer as a page.
    pub fn from_buffer(
        buffer: &EditBuffer,
        start: usize,
        end: usize,
        ff: bool,
        crlf_out: bool,
    ) -> Self {
        let data = buffer.copy_range(start, end);
        let mut cr_count = 0;
        let mut last = NUL;
        for &c in &data {
            if c == LF && last != CR && crlf_out {
                cr_count += 1;
            }
            last = c;
        }
        Self {
            data,
            cr_count,
            crlf_out,
            ff,
        }
    }

    /// Write the page through the output translation.
    pub fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        let mut translated = Vec::with_capacity(self.data.len() + self.cr_count + 1);
        let mut last = NUL;
        for &c in &self.data {
            if c == LF && last != CR && self.crlf_out {
                translated.push(CR);
            }
            translated.push(c);
            last = c;
        }
        if self.ff {
            translated.push(FF);
        }
        out.write_all(&translated)
            .map_err(|e| Error::SystemCall(e.to_string()))
    }
}

/// Outcome of loading a page into the edit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YankOutcome {
    /// The loaded page was terminated by a form feed.
    pub ctrl_e: bool,
}

#[derive(Debug, Default)]
pub struct PageList {
    queue: VecDeque<Page>,
    stack: Vec<Page>,
    count: usize,
}

impl PageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page number (0 when the buffer has never held data).
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    pub fn has_backward(&self) -> bool {
        !self.stack.is_empty() || !self.queue.is_empty()
    }

    /// Cut `[start, end)` of the buffer as the next output page and, if a
    /// previously stacked page exists, reload it. Returns the outcome of the
    /// reload, or None when no stacked page was available (the caller yanks
    /// from the input file instead).
    pub fn page_forward(
        &mut self,
        buffer: &mut EditBuffer,
        start: usize,
        end: usize,
        ff: bool,
        crlf_out: bool,
        nopage: bool,
    ) -> Result<Option<YankOutcome>> {
        if start != end {
            let page = Page::from_buffer(buffer, start, end, ff, crlf_out);
            if !nopage && ff {
                // Any form feeds the user typed into the page are page
                // boundaries of their own when counting for -P.
                self.count += page.data.iter().filter(|&&c| c == FF).count();
            }
            self.queue.push_back(page);
        }
        self.count += 1;
        self.pop_into(buffer, nopage)
    }

    /// Queue a buffer range as an output page without touching the buffer
    /// (m,nP writes a range and stays put).
    pub fn queue_range(
        &mut self,
        buffer: &EditBuffer,
        start: usize,
        end: usize,
        ff: bool,
        crlf_out: bool,
    ) {
        if start != end {
            self.queue
                .push_back(Page::from_buffer(buffer, start, end, ff, crlf_out));
        }
    }

    /// Stash the whole buffer and reload the previous page. Returns false
    /// when there is no previous page (the buffer is then empty).
    pub fn page_backward(
        &mut self,
        buffer: &mut EditBuffer,
        ff: bool,
        crlf_out: bool,
        nopage: bool,
    ) -> Result<bool> {
        if !buffer.is_empty() {
            let page = Page::from_buffer(buffer, 0, buffer.zed(), ff, crlf_out);
            buffer.kill();
            self.stack.push(page);
        }
        match self.queue.pop_back() {
            Some(page) => {
                self.stack.push(page);
                let loaded = self.pop_into(buffer, nopage)?.is_some();
                if loaded && self.count > 0 {
                    self.count -= 1;
                }
                Ok(loaded)
            }
            None => {
                if self.count > 0 {
                    self.count -= 1;
                }
                Ok(false)
            }
        }
    }

    /// Discard the current buffer contents and reload the previous page
    /// (the EY analogue of backward paging).
    pub fn yank_backward(&mut self, buffer: &mut EditBuffer, nopage: bool) -> Result<()> {
        buffer.kill();
        if self.pop_into(buffer, nopage)?.is_none() {
            if let Some(page) = self.queue.pop_back() {
                self.load(buffer, page, nopage)?;
            }
        }
        if self.count > 0 {
            self.count -= 1;
        }
        Ok(())
    }

    /// Write all held pages (queue first, then the backward stack) and
    /// forget them.
    pub fn flush(&mut self, out: &mut dyn Write) -> Result<()> {
        while let Some(page) = self.queue.pop_front() {
            page.write_to(out)?;
        }
        while let Some(page) = self.stack.pop() {
            page.write_to(out)?;
        }
        self.count = 0;
        Ok(())
    }

    /// Drop every held page (EK).
    pub fn clear(&mut self) {
        self.queue.clear();
        self.stack.clear();
        self.count = 0;
    }

    fn pop_into(&mut self, buffer: &mut EditBuffer, nopage: bool) -> Result<Option<YankOutcome>> {
        match self.stack.pop() {
            Some(page) => Ok(Some(self.load(buffer, page, nopage)?)),
            None => Ok(None),
        }
    }

    /// Replace the buffer contents with a page. A form feed the user left
    /// inside the page splits it: the tail goes to the buffer and the head
    /// goes back on the queue as a complete page of its own.
    fn load(&mut self, buffer: &mut EditBuffer, mut page: Page, nopage: bool) -> Result<YankOutcome> {
        buffer.kill();
        if !nopage {
            if let Some(split) = page.data.iter().rposition(|&c| c == FF) {
                let tail = page.data.split_off(split + 1);
                page.data.pop(); // the form feed itself is a boundary
                page.ff = true;
                buffer.insert(&tail)?;
                buffer.set_dot(0);
                self.queue.push_back(page);
                return Ok(YankOutcome { ctrl_e: true });
            }
        }
        let outcome = YankOutcome { ctrl_e: page.ff };
        buffer.insert(&page.data)?;
        buffer.set_dot(0);
        Ok(outcome)
    }
}
