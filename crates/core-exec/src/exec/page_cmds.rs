//! Paging: appends from the input stream (A), yanks (Y, EY), and page
//! movement (P, PW).

use crate::command::Command;
use crate::Engine;
use core_buffer::AppendStop;
use core_model::{E3Flags, EdFlags, Error, Int, Result, FAILURE, SUCCESS};

/// Append from the current input stream at the end of the buffer, leaving
/// dot where it was. With `lines` set, at most that many lines are read;
/// otherwise the read stops at a form feed or end of file.
pub(super) fn append(eng: &mut Engine, lines: Option<Int>) -> Result<bool> {
    if !eng.files.input_open() {
        return Err(Error::NoInputFile);
    }
    eng.flags.ctrl_e = false;
    let old_dot = eng.buffer.dot() as Int;
    let zed = eng.buffer.zed() as Int;
    eng.buffer.set_dot(zed);

    let seen = eng.files.input().map(|f| f.seen_terminator).unwrap_or(false);
    let mut opts = eng.append_options(seen);
    let mut saw_ff = false;
    let mut hit_eof = false;
    {
        let crate::Engine { buffer, files, .. } = eng;
        let Some(input) = files.input() else {
            return Err(Error::NoInputFile);
        };
        match lines {
            Some(count) => {
                for _ in 0..count.max(0) {
                    match buffer.append_from(&mut input.reader, &mut opts, true)? {
                        AppendStop::Line => continue,
                        AppendStop::FormFeed => {
                            saw_ff = true;
                            break;
                        }
                        AppendStop::Eof => {
                            hit_eof = true;
                            break;
                        }
                    }
                }
            }
            None => match buffer.append_from(&mut input.reader, &mut opts, false)? {
                AppendStop::FormFeed => saw_ff = true,
                AppendStop::Eof => hit_eof = true,
                AppendStop::Line => {}
            },
        }
        input.seen_terminator = opts.seen_terminator;
        if hit_eof {
            input.eof = true;
        }
    }
    eng.absorb_append_options(&opts);
    eng.flags.ctrl_e = saw_ff;
    eng.buffer.set_dot(old_dot);
    Ok(!hit_eof)
}

/// Replace the buffer with the next page from the input. Returns false when
/// the input was already exhausted.
pub(crate) fn yank_next(eng: &mut Engine) -> Result<bool> {
    if !eng.files.input_open() {
        return Err(Error::NoInputFile);
    }
    let was_eof = eng.files.input().map(|f| f.eof).unwrap_or(true);
    eng.buffer.kill();
    append(eng, None)?;
    eng.buffer.set_dot(0);
    if eng.buffer.is_empty() && was_eof {
        return Ok(false);
    }
    Ok(true)
}

/// A: append the next page to the buffer; nA: the character value at
/// dot+n; n:A: append n lines, returning success/failure.
pub(super) fn exec_a(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if cmd.colon {
        if cmd.n.map(|n| n < 0).unwrap_or(false) {
            return Err(Error::InvalidAppend);
        }
        let more = append(eng, cmd.n)?;
        return eng.estack.push_val(if more { SUCCESS } else { FAILURE });
    }
    if let Some(n) = cmd.n {
        let value = eng.buffer.read(n).map(Int::from).unwrap_or(-1);
        return eng.estack.push_val(value);
    }
    append(eng, None)?;
    Ok(())
}

/// Y (with yank protection) and EY (without).
pub(super) fn exec_y(eng: &mut Engine, cmd: &mut Command, protected: bool) -> Result<()> {
    if cmd.n.is_some() {
        return Err(Error::NumericYank);
    }
    if protected
        && !eng.buffer.is_empty()
        && eng.files.output_open()
        && !eng.flags.ed.contains(EdFlags::YANK)
    {
        if cmd.colon {
            return eng.estack.push_val(FAILURE);
        }
        return Err(Error::YankAborted);
    }
    match yank_next(eng) {
        Ok(got) => {
            if cmd.colon {
                eng.estack.push_val(if got { SUCCESS } else { FAILURE })?;
            }
            Ok(())
        }
        Err(e) => {
            if cmd.colon && e == Error::NoInputFile {
                return eng.estack.push_val(FAILURE);
            }
            Err(e)
        }
    }
}

/// One forward page step: cut the buffer as an output page (held in memory
/// with paging on, written straight through otherwise) and bring in the
/// next page, preferring a stacked backward page over the input file.
/// Returns false when there was nothing further to load.
pub(super) fn page_forward_step(eng: &mut Engine, ff: bool) -> Result<bool> {
    let zed = eng.buffer.zed();
    let crlf_out = eng.flags.e3.contains(E3Flags::CR_OUT);
    let nopage = eng.flags.e3.contains(E3Flags::NOPAGE);
    if eng.vm_paging {
        let crate::Engine { buffer, pages, .. } = eng;
        if let Some(outcome) = pages.page_forward(buffer, 0, zed, ff, crlf_out, nopage)? {
            eng.flags.ctrl_e = outcome.ctrl_e;
            return Ok(true);
        }
    } else {
        let page = core_buffer::Page::from_buffer(&eng.buffer, 0, zed, ff, crlf_out);
        let crate::Engine { files, .. } = eng;
        let Some(out) = files.output() else {
            return Err(Error::NoOutputFile);
        };
        page.write_to(out.writer())?;
    }
    if eng.files.input_open() {
        yank_next(eng)
    } else {
        eng.buffer.kill();
        Ok(false)
    }
}

pub(super) fn exec_p(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    // PW is spelled as a suffix.
    let write_only = matches!(eng.cbuf.peek(), Some(b'w') | Some(b'W'));
    if write_only {
        eng.cbuf.next();
    }
    if !eng.files.output_open() {
        return Err(Error::NoOutputFile);
    }
    let nopage = eng.flags.e3.contains(E3Flags::NOPAGE);
    let crlf_out = eng.flags.e3.contains(E3Flags::CR_OUT);

    if let (Some(m), Some(n)) = (cmd.m, cmd.n) {
        // m,nP writes a range of the buffer and moves nothing.
        let (a, b) = if m <= n { (m, n) } else { (n, m) };
        if b > eng.buffer.zed() as Int {
            return Err(Error::PointerOffPage('P'));
        }
        let ff = if write_only { !nopage } else { false };
        if eng.vm_paging {
            let crate::Engine { buffer, pages, .. } = eng;
            pages.queue_range(buffer, a as usize, b as usize, ff, crlf_out);
        } else {
            let page =
                core_buffer::Page::from_buffer(&eng.buffer, a as usize, b as usize, ff, crlf_out);
            let crate::Engine { files, .. } = eng;
            let Some(out) = files.output() else {
                return Err(Error::NoOutputFile);
            };
            page.write_to(out.writer())?;
        }
        return Ok(());
    }

    let count = cmd.n_or(1);
    if count == 0 || (count < 0 && write_only) {
        return Err(Error::InvalidPage);
    }

    let mut moved = true;
    if count < 0 {
        if !eng.vm_paging {
            return Err(Error::NotConfigured);
        }
        for _ in 0..-count {
            let ff = eng.flags.ctrl_e;
            let crate::Engine { buffer, pages, .. } = eng;
            moved = pages.page_backward(buffer, ff, crlf_out, nopage)?;
            if !moved {
                break;
            }
        }
    } else if write_only {
        // PW writes the buffer as a page (with its form feed) and keeps it.
        let ff = !nopage;
        for _ in 0..count {
            if eng.vm_paging {
                let zed = eng.buffer.zed();
                let crate::Engine { buffer, pages, .. } = eng;
                pages.queue_range(buffer, 0, zed, ff, crlf_out);
            } else {
                let zed = eng.buffer.zed();
                let page = core_buffer::Page::from_buffer(&eng.buffer, 0, zed, ff, crlf_out);
                let crate::Engine { files, .. } = eng;
                let Some(out) = files.output() else {
                    return Err(Error::NoOutputFile);
                };
                page.write_to(out.writer())?;
            }
        }
    } else {
        for _ in 0..count {
            let ff = eng.flags.ctrl_e;
            moved = page_forward_step(eng, ff)?;
            if !moved {
                break;
            }
        }
    }
    if cmd.colon {
        eng.estack.push_val(if moved { SUCCESS } else { FAILURE })?;
    }
    Ok(())
}
