//! Type-out: T, V, =, ^A, and ^T.

use crate::build;
use crate::command::Command;
use crate::Engine;
use core_model::{Error, Int, Result};

/// Resolve the range a line-oriented type command covers.
fn line_range(eng: &Engine, cmd: &Command, around: bool) -> Result<(usize, usize)> {
    if let (Some(m), Some(n)) = (cmd.m, cmd.n) {
        let (a, b) = if m <= n { (m, n) } else { (n, m) };
        if a < 0 || b > eng.buffer.zed() as Int {
            return Err(Error::PointerOffPage('T'));
        }
        return Ok((a as usize, b as usize));
    }
    let dot = eng.buffer.dot() as Int;
    if around {
        // nV: n-1 lines either side of the current line.
        let n = cmd.n_or(1).max(1);
        let start = dot + eng.buffer.len_to_line(1 - n);
        let end = dot + eng.buffer.len_to_line(n);
        Ok((start as usize, end as usize))
    } else {
        let n = cmd.n_or(1);
        let delta = eng.buffer.len_to_line(n);
        if delta < 0 {
            Ok(((dot + delta) as usize, dot as usize))
        } else {
            Ok((dot as usize, (dot + delta) as usize))
        }
    }
}

pub(super) fn exec_t(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let (start, end) = line_range(eng, cmd, false)?;
    let bytes = eng.buffer.copy_range(start, end);
    eng.type_bytes(&bytes);
    Ok(())
}

pub(super) fn exec_v(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let (start, end) = line_range(eng, cmd, true)?;
    let bytes = eng.buffer.copy_range(start, end);
    eng.type_bytes(&bytes);
    Ok(())
}

/// `n=` types n in decimal; `n==` octal; `n===` hexadecimal. A colon
/// suppresses the line terminator.
pub(super) fn exec_equals(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let n = cmd.n.ok_or(Error::NoArgBeforeEquals)?;
    let mut extra = 0;
    while extra < 2 && eng.cbuf.peek() == Some(b'=') {
        eng.cbuf.next();
        extra += 1;
    }
    let text = match extra {
        0 => format!("{n}"),
        1 => {
            if n < 0 {
                format!("-{:o}", n.unsigned_abs())
            } else {
                format!("{n:o}")
            }
        }
        _ => {
            if n < 0 {
                format!("-{:x}", n.unsigned_abs())
            } else {
                format!("{n:x}")
            }
        }
    };
    eng.type_str(&text);
    if !cmd.colon {
        eng.type_newline();
    }
    Ok(())
}

/// `^A message ^A`: type the text argument.
pub(super) fn exec_ctrl_a(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let text = build::build_string(eng, &cmd.text1)?;
    eng.type_bytes(&text);
    Ok(())
}

/// `n^T` types character n; `^T` reads one key and pushes its value
/// (or -1 when no input is available).
pub(super) fn exec_ctrl_t(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    match cmd.n {
        Some(n) => {
            let c = (n & 0xff) as u8;
            eng.type_bytes(&[c]);
            Ok(())
        }
        None => {
            let value = eng.term.read_key().map(Int::from).unwrap_or(-1);
            eng.estack.push_val(value)
        }
    }
}
