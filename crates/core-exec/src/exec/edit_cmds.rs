//! Buffer mutation: insertion, deletion, case conversion, and the digit
//! string command.

use crate::build;
use crate::command::Command;
use crate::Engine;
use core_model::{Error, Int, Radix, Result, FAILURE, SUCCESS, TAB};

pub(super) fn exec_i(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if let Some(n) = cmd.n {
        // nI` inserts the single character with code n.
        if !cmd.text1.is_empty() {
            return Err(Error::InvalidInsert);
        }
        if !(0..=255).contains(&n) {
            return Err(Error::InvalidInsert);
        }
        eng.buffer.insert(&[n as u8])?;
        eng.last_len = 1;
        return Ok(());
    }
    let text = build::build_string(eng, &cmd.text1)?;
    eng.buffer.insert(&text)?;
    eng.last_len = text.len();
    Ok(())
}

/// `^I`: insert a tab followed by the text argument.
pub(super) fn exec_tab(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let mut text = vec![TAB];
    text.extend(build::build_string(eng, &cmd.text1)?);
    eng.buffer.insert(&text)?;
    eng.last_len = text.len();
    Ok(())
}

pub(super) fn exec_d(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if let (Some(m), Some(n)) = (cmd.m, cmd.n) {
        // m,nD deletes between two absolute positions.
        let (a, b) = if m <= n { (m, n) } else { (n, m) };
        if a < 0 || b > eng.buffer.zed() as Int {
            return Err(Error::PointerOffPage('D'));
        }
        eng.buffer.set_dot(a);
        return eng.buffer.delete(b - a);
    }
    match eng.buffer.delete(cmd.n_or(1)) {
        Ok(()) => {
            if cmd.colon {
                eng.estack.push_val(SUCCESS)?;
            }
            Ok(())
        }
        Err(Error::DeleteTooBig) if cmd.colon => eng.estack.push_val(FAILURE),
        Err(e) => Err(e),
    }
}

pub(super) fn exec_k(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if let (Some(m), Some(n)) = (cmd.m, cmd.n) {
        let (a, b) = if m <= n { (m, n) } else { (n, m) };
        if a < 0 || b > eng.buffer.zed() as Int {
            return Err(Error::PointerOffPage('K'));
        }
        eng.buffer.set_dot(a);
        return eng.buffer.delete(b - a);
    }
    let delta = eng.buffer.len_to_line(cmd.n_or(1));
    eng.buffer.delete(delta)
}

/// `\`: with n, insert the number's digits in the current radix; without,
/// read the digit string at dot and push its value, advancing dot past it.
pub(super) fn exec_bslash(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if let Some(n) = cmd.n {
        let digits = eng.format_radix(n);
        eng.buffer.insert(digits.as_bytes())?;
        eng.last_len = digits.len();
        return Ok(());
    }
    let base = eng.flags.radix.base() as Int;
    let hex = eng.flags.radix == Radix::Hex;
    let mut pos: Int = 0;
    let mut minus = false;
    match eng.buffer.read(0) {
        Some(b'+') => pos = 1,
        Some(b'-') => {
            pos = 1;
            minus = true;
        }
        _ => {}
    }
    let mut value: Int = 0;
    let mut ndigits = 0usize;
    while let Some(c) = eng.buffer.read(pos) {
        let digit = match c {
            b'0'..=b'9' => (c - b'0') as Int,
            b'a'..=b'f' if hex => (c - b'a') as Int + 10,
            b'A'..=b'F' if hex => (c - b'A') as Int + 10,
            _ => break,
        };
        if digit >= base {
            break;
        }
        value = value.wrapping_mul(base).wrapping_add(digit);
        ndigits += 1;
        pos += 1;
    }
    if ndigits > 0 {
        if minus {
            value = -value;
        }
        eng.buffer.move_dot(pos);
    }
    eng.estack.push_val(value)
}

fn case_region(eng: &mut Engine, cmd: &mut Command, upper: bool) -> Result<()> {
    let (start, end) = if let (Some(m), Some(n)) = (cmd.m, cmd.n) {
        let (a, b) = if m <= n { (m, n) } else { (n, m) };
        if a < 0 || b > eng.buffer.zed() as Int {
            return Err(Error::PointerOffPage(if upper { 'U' } else { 'L' }));
        }
        (a as usize, b as usize)
    } else {
        let dot = eng.buffer.dot() as Int;
        let delta = eng.buffer.len_to_line(cmd.n_or(1));
        let target = dot + delta;
        if delta < 0 {
            (target as usize, dot as usize)
        } else {
            (dot as usize, target as usize)
        }
    };
    for i in start..end {
        if let Some(c) = eng.buffer.at(i) {
            let converted = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            if converted != c {
                eng.buffer.replace_at(i, converted);
            }
        }
    }
    Ok(())
}

pub(super) fn exec_fl(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    case_region(eng, cmd, false)
}

pub(super) fn exec_fu(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    case_region(eng, cmd, true)
}
