//! Flow control: loops, conditionals, tags and branches, escape, and the
//! interrupt command.

use crate::build;
use crate::command::Command;
use crate::skip::CondEnd;
use crate::Engine;
use core_model::{Error, Int, Result};

/// ESC discards any pending arguments.
pub(super) fn exec_escape(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    eng.estack.clear();
    eng.nparens = 0;
    Ok(())
}

/// ^C abandons the command string.
pub(super) fn exec_ctrl_c(_eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    Err(Error::Aborted)
}

/// `!tag!` is a branch target and otherwise a comment.
pub(super) fn exec_bang(_eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    Ok(())
}

// ----- loops -----------------------------------------------------------------

pub(super) fn exec_loop_start(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if eng.loops.len() >= crate::MAX_LOOPS {
        return Err(Error::LimitReached);
    }
    if let Some(n) = cmd.n {
        if n <= 0 {
            // A non-positive count skips the whole iteration.
            return eng.skip_to_loop_end(true);
        }
    }
    eng.loops.push(crate::Loop {
        iter: cmd.n,
        pos: eng.cbuf.pos(),
        if_depth: eng.if_depth,
    });
    Ok(())
}

pub(super) fn exec_loop_end(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    let Some(frame) = eng.loops.last_mut() else {
        return Err(Error::NotInLoop);
    };
    let again = match frame.iter.as_mut() {
        Some(k) => {
            *k -= 1;
            *k > 0
        }
        None => true,
    };
    if again {
        let pos = frame.pos;
        let depth = frame.if_depth;
        eng.cbuf.set_pos(pos);
        eng.if_depth = depth;
    } else {
        eng.loops.pop();
    }
    Ok(())
}

/// `n;` exits the loop when n is non-negative; `n:;` when n is negative.
pub(super) fn exec_semi(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if !eng.in_loop() {
        return Err(Error::SemiNotInLoop);
    }
    let n = cmd.n.ok_or(Error::NoArgBeforeSemi)?;
    let exit = if cmd.colon { n < 0 } else { n >= 0 };
    if exit {
        eng.exit_loop()?;
    }
    Ok(())
}

/// F>: flow to the end of the current iteration (the `>` executes next and
/// decides whether to go round again).
pub(super) fn exec_f_gt(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    if !eng.in_loop() {
        return Err(Error::NotInLoop);
    }
    eng.skip_to_loop_end(false)
}

/// F<: restart the current iteration from the top of the loop.
pub(super) fn exec_f_lt(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    let Some(frame) = eng.loops.last() else {
        return Err(Error::NotInLoop);
    };
    let pos = frame.pos;
    let depth = frame.if_depth;
    eng.cbuf.set_pos(pos);
    eng.if_depth = depth;
    Ok(())
}

// ----- conditionals ----------------------------------------------------------

fn condition_holds(selector: u8, n: Int) -> Result<bool> {
    let b = (n & 0xff) as u8;
    let holds = match selector.to_ascii_uppercase() {
        b'A' => b.is_ascii_alphabetic(),
        b'C' => b.is_ascii_alphanumeric() || b == b'.' || b == b'$' || b == b'_',
        b'D' => b.is_ascii_digit(),
        b'E' | b'F' | b'U' | b'=' => n == 0,
        b'G' | b'>' => n > 0,
        b'L' | b'<' => n < 0,
        b'N' | b'S' | b'T' => n != 0,
        b'R' => b.is_ascii_alphanumeric(),
        b'V' => b.is_ascii_lowercase(),
        b'W' => b.is_ascii_uppercase(),
        b'"' => true,
        c => return Err(Error::InvalidQuote(c)),
    };
    Ok(holds)
}

/// `"x`: test the pending value against the class selector x. A failed test
/// skips to the else-branch (or past the conditional).
pub(super) fn exec_quote(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let selector = eng.require_byte().map_err(|_| Error::MissingApostrophe)?;
    let n = cmd.n.ok_or(Error::NoArgBeforeQuote)?;
    if condition_holds(selector, n)? {
        eng.if_depth += 1;
        return Ok(());
    }
    match eng.skip_cond(true)? {
        // Landed just past the `|`: execute the else branch.
        CondEnd::Else => {
            eng.if_depth += 1;
            Ok(())
        }
        // The whole conditional was skipped.
        CondEnd::Apos => Ok(()),
    }
}

pub(super) fn exec_apos(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    if eng.if_depth == 0 {
        return Err(Error::MissingStartOfCond);
    }
    eng.if_depth -= 1;
    Ok(())
}

/// `|` reached at the end of a true branch: skip the else branch.
pub(super) fn exec_pipe(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    if eng.if_depth == 0 {
        return Err(Error::MissingStartOfCond);
    }
    eng.skip_cond(false)?;
    eng.if_depth -= 1;
    Ok(())
}

/// F': flow past the end of the current conditional.
pub(super) fn exec_f_apos(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    if eng.if_depth == 0 {
        return Err(Error::MissingStartOfCond);
    }
    eng.skip_cond(false)?;
    eng.if_depth -= 1;
    Ok(())
}

/// F|: flow to the else branch of the current conditional.
pub(super) fn exec_f_pipe(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    if eng.if_depth == 0 {
        return Err(Error::MissingStartOfCond);
    }
    match eng.skip_cond(true)? {
        CondEnd::Else => Ok(()),
        CondEnd::Apos => {
            // No else branch: the conditional simply ended.
            eng.if_depth -= 1;
            Ok(())
        }
    }
}

// ----- branches --------------------------------------------------------------

/// `O tag` branches to `!tag!`; `nO a,b,...` picks the nth tag from a
/// comma-separated list (out of range is a no-op).
pub(super) fn exec_o(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let built = build::build_string(eng, &cmd.text1)?;
    let tag: Vec<u8> = match cmd.n {
        Some(n) => {
            let mut parts = built.split(|&c| c == b',');
            if n < 1 {
                return Ok(());
            }
            match parts.nth((n - 1) as usize) {
                Some(part) => part.to_vec(),
                None => return Ok(()),
            }
        }
        None => built,
    };
    let tag: Vec<u8> = tag
        .iter()
        .copied()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if tag.is_empty() {
        return Err(Error::NoTag);
    }
    let target = eng.find_tag(&tag)?;
    // Branching out of the current iteration is not permitted.
    if let Some(frame) = eng.loops.last() {
        let start = frame.pos;
        let saved = eng.cbuf.pos();
        eng.cbuf.set_pos(start);
        eng.skip_to_loop_end(true)?;
        let end = eng.cbuf.pos();
        eng.cbuf.set_pos(saved);
        if target < start || target > end {
            return Err(Error::TagLocation(
                String::from_utf8_lossy(&tag).into_owned(),
            ));
        }
    }
    eng.cbuf.set_pos(target);
    Ok(())
}
