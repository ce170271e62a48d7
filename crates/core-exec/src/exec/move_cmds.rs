//! Dot movement: C, R, J, L, and the ^Q line-distance value.

use crate::command::Command;
use crate::Engine;
use core_model::{Error, Int, Result, FAILURE, SUCCESS};

/// Move dot to an absolute target, or fail. A colon-modified move pushes
/// -1/0 instead of raising the pointer-off-page error.
fn move_to(eng: &mut Engine, cmd: &Command, target: Int, which: char) -> Result<()> {
    let in_range = target >= 0 && target <= eng.buffer.zed() as Int;
    if in_range {
        eng.buffer.set_dot(target);
    }
    if cmd.colon {
        eng.estack.push_val(if in_range { SUCCESS } else { FAILURE })
    } else if in_range {
        Ok(())
    } else {
        Err(Error::PointerOffPage(which))
    }
}

pub(super) fn exec_c(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let target = eng.buffer.dot() as Int + cmd.n_or(1);
    move_to(eng, cmd, target, 'C')
}

pub(super) fn exec_r(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let target = eng.buffer.dot() as Int - cmd.n_or(1);
    move_to(eng, cmd, target, 'R')
}

pub(super) fn exec_j(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let target = cmd.n_or(0);
    move_to(eng, cmd, target, 'J')
}

pub(super) fn exec_l(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if cmd.colon {
        // Line counting instead of movement: :L is the total line count,
        // 0:L the line containing dot.
        let value = match cmd.n {
            None => eng.buffer.nlines() as Int,
            Some(0) => eng.buffer.line() as Int,
            Some(n) => {
                // Lines remaining in the given direction.
                let total = eng.buffer.nlines() as Int;
                let here = eng.buffer.line() as Int;
                if n > 0 {
                    total - here
                } else {
                    here
                }
            }
        };
        return eng.estack.push_val(value);
    }
    let delta = eng.buffer.len_to_line(cmd.n_or(1));
    eng.buffer.move_dot(delta);
    Ok(())
}

pub(super) fn exec_ctrl_q(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let delta = eng.buffer.len_to_line(cmd.n_or(0));
    eng.estack.push_val(delta)
}
