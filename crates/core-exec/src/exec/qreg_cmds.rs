//! Q-register commands: Q, U, %, X, G, ^U, the push-down brackets, and
//! macro invocation.

use crate::build;
use crate::command::Command;
use crate::Engine;
use core_model::{Error, Int, Result, FAILURE, SUCCESS};

pub(super) fn exec_q(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let value = if cmd.colon {
        // :Qq is the text size in bytes.
        eng.qregs.size(r) as Int
    } else if let Some(n) = cmd.n {
        // nQq is the nth character of the text, or -1 off the end.
        eng.qregs.char_at(r, n).map(Int::from).unwrap_or(-1)
    } else {
        eng.qregs.num(r)
    };
    eng.estack.push_val(value)
}

pub(super) fn exec_u(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let n = cmd.n.ok_or(Error::NoArgBeforeU)?;
    eng.qregs.store_num(r, n);
    // m,nUq stores n and leaves m as the value.
    if let Some(m) = cmd.m {
        eng.estack.push_val(m)?;
    }
    Ok(())
}

pub(super) fn exec_pct(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let value = eng.qregs.add_num(r, cmd.n_or(1));
    eng.estack.push_val(value)
}

/// Xq: copy lines (or an m,n range) of the buffer into a register.
/// `0,0Xq` clears the register text; a colon appends instead of replacing.
pub(super) fn exec_x(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let (start, end) = if let (Some(m), Some(n)) = (cmd.m, cmd.n) {
        let (a, b) = if m <= n { (m, n) } else { (n, m) };
        if b > eng.buffer.zed() as Int {
            return Err(Error::PointerOffPage('X'));
        }
        if a == 0 && b == 0 {
            // Not in the old manuals, but macros use 0,0Xq to delete
            // register text, so it stays.
            eng.qregs.clear_text(r);
            return Ok(());
        }
        (a as usize, b as usize)
    } else {
        let dot = eng.buffer.dot() as Int;
        let delta = eng.buffer.len_to_line(cmd.n_or(1));
        if delta < 0 {
            ((dot + delta) as usize, dot as usize)
        } else {
            (dot as usize, (dot + delta) as usize)
        }
    };
    let bytes = eng.buffer.copy_range(start, end);
    if cmd.colon {
        eng.qregs.append_text(r, &bytes);
    } else {
        eng.qregs.store_text(r, bytes);
    }
    Ok(())
}

/// Gq inserts the register text at dot; :Gq types it instead.
pub(super) fn exec_g(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let text = eng.qregs.text(r).to_vec();
    if cmd.colon {
        eng.type_bytes(&text);
    } else {
        eng.buffer.insert(&text)?;
        eng.last_len = text.len();
    }
    Ok(())
}

/// `^Uq text`: set register text; `n^Uq` a single character; a colon
/// appends.
pub(super) fn exec_ctrl_u(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let bytes = if let Some(n) = cmd.n {
        if !cmd.text1.is_empty() {
            return Err(Error::NArgAndText);
        }
        vec![(n & 0xff) as u8]
    } else {
        build::build_string(eng, &cmd.text1)?
    };
    if cmd.colon {
        eng.qregs.append_text(r, &bytes);
    } else {
        eng.qregs.store_text(r, bytes);
    }
    Ok(())
}

pub(super) fn exec_push(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    eng.qregs.push(r)
}

pub(super) fn exec_pop(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let popped = eng.qregs.pop(r);
    if cmd.colon {
        eng.estack.push_val(if popped { SUCCESS } else { FAILURE })
    } else if popped {
        Ok(())
    } else {
        Err(Error::CannotPop)
    }
}

/// Mq: run the register text as a macro. Unless colon-modified, the macro
/// gets a fresh local Q-register frame. A value the macro leaves on the
/// (shared) expression stack is visible to the caller.
pub(super) fn exec_m(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let body = eng.qregs.text(r).to_vec();
    if body.is_empty() {
        return Ok(());
    }
    eng.push_macro_frame(body, !cmd.colon)?;
    if let Some(n) = cmd.n {
        eng.estack.push_val(n)?;
    }
    let result = eng.run();
    if result.is_ok() {
        eng.pop_macro_frame();
    }
    // On error the frame stays for the main loop to unwind, preserving the
    // context the error report describes.
    result
}

#[cfg(test)]
mod tests {
    use crate::term::{CaptureTerminal, SharedCapture};
    use crate::{CommandBuf, Engine};
    use core_model::Error;
    use core_qreg::QregRef;

    fn engine() -> Engine {
        Engine::new(Box::new(CaptureTerminal::new()))
    }

    fn run(eng: &mut Engine, cmds: &[u8]) -> core_model::Result<()> {
        eng.cbuf = CommandBuf::from_bytes(cmds.to_vec());
        eng.run_command()
    }

    fn qa() -> QregRef {
        QregRef::resolve(b'A', false).unwrap()
    }

    #[test]
    fn store_add_and_read_numbers() {
        let (term, out) = SharedCapture::new();
        let mut eng = Engine::new(Box::new(term));
        run(&mut eng, b"42UA 5%A\x1b QA=").unwrap();
        assert_eq!(&*out.borrow(), b"47\n");
        assert_eq!(eng.qregs.num(qa()), 47);
        assert!(eng.qregs.text(qa()).is_empty());
    }

    #[test]
    fn copy_lines_into_register() {
        let mut eng = engine();
        run(&mut eng, b"Ione\ntwo\n\x1b0J XA").unwrap();
        assert_eq!(eng.qregs.text(qa()), b"one\n");
        run(&mut eng, b"L:XA").unwrap();
        assert_eq!(eng.qregs.text(qa()), b"one\ntwo\n");
        run(&mut eng, b"0,0XA").unwrap();
        assert!(eng.qregs.text(qa()).is_empty());
    }

    #[test]
    fn get_and_insert_text() {
        let mut eng = engine();
        run(&mut eng, b"\x15Ahello\x1b GA").unwrap();
        assert_eq!(eng.buffer.copy_range(0, 5), b"hello");
        assert_eq!(eng.last_len, 5);
        // nQ reads a character, :Q the size.
        run(&mut eng, b"1QA UB :QA UC").unwrap();
        assert_eq!(eng.qregs.num(QregRef::resolve(b'B', false).unwrap()), b'e' as i64);
        assert_eq!(eng.qregs.num(QregRef::resolve(b'C', false).unwrap()), 5);
    }

    #[test]
    fn push_pop_round_trip() {
        let mut eng = engine();
        run(&mut eng, b"7UA \x15Atext\x1b [A 0UA \x15A\x1b ]A").unwrap();
        assert_eq!(eng.qregs.num(qa()), 7);
        assert_eq!(eng.qregs.text(qa()), b"text");
        assert_eq!(run(&mut eng, b"]A"), Err(Error::CannotPop));
    }

    #[test]
    fn macro_runs_register_text() {
        let mut eng = engine();
        // The escape inside the macro body is spelled ^[ so it survives the
        // text scan; the builder folds it to a real escape.
        run(&mut eng, b"\x15AIfrom macro^[\x1b MA").unwrap();
        assert_eq!(eng.buffer.copy_range(0, 10), b"from macro");
    }

    #[test]
    fn macro_leaves_value_for_caller() {
        let mut eng = engine();
        run(&mut eng, b"\x15A40+2\x1b MA UB").unwrap();
        assert_eq!(eng.qregs.num(QregRef::resolve(b'B', false).unwrap()), 42);
    }

    #[test]
    fn macro_locals_are_framed() {
        let mut eng = engine();
        // The macro writes .A; the outer .A must be untouched.
        run(&mut eng, b"1U.A \x15B5U.A\x1b MB").unwrap();
        assert_eq!(
            eng.qregs.num(QregRef::resolve(b'A', true).unwrap()),
            1
        );
        // A colon-modified call shares the caller's locals.
        run(&mut eng, b"\x15B9U.A\x1b :MB").unwrap();
        assert_eq!(
            eng.qregs.num(QregRef::resolve(b'A', true).unwrap()),
            9
        );
    }

    #[test]
    fn macro_recursion_is_bounded() {
        let mut eng = engine();
        // A macro that calls itself forever.
        run(&mut eng, b"\x15AMA\x1b").unwrap();
        assert_eq!(run(&mut eng, b"MA"), Err(Error::LimitReached));
    }
}
