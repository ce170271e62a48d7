//! Flag-register commands. Each one pushes its register's value when used
//! bare, and stores when given n (with the m,n bit-mask convention).

use crate::command::Command;
use crate::Engine;
use core_model::flags::update_flag;
use core_model::{E1Flags, E2Flags, E3Flags, EdFlags, Error, EtFlags, Int, Radix, Result};

const VERSION: (Int, Int, Int) = (200, 0, 0);

/// Shared get/set shape for every flag register.
fn flag(eng: &mut Engine, cmd: &Command, get: Int, set: impl FnOnce(&mut Engine, Int)) -> Result<()> {
    match cmd.n {
        None => eng.estack.push_val(get),
        Some(n) => {
            set(eng, update_flag(get, cmd.m, n));
            Ok(())
        }
    }
}

pub(super) fn exec_ed(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.ed.bits() as Int;
    flag(eng, cmd, get, |e, v| {
        e.flags.ed = EdFlags::from_bits_retain(v as u32)
    })
}

pub(super) fn exec_ee(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.ee;
    flag(eng, cmd, get, |e, v| e.flags.ee = v)
}

pub(super) fn exec_eh(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.eh;
    flag(eng, cmd, get, |e, v| e.flags.eh = v & 3)
}

pub(super) fn exec_es(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.es;
    flag(eng, cmd, get, |e, v| e.flags.es = v)
}

pub(super) fn exec_et(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.et.bits() as Int;
    flag(eng, cmd, get, |e, v| {
        e.flags.et = EtFlags::from_bits_retain(v as u32)
    })
}

pub(super) fn exec_eu(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.eu;
    flag(eng, cmd, get, |e, v| e.flags.eu = v)
}

pub(super) fn exec_ev(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.ev;
    flag(eng, cmd, get, |e, v| e.flags.ev = v)
}

pub(super) fn exec_e1(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.e1.bits() as Int;
    flag(eng, cmd, get, |e, v| {
        e.flags.e1 = E1Flags::from_bits_retain(v as u32)
    })
}

pub(super) fn exec_e2(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.e2.bits() as Int;
    flag(eng, cmd, get, |e, v| {
        e.flags.e2 = E2Flags::from_bits_retain(v as u32)
    })
}

pub(super) fn exec_e3(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.e3.bits() as Int;
    flag(eng, cmd, get, |e, v| {
        e.flags.e3 = E3Flags::from_bits_retain(v as u32)
    })
}

pub(super) fn exec_e4(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = eng.flags.e4;
    flag(eng, cmd, get, |e, v| e.flags.e4 = v)
}

/// `^E`: the form-feed flag from the last append (-1 when set).
pub(super) fn exec_ctrl_e(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let get = if eng.flags.ctrl_e { -1 } else { 0 };
    flag(eng, cmd, get, |e, v| e.flags.ctrl_e = v != 0)
}

/// `^N`: end-of-file flag for the current input stream (read-only).
pub(super) fn exec_ctrl_n(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if cmd.n.is_some() {
        return Err(Error::InvalidN);
    }
    let eof = eng.files.input().map(|f| f.eof).unwrap_or(true);
    eng.estack.push_val(if eof { -1 } else { 0 })
}

/// `^X`: search case mode, restricted to -1, 0, +1.
pub(super) fn exec_ctrl_x(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    match cmd.n {
        None => eng.estack.push_val(eng.flags.ctrl_x),
        Some(n @ -1..=1) => {
            eng.flags.ctrl_x = n;
            Ok(())
        }
        Some(_) => Err(Error::InvalidN),
    }
}

/// `^R`: the radix, restricted to 8, 10, 16.
pub(super) fn exec_ctrl_r(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    match cmd.n {
        None => eng.estack.push_val(eng.flags.radix.base() as Int),
        Some(n) => {
            eng.flags.radix = Radix::from_int(n).ok_or(Error::InvalidRadix)?;
            Ok(())
        }
    }
}

pub(super) fn exec_ctrl_d(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    eng.flags.radix = Radix::Decimal;
    Ok(())
}

pub(super) fn exec_ctrl_o(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    eng.flags.radix = Radix::Octal;
    Ok(())
}

/// `?` toggles command tracing.
pub(super) fn exec_trace(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    eng.flags.trace = !eng.flags.trace;
    Ok(())
}

/// EO: version word. Bare or 0 is the major version, -1 the minor, -2 the
/// patch level.
pub(super) fn exec_eo(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let value = match cmd.n.unwrap_or(0) {
        0 => VERSION.0,
        -1 => VERSION.1,
        -2 => VERSION.2,
        _ => return Err(Error::InvalidN),
    };
    eng.estack.push_val(value)
}

#[cfg(test)]
mod tests {
    use crate::term::CaptureTerminal;
    use crate::{CommandBuf, Engine};
    use core_model::{Error, Radix};

    fn engine() -> Engine {
        Engine::new(Box::new(CaptureTerminal::new()))
    }

    fn run(eng: &mut Engine, cmds: &[u8]) -> core_model::Result<()> {
        eng.cbuf = CommandBuf::from_bytes(cmds.to_vec());
        eng.run_command()
    }

    #[test]
    fn flag_set_and_get() {
        let mut eng = engine();
        run(&mut eng, b"3EH").unwrap();
        assert_eq!(eng.flags.eh, 3);
        run(&mut eng, b"EHUA").unwrap();
        assert_eq!(
            eng.qregs
                .num(core_qreg::QregRef::resolve(b'A', false).unwrap()),
            3
        );
    }

    #[test]
    fn flag_bit_masking() {
        let mut eng = engine();
        run(&mut eng, b"15ET").unwrap();
        // 5,2ET clears bits 101 and sets bit 010.
        run(&mut eng, b"5,2ET").unwrap();
        assert_eq!(eng.flags.et.bits(), 0b1010);
    }

    #[test]
    fn radix_commands() {
        let mut eng = engine();
        run(&mut eng, b"8\x12").unwrap();
        assert_eq!(eng.flags.radix, Radix::Octal);
        // In octal radix the digits 8 and 9 are invalid.
        assert_eq!(run(&mut eng, b"19UA"), Err(Error::InvalidNumber));
        run(&mut eng, b"\x04").unwrap();
        assert_eq!(eng.flags.radix, Radix::Decimal);
        assert_eq!(run(&mut eng, b"7\x12"), Err(Error::InvalidRadix));
    }

    #[test]
    fn ctrl_x_modes() {
        let mut eng = engine();
        run(&mut eng, b"-1\x18").unwrap();
        assert_eq!(eng.flags.ctrl_x, -1);
        assert_eq!(run(&mut eng, b"9\x18"), Err(Error::InvalidN));
    }

    #[test]
    fn version_words() {
        let mut eng = engine();
        run(&mut eng, b"EOUA -1EOUB").unwrap();
        let qa = core_qreg::QregRef::resolve(b'A', false).unwrap();
        let qb = core_qreg::QregRef::resolve(b'B', false).unwrap();
        assert_eq!(eng.qregs.num(qa), 200);
        assert_eq!(eng.qregs.num(qb), 0);
    }
}
