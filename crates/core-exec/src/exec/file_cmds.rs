//! File commands: stream opens and closes, indirect command files,
//! wildcards, Q-register file transfer, and external commands.

use crate::build;
use crate::command::Command;
use crate::exec::page_cmds;
use crate::Engine;
use core_file::{OutputMode, OSTREAM_LOG, OSTREAM_PRIMARY, OSTREAM_QREGISTER};
use core_model::{Error, Result, FAILURE, SUCCESS};
use std::io::Write;

/// Run a fallible open; under a colon the outcome becomes a -1/0 value.
fn with_colon_status(
    eng: &mut Engine,
    colon: bool,
    op: impl FnOnce(&mut Engine) -> Result<()>,
) -> Result<()> {
    match op(eng) {
        Ok(()) => {
            if colon {
                eng.estack.push_val(SUCCESS)?;
            }
            Ok(())
        }
        Err(Error::FileNotFound(_) | Error::SystemCall(_) | Error::OutputAlreadyOpen)
            if colon =>
        {
            eng.estack.push_val(FAILURE)
        }
        Err(e) => Err(e),
    }
}

fn filename(eng: &Engine, text: &[u8]) -> Result<String> {
    let built = build::build_string(eng, text)?;
    let name = String::from_utf8(built).map_err(|_| Error::InvalidFile(String::new()))?;
    Ok(name.trim().to_string())
}

/// ER: open an input file; bare ER reselects the primary input stream.
pub(super) fn exec_er(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if cmd.text1.is_empty() {
        eng.files.istream = core_file::ISTREAM_PRIMARY;
        return Ok(());
    }
    let name = filename(eng, &cmd.text1)?;
    with_colon_status(eng, cmd.colon, |e| e.files.open_input(&name))
}

/// EW: open an output file for write; bare EW reselects the primary output
/// stream.
pub(super) fn exec_ew(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if cmd.text1.is_empty() {
        eng.files.ostream = OSTREAM_PRIMARY;
        return Ok(());
    }
    let name = filename(eng, &cmd.text1)?;
    with_colon_status(eng, cmd.colon, |e| {
        let stream = e.files.ostream;
        e.files.open_output(&name, stream, OutputMode::Write)
    })
}

/// EB: open the same file for input and backup output.
pub(super) fn exec_eb(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let name = filename(eng, &cmd.text1)?;
    with_colon_status(eng, cmd.colon, |e| {
        e.files.open_input(&name)?;
        let stream = e.files.ostream;
        e.files.open_output(&name, stream, OutputMode::Backup)
    })
}

/// EA / EP: select the secondary output / input streams.
pub(super) fn exec_ea(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    eng.files.ostream = core_file::OSTREAM_SECONDARY;
    Ok(())
}

pub(super) fn exec_ep(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    eng.files.istream = core_file::ISTREAM_SECONDARY;
    Ok(())
}

/// EC: move the rest of the input through the buffer to the output, then
/// close both files.
pub(super) fn exec_ec(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    if eng.files.output_open() {
        loop {
            let ff = eng.flags.ctrl_e;
            if !page_cmds::page_forward_step(eng, ff)? {
                break;
            }
        }
        flush_and_close(eng)?;
    }
    eng.files.close_input();
    eng.buffer.kill();
    Ok(())
}

fn flush_and_close(eng: &mut Engine) -> Result<()> {
    let stream = eng.files.ostream;
    {
        let crate::Engine { files, pages, .. } = eng;
        if let Some(out) = files.output_on(stream) {
            pages.flush(out.writer())?;
        }
    }
    eng.files.close_output(stream)
}

/// EF: close the output without writing the edit buffer.
pub(super) fn exec_ef(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    if !eng.files.output_open() {
        return Err(Error::NoOutputFile);
    }
    flush_and_close(eng)
}

/// EK: kill the output file, discarding everything queued for it.
pub(super) fn exec_ek(eng: &mut Engine, _cmd: &mut Command) -> Result<()> {
    eng.pages.clear();
    eng.files.kill_output();
    Ok(())
}

/// EX: flush and close everything, then leave.
pub(super) fn exec_ex(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    exec_ec(eng, cmd)?;
    eng.exit_requested = Some(0);
    Ok(())
}

/// EI: run a command file as a macro.
pub(super) fn exec_ei(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if cmd.text1.is_empty() {
        return Ok(());
    }
    let name = filename(eng, &cmd.text1)?;
    let body = match std::fs::read(&name) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if cmd.colon {
                return eng.estack.push_val(FAILURE);
            }
            return Err(Error::FileNotFound(name));
        }
        Err(e) => return Err(Error::SystemCall(e.to_string())),
    };
    eng.push_macro_frame(body, false)?;
    let result = eng.run();
    if result.is_ok() {
        eng.pop_macro_frame();
        if cmd.colon {
            eng.estack.push_val(SUCCESS)?;
        }
    }
    result
}

/// EL: open a log file; bare EL closes it.
pub(super) fn exec_el(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if cmd.text1.is_empty() {
        return eng.files.close_output(OSTREAM_LOG);
    }
    let name = filename(eng, &cmd.text1)?;
    with_colon_status(eng, cmd.colon, |e| {
        e.files.open_output(&name, OSTREAM_LOG, OutputMode::Log)
    })
}

/// EN: wildcard iteration. With a pattern, prime the iterator; bare EN
/// steps it, leaving the match as the last filename.
pub(super) fn exec_en(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if !cmd.text1.is_empty() {
        let pattern = filename(eng, &cmd.text1)?;
        let ok = eng.files.set_wild(&pattern);
        if cmd.colon {
            return eng.estack.push_val(if ok { SUCCESS } else { FAILURE });
        }
        if !ok {
            return Err(Error::InvalidFile(pattern));
        }
        return Ok(());
    }
    match eng.files.next_wild() {
        Some(path) => {
            eng.files.last_file = path.to_string_lossy().into_owned();
            if cmd.colon {
                eng.estack.push_val(SUCCESS)?;
            }
            Ok(())
        }
        None => {
            if cmd.colon {
                eng.estack.push_val(FAILURE)
            } else {
                Err(Error::FileNotFound(String::new()))
            }
        }
    }
}

/// EQq: read a file into a Q-register.
pub(super) fn exec_eq(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let name = filename(eng, &cmd.text1)?;
    match std::fs::read(&name) {
        Ok(data) => {
            eng.qregs.store_text(r, data);
            if cmd.colon {
                eng.estack.push_val(SUCCESS)?;
            }
            Ok(())
        }
        Err(e) => {
            if cmd.colon {
                return eng.estack.push_val(FAILURE);
            }
            if e.kind() == std::io::ErrorKind::NotFound {
                Err(Error::FileNotFound(name))
            } else {
                Err(Error::SystemCall(e.to_string()))
            }
        }
    }
}

/// E%q: write a Q-register's text to a file.
pub(super) fn exec_e_pct(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let r = cmd.qreg()?;
    let name = filename(eng, &cmd.text1)?;
    let result = (|| -> Result<()> {
        eng.files
            .open_output(&name, OSTREAM_QREGISTER, OutputMode::Qregister)?;
        {
            let crate::Engine { files, qregs, .. } = eng;
            if let Some(out) = files.output_on(OSTREAM_QREGISTER) {
                out.writer()
                    .write_all(qregs.text(r))
                    .map_err(|e| Error::SystemCall(e.to_string()))?;
            }
        }
        eng.files.close_output(OSTREAM_QREGISTER)
    })();
    match result {
        Ok(()) => {
            if cmd.colon {
                eng.estack.push_val(SUCCESS)?;
            }
            Ok(())
        }
        Err(e) => {
            if cmd.colon {
                eng.estack.push_val(FAILURE)
            } else {
                Err(e)
            }
        }
    }
}

/// EG: hand a command to the shell at exit; :EG runs it now and returns
/// its status.
pub(super) fn exec_eg(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let command = String::from_utf8_lossy(&build::build_string(eng, &cmd.text1)?).into_owned();
    if cmd.colon || cmd.dcolon {
        let (status, _) = core_file::run_command(&command)?;
        return eng
            .estack
            .push_val(if status == 0 { SUCCESS } else { FAILURE });
    }
    eng.eg_at_exit = Some(command);
    exec_ex(eng, cmd)
}

/// EZ: run a command and insert its standard output at dot.
pub(super) fn exec_ez(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let command = String::from_utf8_lossy(&build::build_string(eng, &cmd.text1)?).into_owned();
    match core_file::run_command(&command) {
        Ok((status, stdout)) => {
            eng.buffer.insert(&stdout)?;
            eng.last_len = stdout.len();
            if cmd.colon {
                eng.estack
                    .push_val(if status == 0 { SUCCESS } else { FAILURE })?;
            }
            Ok(())
        }
        Err(e) => {
            if cmd.colon {
                eng.estack.push_val(FAILURE)
            } else {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::term::CaptureTerminal;
    use crate::{CommandBuf, Engine};
    use core_model::Error;
    use std::io::Write;

    fn engine() -> Engine {
        Engine::new(Box::new(CaptureTerminal::new()))
    }

    fn run(eng: &mut Engine, cmds: &[u8]) -> core_model::Result<()> {
        eng.cbuf = CommandBuf::from_bytes(cmds.to_vec());
        eng.run_command()
    }

    fn qa() -> core_qreg::QregRef {
        core_qreg::QregRef::resolve(b'A', false).unwrap()
    }

    #[test]
    fn er_missing_file_and_colon() {
        let mut eng = engine();
        assert!(matches!(
            run(&mut eng, b"ERno-such-file\x1b"),
            Err(Error::FileNotFound(_))
        ));
        run(&mut eng, b":ERno-such-file\x1bUA").unwrap();
        assert_eq!(eng.qregs.num(qa()), 0);
    }

    #[test]
    fn round_trip_edit_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"hello world\n").unwrap();
        drop(f);
        let name = path.to_str().unwrap();

        let mut eng = engine();
        run(&mut eng, format!("EB{name}\x1b Y").as_bytes()).unwrap();
        run(&mut eng, b"Sworld\x1b FRteco\x1b").unwrap();
        run(&mut eng, b"EX").unwrap();
        assert_eq!(eng.exit_requested, Some(0));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello teco\n");
        // Backup file keeps the original.
        assert_eq!(
            std::fs::read(dir.path().join("doc.txt~")).unwrap(),
            b"hello world\n"
        );
    }

    #[test]
    fn ei_runs_command_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.tec");
        std::fs::write(&path, b"Ifrom file\x1b").unwrap();
        let mut eng = engine();
        run(&mut eng, format!("EI{}\x1b", path.to_str().unwrap()).as_bytes()).unwrap();
        assert_eq!(eng.buffer.copy_range(0, 9), b"from file");
    }

    #[test]
    fn eq_and_e_pct_transfer_registers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reg.txt");
        std::fs::write(&path, b"register data").unwrap();
        let name = path.to_str().unwrap();
        let mut eng = engine();
        run(&mut eng, format!("EQA{name}\x1b").as_bytes()).unwrap();
        assert_eq!(eng.qregs.text(qa()), b"register data");

        let out = dir.path().join("reg-out.txt");
        run(
            &mut eng,
            format!("E%A{}\x1b", out.to_str().unwrap()).as_bytes(),
        )
        .unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"register data");
    }

    #[test]
    fn en_wildcards() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.txt"), b"").unwrap();
        std::fs::write(dir.path().join("two.txt"), b"").unwrap();
        let pattern = dir.path().join("*.txt");
        let mut eng = engine();
        run(
            &mut eng,
            format!("EN{}\x1b", pattern.to_str().unwrap()).as_bytes(),
        )
        .unwrap();
        run(&mut eng, b":EN\x1bUA").unwrap();
        assert_eq!(eng.qregs.num(qa()), -1);
        assert!(eng.files.last_file.ends_with(".txt"));
        run(&mut eng, b":EN\x1bUA :EN\x1bUB").unwrap();
        let qb = core_qreg::QregRef::resolve(b'B', false).unwrap();
        assert_eq!(eng.qregs.num(qb), 0);
    }

    #[test]
    fn ez_captures_stdout() {
        let mut eng = engine();
        run(&mut eng, b"EZprintf out\x1b").unwrap();
        assert_eq!(eng.buffer.copy_range(0, 3), b"out");
    }

    #[test]
    fn colon_eg_reports_status() {
        let mut eng = engine();
        run(&mut eng, b":EGtrue\x1bUA :EGfalse\x1bUB").unwrap();
        let qb = core_qreg::QregRef::resolve(b'B', false).unwrap();
        assert_eq!(eng.qregs.num(qa()), -1);
        assert_eq!(eng.qregs.num(qb), 0);
    }
}
