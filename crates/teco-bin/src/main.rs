//! TECO entrypoint: command line, logging, the prompt loop, and error
//! reporting. The language engine lives in `core-exec`; this binary owns
//! the real terminal and the session lifecycle.

use anyhow::{Context, Result};
use clap::Parser;
use core_exec::{CommandBuf, Engine, Terminal};
use core_file::Files;
use core_model::{E1Flags, E2Flags, E3Flags, EdFlags, EtFlags, Error, ESC};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "teco", version, about = "TECO text editor")]
struct Args {
    /// File to edit (EB). When omitted, the memory file supplies the last
    /// edited name.
    pub path: Option<PathBuf>,

    /// Execute a command file and exit (batch mode).
    #[arg(long = "mung", value_name = "FILE")]
    pub mung: Option<PathBuf>,

    /// Configuration file path (overrides discovery of `teco.toml`).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a trace log to this file (also honours TECO_LOG env filter).
    #[arg(long = "log", value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Do not read or write the memory file.
    #[arg(long = "no-memory")]
    pub no_memory: bool,
}

fn init_logging(path: Option<&PathBuf>) -> Option<WorkerGuard> {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_env("TECO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    match path {
        Some(path) => {
            let dir = path.parent().map(PathBuf::from).unwrap_or_else(|| ".".into());
            let file = path.file_name().map(PathBuf::from).unwrap_or_else(|| "teco.log".into());
            let appender = tracing_appender::rolling::never(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            // Logs must not pollute the terminal: stderr only, and quiet by
            // default.
            fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
            None
        }
    }
}

fn memory_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TECO_MEMORY") {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".teco_memory"))
}

/// The real terminal. Typed bytes go straight to stdout; raw keys come from
/// crossterm events when interactive, and from stdin otherwise.
struct StdTerminal {
    interactive: bool,
}

impl Terminal for StdTerminal {
    fn write(&mut self, bytes: &[u8]) {
        let mut out = std::io::stdout();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    fn read_key(&mut self) -> Option<u8> {
        if !self.interactive {
            let mut byte = [0u8; 1];
            return match std::io::stdin().read(&mut byte) {
                Ok(1) => Some(byte[0]),
                _ => None,
            };
        }
        loop {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(byte) = key_to_byte(&key) {
                        return Some(byte);
                    }
                }
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    fn flush(&mut self) {
        let _ = std::io::stdout().flush();
    }
}

fn key_to_byte(key: &KeyEvent) -> Option<u8> {
    match key.code {
        KeyCode::Char(c) => {
            if !c.is_ascii() {
                return None;
            }
            let mut byte = c as u8;
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                byte = byte.to_ascii_uppercase() & 0x1f;
            }
            Some(byte)
        }
        KeyCode::Enter => Some(b'\n'),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Esc => Some(ESC),
        KeyCode::Backspace => Some(0x7f),
        _ => None,
    }
}

fn apply_config(eng: &mut Engine, config: &core_config::Config) {
    let f = &config.flags;
    if let Some(ed) = f.ed {
        eng.flags.ed = EdFlags::from_bits_retain(ed as u32);
    }
    if let Some(et) = f.et {
        eng.flags.et = EtFlags::from_bits_retain(et as u32);
    }
    if let Some(eh) = f.eh {
        eng.flags.eh = eh & 3;
    }
    if let Some(e1) = f.e1 {
        eng.flags.e1 = E1Flags::from_bits_retain(e1 as u32);
    }
    if let Some(e2) = f.e2 {
        eng.flags.e2 = E2Flags::from_bits_retain(e2 as u32);
    }
    if let Some(e3) = f.e3 {
        eng.flags.e3 = E3Flags::from_bits_retain(e3 as u32);
    }
    if let Some(ctrl_x) = f.ctrl_x {
        eng.flags.ctrl_x = ctrl_x.clamp(-1, 1);
    }
}

/// Print an error the classic way: `?XXX  Text`, with detail per the EH
/// verbosity.
fn report_error(eng: &mut Engine, err: &Error) {
    let line = match eng.flags.eh {
        1 => format!("?{}", err.code()),
        _ => format!("?{}  {}", err.code(), err),
    };
    eng.type_str(&line);
    eng.type_str("\r\n");
    if eng.flags.eh >= 3 {
        if let Some(details) = err.details() {
            eng.type_str(details);
            eng.type_str("\r\n");
        }
    }
}

/// Execute one command string, reporting any error and recovering.
/// Returns false when the error should end a batch run.
fn execute(eng: &mut Engine, commands: Vec<u8>) -> bool {
    eng.cbuf = CommandBuf::from_bytes(commands);
    match eng.run_command() {
        Ok(()) => true,
        Err(err) => {
            info!(code = err.code(), "command error");
            report_error(eng, &err);
            eng.recover();
            false
        }
    }
}

fn echo(byte: u8) {
    let mut out = std::io::stdout();
    let _ = match byte {
        ESC => out.write_all(b"$"),
        b'\n' => out.write_all(b"\r\n"),
        0x00..=0x1f => out.write_all(&[b'^', byte + b'@']),
        _ => out.write_all(&[byte]),
    };
    let _ = out.flush();
}

/// The interactive prompt: raw-mode keys accumulate into the command
/// buffer until two consecutive escapes, then the string executes.
fn interactive_loop(eng: &mut Engine, prompt: &str) -> Result<i32> {
    terminal::enable_raw_mode().context("entering raw mode")?;
    let result = prompt_loop(eng, prompt);
    let _ = terminal::disable_raw_mode();
    result
}

fn prompt_loop(eng: &mut Engine, prompt: &str) -> Result<i32> {
    let mut pending: Vec<u8> = Vec::new();
    let mut last_esc = false;
    print!("{prompt}");
    std::io::stdout().flush().ok();
    loop {
        let key = match event::read().context("reading terminal")? {
            Event::Key(key) => key,
            _ => continue,
        };
        // CTRL/C interrupts: once to abandon input, at the prompt it is
        // still just a fresh prompt.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            eng.interrupt.store(true, Ordering::Relaxed);
            pending.clear();
            last_esc = false;
            print!("^C\r\n{prompt}");
            std::io::stdout().flush().ok();
            eng.interrupt.store(false, Ordering::Relaxed);
            continue;
        }
        let Some(byte) = key_to_byte(&key) else {
            continue;
        };
        match byte {
            // Rubout deletes the last typed byte.
            0x7f | 0x08 => {
                if let Some(b) = pending.pop() {
                    last_esc = pending.last() == Some(&ESC);
                    let width = match b {
                        ESC | b'\n' => 1,
                        0x00..=0x1f => 2,
                        _ => 1,
                    };
                    for _ in 0..width {
                        print!("\x08 \x08");
                    }
                    std::io::stdout().flush().ok();
                }
            }
            // ^U kills the input line.
            0x15 => {
                pending.clear();
                last_esc = false;
                print!("\r\n{prompt}");
                std::io::stdout().flush().ok();
            }
            ESC if last_esc => {
                echo(ESC);
                print!("\r\n");
                std::io::stdout().flush().ok();
                pending.pop(); // drop the first escape; both were terminators
                let commands = std::mem::take(&mut pending);
                last_esc = false;
                execute(eng, commands);
                if let Some(code) = eng.exit_requested {
                    return Ok(code);
                }
                print!("\r\n{prompt}");
                std::io::stdout().flush().ok();
            }
            byte => {
                echo(byte);
                last_esc = byte == ESC;
                pending.push(byte);
            }
        }
    }
}

fn run() -> Result<i32> {
    let args = Args::parse();
    let _guard = init_logging(args.log.as_ref());
    let config = core_config::load_from(args.config.clone())?;

    let interactive = args.mung.is_none() && std::io::stdin().is_terminal();
    let term = StdTerminal { interactive };
    let mut eng = Engine::with_buffer_config(
        Box::new(term),
        config.buffer.init,
        config.buffer.max,
        config.buffer.paging,
    );
    apply_config(&mut eng, &config);

    // Pick up the file to edit: the argument, or the remembered name.
    let memory = if args.no_memory { None } else { memory_path() };
    let initial = args.path.clone().or_else(|| {
        memory
            .as_deref()
            .and_then(Files::read_memory)
            .map(PathBuf::from)
    });
    if let Some(path) = initial {
        let open = format!("EB{}\x1bY\x1b\x1b", path.display());
        if !execute(&mut eng, open.into_bytes()) {
            warn!(path = %path.display(), "could not open initial file");
        }
    }

    let code = if let Some(script) = &args.mung {
        let commands = std::fs::read(script)
            .with_context(|| format!("reading {}", script.display()))?;
        if execute(&mut eng, commands) {
            eng.exit_requested.unwrap_or(0)
        } else {
            1
        }
    } else if interactive {
        interactive_loop(&mut eng, &config.prompt)?
    } else {
        // Piped input: the whole of stdin is one command string.
        let mut commands = Vec::new();
        std::io::stdin().read_to_end(&mut commands)?;
        if execute(&mut eng, commands) {
            eng.exit_requested.unwrap_or(0)
        } else {
            1
        }
    };

    if let Some(path) = memory {
        if !eng.files.last_file.is_empty() {
            if let Err(e) = Files::write_memory(&path, &eng.files.last_file) {
                warn!(error = %e, "could not update memory file");
            }
        }
    }
    if let Some(command) = eng.eg_at_exit.take() {
        info!(command, "running EG command");
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .status()
            .with_context(|| format!("running '{command}'"))?;
        if !status.success() {
            return Ok(status.code().unwrap_or(1));
        }
    }
    Ok(code)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(err) => {
            eprintln!("teco: {err:#}");
            ExitCode::FAILURE
        }
    }
}
