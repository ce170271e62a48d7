//! The file facade the engine edits through.
//!
//! Two input streams and four output streams are tracked: primary and
//! secondary for each, plus a Q-register stream and a log stream on the
//! output side. Output files open for write or backup go through a
//! temporary file in the target directory; the close finalises it by
//! renaming the old file to `name~` (backup) or removing it, then renaming
//! the temporary into place. Killing an output simply drops the temporary.
//!
//! Also here: wildcard iteration for EN, the one-line "memory" file that
//! remembers the last edited filename between sessions, and the external
//! command plumbing for EG/EZ.

use core_model::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

pub const ISTREAM_PRIMARY: usize = 0;
pub const ISTREAM_SECONDARY: usize = 1;
pub const NISTREAMS: usize = 2;

pub const OSTREAM_PRIMARY: usize = 0;
pub const OSTREAM_SECONDARY: usize = 1;
pub const OSTREAM_QREGISTER: usize = 2;
pub const OSTREAM_LOG: usize = 3;
pub const NOSTREAMS: usize = 4;

/// How an output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// EW: fresh write, superseding any old file via a temporary.
    Write,
    /// EB: like Write, but the old file is kept as `name~` on close.
    Backup,
    /// EL: append, written directly (log files must survive crashes).
    Log,
    /// E%: Q-register dump, fresh write.
    Qregister,
}

pub struct InputFile {
    pub reader: BufReader<File>,
    pub name: String,
    pub size: u64,
    /// A line terminator has been seen (smart CR/LF detection latch).
    pub seen_terminator: bool,
    /// End of file reached (read back as `^N`).
    pub eof: bool,
}

enum OutputSink {
    Temp(BufWriter<NamedTempFile>),
    Direct(BufWriter<File>),
}

pub struct OutputFile {
    sink: OutputSink,
    pub name: String,
    backup: bool,
}

impl OutputFile {
    pub fn writer(&mut self) -> &mut dyn Write {
        match &mut self.sink {
            OutputSink::Temp(w) => w,
            OutputSink::Direct(w) => w,
        }
    }
}

#[derive(Default)]
pub struct Files {
    inputs: [Option<InputFile>; NISTREAMS],
    outputs: [Option<OutputFile>; NOSTREAMS],
    pub istream: usize,
    pub ostream: usize,
    /// Most recent filename any command touched (`^EQ*` and the memory file).
    pub last_file: String,
    wild: Option<glob::Paths>,
}

impl Files {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- input streams -----------------------------------------------------

    /// Open a file for input on the current stream. Missing files are the
    /// FNF error; the caller maps that to a failure value under a colon.
    pub fn open_input(&mut self, name: &str) -> Result<()> {
        validate_filename(name)?;
        let file = match File::open(name) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(name.to_string()))
            }
            Err(e) => return Err(Error::SystemCall(e.to_string())),
        };
        let size = file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| Error::SystemCall(e.to_string()))?;
        debug!(name, size, stream = self.istream, "open input");
        self.inputs[self.istream] = Some(InputFile {
            reader: BufReader::new(file),
            name: name.to_string(),
            size,
            seen_terminator: false,
            eof: false,
        });
        self.last_file = name.to_string();
        Ok(())
    }

    pub fn input(&mut self) -> Option<&mut InputFile> {
        self.inputs[self.istream].as_mut()
    }

    pub fn input_open(&self) -> bool {
        self.inputs[self.istream].is_some()
    }

    pub fn close_input(&mut self) {
        self.inputs[self.istream] = None;
    }

    // ----- output streams ----------------------------------------------------

    /// Open an output file on a stream. A second open on the same stream is
    /// the OFO error (the Q-register stream excepted: it is open-write-close).
    pub fn open_output(&mut self, name: &str, stream: usize, mode: OutputMode) -> Result<()> {
        validate_filename(name)?;
        if self.outputs[stream].is_some() && stream != OSTREAM_QREGISTER {
            return Err(Error::OutputAlreadyOpen);
        }
        let sink = match mode {
            OutputMode::Log => {
                let file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(name)
                    .map_err(|e| Error::SystemCall(e.to_string()))?;
                OutputSink::Direct(BufWriter::new(file))
            }
            OutputMode::Write | OutputMode::Backup | OutputMode::Qregister => {
                let dir = Path::new(name).parent().filter(|p| !p.as_os_str().is_empty());
                let temp = match dir {
                    Some(dir) => NamedTempFile::new_in(dir),
                    None => NamedTempFile::new_in("."),
                }
                .map_err(|e| Error::SystemCall(e.to_string()))?;
                OutputSink::Temp(BufWriter::new(temp))
            }
        };
        debug!(name, stream, ?mode, "open output");
        self.outputs[stream] = Some(OutputFile {
            sink,
            name: name.to_string(),
            backup: mode == OutputMode::Backup,
        });
        if stream != OSTREAM_LOG && stream != OSTREAM_QREGISTER {
            self.last_file = name.to_string();
        }
        Ok(())
    }

    pub fn output(&mut self) -> Option<&mut OutputFile> {
        self.outputs[self.ostream].as_mut()
    }

    pub fn output_open(&self) -> bool {
        self.outputs[self.ostream].is_some()
    }

    pub fn output_on(&mut self, stream: usize) -> Option<&mut OutputFile> {
        self.outputs[stream].as_mut()
    }

    /// Finalise and close the output on a stream: flush, then swap the
    /// temporary into place (renaming the old file to `name~` first when
    /// the file was opened for backup).
    pub fn close_output(&mut self, stream: usize) -> Result<()> {
        let Some(mut out) = self.outputs[stream].take() else {
            return Ok(());
        };
        match out.sink {
            OutputSink::Direct(ref mut w) => {
                w.flush().map_err(|e| Error::SystemCall(e.to_string()))?;
            }
            OutputSink::Temp(w) => {
                let temp = w
                    .into_inner()
                    .map_err(|e| Error::SystemCall(e.to_string()))?;
                let target = Path::new(&out.name);
                if target.exists() {
                    if out.backup {
                        let mut backup_name = out.name.clone();
                        backup_name.push('~');
                        fs::rename(target, &backup_name)
                            .map_err(|e| Error::SystemCall(e.to_string()))?;
                    } else {
                        fs::remove_file(target).map_err(|e| Error::SystemCall(e.to_string()))?;
                    }
                }
                temp.persist(target)
                    .map_err(|e| Error::SystemCall(e.to_string()))?;
            }
        }
        debug!(name = out.name, stream, "close output");
        Ok(())
    }

    /// Discard the output on the current stream without finalising (EK).
    /// The temporary file is removed; the original is untouched.
    pub fn kill_output(&mut self) {
        self.outputs[self.ostream] = None;
    }

    // ----- wildcard iteration (EN) -------------------------------------------

    pub fn set_wild(&mut self, pattern: &str) -> bool {
        match glob::glob(pattern) {
            Ok(paths) => {
                self.wild = Some(paths);
                true
            }
            Err(_) => {
                self.wild = None;
                false
            }
        }
    }

    pub fn next_wild(&mut self) -> Option<PathBuf> {
        let paths = self.wild.as_mut()?;
        for entry in paths {
            if let Ok(path) = entry {
                return Some(path);
            }
        }
        None
    }

    // ----- memory file -------------------------------------------------------

    /// Read the remembered filename: one line of text.
    pub fn read_memory(path: &Path) -> Option<String> {
        let mut text = String::new();
        File::open(path).ok()?.read_to_string(&mut text).ok()?;
        let line = text.lines().next()?.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }

    pub fn write_memory(path: &Path, name: &str) -> Result<()> {
        let mut file = File::create(path).map_err(|e| Error::SystemCall(e.to_string()))?;
        writeln!(file, "{name}").map_err(|e| Error::SystemCall(e.to_string()))
    }
}

/// Run a shell command, capturing status and stdout (EG/EZ).
pub fn run_command(command: &str) -> Result<(i32, Vec<u8>)> {
    if command.len() > 4096 {
        return Err(Error::CommandTooLong);
    }
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| Error::SystemCall(e.to_string()))?;
    Ok((output.status.code().unwrap_or(-1), output.stdout))
}

fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidFile(String::new()));
    }
    if let Some(bad) = name.bytes().find(|b| b.is_ascii_control()) {
        return Err(Error::InvalidFilenameChar(bad));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let name = path.to_str().unwrap().to_string();

        let mut files = Files::new();
        files
            .open_output(&name, OSTREAM_PRIMARY, OutputMode::Write)
            .unwrap();
        files.output().unwrap().writer().write_all(b"hello\n").unwrap();
        // Nothing lands at the target until close finalises the temp.
        assert!(!path.exists());
        files.close_output(OSTREAM_PRIMARY).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello\n");

        files.open_input(&name).unwrap();
        let mut line = String::new();
        files.input().unwrap().reader.read_line(&mut line).unwrap();
        assert_eq!(line, "hello\n");
        assert_eq!(files.last_file, name);
    }

    #[test]
    fn backup_keeps_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let name = path.to_str().unwrap().to_string();
        fs::write(&path, b"old contents").unwrap();

        let mut files = Files::new();
        files
            .open_output(&name, OSTREAM_PRIMARY, OutputMode::Backup)
            .unwrap();
        files.output().unwrap().writer().write_all(b"new contents").unwrap();
        files.close_output(OSTREAM_PRIMARY).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new contents");
        assert_eq!(
            fs::read(dir.path().join("data.txt~")).unwrap(),
            b"old contents"
        );
    }

    #[test]
    fn kill_discards_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.txt");
        let name = path.to_str().unwrap().to_string();
        fs::write(&path, b"original").unwrap();

        let mut files = Files::new();
        files
            .open_output(&name, OSTREAM_PRIMARY, OutputMode::Write)
            .unwrap();
        files.output().unwrap().writer().write_all(b"doomed").unwrap();
        files.kill_output();
        assert_eq!(fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn double_open_is_ofo() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("x").to_str().unwrap().to_string();
        let mut files = Files::new();
        files
            .open_output(&name, OSTREAM_PRIMARY, OutputMode::Write)
            .unwrap();
        assert_eq!(
            files.open_output(&name, OSTREAM_PRIMARY, OutputMode::Write),
            Err(Error::OutputAlreadyOpen)
        );
    }

    #[test]
    fn missing_input_is_fnf() {
        let mut files = Files::new();
        assert_eq!(
            files.open_input("no-such-file-anywhere"),
            Err(Error::FileNotFound("no-such-file-anywhere".into()))
        );
    }

    #[test]
    fn wildcard_iteration() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"").unwrap();
        fs::write(dir.path().join("b.txt"), b"").unwrap();
        fs::write(dir.path().join("c.dat"), b"").unwrap();

        let mut files = Files::new();
        let pattern = dir.path().join("*.txt");
        assert!(files.set_wild(pattern.to_str().unwrap()));
        let mut found = Vec::new();
        while let Some(p) = files.next_wild() {
            found.push(p.file_name().unwrap().to_str().unwrap().to_string());
        }
        found.sort();
        assert_eq!(found, ["a.txt", "b.txt"]);
    }

    #[test]
    fn memory_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mem = dir.path().join("memory");
        Files::write_memory(&mem, "edited.txt").unwrap();
        assert_eq!(Files::read_memory(&mem), Some("edited.txt".to_string()));
        assert_eq!(Files::read_memory(&dir.path().join("absent")), None);
    }

    #[test]
    fn filename_validation() {
        let mut files = Files::new();
        assert_eq!(
            files.open_input("bad\x01name"),
            Err(Error::InvalidFilenameChar(0x01))
        );
        assert_eq!(files.open_input(""), Err(Error::InvalidFile(String::new())));
    }

    #[test]
    fn external_command_capture() {
        let (status, out) = run_command("printf hello").unwrap();
        assert_eq!(status, 0);
        assert_eq!(out, b"hello");
    }
}
