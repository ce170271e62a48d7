//! String building.
//!
//! Text arguments for inserts, filenames, and tags pass through the
//! build-string expansion before use:
//!
//! * `^x` typed as caret-plus-letter becomes the control character, unless
//!   the ED caret bit makes carets literal;
//! * `^Q`/`^R` take the next character literally;
//! * `^V c` / `^V^V` and `^W c` / `^W^W` convert case;
//! * `^EQq` inserts the text of Q-register q, `^EUq` the character whose
//!   code is q's number, and `^EQ*` the last filename.
//!
//! Search strings get only the caret conversion (via [`convert_carets`]):
//! their remaining constructs belong to the matcher, which re-reads them on
//! every attempt.

use crate::Engine;
use core_model::{EdFlags, Error, Result, CTRL_E, CTRL_Q, CTRL_R, CTRL_V, CTRL_W};
use core_qreg::QregRef;

const BUILD_MAX: usize = 4096;

/// Convert `^x` pairs to control characters, leaving everything else alone.
pub fn convert_carets(eng: &Engine, src: &[u8]) -> Result<Vec<u8>> {
    if eng.flags.ed.contains(EdFlags::CARET) {
        return Ok(src.to_vec());
    }
    let mut out = Vec::with_capacity(src.len());
    let mut it = src.iter().copied().peekable();
    while let Some(c) = it.next() {
        if c == b'^' {
            let c2 = it.next().ok_or(Error::InvalidSearchString)?;
            out.push(crate::scan::caret_control(c2)?);
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Full build-string expansion.
pub fn build_string(eng: &Engine, src: &[u8]) -> Result<Vec<u8>> {
    let src = convert_carets(eng, src)?;
    let mut out: Vec<u8> = Vec::with_capacity(src.len());
    let mut it = src.iter().copied().peekable();
    let mut lower_next = false;
    let mut upper_next = false;
    let mut lower_all = false;
    let mut upper_all = false;

    let mut push = |out: &mut Vec<u8>, c: u8| -> Result<()> {
        if out.len() >= BUILD_MAX {
            return Err(Error::LimitReached);
        }
        out.push(c);
        Ok(())
    };

    while let Some(c) = it.next() {
        if !c.is_ascii_control() {
            // One-shot conversions take precedence over the sticky modes so
            // that ^V can override a standing ^W^W and vice versa.
            let c = if lower_next {
                c.to_ascii_lowercase()
            } else if upper_next {
                c.to_ascii_uppercase()
            } else if lower_all {
                c.to_ascii_lowercase()
            } else if upper_all {
                c.to_ascii_uppercase()
            } else {
                c
            };
            lower_next = false;
            upper_next = false;
            push(&mut out, c)?;
            continue;
        }
        match c {
            CTRL_E => {
                let sel = it.next().ok_or(Error::InvalidSearchString)?;
                match sel.to_ascii_uppercase() {
                    b'Q' => {
                        let name = it.next().ok_or(Error::MissingQName)?;
                        if name == b'*' {
                            for b in eng.files.last_file.bytes() {
                                push(&mut out, b)?;
                            }
                        } else {
                            let r = resolve_name(name, &mut it)?;
                            for &b in eng.qregs.text(r) {
                                push(&mut out, b)?;
                            }
                        }
                    }
                    b'U' => {
                        let name = it.next().ok_or(Error::MissingQName)?;
                        let r = resolve_name(name, &mut it)?;
                        push(&mut out, (eng.qregs.num(r) & 0xff) as u8)?;
                    }
                    _ => {
                        // Not a build construct: keep ^E and re-examine the
                        // selector as an ordinary byte next time round.
                        push(&mut out, CTRL_E)?;
                        push(&mut out, sel)?;
                    }
                }
            }
            CTRL_Q | CTRL_R => {
                let lit = it.next().ok_or(Error::InvalidSearchString)?;
                push(&mut out, lit)?;
            }
            CTRL_V => {
                if lower_next {
                    lower_all = true;
                    upper_all = false;
                    lower_next = false;
                    upper_next = false;
                } else {
                    lower_next = true;
                }
            }
            CTRL_W => {
                if upper_next {
                    upper_all = true;
                    lower_all = false;
                    upper_next = false;
                    lower_next = false;
                } else {
                    upper_next = true;
                }
            }
            _ => {
                lower_next = false;
                upper_next = false;
                push(&mut out, c)?;
            }
        }
    }
    Ok(out)
}

fn resolve_name(
    mut name: u8,
    it: &mut std::iter::Peekable<impl Iterator<Item = u8>>,
) -> Result<QregRef> {
    let local = name == b'.';
    if local {
        name = it.next().ok_or(Error::MissingQName)?;
    }
    QregRef::resolve(name, local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::CaptureTerminal;

    fn engine() -> Engine {
        Engine::new(Box::new(CaptureTerminal::new()))
    }

    #[test]
    fn plain_text_passes_through() {
        let eng = engine();
        assert_eq!(build_string(&eng, b"hello.txt").unwrap(), b"hello.txt");
    }

    #[test]
    fn caret_conversion() {
        let eng = engine();
        assert_eq!(convert_carets(&eng, b"a^eb").unwrap(), b"a\x05b");
        assert_eq!(
            convert_carets(&eng, b"a^!b"),
            Err(Error::InvalidUparrow(b'!'))
        );
        // The ED caret bit makes carets literal.
        let mut eng = engine();
        eng.flags.ed |= EdFlags::CARET;
        assert_eq!(convert_carets(&eng, b"a^eb").unwrap(), b"a^eb");
    }

    #[test]
    fn case_conversions() {
        let eng = engine();
        assert_eq!(build_string(&eng, b"\x16ABC").unwrap(), b"aBC");
        assert_eq!(build_string(&eng, b"\x16\x16ABC").unwrap(), b"abc");
        assert_eq!(build_string(&eng, b"\x17\x17abc").unwrap(), b"ABC");
        // ^V overrides a standing ^W^W for one character.
        assert_eq!(build_string(&eng, b"\x17\x17ab\x16Cd").unwrap(), b"ABcD");
    }

    #[test]
    fn quoted_literal() {
        let eng = engine();
        assert_eq!(build_string(&eng, b"a\x11\x1bz").unwrap(), b"a\x1bz");
    }

    #[test]
    fn qreg_insertion() {
        let mut eng = engine();
        let r = QregRef::resolve(b'A', false).unwrap();
        eng.qregs.store_text(r, b"middle".to_vec());
        eng.qregs.store_num(r, b'!' as i64);
        assert_eq!(
            build_string(&eng, b"x\x05QAy").unwrap(),
            b"xmiddley"
        );
        assert_eq!(build_string(&eng, b"x\x05UAy").unwrap(), b"x!y");
    }

    #[test]
    fn last_filename_insertion() {
        let mut eng = engine();
        eng.files.last_file = "notes.txt".to_string();
        assert_eq!(build_string(&eng, b"\x05Q*").unwrap(), b"notes.txt");
    }

    #[test]
    fn non_build_ctrl_e_is_preserved() {
        let eng = engine();
        // ^EX is a match construct, not a build construct.
        assert_eq!(build_string(&eng, b"a\x05Xb").unwrap(), b"a\x05Xb");
    }
}
