//! Search commands: S, N, `_`, `E_`, and the F search-replace family.
//!
//! Every command funnels through one driver that slides the matcher over
//! the current page and, for the non-stop variants, pages or yanks forward
//! (or backward) and keeps going. Success moves dot past the match, records
//! the match as the last search string's span, and publishes its length so
//! the replace family can delete it blind.

use crate::build;
use crate::command::Command;
use crate::exec::page_cmds;
use crate::Engine;
use core_model::{E1Flags, E3Flags, EdFlags, Error, Int, Result, FAILURE, SUCCESS};
use core_search::{MatchConfig, Matcher, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchKind {
    /// Within the current page.
    Local,
    /// Non-stop: pages forward, writing through the output file.
    Page,
    /// Non-stop: yanks, honouring yank protection.
    Yank,
    /// Non-stop: yanks without the protection check.
    YankUnsafe,
}

fn match_config(eng: &Engine) -> MatchConfig {
    MatchConfig {
        ctrl_x: eng.flags.ctrl_x,
        symbol_dollar: eng.flags.e1.contains(E1Flags::DOLLAR),
        symbol_ubar: eng.flags.e1.contains(E1Flags::UBAR),
    }
}

/// Install the search pattern: a fresh text argument replaces the last
/// search string (after caret conversion); an empty one reuses it.
fn prepare_pattern(eng: &mut Engine, text: &[u8]) -> Result<()> {
    if !text.is_empty() {
        eng.last_search = build::convert_carets(eng, text)?;
    }
    if eng.last_search.is_empty() {
        return Err(Error::InvalidSearchString);
    }
    Ok(())
}

/// Attempt a match on the current page only.
fn page_attempt(eng: &Engine, backward: bool, count: usize) -> Result<Option<Span>> {
    let pattern = eng.last_search.clone();
    let matcher = Matcher::new(&eng.buffer, &eng.qregs, match_config(eng));
    let dot = eng.buffer.dot();
    if backward {
        if dot == 0 {
            return Ok(None);
        }
        matcher.find_backward(&pattern, dot - 1, 0, count)
    } else {
        let movedot = eng.flags.ed.contains(EdFlags::MOVEDOT);
        matcher.find_forward(&pattern, dot, eng.buffer.zed(), count, movedot)
    }
}

/// The search driver. On success dot is left after the match and the match
/// length published; on failure dot and the page position are wherever the
/// driver stopped (the failure handler sorts that out).
fn drive(eng: &mut Engine, kind: SearchKind, count: Int) -> Result<bool> {
    if count == 0 {
        return Err(Error::InvalidSearchArg);
    }
    let backward = count < 0;
    let per_page = count.unsigned_abs() as usize;
    loop {
        if let Some(span) = page_attempt(eng, backward, per_page)? {
            eng.buffer.set_dot(span.end as Int);
            eng.last_len = span.len();
            return Ok(true);
        }
        match kind {
            SearchKind::Local => return Ok(false),
            SearchKind::Page => {
                if !eng.files.output_open() {
                    return Err(Error::NoOutputFile);
                }
                if backward {
                    let crlf_out = eng.flags.e3.contains(E3Flags::CR_OUT);
                    let nopage = eng.flags.e3.contains(E3Flags::NOPAGE);
                    let ff = eng.flags.ctrl_e;
                    let crate::Engine { buffer, pages, .. } = eng;
                    if !pages.page_backward(buffer, ff, crlf_out, nopage)? {
                        return Ok(false);
                    }
                    let zed = eng.buffer.zed() as Int;
                    eng.buffer.set_dot(zed);
                } else {
                    let ff = eng.flags.ctrl_e;
                    if !page_cmds::page_forward_step(eng, ff)? {
                        return Ok(false);
                    }
                }
            }
            SearchKind::Yank | SearchKind::YankUnsafe => {
                if kind == SearchKind::Yank && !eng.flags.ed.contains(EdFlags::YANK) {
                    return Err(Error::YankAborted);
                }
                if !eng.files.input_open() {
                    return Err(Error::NoInputFile);
                }
                if !page_cmds::yank_next(eng)? {
                    return Ok(false);
                }
            }
        }
    }
}

/// True when the next command byte (whitespace aside) is `;` or `:;`, in
/// which case a failing search stays quiet and lets the semicolon see the
/// failure value.
fn next_is_semi(eng: &Engine) -> bool {
    let bytes = eng.cbuf.as_bytes();
    let mut i = eng.cbuf.pos();
    while let Some(&c) = bytes.get(i) {
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b':' => i += 1,
            b';' => return true,
            _ => return false,
        }
    }
    false
}

fn search_success(eng: &mut Engine, cmd: &Command) -> Result<()> {
    if cmd.colon || cmd.dcolon || (eng.in_loop() && next_is_semi(eng)) {
        eng.estack.push_val(SUCCESS)?;
    }
    Ok(())
}

fn search_failure(eng: &mut Engine, cmd: &Command, backward: bool) -> Result<()> {
    if cmd.colon || cmd.dcolon {
        return eng.estack.push_val(FAILURE);
    }
    if !eng.flags.ed.contains(EdFlags::KEEPDOT) {
        let target = if backward { eng.buffer.zed() as Int } else { 0 };
        eng.buffer.set_dot(target);
    }
    if eng.in_loop() {
        let quiet = next_is_semi(eng);
        if !quiet {
            eng.type_str("%Search failure in loop");
            eng.type_newline();
        }
        return eng.exit_loop();
    }
    Err(Error::SearchFailure(
        String::from_utf8_lossy(&eng.last_search).into_owned(),
    ))
}

/// Delete the last match and insert the replacement.
fn replace_match(eng: &mut Engine, replacement: &[u8]) -> Result<()> {
    eng.buffer.delete(-(eng.last_len as Int))?;
    let text = build::build_string(eng, replacement)?;
    eng.buffer.insert(&text)?;
    eng.last_len = text.len();
    Ok(())
}

fn search_command(
    eng: &mut Engine,
    cmd: &mut Command,
    kind: SearchKind,
    replace: Option<Vec<u8>>,
) -> Result<()> {
    prepare_pattern(eng, &cmd.text1.clone())?;
    let count = cmd.n_or(1);
    if drive(eng, kind, count)? {
        if let Some(replacement) = replace {
            replace_match(eng, &replacement)?;
        }
        search_success(eng, cmd)
    } else {
        search_failure(eng, cmd, count < 0)
    }
}

pub(super) fn exec_s(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    if cmd.dcolon {
        // ::S compares the pattern against the text at dot.
        prepare_pattern(eng, &cmd.text1.clone())?;
        let pattern = eng.last_search.clone();
        let end = {
            let matcher = Matcher::new(&eng.buffer, &eng.qregs, match_config(eng));
            matcher.match_at(&pattern, eng.buffer.dot())?
        };
        return match end {
            Some(end) => {
                eng.last_len = end - eng.buffer.dot();
                eng.buffer.set_dot(end as Int);
                eng.estack.push_val(SUCCESS)
            }
            None => eng.estack.push_val(FAILURE),
        };
    }
    search_command(eng, cmd, SearchKind::Local, None)
}

pub(super) fn exec_n(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    search_command(eng, cmd, SearchKind::Page, None)
}

pub(super) fn exec_underscore(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    search_command(eng, cmd, SearchKind::Yank, None)
}

pub(super) fn exec_e_underscore(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    search_command(eng, cmd, SearchKind::YankUnsafe, None)
}

pub(super) fn exec_fs(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let replacement = cmd.text2.clone();
    search_command(eng, cmd, SearchKind::Local, Some(replacement))
}

pub(super) fn exec_fn(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let replacement = cmd.text2.clone();
    search_command(eng, cmd, SearchKind::Page, Some(replacement))
}

pub(super) fn exec_f_underscore(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let replacement = cmd.text2.clone();
    search_command(eng, cmd, SearchKind::Yank, Some(replacement))
}

/// Bounded search: n limits the range to n lines from dot (negative is
/// backward); m,n searches between two positions.
fn bounded_search(eng: &mut Engine, cmd: &mut Command) -> Result<bool> {
    prepare_pattern(eng, &cmd.text1.clone())?;
    let dot = eng.buffer.dot() as Int;
    let zed = eng.buffer.zed() as Int;
    let (start, bound, backward) = if let (Some(m), Some(n)) = (cmd.m, cmd.n) {
        let (a, b) = if m <= n { (m, n) } else { (n, m) };
        if b > zed {
            return Err(Error::PointerOffPage('F'));
        }
        (a, b, false)
    } else {
        let n = cmd.n_or(1);
        if n == 0 {
            return Err(Error::InvalidSearchArg);
        }
        let edge = dot + eng.buffer.len_to_line(n);
        if n < 0 {
            (dot, edge, true)
        } else {
            (dot, edge, false)
        }
    };
    let pattern = eng.last_search.clone();
    let found = {
        let matcher = Matcher::new(&eng.buffer, &eng.qregs, match_config(eng));
        if backward {
            if start == 0 {
                None
            } else {
                matcher.find_backward(&pattern, start as usize - 1, bound as usize, 1)?
            }
        } else {
            let movedot = eng.flags.ed.contains(EdFlags::MOVEDOT);
            matcher.find_forward(&pattern, start as usize, bound as usize, 1, movedot)?
        }
    };
    match found {
        Some(span) => {
            eng.buffer.set_dot(span.end as Int);
            eng.last_len = span.len();
            Ok(true)
        }
        None => Ok(false),
    }
}

pub(super) fn exec_fb(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let backward = cmd.n_or(1) < 0;
    if bounded_search(eng, cmd)? {
        search_success(eng, cmd)
    } else {
        search_failure(eng, cmd, backward)
    }
}

pub(super) fn exec_fc(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let backward = cmd.n_or(1) < 0;
    if bounded_search(eng, cmd)? {
        let replacement = cmd.text2.clone();
        replace_match(eng, &replacement)?;
        search_success(eng, cmd)
    } else {
        search_failure(eng, cmd, backward)
    }
}

/// FD: search and delete the matched text.
pub(super) fn exec_fd(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    prepare_pattern(eng, &cmd.text1.clone())?;
    let count = cmd.n_or(1);
    if drive(eng, SearchKind::Local, count)? {
        eng.buffer.delete(-(eng.last_len as Int))?;
        search_success(eng, cmd)
    } else {
        search_failure(eng, cmd, count < 0)
    }
}

/// FK: search and delete everything between the starting position and the
/// near edge of the match.
pub(super) fn exec_fk(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    prepare_pattern(eng, &cmd.text1.clone())?;
    let old_dot = eng.buffer.dot() as Int;
    let count = cmd.n_or(1);
    if drive(eng, SearchKind::Local, count)? {
        let match_end = eng.buffer.dot() as Int;
        let match_start = match_end - eng.last_len as Int;
        let (a, b) = if old_dot <= match_start {
            (old_dot, match_start)
        } else {
            (match_end, old_dot)
        };
        eng.buffer.set_dot(a);
        eng.buffer.delete(b - a)?;
        search_success(eng, cmd)
    } else {
        search_failure(eng, cmd, count < 0)
    }
}

/// FR: replace the last match (or insert) with the text argument.
pub(super) fn exec_fr(eng: &mut Engine, cmd: &mut Command) -> Result<()> {
    let replacement = cmd.text1.clone();
    replace_match(eng, &replacement)
}

#[cfg(test)]
mod tests {
    use crate::term::CaptureTerminal;
    use crate::{CommandBuf, Engine};
    use core_model::Error;

    fn engine_with(text: &[u8]) -> Engine {
        let mut eng = Engine::new(Box::new(CaptureTerminal::new()));
        eng.buffer.insert(text).unwrap();
        eng.buffer.set_dot(0);
        eng
    }

    fn run(eng: &mut Engine, cmds: &[u8]) -> core_model::Result<()> {
        eng.cbuf = CommandBuf::from_bytes(cmds.to_vec());
        eng.run_command()
    }

    fn contents(eng: &Engine) -> Vec<u8> {
        eng.buffer.copy_range(0, eng.buffer.zed())
    }

    #[test]
    fn simple_search_moves_dot() {
        let mut eng = engine_with(b"the quick brown fox");
        run(&mut eng, b"Squick\x1b").unwrap();
        assert_eq!(eng.buffer.dot(), 9);
        assert_eq!(eng.last_len, 5);
        assert_eq!(eng.last_search, b"quick");
    }

    #[test]
    fn failed_search_resets_dot_and_errors() {
        let mut eng = engine_with(b"abc");
        run(&mut eng, b"1C").unwrap();
        assert_eq!(
            run(&mut eng, b"Szebra\x1b"),
            Err(Error::SearchFailure("zebra".into()))
        );
        assert_eq!(eng.buffer.dot(), 0);
    }

    #[test]
    fn colon_search_pushes_status() {
        let mut eng = engine_with(b"abc abc");
        run(&mut eng, b":Sabc\x1bUA :Sxyz\x1bUB").unwrap();
        let qa = core_qreg::QregRef::resolve(b'A', false).unwrap();
        let qb = core_qreg::QregRef::resolve(b'B', false).unwrap();
        assert_eq!(eng.qregs.num(qa), -1);
        assert_eq!(eng.qregs.num(qb), 0);
    }

    #[test]
    fn backward_search() {
        let mut eng = engine_with(b"one two one");
        run(&mut eng, b"ZJ -Sone\x1b").unwrap();
        // Dot ends after the *last* occurrence.
        assert_eq!(eng.buffer.dot(), 11);
    }

    #[test]
    fn empty_pattern_reuses_last_search() {
        let mut eng = engine_with(b"ab ab");
        run(&mut eng, b"Sab\x1b S\x1b").unwrap();
        assert_eq!(eng.buffer.dot(), 5);
        let mut eng = engine_with(b"x");
        assert_eq!(run(&mut eng, b"S\x1b"), Err(Error::InvalidSearchString));
    }

    #[test]
    fn search_and_replace() {
        let mut eng = engine_with(b"the quick brown fox");
        run(&mut eng, b"FSfox\x1bbox\x1b").unwrap();
        assert_eq!(contents(&eng), b"the quick brown box");
        assert_eq!(eng.buffer.dot(), 19);
        assert_eq!(eng.last_len, 3);
    }

    #[test]
    fn replace_with_empty_deletes() {
        let mut eng = engine_with(b"a bad day");
        run(&mut eng, b"FSbad \x1b\x1b").unwrap();
        assert_eq!(contents(&eng), b"a day");
    }

    #[test]
    fn fr_replaces_last_match() {
        let mut eng = engine_with(b"hello world");
        run(&mut eng, b"Sworld\x1b FRthere\x1b").unwrap();
        assert_eq!(contents(&eng), b"hello there");
    }

    #[test]
    fn fd_deletes_match_and_fk_deletes_gap() {
        let mut eng = engine_with(b"keep DELETE keep");
        run(&mut eng, b"FDDELETE \x1b").unwrap();
        assert_eq!(contents(&eng), b"keep keep");
        let mut eng = engine_with(b"head gap TAG tail");
        run(&mut eng, b"4J FKTAG\x1b").unwrap();
        assert_eq!(contents(&eng), b"head TAG tail");
    }

    #[test]
    fn double_colon_compares_at_dot() {
        let mut eng = engine_with(b"abcdef");
        run(&mut eng, b"::Sabc\x1bUA").unwrap();
        let qa = core_qreg::QregRef::resolve(b'A', false).unwrap();
        assert_eq!(eng.qregs.num(qa), -1);
        assert_eq!(eng.buffer.dot(), 3);
        run(&mut eng, b"::Sxyz\x1bUB").unwrap();
        let qb = core_qreg::QregRef::resolve(b'B', false).unwrap();
        assert_eq!(eng.qregs.num(qb), 0);
    }

    #[test]
    fn bounded_search_respects_limit() {
        let mut eng = engine_with(b"aaa\nbbb\nccc\n");
        // ccc is outside the one-line bound.
        run(&mut eng, b":FBccc\x1bUA").unwrap();
        let qa = core_qreg::QregRef::resolve(b'A', false).unwrap();
        assert_eq!(eng.qregs.num(qa), 0);
        run(&mut eng, b"0J 3:FBccc\x1bUB").unwrap();
        let qb = core_qreg::QregRef::resolve(b'B', false).unwrap();
        assert_eq!(eng.qregs.num(qb), -1);
    }

    #[test]
    fn search_failure_in_loop_exits_loop() {
        let mut eng = engine_with(b"x");
        run(&mut eng, b"5<Snope\x1b Iy\x1b>").unwrap();
        // The failing search exited the loop before any insert.
        assert_eq!(contents(&eng), b"x");
    }

    #[test]
    fn loop_search_with_semicolon() {
        let mut eng = engine_with(b"ab ab ab");
        run(&mut eng, b"0UA <:Sab\x1b; %A\x1b>").unwrap();
        let qa = core_qreg::QregRef::resolve(b'A', false).unwrap();
        assert_eq!(eng.qregs.num(qa), 3);
    }
}
