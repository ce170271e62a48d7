//! Broad command-language coverage: expressions, values, modifiers, and
//! the error taxonomy.

mod common;

use common::Session;
use core_model::Error;

#[test]
fn expression_arithmetic_binds_left_to_right() {
    let mut s = Session::new();
    s.run("2+3*4UA$$").unwrap();
    assert_eq!(s.qnum(b'A'), 20);
    s.run("10-2-3UB$$").unwrap();
    assert_eq!(s.qnum(b'B'), 5);
    s.run("7/2UC 7//2UD$$").unwrap();
    assert_eq!(s.qnum(b'C'), 3);
    assert_eq!(s.qnum(b'D'), 1);
}

#[test]
fn parentheses_and_extended_operators() {
    let mut s = Session::new();
    s.run("2*(3+4)UA$$").unwrap();
    assert_eq!(s.qnum(b'A'), 14);
    s.run("(1<2)UB (2<2)UC$$").unwrap();
    assert_eq!(s.qnum(b'B'), -1);
    assert_eq!(s.qnum(b'C'), 0);
    s.run("(1<<4)UD (3==3)UE (5<>5)UF$$").unwrap();
    assert_eq!(s.qnum(b'D'), 16);
    assert_eq!(s.qnum(b'E'), -1);
    assert_eq!(s.qnum(b'F'), 0);
}

#[test]
fn bitwise_operators() {
    let mut s = Session::new();
    s.run("12&10UA 12#3UB 12~10UC$$").unwrap();
    assert_eq!(s.qnum(b'A'), 8);
    assert_eq!(s.qnum(b'B'), 15);
    assert_eq!(s.qnum(b'C'), 6);
    // ^_ is a postfix one's complement.
    s.run_raw(b"5\x1fUD").unwrap();
    assert_eq!(s.qnum(b'D'), -6);
}

#[test]
fn division_by_zero_is_hard() {
    let mut s = Session::new();
    assert_eq!(s.run("1/0=$$"), Err(Error::DivisionByZero));
}

#[test]
fn unmatched_parens() {
    let mut s = Session::new();
    assert_eq!(s.run(")$$"), Err(Error::MissingLeftParen));
    assert_eq!(s.run("(1+2$$"), Err(Error::MissingRightParen));
}

#[test]
fn unary_minus_and_bare_minus() {
    let mut s = Session::new();
    s.run("-5UA$$").unwrap();
    assert_eq!(s.qnum(b'A'), -5);
    // A lone minus sign is -1.
    s.run("-UA$$").unwrap();
    assert_eq!(s.qnum(b'A'), -1);
}

#[test]
fn dot_zed_and_h() {
    let mut s = Session::new();
    s.run("Iabcdef$ 2J .UA ZUB BUC$$").unwrap();
    assert_eq!(s.qnum(b'A'), 2);
    assert_eq!(s.qnum(b'B'), 6);
    assert_eq!(s.qnum(b'C'), 0);
    // HK empties the whole buffer.
    s.run("HK$$").unwrap();
    assert_eq!(s.eng.buffer.zed(), 0);
}

#[test]
fn ctrl_values() {
    let mut s = Session::new();
    s.run("Iabc$$$").unwrap();
    // ^S is the negative of the last insert length; ^Y its span.
    s.run_raw(b"\x13UA").unwrap();
    assert_eq!(s.qnum(b'A'), -3);
    s.run_raw(b"\x19UB").unwrap();
    // ^Y pushes the pair (dot-len, dot); n is the dot.
    assert_eq!(s.qnum(b'B'), 3);
    // ^^x pushes the code of x.
    s.run_raw(b"\x1e!UC").unwrap();
    assert_eq!(s.qnum(b'C'), b'!' as i64);
    // ^Z totals Q-register text.
    s.run_raw(b"\x15Qhello\x1b\x1aUD").unwrap();
    assert_eq!(s.qnum(b'D'), 5);
}

#[test]
fn date_and_time_words_are_sane() {
    let mut s = Session::new();
    s.run_raw(b"\x02UA\x08UB").unwrap();
    // ((year-1900)*16 + month)*32 + day, so anything this century is big.
    assert!(s.qnum(b'A') > (100 * 16 + 1) * 32);
    let ms = s.qnum(b'B');
    assert!((0..86_400_000).contains(&ms));
}

#[test]
fn caret_spellings_are_equivalent() {
    let mut s = Session::new();
    // ^S spelled as caret-S.
    s.run("Iab$$$").unwrap();
    s.run("^SUA$$").unwrap();
    assert_eq!(s.qnum(b'A'), -2);
    // Invalid caret follower.
    assert_eq!(s.run("^?$$"), Err(Error::InvalidUparrow(b'?')));
}

#[test]
fn modifier_legality() {
    let mut s = Session::new();
    // Colon on a command that cannot take one.
    assert_eq!(s.run(":Ix$$$"), Err(Error::Colon));
    // At-sign on a command without text.
    assert_eq!(s.run("@5C$$"), Err(Error::Atsign));
    // m without n.
    assert_eq!(s.run("1,T$$"), Err(Error::NoNAfterM));
    // Negative m.
    assert_eq!(s.run("-1,2T$$"), Err(Error::NegativeComma));
    // m on a command that cannot take it.
    assert_eq!(s.run("1,2C$$"), Err(Error::InvalidM));
}

#[test]
fn at_sign_delimiters() {
    let mut s = Session::new();
    s.run("@I/with$dollar/$$").unwrap();
    assert_eq!(s.buffer(), b"with\x1bdollar");
    let mut s = Session::new();
    s.eng.buffer.insert(b"x fox y").unwrap();
    s.eng.buffer.set_dot(0);
    s.run("@S/fox/$$").unwrap();
    assert_eq!(s.eng.buffer.dot(), 5);
}

#[test]
fn unterminated_text_argument() {
    let mut s = Session::new();
    assert_eq!(s.run("Iabc"), Err(Error::UnterminatedCommand));
}

#[test]
fn illegal_commands() {
    let mut s = Session::new();
    assert_eq!(s.run("{$$"), Err(Error::IllegalCommand(b'{')));
    assert_eq!(s.run("E?$$"), Err(Error::InvalidECommand(b'?')));
    assert_eq!(s.run("FY$$"), Err(Error::InvalidFCommand(b'Y')));
}

#[test]
fn display_commands_are_not_configured() {
    let mut s = Session::new();
    assert_eq!(s.run("W$$"), Err(Error::NotConfigured));
    assert_eq!(s.run("F1a$b$$$"), Err(Error::NotConfigured));
}

#[test]
fn tab_insert_and_equals_formats() {
    let mut s = Session::new();
    s.run_raw(b"\x09text\x1b").unwrap();
    assert_eq!(s.buffer(), b"\ttext");
    assert_eq!(s.eng.last_len, 5);
    s.clear_output();
    s.run("8=8==8===$$").unwrap();
    assert_eq!(s.output(), b"8\n10\n8\n");
}

#[test]
fn radix_affects_literals_and_backslash() {
    let mut s = Session::new();
    // Octal radix: 17 reads as 15.
    s.run_raw(b"8\x12 17UA \x04").unwrap();
    assert_eq!(s.qnum(b'A'), 0o17);
    // Hex \ reads hex digits from the buffer.
    let mut s = Session::new();
    s.run("Iff $ 0J$$").unwrap();
    s.run_raw(b"16\x12\\UB").unwrap();
    assert_eq!(s.qnum(b'B'), 0xff);
}

#[test]
fn whole_buffer_type_range() {
    let mut s = Session::new();
    s.run("Ione\ntwo\n$ 0J 0,4T$$").unwrap();
    assert_eq!(s.output(), b"one\n");
}

#[test]
fn na_reads_characters_with_sentinel() {
    let mut s = Session::new();
    s.run("Iab$ 0J 0AUA 1AUB 9AUC$$").unwrap();
    assert_eq!(s.qnum(b'A'), b'a' as i64);
    assert_eq!(s.qnum(b'B'), b'b' as i64);
    assert_eq!(s.qnum(b'C'), -1);
}

#[test]
fn ctrl_q_line_distance() {
    let mut s = Session::new();
    s.run("Iaa\nbb\n$ 0J$$").unwrap();
    s.run_raw(b"1\x11UA").unwrap();
    assert_eq!(s.qnum(b'A'), 3);
}

#[test]
fn interrupt_aborts_execution() {
    let mut s = Session::new();
    s.eng
        .interrupt
        .store(true, std::sync::atomic::Ordering::Relaxed);
    assert_eq!(s.run("Ix$$$"), Err(Error::Aborted));
    s.eng.recover();
    // Recovery clears the flag and leaves the engine usable.
    s.run("Iy$$$").unwrap();
    assert_eq!(s.buffer(), b"y");
}

#[test]
fn recover_unwinds_macro_state() {
    let mut s = Session::new();
    // A macro that pushes a local frame then fails.
    s.run_raw(b"\x15A 1U.X {\x1b").unwrap();
    assert!(s.run("MA$$").is_err());
    assert!(s.eng.in_macro());
    s.eng.recover();
    assert!(!s.eng.in_macro());
    assert_eq!(s.eng.qregs.local_depth(), 0);
}

#[test]
fn pushdown_overflow_is_pdo() {
    let mut s = Session::new();
    let result = s.run("300<[A>$$");
    assert_eq!(result, Err(Error::PushdownOverflow));
}

#[test]
fn comma_without_argument() {
    let mut s = Session::new();
    assert_eq!(s.run(",T$$"), Err(Error::NoArgBeforeComma));
}

#[test]
fn equals_without_argument() {
    let mut s = Session::new();
    assert_eq!(s.run("=$$"), Err(Error::NoArgBeforeEquals));
}
