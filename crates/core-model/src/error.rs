//! The TECO error taxonomy.
//!
//! Every engine failure is one of the classic three-letter errors. Each
//! variant carries the exact context the message needs (a filename, the
//! offending character, the search pattern), which replaces the variadic
//! `throw(err, ...)` of older implementations. Errors print to the terminal
//! as `?XXX  Text`; the EH flag selects how much detail follows.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Improper arguments")]
    Arguments,
    #[error("Invalid or extraneous at-sign")]
    Atsign,
    #[error("Bad tag '!{0}!'")]
    BadTag(String),
    #[error("Right angle bracket not in iteration")]
    NotInLoop,
    #[error("Command not configured")]
    NotConfigured,
    #[error("An EG or EZ command is too long")]
    CommandTooLong,
    #[error("Invalid or extraneous colon")]
    Colon,
    #[error("Can't pop into Q-register")]
    CannotPop,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Delete too big")]
    DeleteTooBig,
    #[error("Duplicate tag '!{0}!'")]
    DuplicateTag(String),
    #[error("{0}")]
    General(String),
    #[error("Extended feature not enabled")]
    ExtendedFeature,
    #[error("Invalid file '{0}'")]
    InvalidFile(String),
    #[error("File not found '{0}'")]
    FileNotFound(String),
    #[error("Invalid A argument")]
    InvalidAppend,
    #[error("Invalid ^E command in search argument")]
    InvalidCtrlE,
    #[error("Invalid character '{}' after E", pretty(*.0))]
    InvalidECommand(u8),
    #[error("Invalid character '{}' after F", pretty(*.0))]
    InvalidFCommand(u8),
    #[error("Ill-formed numeric expression")]
    IllFormedExpression,
    #[error("Invalid character '{}' in filename", pretty(*.0))]
    InvalidFilenameChar(u8),
    #[error("Invalid insert argument")]
    InvalidInsert,
    #[error("Invalid command '{}'", pretty(*.0))]
    IllegalCommand(u8),
    #[error("Invalid number")]
    InvalidNumber,
    #[error("Invalid m argument")]
    InvalidM,
    #[error("Invalid n argument")]
    InvalidN,
    #[error("Invalid P argument")]
    InvalidPage,
    #[error("Invalid quote character '{}'", pretty(*.0))]
    InvalidQuote(u8),
    #[error("Invalid Q-register name '{}'", pretty(*.0))]
    InvalidQName(u8),
    #[error("Invalid radix argument to ^R")]
    InvalidRadix,
    #[error("Invalid search argument")]
    InvalidSearchArg,
    #[error("Invalid search string")]
    InvalidSearchString,
    #[error("Invalid character '{}' following ^", pretty(*.0))]
    InvalidUparrow(u8),
    #[error("Invalid location for tag '!{0}!'")]
    TagLocation(String),
    #[error("Missing apostrophe")]
    MissingApostrophe,
    #[error("Internal program limit reached")]
    LimitReached,
    #[error("Memory overflow")]
    MemoryOverflow,
    #[error("Missing left parenthesis")]
    MissingLeftParen,
    #[error("Missing Q-register name")]
    MissingQName,
    #[error("Missing right angle bracket")]
    MissingRightAngle,
    #[error("Missing right parenthesis")]
    MissingRightParen,
    #[error("Missing start of conditional")]
    MissingStartOfCond,
    #[error("No argument before 1's complement operator")]
    NoArgBeforeComplement,
    #[error("No argument before comma")]
    NoArgBeforeComma,
    #[error("No argument before equals sign")]
    NoArgBeforeEquals,
    #[error("No argument before right parenthesis")]
    NoArgBeforeParen,
    #[error("No argument before quote")]
    NoArgBeforeQuote,
    #[error("No argument before semi-colon")]
    NoArgBeforeSemi,
    #[error("Cannot have n argument and text string")]
    NArgAndText,
    #[error("No argument before U command")]
    NoArgBeforeU,
    #[error("Negative argument to comma")]
    NegativeComma,
    #[error("No file for input")]
    NoInputFile,
    #[error("No file for output")]
    NoOutputFile,
    #[error("No n argument after m argument")]
    NoNAfterM,
    #[error("O command has no tag")]
    NoTag,
    #[error("Numeric argument with Y")]
    NumericYank,
    #[error("Not yet implemented")]
    NotYetImplemented,
    #[error("Output file already open")]
    OutputAlreadyOpen,
    #[error("Push-down list overflow")]
    PushdownOverflow,
    #[error("Attempt to move pointer off page with '{0}'")]
    PointerOffPage(char),
    #[error("Semi-colon not in iteration")]
    SemiNotInLoop,
    #[error("Search failure: '{0}'")]
    SearchFailure(String),
    #[error("String too long")]
    StringTooLong,
    #[error("System call failure: {0}")]
    SystemCall(String),
    #[error("Missing tag '!{0}!'")]
    MissingTag(String),
    #[error("Unterminated command string")]
    UnterminatedCommand,
    #[error("Unterminated macro")]
    UnterminatedMacro,
    #[error("Execution aborted")]
    Aborted,
    #[error("Y command aborted")]
    YankAborted,
}

/// Render a command byte for a diagnostic: control characters appear in
/// uparrow form so error text stays printable.
fn pretty(c: u8) -> String {
    match c {
        0x00..=0x1f => format!("^{}", (c + b'@') as char),
        0x7f => "<DEL>".to_string(),
        _ => (c as char).to_string(),
    }
}

impl Error {
    /// The classic three-letter mnemonic, as printed in `?XXX` form.
    pub fn code(&self) -> &'static str {
        use Error::*;
        match self {
            Arguments => "ARG",
            Atsign => "ATS",
            BadTag(_) => "BAT",
            NotInLoop => "BNI",
            NotConfigured => "CFG",
            CommandTooLong => "CMD",
            Colon => "COL",
            CannotPop => "CPQ",
            DivisionByZero => "DIV",
            DeleteTooBig => "DTB",
            DuplicateTag(_) => "DUP",
            General(_) => "ERR",
            ExtendedFeature => "EXT",
            InvalidFile(_) => "FIL",
            FileNotFound(_) => "FNF",
            InvalidAppend => "IAA",
            InvalidCtrlE => "ICE",
            InvalidECommand(_) => "IEC",
            InvalidFCommand(_) => "IFC",
            IllFormedExpression => "IFE",
            InvalidFilenameChar(_) => "IFN",
            InvalidInsert => "IIA",
            IllegalCommand(_) => "ILL",
            InvalidNumber => "ILN",
            InvalidM => "IMA",
            InvalidN => "INA",
            InvalidPage => "IPA",
            InvalidQuote(_) => "IQC",
            InvalidQName(_) => "IQN",
            InvalidRadix => "IRA",
            InvalidSearchArg => "ISA",
            InvalidSearchString => "ISS",
            InvalidUparrow(_) => "IUC",
            TagLocation(_) => "LOC",
            MissingApostrophe => "MAP",
            LimitReached => "MAX",
            MemoryOverflow => "MEM",
            MissingLeftParen => "MLP",
            MissingQName => "MQN",
            MissingRightAngle => "MRA",
            MissingRightParen => "MRP",
            MissingStartOfCond => "MSC",
            NoArgBeforeComplement => "NAB",
            NoArgBeforeComma => "NAC",
            NoArgBeforeEquals => "NAE",
            NoArgBeforeParen => "NAP",
            NoArgBeforeQuote => "NAQ",
            NoArgBeforeSemi => "NAS",
            NArgAndText => "NAT",
            NoArgBeforeU => "NAU",
            NegativeComma => "NCA",
            NoInputFile => "NFI",
            NoOutputFile => "NFO",
            NoNAfterM => "NON",
            NoTag => "NOT",
            NumericYank => "NYA",
            NotYetImplemented => "NYI",
            OutputAlreadyOpen => "OFO",
            PushdownOverflow => "PDO",
            PointerOffPage(_) => "POP",
            SemiNotInLoop => "SNI",
            SearchFailure(_) => "SRH",
            StringTooLong => "STL",
            SystemCall(_) => "SYS",
            MissingTag(_) => "TAG",
            UnterminatedCommand => "UTC",
            UnterminatedMacro => "UTM",
            Aborted => "XAB",
            YankAborted => "YCA",
        }
    }

    /// Longer explanation used when the EH flag requests verbose output.
    /// Errors without an entry here fall back to the one-line message.
    pub fn details(&self) -> Option<&'static str> {
        use Error::*;
        let text = match self {
            Atsign => {
                "A command has an at-sign modifier it does not accept, \
                 or more than one at-sign was seen."
            }
            NotInLoop => {
                "A right angle bracket was executed that is not matched by \
                 a preceding left angle bracket."
            }
            Colon => {
                "A command has a colon or double-colon modifier it does \
                 not accept, or more than two colons were seen."
            }
            DivisionByZero => {
                "An expression tried to divide a number by zero."
            }
            DeleteTooBig => {
                "A D command attempted to delete text outside the current \
                 edit buffer."
            }
            IllFormedExpression => {
                "The numeric expression preceding a command is incomplete: \
                 an operator is missing an operand."
            }
            InvalidQName(_) => {
                "Q-register names are the digits 0-9 and the letters A-Z, \
                 optionally preceded by a period for a local register."
            }
            MissingApostrophe => {
                "A conditional is not terminated by an apostrophe before \
                 the end of the command string or macro."
            }
            NoNAfterM => {
                "An m argument was followed by a comma, but no n argument \
                 appeared before the command."
            }
            NoInputFile => {
                "A command requested input, but no input file is open on \
                 the current stream. Use ER to open one."
            }
            NoOutputFile => {
                "A command requested output, but no output file is open on \
                 the current stream. Use EW or EB to open one."
            }
            PushdownOverflow => {
                "Too many Q-register push operations without matching pops."
            }
            SearchFailure(_) => {
                "The search string could not be found between the starting \
                 position and the search bound."
            }
            UnterminatedCommand => {
                "The command string ended in the middle of a command, most \
                 likely inside a text argument."
            }
            YankAborted => {
                "A Y or search yank would have destroyed unwritten data in \
                 the edit buffer while an output file is open. Set the ED \
                 yank bit to override."
            }
            Aborted => "Execution was interrupted by CTRL/C.",
            _ => return None,
        };
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_three_letters() {
        let samples = [
            Error::Arguments,
            Error::SearchFailure("foo".into()),
            Error::IllegalCommand(b'\x01'),
            Error::PointerOffPage('X'),
            Error::YankAborted,
        ];
        for e in samples {
            assert_eq!(e.code().len(), 3, "{e:?}");
        }
    }

    #[test]
    fn context_appears_in_message() {
        let e = Error::FileNotFound("missing.txt".into());
        assert_eq!(e.to_string(), "File not found 'missing.txt'");
        let e = Error::IllegalCommand(0x01);
        assert_eq!(e.to_string(), "Invalid command '^A'");
        let e = Error::SearchFailure("fox".into());
        assert_eq!(e.code(), "SRH");
    }
}
