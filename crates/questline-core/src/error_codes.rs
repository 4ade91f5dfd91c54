//! Script fault codes and their host-facing descriptions.
//!
//! The interpreter reports faults as bare integers. Hosts key UI text off
//! these values, so the numbering and the message strings are stable
//! contracts: codes start at [`FAULT_CODE_BASE`] and follow the historical
//! declaration order, and [`describe`] reproduces the historical messages
//! byte for byte.
//!
//! [`describe`] is total: any integer, including `0` ("no fault") and codes
//! outside the known table, maps to a non-empty string.

/// First assigned fault code; everything below it is not a script fault.
pub const FAULT_CODE_BASE: i32 = 100;

/// Message returned for any code outside the known table.
pub const UNKNOWN_FAULT_MESSAGE: &str = "Unknown error!";

/// A known script fault raised by the interpreter during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FaultCode {
    DivisionByZero = 100,
    TypeMismatch = 101,
    StackOverflow = 102,
    TooManyItems = 103,
    FileNotFound = 104,
    CantLoadFile = 105,
    GameNotLoaded = 106,
    ColonNotFound = 107,
    CantIncludeFile = 108,
    CantAddAction = 109,
    EqualsNotFound = 110,
    LocationNotFound = 111,
    EndNotFound = 112,
    LabelNotFound = 113,
    InvalidVarName = 114,
    QuoteNotFound = 115,
    BracketNotFound = 116,
    BracketsNotFound = 117,
    Syntax = 118,
    UnknownAction = 119,
    ArgumentCount = 120,
    CantAddObject = 121,
    CantAddMenuItem = 122,
    TooManyVars = 123,
    InvalidRegexp = 124,
    CodeNotFound = 125,
}

impl FaultCode {
    /// Every known fault, in code order.
    pub const ALL: [FaultCode; 26] = [
        FaultCode::DivisionByZero,
        FaultCode::TypeMismatch,
        FaultCode::StackOverflow,
        FaultCode::TooManyItems,
        FaultCode::FileNotFound,
        FaultCode::CantLoadFile,
        FaultCode::GameNotLoaded,
        FaultCode::ColonNotFound,
        FaultCode::CantIncludeFile,
        FaultCode::CantAddAction,
        FaultCode::EqualsNotFound,
        FaultCode::LocationNotFound,
        FaultCode::EndNotFound,
        FaultCode::LabelNotFound,
        FaultCode::InvalidVarName,
        FaultCode::QuoteNotFound,
        FaultCode::BracketNotFound,
        FaultCode::BracketsNotFound,
        FaultCode::Syntax,
        FaultCode::UnknownAction,
        FaultCode::ArgumentCount,
        FaultCode::CantAddObject,
        FaultCode::CantAddMenuItem,
        FaultCode::TooManyVars,
        FaultCode::InvalidRegexp,
        FaultCode::CodeNotFound,
    ];

    /// Maps a raw interpreter code to the known fault, if any.
    #[must_use]
    pub fn from_raw(code: i32) -> Option<Self> {
        match code {
            100 => Some(FaultCode::DivisionByZero),
            101 => Some(FaultCode::TypeMismatch),
            102 => Some(FaultCode::StackOverflow),
            103 => Some(FaultCode::TooManyItems),
            104 => Some(FaultCode::FileNotFound),
            105 => Some(FaultCode::CantLoadFile),
            106 => Some(FaultCode::GameNotLoaded),
            107 => Some(FaultCode::ColonNotFound),
            108 => Some(FaultCode::CantIncludeFile),
            109 => Some(FaultCode::CantAddAction),
            110 => Some(FaultCode::EqualsNotFound),
            111 => Some(FaultCode::LocationNotFound),
            112 => Some(FaultCode::EndNotFound),
            113 => Some(FaultCode::LabelNotFound),
            114 => Some(FaultCode::InvalidVarName),
            115 => Some(FaultCode::QuoteNotFound),
            116 => Some(FaultCode::BracketNotFound),
            117 => Some(FaultCode::BracketsNotFound),
            118 => Some(FaultCode::Syntax),
            119 => Some(FaultCode::UnknownAction),
            120 => Some(FaultCode::ArgumentCount),
            121 => Some(FaultCode::CantAddObject),
            122 => Some(FaultCode::CantAddMenuItem),
            123 => Some(FaultCode::TooManyVars),
            124 => Some(FaultCode::InvalidRegexp),
            125 => Some(FaultCode::CodeNotFound),
            _ => None,
        }
    }

    /// Raw integer value reported over the host boundary.
    #[must_use]
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Historical host-facing message for this fault.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            FaultCode::DivisionByZero => "Division by zero!",
            FaultCode::TypeMismatch => "Type mismatch!",
            FaultCode::StackOverflow => "Stack overflow!",
            FaultCode::TooManyItems => "Too many items in expression!",
            FaultCode::FileNotFound => "File not found!",
            FaultCode::CantLoadFile => "Can't load file!",
            FaultCode::GameNotLoaded => "Game not loaded!",
            FaultCode::ColonNotFound => "Sign [:] not found!",
            FaultCode::CantIncludeFile => "Can't add file!",
            FaultCode::CantAddAction => "Can't add action!",
            FaultCode::EqualsNotFound => "Sign [=] not found!",
            FaultCode::LocationNotFound => "Location not found!",
            FaultCode::EndNotFound => "[end] not found!",
            FaultCode::LabelNotFound => "Label not found!",
            FaultCode::InvalidVarName => "Incorrect variable's name!",
            FaultCode::QuoteNotFound => "Quote not found!",
            FaultCode::BracketNotFound => "Bracket not found!",
            FaultCode::BracketsNotFound => "Brackets not found!",
            FaultCode::Syntax => "Syntax error!",
            FaultCode::UnknownAction => "Unknown action!",
            FaultCode::ArgumentCount => "Incorrect arguments' count!",
            FaultCode::CantAddObject => "Can't add object!",
            FaultCode::CantAddMenuItem => "Can't add menu's item!",
            FaultCode::TooManyVars => "Too many variables!",
            FaultCode::InvalidRegexp => "Regular expression's error!",
            FaultCode::CodeNotFound => "Code not found!",
        }
    }
}

/// Total description lookup over raw codes.
///
/// Known codes return their historical message; everything else returns
/// [`UNKNOWN_FAULT_MESSAGE`].
#[must_use]
pub fn describe(code: i32) -> &'static str {
    FaultCode::from_raw(code).map_or(UNKNOWN_FAULT_MESSAGE, FaultCode::message)
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- table shape ---

    #[test]
    fn codes_are_contiguous_from_base() {
        for (offset, fault) in FaultCode::ALL.iter().enumerate() {
            assert_eq!(fault.as_raw(), FAULT_CODE_BASE + offset as i32);
        }
    }

    #[test]
    fn from_raw_roundtrips_every_known_code() {
        for fault in FaultCode::ALL {
            assert_eq!(FaultCode::from_raw(fault.as_raw()), Some(fault));
        }
    }

    #[test]
    fn from_raw_rejects_neighbors_of_the_table() {
        assert_eq!(FaultCode::from_raw(FAULT_CODE_BASE - 1), None);
        assert_eq!(FaultCode::from_raw(126), None);
        assert_eq!(FaultCode::from_raw(0), None);
        assert_eq!(FaultCode::from_raw(-100), None);
    }

    // --- messages ---

    #[test]
    fn messages_match_the_historical_table() {
        let expected = [
            (100, "Division by zero!"),
            (101, "Type mismatch!"),
            (102, "Stack overflow!"),
            (103, "Too many items in expression!"),
            (104, "File not found!"),
            (105, "Can't load file!"),
            (106, "Game not loaded!"),
            (107, "Sign [:] not found!"),
            (108, "Can't add file!"),
            (109, "Can't add action!"),
            (110, "Sign [=] not found!"),
            (111, "Location not found!"),
            (112, "[end] not found!"),
            (113, "Label not found!"),
            (114, "Incorrect variable's name!"),
            (115, "Quote not found!"),
            (116, "Bracket not found!"),
            (117, "Brackets not found!"),
            (118, "Syntax error!"),
            (119, "Unknown action!"),
            (120, "Incorrect arguments' count!"),
            (121, "Can't add object!"),
            (122, "Can't add menu's item!"),
            (123, "Too many variables!"),
            (124, "Regular expression's error!"),
            (125, "Code not found!"),
        ];
        assert_eq!(expected.len(), FaultCode::ALL.len());
        for (code, message) in expected {
            assert_eq!(describe(code), message, "code {code}");
        }
    }

    #[test]
    fn describe_is_total() {
        assert_eq!(describe(0), UNKNOWN_FAULT_MESSAGE);
        assert_eq!(describe(99), UNKNOWN_FAULT_MESSAGE);
        assert_eq!(describe(126), UNKNOWN_FAULT_MESSAGE);
        assert_eq!(describe(i32::MIN), UNKNOWN_FAULT_MESSAGE);
        assert_eq!(describe(i32::MAX), UNKNOWN_FAULT_MESSAGE);
        for fault in FaultCode::ALL {
            assert!(!describe(fault.as_raw()).is_empty());
        }
    }
}
