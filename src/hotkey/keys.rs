//! Key code tables and modifier projection
//!
//! Turns a raw macOS virtual key code plus CGEventFlags bits into a
//! canonical [`DecodedKey`]. Everything here is pure so it can be tested
//! without an event tap.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Modifier flag masks from macOS CGEventFlags
pub mod flags {
    /// Command key modifier flag
    pub const COMMAND: u64 = 0x0010_0000;
    /// Shift key modifier flag
    pub const SHIFT: u64 = 0x0002_0000;
    /// Option/Alt key modifier flag
    pub const OPTION: u64 = 0x0008_0000;
    /// Control key modifier flag
    pub const CONTROL: u64 = 0x0004_0000;
}

/// The four modifiers a binding can name.
///
/// Used both for decoded events and for binding declarations, so exact
/// set equality is plain `==`. Serialized as a list of tokens
/// (`["cmd", "shift"]`); unknown tokens are dropped on load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ModifierState {
    /// Command key is held
    pub command: bool,
    /// Shift key is held
    pub shift: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Control key is held
    pub control: bool,
}

impl ModifierState {
    pub const CMD_SHIFT: Self = Self {
        command: true,
        shift: true,
        option: false,
        control: false,
    };

    pub const CMD_SHIFT_OPTION: Self = Self {
        command: true,
        shift: true,
        option: true,
        control: false,
    };

    pub const CMD: Self = Self {
        command: true,
        shift: false,
        option: false,
        control: false,
    };

    /// Project raw CGEventFlags bits onto the four recognized modifiers
    pub fn from_flags(raw: u64) -> Self {
        Self {
            command: raw & flags::COMMAND != 0,
            shift: raw & flags::SHIFT != 0,
            option: raw & flags::OPTION != 0,
            control: raw & flags::CONTROL != 0,
        }
    }

    /// Tokens in canonical order: cmd, shift, option, ctrl
    pub fn tokens(&self) -> Vec<&'static str> {
        let mut out = Vec::with_capacity(4);
        if self.command {
            out.push("cmd");
        }
        if self.shift {
            out.push("shift");
        }
        if self.option {
            out.push("option");
        }
        if self.control {
            out.push("ctrl");
        }
        out
    }

    /// Menu-style glyphs in the usual macOS order (⌃⌥⇧⌘)
    pub fn glyphs(&self) -> String {
        let mut out = String::new();
        if self.control {
            out.push('⌃');
        }
        if self.option {
            out.push('⌥');
        }
        if self.shift {
            out.push('⇧');
        }
        if self.command {
            out.push('⌘');
        }
        out
    }
}

impl From<Vec<String>> for ModifierState {
    fn from(tokens: Vec<String>) -> Self {
        let mut state = Self::default();
        for token in &tokens {
            match token.as_str() {
                "cmd" => state.command = true,
                "shift" => state.shift = true,
                "option" => state.option = true,
                "ctrl" => state.control = true,
                _ => {}
            }
        }
        state
    }
}

impl From<ModifierState> for Vec<String> {
    fn from(state: ModifierState) -> Self {
        state.tokens().into_iter().map(str::to_owned).collect()
    }
}

/// Key identifier as written in a binding: a number or a single character.
///
/// Any other string still loads as [`KeyToken::Other`] so one odd row never
/// costs the rest of the table; such a key never matches an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyToken {
    Digit(u32),
    Char(char),
    Other(String),
}

/// A key string that is neither a number nor a single character
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid key token {0:?}")]
pub struct InvalidKeyToken(pub String);

impl KeyToken {
    pub fn parse(raw: &str) -> Result<Self, InvalidKeyToken> {
        if let Ok(n) = raw.parse::<u32>() {
            return Ok(Self::Digit(n));
        }
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Self::Char(c.to_ascii_lowercase())),
            _ => Err(InvalidKeyToken(raw.to_owned())),
        }
    }

    /// Whether some key code on the keyboard can produce this token
    pub fn is_decodable(&self) -> bool {
        match self {
            Self::Digit(n) => *n <= 9,
            Self::Char(c) => CHAR_CODES.iter().any(|(_, ch)| ch == c),
            Self::Other(_) => false,
        }
    }
}

impl From<String> for KeyToken {
    fn from(raw: String) -> Self {
        Self::parse(&raw).unwrap_or(Self::Other(raw))
    }
}

impl From<KeyToken> for String {
    fn from(token: KeyToken) -> Self {
        token.to_string()
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digit(n) => write!(f, "{}", n),
            Self::Char(c) => write!(f, "{}", c),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Canonical form of a raw key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedKey {
    pub modifiers: ModifierState,
    pub digit: Option<u8>,
    pub character: Option<char>,
}

impl DecodedKey {
    /// Whether `token` names the key that produced this event
    pub fn matches_key(&self, token: &KeyToken) -> bool {
        match token {
            KeyToken::Digit(n) => self.digit.map(u32::from) == Some(*n),
            KeyToken::Char(c) => self.character == Some(*c),
            KeyToken::Other(_) => false,
        }
    }
}

/// Top-row number keys (ANSI layout)
const DIGIT_CODES: [(i64, u8); 10] = [
    (29, 0),
    (18, 1),
    (19, 2),
    (20, 3),
    (21, 4),
    (23, 5),
    (22, 6),
    (26, 7),
    (28, 8),
    (25, 9),
];

/// Letter and symbol keys (ANSI layout)
const CHAR_CODES: [(i64, char); 29] = [
    (0, 'a'),
    (1, 's'),
    (2, 'd'),
    (3, 'f'),
    (4, 'h'),
    (5, 'g'),
    (6, 'z'),
    (7, 'x'),
    (8, 'c'),
    (9, 'v'),
    (11, 'b'),
    (12, 'q'),
    (13, 'w'),
    (14, 'e'),
    (15, 'r'),
    (16, 'y'),
    (17, 't'),
    (30, ']'),
    (31, 'o'),
    (32, 'u'),
    (33, '['),
    (34, 'i'),
    (35, 'p'),
    (37, 'l'),
    (38, 'j'),
    (40, 'k'),
    (45, 'n'),
    (46, 'm'),
    (50, '`'),
];

pub fn digit_for(key_code: i64) -> Option<u8> {
    DIGIT_CODES
        .iter()
        .find(|(code, _)| *code == key_code)
        .map(|(_, digit)| *digit)
}

pub fn char_for(key_code: i64) -> Option<char> {
    CHAR_CODES
        .iter()
        .find(|(code, _)| *code == key_code)
        .map(|(_, ch)| *ch)
}

/// Decode a raw key code and modifier flags. Never fails; unknown codes
/// simply carry neither a digit nor a character.
pub fn decode(key_code: i64, raw_flags: u64) -> DecodedKey {
    DecodedKey {
        modifiers: ModifierState::from_flags(raw_flags),
        digit: digit_for(key_code),
        character: char_for(key_code),
    }
}
