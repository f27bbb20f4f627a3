//! Static class-code vocabulary and the validated [`ClassCode`] type.
//!
//! A code is five digits: course, level, meeting days, time slot, and session
//! ordinal. The first four digits identify a session group; two codes that
//! agree on them differ only in session ordinal and are "session-equivalent".

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Validated 5-digit class code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassCode(String);

impl ClassCode {
    /// Validate a raw code against the vocabulary tables.
    pub fn parse(raw: &str) -> Result<Self, UnknownCode> {
        let trimmed = raw.trim();
        decode(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The course/level/days/time prefix shared by all sessions of a class.
    pub fn session_key(&self) -> &str {
        &self.0[..4]
    }

    pub fn session_equivalent(&self, other: &ClassCode) -> bool {
        self.session_key() == other.session_key()
    }

    /// Decoded attributes. Infallible once parsed.
    pub fn schedule(&self) -> ClassSchedule {
        decode(&self.0).unwrap_or_else(|_| unreachable!("code validated at parse"))
    }
}

impl fmt::Display for ClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ClassCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Attributes encoded by one class code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSchedule {
    pub course: &'static str,
    pub level: &'static str,
    pub days: &'static str,
    pub time: &'static str,
    pub session: u8,
}

/// Decode failure. Malformed or unknown codes are never session-equivalent
/// to anything and classify as invalid wherever a roster lookup happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnknownCode {
    #[error("class code '{0}' must be exactly five digits")]
    Malformed(String),
    #[error("class code '{code}' has no {field} entry for digit '{digit}'")]
    Vocabulary {
        code: String,
        field: &'static str,
        digit: char,
    },
}

/// Decode a raw 5-character code into its attributes.
pub fn decode(code: &str) -> Result<ClassSchedule, UnknownCode> {
    let digits: Vec<char> = code.chars().collect();
    if digits.len() != 5 || !digits.iter().all(|digit| digit.is_ascii_digit()) {
        return Err(UnknownCode::Malformed(code.to_string()));
    }

    let lookup = |field: &'static str, digit: char, value: Option<&'static str>| {
        value.ok_or(UnknownCode::Vocabulary {
            code: code.to_string(),
            field,
            digit,
        })
    };

    Ok(ClassSchedule {
        course: lookup("course", digits[0], course(digits[0]))?,
        level: lookup("level", digits[1], level(digits[1]))?,
        days: lookup("days", digits[2], days(digits[2]))?,
        time: lookup("time", digits[3], time(digits[3]))?,
        session: digits[4] as u8 - b'0',
    })
}

/// Session equivalence over raw, possibly unvalidated code strings. Anything
/// that is not exactly five characters cannot be session-equivalent.
pub fn session_equivalent_raw(a: &str, b: &str) -> bool {
    if a.chars().count() != 5 || b.chars().count() != 5 {
        return false;
    }
    match (a.get(..4), b.get(..4)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

fn course(digit: char) -> Option<&'static str> {
    Some(match digit {
        '1' => "Java",
        '2' => "Python",
        '3' => "Scratch",
        '4' => "Web Development",
        '5' => "Machine Learning",
        '6' => "JavaScript",
        '7' => "C",
        '8' => "iOS App Development",
        _ => return None,
    })
}

fn level(digit: char) -> Option<&'static str> {
    Some(match digit {
        '1' => "Beginner",
        '2' => "Intermediate",
        '3' => "Advanced",
        '4' => "Games",
        _ => return None,
    })
}

fn days(digit: char) -> Option<&'static str> {
    Some(match digit {
        '1' => "Mon & Wed",
        '2' => "Tue & Thur",
        '3' => "Wed & Sat",
        '4' => "Thur & Sun",
        _ => return None,
    })
}

fn time(digit: char) -> Option<&'static str> {
    Some(match digit {
        '1' => "12-1 PM Pacific Time",
        '2' => "2-3 PM Pacific Time",
        '3' => "3-4 PM Pacific Time",
        '4' => "4-5 PM Pacific Time",
        '5' => "5-6 PM Pacific Time",
        '6' => "6-7 PM Pacific Time",
        '7' => "7-8 PM Pacific Time",
        '8' => "8-9 PM Pacific Time",
        '9' => "9-10 PM Pacific Time",
        _ => return None,
    })
}
