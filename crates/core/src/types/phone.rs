//! Donor phone numbers.
//!
//! Stored verbatim as entered (trimmed). Contact links are derived from the
//! digits.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits, `+`, spaces, `-`, `(`, `)`.
    #[error("phone number contains invalid character '{0}'")]
    InvalidCharacter(char),
    /// `+` is only allowed as the first character.
    #[error("'+' may only appear at the start of a phone number")]
    MisplacedPlus,
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    DigitCount {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number as entered on the add-donor form.
///
/// ```
/// use donor_finder_core::Phone;
///
/// let phone = Phone::parse("+91 12345-67890").unwrap();
/// assert_eq!(phone.as_str(), "+91 12345-67890");
/// assert_eq!(phone.tel_href(), "tel:+911234567890");
/// assert_eq!(phone.chat_href(), "https://wa.me/911234567890");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits (short national numbers).
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, contains characters
    /// other than digits, a leading `+`, spaces, `-`, `(` and `)`, or has a
    /// digit count outside 7..=15.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let mut digits = 0;
        for (i, c) in s.char_indices() {
            match c {
                '0'..='9' => digits += 1,
                '+' if i == 0 => {}
                '+' => return Err(PhoneError::MisplacedPlus),
                ' ' | '-' | '(' | ')' => {}
                other => return Err(PhoneError::InvalidCharacter(other)),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            return Err(PhoneError::DigitCount {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `tel:` link for the call action.
    #[must_use]
    pub fn tel_href(&self) -> String {
        tel_href(&self.0)
    }

    /// Messaging link for the chat action.
    #[must_use]
    pub fn chat_href(&self) -> String {
        chat_href(&self.0)
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a `tel:` link from a raw stored phone value.
///
/// Stored records are not guaranteed to have passed [`Phone::parse`], so this
/// works on any string: it keeps a leading `+` and the digits.
#[must_use]
pub fn tel_href(raw: &str) -> String {
    let raw = raw.trim();
    let plus = if raw.starts_with('+') { "+" } else { "" };
    format!("tel:{plus}{}", digits_of(raw))
}

/// Build a `wa.me` chat link from a raw stored phone value (digits only).
#[must_use]
pub fn chat_href(raw: &str) -> String {
    format!("https://wa.me/{}", digits_of(raw))
}

fn digits_of(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
