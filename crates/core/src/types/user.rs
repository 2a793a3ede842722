//! Cart owner identifier.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`UserId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UserIdError {
    /// The input is empty or only whitespace.
    #[error("user id cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("user id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains control characters.
    #[error("user id cannot contain control characters")]
    ControlCharacter,
}

/// Identifier of the user owning a cart.
///
/// There is no authentication: clients generate a synthetic identifier and
/// persist it locally, and requests without one act on the [`UserId::guest`]
/// cart.
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length: 1-128 characters after trimming
/// - No control characters
///
/// ## Examples
///
/// ```
/// use shopcart_core::UserId;
///
/// assert_eq!(UserId::parse("  user_42 ").unwrap().as_str(), "user_42");
/// assert!(UserId::parse("   ").is_err());
/// assert_eq!(UserId::guest().as_str(), "guest");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Maximum length of a user id.
    pub const MAX_LENGTH: usize = 128;

    /// The identifier used when a request carries none.
    pub const GUEST: &'static str = "guest";

    /// Parse a `UserId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than 128
    /// characters, or contains control characters.
    pub fn parse(s: &str) -> Result<Self, UserIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(UserIdError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(UserIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if trimmed.chars().any(char::is_control) {
            return Err(UserIdError::ControlCharacter);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// The guest identifier.
    #[must_use]
    pub fn guest() -> Self {
        Self(Self::GUEST.to_owned())
    }

    /// Parse an optional request value, defaulting to the guest identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but invalid.
    pub fn parse_or_guest(s: Option<&str>) -> Result<Self, UserIdError> {
        s.map_or_else(|| Ok(Self::guest()), Self::parse)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        assert_eq!(UserId::parse(" abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(UserId::parse(""), Err(UserIdError::Empty)));
        assert!(matches!(UserId::parse(" \t"), Err(UserIdError::Empty)));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "u".repeat(UserId::MAX_LENGTH + 1);
        assert!(matches!(
            UserId::parse(&long),
            Err(UserIdError::TooLong { max: 128 })
        ));
        assert!(UserId::parse(&"u".repeat(UserId::MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_parse_control_character() {
        assert!(matches!(
            UserId::parse("a\u{0}b"),
            Err(UserIdError::ControlCharacter)
        ));
    }

    #[test]
    fn test_parse_or_guest() {
        assert_eq!(UserId::parse_or_guest(None).unwrap(), UserId::guest());
        assert_eq!(
            UserId::parse_or_guest(Some("user_1")).unwrap().as_str(),
            "user_1"
        );
        assert!(UserId::parse_or_guest(Some("")).is_err());
    }
}
