//! Platform-qualified user identifiers (`{platform}-{id}`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TELEGRAM: &str = "telegram";

const SEPARATOR: char = '-';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserKeyError {
    #[error("invalid user ID: expected non empty string")]
    EmptyUserId,
    #[error("invalid platform user ID '{0}': expected '{{platform}}-{{userId}}'")]
    Malformed(String),
    #[error("user ID '{0}' is not numeric")]
    NotNumeric(String),
}

/// Identifies one user across platforms, e.g. `telegram-123456`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserKey {
    platform: String,
    user_id: String,
}

impl UserKey {
    pub fn new(platform: &str, user_id: &str) -> Result<Self, UserKeyError> {
        if user_id.is_empty() {
            return Err(UserKeyError::EmptyUserId);
        }
        if platform.is_empty() || platform.contains(SEPARATOR) {
            return Err(UserKeyError::Malformed(format!("{platform}{SEPARATOR}{user_id}")));
        }
        Ok(Self {
            platform: platform.to_string(),
            user_id: user_id.to_string(),
        })
    }

    /// Key for a Telegram user id given as text.
    pub fn telegram(user_id: &str) -> Result<Self, UserKeyError> {
        Self::new(TELEGRAM, user_id)
    }

    pub fn from_telegram_id(user_id: u64) -> Self {
        Self {
            platform: TELEGRAM.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Numeric chat id the transport delivers to.
    pub fn recipient_id(&self) -> Result<i64, UserKeyError> {
        self.user_id
            .parse()
            .map_err(|_| UserKeyError::NotNumeric(self.user_id.clone()))
    }
}

impl FromStr for UserKey {
    type Err = UserKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(SEPARATOR) {
            Some((platform, user_id)) if !platform.is_empty() && !user_id.is_empty() => {
                Ok(Self {
                    platform: platform.to_string(),
                    user_id: user_id.to_string(),
                })
            }
            _ => Err(UserKeyError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for UserKey {
    type Error = UserKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserKey> for String {
    fn from(key: UserKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.platform, SEPARATOR, self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_key() {
        let key = UserKey::telegram("123").unwrap();
        assert_eq!(key.to_string(), "telegram-123");
    }

    #[test]
    fn test_telegram_key_empty() {
        assert_eq!(UserKey::telegram(""), Err(UserKeyError::EmptyUserId));
    }

    #[test]
    fn test_parse_valid() {
        let key: UserKey = "telegram-123456".parse().unwrap();
        assert_eq!(key.platform(), "telegram");
        assert_eq!(key.user_id(), "123456");
    }

    #[test]
    fn test_parse_without_separator() {
        let err = "123456".parse::<UserKey>().unwrap_err();
        assert!(matches!(err, UserKeyError::Malformed(_)));
    }

    #[test]
    fn test_parse_empty_halves() {
        assert!("-123".parse::<UserKey>().is_err());
        assert!("telegram-".parse::<UserKey>().is_err());
        assert!("".parse::<UserKey>().is_err());
    }

    #[test]
    fn test_round_trip() {
        for raw in ["telegram-1", "telegram-987654321", "discord-abc", "web-a-b-c"] {
            let key: UserKey = raw.parse().unwrap();
            assert_eq!(key.to_string(), raw);
        }
    }

    #[test]
    fn test_recipient_id() {
        let key = UserKey::from_telegram_id(42);
        assert_eq!(key.recipient_id(), Ok(42));

        let key: UserKey = "telegram-abc".parse().unwrap();
        assert!(matches!(key.recipient_id(), Err(UserKeyError::NotNumeric(_))));
    }

    #[test]
    fn test_serde_as_string() {
        let key = UserKey::from_telegram_id(7);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""telegram-7""#);
        let back: UserKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
