//! NEAR account ID type with validation.

use std::fmt::{self, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::ParseAccountIdError;

/// A validated NEAR account identifier.
///
/// Accepted forms:
/// - Named: `alice.near`, `sub.alice.near` — lowercase `[a-z0-9_\-.]`,
///   2 to 64 characters, no leading/trailing/consecutive separators.
/// - Implicit: 64 hex characters.
/// - EVM implicit: `0x` followed by 40 hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Parse and validate an account ID.
    pub fn new(s: impl Into<String>) -> Result<Self, ParseAccountIdError> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Create without validation. Only for values that are valid by
    /// construction (e.g. NEP-616 derived account IDs).
    #[doc(hidden)]
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Parse, falling back to an unchecked value so the RPC node reports
    /// the precise validation failure instead of the client.
    pub(crate) fn parse_lenient(s: impl AsRef<str>) -> Self {
        s.as_ref()
            .parse()
            .unwrap_or_else(|_| Self(s.as_ref().to_string()))
    }

    fn validate(s: &str) -> Result<(), ParseAccountIdError> {
        if s.is_empty() {
            return Err(ParseAccountIdError::Empty);
        }
        if s.len() > 64 {
            return Err(ParseAccountIdError::TooLong(s.to_string()));
        }

        // EVM implicit account: 0x + 40 hex chars
        if let Some(rest) = s.strip_prefix("0x") {
            if s.len() != 42 {
                return Err(ParseAccountIdError::InvalidFormat(s.to_string()));
            }
            if let Some(c) = rest.chars().find(|c| !c.is_ascii_hexdigit()) {
                return Err(ParseAccountIdError::InvalidChar(s.to_string(), c));
            }
            return Ok(());
        }

        // Implicit account: exactly 64 hex chars
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(());
        }

        if s.len() < 2 {
            return Err(ParseAccountIdError::TooShort(s.to_string()));
        }

        if let Some(c) = s
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.'))
        {
            return Err(ParseAccountIdError::InvalidChar(s.to_string(), c));
        }

        if s.starts_with('.') || s.ends_with('.') || s.contains("..") {
            return Err(ParseAccountIdError::InvalidFormat(s.to_string()));
        }

        // Separators may not lead or trail a dot-separated segment.
        for segment in s.split('.') {
            if segment.is_empty()
                || segment.starts_with('-')
                || segment.ends_with('-')
                || segment.starts_with('_')
                || segment.ends_with('_')
            {
                return Err(ParseAccountIdError::InvalidFormat(s.to_string()));
            }
        }

        Ok(())
    }

    /// Check if this is an implicit account (64 hex chars).
    pub fn is_implicit(&self) -> bool {
        self.0.len() == 64 && self.0.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Check if this is an EVM implicit account (`0x` prefix).
    pub fn is_evm_implicit(&self) -> bool {
        self.0.starts_with("0x") && self.0.len() == 42
    }

    /// Check if this is a named account.
    pub fn is_named(&self) -> bool {
        !self.is_implicit() && !self.is_evm_implicit()
    }

    /// Check if this is a direct or transitive sub-account of `parent`.
    pub fn is_sub_account_of(&self, parent: &AccountId) -> bool {
        if !self.is_named() || !parent.is_named() {
            return false;
        }
        self.0.len() > parent.0.len() + 1 && self.0.ends_with(&format!(".{}", parent.0))
    }

    /// Get the parent account (`sub.alice.near` → `alice.near`).
    pub fn parent(&self) -> Option<AccountId> {
        if !self.is_named() {
            return None;
        }
        self.0.find('.').map(|i| Self(self.0[i + 1..].to_string()))
    }

    /// Get as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = ParseAccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for AccountId {
    type Error = ParseAccountIdError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = ParseAccountIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl BorshSerialize for AccountId {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&self.0, writer)
    }
}

impl BorshDeserialize for AccountId {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let s = String::deserialize_reader(reader)?;
        Self::validate(&s)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self(s))
    }
}
