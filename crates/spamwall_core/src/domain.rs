//! crates/spamwall_core/src/domain.rs
//!
//! Defines the pure, core data structures for the client.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Session Types
//=========================================================================================

/// An opaque bearer token proving an authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for persisting and for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Renders the value of an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

// Represents the signed-in user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unverified,
    Verifying,
    Valid,
    Invalid,
}

/// A snapshot of the authentication session.
///
/// `user` is present exactly when `status` is `Valid`; the constructors are the
/// only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: Option<UserIdentity>,
    status: SessionStatus,
}

impl Session {
    pub fn unverified() -> Self {
        Self {
            user: None,
            status: SessionStatus::Unverified,
        }
    }

    pub fn verifying() -> Self {
        Self {
            user: None,
            status: SessionStatus::Verifying,
        }
    }

    pub fn valid(user: UserIdentity) -> Self {
        Self {
            user: Some(user),
            status: SessionStatus::Valid,
        }
    }

    pub fn invalid() -> Self {
        Self {
            user: None,
            status: SessionStatus::Invalid,
        }
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Valid
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::unverified()
    }
}

//=========================================================================================
// History Types
//=========================================================================================

/// A single past analysis, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub text: String,
    pub is_spam: bool,
    pub timestamp: String,
}

impl HistoryItem {
    pub fn new(text: impl Into<String>, is_spam: bool, timestamp: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_spam,
            timestamp: timestamp.into(),
        }
    }

    /// Parses the backend timestamp. Naive timestamps are taken as UTC.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn display_timestamp(&self) -> String {
        match self.recorded_at() {
            Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "Unknown time".to_string(),
        }
    }

    /// The text cut to `max_chars` characters, with an ellipsis when truncated.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }

    pub fn label(&self) -> &'static str {
        if self.is_spam {
            "Spam"
        } else {
            "Ham"
        }
    }
}

/// Which classification a history view keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterType {
    #[default]
    All,
    Spam,
    Ham,
}

impl FilterType {
    pub fn matches(self, item: &HistoryItem) -> bool {
        match self {
            FilterType::All => true,
            FilterType::Spam => item.is_spam,
            FilterType::Ham => !item.is_spam,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::All => "all",
            FilterType::Spam => "spam",
            FilterType::Ham => "ham",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterType::All),
            "spam" => Ok(FilterType::Spam),
            "ham" => Ok(FilterType::Ham),
            other => Err(format!("'{}' is not one of all, spam, ham", other)),
        }
    }
}

/// Identifies one derived view of the history list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ViewKey {
    pub filter: FilterType,
    pub query: String,
}

impl ViewKey {
    pub fn new(filter: FilterType, query: impl Into<String>) -> Self {
        Self {
            filter,
            query: query.into(),
        }
    }
}

/// Per-filter totals over the raw history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterCounts {
    pub all: usize,
    pub spam: usize,
    pub ham: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("secret-token");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert_eq!(credential.bearer(), "Bearer secret-token");
    }

    #[test]
    fn only_valid_sessions_carry_a_user() {
        let user = UserIdentity {
            id: 7,
            email: "a@b.co".to_string(),
        };
        assert_eq!(Session::valid(user.clone()).user(), Some(&user));
        assert!(Session::invalid().user().is_none());
        assert!(Session::verifying().user().is_none());
        assert_eq!(Session::default().status(), SessionStatus::Unverified);
    }

    #[test]
    fn timestamps_parse_with_and_without_offset() {
        let iso = HistoryItem::new("x", false, "2024-03-01T12:30:00.123456");
        assert_eq!(iso.display_timestamp(), "2024-03-01 12:30:00");

        let rfc = HistoryItem::new("x", false, "2024-03-01T12:30:00+02:00");
        assert_eq!(rfc.display_timestamp(), "2024-03-01 10:30:00");

        let junk = HistoryItem::new("x", false, "yesterday");
        assert_eq!(junk.display_timestamp(), "Unknown time");
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let item = HistoryItem::new("héllo wörld", true, "");
        assert_eq!(item.preview(5), "héllo...");
        assert_eq!(item.preview(50), "héllo wörld");
        assert_eq!(item.label(), "Spam");
    }

    #[test]
    fn filter_type_parses_case_insensitively() {
        assert_eq!("SPAM".parse::<FilterType>(), Ok(FilterType::Spam));
        assert_eq!(" ham ".parse::<FilterType>(), Ok(FilterType::Ham));
        assert!("junk".parse::<FilterType>().is_err());
        assert_eq!(FilterType::default().to_string(), "all");
    }
}
