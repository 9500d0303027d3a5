//! Peer and join-target parsing

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::{AppError, Result};

/// A chat reference as accepted by the HTTP API: a numeric id or a username
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeerRef {
    Id(i64),
    Username(String),
}

impl PeerRef {
    /// Parse a path segment. Integers are ids; anything else is a username.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::InvalidRequest("Chat identifier cannot be empty".to_string()));
        }

        if let Ok(id) = raw.parse::<i64>() {
            return Ok(PeerRef::Id(id));
        }

        let username = raw.trim_start_matches('@');
        if username.is_empty() || username.chars().any(char::is_whitespace) {
            return Err(AppError::InvalidRequest(format!(
                "Invalid chat identifier: '{}'",
                raw
            )));
        }

        Ok(PeerRef::Username(username.to_string()))
    }
}

impl fmt::Display for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerRef::Id(id) => write!(f, "{}", id),
            PeerRef::Username(name) => write!(f, "@{}", name),
        }
    }
}

/// Chat target in a JSON body: `123`, `"123"` or `"@name"`
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ChatTarget {
    Id(i64),
    Handle(String),
}

impl ChatTarget {
    pub fn to_peer(&self) -> Result<PeerRef> {
        match self {
            ChatTarget::Id(id) => Ok(PeerRef::Id(*id)),
            ChatTarget::Handle(handle) => PeerRef::parse(handle),
        }
    }
}

/// What a join request points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    /// Private invite link, carrying the invite hash
    Invite(String),
    /// Public chat by username
    Username(String),
}

const LINK_HOSTS: &[&str] = &["t.me/", "telegram.me/", "telegram.dog/"];

impl JoinTarget {
    /// Parse an invite link (`t.me/+HASH`, `t.me/joinchat/HASH`) or a public
    /// handle (`@name`, `t.me/name`, `name`).
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::InvalidRequest("Invite link cannot be empty".to_string()));
        }

        let without_scheme = raw
            .strip_prefix("https://")
            .or_else(|| raw.strip_prefix("http://"))
            .unwrap_or(raw);
        let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);

        let path = LINK_HOSTS
            .iter()
            .find_map(|host| without_www.strip_prefix(host));

        let target = match path {
            Some(path) => {
                let path = path.split(['?', '#']).next().unwrap_or_default();
                let mut segments = path.split('/').filter(|segment| !segment.is_empty());
                let first = segments.next().unwrap_or_default();

                if let Some(hash) = first.strip_prefix('+') {
                    JoinTarget::Invite(hash.to_string())
                } else if first == "joinchat" {
                    // `joinchat/HASH`; a missing hash fails validation below
                    JoinTarget::Invite(segments.next().unwrap_or_default().to_string())
                } else {
                    JoinTarget::Username(first.to_string())
                }
            }
            None => JoinTarget::Username(raw.trim_start_matches('@').to_string()),
        };

        match &target {
            JoinTarget::Invite(hash) if !is_valid_invite_hash(hash) => Err(AppError::InvalidRequest(
                format!("Invalid invite link: '{}'", raw),
            )),
            JoinTarget::Username(name) if !is_valid_username(name) => Err(AppError::InvalidRequest(
                format!("Invalid invite link or username: '{}'", raw),
            )),
            _ => Ok(target),
        }
    }
}

fn is_valid_invite_hash(hash: &str) -> bool {
    !hash.is_empty()
        && hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_valid_username(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
