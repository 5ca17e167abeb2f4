use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Account role carried alongside the token. Unknown roles are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Parent,
    Child,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Parent => "parent",
            Role::Child => "child",
            Role::Other(raw) => raw,
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "parent" => Role::Parent,
            "child" => Role::Child,
            _ => Role::Other(raw),
        }
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        Role::from(raw.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::from(s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted session fields as read back from storage. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub role: Option<Role>,
}

/// Logical session state. A missing token means anonymous, whatever the role says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { token: String, role: Option<Role> },
}

/// Where the app should start after bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Parent,
    Child,
    Onboarding,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn state(&self) -> SessionState {
        match &self.token {
            Some(token) => SessionState::Authenticated {
                token: token.clone(),
                role: self.role.clone(),
            },
            None => SessionState::Anonymous,
        }
    }

    /// Route after launch: both fields are required to skip onboarding, and
    /// every role other than parent lands on the child home.
    pub fn landing(&self) -> Landing {
        match (&self.token, &self.role) {
            (Some(_), Some(Role::Parent)) => Landing::Parent,
            (Some(_), Some(_)) => Landing::Child,
            _ => Landing::Onboarding,
        }
    }
}
