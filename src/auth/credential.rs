use std::fmt;
use std::path::PathBuf;

/// How a call authenticates: either a ready bearer token, or a named profile
/// that the token provider turns into one.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    BearerToken(String),
    Profile {
        id: String,
        /// profile store location, provider default when absent
        location: Option<PathBuf>,
        /// ask the provider to durably store the token it hands out
        persist: bool,
    },
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Credential::BearerToken(token.into())
    }

    pub fn profile(id: impl Into<String>) -> Self {
        Credential::Profile {
            id: id.into(),
            location: None,
            persist: false,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Credential::BearerToken(_) => "token",
            Credential::Profile { .. } => "profile",
        }
    }
}

// tokens never end up in logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::BearerToken(_) => f.write_str("BearerToken(***)"),
            Credential::Profile { id, location, persist } => f
                .debug_struct("Profile")
                .field("id", id)
                .field("location", location)
                .field("persist", persist)
                .finish(),
        }
    }
}

/// What the token provider hands back. Only `access_token` is read.
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: String,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into() }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}
