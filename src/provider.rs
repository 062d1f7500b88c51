//! The closed set of third-party account providers.
//!
//! Everything that differs between providers at the OAuth level (scopes,
//! grant type, placeholder ids) hangs off [`Provider`] so the connector and
//! the UI can stay provider-agnostic.

use std::fmt;

/// A third-party account source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Facebook,
    Instagram,
}

/// How the provider hands the grant back on the redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Implicit flow: a bearer token arrives directly.
    Token,
    /// Authorization-code flow: the code still has to be exchanged.
    Code,
}

impl ResponseType {
    /// Value of the `response_type` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Token => "token",
            ResponseType::Code => "code",
        }
    }
}

impl Provider {
    /// Human-readable name, also the default account name.
    pub fn label(self) -> &'static str {
        match self {
            Provider::Facebook => "Facebook",
            Provider::Instagram => "Instagram",
        }
    }

    /// Permission scopes requested during authorization.
    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            Provider::Facebook => &["public_profile", "email", "user_posts"],
            Provider::Instagram => &["user_profile", "user_media"],
        }
    }

    pub fn response_type(self) -> ResponseType {
        match self {
            Provider::Facebook => ResponseType::Token,
            Provider::Instagram => ResponseType::Code,
        }
    }

    /// What the provider calls the application identifier.
    pub fn client_id_label(self) -> &'static str {
        match self {
            Provider::Facebook => "App ID",
            Provider::Instagram => "Client ID",
        }
    }

    /// The value shipped in sample configs before a real id is filled in.
    pub fn placeholder_client_id(self) -> &'static str {
        match self {
            Provider::Facebook => "YOUR_FACEBOOK_APP_ID",
            Provider::Instagram => "YOUR_INSTAGRAM_CLIENT_ID",
        }
    }

    /// Message used for items that carry no text of their own.
    pub fn default_message(self) -> &'static str {
        match self {
            Provider::Facebook => "Shared a post",
            Provider::Instagram => "Shared a photo",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
