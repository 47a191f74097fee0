use std::fmt;

use cookie::{Cookie, CookieJar, Key, SameSite};
use log::warn;

pub const COOKIE_NAME: &str = "session";
pub const SECRET_MIN_LEN: usize = 32;

const LOGGED_IN: &str = "logged_in";

/// Signs and checks the session cookie.
pub struct Sessions {
    key: Key,
    secure: bool,
}

/// The per-request view of a session cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub logged_in: bool,
}

/// A cookie to hand back to the client, via `Set-Cookie`.
#[derive(Debug, Clone)]
pub struct SessionToken(Cookie<'static>);

impl Sessions {
    /// `secret`: when absent a random key is used, so sessions won't survive
    /// a restart.
    pub fn new(secret: Option<&str>, secure: bool) -> Result<Self, String> {
        let key = match secret {
            Some(secret) if secret.len() < SECRET_MIN_LEN => {
                return Err(format!(
                    "session secret must be at least {SECRET_MIN_LEN} bytes, got {}",
                    secret.len()
                ));
            }
            Some(secret) => Key::derive_from(secret.as_bytes()),
            None => {
                warn!("no session secret configured, generating one - sessions end on restart");
                Key::generate()
            }
        };

        Ok(Self { key, secure })
    }

    pub fn issue(&self) -> SessionToken {
        let cookie = Cookie::build((COOKIE_NAME, LOGGED_IN))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure);

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(cookie);

        // the jar now holds the signed copy
        let signed = jar
            .get(COOKIE_NAME)
            .cloned()
            .unwrap_or_else(|| Cookie::new(COOKIE_NAME, ""));

        SessionToken(signed)
    }

    pub fn validate(&self, cookie_value: Option<&str>) -> Session {
        // logged out clients send back an empty cookie
        let Some(value) = cookie_value.filter(|value| !value.is_empty()) else {
            return Session::default();
        };

        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new(COOKIE_NAME, value.to_owned()));

        let logged_in = jar
            .signed(&self.key)
            .get(COOKIE_NAME)
            .map_or(false, |cookie| cookie.value() == LOGGED_IN);

        if !logged_in {
            warn!("rejecting session cookie with a bad signature");
        }

        Session { logged_in }
    }

    pub fn logout(&self) -> SessionToken {
        let mut cookie = Cookie::build((COOKIE_NAME, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build();
        cookie.make_removal();

        SessionToken(cookie)
    }
}

impl SessionToken {
    /// The bare cookie value, as a client would send it back.
    #[cfg(test)]
    pub fn value(&self) -> &str {
        self.0.value()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}
