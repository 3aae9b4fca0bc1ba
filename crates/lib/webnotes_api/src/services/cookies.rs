//! Session cookie construction.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};

use crate::config::CookieSettings;

/// Cookie name carrying the session token.
pub const SESSION_COOKIE: &str = "session_token";

fn base(value: String, settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(settings.secure)
        .path("/")
        .build();
    if settings.same_site_none {
        cookie.set_same_site(SameSite::None);
    }
    cookie
}

/// httpOnly cookie carrying a session token for `max_age`.
pub fn session_cookie(
    token: &str,
    max_age: chrono::Duration,
    settings: &CookieSettings,
) -> Cookie<'static> {
    let mut cookie = base(token.to_string(), settings);
    cookie.set_max_age(Duration::seconds(max_age.num_seconds()));
    cookie
}

/// Empty cookie that is already expired, so the client drops it.
pub fn clear_session_cookie(settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = base(String::new(), settings);
    cookie.set_max_age(Duration::ZERO);
    cookie.set_expires(OffsetDateTime::now_utc() - Duration::hours(1));
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok", chrono::Duration::days(7), &CookieSettings::default());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), None);
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
    }

    #[test]
    fn cross_origin_pins_same_site_none() {
        let settings = CookieSettings {
            secure: true,
            same_site_none: true,
        };
        let cookie = session_cookie("tok", chrono::Duration::days(1), &settings);
        assert_eq!(cookie.same_site(), Some(SameSite::None));
    }

    #[test]
    fn cleared_cookie_is_empty_and_expired() {
        let cookie = clear_session_cookie(&CookieSettings::default());
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        let expires = cookie.expires_datetime().unwrap();
        assert!(expires < OffsetDateTime::now_utc());
    }
}
