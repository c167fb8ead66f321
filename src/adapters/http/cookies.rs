//! Cookie helpers over `CookieJar`.
//!
//! Jars are immutable; every helper that changes one returns the new jar, which
//! must be part of the response for the browser to see the change.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Session token issued by the hosted auth service.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

pub fn set_cookie(jar: CookieJar, name: &str, value: &str, max_age: Duration) -> CookieJar {
    let cookie = Cookie::build((name.to_owned(), value.to_owned()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build();
    jar.add(cookie)
}

pub fn get_cookie(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name).map(|cookie| cookie.value().to_owned())
}

/// Removes the cookie from the jar and emits an expired `Set-Cookie`.
pub fn delete_cookie(jar: CookieJar, name: &str) -> CookieJar {
    jar.remove(Cookie::build(name.to_owned()).path("/"))
}

pub fn has_cookie(jar: &CookieJar, name: &str) -> bool {
    jar.get(name).is_some()
}
