//! Request and response shapes of the vendor portal

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};
use t2o_core::{ApiError, Gate, GateId};

pub const LOGIN_PATH: &str = "/portal/login";
pub const GATE_LIST_PATH: &str = "/portal/gate-info/full/lockout-time";
pub const OPEN_GATE_PATH: &str = "/portal/open-gate";

/// Header carrying the login token on authenticated calls
pub const LOGIN_TOKEN_HEADER: &str = "X-T2O-Login-Token";

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "JSESSIONID";

/// Chaff is at most this many characters long
const MAX_CHAFF_LEN: usize = 15;

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub chaff: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub role: String,
    pub login_token: String,
    #[serde(default)]
    pub supervisor: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GateListResponse {
    pub gates: Vec<Gate>,
}

#[derive(Serialize)]
pub(crate) struct OpenGateRequest {
    pub gate_id: GateId,
}

/// Random printable ASCII of length 0 to 15
///
/// Varies the login body size between calls; carries no meaning.
pub fn generate_chaff() -> String {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(0..=MAX_CHAFF_LEN);
    (0..len).map(|_| char::from(rng.gen_range(b' '..=b'~'))).collect()
}

fn session_cookie_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"JSESSIONID=([^;]+)").expect("valid session cookie regex"))
}

/// Extract the `JSESSIONID` value from the `Set-Cookie` headers of a response
pub fn extract_session_cookie(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            session_cookie_pattern()
                .captures(value)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .ok_or_else(|| {
            ApiError::Protocol(format!(
                "failed to extract {} from Set-Cookie header",
                SESSION_COOKIE
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_chaff_is_short_printable_ascii() {
        for _ in 0..500 {
            let chaff = generate_chaff();
            assert!(chaff.len() <= MAX_CHAFF_LEN);
            assert!(chaff.bytes().all(|b| (32..=126).contains(&b)));
        }
    }

    #[test]
    fn test_chaff_varies() {
        let samples: std::collections::HashSet<String> = (0..50).map(|_| generate_chaff()).collect();
        assert!(samples.len() > 1);
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_static("JSESSIONID=xyz123; Path=/"));
        assert_eq!(extract_session_cookie(&headers).unwrap(), "xyz123");
    }

    #[test]
    fn test_extract_cookie_without_attributes() {
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_static("JSESSIONID=abc"));
        assert_eq!(extract_session_cookie(&headers).unwrap(), "abc");
    }

    #[test]
    fn test_extract_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("AWSALB=lb; Path=/"));
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("JSESSIONID=S3SS10N; Path=/portal; HttpOnly"),
        );
        assert_eq!(extract_session_cookie(&headers).unwrap(), "S3SS10N");
    }

    #[test]
    fn test_missing_cookie_is_protocol_violation() {
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_static("OTHER=1; Path=/"));
        assert!(matches!(
            extract_session_cookie(&headers),
            Err(ApiError::Protocol(_))
        ));

        assert!(matches!(
            extract_session_cookie(&HeaderMap::new()),
            Err(ApiError::Protocol(_))
        ));
    }
}
