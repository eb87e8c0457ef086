//! Authenticated session client for the Tap2Open portal
//!
//! Wire protocol:
//! 1. POST /portal/login - JSON `{username, password, chaff}`, session
//!    cookie returned in `Set-Cookie: JSESSIONID=...`
//! 2. GET /portal/gate-info/full/lockout-time?<timestamp> - `{gates: [...]}`
//! 3. POST /portal/open-gate - JSON `{gate_id}`
//!
//! Authenticated calls carry `X-T2O-Login-Token` and `Cookie: JSESSIONID=...`.

mod session;
mod wire;

pub use session::{ErrorReceiver, SessionClient, DEFAULT_TOKEN_TTL};
pub use wire::{
    extract_session_cookie, generate_chaff, GATE_LIST_PATH, LOGIN_PATH, LOGIN_TOKEN_HEADER,
    OPEN_GATE_PATH, SESSION_COOKIE,
};
