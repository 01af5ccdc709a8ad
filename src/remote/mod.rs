//! Talking to the reading-list service.
//!
//! - `transport` - HTTP requests, with redirect responses surfaced as errors
//! - `session` - Cookie-based session acquisition via the login redirect

mod session;
mod transport;

pub use session::{
    session_cookie, AuthError, Credentials, Session, SessionManager, SESSION_COOKIE_NAMES,
};
pub use transport::{HttpResponse, HttpTransport, TransportError};
