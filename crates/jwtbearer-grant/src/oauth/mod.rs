//! OAuth 2.0 token endpoint plumbing.
//!
//! - [`request`] - the access request passed through both phases
//! - [`response`] - the token response
//! - [`session`] - sessions and the subject capability
//! - [`endpoint`] - handler trait and dispatcher

pub mod endpoint;
pub mod request;
pub mod response;
pub mod session;

pub use endpoint::{TokenEndpoint, TokenEndpointHandler};
pub use request::AccessRequest;
pub use response::AccessResponse;
pub use session::{DefaultSession, JwtBearerSession, Session, SubjectSession};
