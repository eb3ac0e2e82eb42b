//! Student identity: models, date-of-birth handling, verified token claims,
//! and the resolver that pre-fills the personal form.

pub mod claims;
pub mod dob;
pub mod model;
pub mod resolver;

pub use claims::{ClaimsVerifier, TokenClaims};
pub use model::{Identity, STUDENT_ROLE, UserRecord};
pub use resolver::{IdentitySource, ProfileResolver, ResolvedProfile};
