//! Security for ProdOps: input screening, bearer tokens, and role checks.
//!
//! Provides:
//! - **Safety filter**: denylist scan, then a model-delegated check, before
//!   any input reaches classification
//! - **Tokens**: HS256 JWT bearer tokens carrying the user's roles
//! - **Authorization**: role gates for administrative operations

pub mod authz;
pub mod safety;
pub mod token;

pub use authz::require_any_role;
pub use safety::{SafetyFilter, Verdict};
pub use token::{TokenClaims, TokenSigner};
