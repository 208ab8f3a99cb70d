//! IAM policy building blocks for the MSK constructs:
//! - statements with permissive assembly and normalized emission
//! - documents that extend an optional base document
//! - principals grouped by type, conditions grouped by operator
//!

mod condition;
mod document;
mod error;
mod principal;
mod statement;
mod value;

pub use condition::{ConditionMap, ARN_LIKE, BOOL, STRING_EQUALS, STRING_LIKE};
pub use document::{PolicyDocument, POLICY_VERSION};
pub use error::{PolicyError, PolicyResult};
pub use principal::{
    ConditionalPrincipal, PolicyPrincipal, Principal, PrincipalFragment, PrincipalMap,
    PrincipalType, ANYONE,
};
pub use statement::{Effect, PolicyStatement};
pub use value::StringValue;
