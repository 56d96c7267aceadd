//! Authorization: who the caller is, what they may do, which rows they see
//! and which fields they may read or write.

mod evaluator;
mod policy;
pub mod predicates;
mod principal;
mod scope;
pub mod visibility;

pub use evaluator::{DefaultPolicyEvaluator, PolicyEvaluator};
pub use policy::{Action, PolicyTable, Resource, Rule};
pub use principal::{Principal, ResourceContext};
pub use scope::Scope;
