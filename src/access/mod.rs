//! Access control: a consumer -> method-pattern policy and the layer that
//! enforces it.
//!
//! A consumer missing from the policy is denied everything. Patterns use
//! `*` as a wildcard and match anywhere inside the method name.

pub mod layer;
pub mod pattern;
pub mod policy;

pub use layer::AccessControl;
pub use pattern::MethodPattern;
pub use policy::AccessPolicy;
