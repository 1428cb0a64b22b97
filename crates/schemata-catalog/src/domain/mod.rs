//! Domains: compiled aggregates of references to other catalog objects.

pub mod compiler;
pub mod registry;
pub mod resource;

pub use compiler::DomainCompiler;
pub use registry::DomainRegistry;
pub use resource::{DomainLinks, DomainResource};
