//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod catalog;
pub mod error;
pub mod operation;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use operation::{
    ArgValue, OperationDescriptor, ParamKind, ParamSpec, ParsedArgs, Registry, ResponseShape,
};
