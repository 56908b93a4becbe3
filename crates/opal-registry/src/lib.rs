//! Decorator and type registries for Opal.
//!
//! Decorators are the language's extension mechanism: `@env.HOME`,
//! `@retry(times=3) { … }`. Each registered decorator carries a
//! descriptor: its roles (value provider / block wrapper), parameter
//! schemas with constraints, block requirement, and I/O capabilities.
//! The parser consults these registries for name resolution, parameter
//! validation, string interpolation, and pipe/redirect checking.
//!
//! Both registries are populated at process start and frozen; parses on
//! multiple threads share them read-only.

mod builtins;
mod descriptor;
mod registry;

pub use descriptor::{
    BlockRequirement, DecoratorDescriptor, FileIoCapability, IoCapability, ParamSchema, ParamType,
    RedirectCapability, RedirectMode, Roles, TypeSchema,
};
pub use registry::{DecoratorRegistry, Registries, ResolvedDecorator, TypeRegistry};
