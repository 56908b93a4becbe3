//! The builtin decorator set.
//!
//! Registered once at process start (see `Registries::builtin`). Tests
//! and the interpolation scanner rely on these exact schemas; changing a
//! parameter here is a breaking change for every Opal script.

use crate::descriptor::{
    BlockRequirement, DecoratorDescriptor, ParamSchema, ParamType, RedirectMode, TypeSchema,
};
use crate::registry::{DecoratorRegistry, TypeRegistry};

/// Build the builtin decorator registry.
pub fn builtin_decorators() -> DecoratorRegistry {
    let mut registry = DecoratorRegistry::new();
    register_value_decorators(&mut registry);
    register_wrappers(&mut registry);
    register_io_decorators(&mut registry);
    registry
}

/// Value decorators: produce a value, usable in expressions and strings.
fn register_value_decorators(registry: &mut DecoratorRegistry) {
    registry.register(
        DecoratorDescriptor::new("env", "Reads an environment variable")
            .provider()
            .with_primary("property")
            .with_param(
                ParamSchema::new("property", ParamType::String)
                    .required()
                    .with_length(1, 256)
                    .with_example("HOME"),
            )
            .with_param(ParamSchema::new("default", ParamType::String)),
    );

    registry.register(
        DecoratorDescriptor::new("var", "Reads a plan variable")
            .provider()
            .with_primary("property")
            .with_param(
                ParamSchema::new("property", ParamType::String)
                    .required()
                    .with_format("identifier")
                    .with_example("username"),
            )
            .with_param(ParamSchema::new("default", ParamType::String)),
    );
}

/// Wrapper decorators: govern a `{ … }` block.
fn register_wrappers(registry: &mut DecoratorRegistry) {
    registry.register(
        DecoratorDescriptor::new("retry", "Retries the block on failure")
            .wrapper()
            .with_block(BlockRequirement::Required)
            .with_param(
                ParamSchema::new("times", ParamType::Int)
                    .required()
                    .with_range(1.0, 100.0)
                    .with_example("3"),
            )
            .with_param(ParamSchema::new("delay", ParamType::Duration).with_example("2s"))
            .with_param(
                ParamSchema::new("strategy", ParamType::Enum)
                    .with_values(&["linear", "exponential"])
                    .with_deprecated_value("backoff", "exponential"),
            )
            .with_deprecated_param("attempts", "times"),
    );

    registry.register(
        DecoratorDescriptor::new("timeout", "Aborts the block after a duration")
            .wrapper()
            .with_block(BlockRequirement::Required)
            .with_primary("duration")
            .with_param(
                ParamSchema::new("duration", ParamType::Duration)
                    .required()
                    .with_example("30s"),
            ),
    );

    registry.register(
        DecoratorDescriptor::new("parallel", "Runs block statements concurrently")
            .wrapper()
            .with_block(BlockRequirement::Optional)
            .with_param(ParamSchema::new("max", ParamType::Int).with_min(1.0)),
    );

    registry.register(
        DecoratorDescriptor::new("log", "Structured logging sink")
            .wrapper()
            .with_io(true, false)
            .with_param(
                ParamSchema::new("level", ParamType::Enum)
                    .with_values(&["debug", "info", "warn", "error"]),
            )
            .with_param(ParamSchema::new(
                "format",
                ParamType::Object {
                    fields: vec![
                        ParamSchema::new("timestamp", ParamType::Bool),
                        ParamSchema::new("color", ParamType::Bool),
                    ],
                    additional_allowed: false,
                },
            )),
    );
}

/// Decorators that sit on pipes and redirects.
fn register_io_decorators(registry: &mut DecoratorRegistry) {
    registry.register(
        DecoratorDescriptor::new("shell", "Runs a shell command")
            .provider()
            .with_io(true, true)
            .with_primary("command")
            .with_param(
                ParamSchema::new("command", ParamType::String)
                    .required()
                    .with_length(1, 4096),
            ),
    );

    registry.register(
        DecoratorDescriptor::new("http.get", "Fetches a URL")
            .provider()
            .with_io(false, true)
            .with_primary("url")
            .with_param(
                ParamSchema::new("url", ParamType::String)
                    .required()
                    .with_format("uri")
                    .with_example("https://example.com"),
            ),
    );

    registry.register(
        DecoratorDescriptor::new("file", "Reads or writes a file")
            .provider()
            .with_file_io(true, true, true)
            .with_primary("path")
            .with_param(
                ParamSchema::new("path", ParamType::String)
                    .required()
                    .with_length(1, 4096),
            ),
    );
}

/// Build the builtin type registry (the older schema-level store).
pub fn builtin_types() -> TypeRegistry {
    let mut registry = TypeRegistry::new();

    // Secrets sink: append-only plus input, never overwrite.
    registry.register(
        TypeSchema::new("secrets")
            .with_primary("vault")
            .with_param(ParamSchema::new("vault", ParamType::String).required())
            .with_redirect(&[RedirectMode::Append, RedirectMode::Input]),
    );

    registry
}
