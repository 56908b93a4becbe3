use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::builtins;
use crate::descriptor::{
    BlockRequirement, DecoratorDescriptor, FileIoCapability, IoCapability, ParamSchema,
    RedirectCapability, TypeSchema,
};

/// Registry of decorator descriptors keyed by their (possibly dotted) name.
#[derive(Debug, Default)]
pub struct DecoratorRegistry {
    entries: FxHashMap<String, DecoratorDescriptor>,
}

impl DecoratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its declared name. Last write wins.
    pub fn register(&mut self, descriptor: DecoratorDescriptor) {
        self.entries.insert(descriptor.name.clone(), descriptor);
    }

    pub fn lookup(&self, name: &str) -> Option<&DecoratorDescriptor> {
        self.entries.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether `name` is registered as a value decorator (Provider role).
    /// The interpolation scanner uses this to tell `@env` apart from
    /// literal `@` text.
    pub fn is_value_decorator(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|d| d.roles.provider)
    }
}

/// The older schema-level registry, consulted as a fallback.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    schemas: FxHashMap<String, TypeSchema>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: TypeSchema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    pub fn get_schema(&self, name: &str) -> Option<&TypeSchema> {
        self.schemas.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }
}

/// One registered decorator as seen by the parser, regardless of which
/// registry it came from.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedDecorator<'a> {
    pub name: &'a str,
    pub primary_param: Option<&'a str>,
    pub params: &'a [ParamSchema],
    pub block: BlockRequirement,
    pub io: Option<IoCapability>,
    pub file_io: Option<FileIoCapability>,
    pub redirect: Option<&'a RedirectCapability>,
    pub deprecated_params: &'a FxHashMap<String, String>,
    pub is_provider: bool,
}

impl<'a> ResolvedDecorator<'a> {
    pub fn param(&self, name: &str) -> Option<&'a ParamSchema> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Required parameters in declaration order, then optional parameters
    /// in declaration order. This is the positional binding order.
    pub fn positional_order(&self) -> Vec<&'a ParamSchema> {
        let mut order: Vec<&ParamSchema> = self.params.iter().filter(|p| p.required).collect();
        order.extend(self.params.iter().filter(|p| !p.required));
        order
    }

    /// Map a parameter name through the deprecation table. Returns the
    /// canonical name and whether remapping happened.
    pub fn canonical_param_name(&self, name: &str) -> (String, bool) {
        match self.deprecated_params.get(name) {
            Some(new) => (new.clone(), true),
            None => (name.to_string(), false),
        }
    }
}

/// Shared read-only handles to both registries.
///
/// Initialized once at process start (or per test) and then frozen;
/// concurrent parses only read.
#[derive(Debug, Clone, Copy)]
pub struct Registries<'a> {
    pub decorators: &'a DecoratorRegistry,
    pub types: &'a TypeRegistry,
}

impl<'a> Registries<'a> {
    pub fn new(decorators: &'a DecoratorRegistry, types: &'a TypeRegistry) -> Self {
        Self { decorators, types }
    }

    /// The process-wide builtin set, frozen on first use.
    pub fn builtin() -> Registries<'static> {
        static DECORATORS: OnceLock<DecoratorRegistry> = OnceLock::new();
        static TYPES: OnceLock<TypeRegistry> = OnceLock::new();
        Registries {
            decorators: DECORATORS.get_or_init(builtins::builtin_decorators),
            types: TYPES.get_or_init(builtins::builtin_types),
        }
    }

    /// Whether `name` is registered in either registry.
    pub fn is_registered(&self, name: &str) -> bool {
        self.decorators.is_registered(name) || self.types.is_registered(name)
    }

    /// Resolve a decorator name, preferring the decorator registry and
    /// falling back to the type registry.
    pub fn resolve(&self, name: &str) -> Option<ResolvedDecorator<'a>> {
        if let Some(desc) = self.decorators.lookup(name) {
            return Some(ResolvedDecorator {
                name: &desc.name,
                primary_param: desc.primary_param.as_deref(),
                params: &desc.params,
                block: desc.block,
                io: desc.io,
                file_io: desc.file_io,
                redirect: None,
                deprecated_params: &desc.deprecated_params,
                is_provider: desc.roles.provider,
            });
        }
        self.types.get_schema(name).map(|schema| ResolvedDecorator {
            name: &schema.name,
            primary_param: schema.primary_param.as_deref(),
            params: &schema.params,
            block: schema.block,
            io: schema.io,
            file_io: None,
            redirect: schema.redirect.as_ref(),
            deprecated_params: &schema.deprecated_params,
            is_provider: false,
        })
    }
}
