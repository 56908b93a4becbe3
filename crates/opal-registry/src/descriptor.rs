use rustc_hash::FxHashMap;

/// The declared type of a decorator parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    Duration,
    /// String parameter restricted to the schema's enum values.
    Enum,
    /// Object literal with named fields.
    Object {
        fields: Vec<ParamSchema>,
        additional_allowed: bool,
    },
    /// Array literal with homogeneous elements.
    Array { element: Box<ParamType> },
}

impl ParamType {
    /// Short type word used in diagnostics ("string", "integer", ...).
    pub fn word(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "integer",
            ParamType::Float => "number",
            ParamType::Bool => "boolean",
            ParamType::Duration => "duration",
            ParamType::Enum => "string",
            ParamType::Object { .. } => "object",
            ParamType::Array { .. } => "array",
        }
    }

    /// Full expected-type description for schema diagnostics.
    pub fn describe(&self) -> String {
        match self {
            ParamType::Duration => "duration (e.g., \"5m\", \"1h\")".to_string(),
            ParamType::Array { element } => format!("array of {}", element.word()),
            other => other.word().to_string(),
        }
    }
}

/// Schema for one decorator parameter: type, constraints, deprecations.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSchema {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Regex the (string) value must match.
    pub pattern: Option<String>,
    /// Named format such as `uri` or `identifier`.
    pub format: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Valid values for `Enum` parameters.
    pub enum_values: Vec<String>,
    /// Deprecated enum values and their replacements. Accepted with a warning.
    pub deprecated_enum_values: Vec<(String, String)>,
    /// Example value shown in diagnostics.
    pub example: Option<String>,
}

impl ParamSchema {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            min: None,
            max: None,
            pattern: None,
            format: None,
            min_length: None,
            max_length: None,
            enum_values: Vec::new(),
            deprecated_enum_values: Vec::new(),
            example: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn with_values(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_deprecated_value(mut self, old: &str, replacement: &str) -> Self {
        self.deprecated_enum_values
            .push((old.to_string(), replacement.to_string()));
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Expected-type description, including enum values when relevant.
    pub fn expected_type(&self) -> String {
        if self.ty == ParamType::Enum {
            format!("one of: {}", self.enum_values.join(", "))
        } else {
            self.ty.describe()
        }
    }
}

/// Which roles a decorator can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roles {
    /// Value decorator: produces a value, usable in expressions and
    /// string interpolation.
    pub provider: bool,
    /// Wrapper decorator: transforms or governs a block.
    pub wrapper: bool,
}

/// Whether a decorator takes a `{ … }` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRequirement {
    Required,
    Optional,
    Forbidden,
}

/// Pipe capabilities: which ends of a `|` this decorator can sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoCapability {
    pub stdin: bool,
    pub stdout: bool,
}

/// Runtime file-redirect capabilities for `< > >>` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileIoCapability {
    pub read: bool,
    pub write: bool,
    pub append: bool,
}

/// A redirect mode in the older schema-level capability model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>`
    Overwrite,
    /// `>>`
    Append,
    /// `<`
    Input,
}

/// Older schema-level redirect capability: a plain set of supported modes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RedirectCapability {
    pub modes: Vec<RedirectMode>,
}

impl RedirectCapability {
    pub fn supports(&self, mode: RedirectMode) -> bool {
        self.modes.contains(&mode)
    }
}

/// Everything the parser needs to know about a registered decorator.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratorDescriptor {
    pub name: String,
    pub summary: String,
    pub roles: Roles,
    /// The one parameter that may be supplied via `@name.value` dot sugar.
    pub primary_param: Option<String>,
    pub params: Vec<ParamSchema>,
    pub block: BlockRequirement,
    pub io: Option<IoCapability>,
    pub file_io: Option<FileIoCapability>,
    /// Deprecated parameter names and their replacements.
    pub deprecated_params: FxHashMap<String, String>,
}

impl DecoratorDescriptor {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            roles: Roles::default(),
            primary_param: None,
            params: Vec::new(),
            // Value decorators take no block unless the descriptor says so.
            block: BlockRequirement::Forbidden,
            io: None,
            file_io: None,
            deprecated_params: FxHashMap::default(),
        }
    }

    pub fn provider(mut self) -> Self {
        self.roles.provider = true;
        self
    }

    pub fn wrapper(mut self) -> Self {
        self.roles.wrapper = true;
        self
    }

    pub fn with_primary(mut self, name: &str) -> Self {
        self.primary_param = Some(name.to_string());
        self
    }

    pub fn with_param(mut self, param: ParamSchema) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_block(mut self, block: BlockRequirement) -> Self {
        self.block = block;
        self
    }

    pub fn with_io(mut self, stdin: bool, stdout: bool) -> Self {
        self.io = Some(IoCapability { stdin, stdout });
        self
    }

    pub fn with_file_io(mut self, read: bool, write: bool, append: bool) -> Self {
        self.file_io = Some(FileIoCapability {
            read,
            write,
            append,
        });
        self
    }

    pub fn with_deprecated_param(mut self, old: &str, new: &str) -> Self {
        self.deprecated_params.insert(old.to_string(), new.to_string());
        self
    }
}

/// Schema entry in the older type registry.
///
/// Carries the same parameter model as [`DecoratorDescriptor`] minus the
/// role split, plus the schema-level redirect capability. The parser
/// treats both registries as one capability lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSchema {
    pub name: String,
    pub primary_param: Option<String>,
    pub params: Vec<ParamSchema>,
    pub block: BlockRequirement,
    pub io: Option<IoCapability>,
    pub redirect: Option<RedirectCapability>,
    pub deprecated_params: FxHashMap<String, String>,
}

impl TypeSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_param: None,
            params: Vec::new(),
            block: BlockRequirement::Forbidden,
            io: None,
            redirect: None,
            deprecated_params: FxHashMap::default(),
        }
    }

    pub fn with_primary(mut self, name: &str) -> Self {
        self.primary_param = Some(name.to_string());
        self
    }

    pub fn with_param(mut self, param: ParamSchema) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_redirect(mut self, modes: &[RedirectMode]) -> Self {
        self.redirect = Some(RedirectCapability {
            modes: modes.to_vec(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_type_descriptions() {
        assert_eq!(ParamType::String.describe(), "string");
        assert_eq!(ParamType::Int.describe(), "integer");
        assert_eq!(
            ParamType::Duration.describe(),
            "duration (e.g., \"5m\", \"1h\")"
        );
        assert_eq!(
            ParamType::Array {
                element: Box::new(ParamType::String)
            }
            .describe(),
            "array of string"
        );
    }

    #[test]
    fn enum_expected_type_lists_values() {
        let schema = ParamSchema::new("strategy", ParamType::Enum)
            .with_values(&["linear", "exponential"]);
        assert_eq!(schema.expected_type(), "one of: linear, exponential");
    }

    #[test]
    fn descriptor_builder() {
        let desc = DecoratorDescriptor::new("retry", "Retries a block")
            .wrapper()
            .with_primary("times")
            .with_param(ParamSchema::new("times", ParamType::Int).required())
            .with_block(BlockRequirement::Required)
            .with_deprecated_param("attempts", "times");
        assert!(desc.roles.wrapper);
        assert!(!desc.roles.provider);
        assert_eq!(desc.block, BlockRequirement::Required);
        assert_eq!(desc.deprecated_params.get("attempts").unwrap(), "times");
    }

    #[test]
    fn redirect_capability_membership() {
        let cap = RedirectCapability {
            modes: vec![RedirectMode::Append, RedirectMode::Input],
        };
        assert!(cap.supports(RedirectMode::Append));
        assert!(!cap.supports(RedirectMode::Overwrite));
    }
}
