//! Module descriptors and source classification.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, info};

use crate::value::{yaml_key, yaml_to_map, HclValue};

/// Where a module's source code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Local,
    Registry,
    VersionControl,
    RemoteArchive,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Registry => "registry",
            SourceKind::VersionControl => "version_control",
            SourceKind::RemoteArchive => "remote_archive",
        }
    }

    /// Whether a `version` argument is meaningful for this source.
    pub fn supports_version(&self) -> bool {
        matches!(self, SourceKind::Registry | SourceKind::VersionControl)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a raw module source and rewrite local paths.
///
/// Generated files live one directory below the config, so local sources are
/// re-rooted with `../`. A `./x` source becomes `../x`; a `../x` source gets a
/// second `../` in front and becomes `../../x`.
pub fn classify_source(raw: &str) -> (SourceKind, String) {
    if let Some(rest) = raw.strip_prefix("./") {
        (SourceKind::Local, format!("../{}", rest))
    } else if raw.starts_with("../") {
        (SourceKind::Local, format!("../{}", raw))
    } else if raw.starts_with("git::") {
        (SourceKind::VersionControl, raw.to_string())
    } else if raw.starts_with("http") {
        (SourceKind::RemoteArchive, raw.to_string())
    } else {
        (SourceKind::Registry, raw.to_string())
    }
}

/// A named infrastructure module as declared in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    pub name: String,
    pub enabled: bool,
    /// Source after classification and local-path rewriting.
    pub source: String,
    pub kind: SourceKind,
    pub version: Option<String>,
    /// Names of modules this one depends on, in declared order.
    pub depends_on: Vec<String>,
    pub variables: IndexMap<String, HclValue>,
    /// Output names the module is expected to expose.
    pub outputs: Vec<String>,
}

impl ModuleDescriptor {
    /// Create an enabled module with the given raw source.
    pub fn new(name: impl Into<String>, source: &str) -> Self {
        let (kind, source) = classify_source(source);
        Self {
            name: name.into(),
            enabled: true,
            source,
            kind,
            version: None,
            depends_on: Vec::new(),
            variables: IndexMap::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<HclValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.outputs.push(output.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Parse a single module entry. Returns `None` when the entry is not a
    /// mapping.
    pub fn from_yaml(name: &str, value: &Value) -> Option<Self> {
        let map = value.as_mapping()?;
        let get = |key: &str| map.get(key);

        let raw_source = get("source").and_then(scalar_string).unwrap_or_default();
        let (kind, source) = classify_source(&raw_source);

        let enabled = match get("enabled") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Null) | None => true,
            Some(other) => {
                debug!("Module '{}' has non-boolean 'enabled' {:?}, treating as enabled", name, other);
                true
            }
        };

        Some(Self {
            name: name.to_string(),
            enabled,
            source,
            kind,
            version: get("version").and_then(scalar_string).filter(|v| !v.is_empty()),
            depends_on: string_list(get("depends_on")),
            variables: yaml_to_map(get("variables")),
            outputs: string_list(get("outputs")),
        })
    }
}

/// Build module descriptors from the raw `modules` section.
///
/// Entries that are not mappings are skipped. Later duplicate keys replace
/// earlier ones.
pub fn build_modules(section: &Value) -> IndexMap<String, ModuleDescriptor> {
    let mut modules = IndexMap::new();

    let Some(map) = section.as_mapping() else {
        debug!("Modules section is not a mapping, ignoring");
        return modules;
    };

    for (key, value) in map {
        let name = yaml_key(key);
        match ModuleDescriptor::from_yaml(&name, value) {
            Some(module) => {
                debug!("Parsed module '{}' ({}: {})", name, module.kind, module.source);
                modules.insert(name, module);
            }
            None => debug!("Skipping module '{}': entry is not a mapping", name),
        }
    }

    info!("Parsed {} module configurations", modules.len());
    modules
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a list of strings. A lone string is treated as a one-element list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}
