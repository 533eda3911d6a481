//! Stack configuration model.
//!
//! A stack file is a YAML mapping with a handful of reserved sections
//! (`modules`, `terraform`, `variables`, `outputs`, `locals`,
//! `data_sources`), any number of `<provider>_config` sections, and free-form
//! top-level keys that supply values for well-known variables.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::module::{build_modules, ModuleDescriptor};
use crate::value::{yaml_key, yaml_to_map, HclValue};

/// Top-level sections with a fixed meaning.
pub const RESERVED_SECTIONS: &[&str] = &[
    "modules",
    "terraform",
    "variables",
    "outputs",
    "locals",
    "data_sources",
];

const PROVIDER_CONFIG_SUFFIX: &str = "_config";

/// Backend configuration for Terraform state.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSpec {
    pub backend_type: String,
    pub settings: IndexMap<String, HclValue>,
}

impl BackendSpec {
    fn from_yaml(value: &Value) -> Option<Self> {
        let mut settings = yaml_to_map(Some(value));
        if settings.is_empty() && !value.is_mapping() {
            return None;
        }
        let backend_type = settings
            .shift_remove("type")
            .map(|t| t.to_plain_string())
            .unwrap_or_else(|| "local".to_string());
        Some(Self {
            backend_type,
            settings,
        })
    }
}

/// The `terraform` section: required version, providers and backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TerraformSettings {
    pub required_version: String,
    /// Provider name to requirement metadata (`source`, `version`, ...).
    pub required_providers: IndexMap<String, IndexMap<String, HclValue>>,
    pub backend: Option<BackendSpec>,
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            required_version: ">= 1.0".to_string(),
            required_providers: IndexMap::new(),
            backend: None,
        }
    }
}

impl TerraformSettings {
    fn from_yaml(value: Option<&Value>) -> Self {
        let mut settings = Self::default();
        let Some(Value::Mapping(map)) = value else {
            return settings;
        };

        if let Some(version) = map.get("version").map(HclValue::from_yaml) {
            settings.required_version = version.to_plain_string();
        }

        if let Some(Value::Mapping(providers)) = map.get("required_providers") {
            settings.required_providers = providers
                .iter()
                .map(|(name, meta)| (yaml_key(name), yaml_to_map(Some(meta))))
                .collect();
        }

        settings.backend = map
            .get("backend")
            .filter(|b| !b.is_null())
            .and_then(BackendSpec::from_yaml);

        settings
    }
}

/// `validation` block attached to a variable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationSpec {
    pub condition: Option<String>,
    pub error_message: Option<String>,
}

/// A variable declaration from the `variables` section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableSpec {
    pub description: Option<String>,
    /// Raw HCL type expression, e.g. `string` or `list(string)`.
    pub var_type: Option<String>,
    pub default: Option<HclValue>,
    pub sensitive: bool,
    pub validation: Option<ValidationSpec>,
}

impl VariableSpec {
    fn from_yaml(name: &str, value: &Value) -> Self {
        let Some(map) = value.as_mapping() else {
            warn!("Variable '{}' is not a mapping, declaring it without attributes", name);
            return Self::default();
        };

        Self {
            description: plain(map, "description"),
            var_type: plain(map, "type"),
            default: map.get("default").map(HclValue::from_yaml),
            sensitive: truthy(map, "sensitive"),
            validation: map.get("validation").map(|v| {
                let v = v.as_mapping().cloned().unwrap_or_default();
                ValidationSpec {
                    condition: plain(&v, "condition"),
                    error_message: plain(&v, "error_message"),
                }
            }),
        }
    }
}

/// A user-declared output from the `outputs` section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputSpec {
    pub description: Option<String>,
    /// Raw HCL expression for the output value.
    pub value: Option<String>,
    pub sensitive: bool,
}

impl OutputSpec {
    fn from_yaml(value: &Value) -> Self {
        let Some(map) = value.as_mapping() else {
            return Self::default();
        };
        Self {
            description: plain(map, "description"),
            value: plain(map, "value"),
            sensitive: truthy(map, "sensitive"),
        }
    }
}

/// An entry of the `data_sources` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceSpec {
    pub source_type: String,
    pub name: String,
    pub config: IndexMap<String, HclValue>,
}

/// Parsed stack configuration.
///
/// Sections are split out once at load time; generators receive only the
/// pieces they read.
#[derive(Debug, Clone, Default)]
pub struct StackConfig {
    pub terraform: TerraformSettings,
    pub modules: IndexMap<String, ModuleDescriptor>,
    pub variables: IndexMap<String, VariableSpec>,
    pub outputs: IndexMap<String, OutputSpec>,
    pub locals: IndexMap<String, HclValue>,
    pub data_sources: Vec<DataSourceSpec>,
    /// `<provider>_config` sections keyed by provider name.
    pub provider_configs: IndexMap<String, IndexMap<String, HclValue>>,
    /// Every other top-level key.
    pub top_level: IndexMap<String, HclValue>,
}

impl StackConfig {
    /// Load a stack configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        debug!("Reading configuration from {:?}", path);
        let content = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        info!("Successfully loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a stack configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        let root: Value = serde_yaml::from_str(content)?;
        Self::from_value(&root)
    }

    /// Build a stack configuration from an already parsed YAML document.
    pub fn from_value(root: &Value) -> CoreResult<Self> {
        let root = match root {
            Value::Mapping(map) => map,
            Value::Null => {
                return Err(CoreError::Configuration(
                    "Configuration file is empty".to_string(),
                ))
            }
            _ => {
                return Err(CoreError::Configuration(
                    "Configuration root must be a mapping".to_string(),
                ))
            }
        };

        let modules = match root.get("modules") {
            Some(section) => build_modules(section),
            None => {
                warn!("No modules configuration found in YAML");
                IndexMap::new()
            }
        };

        let mut config = Self {
            terraform: TerraformSettings::from_yaml(root.get("terraform")),
            modules,
            variables: section_entries(root, "variables")
                .map(|(name, v)| {
                    let spec = VariableSpec::from_yaml(&name, v);
                    (name, spec)
                })
                .collect(),
            outputs: section_entries(root, "outputs")
                .map(|(name, v)| (name, OutputSpec::from_yaml(v)))
                .collect(),
            locals: yaml_to_map(root.get("locals")),
            data_sources: parse_data_sources(root.get("data_sources")),
            ..Self::default()
        };

        for (key, value) in root {
            let key = yaml_key(key);
            if RESERVED_SECTIONS.contains(&key.as_str()) {
                continue;
            }
            match key.strip_suffix(PROVIDER_CONFIG_SUFFIX) {
                Some(provider) if value.is_mapping() => {
                    config
                        .provider_configs
                        .insert(provider.to_string(), yaml_to_map(Some(value)));
                }
                _ => {
                    config.top_level.insert(key, HclValue::from_yaml(value));
                }
            }
        }

        Ok(config)
    }
}

fn section_entries<'a>(
    root: &'a Mapping,
    section: &str,
) -> impl Iterator<Item = (String, &'a Value)> + 'a {
    root.get(section)
        .and_then(Value::as_mapping)
        .into_iter()
        .flat_map(|map| map.iter().map(|(k, v)| (yaml_key(k), v)))
}

fn parse_data_sources(value: Option<&Value>) -> Vec<DataSourceSpec> {
    let Some(Value::Sequence(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let map = item.as_mapping()?;
            let source_type = plain(map, "type");
            let name = plain(map, "name");
            if source_type.is_none() || name.is_none() {
                debug!("Data source entry is missing type or name: {:?}", item);
            }
            Some(DataSourceSpec {
                source_type: source_type.unwrap_or_default(),
                name: name.unwrap_or_default(),
                config: yaml_to_map(map.get("config")),
            })
        })
        .collect()
}

fn plain(map: &Mapping, key: &str) -> Option<String> {
    map.get(key)
        .filter(|v| !v.is_null())
        .map(|v| HclValue::from_yaml(v).to_plain_string())
}

fn truthy(map: &Mapping, key: &str) -> bool {
    matches!(map.get(key), Some(Value::Bool(true)))
}
