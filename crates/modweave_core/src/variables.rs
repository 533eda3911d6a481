//! Well-known variables shared across modules.

use indexmap::IndexMap;

use crate::config::VariableSpec;
use crate::value::HclValue;

/// A variable that stacks commonly declare, with its default attributes.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownVariable {
    pub name: &'static str,
    pub description: &'static str,
    pub var_type: &'static str,
    pub default: Option<&'static str>,
}

/// Variables forwarded to every module that does not set them itself.
pub const COMMON_MODULE_VARIABLES: &[&str] = &[
    "project_id",
    "project",
    "region",
    "zone",
    "environment",
    "name_prefix",
];

pub const WELL_KNOWN_VARIABLES: &[WellKnownVariable] = &[
    WellKnownVariable {
        name: "project_id",
        description: "The GCP project ID",
        var_type: "string",
        default: None,
    },
    WellKnownVariable {
        name: "project",
        description: "The project name",
        var_type: "string",
        default: None,
    },
    WellKnownVariable {
        name: "region",
        description: "The region for resources",
        var_type: "string",
        default: Some("us-central1"),
    },
    WellKnownVariable {
        name: "zone",
        description: "The zone for resources",
        var_type: "string",
        default: None,
    },
    WellKnownVariable {
        name: "environment",
        description: "Environment name (dev, staging, prod)",
        var_type: "string",
        default: Some("dev"),
    },
    WellKnownVariable {
        name: "name_prefix",
        description: "Prefix for resource names",
        var_type: "string",
        default: None,
    },
];

impl WellKnownVariable {
    /// Declaration for this variable, taking the default from `top_level_value`
    /// when the table has none.
    pub fn to_spec(&self, top_level_value: &HclValue) -> VariableSpec {
        VariableSpec {
            description: Some(self.description.to_string()),
            var_type: Some(self.var_type.to_string()),
            default: Some(
                self.default
                    .map(HclValue::from)
                    .unwrap_or_else(|| top_level_value.clone()),
            ),
            sensitive: false,
            validation: None,
        }
    }
}

/// Merge declared variables with well-known ones.
///
/// A well-known variable is added after the declared ones when a top-level
/// key of the same name exists and the stack does not declare it.
pub fn merge_variables(
    declared: &IndexMap<String, VariableSpec>,
    top_level: &IndexMap<String, HclValue>,
) -> IndexMap<String, VariableSpec> {
    let mut merged = declared.clone();

    for known in WELL_KNOWN_VARIABLES {
        if merged.contains_key(known.name) {
            continue;
        }
        if let Some(value) = top_level.get(known.name) {
            merged.insert(known.name.to_string(), known.to_spec(value));
        }
    }

    merged
}
