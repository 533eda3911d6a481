//! Terraform code generation.
//!
//! Each `render_*` function is pure and receives only the configuration
//! sections it reads. [`CodeGenerator`] stitches them into the artifacts of a
//! stack: `main.tf`, `variables.tf` and `outputs.tf`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{DataSourceSpec, OutputSpec, StackConfig, TerraformSettings, VariableSpec};
use crate::conventions::ProviderConventions;
use crate::error::{CoreError, CoreResult};
use crate::module::ModuleDescriptor;
use crate::value::{format_value, HclValue};
use crate::variables::{merge_variables, COMMON_MODULE_VARIABLES};

/// Text produced for one stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifacts {
    pub main_tf: String,
    /// Empty when the stack declares no variables.
    pub variables_tf: String,
    /// Empty when the stack has no outputs.
    pub outputs_tf: String,
}

impl GeneratedArtifacts {
    /// Artifacts as `(file name, content)` pairs, skipping empty optional files.
    pub fn files(&self) -> Vec<(&'static str, &str)> {
        let mut files = vec![("main.tf", self.main_tf.as_str())];
        if !self.variables_tf.is_empty() {
            files.push(("variables.tf", self.variables_tf.as_str()));
        }
        if !self.outputs_tf.is_empty() {
            files.push(("outputs.tf", self.outputs_tf.as_str()));
        }
        files
    }
}

/// Generates Terraform source for a parsed stack.
pub struct CodeGenerator<'a> {
    config: &'a StackConfig,
    conventions: ProviderConventions,
}

impl<'a> CodeGenerator<'a> {
    /// Create a generator using the built-in provider conventions.
    pub fn new(config: &'a StackConfig) -> Self {
        Self {
            config,
            conventions: ProviderConventions::builtin(),
        }
    }

    /// Replace the provider convention table.
    pub fn with_conventions(mut self, conventions: ProviderConventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Generate all artifacts for modules in the given resolved order.
    ///
    /// `ordered` must come from [`crate::resolver::resolve`] on the same
    /// configuration; a name it does not know is an internal error.
    pub fn generate(&self, ordered: &[String]) -> CoreResult<GeneratedArtifacts> {
        let modules = self.lookup(ordered)?;

        Ok(GeneratedArtifacts {
            main_tf: finish(self.main_tf(&modules)),
            variables_tf: finish(render_variables(&self.config.variables, &self.config.top_level)),
            outputs_tf: finish(render_outputs(&modules, &self.config.outputs)),
        })
    }

    fn lookup(&self, ordered: &[String]) -> CoreResult<Vec<&'a ModuleDescriptor>> {
        ordered
            .iter()
            .map(|name| {
                self.config.modules.get(name).ok_or_else(|| {
                    CoreError::Internal(format!("resolved order names unknown module '{}'", name))
                })
            })
            .collect()
    }

    fn main_tf(&self, modules: &[&ModuleDescriptor]) -> String {
        let config = self.config;

        let module_blocks: Vec<String> = modules
            .iter()
            .map(|m| render_module_block(m, &config.top_level, &config.variables))
            .collect();

        let sections = [
            render_terraform_block(&config.terraform),
            render_provider_blocks(
                &config.terraform.required_providers,
                &config.provider_configs,
                &config.top_level,
                &self.conventions,
            ),
            render_locals(&config.locals),
            render_data_sources(&config.data_sources),
            module_blocks.join("\n\n"),
        ];

        join_sections(sections)
    }
}

/// Render the `terraform { ... }` settings block.
pub fn render_terraform_block(settings: &TerraformSettings) -> String {
    let mut lines = vec![
        "terraform {".to_string(),
        format!("  required_version = \"{}\"", settings.required_version),
    ];

    if !settings.required_providers.is_empty() {
        lines.push("  required_providers {".to_string());
        for (provider, meta) in &settings.required_providers {
            lines.push(format!("    {} = {{", provider));
            for (key, value) in meta {
                lines.push(format!("      {} = \"{}\"", key, value.to_plain_string()));
            }
            lines.push("    }".to_string());
        }
        lines.push("  }".to_string());
    }

    if let Some(backend) = &settings.backend {
        lines.push(format!("  backend \"{}\" {{", backend.backend_type));
        for (key, value) in &backend.settings {
            let rendered = match value {
                HclValue::String(s) => format!("\"{}\"", s),
                other => format_value(other),
            };
            lines.push(format!("    {} = {}", key, rendered));
        }
        lines.push("  }".to_string());
    }

    lines.push("}".to_string());
    lines.join("\n")
}

/// Render one `provider` block per required provider.
///
/// Settings come from the provider's `<provider>_config` section. Fields the
/// convention table knows about are then wired to `var.<key>` when the
/// section did not set them and a matching top-level key exists.
pub fn render_provider_blocks(
    required_providers: &IndexMap<String, IndexMap<String, HclValue>>,
    provider_configs: &IndexMap<String, IndexMap<String, HclValue>>,
    top_level: &IndexMap<String, HclValue>,
    conventions: &ProviderConventions,
) -> String {
    let empty = IndexMap::new();

    let blocks: Vec<String> = required_providers
        .keys()
        .map(|provider| {
            let settings = provider_configs.get(provider).unwrap_or(&empty);
            let mut lines = vec![format!("provider \"{}\" {{", provider)];

            for (key, value) in settings {
                lines.push(format!("  {} = {}", key, format_value(value)));
            }

            for rule in conventions.rules_for(provider) {
                if settings.contains_key(&rule.field) {
                    continue;
                }
                if let Some(key) = rule.select(|k| top_level.contains_key(k)) {
                    debug!("Injecting {}.{} = var.{}", provider, rule.field, key);
                    lines.push(format!("  {} = var.{}", rule.field, key));
                }
            }

            lines.push("}".to_string());
            lines.join("\n")
        })
        .collect();

    blocks.join("\n\n")
}

/// Render a `module` block.
///
/// Common variables are forwarded as `var.<name>` when the stack both sets
/// them at the top level and declares them, unless the module sets them
/// itself.
pub fn render_module_block(
    module: &ModuleDescriptor,
    top_level: &IndexMap<String, HclValue>,
    declared_variables: &IndexMap<String, VariableSpec>,
) -> String {
    let mut lines = vec![
        format!("module \"{}\" {{", module.name),
        format!("  source = \"{}\"", module.source),
    ];

    if let Some(version) = &module.version {
        if !module.kind.supports_version() {
            warn!(
                "Module '{}' has a version but its {} source does not support one",
                module.name, module.kind
            );
        }
        lines.push(format!("  version = \"{}\"", version));
    }

    for name in COMMON_MODULE_VARIABLES {
        if top_level.contains_key(*name)
            && declared_variables.contains_key(*name)
            && !module.variables.contains_key(*name)
        {
            lines.push(format!("  {} = var.{}", name, name));
        }
    }

    for (name, value) in &module.variables {
        lines.push(format!("  {} = {}", name, format_value(value)));
    }

    if !module.depends_on.is_empty() {
        let deps: Vec<String> = module
            .depends_on
            .iter()
            .map(|dep| format!("module.{}", dep))
            .collect();
        lines.push(format!("  depends_on = [{}]", deps.join(", ")));
    }

    lines.push("}".to_string());
    lines.join("\n")
}

/// Render the `locals` block, or nothing when there are no locals.
pub fn render_locals(locals: &IndexMap<String, HclValue>) -> String {
    if locals.is_empty() {
        return String::new();
    }

    let mut lines = vec!["locals {".to_string()];
    for (key, value) in locals {
        lines.push(format!("  {} = {}", key, format_value(value)));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// Render `data` blocks.
pub fn render_data_sources(data_sources: &[DataSourceSpec]) -> String {
    let blocks: Vec<String> = data_sources
        .iter()
        .map(|ds| {
            let mut lines = vec![format!("data \"{}\" \"{}\" {{", ds.source_type, ds.name)];
            for (key, value) in &ds.config {
                lines.push(format!("  {} = {}", key, format_value(value)));
            }
            lines.push("}".to_string());
            lines.join("\n")
        })
        .collect();

    blocks.join("\n\n")
}

/// Render module outputs followed by user-declared outputs.
pub fn render_outputs(
    modules: &[&ModuleDescriptor],
    user_outputs: &IndexMap<String, OutputSpec>,
) -> String {
    let mut blocks = Vec::new();

    for module in modules {
        for output in &module.outputs {
            blocks.push(
                [
                    format!("output \"{}_{}\" {{", module.name, output),
                    format!("  description = \"{} from {} module\"", output, module.name),
                    format!("  value = module.{}.{}", module.name, output),
                    "}".to_string(),
                ]
                .join("\n"),
            );
        }
    }

    for (name, spec) in user_outputs {
        let mut lines = vec![
            format!("output \"{}\" {{", name),
            format!(
                "  description = \"{}\"",
                spec.description.as_deref().unwrap_or(name)
            ),
            format!("  value = {}", spec.value.as_deref().unwrap_or("null")),
        ];
        if spec.sensitive {
            lines.push("  sensitive = true".to_string());
        }
        lines.push("}".to_string());
        blocks.push(lines.join("\n"));
    }

    blocks.join("\n\n")
}

/// Render `variable` blocks for declared and well-known variables.
pub fn render_variables(
    declared: &IndexMap<String, VariableSpec>,
    top_level: &IndexMap<String, HclValue>,
) -> String {
    let blocks: Vec<String> = merge_variables(declared, top_level)
        .iter()
        .map(|(name, spec)| render_variable_block(name, spec))
        .collect();

    blocks.join("\n\n")
}

fn render_variable_block(name: &str, spec: &VariableSpec) -> String {
    let mut lines = vec![format!("variable \"{}\" {{", name)];

    if let Some(description) = &spec.description {
        lines.push(format!("  description = \"{}\"", description));
    }
    if let Some(var_type) = &spec.var_type {
        lines.push(format!("  type = {}", var_type));
    }
    if let Some(default) = &spec.default {
        lines.push(format!("  default = {}", format_value(default)));
    }
    if spec.sensitive {
        lines.push("  sensitive = true".to_string());
    }
    if let Some(validation) = &spec.validation {
        lines.push("  validation {".to_string());
        lines.push(format!(
            "    condition     = {}",
            validation.condition.as_deref().unwrap_or("true")
        ));
        lines.push(format!(
            "    error_message = \"{}\"",
            validation.error_message.as_deref().unwrap_or("Invalid value")
        ));
        lines.push("  }".to_string());
    }

    lines.push("}".to_string());
    lines.join("\n")
}

fn join_sections<I: IntoIterator<Item = String>>(sections: I) -> String {
    sections
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Terminate non-empty file content with a newline.
fn finish(mut content: String) -> String {
    if !content.is_empty() {
        content.push('\n');
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendSpec, ValidationSpec};
    use crate::conventions::InjectionRule;

    fn map(pairs: &[(&str, HclValue)]) -> IndexMap<String, HclValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn declared(names: &[&str]) -> IndexMap<String, VariableSpec> {
        names
            .iter()
            .map(|n| (n.to_string(), VariableSpec::default()))
            .collect()
    }

    #[test]
    fn test_terraform_block_minimal() {
        assert_eq!(
            render_terraform_block(&TerraformSettings::default()),
            "terraform {\n  required_version = \">= 1.0\"\n}"
        );
    }

    #[test]
    fn test_terraform_block_with_providers_and_backend() {
        let mut settings = TerraformSettings::default();
        settings.required_providers.insert(
            "aws".to_string(),
            map(&[("source", "hashicorp/aws".into()), ("version", "~> 5.0".into())]),
        );
        settings.backend = Some(BackendSpec {
            backend_type: "s3".to_string(),
            settings: map(&[
                ("bucket", "state".into()),
                ("encrypt", HclValue::Bool(true)),
                ("max_retries", HclValue::Integer(5)),
            ]),
        });

        let expected = "terraform {
  required_version = \">= 1.0\"
  required_providers {
    aws = {
      source = \"hashicorp/aws\"
      version = \"~> 5.0\"
    }
  }
  backend \"s3\" {
    bucket = \"state\"
    encrypt = true
    max_retries = 5
  }
}";
        assert_eq!(render_terraform_block(&settings), expected);
    }

    #[test]
    fn test_provider_injection_google() {
        let mut required = IndexMap::new();
        required.insert("google".to_string(), IndexMap::new());
        let top = map(&[("project_id", "acme".into()), ("region", "us-east1".into())]);

        let rendered = render_provider_blocks(
            &required,
            &IndexMap::new(),
            &top,
            &ProviderConventions::builtin(),
        );
        assert_eq!(
            rendered,
            "provider \"google\" {\n  project = var.project_id\n  region = var.region\n}"
        );
    }

    #[test]
    fn test_provider_injection_falls_back_to_second_key() {
        let mut required = IndexMap::new();
        required.insert("aws".to_string(), IndexMap::new());
        let top = map(&[("region", "eu-west-1".into())]);

        let rendered = render_provider_blocks(
            &required,
            &IndexMap::new(),
            &top,
            &ProviderConventions::builtin(),
        );
        assert!(rendered.contains("  region = var.region"));
    }

    #[test]
    fn test_provider_config_wins_over_injection() {
        let mut required = IndexMap::new();
        required.insert("aws".to_string(), IndexMap::new());
        let mut configs = IndexMap::new();
        configs.insert(
            "aws".to_string(),
            map(&[("region", "var.primary_region".into()), ("profile", "ops".into())]),
        );
        let top = map(&[("aws_region", "us-west-2".into())]);

        let rendered =
            render_provider_blocks(&required, &configs, &top, &ProviderConventions::builtin());
        assert_eq!(
            rendered,
            "provider \"aws\" {\n  region = var.primary_region\n  profile = \"ops\"\n}"
        );
    }

    #[test]
    fn test_provider_without_config_or_conventions() {
        let mut required = IndexMap::new();
        required.insert("random".to_string(), IndexMap::new());
        required.insert("tls".to_string(), IndexMap::new());

        let rendered = render_provider_blocks(
            &required,
            &IndexMap::new(),
            &IndexMap::new(),
            &ProviderConventions::builtin(),
        );
        assert_eq!(rendered, "provider \"random\" {\n}\n\nprovider \"tls\" {\n}");
    }

    #[test]
    fn test_custom_convention() {
        let mut required = IndexMap::new();
        required.insert("azurerm".to_string(), IndexMap::new());
        let top = map(&[("subscription_id", "0000".into())]);
        let conventions = ProviderConventions::new().with_rule(
            "azurerm",
            InjectionRule::new("subscription_id", &["subscription_id"]),
        );

        let rendered = render_provider_blocks(&required, &IndexMap::new(), &top, &conventions);
        assert!(rendered.contains("  subscription_id = var.subscription_id"));
    }

    #[test]
    fn test_module_block() {
        let module = ModuleDescriptor::new("app", "./modules/app")
            .with_variable("instance_type", "t3.micro")
            .with_variable("vpc_id", "module.network.vpc_id")
            .with_variable("replicas", HclValue::Integer(2))
            .depends_on(["network", "db"]);

        let expected = "module \"app\" {
  source = \"../modules/app\"
  instance_type = \"t3.micro\"
  vpc_id = module.network.vpc_id
  replicas = 2
  depends_on = [module.network, module.db]
}";
        assert_eq!(
            render_module_block(&module, &IndexMap::new(), &IndexMap::new()),
            expected
        );
    }

    #[test]
    fn test_module_common_variables() {
        let module = ModuleDescriptor::new("vpc", "terraform-aws-modules/vpc/aws")
            .with_version("5.1.0")
            .with_variable("region", "eu-west-1");
        let top = map(&[
            ("region", "us-east-1".into()),
            ("environment", "prod".into()),
            ("zone", "us-east-1a".into()),
        ]);
        // zone is set at the top level but never declared
        let vars = declared(&["region", "environment"]);

        let expected = "module \"vpc\" {
  source = \"terraform-aws-modules/vpc/aws\"
  version = \"5.1.0\"
  environment = var.environment
  region = \"eu-west-1\"
}";
        assert_eq!(render_module_block(&module, &top, &vars), expected);
    }

    #[test]
    fn test_locals_and_data_sources() {
        assert_eq!(render_locals(&IndexMap::new()), "");
        assert_eq!(
            render_locals(&map(&[("env", "var.environment".into()), ("count", HclValue::Integer(3))])),
            "locals {\n  env = var.environment\n  count = 3\n}"
        );

        let sources = vec![
            DataSourceSpec {
                source_type: "aws_caller_identity".to_string(),
                name: "current".to_string(),
                config: IndexMap::new(),
            },
            DataSourceSpec {
                source_type: "aws_ami".to_string(),
                name: "ubuntu".to_string(),
                config: map(&[("most_recent", HclValue::Bool(true))]),
            },
        ];
        assert_eq!(
            render_data_sources(&sources),
            "data \"aws_caller_identity\" \"current\" {\n}\n\ndata \"aws_ami\" \"ubuntu\" {\n  most_recent = true\n}"
        );
    }

    #[test]
    fn test_module_outputs() {
        let module = ModuleDescriptor::new("M", "./m").with_output("endpoint");
        let rendered = render_outputs(&[&module], &IndexMap::new());

        assert_eq!(
            rendered,
            "output \"M_endpoint\" {\n  description = \"endpoint from M module\"\n  value = module.M.endpoint\n}"
        );
    }

    #[test]
    fn test_user_outputs() {
        let mut outputs = IndexMap::new();
        outputs.insert("plain".to_string(), OutputSpec::default());
        outputs.insert(
            "secret".to_string(),
            OutputSpec {
                description: Some("Admin password".to_string()),
                value: Some("module.db.password".to_string()),
                sensitive: true,
            },
        );

        let rendered = render_outputs(&[], &outputs);
        assert_eq!(
            rendered,
            "output \"plain\" {
  description = \"plain\"
  value = null
}

output \"secret\" {
  description = \"Admin password\"
  value = module.db.password
  sensitive = true
}"
        );
    }

    #[test]
    fn test_variable_block_with_validation() {
        let mut vars = IndexMap::new();
        vars.insert(
            "instance_count".to_string(),
            VariableSpec {
                description: Some("Number of instances".to_string()),
                var_type: Some("number".to_string()),
                default: Some(HclValue::Integer(1)),
                sensitive: false,
                validation: Some(ValidationSpec {
                    condition: Some("var.instance_count > 0".to_string()),
                    error_message: None,
                }),
            },
        );

        let expected = "variable \"instance_count\" {
  description = \"Number of instances\"
  type = number
  default = 1
  validation {
    condition     = var.instance_count > 0
    error_message = \"Invalid value\"
  }
}";
        assert_eq!(render_variables(&vars, &IndexMap::new()), expected);
    }

    #[test]
    fn test_generate_rejects_unknown_module() {
        let config = StackConfig::default();
        let result = CodeGenerator::new(&config).generate(&["ghost".to_string()]);
        assert!(matches!(result, Err(CoreError::Internal(_))));
    }

    #[test]
    fn test_artifact_files_skip_empty() {
        let artifacts = GeneratedArtifacts {
            main_tf: "terraform {}\n".to_string(),
            variables_tf: String::new(),
            outputs_tf: "output \"x\" {}\n".to_string(),
        };
        let names: Vec<&str> = artifacts.files().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["main.tf", "outputs.tf"]);
    }
}
