//! # modweave_core
//!
//! Module dependency resolution and Terraform code generation for modweave.
//!
//! A stack file declares infrastructure modules, their dependencies and
//! variables. This crate orders the modules so that nothing is emitted before
//! its dependencies and renders the whole stack as Terraform source.
//!
//! ## Features
//!
//! - Module source classification (local, registry, git, remote archive)
//! - Depth-first dependency ordering with cycle and dangling-reference detection
//! - HCL literal formatting with live reference pass-through
//! - Provider convention table for injecting common settings
//! - `terraform.tfvars` generation that keeps hand-written entries
//!
//! ## Example
//!
//! ```rust,no_run
//! use modweave_core::{generate_stack, ArtifactWriter, StackConfig};
//!
//! let config = StackConfig::from_file("stack.yaml").unwrap();
//! let stack = generate_stack(&config).unwrap();
//!
//! let writer = ArtifactWriter::new("infrastructure");
//! writer.write(&stack.artifacts).unwrap();
//! writer.write_tfvars(&config).unwrap();
//! ```

pub mod config;
pub mod conventions;
pub mod error;
pub mod generator;
pub mod module;
pub mod resolver;
pub mod tfvars;
pub mod value;
pub mod variables;
pub mod writer;

pub use config::{
    BackendSpec, DataSourceSpec, OutputSpec, StackConfig, TerraformSettings, ValidationSpec,
    VariableSpec,
};
pub use conventions::{InjectionRule, ProviderConventions};
pub use error::{CoreError, CoreResult};
pub use generator::{CodeGenerator, GeneratedArtifacts};
pub use module::{build_modules, classify_source, ModuleDescriptor, SourceKind};
pub use resolver::resolve;
pub use tfvars::TfvarsBuilder;
pub use value::{format_value, HclValue};
pub use writer::{ArtifactWriter, GENERATED_DIR, TFVARS_FILE};

/// Result of generating a stack.
#[derive(Debug, Clone)]
pub struct GeneratedStack {
    /// Enabled modules in emission order.
    pub order: Vec<String>,
    pub artifacts: GeneratedArtifacts,
}

/// Resolve module order and generate all artifacts with the built-in
/// provider conventions.
pub fn generate_stack(config: &StackConfig) -> CoreResult<GeneratedStack> {
    generate_stack_with(config, ProviderConventions::builtin())
}

/// Like [`generate_stack`] with a custom provider convention table.
pub fn generate_stack_with(
    config: &StackConfig,
    conventions: ProviderConventions,
) -> CoreResult<GeneratedStack> {
    let order = resolve(&config.modules)?;
    let artifacts = CodeGenerator::new(config)
        .with_conventions(conventions)
        .generate(&order)?;
    Ok(GeneratedStack { order, artifacts })
}
