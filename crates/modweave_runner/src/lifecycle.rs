//! Terraform lifecycle over generated stacks.
//!
//! The driver runs terraform inside `<terraform_dir>/generated` and feeds it
//! the stack's `terraform.tfvars` from the parent directory. Apply and
//! destroy are confirmed through a [`Confirmer`] before terraform is invoked,
//! so terraform itself always runs non-interactively.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modweave_core::{GENERATED_DIR, TFVARS_FILE};
use tracing::{debug, info, warn};

use crate::confirm::Confirmer;
use crate::error::{RunnerError, RunnerResult};
use crate::executor::{CommandOutput, TerraformExecutor};

/// Phrase required before destroying a production workspace.
pub const PRODUCTION_PHRASE: &str = "destroy-production";

const DEFAULT_WORKSPACE: &str = "default";

/// What `deploy` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Stopped after plan (`--plan-only`).
    Planned,
    Applied,
}

/// What `destroy_workspace` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The workspace state held no resources.
    NothingToDestroy,
    Destroyed { resources: usize },
}

/// Returns true for workspaces that need the extra destroy phrase.
pub fn is_production_workspace(workspace: &str) -> bool {
    matches!(workspace.to_lowercase().as_str(), "prod" | "production")
}

/// Workspace names from `terraform workspace list` output.
///
/// The current workspace is marked with a leading `*`.
pub fn parse_workspace_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Number of non-blank lines in `terraform state list` output.
pub fn count_resources(stdout: &str) -> usize {
    stdout.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Drives init, plan, apply and destroy for one generated stack.
pub struct LifecycleDriver {
    executor: Arc<dyn TerraformExecutor>,
    working_dir: PathBuf,
    var_file: String,
}

impl LifecycleDriver {
    /// Create a driver for the stack rooted at `terraform_dir`.
    pub fn new(executor: Arc<dyn TerraformExecutor>, terraform_dir: impl AsRef<Path>) -> Self {
        Self {
            executor,
            working_dir: terraform_dir.as_ref().join(GENERATED_DIR),
            var_file: format!("../{}", TFVARS_FILE),
        }
    }

    /// Directory terraform runs in.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn var_file_arg(&self) -> String {
        format!("-var-file={}", self.var_file)
    }

    async fn run(&self, args: &[&str]) -> RunnerResult<CommandOutput> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.executor.run(&self.working_dir, &args).await
    }

    async fn run_checked(&self, args: &[&str]) -> RunnerResult<CommandOutput> {
        self.run(args).await?.into_result()
    }

    /// Run `terraform init`.
    pub async fn init(&self) -> RunnerResult<CommandOutput> {
        info!("Initializing Terraform in {:?}", self.working_dir);
        self.run_checked(&["init", "-input=false"]).await
    }

    /// Run `terraform plan` with the stack's variables.
    pub async fn plan(&self) -> RunnerResult<CommandOutput> {
        info!("Planning Terraform deployment");
        let var_file = self.var_file_arg();
        self.run_checked(&["plan", "-input=false", &var_file]).await
    }

    /// Run `terraform apply`. Callers confirm first.
    pub async fn apply(&self) -> RunnerResult<CommandOutput> {
        info!("Applying Terraform changes");
        let var_file = self.var_file_arg();
        self.run_checked(&["apply", "-input=false", &var_file, "-auto-approve"])
            .await
    }

    /// Run `terraform destroy`. Callers confirm first.
    pub async fn destroy(&self) -> RunnerResult<CommandOutput> {
        info!("Destroying Terraform-managed infrastructure");
        let var_file = self.var_file_arg();
        self.run_checked(&["destroy", "-input=false", &var_file, "-auto-approve"])
            .await
    }

    /// Init, plan and, unless `plan_only`, apply after confirmation.
    pub async fn deploy(
        &self,
        plan_only: bool,
        confirmer: &dyn Confirmer,
    ) -> RunnerResult<DeployOutcome> {
        self.init().await?;
        self.plan().await?;

        if plan_only {
            info!("Plan complete (plan-only, nothing applied)");
            return Ok(DeployOutcome::Planned);
        }

        if !confirmer.confirm("Apply these changes?") {
            return Err(RunnerError::Aborted("apply declined".to_string()));
        }

        self.apply().await?;
        info!("Deployment complete");
        Ok(DeployOutcome::Applied)
    }

    /// Confirm, then destroy whatever the current workspace manages.
    pub async fn confirmed_destroy(&self, confirmer: &dyn Confirmer) -> RunnerResult<()> {
        if !confirmer.confirm("Destroy all resources managed by this stack?") {
            return Err(RunnerError::Aborted("destroy declined".to_string()));
        }
        self.destroy().await?;
        Ok(())
    }

    /// Names of the existing workspaces.
    pub async fn list_workspaces(&self) -> RunnerResult<Vec<String>> {
        let output = self.run_checked(&["workspace", "list"]).await?;
        Ok(parse_workspace_list(&output.stdout))
    }

    /// Number of resources tracked in the current workspace state.
    pub async fn resource_count(&self) -> RunnerResult<usize> {
        let output = self.run_checked(&["state", "list"]).await?;
        Ok(count_resources(&output.stdout))
    }

    /// Destroy one workspace with safety checks.
    ///
    /// The working directory must be initialized and `workspace` must exist.
    /// A workspace with no resources is left alone. Production workspaces
    /// need [`PRODUCTION_PHRASE`] on top of the regular confirmation.
    pub async fn destroy_workspace(
        &self,
        workspace: &str,
        confirmer: &dyn Confirmer,
    ) -> RunnerResult<DestroyOutcome> {
        info!("Starting destruction of workspace '{}'", workspace);

        if !self.working_dir.join(".terraform").exists() {
            return Err(RunnerError::NotInitialized(
                self.working_dir.display().to_string(),
            ));
        }

        let workspaces = self.list_workspaces().await?;
        debug!("Existing workspaces: {:?}", workspaces);
        if !workspaces.iter().any(|w| w == workspace) {
            return Err(RunnerError::WorkspaceNotFound(workspace.to_string()));
        }

        if workspace != DEFAULT_WORKSPACE {
            self.run_checked(&["workspace", "select", workspace]).await?;
        }

        let resources = self.resource_count().await?;
        if resources == 0 {
            info!("No resources found in '{}'. Nothing to destroy.", workspace);
            return Ok(DestroyOutcome::NothingToDestroy);
        }
        info!("Found {} resources to destroy", resources);

        let var_file = self.var_file_arg();
        self.run_checked(&["plan", "-destroy", "-input=false", &var_file])
            .await?;

        let prompt = format!(
            "Destroy {} resources in '{}' workspace?",
            resources, workspace
        );
        if !confirmer.confirm(&prompt) {
            return Err(RunnerError::Aborted("destroy declined".to_string()));
        }

        if is_production_workspace(workspace) {
            warn!("About to destroy PRODUCTION workspace '{}'", workspace);
            if !confirmer.confirm_phrase("This is a production workspace.", PRODUCTION_PHRASE) {
                return Err(RunnerError::Aborted(
                    "production destroy declined".to_string(),
                ));
            }
        }

        self.destroy().await?;
        info!("Workspace '{}' destroyed", workspace);
        Ok(DestroyOutcome::Destroyed { resources })
    }
}
