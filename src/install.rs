//! Best-effort package installation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::project::ProjectInfo;
use crate::runner::CommandRunner;

/// Placeholder replaced by the package name in install templates.
const PACKAGE_PLACEHOLDER: &str = "{package}";

/// Language-specific package installation. Never fails the caller.
#[async_trait]
pub(crate) trait PackageInstaller: Send + Sync {
    async fn install_package(&self, project: &ProjectInfo, name: &str);
}

/// Runs the project's install template through a `CommandRunner`.
pub(crate) struct CommandInstaller {
    runner: Arc<dyn CommandRunner>,
}

impl CommandInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

/// Fills the template; the name is quoted so it stays one argument.
fn install_command(template: &str, name: &str) -> String {
    let quoted = shell_words::quote(name);
    if template.contains(PACKAGE_PLACEHOLDER) {
        template.replace(PACKAGE_PLACEHOLDER, &quoted)
    } else {
        format!("{template} {quoted}")
    }
}

#[async_trait]
impl PackageInstaller for CommandInstaller {
    async fn install_package(&self, project: &ProjectInfo, name: &str) {
        let Some(template) = project.install_command.as_deref() else {
            debug!("No install command for {}, skipping {}", project.name, name);
            return;
        };

        let command = install_command(template, name);
        let result = self.runner.run(&command, &project.base_dir).await;
        if result.success() {
            info!("Installed package {}", name);
        } else {
            warn!(
                "Failed to install package {}: {}",
                name,
                result.combined_output()
            );
        }
    }
}
