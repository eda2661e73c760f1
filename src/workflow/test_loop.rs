//! Test authoring and repair.

use tracing::{info, warn};

use super::files::WorkingFileSet;
use super::session::{with_diagnostic, Session};
use crate::analysis::Diagnosis;
use crate::editor::Stage;

const TEST_INSTRUCTIONS: &str = "This requirement has already been implemented. \
Do not duplicate parts of it that are already satisfied. \
Add valuable additional tests for it.";

const TEST_FAILURE_HEADING: &str = "The last test run failed. Fix the cause:";

fn test_request(requirement: &str, previous_failure: Option<&str>) -> String {
    let request = format!("{requirement}\n\n{TEST_INSTRUCTIONS}");
    match previous_failure {
        Some(text) => with_diagnostic(request, TEST_FAILURE_HEADING, text),
        None => request,
    }
}

impl Session<'_> {
    /// Returns `None` once tests pass, else the last round's diagnosis.
    pub async fn test_loop(
        &self,
        requirement: &str,
        test: &str,
        files: &mut WorkingFileSet,
    ) -> Option<Diagnosis> {
        let attempts = self.deps.settings.test_attempts.max(1);
        let mut previous_failure: Option<String> = None;
        let mut diagnosis: Option<Diagnosis> = None;

        for round in 1..=attempts {
            if let Some(ref d) = diagnosis {
                self.apply(d, files).await;
            }
            let request = test_request(requirement, previous_failure.as_deref());

            let result = match self.edit(Stage::Test, round, &request, files.as_slice()).await {
                Ok(()) => {
                    self.merge_added_files(files).await;
                    // A test edit can break the build; check it before testing.
                    match self.compile().await {
                        Ok(()) => self.run_command(test).await,
                        Err(text) => Err(text),
                    }
                }
                Err(text) => Err(text),
            };

            match result {
                Ok(()) => {
                    info!(round, "Tests passed");
                    return None;
                }
                Err(text) => {
                    warn!(round, attempts, "Test round failed");
                    diagnosis = Some(self.analyze(&text, files).await);
                    previous_failure = Some(text);
                }
            }
        }

        diagnosis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_keeps_requirement_first() {
        let request = test_request("Support --json output", None);
        assert!(request.starts_with("Support --json output\n\n"));
        assert!(request.contains("Do not duplicate"));
        assert!(request.contains("additional tests"));
        assert!(!request.contains(TEST_FAILURE_HEADING));
    }

    #[test]
    fn test_retry_request_includes_failure() {
        let request = test_request("Support --json output", Some("FAIL case X"));
        assert!(request.contains(TEST_FAILURE_HEADING));
        assert!(request.ends_with("```\nFAIL case X\n```\n"));
    }
}
