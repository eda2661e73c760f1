//! Edit, then compile, until the build passes or attempts run out.

use tracing::{info, warn};

use super::files::WorkingFileSet;
use super::session::{with_diagnostic, Session};
use crate::analysis::Diagnosis;
use crate::editor::Stage;
use crate::state::StageOutcome;

const COMPILE_ERRORS_HEADING: &str = "Immediate task: fix these compile errors:";

fn compile_request(plan: &str, previous_failure: Option<&str>) -> String {
    match previous_failure {
        Some(text) => with_diagnostic(plan.to_string(), COMPILE_ERRORS_HEADING, text),
        None => plan.to_string(),
    }
}

impl Session<'_> {
    /// The compile gate. Returns `ExhaustedAborted` when no round compiles.
    pub async fn edit_compile_loop(&self, plan: &str, files: &mut WorkingFileSet) -> StageOutcome {
        let attempts = self.deps.settings.compile_attempts.max(1);
        let mut previous_failure: Option<String> = None;
        let mut diagnosis = Diagnosis::default();

        for round in 1..=attempts {
            if round == 1 {
                // Pre-existing breakage is fixed by the first edit, not blamed on it.
                if let Err(text) = self.compile().await {
                    info!("Baseline compile failed before any edit");
                    diagnosis = self.analyze(&text, files).await;
                    previous_failure = Some(text);
                }
            }

            self.apply(&diagnosis, files).await;
            let request = compile_request(plan, previous_failure.as_deref());

            let result = match self.edit(Stage::Compile, round, &request, files.as_slice()).await {
                Ok(()) => {
                    self.merge_added_files(files).await;
                    self.compile().await
                }
                Err(text) => Err(text),
            };

            match result {
                Ok(()) => {
                    info!(round, "Compile passed");
                    return StageOutcome::Passed;
                }
                Err(text) => {
                    warn!(round, attempts, "Compile round failed");
                    // A diagnosis of the last round has no later edit to feed.
                    diagnosis = if round < attempts {
                        self.analyze(&text, files).await
                    } else {
                        Diagnosis::default()
                    };
                    previous_failure = Some(text);
                }
            }
        }

        StageOutcome::ExhaustedAborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_is_the_plan() {
        assert_eq!(compile_request("Add a flag", None), "Add a flag");
    }

    #[test]
    fn test_retry_request_carries_raw_errors() {
        let request = compile_request("Add a flag", Some("error[E0308]: mismatched types\n"));
        assert!(request.starts_with("Add a flag\n\n"));
        assert!(request.contains(COMPILE_ERRORS_HEADING));
        assert!(request.contains("```\nerror[E0308]: mismatched types\n```"));
    }
}
