//! Best-effort lint repair.
//!
//! Every round ends in a commit of tracked changes, pass or fail, so fixes
//! the linter applied on its own are kept even when the stage gives up.

use tracing::{debug, info, warn};

use super::files::WorkingFileSet;
use super::session::Session;
use crate::editor::Stage;
use crate::state::StageOutcome;

impl Session<'_> {
    pub async fn static_analysis_loop(&self, lint: &str, files: &WorkingFileSet) -> StageOutcome {
        let attempts = self.deps.settings.static_analysis_attempts.max(1);

        for round in 1..=attempts {
            let outcome = match self.run_command(lint).await {
                Ok(()) => {
                    info!(round, "Static analysis passed");
                    Some(StageOutcome::Passed)
                }
                Err(text) if round == attempts => {
                    warn!(
                        "Static analysis still failing after {} round(s), continuing:\n{}",
                        attempts, text
                    );
                    Some(StageOutcome::ExhaustedTolerated)
                }
                Err(text) => {
                    let mut targets = self.deps.extractor.extract(&text, files.as_slice()).await;
                    if targets.is_empty() {
                        debug!("No file names found in lint output, using the working set");
                        targets = files.as_slice().to_vec();
                    }
                    // The raw lint output is the whole request.
                    if let Err(e) = self.edit(Stage::StaticAnalysis, round, &text, &targets).await {
                        warn!("Static analysis edit failed: {}", e);
                    }
                    None
                }
            };

            self.commit_tracked(Stage::StaticAnalysis, round).await;

            if let Some(outcome) = outcome {
                return outcome;
            }
        }

        StageOutcome::ExhaustedTolerated
    }
}
