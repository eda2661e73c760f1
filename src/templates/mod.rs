//! Embedded templates written by `mend init`.

/// Default `mend.toml` configuration.
pub(crate) const MEND_TOML: &str = include_str!("mend.toml");

/// `.mend/.gitignore`, keeps cache, logs and run records out of commits.
pub(crate) const STATE_GITIGNORE: &str = "*\n";
