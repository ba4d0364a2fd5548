//! Tag command - maintain the version tag of the source repository

use std::path::Path;

use clap::Args;
use tracing::warn;
use wsync_core::summary::render_tag_summary;
use wsync_core::{Config, GitCli, Secrets, TagDecision, VersionControl, VersionTagPolicy};

use crate::ci;

/// Create or move the version tag and report whether a sync is needed
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Report the decision without creating or moving any tag
    #[arg(long)]
    pub dry_run: bool,
}

impl TagArgs {
    pub fn execute(&self, config: &Config, source_dir: &Path) -> anyhow::Result<()> {
        let mut git = GitCli::new(&config.git);

        // Pushing tags needs the author token only
        let mut original_origin = None;
        if let Some(token) = Secrets::load()?.author_token() {
            git = git.with_token(token);
            let source = super::source_repository(config, &git, source_dir)?;
            original_origin = Some(git.origin_url(source_dir)?);
            git.rewrite_origin(source_dir, &source)?;
        }

        let result = self.decide(config, &git, source_dir);

        if let Some(url) = original_origin {
            if let Err(e) = git.set_origin_url(source_dir, &url) {
                warn!(error = %e, "Failed to restore origin of the source checkout");
            }
        }

        let decision = result?;
        ci::emit_output("should-sync", decision.should_sync())?;
        ci::emit_summary(&render_tag_summary(&decision))?;
        Ok(())
    }

    fn decide(
        &self,
        config: &Config,
        git: &GitCli,
        source_dir: &Path,
    ) -> wsync_core::Result<TagDecision> {
        let policy = VersionTagPolicy::new(
            git,
            source_dir,
            config.source.workflow_dir.clone(),
            config.source.repos_file.clone(),
            config.tags.last_synced.clone(),
        );

        if self.dry_run {
            policy.evaluate()
        } else {
            policy.run()
        }
    }
}
