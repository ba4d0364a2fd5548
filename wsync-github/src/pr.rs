//! Pull request conversion

use octocrab::models::pulls::PullRequest as OctocrabPR;
use wsync_core::host::PullRequestRef;

/// Convert an octocrab pull request into the reference kept by a sync run
pub(crate) fn pull_request_ref(pr: OctocrabPR) -> PullRequestRef {
    PullRequestRef {
        number: pr.number,
        title: pr.title.unwrap_or_default(),
        url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
        merged: pr.merged_at.is_some(),
        head: pr.head.ref_field,
        base: pr.base.ref_field,
    }
}
