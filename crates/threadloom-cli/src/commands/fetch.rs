//! `threadloom fetch <owner/repo>`: pulls Discussions from one
//! repository and reports what would be dispatched downstream. Exit
//! codes follow the documented contract: 0 success, 1 invalid argument
//! form (also used for any other fetch-time failure, since no third
//! code is defined), 2 missing credentials.

use clap::Args;
use threadloom_fetchers::{discussion_to_messages, GitHubDiscussionsFetcher};

use crate::output::{print_error, print_info, print_success};

/// Large enough to mean "no practical limit" for `--all` without special-casing pagination.
const ALL_DISCUSSIONS: usize = 100_000;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Repository in "owner/repo" form.
    repo: String,

    /// Maximum number of discussions to fetch.
    #[arg(long, conflicts_with = "all")]
    limit: Option<usize>,

    /// Fetch every discussion, paginating until exhausted.
    #[arg(long)]
    all: bool,

    /// Restrict to one discussion category, given by its display name.
    #[arg(long)]
    category: Option<String>,

    /// Fetch and report counts without dispatching anything downstream.
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(args: FetchArgs) -> i32 {
    let Some((owner, repo)) = args.repo.split_once('/') else {
        print_error(&format!("expected \"owner/repo\", got {:?}", args.repo));
        return 1;
    };
    if owner.is_empty() || repo.is_empty() {
        print_error(&format!("expected \"owner/repo\", got {:?}", args.repo));
        return 1;
    }
    if !args.all && args.limit == Some(0) {
        print_error("--limit must be greater than zero");
        return 1;
    }

    let Ok(token) = std::env::var("GITHUB_TOKEN") else {
        print_error("GITHUB_TOKEN is not set");
        return 2;
    };

    let fetcher = GitHubDiscussionsFetcher::new(token);

    let category_id = if let Some(name) = &args.category {
        match fetcher.resolve_category(owner, repo, name).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                print_error(&format!("no discussion category named {name:?} in {owner}/{repo}"));
                return 1;
            }
            Err(e) => {
                print_error(&format!("failed to resolve category: {e}"));
                return 1;
            }
        }
    } else {
        None
    };

    let limit = args.limit.unwrap_or(ALL_DISCUSSIONS);
    print_info(&format!("fetching discussions from {owner}/{repo}..."));

    let discussions = match fetcher.fetch_discussions(owner, repo, category_id.as_deref(), limit).await {
        Ok(discussions) => discussions,
        Err(e) => {
            print_error(&format!("fetch failed: {e}"));
            return 1;
        }
    };

    let total_messages: usize = discussions.iter().map(|d| discussion_to_messages(d).len()).sum();

    if args.dry_run {
        print_success(&format!(
            "dry run: {} discussions, {total_messages} messages total; nothing dispatched",
            discussions.len()
        ));
    } else {
        print_success(&format!(
            "fetched {} discussions, {total_messages} messages total",
            discussions.len()
        ));
    }

    0
}
