//! remote, push, fetch, pull, clone
//!
//! Remotes are simulated. `push` only moves this repository's
//! remote-tracking pointers; `fetch`, `pull` and `clone` read whatever the
//! engine's catalog has registered under the remote's URL.

use super::{merge, CommandOutput, EngineError};
use crate::core::graph::CommitGraph;
use crate::core::state::{Remote, RepositoryState, StateError};
use crate::core::types::BranchName;
use crate::engine::command::{MergeAction, RemoteAction};
use crate::engine::Engine;

pub(super) fn remote(
    state: &RepositoryState,
    action: &RemoteAction,
) -> Result<CommandOutput, EngineError> {
    match action {
        RemoteAction::List { verbose } => {
            let lines: Vec<String> = state
                .remotes
                .iter()
                .map(|r| {
                    if *verbose {
                        format!("{0}\t{1} (fetch)\n{0}\t{1} (push)", r.name, r.url)
                    } else {
                        r.name.to_string()
                    }
                })
                .collect();
            Ok(CommandOutput::unchanged(lines.join("\n"), state))
        }
        RemoteAction::Add { name, url } => {
            let next = state.add_remote(name, url)?;
            Ok(CommandOutput::new(String::new(), next))
        }
    }
}

/// The named remote, or `origin`, or the only remote there is.
fn pick_remote<'a>(
    state: &'a RepositoryState,
    name: Option<&str>,
    missing: &str,
) -> Result<&'a Remote, EngineError> {
    if let Some(name) = name {
        return state
            .find_remote(name)
            .ok_or_else(|| StateError::RemoteNotFound(name.to_string()).into());
    }
    if let Some(origin) = state.find_remote("origin") {
        return Ok(origin);
    }
    match state.remotes.as_slice() {
        [only] => Ok(only),
        _ => Err(EngineError::precondition(missing)),
    }
}

fn current_branch_name(state: &RepositoryState, given: Option<&str>) -> Result<String, EngineError> {
    if let Some(branch) = given {
        return Ok(branch.to_string());
    }
    if state.is_detached() {
        return Err(EngineError::precondition(
            "fatal: You are not currently on a branch.",
        ));
    }
    Ok(state.head.clone())
}

pub(super) fn push(
    engine: &Engine,
    state: &RepositoryState,
    set_upstream: bool,
    remote: Option<&str>,
    branch: Option<&str>,
) -> Result<CommandOutput, EngineError> {
    let remote = pick_remote(
        state,
        remote,
        "fatal: No configured push destination.\n\
         Either specify the URL from the command-line or configure a remote repository using\n\n    \
         git remote add <name> <url>\n\n\
         and then push using the remote name\n\n    git push <name>",
    )?;
    let branch = current_branch_name(state, branch)?;
    let local = state
        .find_branch(&branch)
        .and_then(|b| b.commit_hash.clone())
        .ok_or_else(|| {
            EngineError::precondition(format!(
                "error: src refspec {branch} does not match any\n\
                 error: failed to push some refs to '{}'",
                remote.url
            ))
        })?;

    let url = remote.url.clone();
    let name = remote.name.to_string();
    let tracking = if set_upstream {
        format!("\nbranch '{branch}' set up to track '{name}/{branch}'.")
    } else {
        String::new()
    };
    let line = match remote.branch_tip(&branch) {
        Some(tip) if *tip == local => {
            return Ok(CommandOutput::unchanged(
                format!("Everything up-to-date{tracking}"),
                state,
            ));
        }
        Some(tip) => {
            let graph = CommitGraph::from_state(state);
            if !graph.is_ancestor(tip, &local) {
                return Err(EngineError::precondition(format!(
                    "To {url}\n ! [rejected]        {branch} -> {branch} (fetch first)\n\
                     error: failed to push some refs to '{url}'\n\
                     hint: Updates were rejected because the remote contains work that you do\n\
                     hint: not have locally. Integrate the remote changes (e.g.\n\
                     hint: 'git pull ...') before pushing again."
                )));
            }
            format!(
                "   {}..{}  {branch} -> {branch}",
                engine.short(tip),
                engine.short(&local)
            )
        }
        None => format!(" * [new branch]      {branch} -> {branch}"),
    };

    let next = state.set_remote_branch(&name, &branch, local)?;
    Ok(CommandOutput::new(format!("To {url}\n{line}{tracking}"), next))
}

/// Import the catalog's view of `remote` and move its tracking branches.
/// Import the remote's commits and move its tracking refs. With `only`,
/// just that branch's tracking ref moves.
fn fetch_remote(
    engine: &Engine,
    state: &RepositoryState,
    remote: &Remote,
    only: Option<&str>,
) -> Result<CommandOutput, EngineError> {
    let Some(upstream) = engine.catalog().lookup(&remote.url) else {
        tracing::debug!(url = %remote.url, "remote not in catalog; nothing to fetch");
        return Ok(CommandOutput::unchanged(String::new(), state));
    };
    if let Some(name) = only {
        let known = upstream
            .find_branch(name)
            .is_some_and(|b| b.commit_hash.is_some());
        if !known {
            return Err(EngineError::precondition(format!(
                "fatal: couldn't find remote ref {name}"
            )));
        }
    }
    let mut next = state.import_commits(upstream.commits.iter())?;
    let graph = CommitGraph::from_state(&next);
    let mut lines = Vec::new();
    let selected = upstream
        .branches
        .iter()
        .filter(|b| only.map_or(true, |name| b.name.as_str() == name));
    for branch in selected {
        let Some(tip) = &branch.commit_hash else {
            continue;
        };
        let name = branch.name.as_str();
        let tracking = format!("{}/{name}", remote.name);
        match remote.branch_tip(name) {
            Some(old) if old == tip => continue,
            Some(old) if graph.is_ancestor(old, tip) => lines.push(format!(
                "   {}..{}  {name:<10} -> {tracking}",
                engine.short(old),
                engine.short(tip)
            )),
            Some(old) => lines.push(format!(
                " + {}...{} {name:<10} -> {tracking}  (forced update)",
                engine.short(old),
                engine.short(tip)
            )),
            None => lines.push(format!(" * [new branch]      {name:<10} -> {tracking}")),
        }
        next = next.set_remote_branch(remote.name.as_str(), name, tip.clone())?;
    }
    if lines.is_empty() {
        return Ok(CommandOutput::new(String::new(), next));
    }
    let text = format!("From {}\n{}", remote.url, lines.join("\n"));
    Ok(CommandOutput::new(text, next))
}

pub(super) fn fetch(
    engine: &Engine,
    state: &RepositoryState,
    remote: Option<&str>,
    branch: Option<&str>,
) -> Result<CommandOutput, EngineError> {
    let remote = pick_remote(state, remote, "fatal: No remote repository specified.")?;
    fetch_remote(engine, state, remote, branch)
}

/// `fetch` followed by a merge of the remote-tracking branch.
pub(super) fn pull(
    engine: &Engine,
    state: &RepositoryState,
    remote: Option<&str>,
    branch: Option<&str>,
) -> Result<CommandOutput, EngineError> {
    let remote = pick_remote(state, remote, "fatal: No remote repository specified.")?;
    let branch = current_branch_name(state, branch)?;
    let fetched = fetch_remote(engine, state, remote, Some(branch.as_str()))?;

    let remote_name = remote.name.to_string();
    let has_ref = fetched
        .state
        .find_remote(&remote_name)
        .is_some_and(|r| r.branch_tip(&branch).is_some());
    if !has_ref {
        return Err(EngineError::precondition(format!(
            "fatal: couldn't find remote ref {branch}"
        )));
    }
    let merged = merge::merge(
        engine,
        &fetched.state,
        &MergeAction::Branch(format!("{remote_name}/{branch}")),
    )?;
    let text = [fetched.text, merged.text]
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(CommandOutput::new(text, merged.state))
}

/// Directory name git would clone `url` into.
fn clone_dir(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last)
}

pub(super) fn clone(
    engine: &Engine,
    state: &RepositoryState,
    url: &str,
) -> Result<CommandOutput, EngineError> {
    let dir = clone_dir(url);
    if state.is_initialized() {
        return Err(EngineError::precondition(format!(
            "fatal: destination path '{dir}' already exists and is not an empty directory."
        )));
    }
    let cloning = format!("Cloning into '{dir}'...");

    let upstream = engine.catalog().lookup(url);
    let head = upstream.as_ref().and_then(|up| {
        up.current_branch()
            .filter(|b| b.commit_hash.is_some())
            .or_else(|| up.branches.iter().find(|b| b.commit_hash.is_some()))
            .cloned()
    });
    let (Some(upstream), Some(head)) = (upstream, head) else {
        let next = state
            .with_working_snapshot(&Default::default())
            .initialize(&engine.config().default_branch())
            .add_remote("origin", url)?;
        return Ok(CommandOutput::new(
            format!("{cloning}\nwarning: You appear to have cloned an empty repository."),
            next,
        ));
    };

    let branch: BranchName = head.name;
    let mut next = state
        .initialize(&branch)
        .import_commits(upstream.commits.iter())?
        .add_remote("origin", url)?;
    for remote_branch in &upstream.branches {
        if let Some(tip) = &remote_branch.commit_hash {
            next = next.set_remote_branch("origin", remote_branch.name.as_str(), tip.clone())?;
        }
    }
    let Some(tip) = head.commit_hash else {
        return Ok(CommandOutput::new(cloning, next));
    };
    let tree = next.commit(&tip).map(|c| c.tree.clone()).unwrap_or_default();
    let next = next
        .with_head_moved(tip)
        .with_staging(Default::default())
        .with_working_snapshot(&tree);
    tracing::debug!(url, commits = next.commits.len(), "cloned from catalog");
    Ok(CommandOutput::new(format!("{cloning}\ndone."), next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UtcTimestamp;
    use crate::engine::{FixedClock, InMemoryCatalog};

    const URL: &str = "https://dojo.example/upstream.git";

    fn clock() -> FixedClock {
        FixedClock(UtcTimestamp::parse("2024-07-07T07:00:00Z").unwrap())
    }

    fn run_with(engine: &Engine, state: &RepositoryState, lines: &[&str]) -> RepositoryState {
        lines.iter().fold(state.clone(), |state, line| {
            let run = engine.execute(&state, line).unwrap();
            assert!(run.is_success(), "{line}: {:?}", run.error);
            run.new_state
        })
    }

    fn upstream() -> RepositoryState {
        let engine = Engine::default().with_clock(clock());
        let state = run_with(&engine, &RepositoryState::new("up"), &["git init"])
            .with_file("README.md", "upstream\n");
        run_with(&engine, &state, &["git add README.md", "git commit -m upstream"])
    }

    fn engine_with_upstream(up: RepositoryState) -> Engine {
        Engine::default()
            .with_clock(clock())
            .with_catalog(InMemoryCatalog::new().with(URL, up))
    }

    #[test]
    fn clone_copies_history_and_checks_out() {
        let up = upstream();
        let engine = engine_with_upstream(up.clone());
        let run = engine.execute(&RepositoryState::new("me"), &format!("git clone {URL}")).unwrap();
        assert_eq!(run.output, "Cloning into 'upstream'...\ndone.");
        let state = run.new_state;
        assert_eq!(state.head, "main");
        assert_eq!(state.head_oid(), up.head_oid());
        assert_eq!(state.working_directory["README.md"].content, "upstream\n");
        assert_eq!(
            state.find_remote("origin").unwrap().branch_tip("main"),
            up.head_oid().as_ref()
        );
    }

    #[test]
    fn clone_of_unknown_url_is_empty() {
        let engine = Engine::default().with_clock(clock());
        let run = engine
            .execute(&RepositoryState::new("me"), "git clone https://nowhere/x.git")
            .unwrap();
        assert!(run.output.ends_with("warning: You appear to have cloned an empty repository."));
        assert!(run.new_state.is_initialized());
        assert!(run.new_state.find_remote("origin").is_some());
    }

    #[test]
    fn push_creates_then_updates_tracking_branch() {
        let engine = Engine::default().with_clock(clock());
        let state = run_with(&engine, &upstream(), &[&format!("git remote add origin {URL}")]);
        let first = engine.execute(&state, "git push -u origin main").unwrap();
        assert_eq!(
            first.output,
            format!("To {URL}\n * [new branch]      main -> main\nbranch 'main' set up to track 'origin/main'.")
        );
        let again = engine.execute(&first.new_state, "git push").unwrap();
        assert_eq!(again.output, "Everything up-to-date");

        let ahead = run_with(&engine, &first.new_state.with_file("README.md", "more\n"), &["git commit -am more"]);
        let pushed = engine.execute(&ahead, "git push").unwrap();
        assert!(pushed.output.contains(".."));
        assert_eq!(
            pushed.new_state.find_remote("origin").unwrap().branch_tip("main"),
            ahead.head_oid().as_ref()
        );
    }

    #[test]
    fn push_without_remote_fails() {
        let engine = Engine::default().with_clock(clock());
        let run = engine.execute(&upstream(), "git push").unwrap();
        assert!(run.error.unwrap().starts_with("fatal: No configured push destination."));
    }

    #[test]
    fn pull_fast_forwards_from_catalog() {
        let up = upstream();
        let engine = engine_with_upstream(up.clone());
        let cloned = run_with(&engine, &RepositoryState::new("me"), &[&format!("git clone {URL}")]);

        let moved_up = run_with(&engine, &up.with_file("README.md", "newer\n"), &["git commit -am newer"]);
        let engine = engine_with_upstream(moved_up.clone());
        let run = engine.execute(&cloned, "git pull").unwrap();
        assert!(run.is_success(), "{:?}", run.error);
        assert!(run.output.starts_with(&format!("From {URL}\n")));
        assert!(run.output.contains("Fast-forward"));
        assert_eq!(run.new_state.head_oid(), moved_up.head_oid());
        assert_eq!(run.new_state.working_directory["README.md"].content, "newer\n");
    }

    #[test]
    fn fetch_of_one_branch_moves_only_its_tracking_ref() {
        let up = upstream();
        let engine = engine_with_upstream(up.clone());
        let cloned = run_with(&engine, &RepositoryState::new("me"), &[&format!("git clone {URL}")]);

        let moved_up = run_with(
            &engine,
            &up.with_file("README.md", "newer\n"),
            &["git commit -am newer", "git branch topic"],
        );
        let engine = engine_with_upstream(moved_up.clone());
        let run = engine.execute(&cloned, "git fetch origin main").unwrap();
        assert!(run.is_success(), "{:?}", run.error);
        assert!(run.output.contains("main       -> origin/main"));
        let origin = run.new_state.find_remote("origin").unwrap();
        assert_eq!(origin.branch_tip("main"), moved_up.head_oid().as_ref());
        assert_eq!(origin.branch_tip("topic"), None);
        // Local branch and working tree are untouched by a fetch
        assert_eq!(run.new_state.head_oid(), cloned.head_oid());

        let missing = engine.execute(&cloned, "git fetch origin nope").unwrap();
        assert_eq!(missing.error.as_deref(), Some("fatal: couldn't find remote ref nope"));
        assert_eq!(missing.new_state, cloned);
    }

    #[test]
    fn remote_listing() {
        let engine = Engine::default().with_clock(clock());
        let state = run_with(&engine, &upstream(), &[&format!("git remote add origin {URL}")]);
        assert_eq!(engine.execute(&state, "git remote").unwrap().output, "origin");
        assert_eq!(
            engine.execute(&state, "git remote -v").unwrap().output,
            format!("origin\t{URL} (fetch)\norigin\t{URL} (push)")
        );
    }

    #[test]
    fn clone_dir_strips_suffix() {
        assert_eq!(clone_dir("https://x.org/team/story.git"), "story");
        assert_eq!(clone_dir("git@x.org:team/story.git/"), "story");
        assert_eq!(clone_dir("local"), "local");
    }
}
