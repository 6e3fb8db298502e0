//! engine::parse
//!
//! Command-line tokenizing and parsing into [`GitCommand`].
//!
//! # Rules
//!
//! - Whitespace separates words; runs of whitespace are one separator.
//! - Double or single quotes group words and are removed.
//! - The first word must be `git`.
//! - Options come before positional arguments, except after `--` where
//!   everything is a path.
//!
//! # Example
//!
//! ```
//! use gitdojo::engine::command::GitCommand;
//! use gitdojo::engine::parse::parse_command;
//!
//! let cmd = parse_command(r#"git commit -m "Fix the   typo""#).unwrap();
//! assert_eq!(
//!     cmd,
//!     GitCommand::Commit { message: Some("Fix the   typo".into()), all: false }
//! );
//! ```

use thiserror::Error;

use super::command::{
    BranchAction, CheckoutTarget, GitCommand, MergeAction, RemoteAction, ResetMode,
};

/// Errors from parsing a command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("'{0}' is not a recognized command. Git commands start with 'git'.")]
    NotRecognized(String),

    #[error("git: '{0}' is not a git command. See 'git help'.")]
    UnknownSubcommand(String),

    #[error("error: unknown option `{option}'\nusage: {usage}")]
    UnknownOption { option: String, usage: &'static str },

    #[error("error: option `{option}' requires a value\nusage: {usage}")]
    MissingValue { option: String, usage: &'static str },

    #[error("error: option `{option}' expects a number, got '{value}'")]
    InvalidNumber { option: String, value: String },

    #[error("usage: {usage}")]
    Usage { usage: &'static str },

    #[error("fatal: {0}")]
    Incompatible(&'static str),

    #[error("error: unterminated quote in command line")]
    UnterminatedQuote,
}

pub mod usage {
    pub const ADD: &str = "git add <pathspec>... | git add . | git add -A";
    pub const COMMIT: &str = "git commit [-a] -m <message>";
    pub const LOG: &str = "git log [--oneline] [-n <number>]";
    pub const DIFF: &str = "git diff [--staged | --cached] [<path>]";
    pub const BRANCH: &str = "git branch [<name> [<start-point>]] | git branch (-d | -D) <name>";
    pub const CHECKOUT: &str =
        "git checkout <branch> | git checkout -b <new-branch> [<start-point>] | git checkout -- <path>...";
    pub const MERGE: &str = "git merge <branch> | git merge --abort";
    pub const RESET: &str =
        "git reset [--soft | --mixed | --hard] [<commit>] | git reset [<commit>] [--] <path>...";
    pub const REVERT: &str = "git revert <commit>";
    pub const REMOTE: &str = "git remote [-v] | git remote add <name> <url>";
    pub const PUSH: &str = "git push [-u] [<remote> [<branch>]]";
    pub const PULL: &str = "git pull [<remote> [<branch>]]";
    pub const FETCH: &str = "git fetch [<remote> [<branch>]]";
    pub const CLONE: &str = "git clone <url>";
    pub const RESTORE: &str = "git restore [--staged] [--] <path>...";
    pub const NONE: &str = "git <command>";
}

/// Split a line into words, honoring quotes.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => word.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

/// Walks a subcommand's arguments, options first.
struct Cursor<'a> {
    usage: &'static str,
    args: &'a [String],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(usage: &'static str, args: &'a [String]) -> Self {
        Self {
            usage,
            args,
            pos: 0,
        }
    }

    /// The next word if it is an option (`-x`, `--long`), consuming it.
    fn option(&mut self) -> Option<&'a str> {
        let word = self.args.get(self.pos)?;
        if word.len() > 1 && word.starts_with('-') && word != "--" {
            self.pos += 1;
            Some(word.as_str())
        } else {
            None
        }
    }

    /// The word after an option that takes a value.
    fn value(&mut self, option: &str) -> Result<String, ParseError> {
        match self.args.get(self.pos) {
            Some(word) => {
                self.pos += 1;
                Ok(word.clone())
            }
            None => Err(ParseError::MissingValue {
                option: option.to_string(),
                usage: self.usage,
            }),
        }
    }

    fn unknown(&self, option: &str) -> ParseError {
        ParseError::UnknownOption {
            option: option.to_string(),
            usage: self.usage,
        }
    }

    fn usage_error(&self) -> ParseError {
        ParseError::Usage { usage: self.usage }
    }

    /// Remaining words split at `--` into (positionals, paths).
    ///
    /// An option appearing among the positionals is misplaced.
    fn rest(self) -> Result<(Vec<String>, Option<Vec<String>>), ParseError> {
        let remaining = &self.args[self.pos..];
        let (before, after) = match remaining.iter().position(|w| w == "--") {
            Some(split) => (&remaining[..split], Some(remaining[split + 1..].to_vec())),
            None => (remaining, None),
        };
        if let Some(misplaced) = before.iter().find(|w| w.len() > 1 && w.starts_with('-')) {
            return Err(self.unknown(misplaced));
        }
        Ok((before.to_vec(), after))
    }

    /// Remaining words, none of them options and no `--`.
    fn positionals(self) -> Result<Vec<String>, ParseError> {
        let usage = self.usage;
        match self.rest()? {
            (words, None) => Ok(words),
            (_, Some(_)) => Err(ParseError::Usage { usage }),
        }
    }
}

fn parse_number(option: &str, value: &str) -> Result<usize, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        option: option.to_string(),
        value: value.to_string(),
    })
}

/// Parse a full command line.
pub fn parse_command(line: &str) -> Result<GitCommand, ParseError> {
    let words = tokenize(line)?;
    let Some((first, rest)) = words.split_first() else {
        return Err(ParseError::NotRecognized(String::new()));
    };
    if first != "git" {
        return Err(ParseError::NotRecognized(first.clone()));
    }
    let Some((sub, args)) = rest.split_first() else {
        return Ok(GitCommand::Help);
    };
    parse_subcommand(sub, args)
}

/// Parse the words after `git`.
pub fn parse_subcommand(sub: &str, args: &[String]) -> Result<GitCommand, ParseError> {
    match sub {
        "init" => no_args(usage::NONE, args, GitCommand::Init),
        "status" => no_args(usage::NONE, args, GitCommand::Status),
        "help" | "--help" | "-h" => Ok(GitCommand::Help),
        "add" => parse_add(args),
        "commit" => parse_commit(args),
        "log" => parse_log(args),
        "diff" => parse_diff(args),
        "branch" => parse_branch(args),
        "checkout" => parse_checkout(args),
        "merge" => parse_merge(args),
        "reset" => parse_reset(args),
        "revert" => parse_revert(args),
        "remote" => parse_remote(args),
        "push" => parse_push(args),
        "pull" => parse_pull(args),
        "fetch" => parse_fetch(args),
        "clone" => parse_clone(args),
        "restore" => parse_restore(args),
        other => Err(ParseError::UnknownSubcommand(other.to_string())),
    }
}

fn no_args(
    usage: &'static str,
    args: &[String],
    command: GitCommand,
) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage, args);
    if let Some(option) = cursor.option() {
        return Err(cursor.unknown(option));
    }
    if !cursor.positionals()?.is_empty() {
        return Err(ParseError::Usage { usage });
    }
    Ok(command)
}

fn parse_add(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::ADD, args);
    let mut all = false;
    while let Some(option) = cursor.option() {
        match option {
            "-A" | "--all" => all = true,
            other => return Err(cursor.unknown(other)),
        }
    }
    let usage_error = cursor.usage_error();
    let (mut paths, after) = cursor.rest()?;
    paths.extend(after.unwrap_or_default());
    if paths.iter().any(|p| p == ".") {
        all = true;
        paths.retain(|p| p != ".");
    }
    if !all && paths.is_empty() {
        return Err(usage_error);
    }
    Ok(GitCommand::Add { paths, all })
}

fn parse_commit(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::COMMIT, args);
    let mut message = None;
    let mut all = false;
    while let Some(option) = cursor.option() {
        match option {
            "-m" | "--message" => message = Some(cursor.value(option)?),
            "-a" | "--all" => all = true,
            "-am" | "-ma" => {
                all = true;
                message = Some(cursor.value(option)?);
            }
            other => match other.strip_prefix("--message=") {
                Some(value) => message = Some(value.to_string()),
                None => return Err(cursor.unknown(other)),
            },
        }
    }
    let usage_error = cursor.usage_error();
    if !cursor.positionals()?.is_empty() {
        return Err(usage_error);
    }
    Ok(GitCommand::Commit { message, all })
}

fn parse_log(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::LOG, args);
    let mut oneline = false;
    let mut limit = None;
    while let Some(option) = cursor.option() {
        match option {
            "--oneline" => oneline = true,
            "-n" | "--max-count" => {
                let value = cursor.value(option)?;
                limit = Some(parse_number(option, &value)?);
            }
            other => {
                let inline = other
                    .strip_prefix("--max-count=")
                    .or_else(|| other.strip_prefix("-n"))
                    .or_else(|| other.strip_prefix('-').filter(|d| d.chars().all(|c| c.is_ascii_digit())));
                match inline {
                    Some(value) => limit = Some(parse_number(other, value)?),
                    None => return Err(cursor.unknown(other)),
                }
            }
        }
    }
    let usage_error = cursor.usage_error();
    if !cursor.positionals()?.is_empty() {
        return Err(usage_error);
    }
    Ok(GitCommand::Log { oneline, limit })
}

fn parse_diff(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::DIFF, args);
    let mut staged = false;
    while let Some(option) = cursor.option() {
        match option {
            "--staged" | "--cached" => staged = true,
            other => return Err(cursor.unknown(other)),
        }
    }
    let usage_error = cursor.usage_error();
    let (mut paths, after) = cursor.rest()?;
    paths.extend(after.unwrap_or_default());
    if paths.len() > 1 {
        return Err(usage_error);
    }
    Ok(GitCommand::Diff {
        staged,
        path: paths.pop(),
    })
}

fn parse_branch(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::BRANCH, args);
    let mut delete: Option<bool> = None;
    while let Some(option) = cursor.option() {
        match option {
            "-d" | "--delete" => delete = Some(delete.unwrap_or(false)),
            "-D" => delete = Some(true),
            "-f" | "--force" => delete = delete.map(|_| true),
            other => return Err(cursor.unknown(other)),
        }
    }
    let usage_error = cursor.usage_error();
    let mut words = cursor.positionals()?.into_iter();
    let action = match (delete, words.next(), words.next(), words.next()) {
        (None, None, _, _) => BranchAction::List,
        (None, Some(name), start, None) => BranchAction::Create { name, start },
        (Some(force), Some(name), None, _) => BranchAction::Delete { name, force },
        (Some(_), None, _, _) => {
            return Err(ParseError::Incompatible("branch name required"));
        }
        _ => return Err(usage_error),
    };
    Ok(GitCommand::Branch(action))
}

fn parse_checkout(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::CHECKOUT, args);
    let mut new_branch = None;
    while let Some(option) = cursor.option() {
        match option {
            "-b" => new_branch = Some(cursor.value(option)?),
            other => return Err(cursor.unknown(other)),
        }
    }
    let usage_error = cursor.usage_error();
    let (mut words, paths) = cursor.rest()?;
    let target = match (new_branch, paths) {
        (Some(name), None) if words.len() <= 1 => CheckoutTarget::NewBranch {
            name,
            start: words.pop(),
        },
        (None, Some(paths)) if words.is_empty() && !paths.is_empty() => {
            CheckoutTarget::Paths(paths)
        }
        (None, None) if words.len() == 1 => CheckoutTarget::Ref(words.remove(0)),
        (None, None) if words.len() > 1 => CheckoutTarget::Paths(words),
        _ => return Err(usage_error),
    };
    Ok(GitCommand::Checkout(target))
}

fn parse_merge(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::MERGE, args);
    let mut abort = false;
    while let Some(option) = cursor.option() {
        match option {
            "--abort" => abort = true,
            other => return Err(cursor.unknown(other)),
        }
    }
    let usage_error = cursor.usage_error();
    let mut words = cursor.positionals()?;
    match (abort, words.len()) {
        (true, 0) => Ok(GitCommand::Merge(MergeAction::Abort)),
        (false, 1) => Ok(GitCommand::Merge(MergeAction::Branch(words.remove(0)))),
        _ => Err(usage_error),
    }
}

fn parse_reset(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::RESET, args);
    let mut mode = None;
    while let Some(option) = cursor.option() {
        let next = match option {
            "--soft" => ResetMode::Soft,
            "--mixed" => ResetMode::Mixed,
            "--hard" => ResetMode::Hard,
            other => return Err(cursor.unknown(other)),
        };
        if mode.is_some_and(|m| m != next) {
            return Err(ParseError::Incompatible("options are mutually exclusive"));
        }
        mode = Some(next);
    }
    let usage_error = cursor.usage_error();
    let (mut words, after) = cursor.rest()?;

    let (target, paths) = match after {
        Some(paths) if words.len() <= 1 => (words.pop(), paths),
        Some(_) => return Err(usage_error),
        None if words.len() <= 1 => (words.pop(), Vec::new()),
        None => (Some(words.remove(0)), words),
    };
    if !paths.is_empty() {
        match mode {
            Some(ResetMode::Hard) => {
                return Err(ParseError::Incompatible("Cannot do hard reset with paths."))
            }
            Some(ResetMode::Soft) => {
                return Err(ParseError::Incompatible("Cannot do soft reset with paths."))
            }
            _ => {}
        }
    }
    Ok(GitCommand::Reset {
        mode,
        target,
        paths,
    })
}

fn parse_revert(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::REVERT, args);
    if let Some(option) = cursor.option() {
        return Err(cursor.unknown(option));
    }
    let usage_error = cursor.usage_error();
    let mut words = cursor.positionals()?;
    if words.len() != 1 {
        return Err(usage_error);
    }
    Ok(GitCommand::Revert {
        commit: words.remove(0),
    })
}

fn parse_remote(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::REMOTE, args);
    let mut verbose = false;
    while let Some(option) = cursor.option() {
        match option {
            "-v" | "--verbose" => verbose = true,
            other => return Err(cursor.unknown(other)),
        }
    }
    let usage_error = cursor.usage_error();
    let words = cursor.positionals()?;
    match words.as_slice() {
        [] => Ok(GitCommand::Remote(RemoteAction::List { verbose })),
        [add, name, url] if add == "add" && !verbose => Ok(GitCommand::Remote(RemoteAction::Add {
            name: name.clone(),
            url: url.clone(),
        })),
        [sub, ..] if sub != "add" => Err(ParseError::UnknownSubcommand(format!("remote {sub}"))),
        _ => Err(usage_error),
    }
}

/// `[<remote> [<branch>]]`
fn remote_and_branch(
    words: Vec<String>,
    usage: &'static str,
) -> Result<(Option<String>, Option<String>), ParseError> {
    let mut words = words.into_iter();
    let result = (words.next(), words.next());
    if words.next().is_some() {
        return Err(ParseError::Usage { usage });
    }
    Ok(result)
}

fn parse_push(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::PUSH, args);
    let mut set_upstream = false;
    while let Some(option) = cursor.option() {
        match option {
            "-u" | "--set-upstream" => set_upstream = true,
            other => return Err(cursor.unknown(other)),
        }
    }
    let (remote, branch) = remote_and_branch(cursor.positionals()?, usage::PUSH)?;
    Ok(GitCommand::Push {
        set_upstream,
        remote,
        branch,
    })
}

fn parse_pull(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::PULL, args);
    if let Some(option) = cursor.option() {
        return Err(cursor.unknown(option));
    }
    let (remote, branch) = remote_and_branch(cursor.positionals()?, usage::PULL)?;
    Ok(GitCommand::Pull { remote, branch })
}

fn parse_fetch(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::FETCH, args);
    if let Some(option) = cursor.option() {
        return Err(cursor.unknown(option));
    }
    let (remote, branch) = remote_and_branch(cursor.positionals()?, usage::FETCH)?;
    Ok(GitCommand::Fetch { remote, branch })
}

fn parse_clone(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::CLONE, args);
    if let Some(option) = cursor.option() {
        return Err(cursor.unknown(option));
    }
    let usage_error = cursor.usage_error();
    let mut words = cursor.positionals()?;
    if words.len() != 1 {
        return Err(usage_error);
    }
    Ok(GitCommand::Clone {
        url: words.remove(0),
    })
}

fn parse_restore(args: &[String]) -> Result<GitCommand, ParseError> {
    let mut cursor = Cursor::new(usage::RESTORE, args);
    let mut staged = false;
    while let Some(option) = cursor.option() {
        match option {
            "-S" | "--staged" => staged = true,
            other => return Err(cursor.unknown(other)),
        }
    }
    let usage_error = cursor.usage_error();
    let (mut paths, after) = cursor.rest()?;
    paths.extend(after.unwrap_or_default());
    if paths.is_empty() {
        return Err(usage_error);
    }
    Ok(GitCommand::Restore { staged, paths })
}
