//! merge::diff
//!
//! Line diffs: LCS matching, edit scripts and unified output.
//!
//! Lines keep their trailing `\n`, so `"a"` and `"a\n"` are different lines
//! and a missing final newline survives a round trip.

use crate::core::object::Blob;

/// Context lines around each hunk.
pub const CONTEXT: usize = 3;

/// One step of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp<'a> {
    Equal(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

/// Split text into lines, each keeping its terminator.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Index pairs `(a, b)` of a longest common subsequence of lines.
///
/// Common prefix and suffix are matched directly. The middle is split with
/// Hirschberg's method, so memory stays linear in the input length.
pub fn lcs_matches(a: &[&str], b: &[&str]) -> Vec<(usize, usize)> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut matches: Vec<(usize, usize)> = (0..prefix).map(|i| (i, i)).collect();
    split_matches(
        &a[prefix..a.len() - suffix],
        &b[prefix..b.len() - suffix],
        (prefix, prefix),
        &mut matches,
    );
    matches.extend((0..suffix).map(|s| (a.len() - suffix + s, b.len() - suffix + s)));
    matches
}

/// Append the matches of `a` against `b`, shifted by `offset`, in order.
fn split_matches(a: &[&str], b: &[&str], offset: (usize, usize), out: &mut Vec<(usize, usize)>) {
    if a.is_empty() || b.is_empty() {
        return;
    }
    if a.len() == 1 {
        if let Some(j) = b.iter().position(|line| *line == a[0]) {
            out.push((offset.0, offset.1 + j));
        }
        return;
    }

    let mid = a.len() / 2;
    let forward = lcs_lengths(a[..mid].iter().copied(), b.iter().copied());
    // backward[m - k] = LCS length of a[mid..] and b[k..]
    let backward = lcs_lengths(a[mid..].iter().rev().copied(), b.iter().rev().copied());
    let m = b.len();
    let split = (0..=m)
        .max_by_key(|&k| (forward[k] + backward[m - k], std::cmp::Reverse(k)))
        .unwrap_or(0);

    split_matches(&a[..mid], &b[..split], offset, out);
    split_matches(&a[mid..], &b[split..], (offset.0 + mid, offset.1 + split), out);
}

/// Last row of the LCS table: `row[j]` is the LCS length of all of `a`
/// against the first `j` lines of `b`. Keeps two rows only.
fn lcs_lengths<'a>(
    a: impl Iterator<Item = &'a str>,
    b: impl Iterator<Item = &'a str> + Clone,
) -> Vec<usize> {
    let width = b.clone().count() + 1;
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];
    for x in a {
        for (j, y) in b.clone().enumerate() {
            cur[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev
}

/// Edit script turning `old` into `new`; deletions precede insertions.
pub fn diff_lines<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<DiffOp<'a>> {
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    let (mut i, mut j) = (0, 0);
    for (mi, mj) in lcs_matches(old, new) {
        ops.extend(old[i..mi].iter().map(|l| DiffOp::Delete(l)));
        ops.extend(new[j..mj].iter().map(|l| DiffOp::Insert(l)));
        ops.push(DiffOp::Equal(old[mi]));
        i = mi + 1;
        j = mj + 1;
    }
    ops.extend(old[i..].iter().map(|l| DiffOp::Delete(l)));
    ops.extend(new[j..].iter().map(|l| DiffOp::Insert(l)));
    ops
}

/// Inserted and deleted line counts between two texts.
pub fn line_stats(old: &str, new: &str) -> (usize, usize) {
    let (old_lines, new_lines) = (split_lines(old), split_lines(new));
    diff_lines(&old_lines, &new_lines)
        .iter()
        .fold((0, 0), |(ins, del), op| match op {
            DiffOp::Insert(_) => (ins + 1, del),
            DiffOp::Delete(_) => (ins, del + 1),
            DiffOp::Equal(_) => (ins, del),
        })
}

/// A `diff --git` block for one path. `None` means the file is absent on
/// that side. Returns an empty string when both sides are identical.
pub fn unified_diff(path: &str, old: Option<&str>, new: Option<&str>, abbrev: usize) -> String {
    if old == new {
        return String::new();
    }
    let old_text = old.unwrap_or("");
    let new_text = new.unwrap_or("");
    let old_hash = old.map(|t| Blob::from_content(t).hash.short(abbrev).to_string());
    let new_hash = new.map(|t| Blob::from_content(t).hash.short(abbrev).to_string());
    let zeros = "0".repeat(abbrev);

    let mut out = format!("diff --git a/{path} b/{path}\n");
    match (old, new) {
        (None, Some(_)) => out.push_str("new file mode 100644\n"),
        (Some(_), None) => out.push_str("deleted file mode 100644\n"),
        _ => {}
    }
    out.push_str(&format!(
        "index {}..{}{}\n",
        old_hash.as_deref().unwrap_or(&zeros),
        new_hash.as_deref().unwrap_or(&zeros),
        if old.is_some() && new.is_some() { " 100644" } else { "" }
    ));
    out.push_str(&match old {
        Some(_) => format!("--- a/{path}\n"),
        None => "--- /dev/null\n".to_string(),
    });
    out.push_str(&match new {
        Some(_) => format!("+++ b/{path}\n"),
        None => "+++ /dev/null\n".to_string(),
    });

    let (old_lines, new_lines) = (split_lines(old_text), split_lines(new_text));
    let ops = diff_lines(&old_lines, &new_lines);
    for hunk in hunks(&ops) {
        out.push_str(&render_hunk(&ops[hunk.clone()], line_offsets(&ops, hunk.start)));
    }
    out
}

/// Index ranges into `ops`, each a hunk with up to `CONTEXT` lines around
/// its changes.
fn hunks(ops: &[DiffOp<'_>]) -> Vec<std::ops::Range<usize>> {
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, DiffOp::Equal(_)))
        .map(|(i, _)| i)
        .collect();

    let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();
    for idx in changes {
        let start = idx.saturating_sub(CONTEXT);
        let end = (idx + CONTEXT + 1).min(ops.len());
        match ranges.last_mut() {
            Some(last) if start <= last.end => last.end = end,
            _ => ranges.push(start..end),
        }
    }
    ranges
}

/// Old and new line counts consumed before `index`.
fn line_offsets(ops: &[DiffOp<'_>], index: usize) -> (usize, usize) {
    ops[..index].iter().fold((0, 0), |(o, n), op| match op {
        DiffOp::Equal(_) => (o + 1, n + 1),
        DiffOp::Delete(_) => (o + 1, n),
        DiffOp::Insert(_) => (o, n + 1),
    })
}

fn render_hunk(ops: &[DiffOp<'_>], (old_before, new_before): (usize, usize)) -> String {
    let old_len = ops
        .iter()
        .filter(|op| !matches!(op, DiffOp::Insert(_)))
        .count();
    let new_len = ops
        .iter()
        .filter(|op| !matches!(op, DiffOp::Delete(_)))
        .count();
    let range = |before: usize, len: usize| {
        let start = if len == 0 { before } else { before + 1 };
        if len == 1 {
            format!("{start}")
        } else {
            format!("{start},{len}")
        }
    };

    let mut out = format!(
        "@@ -{} +{} @@\n",
        range(old_before, old_len),
        range(new_before, new_len)
    );
    for op in ops {
        let (prefix, line) = match op {
            DiffOp::Equal(l) => (' ', l),
            DiffOp::Delete(l) => ('-', l),
            DiffOp::Insert(l) => ('+', l),
        };
        out.push(prefix);
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push_str("\n\\ No newline at end of file\n");
        }
    }
    out
}
