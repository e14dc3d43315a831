//! Patch codec: turns an edit into a replayable unified-diff patch and back
//!
//! Global invariants enforced:
//! - `make_patch` is deterministic for a given `(original, edited, context_lines)`
//! - Diffing identical texts yields an empty patch
//! - `apply_patch` never fails: malformed or empty patches are the identity transform
//! - Hunks that cannot be located in the target text are skipped, never forced
//!
//! The serialized form is a header-less unified diff:
//!
//! ```text
//! @@ -1,2 +1,2 @@
//!  line1
//! -line2
//! +LINE2
//! ```
//!
//! A final line without a trailing newline is followed by `\ No newline at end of file`.
//! Lines end at `\n` only, both when diffing and when applying, so a bare `\r`
//! (progress output, old Mac line endings) stays inside its line.

use regex::Regex;
use similar::{Algorithm, DiffTag};
use std::fmt::{self, Write as _};
use std::sync::OnceLock;

/// Number of unchanged lines recorded around each hunk unless configured otherwise
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Maximum number of context lines dropped from each end of a hunk while searching
const MAX_FUZZ: usize = 2;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Compute the serialized patch that transforms `original` into `edited`
pub fn make_patch(original: &str, edited: &str, context_lines: usize) -> String {
    let old = split_lines(original);
    let new = split_lines(edited);
    let ops = similar::capture_diff_slices(Algorithm::Myers, &old, &new);
    let mut out = String::new();

    for group in similar::group_diff_ops(ops, context_lines) {
        // A group made only of unchanged lines carries no edit
        if group.iter().all(|op| op.tag() == DiffTag::Equal) {
            continue;
        }
        let Some(first) = group.first() else {
            continue;
        };

        // Ranges of ops in a group are not guaranteed to be contiguous on both sides
        let header = HunkHeader {
            old_start: first.old_range().start,
            old_len: group.iter().map(|op| op.old_range().len()).sum(),
            new_start: first.new_range().start,
            new_len: group.iter().map(|op| op.new_range().len()).sum(),
        };
        // Writing into a String cannot fail
        let _ = writeln!(out, "{header}");

        for op in &group {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => push_lines(&mut out, ' ', &old[old_range]),
                DiffTag::Delete => push_lines(&mut out, '-', &old[old_range]),
                DiffTag::Insert => push_lines(&mut out, '+', &new[new_range]),
                DiffTag::Replace => {
                    push_lines(&mut out, '-', &old[old_range]);
                    push_lines(&mut out, '+', &new[new_range]);
                }
            }
        }
    }

    out
}

/// Split after every `\n`; a bare `\r` is ordinary line content
fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Apply a serialized patch to `text`, best effort
///
/// Each hunk is searched for near its recorded position, shifted by the net
/// growth of the hunks applied before it. When the exact context does not
/// match, up to `MAX_FUZZ` context lines are dropped from each end of the hunk
/// and the search is retried. Hunks that still do not match are skipped.
///
/// Returns `text` unchanged if the patch is empty or cannot be parsed.
pub fn apply_patch(patch: &str, text: &str) -> String {
    if patch.trim().is_empty() {
        return text.to_string();
    }

    let hunks = match parse_patch(patch) {
        Ok(hunks) => hunks,
        Err(e) => {
            tracing::warn!("ignoring unreadable patch record: {e}");
            return text.to_string();
        }
    };

    let mut lines: Vec<String> = split_lines(text).into_iter().map(str::to_owned).collect();
    // Net line-count change of the hunks applied so far
    let mut delta: isize = 0;
    // Hunks are applied in order, so a hunk may not land before the previous one
    let mut floor: usize = 0;

    for (idx, hunk) in hunks.iter().enumerate() {
        match apply_hunk(&mut lines, hunk, delta, floor) {
            Some(applied) => {
                tracing::debug!(
                    "hunk {} applied at line {} (fuzz {})",
                    idx + 1,
                    applied.at + 1,
                    applied.fuzz
                );
                delta = applied.at as isize + applied.new_len as isize
                    - (applied.expected + applied.old_len) as isize;
                floor = applied.at + applied.new_len;
            }
            None => {
                tracing::warn!("skipping hunk {} ({}): context not found", idx + 1, hunk.header);
            }
        }
    }

    lines.concat()
}

/// Where and how a hunk landed
struct Applied {
    /// Index the hunk was applied at
    at: usize,
    /// Index the hunk was recorded at (after trimming fuzzed context)
    expected: usize,
    old_len: usize,
    new_len: usize,
    fuzz: usize,
}

fn apply_hunk(lines: &mut Vec<String>, hunk: &Hunk, delta: isize, floor: usize) -> Option<Applied> {
    let leading = hunk.lines.iter().take_while(|l| l.is_context()).count();
    let trailing = hunk.lines.iter().rev().take_while(|l| l.is_context()).count();

    for fuzz in 0..=MAX_FUZZ {
        let lead = fuzz.min(leading);
        let trail = fuzz.min(trailing);
        if fuzz > 0 && lead + trail == 0 {
            // Nothing left to trim; further fuzz levels are identical
            break;
        }
        if lead + trail >= hunk.lines.len() {
            break;
        }

        let body = &hunk.lines[lead..hunk.lines.len() - trail];
        let old: Vec<&str> = body.iter().filter_map(HunkLine::old_side).collect();
        let new: Vec<&str> = body.iter().filter_map(HunkLine::new_side).collect();

        // A pure insertion with trimmed context has no anchor left
        if old.is_empty() && fuzz > 0 {
            break;
        }

        let expected = hunk.header.old_index() + lead;
        let hint = (expected as isize + delta).max(0) as usize;

        if let Some(at) = find_block(lines, &old, hint, floor) {
            lines.splice(at..at + old.len(), new.iter().map(|s| s.to_string()));
            return Some(Applied {
                at,
                expected,
                old_len: old.len(),
                new_len: new.len(),
                fuzz,
            });
        }
    }

    None
}

/// Find the position of `block` in `lines` closest to `hint`, not before `floor`
fn find_block(lines: &[String], block: &[&str], hint: usize, floor: usize) -> Option<usize> {
    if lines.len() < block.len() || floor > lines.len() - block.len() {
        return None;
    }
    let last = lines.len() - block.len();
    let hint = hint.clamp(floor, last);

    if block.is_empty() {
        return Some(hint);
    }

    let matches_at = |pos: usize| {
        lines[pos..pos + block.len()]
            .iter()
            .zip(block)
            .all(|(have, want)| have == want)
    };

    // Search outward from the hint, preferring the later candidate on ties
    for distance in 0..=(last - floor) {
        if let Some(pos) = hint.checked_add(distance).filter(|p| *p <= last) {
            if matches_at(pos) {
                return Some(pos);
            }
        }
        if distance > 0 {
            if let Some(pos) = hint.checked_sub(distance).filter(|p| *p >= floor) {
                if matches_at(pos) {
                    return Some(pos);
                }
            }
        }
    }

    None
}

fn push_lines(out: &mut String, marker: char, lines: &[&str]) {
    for line in lines {
        out.push(marker);
        out.push_str(line);
        // Only the last line of a text can lack its terminator
        if !line.ends_with('\n') {
            out.push('\n');
            out.push_str(NO_NEWLINE_MARKER);
            out.push('\n');
        }
    }
}

/// `@@ -old_start,old_len +new_start,new_len @@`, with 0-based starts internally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    old_start: usize,
    old_len: usize,
    new_start: usize,
    new_len: usize,
}

impl HunkHeader {
    /// 0-based index of the first line this hunk replaces
    fn old_index(&self) -> usize {
        self.old_start
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Unified diff numbers lines from 1; an empty range names the line before it
        let display_start = |start: usize, len: usize| if len == 0 { start } else { start + 1 };
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            display_start(self.old_start, self.old_len),
            self.old_len,
            display_start(self.new_start, self.new_len),
            self.new_len
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HunkLine {
    Context(String),
    Delete(String),
    Insert(String),
}

impl HunkLine {
    fn is_context(&self) -> bool {
        matches!(self, HunkLine::Context(_))
    }

    fn old_side(&self) -> Option<&str> {
        match self {
            HunkLine::Context(s) | HunkLine::Delete(s) => Some(s),
            HunkLine::Insert(_) => None,
        }
    }

    fn new_side(&self) -> Option<&str> {
        match self {
            HunkLine::Context(s) | HunkLine::Insert(s) => Some(s),
            HunkLine::Delete(_) => None,
        }
    }

    fn text_mut(&mut self) -> &mut String {
        match self {
            HunkLine::Context(s) | HunkLine::Delete(s) | HunkLine::Insert(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Hunk {
    header: HunkHeader,
    lines: Vec<HunkLine>,
}

impl Hunk {
    fn old_count(&self) -> usize {
        self.lines.iter().filter(|l| l.old_side().is_some()).count()
    }

    fn new_count(&self) -> usize {
        self.lines.iter().filter(|l| l.new_side().is_some()).count()
    }

    fn is_complete(&self) -> bool {
        self.old_count() == self.header.old_len && self.new_count() == self.header.new_len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseError {
    UnexpectedLine(usize),
    BadHeader(usize),
    Truncated(usize),
    DanglingMarker(usize),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedLine(n) => write!(f, "unexpected line {n} outside of a hunk"),
            ParseError::BadHeader(n) => write!(f, "malformed hunk header on line {n}"),
            ParseError::Truncated(n) => write!(f, "hunk starting on line {n} is truncated"),
            ParseError::DanglingMarker(n) => {
                write!(f, "no-newline marker on line {n} follows no hunk line")
            }
        }
    }
}

fn header_regex() -> &'static Regex {
    static HEADER_RE: OnceLock<Regex> = OnceLock::new();
    HEADER_RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
            .expect("hunk header pattern is valid")
    })
}

fn parse_header(line: &str) -> Option<HunkHeader> {
    let caps = header_regex().captures(line)?;
    let number = |i: usize, default: usize| -> Option<usize> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let old_len = number(2, 1)?;
    let new_len = number(4, 1)?;
    let internal_start = |start: usize, len: usize| {
        if len == 0 {
            Some(start)
        } else {
            start.checked_sub(1)
        }
    };

    Some(HunkHeader {
        old_start: internal_start(number(1, 0)?, old_len)?,
        old_len,
        new_start: internal_start(number(3, 0)?, new_len)?,
        new_len,
    })
}

fn parse_patch(patch: &str) -> Result<Vec<Hunk>, ParseError> {
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut current: Option<(Hunk, usize)> = None;

    for (idx, raw) in patch.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let line = raw.strip_suffix('\n').unwrap_or(raw);

        if line.starts_with("\\ ") {
            // The marker belongs to the line before it, which may close the hunk
            let target = match current.as_mut() {
                Some((hunk, _)) => hunk.lines.last_mut(),
                None => hunks.last_mut().and_then(|h| h.lines.last_mut()),
            };
            let text = target.ok_or(ParseError::DanglingMarker(line_no))?.text_mut();
            if text.ends_with('\n') {
                text.pop();
            }
            continue;
        }

        if let Some((hunk, start)) = current.take() {
            if hunk.is_complete() {
                hunks.push(hunk);
            } else {
                let parsed = match line.chars().next() {
                    Some(' ') => HunkLine::Context(format!("{}\n", &line[1..])),
                    Some('-') => HunkLine::Delete(format!("{}\n", &line[1..])),
                    Some('+') => HunkLine::Insert(format!("{}\n", &line[1..])),
                    // Some tools strip the space from blank context lines
                    None => HunkLine::Context("\n".to_string()),
                    Some(_) => return Err(ParseError::Truncated(start)),
                };
                let mut hunk = hunk;
                hunk.lines.push(parsed);
                if hunk.old_count() > hunk.header.old_len || hunk.new_count() > hunk.header.new_len
                {
                    return Err(ParseError::Truncated(start));
                }
                current = Some((hunk, start));
                continue;
            }
        }

        if line.starts_with("@@") {
            let header = parse_header(line).ok_or(ParseError::BadHeader(line_no))?;
            current = Some((
                Hunk {
                    header,
                    lines: Vec::new(),
                },
                line_no,
            ));
        } else if line.starts_with("--- ") || line.starts_with("+++ ") || line.starts_with("diff ")
        {
            // File headers from a full unified diff carry nothing we need
            continue;
        } else if line.trim().is_empty() {
            continue;
        } else {
            return Err(ParseError::UnexpectedLine(line_no));
        }
    }

    if let Some((hunk, start)) = current {
        if !hunk.is_complete() {
            return Err(ParseError::Truncated(start));
        }
        hunks.push(hunk);
    }

    Ok(hunks)
}

#[cfg(test)]
mod tests;
