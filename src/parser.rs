//! Parses a user story document into [`Epic`]s
//!
//! The document format is line based:
//!
//! ```text
//! # comments and blank lines are ignored
//! EPIC: Data export
//! - As a user I want to export data, so I can share it. [High] {5}
//! - As an admin I want to schedule exports, so reports arrive on time.
//! ```
//!
//! Parsing never fails on the content of the document. Irregular lines are
//! dropped, epics without stories are discarded, and only the first priority
//! and story point token of a story is honored. The only error is failing to
//! read the document in the first place.
//!
//! [`Epic`]: ../struct.Epic.html
use crate::{Epic, UserStory};
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

pub(crate) const EPIC_MARKER: &str = "EPIC:";
pub(crate) const COMMENT_MARKER: char = '#';
pub(crate) const STORY_MARKER: char = '-';

const MAX_TITLE_LEN: usize = 60;
const TRUNCATED_TITLE_LEN: usize = 57;

pub(crate) static PRIORITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\w+)\]").expect("Invalid priority pattern"));

pub(crate) static POINTS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([0-9]+)\}").expect("Invalid story points pattern"));

static ACTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)I want to ([^,]+)").expect("Invalid action pattern"));

/// Errors raised while parsing a story document
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document could not be opened, read, or decoded as UTF-8
    #[error("Cannot read user stories file '{}': {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads the whole file at `path` and parses it with [`parse_str`]
///
/// [`parse_str`]: fn.parse_str.html
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Epic>, ParseError> {
    let contents = read_source(path)?;
    Ok(parse_str(&contents))
}

/// Reads a whole story document into memory
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<String, ParseError> {
    let path = path.as_ref();
    let contents =
        std::fs::read_to_string(path).map_err(|source| ParseError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), bytes = contents.len(), "read user stories file");
    Ok(contents)
}

/// Parses a document into its epics, in document order
///
/// Every returned epic holds at least one story.
pub fn parse_str(text: &str) -> Vec<Epic> {
    let sections = segment(text);
    debug!(sections = sections.len(), "segmented document");

    sections
        .iter()
        .filter_map(parse_section)
        .filter(|epic| !epic.stories.is_empty())
        .collect()
}

/// A trimmed, non-discarded line of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    /// 1-based line number
    pub number: usize,

    /// Byte range of `text` within the document
    pub span: Range<usize>,

    pub text: &'a str,
}

impl<'a> Line<'a> {
    pub fn is_header(&self) -> bool {
        self.text.starts_with(EPIC_MARKER)
    }

    pub fn is_story(&self) -> bool {
        self.text.starts_with(STORY_MARKER)
    }
}

/// The run of lines belonging to one epic header
///
/// Only the first section of a document can lack a header; it holds whatever
/// preceded the first `EPIC:` line.
#[derive(Debug, Default)]
pub(crate) struct Section<'a> {
    pub lines: Vec<Line<'a>>,
}

impl<'a> Section<'a> {
    /// The title of the section's epic, or `None` for a headerless section
    pub fn title(&self) -> Option<&'a str> {
        self.lines
            .first()
            .and_then(|line| line.text.strip_prefix(EPIC_MARKER))
            .map(str::trim)
    }

    pub fn body(&self) -> &[Line<'a>] {
        self.lines.get(1..).unwrap_or_default()
    }
}

/// Iterates over the trimmed lines of `text`, skipping blanks and comments
pub(crate) fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    text.split('\n').enumerate().filter_map(move |(idx, raw)| {
        let start = offset;
        offset += raw.len() + 1;

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            return None;
        }

        let lead = raw.len() - raw.trim_start().len();
        Some(Line {
            number: idx + 1,
            span: start + lead..start + lead + trimmed.len(),
            text: trimmed,
        })
    })
}

/// Splits the document into sections at every epic header
pub(crate) fn segment(text: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current = Section::default();

    for line in lines(text) {
        if line.is_header() && !current.lines.is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.lines.push(line);
    }

    if !current.lines.is_empty() {
        sections.push(current);
    }

    sections
}

/// Builds the epic for a section. Headerless sections produce nothing, but
/// an epic without stories is still returned here
pub(crate) fn parse_section(section: &Section) -> Option<Epic> {
    let title = section.title()?;
    let stories = section
        .body()
        .iter()
        .filter(|line| line.is_story())
        .filter_map(|line| parse_story(line.text))
        .collect();

    Some(Epic {
        title: title.to_string(),
        stories,
    })
}

/// Parses a story line, including its leading `-`
///
/// Returns `None` when nothing follows the marker.
pub(crate) fn parse_story(line: &str) -> Option<UserStory> {
    let content = line.strip_prefix(STORY_MARKER).unwrap_or(line).trim();
    if content.is_empty() {
        return None;
    }

    let (priority, content) = extract_priority(content);
    let (story_points, content) = extract_points(&content);

    let description = content.trim().to_string();
    let title = synthesize_title(&description);

    Some(UserStory {
        title,
        description,
        priority,
        story_points,
    })
}

/// Takes the first `[Word]` token out of `text`
pub(crate) fn extract_priority(text: &str) -> (Option<String>, String) {
    match PRIORITY_PATTERN.captures(text) {
        Some(caps) => {
            let token = caps.get(0).map_or(0..0, |m| m.range());
            let word = caps.get(1).map(|m| m.as_str().to_string());
            (word, remove_span(text, token))
        }
        None => (None, text.to_string()),
    }
}

/// Takes the first `{N}` token out of `text`
///
/// A number too large for a `u64` is left in the text and yields no points.
pub(crate) fn extract_points(text: &str) -> (Option<u64>, String) {
    let parsed = POINTS_PATTERN.captures(text).and_then(|caps| {
        let token = caps.get(0)?.range();
        let points = caps.get(1)?.as_str().parse::<u64>().ok()?;
        Some((points, token))
    });

    match parsed {
        Some((points, token)) => (Some(points), remove_span(text, token)),
        None => (None, text.to_string()),
    }
}

fn remove_span(text: &str, span: Range<usize>) -> String {
    let mut out = String::with_capacity(text.len() - span.len());
    out.push_str(&text[..span.start]);
    out.push_str(&text[span.end..]);
    out
}

/// Derives a short title from a story description
///
/// Prefers the action of an "I want to <action>," phrase, capitalized. Falls
/// back to the whole description. Either way the result is cut to 57
/// characters plus `...` when longer than 60.
pub fn synthesize_title(description: &str) -> String {
    let action = ACTION_PATTERN
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|action| !action.is_empty());

    match action {
        Some(action) => truncate_title(&capitalize(action)),
        None => truncate_title(description),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_LEN {
        let mut truncated: String = title.chars().take(TRUNCATED_TITLE_LEN).collect();
        truncated.push_str("...");
        truncated
    } else {
        title.to_string()
    }
}
