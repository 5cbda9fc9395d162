use codespan_reporting::diagnostic::{Diagnostic, Label};
use color_eyre::Result;
use std::cmp::Ordering;
use std::fmt;
use std::io::Write;
use std::ops::Range;
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

/// Something the parser silently absorbed while reading a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// Lines before the first epic header
    LeadingContent { lines: usize },

    /// A line inside an epic that is not a story
    StrayText,

    /// A story marker with nothing after it
    EmptyStory,

    /// An epic header with no title text
    EmptyEpicTitle,

    /// An epic that ended up with no stories
    EmptyEpic { title: String },

    /// A bracket token left in a description after the priority was taken
    ExtraPriority { token: String },

    /// A brace token left in a description after the points were taken
    ExtraPoints { token: String },

    /// A brace token whose number does not fit a story point estimate
    InvalidPoints { token: String },

    /// A priority with no entry in the priority mapping
    UnknownPriority {
        priority: String,
        suggestion: Option<String>,
    },
}

impl FindingKind {
    /// The name used to allow or deny this kind of finding
    pub fn get_name(&self) -> &'static str {
        match self {
            FindingKind::LeadingContent { .. } => "LeadingContent",
            FindingKind::StrayText => "StrayText",
            FindingKind::EmptyStory => "EmptyStory",
            FindingKind::EmptyEpicTitle => "EmptyEpicTitle",
            FindingKind::EmptyEpic { .. } => "EmptyEpic",
            FindingKind::ExtraPriority { .. } => "ExtraPriority",
            FindingKind::ExtraPoints { .. } => "ExtraPoints",
            FindingKind::InvalidPoints { .. } => "InvalidPoints",
            FindingKind::UnknownPriority { .. } => "UnknownPriority",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FindingKind::LeadingContent { lines } => write!(
                f,
                "{} line(s) before the first EPIC: header are ignored",
                lines
            ),
            FindingKind::StrayText => write!(f, "Line is not a story and is ignored"),
            FindingKind::EmptyStory => write!(f, "Story has no text and is ignored"),
            FindingKind::EmptyEpicTitle => write!(f, "Epic has an empty title"),
            FindingKind::EmptyEpic { title } => {
                write!(f, "Epic \"{}\" has no stories and is discarded", title)
            }
            FindingKind::ExtraPriority { token } => write!(
                f,
                "Only the first priority is used; {} stays in the description",
                token
            ),
            FindingKind::ExtraPoints { token } => write!(
                f,
                "Only the first story point estimate is used; {} stays in the description",
                token
            ),
            FindingKind::InvalidPoints { token } => write!(
                f,
                "Story point estimate {} is too large and stays in the description",
                token
            ),
            FindingKind::UnknownPriority { priority, .. } => write!(
                f,
                "Priority \"{}\" has no Jira mapping and will not be sent",
                priority
            ),
        }
    }
}

/// A [`FindingKind`] and where in the document it was raised
///
/// [`FindingKind`]: enum.FindingKind.html
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: FindingKind,

    /// 1-based line number
    pub line: usize,

    /// Byte range within the document
    pub span: Range<usize>,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {} [{}]", self.line, self.kind, self.kind.get_name())
    }
}

/// A warning that survived filtering, possibly promoted to an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub warning: Warning,
    pub denied: bool,
}

impl Finding {
    pub fn report(&self) -> Diagnostic<()> {
        let diagnostic = if self.denied {
            Diagnostic::error()
        } else {
            Diagnostic::warning()
        }
        .with_message(self.warning.kind.to_string())
        .with_code(self.warning.kind.get_name());

        let mut notes = Vec::new();
        if let FindingKind::UnknownPriority {
            suggestion: Some(suggestion),
            ..
        } = &self.warning.kind
        {
            notes.push(format!("Found priority with similar name: \"{}\"", suggestion));
        }

        diagnostic
            .with_labels(vec![Label::primary((), self.warning.span.clone())])
            .with_notes(notes)
    }
}

/// Drops allowed warnings, marks denied ones, and sorts the rest by position
///
/// The name `all` matches every warning. Allowing wins over denying. Returns
/// the findings and whether any of them is an error.
pub fn filter_and_sort(
    warnings: Vec<Warning>,
    allowed: &[String],
    denied: &[String],
) -> (Vec<Finding>, bool) {
    let matches = |list: &[String], name: &str| list.iter().any(|n| n == "all" || n == name);

    let mut findings: Vec<Finding> = warnings
        .into_iter()
        .filter(|w| !matches(allowed, w.kind.get_name()))
        .map(|warning| {
            let denied = matches(denied, warning.kind.get_name());
            Finding { warning, denied }
        })
        .collect();

    findings.sort_by(|left, right| {
        match left.warning.span.start.cmp(&right.warning.span.start) {
            Ordering::Equal => left.warning.kind.get_name().cmp(right.warning.kind.get_name()),
            ord => ord,
        }
    });

    let is_err = findings.iter().any(|f| f.denied);
    (findings, is_err)
}

/// Prints a finding on a single line
pub fn print_finding(finding: &Finding, stdout: &mut StandardStream) -> Result<()> {
    let kind = if finding.denied {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        "Error"
    } else {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        "Warning"
    };
    write!(stdout, "{}: ", kind)?;
    stdout.reset()?;
    writeln!(stdout, "{}", finding.warning)?;
    Ok(())
}

/// Returns the candidates that look like `v`, most similar last
pub fn did_you_mean<T, I>(v: &str, possible_values: I) -> Vec<String>
where
    T: AsRef<str>,
    I: IntoIterator<Item = T>,
{
    let mut candidates: Vec<(f64, String)> = possible_values
        .into_iter()
        .map(|pv| (strsim::jaro_winkler(v, pv.as_ref()), pv.as_ref().to_owned()))
        .filter(|(confidence, _)| *confidence > 0.8)
        .collect();
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    candidates.into_iter().map(|(_, pv)| pv).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(kind: FindingKind, start: usize) -> Warning {
        Warning {
            kind,
            line: 1,
            span: start..start + 1,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn allow_and_deny() {
        let warnings = vec![
            warning(FindingKind::StrayText, 10),
            warning(FindingKind::EmptyStory, 5),
            warning(FindingKind::EmptyEpicTitle, 0),
        ];

        let (findings, is_err) =
            filter_and_sort(warnings.clone(), &names(&["StrayText"]), &names(&["EmptyStory"]));
        assert!(is_err);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].warning.kind, FindingKind::EmptyEpicTitle);
        assert!(!findings[0].denied);
        assert_eq!(findings[1].warning.kind, FindingKind::EmptyStory);
        assert!(findings[1].denied);

        let (findings, is_err) = filter_and_sort(warnings.clone(), &names(&["all"]), &[]);
        assert!(findings.is_empty());
        assert!(!is_err);

        let (findings, is_err) =
            filter_and_sort(warnings, &names(&["StrayText"]), &names(&["all", "StrayText"]));
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.denied));
        assert!(is_err);
    }

    #[test]
    fn suggestions() {
        let priorities = ["High", "Medium", "Low", "Critical", "Blocker"];
        assert_eq!(did_you_mean("Hihg", priorities.iter()).pop().as_deref(), Some("High"));
        assert_eq!(did_you_mean("Whenever", priorities.iter()).pop(), None);
    }

    #[test]
    fn report_includes_suggestion() {
        let finding = Finding {
            warning: warning(
                FindingKind::UnknownPriority {
                    priority: "Hihg".to_string(),
                    suggestion: Some("High".to_string()),
                },
                3,
            ),
            denied: false,
        };
        let diagnostic = finding.report();
        assert_eq!(diagnostic.code.as_deref(), Some("UnknownPriority"));
        assert_eq!(diagnostic.labels.len(), 1);
        assert_eq!(diagnostic.labels[0].range, 3..4);
        assert_eq!(diagnostic.notes.len(), 1);
    }
}
