//! Reports what the parser quietly skipped, based on the given [`Config`]
//!
//! The parser never fails on odd input; it drops it. Linting walks the same
//! document with the same rules and names each thing that was dropped or
//! left behind, so the operator can fix the document before submitting it.
//!
//! [`Config`]: ../struct.Config.html

use crate::finding::{self, FindingKind, Warning};
use crate::parser::{self, Line, POINTS_PATTERN, PRIORITY_PATTERN};
use crate::Config;
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use color_eyre::Result;
use eyre::eyre;
use std::collections::HashMap;
use std::io::Write;
use termcolor::StandardStream;

/// Collects every warning for the given document
///
/// `priorities` is the mapping from story priorities to Jira priorities; a
/// story priority missing from it is reported.
pub fn check(text: &str, priorities: &HashMap<String, String>) -> Vec<Warning> {
    let mut warnings = Vec::new();

    for section in parser::segment(text) {
        let title = match section.title() {
            Some(title) => title,
            None => {
                if let Some(first) = section.lines.first() {
                    warnings.push(at(
                        first,
                        FindingKind::LeadingContent {
                            lines: section.lines.len(),
                        },
                    ));
                }
                continue;
            }
        };

        let header = &section.lines[0];
        if title.is_empty() {
            warnings.push(at(header, FindingKind::EmptyEpicTitle));
        }

        let mut stories = 0;
        for line in section.body() {
            if !line.is_story() {
                warnings.push(at(line, FindingKind::StrayText));
                continue;
            }

            let story = match parser::parse_story(line.text) {
                Some(story) => story,
                None => {
                    warnings.push(at(line, FindingKind::EmptyStory));
                    continue;
                }
            };
            stories += 1;

            if let Some(priority) = &story.priority {
                if !priorities.contains_key(priority) {
                    let suggestion = finding::did_you_mean(priority, priorities.keys()).pop();
                    warnings.push(at(
                        line,
                        FindingKind::UnknownPriority {
                            priority: priority.clone(),
                            suggestion,
                        },
                    ));
                }
            }

            // only a second token counts as an extra priority
            let leftover = story
                .priority
                .as_ref()
                .and_then(|_| PRIORITY_PATTERN.find(&story.description));
            if let Some(token) = leftover {
                warnings.push(at(
                    line,
                    FindingKind::ExtraPriority {
                        token: token.as_str().to_string(),
                    },
                ));
            }

            if let Some(token) = POINTS_PATTERN.find(&story.description) {
                let token = token.as_str().to_string();
                let kind = if story.story_points.is_some() {
                    FindingKind::ExtraPoints { token }
                } else {
                    FindingKind::InvalidPoints { token }
                };
                warnings.push(at(line, kind));
            }
        }

        if stories == 0 {
            warnings.push(at(
                header,
                FindingKind::EmptyEpic {
                    title: title.to_string(),
                },
            ));
        }
    }

    warnings
}

fn at(line: &Line, kind: FindingKind) -> Warning {
    Warning {
        kind,
        line: line.number,
        span: line.span.clone(),
    }
}

/// Lints the given document and outputs warnings/errors to the given stream
///
/// Warnings are ignored or promoted to errors as specified in the config.
/// Returns the number of findings printed, or an error if any was denied.
pub fn lint(
    name: &str,
    text: &str,
    config: &Config,
    stdout: &mut StandardStream,
) -> Result<usize> {
    let warnings = check(text, &config.priorities);
    let (findings, is_err) = finding::filter_and_sort(warnings, &config.allowed, &config.denied);

    if config.compact {
        for f in &findings {
            finding::print_finding(f, stdout)?;
        }
    } else {
        let file = SimpleFile::new(name, text);
        let term_config = term::Config::default();
        for f in &findings {
            let diagnostic = f.report();
            term::emit(&mut stdout.lock(), &term_config, &file, &diagnostic)?;
        }
    }

    // Force reset of color
    stdout.flush()?;

    if is_err {
        Err(eyre!("Failed due to previous errors"))
    } else {
        Ok(findings.len())
    }
}
