//! Colored terminal output for each command
use crate::jira::ProjectInfo;
use crate::submit::SubmissionReport;
use crate::{total_stories, Config, Epic};
use color_eyre::Result;
use std::io::Write;
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

const DESCRIPTION_WIDTH: usize = 80;
const TRUNCATED_DESCRIPTION_WIDTH: usize = 77;

fn colored(stdout: &mut StandardStream, color: Color, text: &str) -> Result<()> {
    stdout.set_color(ColorSpec::new().set_fg(Some(color)))?;
    writeln!(stdout, "{}", text)?;
    stdout.reset()?;
    Ok(())
}

/// A command's title, underlined to `width`
pub fn banner(stdout: &mut StandardStream, title: &str, width: usize) -> Result<()> {
    colored(stdout, Color::Cyan, title)?;
    writeln!(stdout, "{}", "=".repeat(width))?;
    Ok(())
}

pub fn step(stdout: &mut StandardStream, text: &str) -> Result<()> {
    writeln!(stdout)?;
    colored(stdout, Color::Blue, text)
}

pub fn success(stdout: &mut StandardStream, text: &str) -> Result<()> {
    colored(stdout, Color::Green, &format!("✓ {}", text))
}

pub fn warning(stdout: &mut StandardStream, text: &str) -> Result<()> {
    colored(stdout, Color::Yellow, &format!("⚠ {}", text))
}

pub fn failure(stdout: &mut StandardStream, text: &str) -> Result<()> {
    colored(stdout, Color::Red, &format!("✗ {}", text))
}

/// Cuts a description to 77 characters plus `...` when longer than 80
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_WIDTH {
        let mut cut: String = description
            .chars()
            .take(TRUNCATED_DESCRIPTION_WIDTH)
            .collect();
        cut.push_str("...");
        cut
    } else {
        description.to_string()
    }
}

fn points_label(points: Option<u64>) -> Option<u64> {
    points.filter(|p| *p > 0)
}

pub fn print_config(stdout: &mut StandardStream, config: &Config) -> Result<()> {
    writeln!(stdout)?;
    writeln!(stdout, "Current Configuration:")?;
    writeln!(stdout, "{}", "=".repeat(40))?;
    for (label, value) in config.summary() {
        writeln!(stdout, "{}: {}", label, value)?;
    }
    Ok(())
}

/// One line summarizing how much was parsed
pub fn parsed_counts(epics: &[Epic]) -> String {
    format!(
        "Parsed {} epics with {} total stories",
        epics.len(),
        total_stories(epics)
    )
}

/// Compact listing used by `create --verbose`
pub fn print_epic_summary(stdout: &mut StandardStream, epics: &[Epic]) -> Result<()> {
    for (i, epic) in epics.iter().enumerate() {
        writeln!(stdout)?;
        writeln!(stdout, "  {}. Epic: {}", i + 1, epic.title)?;
        writeln!(stdout, "     Stories: {}", epic.story_count())?;
        for (j, story) in epic.stories.iter().enumerate() {
            let mut line = format!("       {}. {}", j + 1, story.title);
            if let Some(priority) = &story.priority {
                line.push_str(&format!(" [{}]", priority));
            }
            if let Some(points) = points_label(story.story_points) {
                line.push_str(&format!(" ({}pts)", points));
            }
            writeln!(stdout, "{}", line)?;
        }
    }
    Ok(())
}

/// Detailed listing used by `parse`
pub fn print_epic_details(stdout: &mut StandardStream, epics: &[Epic]) -> Result<()> {
    for (i, epic) in epics.iter().enumerate() {
        colored(stdout, Color::Blue, &format!("{}. Epic: {}", i + 1, epic.title))?;
        writeln!(
            stdout,
            "   Stories: {} ({} high priority, {} story points)",
            epic.story_count(),
            epic.count_with_priority("High"),
            epic.total_points()
        )?;

        for (j, story) in epic.stories.iter().enumerate() {
            let mut line = format!("     {}. {}", j + 1, story.title);
            if let Some(priority) = &story.priority {
                line.push_str(&format!(" [Priority: {}]", priority));
            }
            if let Some(points) = points_label(story.story_points) {
                line.push_str(&format!(" [Points: {}]", points));
            }
            writeln!(stdout, "{}", line)?;
            writeln!(
                stdout,
                "        Description: {}",
                truncate_description(&story.description)
            )?;
        }
        writeln!(stdout)?;
    }
    Ok(())
}

pub fn print_project(
    stdout: &mut StandardStream,
    project: &ProjectInfo,
    issue_types: &[String],
) -> Result<()> {
    writeln!(stdout)?;
    colored(stdout, Color::Green, "Project Information:")?;
    writeln!(stdout, "  Name: {}", project.name)?;
    writeln!(stdout, "  Key: {}", project.key)?;
    writeln!(stdout, "  Lead: {}", project.lead_name())?;
    writeln!(stdout, "  Description: {}", project.description_or_default())?;
    writeln!(stdout)?;
    colored(
        stdout,
        Color::Blue,
        &format!("Available Issue Types: {}", issue_types.join(", ")),
    )
}

pub fn print_submission(
    stdout: &mut StandardStream,
    report: &SubmissionReport,
    config: &Config,
) -> Result<()> {
    writeln!(stdout)?;
    if report.failures() == 0 {
        colored(stdout, Color::Green, "Successfully created JIRA issues!")?;
    } else {
        colored(
            stdout,
            Color::Yellow,
            &format!("Created JIRA issues with {} failure(s)", report.failures()),
        )?;
    }
    writeln!(stdout, "{}", "=".repeat(50))?;
    writeln!(
        stdout,
        "Created {} epics and {} stories",
        report.created_epics(),
        report.created_stories()
    )?;

    for epic in &report.epics {
        if let Err(e) = &epic.key {
            failure(stdout, &format!("Epic '{}' was not created: {}", epic.title, e))?;
        }
        for story in &epic.stories {
            if let Err(e) = &story.result {
                failure(stdout, &format!("Story '{}' was not created: {}", story.title, e))?;
            }
        }
    }
    if report.unlinked() > 0 {
        warning(
            stdout,
            &format!("{} stories could not be linked to their epic", report.unlinked()),
        )?;
    }

    if config.verbose && report.created_epics() > 0 {
        writeln!(stdout)?;
        colored(stdout, Color::Blue, "Created Issues:")?;
        for epic in &report.epics {
            if let Ok(key) = &epic.key {
                writeln!(stdout, "  Epic: {}", key)?;
                for story_key in epic.created_story_keys() {
                    writeln!(stdout, "    Story: {}", story_key)?;
                }
            }
        }
    }

    writeln!(stdout)?;
    colored(stdout, Color::Cyan, "View in JIRA:")?;
    writeln!(stdout, "   Project: {}", config.jira.project_url())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_are_truncated_past_eighty() {
        let eighty = "d".repeat(80);
        assert_eq!(truncate_description(&eighty), eighty);

        let long = "d".repeat(81);
        assert_eq!(truncate_description(&long), format!("{}...", "d".repeat(77)));
    }

    #[test]
    fn zero_points_are_not_shown() {
        assert_eq!(points_label(Some(0)), None);
        assert_eq!(points_label(Some(3)), Some(3));
        assert_eq!(points_label(None), None);
    }

    #[test]
    fn counts_line() {
        let epics = crate::parser::parse_str("EPIC: A\n- one\n- two\nEPIC: B\n- three\n");
        assert_eq!(parsed_counts(&epics), "Parsed 2 epics with 3 total stories");
    }
}
