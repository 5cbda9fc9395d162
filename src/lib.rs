//! jira-stories turns a plain-text backlog into Jira epics and stories
//!
//! A backlog looks like this:
//!
//! ```text
//! EPIC: Data export
//! - As a user I want to export data, so I can share it. [High] {5}
//! ```
//!
//! Each `EPIC:` line becomes an epic, each `-` line under it a story. A
//! `[Word]` token sets the story's priority and a `{N}` token its story
//! points. Titles are derived from the "I want to ..." part of the story.
//!
//! - `jira-stories parse` checks a backlog without touching Jira
//! - `jira-stories create` submits it
//! - `jira-stories test` checks the credentials
//! - `jira-stories setup` writes a config file
pub mod config;
pub use config::CliConfig;
pub use config::Config;
pub use config::ConfigFile;

mod story;
pub use story::{total_stories, Epic, UserStory};

pub mod parser;
pub use parser::{parse_file, parse_str, ParseError};

pub mod finding;
pub use finding::Finding;

pub mod linter;

pub mod jira;

pub mod submit;

pub mod report;

pub mod commands;
