//! Handles the actual running of jira-stories

use crate::config::{self, Action, ConfigError, SetupAnswers};
use crate::jira::JiraClient;
use crate::{linter, parser, report, submit, Config};

use color_eyre::Result;
use eyre::{eyre, WrapErr};

use std::io::{BufRead, Write};

use termcolor::StandardStream;
use tracing::warn;

const ENV_HINT: &str = "Please update your config file or set environment variables:
  JIRA_SERVER, JIRA_USERNAME, JIRA_API_TOKEN, JIRA_PROJECT_KEY";

/// Runs the command the config asks for
pub fn run(config: &Config) -> Result<()> {
    let mut stdout = StandardStream::stdout(config.use_color);

    match &config.action {
        Action::Create { dry_run, open } => create(config, *dry_run, *open, &mut stdout),
        Action::Parse { json } => parse(config, *json, &mut stdout),
        Action::Test => test(config, &mut stdout),
        Action::Setup { env_file } => setup(config, *env_file, &mut stdout),
    }
}

fn validate(config: &Config, stdout: &mut StandardStream) -> Result<()> {
    if let Err(e) = config.validate() {
        report::failure(stdout, &e.to_string())?;
        writeln!(stdout)?;
        writeln!(stdout, "{}", ENV_HINT)?;
        return Err(e.into());
    }
    Ok(())
}

fn create(config: &Config, dry_run: bool, open: bool, stdout: &mut StandardStream) -> Result<()> {
    report::banner(stdout, "JIRA Stories - Creating Epics and Stories", 50)?;

    if config.verbose {
        report::print_config(stdout, config)?;
    }
    validate(config, stdout)?;

    let input = &config.stories.input_file;
    report::step(
        stdout,
        &format!("Parsing user stories from: {}", input.display()),
    )?;
    let epics = parser::parse_file(input).wrap_err("Error parsing user stories")?;

    if epics.is_empty() {
        report::warning(stdout, "No epics found in the input file")?;
        return Ok(());
    }

    report::success(stdout, &report::parsed_counts(&epics))?;
    if config.verbose {
        report::print_epic_summary(stdout, &epics)?;
    }

    if dry_run {
        writeln!(stdout)?;
        report::warning(stdout, "Dry run completed - no JIRA issues created")?;
        return Ok(());
    }

    report::step(stdout, "Connecting to JIRA...")?;
    let client = JiraClient::new(&config.jira).wrap_err("Failed to set up the JIRA client")?;
    let project = match submit::connect(&client, config) {
        Ok(project) => project,
        Err(e) => {
            report::failure(stdout, &format!("JIRA connection failed: {}", e))?;
            return Err(eyre!("Failed to connect to JIRA"));
        }
    };
    report::success(
        stdout,
        &format!("Connected to JIRA project: {}", project.name),
    )?;

    let outcome = submit::submit(&client, &epics, config);
    report::print_submission(stdout, &outcome, config)?;

    if open {
        let url = config.jira.project_url();
        if let Err(e) = opener::open(&url) {
            warn!("couldn't open {}: {}", url, e);
        }
    }

    if outcome.created_epics() == 0 {
        return Err(eyre!("No epics could be created"));
    }
    Ok(())
}

fn parse(config: &Config, json: bool, stdout: &mut StandardStream) -> Result<()> {
    let input = &config.stories.input_file;
    let text = parser::read_source(input).wrap_err("Error parsing file")?;
    let epics = parser::parse_str(&text);

    if json {
        serde_json::to_writer_pretty(&mut stdout.lock(), &epics)?;
        writeln!(stdout)?;
        return Ok(());
    }

    report::banner(stdout, "Parsing User Stories", 30)?;
    linter::lint(&input.display().to_string(), &text, config, stdout)?;

    if epics.is_empty() {
        report::warning(stdout, "No epics found in the file")?;
        return Ok(());
    }

    report::success(stdout, &report::parsed_counts(&epics))?;
    writeln!(stdout)?;
    report::print_epic_details(stdout, &epics)
}

fn test(config: &Config, stdout: &mut StandardStream) -> Result<()> {
    report::banner(stdout, "Testing JIRA Connection", 30)?;
    report::print_config(stdout, config)?;
    validate(config, stdout)?;

    report::step(stdout, "Testing JIRA connection...")?;
    writeln!(stdout, "Server: {}", config.jira.server)?;
    writeln!(stdout, "Username: {}", config.jira.username)?;
    writeln!(stdout, "Project: {}", config.jira.project_key)?;

    let client = JiraClient::new(&config.jira).wrap_err("Failed to set up the JIRA client")?;
    let project = match submit::connect(&client, config) {
        Ok(project) => project,
        Err(e) => {
            report::failure(stdout, &format!("JIRA connection failed: {}", e))?;
            writeln!(stdout)?;
            report::failure(stdout, "Connection test failed!")?;
            return Err(eyre!("Connection test failed"));
        }
    };
    report::success(
        stdout,
        &format!("Connected to JIRA project: {}", project.name),
    )?;

    let issue_types = submit::issue_types(&client, &config.jira.project_key);
    report::print_project(stdout, &project, &issue_types)?;

    writeln!(stdout)?;
    report::success(stdout, "All tests passed!")
}

fn setup(config: &Config, env_file: bool, stdout: &mut StandardStream) -> Result<()> {
    report::banner(stdout, "JIRA Stories Setup Wizard", 35)?;

    let target = config::setup_target(config, env_file);
    if target.exists() {
        return Err(ConfigError::Exists { path: target }.into());
    }

    writeln!(stdout)?;
    writeln!(
        stdout,
        "This wizard will write your JIRA settings to {}.",
        target.display()
    )?;
    writeln!(stdout)?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let server = prompt(stdout, &mut input, "JIRA Server URL", Some(config::DEFAULT_SERVER))?;
    let username = prompt(stdout, &mut input, "JIRA Username (email)", None)?;
    let api_token = loop {
        let token = rpassword::prompt_password("JIRA API Token: ")
            .wrap_err("Failed to read the API token")?;
        if !token.trim().is_empty() {
            break token.trim().to_string();
        }
    };
    let project_key = prompt(stdout, &mut input, "JIRA Project Key", None)?;

    let answers = SetupAnswers {
        server,
        username,
        api_token,
        project_key,
    };
    let contents = if env_file {
        answers.to_env_file()
    } else {
        answers.to_config_file()
    };
    config::write_new_file(&target, &contents)?;

    report::success(stdout, &format!("Created {}", target.display()))?;
    writeln!(stdout)?;
    report::warning(stdout, "Next steps:")?;
    writeln!(stdout, "1. Test your configuration: jira-stories test")?;
    writeln!(stdout, "2. Parse your user stories: jira-stories parse")?;
    writeln!(stdout, "3. Create JIRA issues: jira-stories create")?;
    Ok(())
}

/// Asks for a value until a non-empty one (or the default) is given
fn prompt<R: BufRead>(
    stdout: &mut StandardStream,
    input: &mut R,
    label: &str,
    default: Option<&str>,
) -> Result<String> {
    loop {
        match default {
            Some(default) => write!(stdout, "{} [{}]: ", label, default)?,
            None => write!(stdout, "{}: ", label)?,
        }
        stdout.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(eyre!("Input ended before setup was complete"));
        }

        let answer = line.trim();
        match (answer.is_empty(), default) {
            (false, _) => return Ok(answer.to_string()),
            (true, Some(default)) => return Ok(default.to_string()),
            (true, None) => continue,
        }
    }
}
