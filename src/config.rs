use clap::{crate_authors, crate_description, crate_name, crate_version};
use clap::{Arg, ArgAction, ArgMatches, Command};
use color_eyre::Result;
use eyre::{eyre, WrapErr};
use json_comments::StripComments;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use termcolor::ColorChoice;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_SERVER: &str = "https://your-domain.atlassian.net";
pub const DEFAULT_USERNAME: &str = "your-email@example.com";
pub const DEFAULT_API_TOKEN: &str = "your-api-token";
pub const DEFAULT_PROJECT_KEY: &str = "PROJ";
pub const DEFAULT_INPUT_FILE: &str = "user_stories.txt";
pub const DEFAULT_EPIC_NAME_PREFIX: &str = "";
pub const DEFAULT_STORY_TYPE: &str = "Story";
pub const DEFAULT_EPIC_TYPE: &str = "Epic";
pub const DEFAULT_EPIC_NAME_FIELD: &str = "customfield_10011";
pub const DEFAULT_STORY_POINTS_FIELD: &str = "customfield_10016";

const CONFIG_FILE_NAME: &str = "config.json";
const ENV_FILE_NAME: &str = ".env";

/// Values that were never filled in start with this
const PLACEHOLDER_PREFIX: &str = "your-";

/// Default mapping from story priorities to Jira priority names
pub fn default_priorities() -> HashMap<String, String> {
    [
        ("High", "High"),
        ("Medium", "Medium"),
        ("Low", "Low"),
        ("Critical", "Highest"),
        ("Blocker", "Highest"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing or invalid configuration for: {}", missing.join(", "))]
    Invalid { missing: Vec<String> },

    #[error("Refusing to overwrite existing file {}", path.display())]
    Exists { path: PathBuf },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Connection settings for the Jira instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraSettings {
    pub server: String,
    pub username: String,
    pub api_token: String,
    pub project_key: String,
}

impl JiraSettings {
    /// The server URL without any trailing slashes
    pub fn base_url(&self) -> &str {
        self.server.trim_end_matches('/')
    }

    pub fn project_url(&self) -> String {
        format!("{}/projects/{}", self.base_url(), self.project_key)
    }
}

/// How parsed stories are turned into Jira issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySettings {
    pub input_file: PathBuf,
    pub epic_name_prefix: String,
    pub story_type: String,
    pub epic_type: String,

    /// Custom field holding an epic's name
    pub epic_name_field: String,

    /// Custom field holding a story's estimate
    pub story_points_field: String,
}

/// What a run of jira-stories was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Parse the input and create the issues in Jira
    Create { dry_run: bool, open: bool },

    /// Parse and lint the input without connecting to Jira
    Parse { json: bool },

    /// Check the configuration and the connection to Jira
    Test,

    /// Write a config or .env file from prompted values
    Setup { env_file: bool },
}

/// Represents a unified configuration for a run of jira-stories.
///
/// Compiled from the configuration file, environment variables and
/// command-line arguments given
#[derive(Debug, Clone)]
pub struct Config {
    pub action: Action,

    /// The config file that was consulted, whether or not it existed
    pub config_path: PathBuf,

    pub jira: JiraSettings,
    pub stories: StorySettings,

    /// Maps story priorities to Jira priority names
    pub priorities: HashMap<String, String>,

    /// List of allowed (ignored) lint warning names
    pub allowed: Vec<String>,

    /// List of denied (treated as errors) lint warning names
    pub denied: Vec<String>,

    /// Whether or not to use color output
    pub use_color: ColorChoice,

    /// If true, use compact lint output format
    pub compact: bool,

    /// If true, print per-story detail
    pub verbose: bool,
}

impl Config {
    /// Loads the [`ConfigFile`], reads the [`EnvOverrides`], parses the
    /// [`CliConfig`], and produces a unified `Config`
    ///
    /// [`CliConfig`]: struct.CliConfig.html
    /// [`ConfigFile`]: struct.ConfigFile.html
    /// [`EnvOverrides`]: struct.EnvOverrides.html
    pub fn build() -> Result<Self> {
        Ok(Config::from_cli(CliConfig::from_args()?))
    }

    /// Like [`build`], for command line options that were already parsed
    ///
    /// [`build`]: #method.build
    pub fn from_cli(cli_config: CliConfig) -> Self {
        let config_path = cli_config
            .config_path
            .clone()
            .unwrap_or_else(default_config_path);
        let config_file = ConfigFile::load(&config_path);
        let env = EnvOverrides::from_env();
        Config::layer(config_path, config_file, env, cli_config)
    }

    /// Creates a unified `Config` from its sources. Command-line values win
    /// over environment variables, which win over the config file, which wins
    /// over the defaults
    pub fn layer(
        config_path: PathBuf,
        config_file: ConfigFile,
        env: EnvOverrides,
        cli_config: CliConfig,
    ) -> Self {
        let ConfigFile {
            jira,
            stories,
            fields,
            priorities,
            lint,
        } = config_file;

        let pick = |env: Option<String>, file: Option<String>, default: &str| {
            env.or(file).unwrap_or_else(|| default.to_string())
        };

        let jira = JiraSettings {
            server: pick(env.server, jira.server, DEFAULT_SERVER),
            username: pick(env.username, jira.username, DEFAULT_USERNAME),
            api_token: pick(env.api_token, jira.api_token, DEFAULT_API_TOKEN),
            project_key: pick(env.project_key, jira.project_key, DEFAULT_PROJECT_KEY),
        };

        let stories = StorySettings {
            input_file: cli_config
                .input_file
                .or_else(|| stories.input_file.map(PathBuf::from))
                .unwrap_or_else(|| DEFAULT_INPUT_FILE.into()),
            epic_name_prefix: stories
                .epic_name_prefix
                .unwrap_or_else(|| DEFAULT_EPIC_NAME_PREFIX.to_string()),
            story_type: stories
                .story_type
                .unwrap_or_else(|| DEFAULT_STORY_TYPE.to_string()),
            epic_type: stories
                .epic_type
                .unwrap_or_else(|| DEFAULT_EPIC_TYPE.to_string()),
            epic_name_field: fields
                .epic_name
                .unwrap_or_else(|| DEFAULT_EPIC_NAME_FIELD.to_string()),
            story_points_field: fields
                .story_points
                .unwrap_or_else(|| DEFAULT_STORY_POINTS_FIELD.to_string()),
        };

        let mut allowed = cli_config.allowed;
        allowed.extend(lint.allow);
        let mut denied = cli_config.denied;
        denied.extend(lint.deny);

        Config {
            action: cli_config.action,
            config_path,
            jira,
            stories,
            priorities: priorities.unwrap_or_else(default_priorities),
            allowed,
            denied,
            use_color: cli_config.use_color,
            compact: cli_config.compact,
            verbose: cli_config.verbose,
        }
    }

    /// Checks that every value needed to talk to Jira is present and is not
    /// a placeholder
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let input_file = self.stories.input_file.to_string_lossy();
        let required = [
            ("jira.server", self.jira.server.as_str()),
            ("jira.username", self.jira.username.as_str()),
            ("jira.api_token", self.jira.api_token.as_str()),
            ("jira.project_key", self.jira.project_key.as_str()),
            ("stories.input_file", &*input_file),
        ];

        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| is_placeholder(value))
            .map(|(name, _)| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { missing })
        }
    }

    /// Label/value pairs describing the configuration, with the API token
    /// masked
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let or_unset = |value: &str| {
            if value.is_empty() {
                "Not set".to_string()
            } else {
                value.to_string()
            }
        };

        vec![
            ("Config File", self.config_path.display().to_string()),
            ("JIRA Server", or_unset(&self.jira.server)),
            ("JIRA Username", or_unset(&self.jira.username)),
            ("JIRA API Token", mask(&self.jira.api_token)),
            ("JIRA Project Key", or_unset(&self.jira.project_key)),
            ("Input File", self.stories.input_file.display().to_string()),
            ("Epic Type", or_unset(&self.stories.epic_type)),
            ("Story Type", or_unset(&self.stories.story_type)),
        ]
    }
}

fn is_placeholder(value: &str) -> bool {
    value.trim().is_empty() || value.starts_with(PLACEHOLDER_PREFIX) || value == DEFAULT_SERVER
}

/// Replaces every character of a secret with `*`
pub fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "Not set".to_string()
    } else {
        "*".repeat(secret.chars().count())
    }
}

/// `config.json` in the working directory if there is one, otherwise the one
/// in the user's config directory
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }

    dirs_next::config_dir()
        .map(|dir| dir.join(crate_name!()).join(CONFIG_FILE_NAME))
        .unwrap_or(local)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JiraSection {
    pub server: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub project_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoriesSection {
    pub input_file: Option<String>,
    pub epic_name_prefix: Option<String>,
    pub story_type: Option<String>,
    pub epic_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FieldsSection {
    pub epic_name: Option<String>,
    pub story_points: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LintSection {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

/// Settings parsed from the jira-stories config file. Every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub jira: JiraSection,
    pub stories: StoriesSection,
    pub fields: FieldsSection,
    pub priorities: Option<HashMap<String, String>>,
    pub lint: LintSection,
}

impl ConfigFile {
    /// Loads the config file at `path`
    ///
    /// A missing, unreadable or malformed file is logged and treated as
    /// empty, so the defaults and environment still apply
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return ConfigFile::default();
        }

        let loaded = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Error reading config file {}", path.display()))
            .and_then(|contents| ConfigFile::parse(&contents));

        match loaded {
            Ok(config_file) => {
                debug!(path = %path.display(), "loaded config file");
                config_file
            }
            Err(e) => {
                warn!(path = %path.display(), "could not load config file: {:#}", e);
                ConfigFile::default()
            }
        }
    }

    /// Parses config file contents. Supports //, /**/, and # style comments
    pub fn parse(contents: &str) -> Result<Self> {
        // Strip the comments from the input (use `as_bytes()` to get a `Read`).
        let stripped = StripComments::new(contents.as_bytes());
        let cf: ConfigFile =
            serde_json::from_reader(stripped).wrap_err("Failed to parse config file JSON")?;
        Ok(cf)
    }
}

/// Jira settings taken from `JIRA_*` environment variables
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub server: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub project_key: Option<String>,
}

impl EnvOverrides {
    /// Reads the overrides. Unset and empty variables are ignored
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        EnvOverrides {
            server: var("JIRA_SERVER"),
            username: var("JIRA_USERNAME"),
            api_token: var("JIRA_API_TOKEN"),
            project_key: var("JIRA_PROJECT_KEY"),
        }
    }
}

/// Values collected by the setup wizard
#[derive(Debug, Clone)]
pub struct SetupAnswers {
    pub server: String,
    pub username: String,
    pub api_token: String,
    pub project_key: String,
}

impl SetupAnswers {
    /// Renders a commented config file holding these answers
    pub fn to_config_file(&self) -> String {
        let quote = |s: &str| serde_json::Value::from(s).to_string();
        format!(
            r#"// This file defines the configuration for {name}
// It is mostly standard JSON, but supports //, /**/, and # style comments.
//
// JIRA_SERVER, JIRA_USERNAME, JIRA_API_TOKEN and JIRA_PROJECT_KEY override
// the matching values below when set.
{{
  "jira": {{
    "server": {server},
    "username": {username},
    "api_token": {api_token},
    "project_key": {project_key}
  }},
  "stories": {{
    // Document to read stories from
    "input_file": {input_file},
    // Prepended to the summary of every created epic
    "epic_name_prefix": {prefix},
    "story_type": {story_type},
    "epic_type": {epic_type}
  }},
  // Custom field ids differ between Jira instances
  "fields": {{
    "epic_name": {epic_name_field},
    "story_points": {story_points_field}
  }},
  "lint": {{
    // Warnings to ignore ("allow")
    "allow": [],
    // Warnings to treat as errors ("deny")
    "deny": []
  }}
}}
"#,
            name = crate_name!(),
            server = quote(&self.server),
            username = quote(&self.username),
            api_token = quote(&self.api_token),
            project_key = quote(&self.project_key),
            input_file = quote(DEFAULT_INPUT_FILE),
            prefix = quote(DEFAULT_EPIC_NAME_PREFIX),
            story_type = quote(DEFAULT_STORY_TYPE),
            epic_type = quote(DEFAULT_EPIC_TYPE),
            epic_name_field = quote(DEFAULT_EPIC_NAME_FIELD),
            story_points_field = quote(DEFAULT_STORY_POINTS_FIELD),
        )
    }

    /// Renders a .env file holding these answers
    pub fn to_env_file(&self) -> String {
        format!(
            "JIRA_SERVER={}\nJIRA_USERNAME={}\nJIRA_API_TOKEN={}\nJIRA_PROJECT_KEY={}\n",
            self.server, self.username, self.api_token, self.project_key
        )
    }
}

/// Where `setup` writes its output
pub fn setup_target(config: &Config, env_file: bool) -> PathBuf {
    if env_file {
        ENV_FILE_NAME.into()
    } else {
        config.config_path.clone()
    }
}

/// Writes `contents` to a file that must not exist yet, creating parent
/// directories as needed
pub fn write_new_file(path: &Path, contents: &str) -> std::result::Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::Exists {
            path: path.to_path_buf(),
        });
    }

    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(prefix) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(prefix).map_err(write_err)?;
    }
    let mut file = File::create(path).map_err(write_err)?;
    file.write_all(contents.as_bytes()).map_err(write_err)?;
    Ok(())
}

/// The command line options supplied by the user
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub action: Action,

    /// Config file to read instead of the default one
    pub config_path: Option<PathBuf>,

    /// Story document to read instead of the configured one
    pub input_file: Option<PathBuf>,

    /// List of allowed (ignored) warnings, by name
    pub allowed: Vec<String>,

    /// List of denied (treated as errors) warnings, by name
    pub denied: Vec<String>,

    /// Controls color output
    pub use_color: ColorChoice,

    /// If true, use compact warning and error output
    pub compact: bool,

    /// If true, print per-story detail
    pub verbose: bool,
}

fn config_arg() -> Arg {
    Arg::new("config")
        .help("Configuration file path")
        .short('c')
        .long("config")
        .value_name("FILE")
}

fn input_arg() -> Arg {
    Arg::new("input-file")
        .help("User stories input file (overrides config)")
        .short('i')
        .long("input-file")
        .value_name("FILE")
}

fn flag_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .help(help)
        .long(name)
        .action(ArgAction::SetTrue)
}

fn app() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!("\n"))
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("color")
                .help("Controls colored output")
                .long("color")
                .global(true)
                .value_parser(["auto", "always", "ansi", "never"])
                .default_value("auto"),
        )
        .subcommand(
            Command::new("create")
                .about("Create epics and stories in Jira from a user stories file")
                .arg(config_arg())
                .arg(input_arg())
                .arg(
                    flag_arg("dry-run", "Parse stories but don't create Jira issues")
                        .short('d'),
                )
                .arg(flag_arg("verbose", "Verbose output").short('v'))
                .arg(
                    flag_arg("open", "Open the Jira project in a web browser when done")
                        .conflicts_with("dry-run"),
                ),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse and lint a user stories file without connecting to Jira")
                .arg(config_arg())
                .arg(input_arg())
                .arg(flag_arg("json", "Print the parsed epics as JSON"))
                .arg(
                    Arg::new("allow")
                        .help("Specifies warnings to ignore. Overrides deny.")
                        .short('a')
                        .long("allow")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("deny")
                        .help("Specifies warnings to treat as errors")
                        .short('D')
                        .long("deny")
                        .action(ArgAction::Append),
                )
                .arg(flag_arg(
                    "compact",
                    "Turns on compact error and warning output",
                )),
        )
        .subcommand(
            Command::new("test")
                .about("Test the Jira connection and configuration")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("setup")
                .about("Interactive setup wizard for configuration")
                .arg(config_arg())
                .arg(flag_arg("env", "Write a .env file instead of a config file")),
        )
}

fn flag(m: &ArgMatches, name: &str) -> bool {
    m.try_get_one::<bool>(name)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

fn value(m: &ArgMatches, name: &str) -> Option<String> {
    m.try_get_one::<String>(name).ok().flatten().cloned()
}

fn values(m: &ArgMatches, name: &str) -> Vec<String> {
    m.try_get_many::<String>(name)
        .ok()
        .flatten()
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default()
}

impl CliConfig {
    /// Parses the command line arguments
    pub fn from_args() -> Result<Self> {
        Self::from_matches(&app().get_matches())
    }

    /// Parses the given arguments, the first being the binary name
    pub fn try_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let m = app().try_get_matches_from(args)?;
        Self::from_matches(&m)
    }

    fn from_matches(m: &ArgMatches) -> Result<Self> {
        let (name, sub) = m.subcommand().ok_or_else(|| eyre!("No command given"))?;

        let action = match name {
            "create" => Action::Create {
                dry_run: flag(sub, "dry-run"),
                open: flag(sub, "open"),
            },
            "parse" => Action::Parse {
                json: flag(sub, "json"),
            },
            "test" => Action::Test,
            "setup" => Action::Setup {
                env_file: flag(sub, "env"),
            },
            other => return Err(eyre!("Unknown command: {}", other)),
        };

        let use_color = match value(sub, "color").as_deref().unwrap_or("auto") {
            "always" => ColorChoice::Always,
            "ansi" => ColorChoice::AlwaysAnsi,
            "auto" => {
                if atty::is(atty::Stream::Stdout) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                }
            }
            _ => ColorChoice::Never,
        };

        Ok(CliConfig {
            action,
            config_path: value(sub, "config").map(PathBuf::from),
            input_file: value(sub, "input-file").map(PathBuf::from),
            allowed: values(sub, "allow"),
            denied: values(sub, "deny"),
            use_color,
            compact: flag(sub, "compact"),
            verbose: flag(sub, "verbose"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliConfig {
        let mut full = vec!["jira-stories"];
        full.extend_from_slice(args);
        CliConfig::try_from_args(full).unwrap()
    }

    fn layered(file: &str, env: EnvOverrides, args: &[&str]) -> Config {
        Config::layer(
            "config.json".into(),
            ConfigFile::parse(file).unwrap(),
            env,
            cli(args),
        )
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = layered("{}", EnvOverrides::default(), &["parse"]);
        assert_eq!(config.jira.server, DEFAULT_SERVER);
        assert_eq!(config.jira.username, DEFAULT_USERNAME);
        assert_eq!(config.jira.api_token, DEFAULT_API_TOKEN);
        assert_eq!(config.jira.project_key, DEFAULT_PROJECT_KEY);
        assert_eq!(config.stories.input_file, PathBuf::from(DEFAULT_INPUT_FILE));
        assert_eq!(config.stories.epic_name_prefix, "");
        assert_eq!(config.stories.story_type, DEFAULT_STORY_TYPE);
        assert_eq!(config.stories.epic_type, DEFAULT_EPIC_TYPE);
        assert_eq!(config.stories.epic_name_field, DEFAULT_EPIC_NAME_FIELD);
        assert_eq!(config.stories.story_points_field, DEFAULT_STORY_POINTS_FIELD);
        assert_eq!(config.priorities, default_priorities());
        assert_eq!(config.action, Action::Parse { json: false });
    }

    #[test]
    fn env_wins_over_file_and_cli_wins_over_both() {
        let file = r#"
        // comments are fine
        {
          "jira": { "server": "https://file.example", "project_key": "FILE" },
          # so are these
          "stories": { "input_file": "from_file.txt", "story_type": "Task" }
        }"#;
        let env = EnvOverrides {
            project_key: Some("ENV".to_string()),
            ..EnvOverrides::default()
        };
        let config = layered(file, env, &["create", "-i", "from_cli.txt", "--dry-run"]);

        assert_eq!(config.jira.server, "https://file.example");
        assert_eq!(config.jira.project_key, "ENV");
        assert_eq!(config.stories.input_file, PathBuf::from("from_cli.txt"));
        assert_eq!(config.stories.story_type, "Task");
        assert_eq!(
            config.action,
            Action::Create {
                dry_run: true,
                open: false
            }
        );
    }

    #[test]
    fn lint_lists_are_merged() {
        let file = r#"{ "lint": { "allow": ["StrayText"], "deny": ["EmptyStory"] } }"#;
        let config = layered(
            file,
            EnvOverrides::default(),
            &["parse", "-a", "EmptyEpic", "-D", "all", "--compact"],
        );
        assert_eq!(config.allowed, vec!["EmptyEpic", "StrayText"]);
        assert_eq!(config.denied, vec!["all", "EmptyStory"]);
        assert!(config.compact);
    }

    #[test]
    fn priorities_can_be_replaced() {
        let file = r#"{ "priorities": { "P1": "Highest" } }"#;
        let config = layered(file, EnvOverrides::default(), &["parse"]);
        assert_eq!(config.priorities.len(), 1);
        assert_eq!(config.priorities["P1"], "Highest");
    }

    #[test]
    fn malformed_file_is_an_error_to_parse_but_not_to_load() {
        assert!(ConfigFile::parse("{ not json").is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let loaded = ConfigFile::load(&path);
        assert!(loaded.jira.server.is_none());

        let missing = ConfigFile::load(&dir.path().join("missing.json"));
        assert!(missing.priorities.is_none());
    }

    #[test]
    fn validation_reports_every_placeholder() {
        let config = layered("{}", EnvOverrides::default(), &["test"]);
        match config.validate() {
            Err(ConfigError::Invalid { missing }) => assert_eq!(
                missing,
                vec!["jira.server", "jira.username", "jira.api_token"]
            ),
            other => panic!("unexpected validation result: {:?}", other),
        }

        let env = EnvOverrides {
            server: Some("https://acme.atlassian.net".to_string()),
            username: Some("me@acme.com".to_string()),
            api_token: Some("secret".to_string()),
            project_key: Some("ACME".to_string()),
        };
        let config = layered("{}", env, &["test"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_values_are_invalid() {
        let file = r#"{ "jira": { "server": "https://a.b", "username": "u", "api_token": "t", "project_key": " " } }"#;
        let config = layered(file, EnvOverrides::default(), &["test"]);
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing or invalid configuration for: jira.project_key"
        );
    }

    #[test]
    fn summary_masks_token() {
        let env = EnvOverrides {
            api_token: Some("abcd".to_string()),
            ..EnvOverrides::default()
        };
        let config = layered("{}", env, &["test"]);
        let summary = config.summary();
        let token = summary
            .iter()
            .find(|(label, _)| *label == "JIRA API Token")
            .map(|(_, v)| v.as_str());
        assert_eq!(token, Some("****"));
        assert_eq!(mask(""), "Not set");
    }

    #[test]
    fn project_url_ignores_trailing_slash() {
        let file = r#"{ "jira": { "server": "https://acme.atlassian.net/", "project_key": "ACME" } }"#;
        let config = layered(file, EnvOverrides::default(), &["create"]);
        assert_eq!(
            config.jira.project_url(),
            "https://acme.atlassian.net/projects/ACME"
        );
    }

    #[test]
    fn setup_template_round_trips() {
        let answers = SetupAnswers {
            server: "https://acme.atlassian.net".to_string(),
            username: "me@acme.com".to_string(),
            api_token: "to\"ken".to_string(),
            project_key: "ACME".to_string(),
        };
        let parsed = ConfigFile::parse(&answers.to_config_file()).unwrap();
        assert_eq!(parsed.jira.api_token.as_deref(), Some("to\"ken"));
        assert_eq!(parsed.jira.project_key.as_deref(), Some("ACME"));
        assert_eq!(
            parsed.stories.input_file.as_deref(),
            Some(DEFAULT_INPUT_FILE)
        );

        assert!(answers.to_env_file().contains("JIRA_PROJECT_KEY=ACME\n"));
    }

    #[test]
    fn write_new_file_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        write_new_file(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(matches!(
            write_new_file(&path, "{}"),
            Err(ConfigError::Exists { .. })
        ));
    }

    #[test]
    fn unknown_color_and_missing_command() {
        assert!(CliConfig::try_from_args(["jira-stories"]).is_err());
        assert!(CliConfig::try_from_args(["jira-stories", "parse", "--color", "pink"]).is_err());
        let config = cli(&["setup", "--env", "--color", "never"]);
        assert_eq!(config.action, Action::Setup { env_file: true });
        assert!(matches!(config.use_color, ColorChoice::Never));
    }
}
