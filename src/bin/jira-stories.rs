use jira_stories::commands;
use jira_stories::CliConfig;
use jira_stories::Config;

use color_eyre::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose {
        "jira_stories=info"
    } else {
        "jira_stories=warn"
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli_config = CliConfig::from_args()?;
    init_tracing(cli_config.verbose)?;

    let config = Config::from_cli(cli_config);
    commands::run(&config)
}
