use std::path::PathBuf;

use clap::{Parser, Subcommand};
use inbox_cli::cli::{load_config, run_command, CliCommand};
use inbox_cli::tracing_setup::init_tracing;
use inbox_core::models::Tab;

#[derive(Parser)]
#[command(name = "inbox-cli")]
#[command(about = "Operator console for the conversation inbox")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, short)]
    json: bool,

    /// Pretty-print JSON output (implies --json)
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (apiUrl, apiToken, socketPath, agent)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List conversations in a tab
    Conversations {
        /// all, unreplied, done, main, general, requests or spam
        #[arg(long, short, default_value = "main", value_parser = parse_tab)]
        tab: Tab,
        /// Filter by customer name, phone or preview text
        #[arg(long, short)]
        search: Option<String>,
        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Show the timeline of one conversation
    Messages {
        conversation_id: String,
        /// Also fetch this many older pages
        #[arg(long, default_value_t = 0)]
        older: u32,
    },

    /// Send a text message as the configured agent
    Send {
        conversation_id: String,
        content: String,
    },

    /// Mark conversations as done
    Close {
        #[arg(required = true)]
        conversation_ids: Vec<String>,
    },

    /// Follow the push stream and print live changes
    Watch {
        /// Keep this conversation open while watching
        #[arg(long)]
        conversation: Option<String>,
        /// Push socket path (defaults to socketPath from config)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

fn parse_tab(value: &str) -> Result<Tab, String> {
    Tab::parse(value).ok_or_else(|| format!("unknown tab: {}", value))
}

impl From<Commands> for CliCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Conversations { tab, search, pages } => CliCommand::Conversations {
                tab,
                search,
                pages: pages.max(1),
            },
            Commands::Messages {
                conversation_id,
                older,
            } => CliCommand::Messages {
                conversation_id,
                older_pages: older,
            },
            Commands::Send {
                conversation_id,
                content,
            } => CliCommand::Send {
                conversation_id,
                content,
            },
            Commands::Close { conversation_ids } => CliCommand::Close { conversation_ids },
            Commands::Watch {
                conversation,
                socket,
            } => CliCommand::Watch {
                conversation_id: conversation,
                socket,
            },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Warning: {:#}", e);
    }

    let config = match load_config(cli.config.as_deref(), cli.api_url) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let json = cli.json || cli.pretty;
    if let Err(e) = run_command(cli.command.into(), config, json, cli.pretty).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("inbox-cli").chain(args.iter().copied()))
    }

    #[test]
    fn test_conversations_defaults() {
        let cli = parse(&["conversations"]).unwrap();
        assert_eq!(
            CliCommand::from(cli.command),
            CliCommand::Conversations {
                tab: Tab::Main,
                search: None,
                pages: 1,
            }
        );
    }

    #[test]
    fn test_tab_is_validated() {
        let cli = parse(&["--pretty", "conversations", "--tab", "unreplied", "-s", "refund"]).unwrap();
        assert!(cli.pretty);
        assert_eq!(
            CliCommand::from(cli.command),
            CliCommand::Conversations {
                tab: Tab::Unreplied,
                search: Some("refund".to_string()),
                pages: 1,
            }
        );
        assert!(parse(&["conversations", "--tab", "inbox"]).is_err());
    }

    #[test]
    fn test_close_requires_ids() {
        assert!(parse(&["close"]).is_err());
        let cli = parse(&["close", "c1", "c2"]).unwrap();
        assert_eq!(
            CliCommand::from(cli.command),
            CliCommand::Close {
                conversation_ids: vec!["c1".to_string(), "c2".to_string()],
            }
        );
    }

    #[test]
    fn test_watch_options() {
        let cli = parse(&["watch", "--conversation", "c9", "--socket", "/tmp/inbox.sock"]).unwrap();
        assert_eq!(
            CliCommand::from(cli.command),
            CliCommand::Watch {
                conversation_id: Some("c9".to_string()),
                socket: Some(PathBuf::from("/tmp/inbox.sock")),
            }
        );
    }
}
