use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "convo", version, about = "Terminal chat client", long_about = None)]
pub struct Cli {
    /// Defaults to `chat` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Enter the interactive chat REPL
    Chat {
        /// Open this saved conversation instead of a new chat
        #[arg(short = 'C', long)]
        conversation: Option<String>,
    },

    /// Manage saved conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },

    /// Print the anonymous user id sent with every request
    Whoami,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConversationAction {
    /// List saved conversations
    List {
        /// Only show conversations whose title contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print a conversation transcript
    Show { id: String },

    /// Delete a conversation
    Delete { id: String },

    /// Rename a conversation
    Rename { id: String, title: String },

    /// Delete every conversation of this user
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_is_optional() {
        let cli = Cli::try_parse_from(["convo"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, "config.yaml");
    }

    #[test]
    fn test_parse_conversation_actions() {
        let cli = Cli::try_parse_from(["convo", "conversations", "rename", "c1", "New title", "-c", "alt.yaml"])
            .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Conversations {
                action: ConversationAction::Rename {
                    id: "c1".to_string(),
                    title: "New title".to_string()
                }
            })
        );
        assert_eq!(cli.config, "alt.yaml");
    }

    #[test]
    fn test_chat_with_conversation() {
        let cli = Cli::try_parse_from(["convo", "chat", "--conversation", "c7"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Chat {
                conversation: Some("c7".to_string())
            })
        );
    }
}
