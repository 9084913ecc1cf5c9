use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Compact,
}

#[derive(Parser)]
#[command(name = "users")]
#[command(about = "Manage users behind your identity provider sign-in", version)]
#[command(after_help = "EXAMPLES:
    users login                                   Sign in through the browser
    users list                                    List all users
    users add --name \"Ada\" --email ada@x.com      Create a user
    users edit 3 --email ada@lovelace.dev         Update a user
    users shell                                   Interactive form")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json, compact)
    #[arg(long, short = 'o', global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Output as JSON (alias for --format json)
    #[arg(long, global = true, hide = true)]
    pub json: bool,

    /// Suppress success messages
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Show debug logs and detailed error information
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Get the effective output format, considering --json flag
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in through the identity provider
    #[command(after_help = "EXAMPLES:
    users login")]
    Login,
    /// Sign out and forget the local session
    #[command(after_help = "EXAMPLES:
    users logout")]
    Logout,
    /// Show whether you are signed in
    #[command(after_help = "EXAMPLES:
    users status
    users status --json")]
    Status,
    /// List users
    #[command(
        alias = "ls",
        after_help = "EXAMPLES:
    users list
    users list --format compact"
    )]
    List,
    /// Show a single user
    #[command(after_help = "EXAMPLES:
    users show 3")]
    Show {
        /// User id
        id: i64,
    },
    /// Create a user
    #[command(after_help = "EXAMPLES:
    users add --name \"Ada Lovelace\" --email ada@example.com")]
    Add(AddArgs),
    /// Update a user; omitted fields keep their current value
    #[command(after_help = "EXAMPLES:
    users edit 3 --name \"Ada King\"
    users edit 3 --email ada@lovelace.dev")]
    Edit(EditArgs),
    /// Delete a user
    #[command(
        alias = "rm",
        after_help = "EXAMPLES:
    users delete 3"
    )]
    Delete {
        /// User id
        id: i64,
    },
    /// Interactive form for listing and editing users
    #[command(after_help = "EXAMPLES:
    users shell")]
    Shell,
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    users completions bash > ~/.bash_completion.d/users
    users completions zsh > ~/.zfunc/_users
    users completions fish > ~/.config/fish/completions/users.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    #[command(after_help = "EXAMPLES:
    users init")]
    Init,
}

#[derive(Args)]
pub struct AddArgs {
    /// Display name
    #[arg(long, short)]
    pub name: String,

    /// Email address
    #[arg(long, short)]
    pub email: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// User id
    pub id: i64,

    /// New display name
    #[arg(long, short)]
    pub name: Option<String>,

    /// New email address
    #[arg(long, short)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn json_flag_overrides_format() {
        let cli = Cli::parse_from(["users", "list", "--json"]);
        assert_eq!(cli.output_format(), OutputFormat::Json);

        let cli = Cli::parse_from(["users", "-o", "compact", "list"]);
        assert_eq!(cli.output_format(), OutputFormat::Compact);
    }

    #[test]
    fn edit_fields_are_optional() {
        let cli = Cli::parse_from(["users", "edit", "3", "--email", "a@x.com"]);
        match cli.command {
            Commands::Edit(args) => {
                assert_eq!(args.id, 3);
                assert_eq!(args.name, None);
                assert_eq!(args.email.as_deref(), Some("a@x.com"));
            }
            _ => panic!("expected edit"),
        }
    }
}
