use std::io::{self, BufRead, Write};
use std::sync::Arc;

use colored::Colorize;

use crate::client::UsersClient;
use crate::commands::users::{connect, print_users};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::manager::{Activity, FormMode, UserManager};
use crate::output;
use crate::session::SessionGate;
use crate::types::UserId;

const HELP: &str = "\
Commands:
  list              Refresh and show all users
  name <text>       Set the name field
  email <text>      Set the email field
  edit <id>         Load a user into the form for editing
  cancel            Leave edit mode and clear the form
  submit            Add the user, or save the edited one
  delete <id>       Delete a user
  help              Show this help
  quit              Leave the shell";

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Name(String),
    Email(String),
    Edit(UserId),
    Cancel,
    Submit,
    Delete(UserId),
    Help,
    Quit,
    Nothing,
}

impl ShellCommand {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let id = |rest: &str| {
            rest.parse::<UserId>()
                .map_err(|_| format!("'{word}' needs a numeric user id"))
        };

        match word.to_lowercase().as_str() {
            "" => Ok(Self::Nothing),
            "list" | "ls" | "refresh" => Ok(Self::List),
            "name" => Ok(Self::Name(rest.to_string())),
            "email" => Ok(Self::Email(rest.to_string())),
            "edit" => id(rest).map(Self::Edit),
            "cancel" => Ok(Self::Cancel),
            "submit" | "save" => Ok(Self::Submit),
            "delete" | "rm" => id(rest).map(Self::Delete),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("Unknown command '{other}'. Type 'help' for commands.")),
        }
    }
}

pub async fn run(config: &Config, gate: &Arc<SessionGate>) -> Result<()> {
    if !gate.is_authenticated() {
        println!("Please sign in to access the application: run 'users login'.");
        return Err(Error::NotSignedIn);
    }

    let mut manager = connect(config, gate)?;

    announce(Activity::Listing);
    if let Err(e) = manager.list().await {
        eprintln!("{} {e}", "Error fetching users:".red());
    }
    render(&manager);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{}> ", manager.mode().submit_label().to_lowercase());
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        let command = match ShellCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        match command {
            ShellCommand::Nothing => {}
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
            ShellCommand::Name(name) => manager.set_name(name),
            ShellCommand::Email(email) => manager.set_email(email),
            ShellCommand::Cancel => {
                manager.cancel_edit();
                render_form(&manager);
            }
            ShellCommand::Edit(id) => match manager.begin_edit(id) {
                Ok(()) => render_form(&manager),
                Err(e) => eprintln!("{e}"),
            },
            ShellCommand::List => {
                announce(Activity::Listing);
                report(manager.list().await);
                render(&manager);
            }
            ShellCommand::Submit => {
                announce(match manager.mode() {
                    FormMode::Create => Activity::Creating,
                    FormMode::Edit(_) => Activity::Updating,
                });
                report(manager.submit().await.map(|user| {
                    output::print_message(&format!("Saved #{} {}", user.id, user.name));
                }));
                render(&manager);
            }
            ShellCommand::Delete(id) => {
                announce(Activity::Deleting);
                report(manager.delete(id).await);
                render(&manager);
            }
        }
    }

    Ok(())
}

fn announce(activity: Activity) {
    if !output::is_quiet() {
        println!("{}", activity.label().bright_black());
    }
}

fn report(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("{} {e}", "Error:".red());
    }
}

fn render(manager: &UserManager<UsersClient>) {
    println!("\n{}", "Users".bold());
    print_users(manager.users());
    render_form(manager);
}

fn render_form(manager: &UserManager<UsersClient>) {
    let mode = manager.mode();
    let form = manager.form();
    let title = match mode {
        FormMode::Create => mode.title().to_string(),
        FormMode::Edit(id) => format!("{} {}", mode.title(), output::id_colored(id)),
    };

    println!("\n{}", title.bold());
    println!("  name:  {}", form.name);
    println!("  email: {}", form.email);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_commands() {
        assert_eq!(ShellCommand::parse("list\n"), Ok(ShellCommand::List));
        assert_eq!(
            ShellCommand::parse("name  Ada Lovelace "),
            Ok(ShellCommand::Name("Ada Lovelace".to_string()))
        );
        assert_eq!(
            ShellCommand::parse("EMAIL ada@example.com"),
            Ok(ShellCommand::Email("ada@example.com".to_string()))
        );
        assert_eq!(ShellCommand::parse("edit 7"), Ok(ShellCommand::Edit(7)));
        assert_eq!(ShellCommand::parse("rm 2"), Ok(ShellCommand::Delete(2)));
        assert_eq!(ShellCommand::parse("save"), Ok(ShellCommand::Submit));
        assert_eq!(ShellCommand::parse("   "), Ok(ShellCommand::Nothing));
    }

    #[test]
    fn clearing_a_field_is_allowed() {
        assert_eq!(
            ShellCommand::parse("name"),
            Ok(ShellCommand::Name(String::new()))
        );
    }

    #[test]
    fn rejects_bad_ids_and_unknown_words() {
        assert!(ShellCommand::parse("edit abc").is_err());
        assert!(ShellCommand::parse("delete").is_err());
        assert!(ShellCommand::parse("frobnicate").is_err());
    }
}
