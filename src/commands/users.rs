use std::sync::Arc;

use colored::Colorize;
use tabled::Tabled;

use crate::cli::{AddArgs, EditArgs, OutputFormat};
use crate::client::{AccessTokenSource, UsersClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::manager::UserManager;
use crate::output::{self, truncate};
use crate::session::SessionGate;
use crate::types::{User, UserId};

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: UserId,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: truncate(&user.name, 40),
            email: truncate(&user.email, 50),
        }
    }
}

/// Build a manager for the signed-in user. Every request asks the gate for
/// a token, so an expired one is refreshed on the way.
pub fn connect(config: &Config, gate: &Arc<SessionGate>) -> Result<UserManager<UsersClient>> {
    if !gate.is_authenticated() {
        return Err(Error::NotSignedIn);
    }

    let tokens: Arc<dyn AccessTokenSource> = gate.clone();
    let client = UsersClient::new(config.api_base(), Some(tokens))?;
    Ok(UserManager::new(client))
}

/// Connect and load the list. A failed load is reported and the command
/// carries on with whatever it has.
pub async fn mount(config: &Config, gate: &Arc<SessionGate>) -> Result<UserManager<UsersClient>> {
    let mut manager = connect(config, gate)?;
    if let Err(e) = manager.list().await {
        eprintln!("{} {e}", "Error fetching users:".red());
    }
    Ok(manager)
}

pub fn print_users(users: &[User]) {
    if users.is_empty() && output::format() != OutputFormat::Json {
        println!("No users found. Add some users to get started.");
        return;
    }
    output::print_table(users, |user| UserRow::from(user));
}

pub async fn list(manager: &mut UserManager<UsersClient>) -> Result<()> {
    manager.list().await?;
    print_users(manager.users());
    Ok(())
}

pub async fn show(manager: &UserManager<UsersClient>, id: UserId) -> Result<()> {
    let user = manager.get(id).await?;

    output::print_item(&user, |user| {
        println!("{} {}", output::id_colored(user.id), user.name);
        println!("Email: {}", user.email);
    });

    Ok(())
}

pub async fn add(manager: &mut UserManager<UsersClient>, args: AddArgs) -> Result<()> {
    let user = manager.create(&args.name, &args.email).await?;
    output::print_message(&format!("Created #{} {} <{}>", user.id, user.name, user.email));
    Ok(())
}

pub async fn edit(manager: &mut UserManager<UsersClient>, args: EditArgs) -> Result<()> {
    if args.name.is_none() && args.email.is_none() {
        output::print_message("No updates specified");
        return Ok(());
    }

    manager.begin_edit(args.id)?;
    if let Some(name) = args.name {
        manager.set_name(name);
    }
    if let Some(email) = args.email {
        manager.set_email(email);
    }

    let user = manager.submit().await?;
    output::print_message(&format!("Updated #{} {} <{}>", user.id, user.name, user.email));
    Ok(())
}

pub async fn delete(manager: &mut UserManager<UsersClient>, id: UserId) -> Result<()> {
    manager.delete(id).await?;
    output::print_message(&format!("Deleted #{id}"));
    Ok(())
}
