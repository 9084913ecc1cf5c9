use colored::Colorize;

use crate::config::Config;
use crate::error::Result;
use crate::output;
use crate::session::{SessionGate, SessionState};

pub async fn login(gate: &SessionGate, config: &Config) -> Result<()> {
    if gate.is_authenticated() {
        output::print_message("Already signed in. Run 'users logout' to switch accounts.");
        return Ok(());
    }

    let redirect_uri = config.callback_uri();
    gate.sign_in(&redirect_uri, |url| {
        eprintln!("Open this URL in your browser to sign in:\n");
        eprintln!("    {url}\n");
        eprintln!("Waiting for the redirect to {redirect_uri} ...");
    })
    .await?;

    output::print_message("Signed in.");
    Ok(())
}

pub async fn logout(gate: &SessionGate, config: &Config) -> Result<()> {
    match gate.sign_out(&config.sign_out_uri()).await? {
        Some(url) => {
            output::print_message("Signed out locally.");
            if !output::is_quiet() {
                eprintln!("To end the identity provider session as well, open:\n\n    {url}");
            }
        }
        None => output::print_message("Signed out."),
    }
    Ok(())
}

pub fn status(gate: &SessionGate) {
    output::print_item(&gate.state(), |state| match state {
        SessionState::SignedOut => {
            println!("{}", "Signed out".red());
            println!("Run 'users login' to sign in.");
        }
        SessionState::SignedIn { expires_at } => {
            println!("{}", "Signed in".green());
            println!("Token expires: {}", output::format_timestamp(expires_at));
        }
        SessionState::Expired { expires_at } => {
            println!("{}", "Signed in (token expired)".yellow());
            println!(
                "Token expired: {}; it will be refreshed on next use.",
                output::format_timestamp(expires_at)
            );
        }
    });
}
