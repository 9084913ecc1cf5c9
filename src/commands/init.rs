use std::io::{self, Write};

use crate::config::{Config, DEFAULT_API_URL, DEFAULT_APP_URL, DEFAULT_IDENTITY_ENDPOINT};
use crate::error::{Error, Result};

/// Ask a question on stdout; an empty answer yields `default`.
fn prompt(question: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => print!("{question} [{default}]: "),
        None => print!("{question}: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(if input.is_empty() {
        default.unwrap_or_default().to_string()
    } else {
        input.to_string()
    })
}

pub async fn run() -> Result<()> {
    let config_path = Config::config_path()?;

    if config_path.exists() {
        let answer = prompt(
            &format!(
                "Config file already exists at {}. Overwrite? [y/N]",
                config_path.display()
            ),
            None,
        )?;

        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("User Admin Configuration");
    println!("========================\n");

    let endpoint = prompt("Identity provider endpoint", Some(DEFAULT_IDENTITY_ENDPOINT))?;
    let app_id = prompt("Application ID", None)?;
    if app_id.is_empty() {
        return Err(Error::EmptyField("application ID"));
    }
    let resource = prompt("API resource indicator [optional]", None)?;
    let api_url = prompt("API URL", Some(DEFAULT_API_URL))?;
    let app_url = prompt("App URL (sign-in redirects go here)", Some(DEFAULT_APP_URL))?;

    let contents = render(&endpoint, &app_id, &resource, &api_url, &app_url)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::ConfigRead {
            path: config_path.clone(),
            source: e,
        })?;
    }

    std::fs::write(&config_path, contents).map_err(|e| Error::ConfigRead {
        path: config_path.clone(),
        source: e,
    })?;

    println!("\nConfig saved to {}", config_path.display());
    println!("Run 'users login' to sign in.");

    Ok(())
}

fn render(
    endpoint: &str,
    app_id: &str,
    resource: &str,
    api_url: &str,
    app_url: &str,
) -> Result<String> {
    let mut identity = toml::Table::new();
    identity.insert("endpoint".into(), endpoint.into());
    identity.insert("app_id".into(), app_id.into());
    if !resource.is_empty() {
        identity.insert("resource".into(), resource.into());
    }

    let mut api = toml::Table::new();
    api.insert("url".into(), api_url.into());
    let mut app = toml::Table::new();
    app.insert("url".into(), app_url.into());

    let mut root = toml::Table::new();
    root.insert("identity".into(), identity.into());
    root.insert("api".into(), api.into());
    root.insert("app".into(), app.into());

    toml::to_string(&root).map_err(|e| Error::Io(io::Error::other(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_file_reads_back() {
        let contents = render(
            "https://tenant.logto.app",
            "app \"quoted\"",
            "",
            "http://localhost:8080",
            "http://localhost:3000",
        )
        .unwrap();

        let parsed: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(parsed["identity"]["app_id"].as_str(), Some("app \"quoted\""));
        assert!(parsed["identity"].get("resource").is_none());
        assert_eq!(parsed["api"]["url"].as_str(), Some("http://localhost:8080"));
    }
}
