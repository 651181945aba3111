//! Command-line client for a portal API: recovers or opens a session and
//! reports what the portal's guarded views would do with it.
//!
//! ```text
//! portal-cli                                 # bootstrap from the cookie jar, report access
//! portal-cli github                          # print a GitHub sign-in URL and its state
//! portal-cli callback <url> --state <state>  # finish an OAuth redirect
//! portal-cli avatar <file>                   # upload a profile picture
//! ```
//!
//! `--email`/`--password` (or `DDUSTACK_EMAIL`/`DDUSTACK_PASSWORD`) sign in
//! with credentials when no session can be recovered.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ddustack::prelude::*;
use ddustack::telemetry::DEFAULT_FILTER;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "portal-cli")]
#[command(version, about = "DDUSTACK portal session client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Account email for credential sign-in
    #[arg(long, env = "DDUSTACK_EMAIL", global = true)]
    email: Option<String>,

    /// Account password for credential sign-in
    #[arg(long, env = "DDUSTACK_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,
}

#[derive(Debug, Subcommand, PartialEq)]
enum Command {
    /// Print a GitHub sign-in URL and the state to pass back to `callback`
    Github,
    /// Finish an OAuth redirect
    Callback {
        /// The URL the provider redirected to
        #[arg(value_name = "URL")]
        url: String,

        /// State printed by `github`; the callback must carry the same one
        #[arg(long)]
        state: String,
    },
    /// Upload a profile picture for the signed-in user
    Avatar {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// MIME type of the image
        #[arg(long, default_value = "image/png")]
        content_type: String,
    },
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// The portal's guarded areas and the roles each admits.
const VIEWS: &[(&str, &[Role])] = &[
    ("home", &[]),
    ("courses", &[Role::Student, Role::Lecturer]),
    ("grading", &[Role::Lecturer]),
    ("moderation", &[Role::Moderator, Role::Admin]),
    ("admin", &[Role::Admin]),
];

fn describe(access: Access) -> &'static str {
    match access {
        Access::Pending => "loading",
        Access::RedirectToLogin => "redirect to /auth",
        Access::Forbidden => "403",
        Access::Granted => "ok",
    }
}

fn report(session: &Session) {
    match &session.user {
        Some(user) => println!("signed in as {} ({})", user.full_name(), user.role),
        None => println!("not signed in"),
    }
    for (view, roles) in VIEWS {
        println!("  {view:<12} {}", describe(Access::evaluate(session, roles)));
    }
}

/// Bootstraps, falling back to credentials when given.
async fn sign_in(client: &PortalClient, cli: &Cli) -> anyhow::Result<()> {
    if let BootstrapOutcome::Authenticated(_) = client.bootstrap().await {
        return Ok(());
    }
    if let (Some(email), Some(password)) = (&cli.email, &cli.password) {
        client
            .gatekeeper()
            .login(email, password)
            .await
            .with_context(|| format!("signing in as {email}"))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(DEFAULT_FILTER)?;

    let config = ClientConfig::from_env().context("reading DDUSTACK_* settings")?;
    let cli = Cli::parse();
    let client = PortalClient::builder().config(config).build()?;

    match &cli.command {
        Some(Command::Github) => {
            let request = client.github_authorization()?;
            println!("{}", request.url);
            eprintln!("state: {}", request.state);
        }
        Some(Command::Callback { url, state }) => {
            let user = client.complete_oauth_redirect(url, Some(state.as_str())).await?;
            tracing::info!(user_id = %user.id, "oauth sign-in complete");
            report(&client.session());
        }
        Some(Command::Avatar { path, content_type }) => {
            sign_in(&client, &cli).await?;
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("avatar");
            let url = client
                .gatekeeper()
                .upload_avatar(filename, content_type, bytes)
                .await
                .context("uploading avatar")?;
            println!("avatar: {url}");
        }
        None => {
            sign_in(&client, &cli).await?;
            report(&client.session());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn session_with(role: Role) -> Session {
        Session {
            access_token: Some("T1".into()),
            user: Some(user(role)),
            is_initializing: false,
        }
    }

    fn user(role: Role) -> UserProfile {
        UserProfile {
            id: UserId("u-1".into()),
            username: None,
            first_name: "Dawit".into(),
            last_name: "Bekele".into(),
            email: None,
            avatar: None,
            metadata: None,
            provider: None,
            provider_id: None,
            role,
            user_id: None,
            is_active: true,
            is_verified: true,
            department: None,
            year: None,
            semester: None,
            date_joined: None,
            updated_at: None,
        }
    }

    fn decisions(session: &Session) -> Vec<&'static str> {
        VIEWS
            .iter()
            .map(|(_, roles)| describe(Access::evaluate(session, roles)))
            .collect()
    }

    #[test]
    fn test_views_for_lecturer() {
        let s = session_with(Role::Lecturer);
        assert_eq!(decisions(&s), vec!["ok", "ok", "ok", "403", "403"]);
    }

    #[test]
    fn test_views_for_signed_out_visitor() {
        let s = Session {
            is_initializing: false,
            ..Session::default()
        };
        assert!(decisions(&s).iter().all(|d| *d == "redirect to /auth"));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_callback_parses_url_and_state() {
        let cli = Cli::try_parse_from([
            "portal-cli",
            "callback",
            "http://localhost:5173/oauth/callback/github?code=abc&state=s1",
            "--state",
            "s1",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Some(Command::Callback {
                url: "http://localhost:5173/oauth/callback/github?code=abc&state=s1".into(),
                state: "s1".into(),
            })
        );
    }

    #[test]
    fn test_callback_without_state_is_rejected() {
        let err = Cli::try_parse_from(["portal-cli", "callback", "http://localhost/cb"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_no_subcommand_reports_status() {
        let cli = Cli::try_parse_from(["portal-cli"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_avatar_defaults_to_png() {
        let cli = Cli::try_parse_from(["portal-cli", "avatar", "me.png"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Avatar {
                path: PathBuf::from("me.png"),
                content_type: "image/png".into(),
            })
        );
    }
}
