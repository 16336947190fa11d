use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rbac_console::{
    ConsoleState,
    api::{permissions, roles, users},
    config::{AppConfig, Env},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line front end for the RBAC admin service.
#[derive(Parser, Debug)]
#[command(name = "rbac-console", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and cache the session locally.
    Login { username: String, password: String },
    /// Drop the cached session.
    Logout,
    /// Show the cached session.
    Whoami,
    /// Run a path through the navigation guard.
    Navigate { path: String },
    /// List users.
    Users,
    /// List roles.
    Roles,
    /// List permissions.
    Permissions,
}

/// main
///
/// Loads configuration, initializes logging, restores the session from disk, and runs
/// exactly one command.
#[tokio::main]
async fn main() -> ExitCode {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();
    let cli = Cli::parse();

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rbac_console=debug,reqwest=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
    }

    tracing::debug!("Console starting in {:?} mode against {}", config.env, config.api_base());

    // 4. State Assembly (store + transport + restored session)
    let state = match ConsoleState::connect(config).await {
        Ok(state) => state,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    // 5. Run the command
    match run(&state, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &ConsoleState, command: Command) -> rbac_console::Result<()> {
    match command {
        Command::Login { username, password } => {
            if !state.session.login(&username, &password).await {
                return Err(rbac_console::ClientError::rejected("login failed", None));
            }
            let session = state.session.snapshot();
            println!("logged in as {} (role: {})", session.username(), display_role(&session.role));
            println!("permissions: {}", session.permissions.len());
        }
        Command::Logout => {
            state.session.logout().await?;
            println!("logged out");
        }
        Command::Whoami => {
            let session = state.session.snapshot();
            if !session.is_authenticated() {
                println!("not logged in");
                return Ok(());
            }
            println!("user:  {}", session.username());
            println!("role:  {}", display_role(&session.role));
            for code in &session.permissions {
                println!("  - {code}");
            }
        }
        Command::Navigate { path } => {
            let navigation = state.guard.navigate(&path)?;
            for decision in &navigation.trail {
                println!("  {decision:?}");
            }
            match navigation.route {
                Some(route) => println!("-> {} ({})", route.path, route.title),
                None => println!("-> {} (not found)", navigation.path),
            }
            for route in state.registry.menu() {
                println!("  menu: {:<28} {}", route.path, route.title);
            }
        }
        Command::Users => {
            let response = state.api.send(users::list_users(&state.api.token())).await?;
            for user in response.data {
                println!("{:>5}  {}", user.id, user.username);
            }
        }
        Command::Roles => {
            let response = state.api.send(roles::list_roles(&state.api.token())).await?;
            for role in response.data {
                println!(
                    "{:>5}  {:<20} {}",
                    role.id,
                    role.name,
                    role.description.unwrap_or_default()
                );
            }
        }
        Command::Permissions => {
            let response = state
                .api
                .send(permissions::list_permissions(&state.api.token()))
                .await?;
            for permission in response.data {
                println!(
                    "{:>5}  {:<28} {} (parent {})",
                    permission.id, permission.code, permission.name, permission.parent_id
                );
            }
        }
    }
    Ok(())
}

fn display_role(role: &str) -> &str {
    if role.is_empty() { "-" } else { role }
}
