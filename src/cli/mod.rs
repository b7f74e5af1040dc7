//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod account;
pub mod admin;
pub mod chat;
pub mod commands;
pub mod render;
pub mod say;


use std::error::Error;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::api::{ApiClient, Plan};
use crate::core::config::{Config, ConfigKey};
use crate::core::keyring::KeyringStorage;
use crate::core::session::Session;
use crate::core::storage::{FileStorage, MemoryStorage, Storage};
use crate::logging::init_tracing;
use crate::utils::url::normalize_base_url;

pub type CliSession = Session<ApiClient, Box<dyn Storage>>;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", commit ",
    env!("VERGEN_GIT_SHA"),
    ")"
);

#[derive(Parser)]
#[command(name = "worldchat")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Chat with several AI models from the terminal")]
#[command(
    long_about = "worldchat is a terminal client for a multi-model chat service. \
Guests can send a limited number of free messages; signing in lifts the limit, \
keeps conversation history on the server and unlocks premium models.\n\n\
Environment Variables:\n\
  WORLDCHAT_BASE_URL  Address of the chat service (overrides the config file)\n\
  RUST_LOG            Diagnostic log filter (e.g. worldchat=debug)\n\n\
Commands inside the chat:\n\
  /help             List every slash command\n\
  /login, /signup   Sign in or create an account\n\
  /log <filename>   Enable logging to specified file\n\
  /log              Toggle logging pause/resume"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to chat with (see `worldchat models`)
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Enable logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,

    /// Address of the chat service
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Print diagnostic events to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Keep the auth token in the state file instead of the OS keyring
    #[arg(long, global = true)]
    pub no_keyring: bool,

    /// Keep nothing on disk for this run
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send a single message and print the reply
    Say {
        /// Message text
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Sign in to your account
    Login,
    /// Create an account
    Signup,
    /// Sign out and forget the stored token
    Logout {
        /// Also clear the guest message counter
        #[arg(long)]
        reset_quota: bool,
    },
    /// Show the signed-in account
    Profile,
    /// List conversations
    Conversations,
    /// List available models
    Models,
    /// Print a checkout link for the premium plan
    Subscribe,
    /// Print a link to the billing portal
    Billing,
    /// Operator tools (admin accounts only)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Sign in with an operator account
    Login,
    /// Forget the stored operator token
    Logout,
    /// Show usage statistics
    Stats,
    /// List registered users
    Users,
    /// Change a user's plan
    SetPlan {
        /// Id of the user to change
        user_id: String,
        /// New plan: free or premium
        plan: Plan,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

/// Service address from `--base-url`, then the environment, then the config file.
pub(crate) fn resolve_base_url(flag: Option<&str>, config: &Config) -> String {
    match flag.map(str::trim).filter(|value| !value.is_empty()) {
        Some(url) => normalize_base_url(url),
        None => config.effective_base_url(),
    }
}

fn open_storage(
    args: &Args,
    config: &Config,
    base_url: &str,
) -> Result<Box<dyn Storage>, Box<dyn Error>> {
    if args.ephemeral {
        debug!("using in-memory storage");
        return Ok(Box::new(MemoryStorage::new()));
    }
    let file = FileStorage::open(FileStorage::default_path()?)?;
    if args.no_keyring || !config.keyring_enabled() {
        Ok(Box::new(file))
    } else {
        Ok(Box::new(KeyringStorage::new(file, base_url)))
    }
}

fn open_session(args: &Args, config: &Config) -> Result<CliSession, Box<dyn Error>> {
    let base_url = resolve_base_url(args.base_url.as_deref(), config);
    debug!(%base_url, "opening session");
    let storage = open_storage(args, config, &base_url)?;
    let mut session = Session::new(
        ApiClient::new(&base_url, None),
        storage,
        config.session_options(),
    );
    if let Some(model) = args.model.as_deref() {
        if session.select_model(model).is_none() {
            return Err(
                format!("Unknown model '{model}'. Run `worldchat models` to list them.").into(),
            );
        }
    }
    Ok(session)
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let default_command = Commands::Chat;
    let command = args.command.as_ref().unwrap_or(&default_command);

    match command {
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let value = value
                .as_ref()
                .map(|parts| parts.join(" "))
                .unwrap_or_default();
            if value.is_empty() {
                config.print_all();
                return Ok(());
            }
            let key: ConfigKey = key.parse()?;
            config.set_value(key, &value)?;
            config.save()?;
            println!("✅ Set {key} to: {value}");
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            let key: ConfigKey = key.parse()?;
            config.unset_value(key);
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Admin { command } => {
            let config = Config::load()?;
            let base_url = resolve_base_url(args.base_url.as_deref(), &config);
            let mut storage = open_storage(&args, &config, &base_url)?;
            admin::run_admin(&base_url, &mut storage, command).await
        }
        Commands::Chat => {
            let config = Config::load()?;
            let session = open_session(&args, &config)?;
            chat::run_chat(session, args.log.clone()).await
        }
        Commands::Say { prompt } => {
            let config = Config::load()?;
            let session = open_session(&args, &config)?;
            say::run_say(session, prompt).await
        }
        Commands::Login => {
            let config = Config::load()?;
            let mut session = open_session(&args, &config)?;
            if !account::sign_in(&mut session).await {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Signup => {
            let config = Config::load()?;
            let mut session = open_session(&args, &config)?;
            if !account::sign_up(&mut session).await {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Logout { reset_quota } => {
            let config = Config::load()?;
            let mut session = open_session(&args, &config)?;
            let had_token = session.has_stored_token();
            session.sign_out();
            if *reset_quota {
                session.reset_quota()?;
            }
            if had_token {
                println!("✅ Signed out");
            } else {
                println!("Not signed in");
            }
            Ok(())
        }
        Commands::Profile => {
            let config = Config::load()?;
            let mut session = open_session(&args, &config)?;
            if !session.restore().await {
                eprintln!("Not signed in. Run `worldchat login` first.");
                std::process::exit(1);
            }
            if let Some(user) = session.user() {
                for line in render::profile_lines(user) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        Commands::Conversations => {
            let config = Config::load()?;
            let mut session = open_session(&args, &config)?;
            session.restore().await;
            for line in render::conversation_lines(session.conversations(), session.active_id()) {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Models => {
            let config = Config::load()?;
            let mut session = open_session(&args, &config)?;
            session.restore().await;
            for line in render::model_lines(session.model(), session.is_authenticated()) {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Subscribe => {
            let config = Config::load()?;
            let mut session = open_session(&args, &config)?;
            session.restore().await;
            match session.start_subscription().await {
                Ok(url) => println!("{url}"),
                Err(err) => {
                    eprintln!("❌ Failed to start checkout: {err}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Billing => {
            let config = Config::load()?;
            let mut session = open_session(&args, &config)?;
            session.restore().await;
            match session.manage_subscription().await {
                Ok(url) => println!("{url}"),
                Err(err) => {
                    eprintln!("❌ Failed to open billing portal: {err}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
    }
}
