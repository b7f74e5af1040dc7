//! Line-oriented interactive chat.

use std::error::Error;
use std::io::{self, Write};

use tracing::warn;

use crate::api::ChatBackend;
use crate::cli::account;
use crate::cli::commands::{parse_input, ReplCommand, ReplInput, COMMANDS};
use crate::cli::render::{
    auth_prompt_text, conversation_lines, format_message, model_lines, profile_lines, quota_line,
};
use crate::core::message::Message;
use crate::core::session::{BeginSend, SendOutcome, Session};
use crate::core::storage::Storage;
use crate::utils::logging::LoggingState;

enum Flow {
    Continue,
    Quit,
}

async fn read_line(prompt: String) -> io::Result<Option<String>> {
    tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        match io::stdin().read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    })
    .await
    .map_err(io::Error::other)?
}

struct ChatLoop<B, S> {
    session: Session<B, S>,
    logging: LoggingState,
}

impl<B: ChatBackend, S: Storage> ChatLoop<B, S> {
    fn speaker_name(&self) -> String {
        self.session
            .user()
            .map(|user| user.display_name())
            .unwrap_or_else(|| "You".to_string())
    }

    fn log(&self, message: &Message) {
        if let Err(err) = self.logging.log_message(message, &self.speaker_name()) {
            warn!(error = %err, "could not write transcript");
        }
    }

    fn print_banner(&self) {
        println!("worldchat: model {}", self.session.model());
        match self.session.user() {
            Some(user) => println!("Signed in as {} ({} plan)", user.display_name(), user.plan),
            None => println!(
                "Guest mode. {}",
                quota_line(
                    self.session.remaining_free_messages(),
                    self.session.quota().limit()
                )
            ),
        }
        println!("Type /help for commands, /quit to leave.");
        self.print_active_conversation();
    }

    fn print_active_conversation(&self) {
        if let Some(conversation) = self.session.active_conversation() {
            println!("── {} ──", conversation.title);
            for message in conversation.messages() {
                println!("{}", format_message(message));
            }
        }
    }

    fn prompt(&self) -> String {
        let title = self
            .session
            .active_conversation()
            .map(|conversation| conversation.title.as_str())
            .unwrap_or("no conversation");
        format!("[{} | {}] > ", self.session.model(), title)
    }

    async fn send(&mut self, text: &str) {
        let pending = match self.session.begin_send(text) {
            BeginSend::Ignored => return,
            BeginSend::AuthRequired(prompt) => {
                println!(
                    "🔒 {}",
                    auth_prompt_text(&prompt, self.session.quota().limit())
                );
                return;
            }
            BeginSend::Pending(pending) => pending,
        };
        if let Some(sent) = self
            .session
            .active_conversation()
            .and_then(|conversation| conversation.messages().last())
        {
            self.log(sent);
        }

        println!("…");
        let result = self.session.backend().send_chat(&pending.request).await;
        match self.session.complete_send(pending, result) {
            SendOutcome::Replied(message) | SendOutcome::Failed { message, .. } => {
                println!("{}", format_message(&message));
                self.log(&message);
            }
            SendOutcome::Ignored | SendOutcome::AuthRequired(_) => {}
        }

        if let Some(remaining @ 0..=2) = self.session.remaining_free_messages() {
            println!(
                "ℹ️  {}",
                quota_line(Some(remaining), self.session.quota().limit())
            );
        }
    }

    async fn handle_command(&mut self, command: ReplCommand) -> Flow {
        match command {
            ReplCommand::Help => {
                for command in COMMANDS {
                    println!("  {:<22} {}", command.usage, command.help);
                }
            }
            ReplCommand::New => {
                let title = self.session.new_conversation().title.clone();
                println!("Started: {title}");
            }
            ReplCommand::List => {
                let lines =
                    conversation_lines(self.session.conversations(), self.session.active_id());
                for line in lines {
                    println!("{line}");
                }
            }
            ReplCommand::Switch(target) => {
                let id = match target.parse::<usize>() {
                    Ok(position) if position >= 1 => self
                        .session
                        .conversations()
                        .get(position - 1)
                        .map(|conversation| conversation.id.clone()),
                    _ => Some(target.clone()),
                };
                match id {
                    Some(id) if self.session.select_conversation(&id) => {
                        self.print_active_conversation()
                    }
                    _ => eprintln!("❌ No conversation matches '{target}'. Try /list."),
                }
            }
            ReplCommand::Model(None) => println!("Current model: {}", self.session.model()),
            ReplCommand::Model(Some(id)) => match self.session.select_model(&id) {
                Some(model) => println!("✅ Model set to {} ({})", model.id, model.name),
                None => eprintln!("❌ Unknown model '{id}'. Try /models."),
            },
            ReplCommand::Models => {
                for line in model_lines(self.session.model(), self.session.is_authenticated()) {
                    println!("{line}");
                }
            }
            ReplCommand::Login => {
                if account::sign_in(&mut self.session).await {
                    self.print_active_conversation();
                }
            }
            ReplCommand::Signup => {
                if account::sign_up(&mut self.session).await {
                    self.print_active_conversation();
                }
            }
            ReplCommand::Logout => {
                self.session.sign_out();
                println!("Signed out. You are chatting as a guest.");
                self.print_active_conversation();
            }
            ReplCommand::Profile => match self.session.refresh_profile().await {
                Ok(profile) => {
                    for line in profile_lines(profile) {
                        println!("{line}");
                    }
                }
                Err(err) => eprintln!("❌ {err}"),
            },
            ReplCommand::Quota => println!(
                "{}",
                quota_line(
                    self.session.remaining_free_messages(),
                    self.session.quota().limit()
                )
            ),
            ReplCommand::ResetQuota => match self.session.reset_quota() {
                Ok(()) => println!("✅ Guest message counter cleared."),
                Err(err) => eprintln!("❌ {err}"),
            },
            ReplCommand::Subscribe => match self.session.start_subscription().await {
                Ok(url) => println!("Open this link to upgrade to Premium:\n  {url}"),
                Err(err) => eprintln!("❌ Failed to start checkout: {err}"),
            },
            ReplCommand::Billing => match self.session.manage_subscription().await {
                Ok(url) => println!("Manage your subscription here:\n  {url}"),
                Err(err) => eprintln!("❌ Failed to open billing portal: {err}"),
            },
            ReplCommand::Log(Some(path)) => match self.logging.set_log_file(path) {
                Ok(message) => println!("{message}"),
                Err(err) => eprintln!("❌ Log error: {err}"),
            },
            ReplCommand::Log(None) => match self.logging.toggle_logging() {
                Ok(message) => println!("{message}"),
                Err(err) => eprintln!("❌ Log error: {err}"),
            },
            ReplCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }
}

pub async fn run_chat<B: ChatBackend, S: Storage>(
    mut session: Session<B, S>,
    log_file: Option<String>,
) -> Result<(), Box<dyn Error>> {
    session.restore().await;
    let mut chat = ChatLoop {
        session,
        logging: LoggingState::new(log_file)?,
    };
    chat.print_banner();

    while let Some(line) = read_line(chat.prompt()).await? {
        match parse_input(&line) {
            ReplInput::Empty => {}
            ReplInput::Message(text) => chat.send(&text).await,
            ReplInput::Invalid(message) => eprintln!("{message}"),
            ReplInput::Command(command) => {
                if let Flow::Quit = chat.handle_command(command).await {
                    break;
                }
            }
        }
    }
    Ok(())
}
