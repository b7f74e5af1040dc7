//! One-shot "say" command

use std::error::Error;

use crate::api::ChatBackend;
use crate::core::session::{AuthPrompt, SendOutcome, Session};
use crate::core::storage::Storage;

/// What to print for a finished send: the reply on success, a reason otherwise.
pub(crate) fn outcome_text(outcome: SendOutcome, free_limit: u32) -> Result<String, String> {
    match outcome {
        SendOutcome::Replied(message) => Ok(message.content),
        SendOutcome::Failed { error, .. } => Err(format!("❌ {error}")),
        SendOutcome::AuthRequired(AuthPrompt::QuotaExhausted) => Err(format!(
            "🔒 You've used all {free_limit} free messages. Run `worldchat login` or `worldchat signup` to continue."
        )),
        SendOutcome::AuthRequired(AuthPrompt::PremiumModel(model)) => Err(format!(
            "🔒 {model} is a premium model. Run `worldchat login` first, or pick another with --model."
        )),
        SendOutcome::Ignored => Err("Nothing was sent.".to_string()),
    }
}

pub async fn run_say<B: ChatBackend, S: Storage>(
    mut session: Session<B, S>,
    prompt: &[String],
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: worldchat say <prompt>");
        std::process::exit(1);
    }

    session.restore().await;
    session.new_conversation();
    let outcome = session.send_message(&prompt).await;
    match outcome_text(outcome, session.quota().limit()) {
        Ok(reply) => {
            println!("{reply}");
            Ok(())
        }
        Err(reason) => {
            eprintln!("{reason}");
            std::process::exit(1);
        }
    }
}
