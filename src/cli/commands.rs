//! Slash commands understood by the interactive chat.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    New,
    List,
    /// A 1-based position from `/list`, or a conversation id.
    Switch(String),
    /// Switch to a model, or show the current one.
    Model(Option<String>),
    Models,
    Login,
    Signup,
    Logout,
    Profile,
    Quota,
    ResetQuota,
    Subscribe,
    Billing,
    /// Set the transcript file, or toggle logging when no path is given.
    Log(Option<String>),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    Message(String),
    Command(ReplCommand),
    /// A slash command that is missing an argument or does not exist.
    Invalid(String),
}

pub struct CommandHelp {
    pub usage: &'static str,
    pub help: &'static str,
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        usage: "/help",
        help: "Show available commands.",
    },
    CommandHelp {
        usage: "/new",
        help: "Start a new conversation.",
    },
    CommandHelp {
        usage: "/list",
        help: "List conversations, newest first.",
    },
    CommandHelp {
        usage: "/switch <number|id>",
        help: "Make another conversation active.",
    },
    CommandHelp {
        usage: "/model [id]",
        help: "Show or change the model.",
    },
    CommandHelp {
        usage: "/models",
        help: "List available models.",
    },
    CommandHelp {
        usage: "/login",
        help: "Sign in to your account.",
    },
    CommandHelp {
        usage: "/signup",
        help: "Create an account.",
    },
    CommandHelp {
        usage: "/logout",
        help: "Sign out and return to guest mode.",
    },
    CommandHelp {
        usage: "/profile",
        help: "Show your account details.",
    },
    CommandHelp {
        usage: "/quota",
        help: "Show remaining free messages.",
    },
    CommandHelp {
        usage: "/reset-quota",
        help: "Clear the guest message counter.",
    },
    CommandHelp {
        usage: "/subscribe",
        help: "Get a checkout link for Premium.",
    },
    CommandHelp {
        usage: "/billing",
        help: "Get a link to manage your subscription.",
    },
    CommandHelp {
        usage: "/log [file]",
        help: "Log the transcript to a file, or pause/resume logging.",
    },
    CommandHelp {
        usage: "/quit",
        help: "Leave the chat.",
    },
];

pub fn parse_input(line: &str) -> ReplInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplInput::Empty;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ReplInput::Message(trimmed.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts
        .next()
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(str::to_string);

    let command = match name.as_str() {
        "help" | "?" => ReplCommand::Help,
        "new" => ReplCommand::New,
        "list" | "ls" => ReplCommand::List,
        "switch" => match arg {
            Some(target) => ReplCommand::Switch(target),
            None => return ReplInput::Invalid("Usage: /switch <number|id>".to_string()),
        },
        "model" => ReplCommand::Model(arg),
        "models" => ReplCommand::Models,
        "login" | "signin" => ReplCommand::Login,
        "signup" | "register" => ReplCommand::Signup,
        "logout" | "signout" => ReplCommand::Logout,
        "profile" | "me" => ReplCommand::Profile,
        "quota" => ReplCommand::Quota,
        "reset-quota" => ReplCommand::ResetQuota,
        "subscribe" | "upgrade" => ReplCommand::Subscribe,
        "billing" => ReplCommand::Billing,
        "log" => ReplCommand::Log(arg),
        "quit" | "exit" | "q" => ReplCommand::Quit,
        _ => return ReplInput::Invalid(format!("Unknown command: /{name} (try /help)")),
    };
    ReplInput::Command(command)
}
