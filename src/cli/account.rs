//! Interactive sign-in and sign-up prompts.

use std::io::{self, Write};

use crate::api::{ChatBackend, Credentials};
use crate::core::session::{AuthError, Session};
use crate::core::storage::Storage;
use crate::core::validation::SignUpForm;

fn prompt_line(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub(crate) fn read_credentials() -> io::Result<Credentials> {
    let email = prompt_line("Email: ")?;
    let password = rpassword::prompt_password("Password: ")?;
    Ok(Credentials { email, password })
}

fn read_sign_up_form() -> io::Result<SignUpForm> {
    Ok(SignUpForm {
        first_name: prompt_line("First name: ")?,
        last_name: prompt_line("Last name: ")?,
        email: prompt_line("Email: ")?,
        password: rpassword::prompt_password("Password: ")?,
        confirm_password: rpassword::prompt_password("Confirm password: ")?,
    })
}

/// Run a blocking terminal prompt off the async runtime.
pub(crate) async fn run_prompt<T: Send + 'static>(
    prompt: fn() -> io::Result<T>,
) -> io::Result<T> {
    tokio::task::spawn_blocking(prompt)
        .await
        .map_err(io::Error::other)?
}

fn report_auth_error(err: &AuthError) {
    match err {
        AuthError::Invalid(errors) => {
            eprintln!("❌ Please fix the following:");
            for (field, message) in errors.iter() {
                eprintln!("  • {}: {}", field.label(), message);
            }
        }
        AuthError::Rejected(_) => eprintln!("❌ {}", err.banner()),
    }
}

/// Prompt for credentials and sign in. Returns whether it worked.
pub async fn sign_in<B: ChatBackend, S: Storage>(session: &mut Session<B, S>) -> bool {
    let credentials = match run_prompt(read_credentials).await {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("❌ Could not read credentials: {err}");
            return false;
        }
    };
    match session.sign_in(credentials).await {
        Ok(user) => {
            println!("✅ Signed in as {} ({} plan)", user.display_name(), user.plan);
            true
        }
        Err(err) => {
            report_auth_error(&err);
            false
        }
    }
}

/// Prompt for the sign-up form and create an account.
pub async fn sign_up<B: ChatBackend, S: Storage>(session: &mut Session<B, S>) -> bool {
    let form = match run_prompt(read_sign_up_form).await {
        Ok(form) => form,
        Err(err) => {
            eprintln!("❌ Could not read the sign-up form: {err}");
            return false;
        }
    };
    match session.sign_up(form).await {
        Ok(user) => {
            println!("✅ Welcome, {}! Your account is ready.", user.display_name());
            true
        }
        Err(err) => {
            report_auth_error(&err);
            false
        }
    }
}
