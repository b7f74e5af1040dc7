use std::error::Error;

use crate::admin::{admin_sign_in, admin_sign_out, AdminConsole, AdminError};
use crate::api::ApiClient;
use crate::cli::account::{read_credentials, run_prompt};
use crate::cli::render::{stats_lines, user_lines};
use crate::cli::AdminCommands;
use crate::core::storage::Storage;

fn fail(err: AdminError) -> ! {
    eprintln!("❌ {err}");
    if let Some(source) = err.source() {
        eprintln!("   {source}");
    }
    std::process::exit(1);
}

pub async fn run_admin<S: Storage + ?Sized>(
    base_url: &str,
    storage: &mut S,
    command: &AdminCommands,
) -> Result<(), Box<dyn Error>> {
    match command {
        AdminCommands::Login => {
            let credentials = run_prompt(read_credentials).await?;
            let mut client = ApiClient::new(base_url, None);
            match admin_sign_in(&mut client, storage, &credentials).await {
                Ok(()) => println!("✅ Signed in to the admin console"),
                Err(err) => fail(err),
            }
        }
        AdminCommands::Logout => match admin_sign_out(storage) {
            Ok(()) => println!("✅ Signed out of the admin console"),
            Err(err) => fail(err),
        },
        AdminCommands::Stats => {
            let mut console = AdminConsole::new(ApiClient::from_storage(base_url, &*storage));
            match console.fetch_stats().await {
                Ok(stats) => stats_lines(stats).iter().for_each(|line| println!("{line}")),
                Err(err) => fail(err),
            }
        }
        AdminCommands::Users => {
            let mut console = AdminConsole::new(ApiClient::from_storage(base_url, &*storage));
            match console.fetch_users().await {
                Ok(users) if users.is_empty() => println!("No users."),
                Ok(users) => user_lines(users).iter().for_each(|line| println!("{line}")),
                Err(err) => fail(err),
            }
        }
        AdminCommands::SetPlan { user_id, plan } => {
            let mut console = AdminConsole::new(ApiClient::from_storage(base_url, &*storage));
            match console.change_plan(user_id, *plan).await {
                Ok(()) => println!("✅ {user_id} is now on the {plan} plan"),
                Err(err) => fail(err),
            }
        }
    }
    Ok(())
}
