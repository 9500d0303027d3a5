//! Interactive creation of the gateway's Telegram session file

use anyhow::{bail, Context};
use std::io::{self, BufRead, Write};
use tg_gateway::{
    config::Settings,
    telegram::{grammers::GrammersConnector, Account, Connector, LoginConnection, TelegramError},
};

fn read_answer(input: &mut impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input closed");
    }
    Ok(line.trim().to_string())
}

/// Ask on stdout and read one line from stdin off the async runtime
async fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    tokio::task::spawn_blocking(|| read_answer(&mut io::stdin().lock()))
        .await
        .context("Input reader stopped")?
}

async fn login(connection: &dyn LoginConnection, phone: &str) -> anyhow::Result<Account> {
    let code_hash = connection
        .send_code(phone)
        .await
        .context("Failed to request a login code")?;

    loop {
        let code = prompt("Enter the code you received: ").await?;
        match connection.sign_in(phone, &code_hash, &code).await {
            Ok(account) => return Ok(account),
            Err(TelegramError::PhoneCodeInvalid) => {
                eprintln!("Invalid code, try again.");
            }
            Err(TelegramError::PasswordRequired) => loop {
                let password = prompt("Two-factor password: ").await?;
                match connection.check_password(&password).await {
                    Ok(account) => return Ok(account),
                    Err(TelegramError::PasswordInvalid) => {
                        eprintln!("Invalid password, try again.");
                        // A fresh password token comes with the next sign-in attempt
                        match connection.sign_in(phone, &code_hash, &code).await {
                            Err(TelegramError::PasswordRequired) => {}
                            Ok(account) => return Ok(account),
                            Err(e) => return Err(e).context("Sign-in failed"),
                        }
                    }
                    Err(e) => return Err(e).context("Password check failed"),
                }
            },
            Err(e) => return Err(e).context("Sign-in failed"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    if settings.telegram.api_id == 0 || settings.telegram.api_hash.trim().is_empty() {
        bail!("TELEGRAM_API_ID and TELEGRAM_API_HASH must be set");
    }

    let phone = if settings.telegram.phone_number.trim().is_empty() {
        prompt("Phone number (international format): ").await?
    } else {
        settings.telegram.phone_number.trim().to_string()
    };

    let session_file = settings.telegram.session_file(&phone);
    let connector = GrammersConnector::new(settings.telegram.api_id, settings.telegram.api_hash.clone());

    println!("Creating session {}", session_file.display());
    let connection = connector
        .open_login(&session_file)
        .await
        .context("Failed to connect to Telegram")?;

    let result = login(connection.as_ref(), &phone).await;
    connection.disconnect().await;
    let account = result?;

    let name = [account.first_name.as_deref(), account.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    println!("Signed in as {} (id {})", name, account.id);
    println!("Session saved to {}", session_file.display());

    Ok(())
}
