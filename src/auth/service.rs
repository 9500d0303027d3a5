//! Phone-code login flow that provisions session files

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::store::{PendingLogin, PendingLoginStore};
use crate::config::{session_name, TelegramConfig};
use crate::error::{AppError, Result};
use crate::telegram::{Account, Connector, LoginConnection, TelegramError, TgResult};

/// Returned once a verification code has been sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRequest {
    pub phone_number: String,
    pub login_id: String,
}

/// Normalise a phone number: drop spaces, dashes and parentheses, then
/// require an optional `+` followed by 7 to 15 digits.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let phone: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let digits = phone.strip_prefix('+').unwrap_or(&phone);
    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidRequest(format!(
            "Invalid phone number format: '{}'",
            raw.trim()
        )));
    }

    Ok(phone)
}

pub struct LoginService {
    store: PendingLoginStore,
    connector: Arc<dyn Connector>,
    telegram: TelegramConfig,
}

impl LoginService {
    pub fn new(store: PendingLoginStore, connector: Arc<dyn Connector>, telegram: TelegramConfig) -> Self {
        Self {
            store,
            connector,
            telegram,
        }
    }

    pub fn store(&self) -> &PendingLoginStore {
        &self.store
    }

    /// Send a verification code and record the pending login
    pub async fn request_code(&self, phone: &str) -> Result<CodeRequest> {
        let phone = normalize_phone(phone)?;
        let session_file = self.telegram.session_file(&phone);

        info!(phone = %phone, session = %session_file.display(), "Requesting login code");

        let connection = self.connector.open_login(&session_file).await?;
        let sent = connection.send_code(&phone).await;
        connection.disconnect().await;
        let phone_code_hash = sent?;

        let login = PendingLogin {
            phone_number: phone.clone(),
            phone_code_hash,
            session_name: session_name(&phone),
            login_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };
        self.store.upsert(&login).await?;

        info!(phone = %phone, login_id = %login.login_id, "Login code sent");

        Ok(CodeRequest {
            phone_number: phone,
            login_id: login.login_id,
        })
    }

    /// Complete a pending login with the received code and, if the account
    /// has two-factor authentication, its password.
    pub async fn submit_code(
        &self,
        phone: &str,
        code: &str,
        password: Option<&str>,
        login_id: Option<&str>,
    ) -> Result<Account> {
        let phone = normalize_phone(phone)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::InvalidRequest("Verification code cannot be empty".to_string()));
        }

        let pending = self.store.get(&phone).await?.ok_or_else(|| {
            AppError::InvalidRequest(
                "No pending login for this phone number. Request a code first.".to_string(),
            )
        })?;

        if let Some(login_id) = login_id {
            if login_id != pending.login_id {
                return Err(AppError::InvalidRequest(
                    "login_id does not match the pending login".to_string(),
                ));
            }
        }

        let session_file = self.telegram.session_file(&phone);
        let result = match self.connector.open_login(&session_file).await {
            Ok(connection) => {
                let result = sign_in(connection.as_ref(), &pending, code, password).await;
                connection.disconnect().await;
                result
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(account) => {
                self.store.delete(&phone).await?;
                info!(phone = %phone, user_id = account.id, "Login completed");
            }
            Err(TelegramError::PasswordRequired) | Err(TelegramError::PasswordInvalid) => {
                info!(phone = %phone, "Login waiting for two-factor password");
            }
            Err(e) => {
                self.store.delete(&phone).await?;
                warn!(phone = %phone, error = %e, "Login failed, pending login discarded");
            }
        }

        result.map_err(AppError::from)
    }
}

async fn sign_in(
    connection: &dyn LoginConnection,
    pending: &PendingLogin,
    code: &str,
    password: Option<&str>,
) -> TgResult<Account> {
    match connection
        .sign_in(&pending.phone_number, &pending.phone_code_hash, code)
        .await
    {
        Err(TelegramError::PasswordRequired) => match password.filter(|p| !p.is_empty()) {
            Some(password) => connection.check_password(password).await,
            None => Err(TelegramError::PasswordRequired),
        },
        other => other,
    }
}
