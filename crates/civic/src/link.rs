// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `civic link` operator commands.
//!
//! Both commands work on the same SQLite link-code table as a running bot,
//! so a code issued here can be entered on the web frontend and a code
//! issued in chat can be redeemed here.

use std::sync::Arc;
use std::time::Duration;

use civic_config::CivicConfig;
use civic_core::{AccountDirectory, CivicError, ExternalId};
use civic_intake::Destinations;
use civic_linking::AccountLinkDirectory;
use civic_platform::PlatformClient;
use civic_storage::{Database, SqliteLinkCodeStore};
use civic_telegram::TelegramChannel;
use clap::Subcommand;
use tracing::{info, warn};

#[derive(Subcommand, Debug)]
pub enum LinkCommand {
    /// Issue a link code for a Telegram user id.
    Issue {
        /// Numeric Telegram user id.
        telegram_id: i64,
        /// Telegram username to record with the code.
        #[arg(long)]
        username: Option<String>,
    },
    /// Redeem a link code on behalf of a platform user.
    Redeem {
        /// The 6-digit code.
        code: String,
        /// Platform user id to bind the Telegram identity to.
        user_id: String,
    },
}

pub async fn run_link(config: &CivicConfig, command: LinkCommand) -> Result<(), CivicError> {
    let db = Database::open(&config.storage).await?;
    let accounts: Arc<dyn AccountDirectory> = Arc::new(PlatformClient::new(&config.platform)?);
    let directory = build_directory(config, &db, accounts)?;

    match command {
        LinkCommand::Issue {
            telegram_id,
            username,
        } => {
            let code = directory
                .issue_code(&ExternalId::from(telegram_id), username.as_deref())
                .await?;
            let destinations = Destinations::new(&config.platform.frontend_url);
            println!("code:    {}", code.code);
            println!("expires: {}", code.expires_at.to_rfc3339());
            println!("link:    {}", destinations.link_account(&code.code));
        }
        LinkCommand::Redeem { code, user_id } => {
            let consumed = directory.consume_code(&code, &user_id).await?;
            info!(user_id = %user_id, "link code redeemed from the command line");
            println!(
                "linked Telegram user {} to platform user {user_id}",
                consumed.external_id
            );
        }
    }
    Ok(())
}

/// The link directory over the persistent code store. The Telegram channel
/// is attached as notifier when a bot token is configured.
fn build_directory(
    config: &CivicConfig,
    db: &Database,
    accounts: Arc<dyn AccountDirectory>,
) -> Result<AccountLinkDirectory, CivicError> {
    let codes = Arc::new(SqliteLinkCodeStore::new(db));
    let ttl = Duration::from_secs(config.linking.code_ttl_secs);
    let directory = AccountLinkDirectory::new(codes, accounts, ttl);

    if config.telegram.bot_token.is_none() {
        warn!("telegram.bot_token not set; linked users will not be notified");
        return Ok(directory);
    }
    let channel = TelegramChannel::new(config.telegram.clone())?;
    Ok(directory.with_notifier(Arc::new(channel)))
}
