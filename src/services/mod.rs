//! Service layer for the pool watcher.
//!
//! This module contains the collaborators of a pass:
//! - Listing fetching from the pool portal (`PortalClient`)
//! - Notification dispatch (`Notifier`) over Telegram and mail
//! - Report rendering (`report`)

mod mailer;
mod notify;
mod portal;
pub mod report;
mod telegram;

pub use mailer::BrevoMailer;
pub use notify::{ChatChannel, MailChannel, NotificationDispatcher, Notifier};
pub use portal::{ListingFetcher, PortalClient};
pub use telegram::TelegramBot;
