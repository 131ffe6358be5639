// src/services/notify.rs

//! Notification dispatch.
//!
//! A [`Notifier`] fans one listing out to every configured channel and
//! reports a single combined result.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, ListingRecord};
use crate::services::report;
use crate::services::{BrevoMailer, TelegramBot};

/// Sends one listing through every notification channel.
///
/// Callers may retry the same record on a later pass; duplicate downstream
/// messages are accepted.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, record: &ListingRecord) -> Result<()>;
}

/// Instant-message channel: short alert plus photo.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_short_alert(&self, text: &str) -> Result<()>;

    async fn send_photo(&self, path: &Path) -> Result<()>;
}

/// Long-form channel carrying the full report.
#[async_trait]
pub trait MailChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_formatted_report(&self, subject: &str, plain: &str, html: &str) -> Result<()>;
}

/// Dispatcher over the configured chat and mail channels.
pub struct Notifier {
    portal_url: String,
    chat: Option<Box<dyn ChatChannel>>,
    mail: Option<Box<dyn MailChannel>>,
}

impl Notifier {
    /// Create a notifier without channels.
    pub fn new(portal_url: impl Into<String>) -> Self {
        Self {
            portal_url: portal_url.into(),
            chat: None,
            mail: None,
        }
    }

    pub fn with_chat(mut self, chat: impl ChatChannel + 'static) -> Self {
        self.chat = Some(Box::new(chat));
        self
    }

    pub fn with_mail(mut self, mail: impl MailChannel + 'static) -> Self {
        self.mail = Some(Box::new(mail));
        self
    }

    /// Build the channels enabled in the configuration.
    pub fn from_config(config: &Config, client: Client) -> Result<Self> {
        let mut notifier = Self::new(config.portal.base_url.clone());
        if config.telegram.enabled {
            notifier = notifier.with_chat(TelegramBot::new(&config.telegram, client.clone()));
        }
        if config.email.enabled {
            notifier = notifier.with_mail(BrevoMailer::new(config.email.clone(), client));
        }
        if notifier.channel_count() == 0 {
            return Err(AppError::config("no notification channel enabled"));
        }
        Ok(notifier)
    }

    pub fn channel_count(&self) -> usize {
        usize::from(self.chat.is_some()) + usize::from(self.mail.is_some())
    }

    async fn send_chat(&self, chat: &dyn ChatChannel, record: &ListingRecord) -> Result<()> {
        chat.send_short_alert(&report::short_alert(record, &self.portal_url))
            .await?;
        match record.primary_photo() {
            Some(photo) => chat.send_photo(photo).await,
            None => {
                log::debug!("Listing {} has no photo for {}", record.id, chat.name());
                Ok(())
            }
        }
    }

    async fn send_mail(&self, mail: &dyn MailChannel, record: &ListingRecord) -> Result<()> {
        let photos = report::load_photos(&record.photo_paths).await?;
        mail.send_formatted_report(
            &report::subject(record),
            &report::plain_body(record),
            &report::html_body(record, &photos),
        )
        .await
    }
}

#[async_trait]
impl NotificationDispatcher for Notifier {
    async fn notify(&self, record: &ListingRecord) -> Result<()> {
        if self.channel_count() == 0 {
            return Err(AppError::config("no notification channel configured"));
        }

        let mut failures = Vec::new();

        if let Some(chat) = &self.chat {
            if let Err(e) = self.send_chat(chat.as_ref(), record).await {
                log::warn!("{} failed for listing {}: {}", chat.name(), record.id, e);
                failures.push(format!("{}: {}", chat.name(), e));
            }
        }

        if let Some(mail) = &self.mail {
            if let Err(e) = self.send_mail(mail.as_ref(), record).await {
                log::warn!("{} failed for listing {}: {}", mail.name(), record.id, e);
                failures.push(format!("{}: {}", mail.name(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AppError::notify("dispatcher", failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use crate::models::{ListingDetails, ListingId};

    #[derive(Clone, Default)]
    struct Outbox(Arc<Mutex<Vec<String>>>);

    impl Outbox {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeChat {
        outbox: Outbox,
        fail: bool,
    }

    #[async_trait]
    impl ChatChannel for FakeChat {
        fn name(&self) -> &'static str {
            "chat"
        }

        async fn send_short_alert(&self, text: &str) -> Result<()> {
            if self.fail {
                return Err(AppError::notify("chat", "offline"));
            }
            self.outbox.push(format!("alert:{text}"));
            Ok(())
        }

        async fn send_photo(&self, path: &Path) -> Result<()> {
            self.outbox.push(format!("photo:{}", path.display()));
            Ok(())
        }
    }

    struct FakeMail {
        outbox: Outbox,
    }

    #[async_trait]
    impl MailChannel for FakeMail {
        fn name(&self) -> &'static str {
            "mail"
        }

        async fn send_formatted_report(&self, subject: &str, plain: &str, html: &str) -> Result<()> {
            assert!(html.contains("<h1>"));
            self.outbox
                .push(format!("mail:{subject}:{}", plain.lines().next().unwrap_or("")));
            Ok(())
        }
    }

    fn record(photos: Vec<PathBuf>) -> ListingRecord {
        let details: ListingDetails = [("Kenteken", "12-ABC-3"), ("Merk", "opel")]
            .into_iter()
            .collect();
        ListingRecord::build(ListingId::new(1), details, "", photos)
    }

    #[tokio::test]
    async fn test_all_channels_receive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let photo = tmp.path().join("1.png");
        std::fs::write(&photo, b"png").unwrap();

        let outbox = Outbox::default();
        let notifier = Notifier::new("https://portal.example.nl/PoolSite")
            .with_chat(FakeChat {
                outbox: outbox.clone(),
                fail: false,
            })
            .with_mail(FakeMail {
                outbox: outbox.clone(),
            });

        notifier.notify(&record(vec![photo.clone()])).await.unwrap();

        assert_eq!(
            outbox.entries(),
            vec![
                "alert:New car: Opel. Check https://portal.example.nl/PoolSite".to_string(),
                format!("photo:{}", photo.display()),
                "mail:New car available - 12-ABC-3:Opel".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_photo_skips_photo_message() {
        let outbox = Outbox::default();
        let notifier = Notifier::new("https://x").with_chat(FakeChat {
            outbox: outbox.clone(),
            fail: false,
        });

        notifier.notify(&record(Vec::new())).await.unwrap();
        assert_eq!(outbox.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_channel_fails_notify_but_others_run() {
        let outbox = Outbox::default();
        let notifier = Notifier::new("https://x")
            .with_chat(FakeChat {
                outbox: outbox.clone(),
                fail: true,
            })
            .with_mail(FakeMail {
                outbox: outbox.clone(),
            });

        let err = notifier.notify(&record(Vec::new())).await.unwrap_err();
        assert!(matches!(err, AppError::Notify { .. }));
        assert_eq!(
            outbox.entries(),
            vec!["mail:New car available - 12-ABC-3:Opel".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_photo_file_fails_mail() {
        let outbox = Outbox::default();
        let notifier = Notifier::new("https://x").with_mail(FakeMail {
            outbox: outbox.clone(),
        });

        let result = notifier
            .notify(&record(vec![PathBuf::from("/nonexistent/1.png")]))
            .await;
        assert!(result.is_err());
        assert!(outbox.entries().is_empty());
    }

    #[tokio::test]
    async fn test_no_channels_is_error() {
        let notifier = Notifier::new("https://x");
        assert!(notifier.notify(&record(Vec::new())).await.is_err());
    }

    #[test]
    fn test_from_config_respects_enabled() {
        let mut config = Config::default();
        config.email.enabled = false;
        let notifier = Notifier::from_config(&config, Client::new()).unwrap();
        assert_eq!(notifier.channel_count(), 1);

        config.telegram.enabled = false;
        assert!(Notifier::from_config(&config, Client::new()).is_err());
    }
}
