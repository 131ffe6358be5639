// src/services/mailer.rs

//! Transactional mail API channel.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::Result;
use crate::models::EmailConfig;
use crate::services::notify::MailChannel;
use crate::utils::http;

const CHANNEL: &str = "email";

#[derive(Serialize)]
struct Sender<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct Recipient<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    sender: Sender<'a>,
    to: Vec<Recipient<'a>>,
    subject: &'a str,
    text_content: &'a str,
    html_content: &'a str,
}

/// Mailer posting reports to a Brevo-compatible HTTP endpoint.
pub struct BrevoMailer {
    config: EmailConfig,
    client: Client,
}

impl BrevoMailer {
    pub fn new(config: EmailConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn payload<'a>(&'a self, subject: &'a str, plain: &'a str, html: &'a str) -> Payload<'a> {
        Payload {
            sender: Sender {
                name: &self.config.sender_name,
                email: &self.config.sender_email,
            },
            to: self
                .config
                .recipients
                .iter()
                .map(|email| Recipient {
                    email: email.as_str(),
                })
                .collect(),
            subject,
            text_content: plain,
            html_content: html,
        }
    }
}

#[async_trait]
impl MailChannel for BrevoMailer {
    fn name(&self) -> &'static str {
        CHANNEL
    }

    async fn send_formatted_report(&self, subject: &str, plain: &str, html: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.config.api_url)
            .header("api-key", &self.config.api_key)
            .json(&self.payload(subject, plain, html))
            .send()
            .await?;
        http::ensure_success(CHANNEL, response).await?;

        log::debug!(
            "Mailed '{}' to {} recipients",
            subject,
            self.config.recipients.len()
        );
        Ok(())
    }
}
