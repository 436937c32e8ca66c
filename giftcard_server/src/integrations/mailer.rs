use std::sync::Arc;

use giftcard_engine::traits::{DeliveredCard, GiftCardNotifier, NotifierError, OrderSummary};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};
use serde::Serialize;

use crate::{config::MailConfig, errors::ServerError};

/// The JSON body posted to the mail relay
#[derive(Debug, Clone, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// [`GiftCardNotifier`] that emails codes through an HTTP mail relay
#[derive(Clone)]
pub struct MailRelayNotifier {
    config: MailConfig,
    client: Arc<Client>,
}

impl MailRelayNotifier {
    pub fn new(config: MailConfig) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
                .map_err(|e| ServerError::ConfigurationError(format!("Invalid mail relay API key. {e}")))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create mail client. {e}")))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn message(&self, recipient: &str, summary: &OrderSummary) -> MailMessage {
        MailMessage {
            from: self.config.from.clone(),
            to: recipient.to_string(),
            subject: self.config.subject.clone(),
            html: render_codes(summary),
        }
    }
}

impl GiftCardNotifier for MailRelayNotifier {
    async fn deliver(&self, recipient: &str, summary: &OrderSummary) -> Result<(), NotifierError> {
        let Some(url) = self.config.relay_url.as_deref() else {
            warn!("📧️ No mail relay is configured. Codes for order {} were not sent.", summary.order_id);
            return Err(NotifierError::Transient("No mail relay is configured".into()));
        };
        let message = self.message(recipient, summary);
        trace!("📧️ Posting {} gift cards for order {} to the mail relay", summary.cards.len(), summary.order_id);
        let response = self
            .client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifierError::Transient(format!("Could not reach the mail relay. {e}")))?;
        if response.status().is_success() {
            info!("📧️ Gift cards for order {} sent", summary.order_id);
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("📧️ The mail relay refused the message for order {}. {status} {text}", summary.order_id);
            Err(NotifierError::Transient(format!("The mail relay answered {status}. {text}")))
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn render_card(card: &DeliveredCard) -> String {
    let mut html = format!(
        "<div class=\"gift-card\">\n<h3>{} {}</h3>\n<p>Code: <strong>{}</strong></p>\n",
        escape_html(&card.brand),
        card.denomination,
        escape_html(&card.code)
    );
    if let Some(pin) = &card.pin {
        html.push_str(&format!("<p>PIN: <strong>{}</strong></p>\n", escape_html(pin)));
    }
    if let Some(url) = &card.redemption_url {
        let url = escape_html(url);
        html.push_str(&format!("<p>Redeem at: <a href=\"{url}\">{url}</a></p>\n"));
    }
    html.push_str("</div>\n");
    html
}

/// The HTML body of the delivery email
pub fn render_codes(summary: &OrderSummary) -> String {
    let cards = summary.cards.iter().map(render_card).collect::<String>();
    format!(
        "<h2>Thank you for your purchase!</h2>\n<p>Order {} ({})</p>\n{cards}<p>Keep these codes safe. Anyone who has \
         them can redeem them.</p>\n",
        escape_html(summary.order_id.as_str()),
        summary.total
    )
}
