use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

//--------------------------------------      OrderRequest     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub account_identifier: String,
    pub customer_identifier: String,
    /// Tango's catalog item id. This is the SKU the catalog maps brand and denomination to.
    pub utid: String,
    /// Face value in dollars
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub campaign: String,
    pub email_subject: String,
    /// Codes are delivered by us, never by Tango
    pub send_email: bool,
    pub recipient: Recipient,
    /// Tango rejects a second order with the same reference. This is the purchase's idempotency key.
    #[serde(rename = "externalRefID")]
    pub external_ref_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

//--------------------------------------      RewardOrder      ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardOrder {
    #[serde(rename = "referenceOrderID", default)]
    pub reference_order_id: String,
    #[serde(rename = "externalRefID", default)]
    pub external_ref_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reward: Option<Reward>,
    /// Older API versions put the credentials at the top level
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub card_pin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default)]
    pub credential_list: Vec<Credential>,
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    #[serde(default)]
    pub redemption_instructions: Option<String>,
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub credential_type: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({}, {:?}, ****)", self.label, self.credential_type)
    }
}

/// The redeemable part of a gift card
#[derive(Clone, PartialEq, Eq)]
pub struct CardCredentials {
    pub code: String,
    pub pin: Option<String>,
}

impl std::fmt::Debug for CardCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CardCredentials(****, pin: {})", if self.pin.is_some() { "****" } else { "none" })
    }
}

fn is_code(kind: &str) -> bool {
    matches!(
        kind.to_ascii_lowercase().replace([' ', '_'], "").as_str(),
        "cardnumber" | "claimcode" | "redemptioncode" | "code" | "cardcode"
    )
}

fn is_pin(kind: &str) -> bool {
    matches!(kind.to_ascii_lowercase().replace([' ', '_'], "").as_str(), "pin" | "cardpin" | "securitycode")
}

impl RewardOrder {
    /// Pulls the card number (or claim code) and PIN out of the order.
    ///
    /// The credential list is searched first, by credential type and then by label. The credentials map and the
    /// top-level fields are fallbacks.
    pub fn gift_card(&self) -> Option<CardCredentials> {
        let mut code = None;
        let mut pin = None;
        if let Some(reward) = &self.reward {
            for c in reward.credential_list.iter().filter(|c| !c.value.is_empty()) {
                let kind = c.credential_type.as_deref().unwrap_or(c.label.as_str());
                if code.is_none() && (is_code(kind) || is_code(&c.label)) {
                    code = Some(c.value.clone());
                } else if pin.is_none() && (is_pin(kind) || is_pin(&c.label)) {
                    pin = Some(c.value.clone());
                }
            }
            for (label, value) in reward.credentials.iter().filter(|(_, v)| !v.is_empty()) {
                if code.is_none() && is_code(label) {
                    code = Some(value.clone());
                } else if pin.is_none() && is_pin(label) {
                    pin = Some(value.clone());
                }
            }
        }
        let code = code.or_else(|| self.card_number.clone().filter(|s| !s.is_empty()))?;
        let pin = pin.or_else(|| self.card_pin.clone().filter(|s| !s.is_empty()));
        Some(CardCredentials { code, pin })
    }
}

//--------------------------------------       OrderList       ---------------------------------------------------------
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct OrderList {
    #[serde(default)]
    pub orders: Vec<RewardOrder>,
}
