use anyhow::bail;
use reqwest;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::models::deposits::ProviderCharge;

/// Client for the PIX payment provider's charge API. Charge creation is the
/// only outbound call the gateway makes to the provider; status changes come
/// back through its webhook.
pub struct PixProviderApi {
    auth_token: String,
    url: String,
    client: reqwest::Client,
}

impl PixProviderApi {
    pub fn new(auth_token: String, url: String) -> Self {
        Self {
            auth_token,
            url,
            client: reqwest::Client::new(),
        }
    }

    /// Creates a PIX charge and returns the provider's id and QR code. The
    /// reference is echoed back in webhook callbacks as `externalRef`.
    pub async fn create_charge(
        &self,
        amount: Decimal,
        reference: &str,
    ) -> Result<ProviderCharge, anyhow::Error> {
        let nonce = Uuid::new_v4().hyphenated().to_string();
        let payload = json!({
            "amount": amount,
            "externalRef": reference
        });

        let response = self
            .client
            .post(format!("{}/api/charges", self.url))
            .bearer_auth(&self.auth_token)
            .header("X-Nonce", nonce)
            .json(&payload)
            .send()
            .await?
            .text()
            .await?;

        let response_json: serde_json::Value = serde_json::from_str(&response)?;
        match response_json.get("response") {
            Some(r) => {
                let charge: ProviderCharge = serde_json::from_value(r.clone())?;
                Ok(charge)
            }
            None => bail!("Provider: Bad response format."),
        }
    }
}
