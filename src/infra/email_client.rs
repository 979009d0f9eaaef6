use crate::error::{LocatorError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const SELL_INQUIRY_PATH: &str = "/email/sell-inquiry";
pub const BUY_INQUIRY_PATH: &str = "/email/buy-inquiry";

/// A seller asking for a listing consultation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SellInquiryData {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub property_address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub property_type: Option<String>,
    pub timeline: Option<String>,
    pub message: Option<String>,
}

/// A buyer asking about a listing or a search
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuyInquiryData {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub property_id: Option<String>,
    pub property_address: Option<String>,
    pub preferred_contact: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EmailResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Thin client for the backend's inquiry email endpoints
pub struct EmailClient {
    client: reqwest::Client,
    base_url: String,
}

impl EmailClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn send_sell_inquiry(&self, data: &SellInquiryData) -> Result<EmailResponse> {
        validate_contact(&data.name, &data.email)?;
        if data.property_address.trim().is_empty() {
            return Err(LocatorError::Validation("property address is required".to_string()));
        }
        self.post(SELL_INQUIRY_PATH, data).await
    }

    pub async fn send_buy_inquiry(&self, data: &BuyInquiryData) -> Result<EmailResponse> {
        validate_contact(&data.name, &data.email)?;
        self.post(BUY_INQUIRY_PATH, data).await
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<EmailResponse> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;

        let result = interpret_response(status, &text);
        match &result {
            Ok(response) => info!(%url, "Inquiry sent: {}", response.message),
            Err(e) => warn!(%url, status, "Inquiry failed: {}", e),
        }
        result
    }
}

fn validate_contact(name: &str, email: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LocatorError::Validation("name is required".to_string()));
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(LocatorError::Validation(format!("invalid email address '{}'", email)));
    }
    Ok(())
}

/// Non-2xx responses and `success: false` bodies become `LocatorError::Api`
/// carrying the server's message when it sent one. A 2xx body that is not an
/// `EmailResponse` is a `LocatorError::Json`.
pub fn interpret_response(status: u16, body: &str) -> Result<EmailResponse> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<EmailResponse>(body)
            .ok()
            .map(|r| r.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));
        return Err(LocatorError::Api { message });
    }

    let response: EmailResponse = serde_json::from_str(body)?;
    if response.success {
        Ok(response)
    } else {
        Err(LocatorError::Api {
            message: response.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sell_inquiry_serializes_camel_case() {
        let data = SellInquiryData {
            name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
            property_address: "123 Main St".to_string(),
            property_type: Some("condo".to_string()),
            ..SellInquiryData::default()
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["propertyAddress"], "123 Main St");
        assert_eq!(json["propertyType"], "condo");
    }

    #[test]
    fn test_success_response() {
        let response = interpret_response(200, r#"{"success": true, "message": "Email sent"}"#).unwrap();
        assert_eq!(response.message, "Email sent");
    }

    #[test]
    fn test_server_message_is_surfaced_on_error_status() {
        match interpret_response(500, r#"{"success": false, "message": "SMTP unavailable"}"#) {
            Err(LocatorError::Api { message }) => assert_eq!(message, "SMTP unavailable"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_status_without_body() {
        match interpret_response(502, "Bad Gateway") {
            Err(LocatorError::Api { message }) => assert_eq!(message, "HTTP error! status: 502"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsuccessful_body_with_ok_status() {
        assert!(matches!(
            interpret_response(200, r#"{"success": false, "message": "rejected"}"#),
            Err(LocatorError::Api { .. })
        ));
    }

    #[test]
    fn test_malformed_success_body_is_a_json_error() {
        assert!(matches!(
            interpret_response(200, "<html>ok</html>"),
            Err(LocatorError::Json(_))
        ));
    }

    #[test]
    fn test_contact_validation() {
        assert!(validate_contact("Pat", "pat@example.com").is_ok());
        assert!(matches!(validate_contact(" ", "pat@example.com"), Err(LocatorError::Validation(_))));
        assert!(matches!(validate_contact("Pat", "not-an-email"), Err(LocatorError::Validation(_))));
    }
}
