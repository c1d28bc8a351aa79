use reqwest::Client;
use serde::Serialize;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Transactional email over the Resend HTTP API.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email send failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email API error ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: [to],
            subject,
            html,
        };

        let response = self.client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status: status.as_u16(), body });
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}
