use async_trait::async_trait;

use amora_shared::clients::email::EmailClient;
use amora_shared::errors::{AppError, AppResult};

/// Mail templates the service knows how to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTemplate {
    Login { code: String },
}

impl MailTemplate {
    pub fn subject(&self) -> &'static str {
        match self {
            MailTemplate::Login { .. } => "Login Verification",
        }
    }

    pub fn render(&self) -> String {
        match self {
            MailTemplate::Login { code } => format!(
                r#"<div style="font-family: Helvetica, Arial, sans-serif; max-width: 600px; margin: 0 auto; line-height: 2;">
  <p style="font-size: 1.4em; color: #d6336c; font-weight: 600; border-bottom: 1px solid #eee;">Login Verification</p>
  <p>Hi there, use the code below to sign in to Amora. It stays valid for a few minutes.</p>
  <h2 style="background: #d6336c; color: #fff; width: max-content; padding: 0 10px; border-radius: 4px; letter-spacing: 6px;">{code}</h2>
  <p style="font-size: 0.9em; color: #666;">If you did not request this, you can ignore this email.</p>
</div>"#
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, template: MailTemplate) -> AppResult<()>;
}

#[async_trait]
impl Mailer for EmailClient {
    async fn send(&self, recipient: &str, template: MailTemplate) -> AppResult<()> {
        self.send_email(recipient, template.subject(), &template.render())
            .await
            .map_err(|e| AppError::internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_template_embeds_code() {
        let template = MailTemplate::Login { code: "042917".into() };
        assert_eq!(template.subject(), "Login Verification");
        assert!(template.render().contains("042917"));
    }
}
