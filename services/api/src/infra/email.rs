use anyhow::{Context as _, anyhow};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::repository::Mailer;
use crate::domain::types::CodeFlow;
use crate::error::ApiError;

pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Sends one-time codes over SMTP. Without a configured host every send
/// fails with `Delivery`.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> anyhow::Result<Self> {
        let from = format!("LineTime <{}>", settings.from)
            .parse::<Mailbox>()
            .context("invalid SMTP_FROM address")?;

        let Some(host) = settings.host.filter(|h| !h.is_empty()) else {
            return Ok(Self {
                transport: None,
                from,
            });
        };

        // 465 is implicit TLS; everything else negotiates STARTTLS.
        let mut builder = if settings.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        }
        .context("build SMTP relay")?
        .port(settings.port);

        if let (Some(user), Some(pass)) = (settings.username, settings.password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: Some(builder.build()),
            from,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }
}

fn render_html(code: &str, flow: CodeFlow) -> String {
    let minutes = flow.ttl().num_minutes();
    let purpose = flow.purpose();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #2563eb;">LineTime {purpose}</h2>
    <p>您好，</p>
    <p>您正在{purpose} LineTime 账户。请使用以下验证码：</p>
    <div style="background-color: #f3f4f6; padding: 20px; text-align: center; margin: 20px 0; border-radius: 8px;">
      <span style="font-size: 32px; font-weight: bold; letter-spacing: 8px; color: #2563eb;">{code}</span>
    </div>
    <p>此验证码将在 <strong>{minutes} 分钟</strong>后过期。</p>
    <p>如果这不是您本人的操作，请忽略此邮件。</p>
    <hr style="border: none; border-top: 1px solid #e5e7eb; margin: 20px 0;">
    <p style="color: #6b7280; font-size: 12px;">此邮件由 LineTime 系统自动发送，请勿回复。</p>
  </div>
</body>
</html>"#
    )
}

fn render_text(code: &str, flow: CodeFlow) -> String {
    format!(
        "您的 LineTime {}验证码是 {}，{} 分钟内有效。",
        flow.purpose(),
        code,
        flow.ttl().num_minutes()
    )
}

impl Mailer for SmtpMailer {
    async fn send_code(&self, to: &str, code: &str, flow: CodeFlow) -> Result<(), ApiError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| ApiError::Delivery(anyhow!("SMTP is not configured")))?;

        let to: Mailbox = to
            .parse()
            .map_err(|e| ApiError::Delivery(anyhow!("invalid recipient: {e}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(flow.email_subject())
            .multipart(MultiPart::alternative_plain_html(
                render_text(code, flow),
                render_html(code, flow),
            ))
            .map_err(|e| ApiError::Delivery(anyhow!("build email: {e}")))?;

        transport
            .send(message)
            .await
            .map_err(|e| ApiError::Delivery(anyhow::Error::new(e).context("send email")))?;
        Ok(())
    }
}
