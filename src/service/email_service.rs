use std::fs;
use std::thread;
use std::time::Duration;

use eyre::{Result, WrapErr};
use lettre::{transport::smtp::authentication::Credentials, SmtpTransport, Transport};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;

/// Outbound mail collaborator. Injected into the services so tests can
/// record deliveries instead of talking SMTP.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, template_path: &str, data: &Value) -> Result<()>;
}

/// SMTP mailer rendering HTML file templates with `{{placeholder}}`
/// substitution from a JSON object.
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from_address: String,
}

// Transient SMTP failures get a couple of retries before giving up.
const SEND_ATTEMPTS: usize = 3;
const BACKOFFS_MS: [u64; 2] = [300, 1200];

impl SmtpMailer {
    pub fn new(smtp_host: &str, smtp_user: &str, smtp_pass: &str, from_address: &str) -> Result<Self> {
        let creds = Credentials::new(smtp_user.to_string(), smtp_pass.to_string());

        let mailer = SmtpTransport::relay(smtp_host)
            .wrap_err("building SMTP transport")?
            .credentials(creds)
            .build();

        Ok(Self {
            mailer,
            from_address: from_address.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.smtp_host,
            &config.smtp_user,
            &config.smtp_pass,
            &config.smtp_from,
        )
    }

    fn render(&self, template_path: &str, data: &Value) -> Result<String> {
        let mut body = fs::read_to_string(template_path).wrap_err("loading mail template")?;
        if let Some(fields) = data.as_object() {
            for (key, value) in fields {
                let placeholder = format!("{{{{{}}}}}", key);
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                body = body.replace(&placeholder, &text);
            }
        }
        Ok(body)
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, template_path: &str, data: &Value) -> Result<()> {
        let body = self.render(template_path, data)?;

        let email = lettre::Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(lettre::message::header::ContentType::TEXT_HTML)
            .body(body)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.mailer.send(&email) {
                Ok(_) => {
                    debug!(to, subject, attempt, "email sent");
                    return Ok(());
                }
                Err(err) if attempt < SEND_ATTEMPTS => {
                    warn!(to, subject, attempt, error = %err, "send failed, retrying");
                    thread::sleep(Duration::from_millis(BACKOFFS_MS[attempt - 1]));
                }
                Err(err) => return Err(err).wrap_err("sending email"),
            }
        }
    }
}
