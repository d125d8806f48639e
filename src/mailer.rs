//! SMTP delivery of the composed digests.
//!
//! One authenticated TLS session to the relay serves every recipient; each
//! recipient gets their own message (the bodies differ per recipient). The
//! first connection, authentication, or send failure propagates and aborts
//! the remaining recipients — already-sent messages stand.

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::error::Error;
use tracing::{info, instrument};

/// An authenticated SMTP relay session bound to one sender address.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl Mailer {
    /// Configure the relay transport.
    ///
    /// The connection itself is opened lazily on the first send. The sender
    /// address doubles as the SMTP username, as app-password relays expect.
    pub fn connect(
        host: &str,
        port: u16,
        sender: &str,
        password: &str,
    ) -> Result<Self, Box<dyn Error>> {
        let sender: Mailbox = sender.parse()?;
        let credentials = Credentials::new(sender.email.to_string(), password.to_string());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .port(port)
            .credentials(credentials)
            .build();
        Ok(Self { transport, sender })
    }

    /// Send one recipient's digest.
    #[instrument(level = "info", skip_all, fields(%recipient))]
    pub async fn send_digest(
        &self,
        recipient: &str,
        subject: &str,
        html_body: String,
    ) -> Result<(), Box<dyn Error>> {
        let message = build_message(&self.sender, recipient, subject, html_body)?;
        self.transport.send(message).await?;
        info!("Sent digest");
        Ok(())
    }
}

/// Build one HTML digest message.
fn build_message(
    sender: &Mailbox,
    recipient: &str,
    subject: &str,
    html_body: String,
) -> Result<Message, Box<dyn Error>> {
    let message = Message::builder()
        .from(sender.clone())
        .to(recipient.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html_body)?;
    Ok(message)
}
