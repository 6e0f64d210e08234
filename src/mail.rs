use std::ops::Deref;
use std::sync::Arc;

use aws_sdk_sesv2::{
    types::{Body, Content, Destination, EmailContent, Message},
    Client as SesClient,
};
use log::{debug, warn};

use crate::error::{Error, Result};

/// An outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Something that can deliver [`Mail`]. Delivery may be slow, so callers
/// must not hold database locks or transactions open across a dispatch.
#[rocket::async_trait]
pub trait MailDispatcher: Send + Sync {
    async fn dispatch(&self, mail: Mail) -> Result<()>;
}

/// The mail dispatcher in managed state.
#[derive(Clone)]
pub struct Mailer(Arc<dyn MailDispatcher>);

impl Mailer {
    pub fn new(dispatcher: impl MailDispatcher + 'static) -> Self {
        Self(Arc::new(dispatcher))
    }
}

impl Deref for Mailer {
    type Target = dyn MailDispatcher;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Sends mail through Amazon SES.
pub struct SesMailer {
    client: SesClient,
    sender: String,
}

impl SesMailer {
    pub fn new(client: SesClient, sender: String) -> Self {
        Self { client, sender }
    }
}

fn utf8_content(data: String) -> Result<Content> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| Error::Mail(e.to_string()))
}

#[rocket::async_trait]
impl MailDispatcher for SesMailer {
    async fn dispatch(&self, mail: Mail) -> Result<()> {
        let message = Message::builder()
            .subject(utf8_content(mail.subject)?)
            .body(Body::builder().text(utf8_content(mail.body)?).build())
            .build();
        let destination = Destination::builder()
            .to_addresses(mail.recipient.clone())
            .build();

        self.client
            .send_email()
            .from_email_address(&self.sender)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| {
                warn!("Mail to {} failed: {e}", mail.recipient);
                Error::Mail(e.to_string())
            })?;

        debug!("Dispatched mail to {}", mail.recipient);
        Ok(())
    }
}
