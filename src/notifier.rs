use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::{SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode, Recipient};
use teloxide::utils::html;

use crate::twitter::Post;

/// Outbound side of the bot. The watcher only needs these two calls, and
/// tests swap in a recording stub.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn send_text(&self, html_text: &str) -> Result<()>;
    async fn send_photo(&self, photo: &PhotoSource, caption: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub enum PhotoSource {
    Url(reqwest::Url),
    File(PathBuf),
}

impl PhotoSource {
    /// An http(s) string becomes a URL photo, anything else a local path.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = raw
                .parse()
                .with_context(|| format!("Invalid photo URL: {raw}"))?;
            Ok(PhotoSource::Url(url))
        } else {
            Ok(PhotoSource::File(PathBuf::from(raw)))
        }
    }

    pub fn input_file(&self) -> InputFile {
        match self {
            PhotoSource::Url(url) => InputFile::url(url.clone()),
            PhotoSource::File(path) => InputFile::file(path.clone()),
        }
    }
}

/// Parse the configured destination: "@channelname" or a numeric chat id.
pub fn chat_recipient(raw: &str) -> Result<Recipient> {
    if raw.starts_with('@') && raw.len() > 1 {
        Ok(Recipient::ChannelUsername(raw.to_string()))
    } else {
        let id: i64 = raw
            .parse()
            .with_context(|| format!("Invalid chat id: {raw}"))?;
        Ok(Recipient::Id(ChatId(id)))
    }
}

/// HTML alert for one matching post: escaped tweet text plus a permalink
/// built from the handle and the post id.
pub fn format_alert(handle: &str, post: &Post) -> String {
    let link = format!("https://twitter.com/{}/status/{}", handle, post.id);
    format!(
        "<b>New post from @{}:</b>\n\n{}\n\n<a href=\"{}\">View on X</a>",
        html::escape(handle),
        html::escape(&post.text),
        link
    )
}

pub struct TelegramNotifier {
    bot: Bot,
    chat: Recipient,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat: Recipient) -> Self {
        Self { bot, chat }
    }
}

#[async_trait]
impl Notify for TelegramNotifier {
    async fn send_text(&self, html_text: &str) -> Result<()> {
        self.bot
            .send_message(self.chat.clone(), html_text)
            .parse_mode(ParseMode::Html)
            .await
            .context("sendMessage failed")?;
        Ok(())
    }

    async fn send_photo(&self, photo: &PhotoSource, caption: &str) -> Result<()> {
        self.bot
            .send_photo(self.chat.clone(), photo.input_file())
            .caption(caption.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .context("sendPhoto failed")?;
        Ok(())
    }
}
