//! The teloxide-backed implementation of the core's `Messenger` contract.
//!
//! All rich-text payloads go out in HTML parse mode. Edit failures are
//! folded into the `EditOutcome` taxonomy so the streaming controller can
//! treat throttling and no-op edits as ordinary values.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::payloads::{
    AnswerCallbackQuerySetters, EditMessageTextSetters, SendDocumentSetters, SendMessageSetters,
};
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId,
    ParseMode, ReplyMarkup,
};
use teloxide::{ApiError, RequestError};

use claudegram_core::error::CoreError;
use claudegram_core::messenger::{Button, ChatRef, EditOutcome, MessageRef, Messenger};

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        TelegramMessenger { bot }
    }

    fn markup(buttons: &[Button]) -> InlineKeyboardMarkup {
        // One button per row keeps long option labels readable.
        InlineKeyboardMarkup::new(
            buttons
                .iter()
                .map(|button| {
                    vec![InlineKeyboardButton::callback(
                        button.label.clone(),
                        button.data.clone(),
                    )]
                })
                .collect::<Vec<_>>(),
        )
    }
}

fn to_core(err: RequestError) -> CoreError {
    match err {
        RequestError::Network(err) => CoreError::MessengerNetwork {
            description: err.to_string(),
        },
        other => CoreError::Messenger {
            description: other.to_string(),
        },
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat: ChatRef, html: &str) -> Result<MessageRef, CoreError> {
        let message = self
            .bot
            .send_message(ChatId(chat.0), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(to_core)?;
        Ok(MessageRef(message.id.0))
    }

    async fn edit_text(&self, chat: ChatRef, message: MessageRef, html: &str) -> EditOutcome {
        let result = self
            .bot
            .edit_message_text(ChatId(chat.0), MessageId(message.0), html)
            .parse_mode(ParseMode::Html)
            .await;
        match result {
            Ok(_) => EditOutcome::Ok,
            Err(RequestError::Api(ApiError::MessageNotModified)) => EditOutcome::NotModified,
            Err(RequestError::RetryAfter(seconds)) => EditOutcome::Throttled {
                retry_after: Duration::from_secs(u64::from(seconds.seconds())),
            },
            Err(RequestError::Network(_)) => EditOutcome::Throttled {
                // A network blip is retryable; give it a moment.
                retry_after: Duration::from_secs(2),
            },
            Err(err) => EditOutcome::Fatal {
                description: err.to_string(),
            },
        }
    }

    async fn send_keyboard(
        &self,
        chat: ChatRef,
        html: &str,
        buttons: &[Button],
    ) -> Result<MessageRef, CoreError> {
        let message = self
            .bot
            .send_message(ChatId(chat.0), html)
            .parse_mode(ParseMode::Html)
            .reply_markup(ReplyMarkup::InlineKeyboard(Self::markup(buttons)))
            .await
            .map_err(to_core)?;
        Ok(MessageRef(message.id.0))
    }

    async fn remove_keyboard(&self, chat: ChatRef, message: MessageRef) -> Result<(), CoreError> {
        self.bot
            .edit_message_reply_markup(ChatId(chat.0), MessageId(message.0))
            .await
            .map_err(to_core)?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), CoreError> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await.map_err(to_core)?;
        Ok(())
    }

    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<(), CoreError> {
        self.bot
            .delete_message(ChatId(chat.0), MessageId(message.0))
            .await
            .map_err(to_core)?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatRef,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef, CoreError> {
        let mut request = self
            .bot
            .send_document(ChatId(chat.0), InputFile::file(path.to_path_buf()));
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        let message = request.await.map_err(to_core)?;
        Ok(MessageRef(message.id.0))
    }

    async fn typing(&self, chat: ChatRef) -> Result<(), CoreError> {
        self.bot
            .send_chat_action(ChatId(chat.0), ChatAction::Typing)
            .await
            .map_err(to_core)?;
        Ok(())
    }
}
