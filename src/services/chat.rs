//! Support chat. Each customer owns at most one conversation; staff and the
//! customer post messages into it.

use serde::{Deserialize, Serialize};

use crate::db::chat::{ChatMessageRow, ChatRepository, ConversationRow};
use crate::db::users::UserRepository;
use crate::error::{AppError, ResultExt};
use crate::security::CurrentUser;
use crate::services::required;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest { pub content: Option<String> }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    #[serde(flatten)]
    pub conversation: ConversationRow,
    pub messages: Vec<ChatMessageRow>,
}

pub struct ChatService<'a> { state: &'a AppState }

impl<'a> ChatService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn chat(&self) -> ChatRepository<'a> { ChatRepository::new(self.state.db()) }

    async fn with_messages(&self, conversation: ConversationRow) -> Result<ConversationResponse, AppError> {
        let messages = self.chat().messages(conversation.id).await?;
        Ok(ConversationResponse { conversation, messages })
    }

    pub async fn get_all_conversations(&self) -> Result<Vec<ConversationRow>, AppError> {
        Ok(self.chat().list_active().await?)
    }

    pub async fn get_by_id(&self, current: &CurrentUser, id: i64) -> Result<ConversationResponse, AppError> {
        let conversation = self.chat().find(id).await?.ok_or_else(|| AppError::field_not_found("Conversation not found"))?;
        current.ensure_owner_or_admin(conversation.host_id)?;
        self.with_messages(conversation).await
    }

    /// The host's conversation, opened on first access.
    pub async fn get_by_host(&self, current: &CurrentUser, user_id: i64) -> Result<ConversationResponse, AppError> {
        current.ensure_owner_or_admin(user_id)?;
        match self.chat().find_by_host(user_id).await? {
            Some(conversation) => self.with_messages(conversation).await,
            None => self.create(current, user_id).await,
        }
    }

    pub async fn create(&self, current: &CurrentUser, user_id: i64) -> Result<ConversationResponse, AppError> {
        current.ensure_owner_or_admin(user_id)?;
        if !UserRepository::new(self.state.db()).exists(user_id).await? {
            return Err(AppError::field_not_found("User not found"));
        }
        self.chat().create(user_id).await.or_system("Error when create conversation")?;
        let conversation = self
            .chat()
            .find_by_host(user_id)
            .await?
            .ok_or_else(|| AppError::system("Error when create conversation"))?;
        tracing::info!(conversation_id = conversation.id, host_id = user_id, "Conversation opened");
        self.with_messages(conversation).await
    }

    /// Posts as the caller; only the host or an admin may write.
    pub async fn add_message(&self, current: &CurrentUser, conversation_id: i64, req: &MessageRequest) -> Result<ChatMessageRow, AppError> {
        let content = required(&req.content, "Message content must be not null")?;
        let conversation = self
            .chat()
            .find(conversation_id)
            .await?
            .ok_or_else(|| AppError::field_not_found("Conversation not found"))?;
        current.ensure_owner_or_admin(conversation.host_id)?;
        if !UserRepository::new(self.state.db()).exists(current.id).await? {
            return Err(AppError::field_not_found("Sender not found"));
        }
        let message = self.chat().add_message(conversation_id, current.id, content).await.or_system("Error when send message")?;
        tracing::debug!(conversation_id, sender_id = current.id, "Message posted");
        Ok(message)
    }
}
