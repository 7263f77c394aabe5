use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::chatmodels::{Chat, Message};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageDto {
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChatListResponseDto {
    pub status: String,
    pub chats: Vec<Chat>,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponseDto {
    pub status: String,
    pub messages: Vec<Message>,
}
