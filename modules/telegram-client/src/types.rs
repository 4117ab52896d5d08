use serde::Deserialize;

/// Bot API envelope: every method returns `{ok, result}` or an error body.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before retrying, sent with 429 responses.
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub message_thread_id: Option<i64>,
    pub text: Option<String>,
    /// Set on messages Telegram copied from the linked channel into the
    /// discussion group.
    #[serde(default)]
    pub is_automatic_forward: bool,
    pub sender_chat: Option<Chat>,
    pub forward_origin: Option<ForwardOrigin>,
    /// Legacy field carrying the origin message id on older API surfaces.
    pub forward_from_message_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub linked_chat_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForwardOrigin {
    #[serde(rename = "type")]
    pub kind: String,
    pub message_id: Option<i64>,
}

impl Message {
    /// The original channel message id this auto-forward points back to,
    /// preferring the modern `forward_origin` shape.
    pub fn forward_origin_message_id(&self) -> Option<i64> {
        if let Some(origin) = &self.forward_origin {
            if origin.kind == "channel" {
                if let Some(id) = origin.message_id {
                    return Some(id);
                }
            }
        }
        self.forward_from_message_id
    }
}
