//! Canned replies to chat keywords.

use discord_client::{Message, Snowflake};

/// Ordered keyword table. The first key found in a message wins.
pub const KEYWORD_REPLIES: &[(&str, &str)] = &[
    ("salve", "Opa, tá salvo! Mas manda uma dose pra mim, hein!"),
    ("opa", "Opa, chegou! Traz a cachaça!"),
    ("fala", "Fala, parceiro! Como tá o rolê?"),
    ("beleza", "Beleza, meu chapa! Vamos nessa!"),
    ("oi", "Oi, camarada! Bora tomar uma?"),
];

/// Case-insensitive substring lookup against [`KEYWORD_REPLIES`].
pub fn match_keyword(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    KEYWORD_REPLIES
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(_, reply)| *reply)
}

/// Decides whether an incoming message deserves a reply.
#[derive(Debug, Clone, Copy)]
pub struct KeywordResponder {
    guild_id: Snowflake,
    chat_channel_id: Snowflake,
}

impl KeywordResponder {
    pub fn new(guild_id: Snowflake, chat_channel_id: Snowflake) -> Self {
        Self {
            guild_id,
            chat_channel_id,
        }
    }

    /// Reply for `message`, if any. Messages written by `self_id`, from other
    /// guilds or outside the chat channel are ignored.
    pub fn reply_for(&self, message: &Message, self_id: Option<Snowflake>) -> Option<&'static str> {
        if self_id.is_some_and(|id| id == message.author.id) {
            return None;
        }
        if message.guild_id.is_some_and(|guild| guild != self.guild_id) {
            return None;
        }
        if message.channel_id != self.chat_channel_id {
            return None;
        }
        match_keyword(&message.content)
    }
}
