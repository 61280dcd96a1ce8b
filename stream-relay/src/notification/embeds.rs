//! Embed builders for every message the bot posts.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use discord_client::Embed;
use helix_client::Clip;

pub const LIVE_COLOR: u32 = 0x9146FF;
pub const CLIP_COLOR: u32 = 0x1DB954;
pub const ONLINE_COLOR: u32 = 0x2ECC71;
pub const OFFLINE_COLOR: u32 = 0xE74C3C;

pub const CLIP_TITLE: &str = "📹 Novo clipe disponível!";
pub const STATUS_TITLE: &str = "📡 Status do serviço";

/// `HH:MM:SS` in the given timezone.
pub fn clock(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("%H:%M:%S").to_string()
}

pub fn live_embed(display_name: &str, login: &str, now: DateTime<Utc>, tz: Tz) -> Embed {
    Embed::new()
        .title(format!("🔴 {display_name} está AO VIVO!"))
        .description(format!("Acesse agora: https://twitch.tv/{login}"))
        .color(LIVE_COLOR)
        .footer(format!("Início detectado: {}", clock(now, tz)))
}

pub fn clip_embed(clip: &Clip, now: DateTime<Utc>, tz: Tz) -> Embed {
    Embed::new()
        .title(CLIP_TITLE)
        .url(&clip.url)
        .description(&clip.title)
        .color(CLIP_COLOR)
        .footer(format!("Publicado: {}", clock(now, tz)))
}

pub fn status_embed(online: bool, now: DateTime<Utc>, tz: Tz) -> Embed {
    let (description, color) = if online {
        ("🟢 Online", ONLINE_COLOR)
    } else {
        ("🔴 Offline", OFFLINE_COLOR)
    };
    Embed::new()
        .title(STATUS_TITLE)
        .description(description)
        .color(color)
        .footer(format!("Última verificação: {}", clock(now, tz)))
}
