use anyhow::{Context, bail};
use axum::response::IntoResponse;
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use vitalis_types::api::{VoiceForm, VoiceFormRequest};

use crate::error::{ApiResult, ok};
use crate::extract::Payload;

/// Room the voice intake form runs in.
pub const VOICE_ROOM: &str = "voice-form";

/// Grants are only used for the one provisioning call.
const GRANT_TTL_SECS: i64 = 600;

const GENDERS: [&str; 3] = ["male", "female", "other"];

#[derive(Debug, Clone)]
pub struct LiveKitConfig {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoGrant {
    room_create: bool,
}

#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    nbf: i64,
    exp: i64,
    video: VideoGrant,
}

#[derive(Debug, Serialize)]
struct CreateRoom<'a> {
    name: &'a str,
}

/// HTTP base for the Twirp API; LiveKit URLs are usually given as websocket URLs.
pub fn twirp_base(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}

fn room_create_token(cfg: &LiveKitConfig) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = GrantClaims {
        iss: &cfg.api_key,
        sub: &cfg.api_key,
        nbf: now,
        exp: now + GRANT_TTL_SECS,
        video: VideoGrant { room_create: true },
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.api_secret.as_bytes()),
    )?)
}

/// Creates `room` on the LiveKit server. LiveKit treats creating an existing
/// room as success, so this is safe on every start.
pub async fn provision_room(client: &Client, cfg: &LiveKitConfig, room: &str) -> anyhow::Result<()> {
    let token = room_create_token(cfg)?;
    let endpoint = format!("{}/twirp/livekit.RoomService/CreateRoom", twirp_base(&cfg.url));

    let resp = client
        .post(&endpoint)
        .header("Authorization", format!("Bearer {}", token))
        .json(&CreateRoom { name: room })
        .send()
        .await
        .with_context(|| format!("CreateRoom request to {} failed", endpoint))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("CreateRoom failed ({}): {}", status, body);
    }

    info!("LiveKit room '{}' ready", room);
    Ok(())
}

/// Background start-up task: provisioning problems are logged, never fatal.
pub async fn provision_voice_room(cfg: LiveKitConfig) {
    let client = Client::new();
    if let Err(e) = provision_room(&client, &cfg, VOICE_ROOM).await {
        warn!("Voice room provisioning failed: {:#}", e);
    }
}

/// Byte offsets of every occurrence of `needle` in `haystack`.
fn occurrences<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    haystack.match_indices(needle).map(|(i, _)| i)
}

fn extract_name(text: &str, lower: &str) -> Option<String> {
    const KEY: &str = "name ";
    occurrences(lower, KEY).find_map(|i| {
        let rest = &text[i + KEY.len()..];
        // At least one character before the comma, all on one line
        let first = rest.chars().next()?;
        let comma = rest[first.len_utf8()..].find(',')? + first.len_utf8();
        let name = &rest[..comma];
        (!name.contains('\n')).then(|| name.to_string())
    })
}

fn extract_mobile(text: &str) -> Option<String> {
    const KEY: &str = "mobile is ";
    occurrences(text, KEY).find_map(|i| {
        let digits = text.get(i + KEY.len()..i + KEY.len() + 10)?;
        digits
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| digits.to_string())
    })
}

fn extract_gender(text: &str, lower: &str) -> Option<String> {
    const KEY: &str = "gender is ";
    occurrences(lower, KEY).find_map(|i| {
        let start = i + KEY.len();
        GENDERS
            .iter()
            .find(|g| lower[start..].starts_with(*g))
            .map(|g| text[start..start + g.len()].to_string())
    })
}

/// Pulls name, mobile and gender out of a dictated sentence such as
/// "name Asha Rao, mobile is 9876543210, gender is Female". Pieces that are
/// not found come back empty.
pub fn parse_voice_form(text: &str) -> VoiceForm {
    // ASCII lowering keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();
    VoiceForm {
        name: extract_name(text, &lower).unwrap_or_default(),
        mobile: extract_mobile(text).unwrap_or_default(),
        gender: extract_gender(text, &lower).unwrap_or_default(),
    }
}

/// POST /api
pub async fn extract_voice_form(Payload(req): Payload<VoiceFormRequest>) -> ApiResult<impl IntoResponse> {
    Ok(ok(parse_voice_form(&req.voice_text)))
}
