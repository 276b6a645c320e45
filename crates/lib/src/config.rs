//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.replybot/config.json`) and environment.
//! Secrets normally come from the environment (`LINE_CHANNEL_SECRET`, `LINE_CHANNEL_TOKEN`);
//! reply content (menus, survey texts) comes from the file, with built-in defaults.

use crate::error::TemplateError;
use crate::outbound::{Action, MenuItem, RichTemplate, TemplateLayout};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// LINE Messaging API credentials and endpoint.
    #[serde(default)]
    pub line: LineConfig,

    /// Pending-context policy.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Reply content.
    #[serde(default)]
    pub replies: RepliesConfig,
}

/// Gateway bind, port, and webhook path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 5000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Path the platform POSTs webhook deliveries to (default "/callback").
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_path() -> String {
    "/callback".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            webhook_path: default_webhook_path(),
        }
    }
}

/// LINE channel config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Channel secret used to verify X-Line-Signature. Overridden by LINE_CHANNEL_SECRET env.
    pub channel_secret: Option<String>,
    /// Channel access token for the reply API. Overridden by LINE_CHANNEL_TOKEN env.
    pub channel_access_token: Option<String>,
    /// Messaging API base URL (default "https://api.line.me"). Point at a mock server in tests.
    #[serde(default = "default_line_api_base")]
    pub api_base: String,
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: None,
            channel_access_token: None,
            api_base: default_line_api_base(),
        }
    }
}

/// When a follow-up question registers its pending context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRegistration {
    /// Register as soon as the question is built. The context stays even if delivery fails,
    /// so the user's next message is read as an answer to a question they never saw.
    #[default]
    Eager,
    /// Register only after the question was delivered.
    Confirmed,
}

/// Pending-context settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsConfig {
    #[serde(default)]
    pub registration: ContextRegistration,
    /// Seconds after which an unanswered question is forgotten. Unset: never.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl SessionsConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }
}

/// Sticker reference (package + sticker id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerRef {
    pub package_id: String,
    pub sticker_id: String,
}

/// Yes/no survey texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyConfig {
    pub question: String,
    pub yes_label: String,
    pub no_label: String,
    /// Reply to "yes".
    pub affirmative: String,
    /// Reply to "no".
    pub dismissive: String,
    /// Reply to anything else.
    pub clarify: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            question: "Do you like botnoi?".to_string(),
            yes_label: "Yes".to_string(),
            no_label: "No".to_string(),
            affirmative: "I\u{2019}m glad you like Botnoi, because I like too.".to_string(),
            dismissive: "I will pretend that you clicked that by mistake.".to_string(),
            clarify: "What did you mean by that.".to_string(),
        }
    }
}

/// Reply content for every strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepliesConfig {
    #[serde(default = "default_sticker_sample")]
    pub sticker_sample: StickerRef,
    #[serde(default = "default_buttons")]
    pub buttons: RichTemplate,
    #[serde(default = "default_carousel")]
    pub carousel: RichTemplate,
    #[serde(default)]
    pub survey: SurveyConfig,
    /// Reply to a sticker. `{id}` and `{resourceType}` are replaced with the sticker's values.
    #[serde(default = "default_sticker_ack")]
    pub sticker_ack: String,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            sticker_sample: default_sticker_sample(),
            buttons: default_buttons(),
            carousel: default_carousel(),
            survey: SurveyConfig::default(),
            sticker_ack: default_sticker_ack(),
        }
    }
}

impl RepliesConfig {
    /// Validate both templates against the messaging API's limits.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.buttons.layout != TemplateLayout::Buttons {
            return Err(TemplateError::Layout {
                what: "replies.buttons".to_string(),
                expected: "buttons".to_string(),
            });
        }
        if self.carousel.layout != TemplateLayout::Carousel {
            return Err(TemplateError::Layout {
                what: "replies.carousel".to_string(),
                expected: "carousel".to_string(),
            });
        }
        self.buttons.validate()?;
        self.carousel.validate()
    }
}

fn default_sticker_sample() -> StickerRef {
    StickerRef {
        package_id: "1".to_string(),
        sticker_id: "1".to_string(),
    }
}

fn default_sticker_ack() -> String {
    "sticker id is {id}, stickerResourceType is {resourceType}".to_string()
}

fn default_buttons() -> RichTemplate {
    RichTemplate {
        layout: TemplateLayout::Buttons,
        alt_text: "This is a buttons template".to_string(),
        items: vec![MenuItem {
            thumbnail_image_url: None,
            title: Some("Botnoi".to_string()),
            text: "Please select".to_string(),
            actions: vec![
                Action::Uri {
                    label: "View detail".to_string(),
                    uri: "https://botnoigroup.com/th/".to_string(),
                },
                Action::Postback {
                    label: "Buy".to_string(),
                    data: "action=buy&itemid=123".to_string(),
                },
                Action::Postback {
                    label: "Add to cart".to_string(),
                    data: "action=add&itemid=123".to_string(),
                },
            ],
        }],
    }
}

fn carousel_column(image: &str, title: &str, text: &str, mv: (&str, &str), item: &str) -> MenuItem {
    MenuItem {
        thumbnail_image_url: Some(image.to_string()),
        title: Some(title.to_string()),
        text: text.to_string(),
        actions: vec![
            Action::Uri {
                label: mv.0.to_string(),
                uri: mv.1.to_string(),
            },
            Action::Postback {
                label: "No action".to_string(),
                data: format!("action=buy&itemid={item}"),
            },
        ],
    }
}

fn default_carousel() -> RichTemplate {
    RichTemplate {
        layout: TemplateLayout::Carousel,
        alt_text: "This is a carousel template".to_string(),
        items: vec![
            carousel_column(
                "https://pbs.twimg.com/media/GLw0iODaoAAIvC5?format=jpg&name=4096x4096",
                "This is Aespa",
                "Description 1",
                ("Supernova MV", "https://www.youtube.com/watch?v=phuiiNCxRMg"),
                "222",
            ),
            carousel_column(
                "https://kprofiles.com/wp-content/uploads/2022/02/Nmixx-roller-coaster.jpeg",
                "This is NMIXX",
                "Description 2",
                ("Roller Coaster MV", "https://www.youtube.com/watch?v=fqBAzCH4-9g"),
                "222",
            ),
            carousel_column(
                "https://kprofiles.com/wp-content/uploads/2024/03/ILLIT-800x800.jpg",
                "This is ILLIT",
                "Description 3",
                ("Magnetic MV", "https://www.youtube.com/watch?v=Vk5-c_v4gMU"),
                "111",
            ),
        ],
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn config_nonempty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the channel secret: env LINE_CHANNEL_SECRET overrides config.
pub fn resolve_channel_secret(config: &Config) -> Option<String> {
    env_nonempty("LINE_CHANNEL_SECRET")
        .or_else(|| config_nonempty(config.line.channel_secret.as_ref()))
}

/// Resolve the channel access token: env LINE_CHANNEL_TOKEN overrides config.
pub fn resolve_channel_token(config: &Config) -> Option<String> {
    env_nonempty("LINE_CHANNEL_TOKEN")
        .or_else(|| config_nonempty(config.line.channel_access_token.as_ref()))
}

/// Resolve the listen port: env PORT overrides config. An unparsable PORT is ignored.
pub fn resolve_port(config: &Config) -> u16 {
    match env_nonempty("PORT").map(|p| p.parse::<u16>()) {
        Some(Ok(port)) => port,
        Some(Err(e)) => {
            log::warn!("ignoring invalid PORT: {}", e);
            config.gateway.port
        }
        None => config.gateway.port,
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("REPLYBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".replybot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or REPLYBOT_CONFIG_PATH).
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config: Config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    config
        .replies
        .validate()
        .with_context(|| format!("invalid reply templates in {}", path.display()))?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_bind_and_path() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 5000);
        assert_eq!(g.bind, "127.0.0.1");
        assert_eq!(g.webhook_path, "/callback");
    }

    #[test]
    fn default_replies_are_valid() {
        let r = RepliesConfig::default();
        assert_eq!(r.validate(), Ok(()));
        assert_eq!(r.carousel.items.len(), 3);
        assert_eq!(r.buttons.items[0].actions.len(), 3);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 8080 },
                "sessions": { "registration": "confirmed", "ttlSecs": 300 },
                "replies": { "survey": {
                    "question": "Tea?", "yesLabel": "Y", "noLabel": "N",
                    "affirmative": "good", "dismissive": "ok", "clarify": "huh"
                } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.webhook_path, "/callback");
        assert_eq!(config.line.api_base, "https://api.line.me");
        assert_eq!(config.sessions.registration, ContextRegistration::Confirmed);
        assert_eq!(config.sessions.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.replies.survey.question, "Tea?");
        assert_eq!(config.replies.sticker_sample, default_sticker_sample());
    }

    #[test]
    fn zero_ttl_means_no_expiry() {
        let s = SessionsConfig {
            registration: ContextRegistration::Eager,
            ttl_secs: Some(0),
        };
        assert_eq!(s.ttl(), None);
    }

    #[test]
    fn buttons_slot_rejects_carousel_layout() {
        let mut r = RepliesConfig::default();
        r.buttons = default_carousel();
        assert!(r.validate().is_err());
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let path = std::env::temp_dir()
            .join(format!("replybot-missing-{}", std::process::id()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 5000);
    }
}
