//! Platform key processing
//!
//! Turns persisted platform keys into relay targets. The step is pluggable
//! so deployments that support per-platform overrides can swap in
//! [`AdvancedPlatforms`].

use crate::protocol::{PlatformKey, RelayTarget};

pub trait PlatformConfigStep: Send + Sync {
    fn process(&self, keys: &[PlatformKey]) -> Vec<RelayTarget>;
}

/// Full ingest URL for a base RTMP URL and a key
pub fn ingest_url(rtmp_url: &str, stream_key: &str) -> String {
    format!("{}/{}", rtmp_url.trim().trim_end_matches('/'), stream_key.trim())
}

fn basic_target(key: &PlatformKey) -> RelayTarget {
    RelayTarget {
        platform: key.platform.clone(),
        url: ingest_url(&key.rtmp_url, &key.stream_key),
        stream_key: key.stream_key.trim().to_string(),
        proxy: None,
        options: serde_json::Map::new(),
    }
}

/// One target per key that has a stream key; custom settings are ignored
pub struct StandardPlatforms;

impl PlatformConfigStep for StandardPlatforms {
    fn process(&self, keys: &[PlatformKey]) -> Vec<RelayTarget> {
        keys.iter().filter(|k| k.has_key()).map(basic_target).collect()
    }
}

/// Like [`StandardPlatforms`], but keys flagged advanced may override the
/// ingest server, dial through a proxy and pass extra options through
pub struct AdvancedPlatforms;

impl PlatformConfigStep for AdvancedPlatforms {
    fn process(&self, keys: &[PlatformKey]) -> Vec<RelayTarget> {
        keys.iter()
            .filter(|k| k.has_key())
            .map(|key| {
                let mut target = basic_target(key);
                let custom = match (&key.is_advanced, &key.custom_config) {
                    (Some(true), Some(custom)) => custom,
                    _ => return target,
                };

                let server = custom.server_url.as_deref().filter(|s| !s.trim().is_empty());
                if let Some(server) = server {
                    target.url = ingest_url(server, &key.stream_key);
                }
                target.proxy = custom.proxy.clone().filter(|p| !p.trim().is_empty());
                target.options = custom.options.clone();
                tracing::debug!(
                    platform = %key.platform,
                    url = %target.url,
                    "applied advanced platform config"
                );
                target
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CustomConfig;

    fn advanced_key() -> PlatformKey {
        let mut options = serde_json::Map::new();
        options.insert("lowLatency".into(), serde_json::Value::Bool(true));
        PlatformKey {
            platform: "youtube".into(),
            rtmp_url: "rtmp://a.rtmp.youtube.com/live2/".into(),
            stream_key: " abcd ".into(),
            is_advanced: Some(true),
            custom_config: Some(CustomConfig {
                server_url: Some("rtmp://b.rtmp.youtube.com/live2".into()),
                proxy: Some("http://proxy:3128".into()),
                options,
            }),
        }
    }

    #[test]
    fn test_standard_skips_blank_keys() {
        let keys = vec![
            PlatformKey::new("twitch", "rtmp://live.twitch.tv/app", "   "),
            advanced_key(),
        ];
        let targets = StandardPlatforms.process(&keys);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].url, "rtmp://a.rtmp.youtube.com/live2/abcd");
        assert!(targets[0].proxy.is_none());
    }

    #[test]
    fn test_advanced_applies_overrides() {
        let targets = AdvancedPlatforms.process(&[advanced_key()]);
        assert_eq!(targets[0].url, "rtmp://b.rtmp.youtube.com/live2/abcd");
        assert_eq!(targets[0].proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(targets[0].options["lowLatency"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_advanced_ignores_unflagged_config() {
        let mut key = advanced_key();
        key.is_advanced = Some(false);
        let targets = AdvancedPlatforms.process(&[key]);
        assert_eq!(targets[0].url, "rtmp://a.rtmp.youtube.com/live2/abcd");
        assert!(targets[0].options.is_empty());
    }
}
