use crate::error::{LensError, Result};
use photo_lens_common::ResetPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// APIキーを探す環境変数（先頭優先）
const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];
const MAPS_API_KEY_ENV_VAR: &str = "MAPS_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    /// 地図サムネイル用（未設定なら地図を省略）
    pub maps_api_key: Option<String>,
    pub api_base_url: String,
    pub edit_model: String,
    pub identify_model: String,
    /// 位置情報取得の待ち時間
    pub location_timeout_ms: u64,
    pub reset_policy: ResetPolicy,
    /// MJPEGを標準出力に流し続けるキャプチャコマンド
    pub camera_command: Vec<String>,
    /// カメラ画像の保存先（未設定なら一時ディレクトリ）
    pub capture_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "設定ファイルを読み込みました");
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LensError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("photo-lens").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            api_key: None,
            maps_api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.into(),
            edit_model: "gemini-2.5-flash-image-preview".into(),
            identify_model: "gemini-2.5-flash".into(),
            location_timeout_ms: 5000,
            reset_policy: ResetPolicy::Clear,
            camera_command: [
                "ffmpeg", "-loglevel", "error", "-f", "v4l2", "-i", "/dev/video0",
                "-f", "mjpeg", "-q:v", "3", "pipe:1",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            capture_dir: None,
        }
    }

    /// Gemini APIキー（環境変数を優先）
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    pub fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .find_map(|name| lookup(name))
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn maps_api_key(&self) -> Option<String> {
        self.maps_api_key_with(|name| std::env::var(name).ok())
    }

    pub fn maps_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        lookup(MAPS_API_KEY_ENV_VAR)
            .or_else(|| self.maps_api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn set_maps_api_key(&mut self, key: String) -> Result<()> {
        self.maps_api_key = Some(key);
        self.save()
    }

    pub fn location_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.location_timeout_ms)
    }

    pub fn capture_dir(&self) -> PathBuf {
        self.capture_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("photo-lens-captures"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.edit_model, "gemini-2.5-flash-image-preview");
        assert_eq!(config.location_timeout_ms, 5000);
        assert_eq!(config.reset_policy, ResetPolicy::Clear);
        assert_eq!(config.camera_command[0], "ffmpeg");
    }

    #[test]
    fn test_env_api_key_takes_priority() {
        let config = Config {
            api_key: Some("from-config".into()),
            ..Config::default()
        };

        let key = config.api_key_with(|name| (name == "API_KEY").then(|| "from-env".to_string()));
        assert_eq!(key.as_deref(), Some("from-env"));

        let key = config.api_key_with(|name| match name {
            "GEMINI_API_KEY" => Some("gemini".to_string()),
            "API_KEY" => Some("generic".to_string()),
            _ => None,
        });
        assert_eq!(key.as_deref(), Some("gemini"));
    }

    #[test]
    fn test_config_api_key_fallback() {
        let config = Config {
            api_key: Some("from-config".into()),
            ..Config::default()
        };
        assert_eq!(config.api_key_with(|_| None).as_deref(), Some("from-config"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let config = Config {
            api_key: Some("   ".into()),
            ..Config::default()
        };
        assert!(config.api_key_with(|_| None).is_none());
        assert!(Config::default().maps_api_key_with(|_| None).is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{"api_key": "abc", "reset_policy": "keep_timeline"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.reset_policy, ResetPolicy::KeepTimeline);
        assert_eq!(config.identify_model, "gemini-2.5-flash");
    }
}
