//! # Relay Service 設定
//!
//! 環境変数から Relay Service サーバーと SMTP トランスポートの設定を読み込む。

use std::{env, fmt, time::Duration};

use planning_relay_infra::SmtpSettings;
use serde::Serialize;
use thiserror::Error;

/// `SMTP_USER` 未設定時の送信元アドレス
pub const DEFAULT_SENDER: &str = "noreply@planning-relay.example.com";

/// 証明書検証を有効にする `NODE_ENV` の値
const PRODUCTION: &str = "production";

/// 設定の読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 数値として解釈できない値
    #[error("{name} は有効な数値である必要があります: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    /// 未知の送信バックエンド
    #[error("MAIL_BACKEND は smtp または noop である必要があります: {0:?}")]
    UnknownBackend(String),
}

/// 送信バックエンド
///
/// `MAIL_BACKEND` 環境変数で切り替える:
/// - `smtp`: SMTP サーバー経由で送信（デフォルト）
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailBackend {
    #[default]
    Smtp,
    Noop,
}

impl MailBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim() {
            "smtp" => Ok(Self::Smtp),
            "noop" => Ok(Self::Noop),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Relay Service サーバーの設定
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// バインドアドレス
    pub host:        String,
    /// ポート番号
    pub port:        u16,
    /// 実行環境（`NODE_ENV`）
    pub environment: Option<String>,
    /// 送信バックエンド
    pub backend:     MailBackend,
    /// SMTP 設定
    pub smtp:        SmtpConfig,
}

/// SMTP トランスポートの設定
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP ホスト
    pub host:         String,
    /// SMTP ポート
    pub port:         u16,
    /// 接続直後から TLS を使うか
    pub secure:       bool,
    /// 認証ユーザー（送信元アドレスを兼ねる）
    pub user:         Option<String>,
    /// 認証パスワード
    pub password:     Option<String>,
    /// 接続・送信のタイムアウト（秒）
    pub timeout_secs: u64,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("password_set", &self.password.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RelayConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の変数ソースから設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            host:        lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port:        parse_number(&lookup, "PORT", 3000)?,
            environment: lookup("NODE_ENV").filter(|value| !value.is_empty()),
            backend:     lookup("MAIL_BACKEND")
                .map(|value| MailBackend::parse(&value))
                .transpose()?
                .unwrap_or_default(),
            smtp:        SmtpConfig::from_lookup(&lookup)?,
        })
    }

    /// 本番環境かどうか（証明書検証の有無を決める）
    pub fn is_production(&self) -> bool {
        self.environment.as_deref() == Some(PRODUCTION)
    }

    /// 配信に使うトランスポートの設定
    ///
    /// 本番環境以外では証明書検証を無効化する。
    pub fn delivery_settings(&self) -> SmtpSettings {
        self.smtp.settings(!self.is_production())
    }

    /// 診断（`/test-email`）に使うトランスポートの設定
    ///
    /// 環境によらず証明書検証を無効化する。
    pub fn diagnostic_settings(&self) -> SmtpSettings {
        self.smtp.settings(true)
    }

    /// 稼働確認・診断エンドポイントで公開する設定の要約
    pub fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            environment:         self.environment.clone(),
            smtp:                self.smtp.summary(),
            password_set:        self.smtp.password.is_some(),
            reject_unauthorized: self.is_production(),
            port:                self.port,
        }
    }
}

impl SmtpConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            host:         lookup("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
            port:         parse_number(lookup, "SMTP_PORT", 587)?,
            secure:       lookup("SMTP_SECURE").as_deref() == Some("true"),
            user:         lookup("SMTP_USER").filter(|value| !value.is_empty()),
            password:     lookup("SMTP_PASS").filter(|value| !value.is_empty()),
            timeout_secs: parse_number(lookup, "SMTP_TIMEOUT_SECS", 30)?,
        })
    }

    /// 送信元アドレス
    pub fn sender(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_SENDER)
    }

    /// パスワードを含まない要約
    pub fn summary(&self) -> SmtpSummary {
        SmtpSummary {
            host:   self.host.clone(),
            port:   self.port,
            secure: self.secure,
            user:   self.user.clone(),
        }
    }

    fn settings(&self, accept_invalid_certs: bool) -> SmtpSettings {
        SmtpSettings {
            host: self.host.clone(),
            port: self.port,
            implicit_tls: self.secure,
            username: self.user.clone(),
            password: self.password.clone(),
            accept_invalid_certs,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// SMTP 設定の要約（パスワードを含まない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmtpSummary {
    pub host:   String,
    pub port:   u16,
    pub secure: bool,
    pub user:   Option<String>,
}

/// 公開してよい設定情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub environment:         Option<String>,
    pub smtp:                SmtpSummary,
    pub password_set:        bool,
    pub reject_unauthorized: bool,
    pub port:                u16,
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<RelayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        RelayConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_未設定の場合は既定値を使う() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, None);
        assert_eq!(config.backend, MailBackend::Smtp);
        assert_eq!(config.smtp.host, "localhost");
        assert_eq!(config.smtp.port, 587);
        assert!(!config.smtp.secure);
        assert_eq!(config.smtp.sender(), DEFAULT_SENDER);
        assert_eq!(config.smtp.timeout_secs, 30);
    }

    #[test]
    fn test_環境変数から設定を読み込む() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("NODE_ENV", "production"),
            ("SMTP_HOST", "mail.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_SECURE", "true"),
            ("SMTP_USER", "relay@example.com"),
            ("SMTP_PASS", "s3cret"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.is_production());
        assert_eq!(config.smtp.port, 465);
        assert!(config.smtp.secure);
        assert_eq!(config.smtp.sender(), "relay@example.com");
        assert_eq!(config.smtp.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_不正なポート番号はエラー() {
        let result = config_from(&[("SMTP_PORT", "abc")]);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidNumber {
                name:  "SMTP_PORT",
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_送信バックエンドを切り替える() {
        assert_eq!(
            config_from(&[("MAIL_BACKEND", "noop")]).unwrap().backend,
            MailBackend::Noop
        );
        assert_eq!(
            config_from(&[("MAIL_BACKEND", "ses")]).unwrap_err(),
            ConfigError::UnknownBackend("ses".to_string())
        );
    }

    #[test]
    fn test_本番環境以外では証明書検証を無効化する() {
        let development = config_from(&[("NODE_ENV", "development")]).unwrap();
        let production = config_from(&[("NODE_ENV", "production")]).unwrap();

        assert!(development.delivery_settings().accept_invalid_certs);
        assert!(!production.delivery_settings().accept_invalid_certs);
        assert!(production.diagnostic_settings().accept_invalid_certs);
    }

    #[test]
    fn test_設定の要約とdebug出力にパスワードを含まない() {
        let config = config_from(&[("SMTP_USER", "relay@example.com"), ("SMTP_PASS", "s3cret")])
            .unwrap();

        let info = config.service_info();

        assert!(info.password_set);
        assert_eq!(info.smtp.user.as_deref(), Some("relay@example.com"));
        assert!(!format!("{config:?}").contains("s3cret"));
    }
}
