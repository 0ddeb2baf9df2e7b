//! # Observability 基盤
//!
//! トレーシングの初期化と、ログ出力形式の選択を行う。
//!
//! | 環境変数 | 説明 |
//! |---------|------|
//! | `LOG_FORMAT` | `json`（本番向け）または `pretty`（既定） |
//! | `RUST_LOG` | ログフィルタ。未設定時は [`DEFAULT_ENV_FILTER`] |
//!
//! [`init_tracing`] はサービス名を持つ `app` スパンを返す。呼び出し元がこれを
//! `entered()` しておくと、JSON ログの全行に `span.service` が付く。

/// 既定のログフィルタ（`RUST_LOG` 未設定時）
pub const DEFAULT_ENV_FILTER: &str = "info,planning_relay=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式
    Json,
    /// 人間が読みやすい形式
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式を決定する
    ///
    /// 大文字・小文字と前後の空白は区別しない。未知の値は stderr に警告を出して
    /// [`Pretty`](LogFormat::Pretty) にフォールバックする（この時点ではまだ
    /// トレーシングが初期化されていない）。
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" | "" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// `app` スパンの `service` フィールドに出力するサービス名
    pub service_name: String,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    /// 環境変数から設定を読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::from_lookup(service_name, |name| std::env::var(name).ok())
    }

    /// 任意の変数ソースから設定を読み取る
    pub fn from_lookup(
        service_name: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            log_format:   lookup("LOG_FORMAT")
                .map(|value| LogFormat::parse(&value))
                .unwrap_or_default(),
        }
    }
}

/// トレーシングを初期化し、サービス名を持つ `app` スパンを返す
///
/// グローバルサブスクライバの登録はプロセスで 1 回だけ行うこと。
#[cfg(feature = "observability")]
#[must_use = "返されたスパンを entered() しないとサービス名がログに付かない"]
pub fn init_tracing(config: &TracingConfig) -> tracing::Span {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_ENV_FILTER.into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info_span!("app", service = %config.service_name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parseは大文字小文字と空白を区別しない() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("Pretty"), LogFormat::Pretty);
    }

    #[test]
    fn test_parse_未知の値はprettyにフォールバックする() {
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
    }

    #[test]
    fn test_from_lookupはlog_formatを読み取る() {
        let config = TracingConfig::from_lookup("relay-service", |name| {
            (name == "LOG_FORMAT").then(|| "json".to_string())
        });

        assert_eq!(
            config,
            TracingConfig {
                service_name: "relay-service".to_string(),
                log_format:   LogFormat::Json,
            }
        );
    }

    #[test]
    fn test_from_lookup_未設定の場合はpretty() {
        let config = TracingConfig::from_lookup("relay-service", |_| None);

        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
