//! # メール送信トランスポート
//!
//! 配信バッチの各メールを送信するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `MailTransport` trait で接続検証とメール送信を抽象化
//! - **2 つの実装**: SMTP（lettre）、Noop（ログ出力のみ）
//! - **共有**: トランスポートは起動時に 1 回だけ構築し、`Arc<dyn MailTransport>` で共有する

mod noop;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopMailTransport;
use planning_relay_domain::notification::{NotificationError, OutgoingMail, SentMail};
pub use smtp::{SmtpMailTransport, SmtpSettings};

/// メール送信トレイト
///
/// 実装は複数の送信から並行に呼ばれるため、内部状態を変更してはならない。
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 接続と認証を検証する
    ///
    /// 失敗時は [`NotificationError::Connectivity`] を返す。
    async fn verify(&self) -> Result<(), NotificationError>;

    /// メールを 1 通送信する
    ///
    /// 失敗時は [`NotificationError::SendFailed`] を返す。
    async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, NotificationError>;
}
