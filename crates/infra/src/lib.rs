//! # Planning Relay インフラ層
//!
//! 外部システム（SMTP サーバー）との通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはメール送信トランスポートの具体的な実装を提供する。
//! SMTP の詳細をカプセル化し、配信ロジックをトランスポートの変更から保護する。
//!
//! ## 依存関係
//!
//! ```text
//! relay-service → infra → domain
//!       ↘                   ↑
//!         ─────────────────
//! ```
//!
//! ## モジュール構成
//!
//! - [`notification`] - メール送信トランスポート（SMTP / Noop）
//! - `mock` - テスト用モック（`test-utils` feature）

#[cfg(feature = "test-utils")]
pub mod mock;
pub mod notification;

pub use notification::{MailTransport, NoopMailTransport, SmtpMailTransport, SmtpSettings};
