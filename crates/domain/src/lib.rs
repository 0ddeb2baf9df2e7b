//! # Planning Relay ドメイン層
//!
//! 計画表（planning）の一括メール配信に関するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **値オブジェクト**: 受信者、期間、カスタム本文は不変オブジェクトとして扱う
//! - **tagged enum による配信種別**: 週次 / 月次（既定）/ 月次（カスタム）を
//!   [`planning::BatchKind`] で表現し、テンプレート選択を網羅的にする
//! - **ドメインエラー**: 入力検証の失敗は [`DomainError`] で表現する
//!
//! ## 依存関係の方向
//!
//! ```text
//! relay-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（SMTP、HTTP）には一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`notification`] - 送信メッセージ、送信結果、送信エラー
//! - [`planning`] - 配信バッチと件名・本文・添付ファイル名の導出

pub mod error;
pub mod notification;
pub mod planning;

pub use error::DomainError;
