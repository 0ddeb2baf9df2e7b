//! # ドメイン層エラー定義
//!
//! 配信バッチの入力検証で発生するエラー型。
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 500 Internal Server Error | 必須フィールドの欠落、不正な形式 |
//!
//! HTTP ステータスは既存クライアントとの互換性のため 500 に固定している。
//! メッセージはそのままクライアントに返るため、既存クライアントに合わせてフランス語とする。

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// バッチの検証に失敗した場合に使用する。検証エラーが返された時点では
/// 送信は一件も試行されていない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// - 必須フィールド（文書、受信者一覧、期間開始日）が未入力
    /// - 日付の形式が不正、または期間が計算できない
    #[error("{0}")]
    Validation(String),
}

impl DomainError {
    /// 欠落しているフィールド名からバリデーションエラーを作成する
    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::Validation(format!(
            "Données manquantes dans la requête: {}",
            fields.join(", ")
        ))
    }
}
