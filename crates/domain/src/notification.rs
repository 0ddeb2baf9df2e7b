//! # 通知
//!
//! メール送信に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`OutgoingMail`] | 送信メッセージ | 受信者 1 名分の件名・本文・添付 |
//! | [`SentMail`] | 送信完了 | SMTP サーバーが受理したメッセージの ID |
//! | [`DispatchOutcome`] | 配信結果 | 受信者ごとの成功 / 失敗 |
//! | [`NotificationError`] | 送信エラー | 接続検証の失敗、個別送信の失敗 |
//!
//! ## 設計方針
//!
//! - **失敗の局所化**: 個別送信の失敗は [`DispatchOutcome`] に回収され、バッチを中断しない
//! - **エラー詳細の保持**: SMTP の応答コードと失敗したコマンドを [`TransportFailure`] に保持する

use bytes::Bytes;
use derive_more::{Deref, Display, From};
use thiserror::Error;

use crate::planning::Recipient;

/// PDF 添付ファイルの Content-Type
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// メッセージ ID
///
/// `Message-ID` ヘッダの値（`<...@...>` 形式）をそのまま保持する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Deref)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// 送信トランスポートの失敗詳細
///
/// `code` は SMTP 応答コード（例: `"535"`）またはトランスポート層の
/// エラー識別子（例: `"ETIMEDOUT"`）。`command` は失敗した SMTP フェーズ。
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{message}")]
pub struct TransportFailure {
    pub message: String,
    pub code:    Option<String>,
    pub command: Option<String>,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code:    None,
            command: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}

/// 通知送信エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// SMTP 設定の検証（接続・認証）に失敗
    #[error("SMTP 接続の検証に失敗: {0}")]
    Connectivity(TransportFailure),

    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(TransportFailure),
}

impl NotificationError {
    /// 失敗詳細を返す
    pub fn failure(&self) -> &TransportFailure {
        match self {
            Self::Connectivity(failure) | Self::SendFailed(failure) => failure,
        }
    }
}

/// 添付ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    /// ファイル名（拡張子を含む）
    pub filename:     String,
    /// Content-Type（例: `application/pdf`）
    pub content_type: String,
    /// 内容（バッチ内の全送信で共有される）
    pub content:      Bytes,
}

impl MailAttachment {
    /// PDF 添付ファイルを作成する
    pub fn pdf(filename: impl Into<String>, content: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            content,
        }
    }
}

/// 送信メッセージ
///
/// インフラ層の `MailTransport` に渡される、受信者 1 名分のメッセージ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// 送信元メールアドレス
    pub from:       String,
    /// 送信先メールアドレス
    pub to:         String,
    /// 件名
    pub subject:    String,
    /// プレーンテキスト本文
    pub text_body:  String,
    /// 添付ファイル
    pub attachment: Option<MailAttachment>,
}

/// 送信完了
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub message_id: MessageId,
}

/// 受信者ごとの送信状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// SMTP サーバーが受理した
    Sent { message_id: MessageId },
    /// 送信に失敗した
    Failed { error_message: String },
}

/// 配信結果
///
/// 送信対象の受信者 1 名につき必ず 1 件生成される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub recipient: Recipient,
    pub status:    DeliveryStatus,
}

impl DispatchOutcome {
    pub fn sent(recipient: Recipient, message_id: MessageId) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Sent { message_id },
        }
    }

    pub fn failed(recipient: Recipient, error_message: impl Into<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Failed {
                error_message: error_message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, DeliveryStatus::Sent { .. })
    }

    /// 成功時のみメッセージ ID を返す
    pub fn message_id(&self) -> Option<&MessageId> {
        match &self.status {
            DeliveryStatus::Sent { message_id } => Some(message_id),
            DeliveryStatus::Failed { .. } => None,
        }
    }

    /// 失敗時のみエラーメッセージを返す
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            DeliveryStatus::Sent { .. } => None,
            DeliveryStatus::Failed { error_message } => Some(error_message),
        }
    }
}
