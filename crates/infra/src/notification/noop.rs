//! Noop 送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! SMTP サーバーのない開発環境で使用する。

use async_trait::async_trait;
use planning_relay_domain::notification::{MessageId, NotificationError, OutgoingMail, SentMail};
use uuid::Uuid;

use super::MailTransport;

/// Noop 送信（ログ出力のみ）
#[derive(Debug, Clone, Default)]
pub struct NoopMailTransport;

#[async_trait]
impl MailTransport for NoopMailTransport {
    async fn verify(&self) -> Result<(), NotificationError> {
        tracing::info!("Noop: SMTP 接続の検証をスキップ");
        Ok(())
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, NotificationError> {
        let message_id = MessageId::new(format!("<{}@noop.invalid>", Uuid::new_v4()));
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            message_id = %message_id,
            "Noop: メール送信をスキップ"
        );
        Ok(SentMail { message_id })
    }
}
