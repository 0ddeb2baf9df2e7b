//! # テスト用モックトランスポート
//!
//! ユースケース・ハンドラテストで使用するインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! planning-relay-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use planning_relay_domain::notification::{
    MessageId,
    NotificationError,
    OutgoingMail,
    SentMail,
    TransportFailure,
};

use crate::notification::MailTransport;

// ===== MockMailTransport =====

/// 送信したメールを記録するモックトランスポート
///
/// `reject_address` で登録した宛先への送信は 550 応答で失敗する。
#[derive(Clone, Default)]
pub struct MockMailTransport {
    sent_mails:         Arc<Mutex<Vec<OutgoingMail>>>,
    rejected_addresses: Arc<Mutex<HashSet<String>>>,
    verify_failure:     Arc<Mutex<Option<TransportFailure>>>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn reject_address(&self, address: impl Into<String>) {
        self.rejected_addresses
            .lock()
            .unwrap()
            .insert(address.into());
    }

    /// 接続検証を失敗させる
    pub fn fail_verify(&self, failure: TransportFailure) {
        *self.verify_failure.lock().unwrap() = Some(failure);
    }

    /// 送信を試行したメール（失敗したものを含む）
    pub fn sent_mails(&self) -> Vec<OutgoingMail> {
        self.sent_mails.lock().unwrap().clone()
    }

    /// 送信を試行した宛先
    pub fn recipients(&self) -> Vec<String> {
        self.sent_mails()
            .into_iter()
            .map(|mail| mail.to)
            .collect()
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn verify(&self) -> Result<(), NotificationError> {
        match self.verify_failure.lock().unwrap().clone() {
            Some(failure) => Err(NotificationError::Connectivity(failure)),
            None => Ok(()),
        }
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, NotificationError> {
        let attempt = {
            let mut sent_mails = self.sent_mails.lock().unwrap();
            sent_mails.push(mail.clone());
            sent_mails.len()
        };

        if self.rejected_addresses.lock().unwrap().contains(&mail.to) {
            return Err(NotificationError::SendFailed(
                TransportFailure::new(format!("550 mailbox unavailable: {}", mail.to))
                    .with_code("550")
                    .with_command("RCPT TO"),
            ));
        }

        Ok(SentMail {
            message_id: MessageId::new(format!("<mock-{attempt}@example.com>")),
        })
    }
}
