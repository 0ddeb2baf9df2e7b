//! # 計画表配信サービス
//!
//! 検証済みの配信バッチを受信者ごとのメールに展開し、並行に送信する。
//!
//! ## 設計方針
//!
//! - **失敗の局所化**: 個別送信の失敗は配信結果に回収し、他の受信者への送信を妨げない
//! - **全件待機**: すべての送信が完了（成功・失敗）するまで待ってから結果を返す
//! - **依存性注入**: `MailTransport` は起動時に構築され、trait オブジェクトで共有される

use std::sync::Arc;

use futures_util::future::join_all;
use planning_relay_domain::{
    notification::{DispatchOutcome, MailAttachment, OutgoingMail},
    planning::{MailTemplate, PlanningBatch, Recipient},
};
use planning_relay_infra::MailTransport;
use planning_relay_shared::{
    event_log::{
        error::{category, kind},
        event,
    },
    log_business_event,
};

/// 計画表配信サービス
pub struct PlanningDispatcher {
    transport: Arc<dyn MailTransport>,
    sender:    String,
}

impl PlanningDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, sender: impl Into<String>) -> Self {
        Self {
            transport,
            sender: sender.into(),
        }
    }

    /// 送信元アドレス
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// トランスポート
    pub fn transport(&self) -> &Arc<dyn MailTransport> {
        &self.transport
    }

    /// バッチを配信する
    ///
    /// メールアドレスを持つ受信者 1 名につき 1 件の配信結果を入力順で返す。
    /// 送信に失敗した受信者も失敗の配信結果として含まれる。
    #[tracing::instrument(skip_all, fields(mode = %batch.kind().mode()))]
    pub async fn dispatch(&self, batch: &PlanningBatch) -> Vec<DispatchOutcome> {
        let template = batch.template();

        let sends = batch
            .eligible_recipients()
            .map(|recipient| self.send_to(recipient, &template, batch));
        let outcomes = join_all(sends).await;

        let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
        let failed = outcomes.len() - succeeded;
        let result = match (succeeded, failed) {
            (_, 0) => event::result::SUCCESS,
            (0, _) => event::result::FAILURE,
            _ => event::result::PARTIAL,
        };
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::PLANNING_DISPATCHED,
            event.result = result,
            planning.mode = %batch.kind().mode(),
            planning.period_start = %batch.period().start(),
            planning.recipients = batch.recipients().len(),
            planning.sent = succeeded,
            planning.failed = failed,
            "計画表の配信が完了"
        );

        outcomes
    }

    async fn send_to(
        &self,
        recipient: &Recipient,
        template: &MailTemplate,
        batch: &PlanningBatch,
    ) -> DispatchOutcome {
        // eligible_recipients() で絞り込み済み
        let address = recipient.deliverable_address().unwrap_or_default();
        tracing::debug!(notification.recipient = %address, "メール送信を開始");

        let mail = OutgoingMail {
            from:       self.sender.clone(),
            to:         address.to_string(),
            subject:    template.subject().to_string(),
            text_body:  template.body_for(&recipient.name),
            attachment: Some(MailAttachment::pdf(
                template.attachment_filename(),
                batch.document().clone(),
            )),
        };

        match self.transport.send(&mail).await {
            Ok(sent) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.result = event::result::SUCCESS,
                    notification.recipient = %address,
                    notification.message_id = %sent.message_id,
                    "計画表メール送信成功"
                );
                DispatchOutcome::sent(recipient.clone(), sent.message_id)
            }
            Err(e) => {
                let failure = e.failure();
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.result = event::result::FAILURE,
                    error.category = category::EXTERNAL_SERVICE,
                    error.kind = kind::SMTP_SEND,
                    error.code = failure.code.as_deref(),
                    error.command = failure.command.as_deref(),
                    notification.recipient = %address,
                    error = %e,
                    "計画表メール送信失敗"
                );
                DispatchOutcome::failed(recipient.clone(), failure.message.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::NaiveDate;
    use planning_relay_domain::planning::{BatchKind, CustomContent};
    use planning_relay_infra::mock::MockMailTransport;
    use pretty_assertions::assert_eq;

    use super::*;

    const SENDER: &str = "relay@example.com";

    fn make_dispatcher(transport: MockMailTransport) -> PlanningDispatcher {
        PlanningDispatcher::new(Arc::new(transport), SENDER)
    }

    fn recipient(name: &str, email: Option<&str>) -> Recipient {
        Recipient::new(name, email.map(str::to_string))
    }

    fn make_batch(recipients: Vec<Recipient>, kind: BatchKind) -> PlanningBatch {
        PlanningBatch::new(
            Bytes::from_static(b"%PDF-1.4 planning"),
            recipients,
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            kind,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_メールアドレスを持つ受信者にのみ送信する() {
        let transport = MockMailTransport::new();
        let dispatcher = make_dispatcher(transport.clone());
        let batch = make_batch(
            vec![
                recipient("Alice", Some("a@x.com")),
                recipient("Bob", Some("")),
                recipient("Chloe", None),
            ],
            BatchKind::Weekly,
        );

        let outcomes = dispatcher.dispatch(&batch).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].recipient.name, "Alice");
        assert!(outcomes[0].is_success());
        assert_eq!(transport.recipients(), vec!["a@x.com".to_string()]);

        let mail = &transport.sent_mails()[0];
        assert_eq!(mail.from, SENDER);
        assert_eq!(mail.subject, "Planning du 03/06/2024 au 09/06/2024");
        assert!(mail.text_body.starts_with("Bonjour Alice,"));
    }

    #[tokio::test]
    async fn test_一件の送信失敗が他の受信者の送信を妨げない() {
        let transport = MockMailTransport::new();
        transport.reject_address("b@x.com");
        let dispatcher = make_dispatcher(transport.clone());
        let batch = make_batch(
            vec![
                recipient("Alice", Some("a@x.com")),
                recipient("Bob", Some("b@x.com")),
                recipient("Chloe", Some("c@x.com")),
            ],
            BatchKind::Weekly,
        );

        let outcomes = dispatcher.dispatch(&batch).await;

        let summary: Vec<(&str, bool)> = outcomes
            .iter()
            .map(|outcome| (outcome.recipient.name.as_str(), outcome.is_success()))
            .collect();
        assert_eq!(
            summary,
            vec![("Alice", true), ("Bob", false), ("Chloe", true)]
        );
        assert_eq!(
            outcomes[1].error_message(),
            Some("550 mailbox unavailable: b@x.com")
        );
        assert_eq!(outcomes[1].message_id(), None);
        assert_eq!(transport.sent_mails().len(), 3);
    }

    #[tokio::test]
    async fn test_月次カスタム本文で件名と添付ファイル名を差し替える() {
        let transport = MockMailTransport::new();
        let dispatcher = make_dispatcher(transport.clone());
        let custom = CustomContent {
            subject:       "Juin".to_string(),
            body_template: "Bonjour {name}, voici juin".to_string(),
            period_label:  "Juin_2024".to_string(),
        };
        let batch = make_batch(
            vec![recipient("Alice", Some("a@x.com"))],
            BatchKind::MonthlyCustom(custom),
        );

        dispatcher.dispatch(&batch).await;

        let mail = &transport.sent_mails()[0];
        assert_eq!(mail.subject, "Juin");
        assert_eq!(mail.text_body, "Bonjour Alice, voici juin");
        let attachment = mail.attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, "planning_mensuel_juin_2024.pdf");
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.content, batch.document().clone());
    }

    #[tokio::test]
    async fn test_送信対象がいない場合は空の結果を返す() {
        let transport = MockMailTransport::new();
        let dispatcher = make_dispatcher(transport.clone());
        let batch = make_batch(vec![recipient("Bob", None)], BatchKind::MonthlyDefault);

        let outcomes = dispatcher.dispatch(&batch).await;

        assert!(outcomes.is_empty());
        assert!(transport.sent_mails().is_empty());
    }
}
