//! SMTP 送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 接続はトランスポート内部でプールされ、バッチ内の並行送信で再利用される。

use std::{fmt, time::Duration};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{
        Error as SmtpError,
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use planning_relay_domain::notification::{
    MessageId,
    NotificationError,
    OutgoingMail,
    SentMail,
    TransportFailure,
};
use uuid::Uuid;

use super::MailTransport;

/// 宛先・送信元・本文の不備を表すエラーコード
const ENVELOPE_ERROR_CODE: &str = "EENVELOPE";

/// SMTP 接続設定
#[derive(Clone)]
pub struct SmtpSettings {
    /// SMTP サーバーのホスト名
    pub host:                 String,
    /// ポート番号
    pub port:                 u16,
    /// 接続直後から TLS を使うか（`false` の場合は STARTTLS を試行する）
    pub implicit_tls:         bool,
    /// 認証ユーザー名
    pub username:             Option<String>,
    /// 認証パスワード
    pub password:             Option<String>,
    /// 証明書検証を無効化するか
    pub accept_invalid_certs: bool,
    /// 接続・送信のタイムアウト
    pub timeout:              Duration,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("implicit_tls", &self.implicit_tls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// SMTP 送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// 設定から SMTP トランスポートを構築する
    ///
    /// 接続はこの時点では行わない。TLS パラメータの構築に失敗した場合は
    /// [`NotificationError::Connectivity`] を返す。
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotificationError> {
        let tls_parameters = TlsParameters::builder(settings.host.clone())
            .dangerous_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| NotificationError::Connectivity(smtp_failure(&e, Some("CONN"))))?;

        let tls = if settings.implicit_tls {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .tls(tls)
            .timeout(Some(settings.timeout));

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn verify(&self) -> Result<(), NotificationError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(NotificationError::Connectivity(
                TransportFailure::new("SMTP サーバーが接続確認に応答しませんでした")
                    .with_command("NOOP"),
            )),
            Err(e) => Err(NotificationError::Connectivity(smtp_failure(&e, Some("CONN")))),
        }
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<SentMail, NotificationError> {
        let (message, message_id) = build_message(mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(smtp_failure(&e, None)))?;

        Ok(SentMail { message_id })
    }
}

/// 送信メッセージから MIME メッセージを構築する
///
/// `Message-ID` は送信元ドメインで生成し、送信結果として返す。
fn build_message(mail: &OutgoingMail) -> Result<(Message, MessageId), NotificationError> {
    let from = mail
        .from
        .parse::<Mailbox>()
        .map_err(|e| envelope_error(format!("送信元アドレス不正: {e}")))?;
    let to = mail
        .to
        .parse::<Mailbox>()
        .map_err(|e| envelope_error(format!("宛先アドレス不正: {e}")))?;

    let domain = mail
        .from
        .rsplit_once('@')
        .map_or("localhost", |(_, domain)| domain);
    let message_id = MessageId::new(format!("<{}@{domain}>", Uuid::new_v4()));

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(&mail.subject)
        .message_id(Some(message_id.as_str().to_string()));

    let text = SinglePart::plain(mail.text_body.clone());
    let message = match &mail.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| envelope_error(format!("Content-Type 不正: {e}")))?;
            builder.multipart(
                MultiPart::mixed().singlepart(text).singlepart(
                    Attachment::new(attachment.filename.clone())
                        .body(attachment.content.to_vec(), content_type),
                ),
            )
        }
        None => builder.singlepart(text),
    }
    .map_err(|e| envelope_error(format!("メッセージ構築失敗: {e}")))?;

    Ok((message, message_id))
}

fn envelope_error(message: String) -> NotificationError {
    NotificationError::SendFailed(TransportFailure::new(message).with_code(ENVELOPE_ERROR_CODE))
}

/// lettre のエラーを失敗詳細に変換する
///
/// SMTP 応答がある場合は応答コード、ない場合はトランスポート層の分類をコードとする。
fn smtp_failure(error: &SmtpError, command: Option<&str>) -> TransportFailure {
    let code = match error.status() {
        Some(code) => code.to_string(),
        None if error.is_timeout() => "ETIMEDOUT".to_string(),
        None if error.is_tls() => "ETLS".to_string(),
        None => "ECONNECTION".to_string(),
    };

    let failure = TransportFailure::new(error.to_string()).with_code(code);
    match command {
        Some(command) => failure.with_command(command),
        None => failure,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use planning_relay_domain::notification::MailAttachment;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn settings(implicit_tls: bool) -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: if implicit_tls { 465 } else { 587 },
            implicit_tls,
            username: Some("relay@example.com".to_string()),
            password: Some("s3cret".to_string()),
            accept_invalid_certs: false,
            timeout: Duration::from_secs(30),
        }
    }

    fn planning_mail() -> OutgoingMail {
        OutgoingMail {
            from:       "relay@example.com".to_string(),
            to:         "alice@example.com".to_string(),
            subject:    "Planning du 03/06/2024 au 09/06/2024".to_string(),
            text_body:  "Bonjour Alice".to_string(),
            attachment: Some(MailAttachment::pdf(
                "planning_03/06/2024_09/06/2024.pdf",
                Bytes::from_static(b"%PDF-1.4"),
            )),
        }
    }

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailTransport>();
    }

    // 接続プールがクリーンアップタスクを起動するため、ランタイム上で構築する
    #[rstest]
    #[case(true)]
    #[case(false)]
    #[tokio::test]
    async fn test_設定からトランスポートを構築できる(#[case] implicit_tls: bool) {
        assert!(SmtpMailTransport::new(&settings(implicit_tls)).is_ok());
    }

    #[test]
    fn test_debug出力にパスワードを含まない() {
        let output = format!("{:?}", settings(false));

        assert!(!output.contains("s3cret"));
        assert!(output.contains("[REDACTED]"));
    }

    #[test]
    fn test_添付ファイル付きメッセージを構築する() {
        let (message, message_id) = build_message(&planning_mail()).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(message_id.as_str().ends_with("@example.com>"));
        assert!(formatted.contains(&format!("Message-ID: {message_id}")));
        assert!(formatted.contains("Subject: Planning du 03/06/2024 au 09/06/2024"));
        assert!(formatted.contains("Content-Disposition: attachment"));
        assert!(formatted.contains("application/pdf"));
    }

    #[test]
    fn test_添付ファイルなしのメッセージを構築する() {
        let mail = OutgoingMail {
            attachment: None,
            ..planning_mail()
        };

        let (message, _) = build_message(&mail).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(!formatted.contains("multipart/mixed"));
        assert!(formatted.contains("Bonjour Alice"));
    }

    #[rstest]
    #[case("not-an-address")]
    #[case("")]
    fn test_不正な宛先アドレスはエンベロープエラー(#[case] to: &str) {
        let mail = OutgoingMail {
            to: to.to_string(),
            ..planning_mail()
        };

        let error = build_message(&mail).unwrap_err();

        assert!(matches!(error, NotificationError::SendFailed(_)));
        assert_eq!(error.failure().code.as_deref(), Some(ENVELOPE_ERROR_CODE));
    }
}
