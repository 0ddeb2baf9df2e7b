//! # 診断ハンドラ
//!
//! SMTP 設定の確認と、テストメールの送信を行うエンドポイント。
//!
//! ## エンドポイント
//!
//! ```text
//! GET /env         設定の有無を返す（パスワードは有無のみ）
//! GET /test-email  送信元アドレス宛にテストメールを送る
//! ```

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use planning_relay_domain::notification::{
    NotificationError,
    OutgoingMail,
    SentMail,
    TransportFailure,
};
use planning_relay_infra::MailTransport;
use planning_relay_shared::{
    event_log::{
        error::{category, kind},
        event,
    },
    log_business_event,
};
use serde::Serialize;

use crate::config::{ServiceInfo, SmtpSummary};

const TEST_EMAIL_SUBJECT: &str = "Test de configuration email";
const TEST_EMAIL_BODY: &str =
    "Si vous recevez cet email, la configuration SMTP fonctionne correctement.";
const TEST_EMAIL_SUCCESS: &str = "Email de test envoyé avec succès";

/// 稼働確認・診断ハンドラの State
pub struct DiagnosticsState {
    /// 公開してよい設定情報
    pub info:      ServiceInfo,
    /// テストメールの送信元・宛先
    pub sender:    String,
    /// 証明書検証を無効化した診断用トランスポート
    pub transport: Arc<dyn MailTransport>,
}

// --- GET /env ---

/// 設定確認レスポンス
#[derive(Debug, Serialize)]
pub struct EnvResponse {
    pub environment: Option<String>,
    pub smtp:        EnvSmtpResponse,
    pub port:        u16,
}

/// 設定確認レスポンスの SMTP 部分
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSmtpResponse {
    #[serde(flatten)]
    pub summary:             SmtpSummary,
    pub password_set:        bool,
    pub reject_unauthorized: bool,
}

/// GET /env
pub async fn show_env(State(state): State<Arc<DiagnosticsState>>) -> Json<EnvResponse> {
    Json(EnvResponse {
        environment: state.info.environment.clone(),
        smtp:        EnvSmtpResponse {
            summary:             state.info.smtp.clone(),
            password_set:        state.info.password_set,
            reject_unauthorized: state.info.reject_unauthorized,
        },
        port:        state.info.port,
    })
}

// --- GET /test-email ---

/// テストメール送信成功レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEmailResponse {
    pub success:    bool,
    pub message:    String,
    pub message_id: String,
    pub config:     SmtpSummary,
}

/// テストメール送信失敗レスポンス
#[derive(Debug, Serialize)]
pub struct TestEmailErrorResponse {
    pub success: bool,
    pub error:   TransportErrorDto,
    pub config:  DiagnosticConfigDto,
}

/// トランスポートの失敗詳細
#[derive(Debug, Serialize)]
pub struct TransportErrorDto {
    pub message: String,
    pub code:    Option<String>,
    pub command: Option<String>,
}

impl From<&TransportFailure> for TransportErrorDto {
    fn from(failure: &TransportFailure) -> Self {
        Self {
            message: failure.message.clone(),
            code:    failure.code.clone(),
            command: failure.command.clone(),
        }
    }
}

/// 診断用トランスポートの設定
#[derive(Debug, Serialize)]
pub struct DiagnosticConfigDto {
    #[serde(flatten)]
    pub summary: SmtpSummary,
    pub tls:     DiagnosticTlsDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticTlsDto {
    pub reject_unauthorized: bool,
}

/// GET /test-email
///
/// 診断用トランスポートで接続を検証し、送信元アドレス宛にテストメールを送る。
#[tracing::instrument(skip_all)]
pub async fn send_test_email(State(state): State<Arc<DiagnosticsState>>) -> Response {
    tracing::info!(smtp = ?state.info.smtp, "SMTP 設定のテストを開始");

    let sent = verify_and_send(&state).await;

    match sent {
        Ok(sent) => {
            log_business_event!(
                event.category = event::category::DIAGNOSTICS,
                event.action = event::action::TEST_EMAIL_SENT,
                event.result = event::result::SUCCESS,
                notification.message_id = %sent.message_id,
                "テストメール送信成功"
            );
            Json(TestEmailResponse {
                success:    true,
                message:    TEST_EMAIL_SUCCESS.to_string(),
                message_id: sent.message_id.into_string(),
                config:     state.info.smtp.clone(),
            })
            .into_response()
        }
        Err(e) => {
            let failure = e.failure();
            log_business_event!(
                event.category = event::category::DIAGNOSTICS,
                event.action = event::action::TEST_EMAIL_SENT,
                event.result = event::result::FAILURE,
                error.category = category::EXTERNAL_SERVICE,
                error.kind = error_kind(&e),
                error.code = failure.code.as_deref(),
                error.command = failure.command.as_deref(),
                error = %e,
                "テストメール送信失敗"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TestEmailErrorResponse {
                    success: false,
                    error:   TransportErrorDto::from(failure),
                    config:  DiagnosticConfigDto {
                        summary: state.info.smtp.clone(),
                        tls:     DiagnosticTlsDto {
                            reject_unauthorized: false,
                        },
                    },
                }),
            )
                .into_response()
        }
    }
}

/// 接続を検証してからテストメールを送る
async fn verify_and_send(state: &DiagnosticsState) -> Result<SentMail, NotificationError> {
    state.transport.verify().await?;
    tracing::info!("SMTP 設定を検証しました");
    log_business_event!(
        event.category = event::category::DIAGNOSTICS,
        event.action = event::action::TRANSPORT_VERIFIED,
        event.result = event::result::SUCCESS,
        "SMTP 接続の検証に成功"
    );

    let mail = OutgoingMail {
        from:       state.sender.clone(),
        to:         state.sender.clone(),
        subject:    TEST_EMAIL_SUBJECT.to_string(),
        text_body:  TEST_EMAIL_BODY.to_string(),
        attachment: None,
    };
    state.transport.send(&mail).await
}

fn error_kind(error: &NotificationError) -> &'static str {
    match error {
        NotificationError::Connectivity(_) => kind::SMTP_CONNECTIVITY,
        NotificationError::SendFailed(_) => kind::SMTP_SEND,
    }
}
