//! # Relay Service エラー定義
//!
//! Relay Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! 既存クライアントとの互換性のため、バッチ単位の失敗はすべて
//! `500 {"error": "..."}` で返す。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use planning_relay_domain::DomainError;
use planning_relay_shared::{
    ErrorResponse,
    event_log::error::{category, kind},
};
use thiserror::Error;

/// Relay Service で発生するエラー
#[derive(Debug, Error)]
pub enum RelayError {
    /// 配信バッチの検証エラー
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// リクエストボディを解釈できない
    #[error("Corps de requête invalide: {0}")]
    InvalidBody(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        tracing::error!(
            error.category = category::REQUEST,
            error.kind = kind::VALIDATION,
            error = %self,
            "配信リクエストの検証に失敗"
        );

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(self.to_string())),
        )
            .into_response()
    }
}
