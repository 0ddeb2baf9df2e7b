//! # ヘルスチェックハンドラ
//!
//! Relay Service の稼働状態を確認するためのエンドポイント。
//!
//! ## エンドポイント
//!
//! ```text
//! GET /
//! ```
//!
//! ## レスポンス例
//!
//! ```json
//! {
//!   "status": "Server is running",
//!   "version": "0.1.0",
//!   "environment": "production",
//!   "smtp": { "host": "mail.example.com", "port": 587, "secure": false, "user": "relay@example.com" }
//! }
//! ```

use std::sync::Arc;

use axum::{Json, extract::State};
use planning_relay_shared::HealthResponse;
use serde::Serialize;

use super::DiagnosticsState;
use crate::config::SmtpSummary;

/// 稼働確認レスポンス
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    #[serde(flatten)]
    pub health:      HealthResponse,
    /// 実行環境（`NODE_ENV`）
    pub environment: Option<String>,
    /// SMTP 設定の要約
    pub smtp:        SmtpSummary,
}

/// ヘルスチェックエンドポイント
pub async fn health_check(State(state): State<Arc<DiagnosticsState>>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        health:      HealthResponse::running(env!("CARGO_PKG_VERSION")),
        environment: state.info.environment.clone(),
        smtp:        state.info.smtp.clone(),
    })
}
