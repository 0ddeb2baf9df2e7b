//! # Planning Relay Service
//!
//! 計画表 PDF を受け取り、受信者ごとにメールで配信する HTTP リレー。
//!
//! ## エンドポイント
//!
//! | メソッド | パス | 説明 |
//! |---------|------|------|
//! | `GET` | `/` | 稼働確認 |
//! | `GET` | `/env` | SMTP 設定の確認（パスワードは有無のみ） |
//! | `GET` | `/test-email` | 送信元アドレス宛のテストメール |
//! | `POST` | `/send-planning` | 計画表の一括配信 |
//!
//! ## モジュール構成
//!
//! - [`config`] - 環境変数からの設定読み込み
//! - [`error`] - HTTP レスポンスへのエラー変換
//! - [`handler`] - HTTP リクエストハンドラ
//! - [`usecase`] - 配信ロジック

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use handler::{
    DiagnosticsState,
    PlanningState,
    health_check,
    send_planning,
    send_test_email,
    show_env,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// リクエストボディの上限（PDF をバイト配列で埋め込むため大きめに取る）
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// ルーターを構築する
pub fn router(planning_state: Arc<PlanningState>, diagnostics_state: Arc<DiagnosticsState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/env", get(show_env))
        .route("/test-email", get(send_test_email))
        .with_state(diagnostics_state)
        .merge(
            Router::new()
                .route("/send-planning", post(send_planning))
                .with_state(planning_state),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
