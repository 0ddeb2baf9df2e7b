//! # Relay Service サーバー
//!
//! 計画表 PDF を受信者ごとにメール配信する HTTP サーバー。
//!
//! ## 役割
//!
//! - **受信**: PDF と受信者一覧を JSON で受け取る
//! - **配信**: 受信者ごとに件名・本文を差し込んだメールを SMTP で並行送信する
//! - **診断**: SMTP 設定の確認とテストメール送信
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `PORT` | No | ポート番号（デフォルト: `3000`） |
//! | `MAIL_BACKEND` | No | `smtp`（デフォルト）または `noop` |
//! | `NODE_ENV` | No | `production` の場合のみ証明書を検証する |
//! | `SMTP_HOST` | No | SMTP ホスト（デフォルト: `localhost`） |
//! | `SMTP_PORT` | No | SMTP ポート（デフォルト: `587`） |
//! | `SMTP_SECURE` | No | `true` で接続直後から TLS を使う |
//! | `SMTP_USER` | No | 認証ユーザー（送信元アドレスを兼ねる） |
//! | `SMTP_PASS` | No | 認証パスワード |
//! | `SMTP_TIMEOUT_SECS` | No | 接続・送信のタイムアウト（デフォルト: `30`） |
//! | `LOG_FORMAT` | No | `json` または `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! SMTP_HOST=mail.example.com SMTP_USER=relay@example.com SMTP_PASS=... \
//!   cargo run -p planning-relay-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use planning_relay_infra::{MailTransport, NoopMailTransport, SmtpMailTransport, SmtpSettings};
use planning_relay_service::{
    config::{MailBackend, RelayConfig},
    handler::{DiagnosticsState, PlanningState},
    router,
    usecase::PlanningDispatcher,
};
use planning_relay_shared::{
    event_log::{
        error::{category, kind},
        event,
    },
    log_business_event,
    observability::TracingConfig,
};
use tokio::net::TcpListener;

/// Relay Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    let tracing_config = TracingConfig::from_env("relay-service");
    let _app_span = planning_relay_shared::observability::init_tracing(&tracing_config).entered();

    // 設定読み込み
    let config = RelayConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        environment = config.environment.as_deref(),
        smtp = ?config.smtp,
        reject_unauthorized = config.is_production(),
        "Relay Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // トランスポートは起動時に 1 回だけ構築し、全リクエストで共有する
    let delivery_transport = build_transport(config.backend, &config.delivery_settings())?;
    let diagnostic_transport = build_transport(config.backend, &config.diagnostic_settings())?;

    // 接続検証は起動をブロックしない
    tokio::spawn(verify_transport(delivery_transport.clone()));

    let sender = config.smtp.sender().to_string();
    let planning_state = Arc::new(PlanningState {
        dispatcher: PlanningDispatcher::new(delivery_transport, sender.clone()),
    });
    let diagnostics_state = Arc::new(DiagnosticsState {
        info: config.service_info(),
        sender,
        transport: diagnostic_transport,
    });

    let app = router(planning_state, diagnostics_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Relay Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Relay Service サーバーを停止しました");
    Ok(())
}

/// 送信バックエンドに応じたトランスポートを構築する
fn build_transport(
    backend: MailBackend,
    settings: &SmtpSettings,
) -> anyhow::Result<Arc<dyn MailTransport>> {
    let transport: Arc<dyn MailTransport> = match backend {
        MailBackend::Smtp => Arc::new(
            SmtpMailTransport::new(settings).context("SMTP トランスポートの構築に失敗しました")?,
        ),
        MailBackend::Noop => {
            tracing::warn!("MAIL_BACKEND=noop: メールは送信されません");
            Arc::new(NoopMailTransport)
        }
    };
    Ok(transport)
}

/// 配信用トランスポートの接続を検証し、結果をログに出力する
///
/// 失敗してもプロセスは停止しない。
async fn verify_transport(transport: Arc<dyn MailTransport>) {
    match transport.verify().await {
        Ok(()) => {
            log_business_event!(
                event.category = event::category::DIAGNOSTICS,
                event.action = event::action::TRANSPORT_VERIFIED,
                event.result = event::result::SUCCESS,
                "SMTP サーバーの準備ができました"
            );
        }
        Err(e) => {
            let failure = e.failure();
            tracing::error!(
                error.category = category::EXTERNAL_SERVICE,
                error.kind = kind::SMTP_CONNECTIVITY,
                error.code = failure.code.as_deref(),
                error.command = failure.command.as_deref(),
                error = %e,
                "SMTP 設定の検証に失敗しました"
            );
        }
    }
}

/// Ctrl-C または SIGTERM を待つ
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl-C ハンドラの登録に失敗しました");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM ハンドラの登録に失敗しました");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("シャットダウンシグナルを受信しました");
}
