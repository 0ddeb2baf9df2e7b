//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、配信ロジックはユースケース層に委譲

pub mod diagnostics;
pub mod health;
pub mod planning;

pub use diagnostics::{DiagnosticsState, send_test_email, show_env};
pub use health::health_check;
pub use planning::{PlanningState, send_planning};
