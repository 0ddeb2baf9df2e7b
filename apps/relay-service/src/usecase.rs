//! # ユースケース層
//!
//! HTTP ハンドラから呼ばれるアプリケーションロジックを定義する。
//!
//! ## モジュール構成
//!
//! - [`dispatch`] - 配信バッチの展開・並行送信・結果の集約

pub mod dispatch;

pub use dispatch::PlanningDispatcher;
