//! # 計画表配信バッチ
//!
//! 1 リクエスト分の配信バッチ（文書・受信者一覧・期間・配信種別）を定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`PlanningBatch`] | 配信バッチ | 検証済みの一括配信リクエスト |
//! | [`Recipient`] | 受信者 | 氏名と任意のメールアドレス |
//! | [`PlanningPeriod`] | 配信期間 | 開始日から 7 日間 |
//! | [`BatchKind`] | 配信種別 | 週次 / 月次（既定）/ 月次（カスタム） |
//! | [`CustomContent`] | カスタム本文 | 月次配信の件名・本文・期間ラベル |
//!
//! ## 設計方針
//!
//! - **検証済みの型**: [`PlanningBatch`] は生成時に検証され、以降は送信処理のみを行う
//! - **文書の共有**: 文書は [`Bytes`] で保持し、全受信者への送信で複製せず共有する
//! - **メールアドレスのない受信者**: 未設定または空文字列の受信者はエラーとせず送信対象から除外する
//!
//! テンプレートの導出は [`template`] モジュールを参照。

pub mod template;

use bytes::Bytes;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

pub use self::template::{MailTemplate, NAME_PLACEHOLDER};
use crate::error::DomainError;

/// 受信者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// 氏名（本文の宛名に使用）
    pub name:  String,
    /// メールアドレス（未設定の受信者には送信しない）
    pub email: Option<String>,
}

impl Recipient {
    pub fn new(name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            name: name.into(),
            email,
        }
    }

    /// 送信先アドレスを返す
    ///
    /// 未設定または空文字列の場合のみ `None`。空白のみのアドレスは送信対象とし、
    /// 前後の空白を除いた値を返す（送信時にアドレス不正として失敗する）。
    pub fn deliverable_address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|email| !email.is_empty())
            .map(str::trim)
    }
}

/// カスタム本文（月次配信用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomContent {
    /// 件名（そのまま使用する）
    pub subject:       String,
    /// 本文テンプレート（[`NAME_PLACEHOLDER`] が受信者名に置換される）
    pub body_template: String,
    /// 期間ラベル（例: `"Juin_2024"`、添付ファイル名に使用）
    pub period_label:  String,
}

/// 配信モード（リクエストで指定される値）
///
/// `"weekly"` / `"monthly"` のほか、先頭大文字の `"Weekly"` / `"Monthly"` も受け付ける。
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    #[serde(alias = "Weekly")]
    Weekly,
    #[serde(alias = "Monthly")]
    Monthly,
}

/// 配信種別
///
/// 配信モードとカスタム本文の有無を組み合わせた結果。
/// テンプレートの選択はこの型に対して網羅的に行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchKind {
    /// 週次配信（既定テンプレート）
    Weekly,
    /// 月次配信（カスタム本文なし、既定テンプレート）
    MonthlyDefault,
    /// 月次配信（カスタム本文あり）
    MonthlyCustom(CustomContent),
}

impl BatchKind {
    /// 配信モードとカスタム本文から配信種別を決定する
    ///
    /// 週次配信ではカスタム本文を無視する。
    pub fn resolve(mode: DispatchMode, custom: Option<CustomContent>) -> Self {
        match (mode, custom) {
            (DispatchMode::Weekly, _) => Self::Weekly,
            (DispatchMode::Monthly, None) => Self::MonthlyDefault,
            (DispatchMode::Monthly, Some(content)) => Self::MonthlyCustom(content),
        }
    }

    pub fn mode(&self) -> DispatchMode {
        match self {
            Self::Weekly => DispatchMode::Weekly,
            Self::MonthlyDefault | Self::MonthlyCustom(_) => DispatchMode::Monthly,
        }
    }
}

/// 配信期間
///
/// 開始日と、その 6 日後の終了日（両端を含む 7 日間）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanningPeriod {
    start: NaiveDate,
    end:   NaiveDate,
}

impl PlanningPeriod {
    /// 開始日から終了日までの日数
    pub const SPAN_DAYS: u64 = 6;

    /// 開始日から 1 週間の期間を作成する
    pub fn week_starting(start: NaiveDate) -> Result<Self, DomainError> {
        let end = start
            .checked_add_days(Days::new(Self::SPAN_DAYS))
            .ok_or_else(|| {
                DomainError::Validation(format!("Date de début hors limites: {start}"))
            })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// 配信バッチ
///
/// リクエスト 1 件分の検証済み入力。レスポンス生成後に破棄される。
#[derive(Debug, Clone)]
pub struct PlanningBatch {
    document:   Bytes,
    recipients: Vec<Recipient>,
    period:     PlanningPeriod,
    kind:       BatchKind,
}

impl PlanningBatch {
    /// 配信バッチを作成する
    ///
    /// 期間が計算できない場合はバリデーションエラー。
    /// 文書は内容を解釈しないため空でもよい。受信者一覧も空でよい。
    pub fn new(
        document: Bytes,
        recipients: Vec<Recipient>,
        period_start: NaiveDate,
        kind: BatchKind,
    ) -> Result<Self, DomainError> {
        let period = PlanningPeriod::week_starting(period_start)?;

        Ok(Self {
            document,
            recipients,
            period,
            kind,
        })
    }

    pub fn document(&self) -> &Bytes {
        &self.document
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn period(&self) -> PlanningPeriod {
        self.period
    }

    pub fn kind(&self) -> &BatchKind {
        &self.kind
    }

    /// 送信対象の受信者（メールアドレスを持つ受信者）を入力順で返す
    pub fn eligible_recipients(&self) -> impl Iterator<Item = &Recipient> {
        self.recipients
            .iter()
            .filter(|recipient| recipient.deliverable_address().is_some())
    }

    /// バッチの件名・本文・添付ファイル名を導出する
    pub fn template(&self) -> MailTemplate {
        MailTemplate::for_batch(&self.kind, &self.period)
    }
}
