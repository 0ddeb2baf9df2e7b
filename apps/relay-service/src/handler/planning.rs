//! # 計画表配信ハンドラ
//!
//! 計画表 PDF を受信者ごとにメール送信するエンドポイント。
//!
//! ## エンドポイント
//!
//! ```text
//! POST /send-planning
//! ```
//!
//! ## リクエスト例
//!
//! ```json
//! {
//!   "pdfBuffer": [37, 80, 68, 70],
//!   "employees": [{ "name": "Alice", "email": "a@x.com" }, { "name": "Bob" }],
//!   "weekStartDate": "2024-06-03",
//!   "mode": "monthly",
//!   "customEmail": { "subject": "Juin", "body": "Bonjour {name}", "periodLabel": "Juin_2024" }
//! }
//! ```
//!
//! `pdfBuffer` はバイト配列、base64 文字列、Node.js の `Buffer` JSON
//! （`{"type": "Buffer", "data": [...]}`）のいずれでもよい。
//!
//! ## レスポンス例
//!
//! ```json
//! [
//!   { "success": true, "employee": { "name": "Alice", "email": "a@x.com" }, "messageId": "<...>" }
//! ]
//! ```

use std::{fmt, sync::Arc};

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate};
use planning_relay_domain::{
    DomainError,
    notification::DispatchOutcome,
    planning::{BatchKind, CustomContent, DispatchMode, PlanningBatch, Recipient},
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor},
};

use crate::{error::RelayError, usecase::PlanningDispatcher};

/// 配信ハンドラの State
pub struct PlanningState {
    pub dispatcher: PlanningDispatcher,
}

// --- リクエスト型 ---

/// 配信リクエスト
///
/// 必須フィールドの欠落は [`SendPlanningRequest::into_batch`] で検出する。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPlanningRequest {
    #[serde(alias = "document")]
    pub pdf_buffer:      Option<DocumentBytes>,
    #[serde(alias = "recipients")]
    pub employees:       Option<Vec<EmployeeDto>>,
    #[serde(alias = "periodStart")]
    pub week_start_date: Option<String>,
    pub mode:            Option<DispatchMode>,
    pub is_monthly:      Option<bool>,
    #[serde(alias = "override")]
    pub custom_email:    Option<CustomEmailDto>,
}

/// 受信者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDto {
    #[serde(default)]
    pub name:  String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// カスタム本文
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEmailDto {
    pub subject:      String,
    #[serde(alias = "bodyTemplate")]
    pub body:         String,
    pub period_label: String,
}

/// 添付文書のバイト列
///
/// 受信時に 1 回だけデコードし、以降は不変のバッファとして扱う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentBytes(pub Bytes);

impl<'de> Deserialize<'de> for DocumentBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DocumentBytesVisitor)
    }
}

struct DocumentBytesVisitor;

impl<'de> Visitor<'de> for DocumentBytesVisitor {
    type Value = DocumentBytes;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a byte array, a base64 string or a serialized Buffer")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(DocumentBytes(Bytes::from(bytes)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        BASE64
            .decode(value.trim())
            .map(|bytes| DocumentBytes(Bytes::from(bytes)))
            .map_err(|e| E::custom(format!("invalid base64 document: {e}")))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut data = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "data" {
                data = Some(map.next_value::<DocumentBytes>()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        data.ok_or_else(|| de::Error::missing_field("data"))
    }
}

impl SendPlanningRequest {
    /// リクエストを検証し、配信バッチに変換する
    ///
    /// `pdfBuffer`、`employees`、`weekStartDate` のいずれかが欠落している場合は
    /// 欠落したフィールドをすべて列挙したバリデーションエラーを返す。
    pub fn into_batch(self) -> Result<PlanningBatch, DomainError> {
        let week_start_date = self
            .week_start_date
            .filter(|value| !value.trim().is_empty());

        let mut missing = Vec::new();
        if self.pdf_buffer.is_none() {
            missing.push("pdfBuffer");
        }
        if self.employees.is_none() {
            missing.push("employees");
        }
        if week_start_date.is_none() {
            missing.push("weekStartDate");
        }

        let (Some(DocumentBytes(document)), Some(employees), Some(week_start_date)) =
            (self.pdf_buffer, self.employees, week_start_date)
        else {
            return Err(DomainError::missing_fields(&missing));
        };

        let period_start = parse_period_start(&week_start_date)?;
        let mode = match (self.mode, self.is_monthly) {
            (Some(mode), _) => mode,
            (None, Some(true)) => DispatchMode::Monthly,
            (None, _) => DispatchMode::Weekly,
        };
        let custom = self.custom_email.map(|custom| CustomContent {
            subject:       custom.subject,
            body_template: custom.body,
            period_label:  custom.period_label,
        });
        let recipients = employees
            .into_iter()
            .map(|employee| Recipient::new(employee.name, employee.email))
            .collect();

        PlanningBatch::new(
            document,
            recipients,
            period_start,
            BatchKind::resolve(mode, custom),
        )
    }
}

/// 期間開始日を解釈する
///
/// `YYYY-MM-DD` または RFC 3339 の日時（日付部分を使用）を受け付ける。
fn parse_period_start(value: &str) -> Result<NaiveDate, DomainError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|datetime| datetime.date_naive()))
        .map_err(|_| DomainError::Validation(format!("Date de début invalide: {value}")))
}

// --- レスポンス型 ---

/// 受信者ごとの配信結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcomeDto {
    pub success:    bool,
    pub employee:   EmployeeDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:      Option<String>,
}

impl From<DispatchOutcome> for DispatchOutcomeDto {
    fn from(outcome: DispatchOutcome) -> Self {
        Self {
            success:    outcome.is_success(),
            message_id: outcome.message_id().map(|id| id.as_str().to_string()),
            error:      outcome.error_message().map(str::to_string),
            employee:   EmployeeDto {
                name:  outcome.recipient.name,
                email: outcome.recipient.email,
            },
        }
    }
}

// --- ハンドラ ---

/// POST /send-planning
///
/// 計画表を受信者ごとに送信し、受信者ごとの配信結果を返す。
/// 検証に失敗した場合は送信を一件も行わずに 500 を返す。
#[tracing::instrument(skip_all)]
pub async fn send_planning(
    State(state): State<Arc<PlanningState>>,
    payload: Result<Json<SendPlanningRequest>, JsonRejection>,
) -> Result<Json<Vec<DispatchOutcomeDto>>, RelayError> {
    tracing::info!("計画表の配信リクエストを受信");
    let Json(request) = payload.map_err(|e| RelayError::InvalidBody(e.body_text()))?;

    tracing::info!(
        request.document_len = request.pdf_buffer.as_ref().map(|document| document.0.len()),
        request.recipients = request.employees.as_ref().map(Vec::len),
        request.eligible = request.employees.as_ref().map(|employees| {
            employees
                .iter()
                .filter(|employee| {
                    employee
                        .email
                        .as_deref()
                        .is_some_and(|email| !email.is_empty())
                })
                .count()
        }),
        request.week_start_date = request.week_start_date.as_deref(),
        "受信データ"
    );

    let batch = request.into_batch()?;
    tracing::info!(
        period.start = %batch.period().start(),
        period.end = %batch.period().end(),
        "配信期間"
    );

    let outcomes = state.dispatcher.dispatch(&batch).await;

    Ok(Json(
        outcomes.into_iter().map(DispatchOutcomeDto::from).collect(),
    ))
}
