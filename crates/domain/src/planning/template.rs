//! # 件名・本文・添付ファイル名の導出
//!
//! 配信種別と配信期間から、バッチ共通の件名と添付ファイル名、
//! 受信者ごとの本文を導出する。
//!
//! | 配信種別 | 件名 | 本文 | 添付ファイル名 |
//! |---------|------|------|---------------|
//! | `Weekly` / `MonthlyDefault` | `Planning du {開始} au {終了}` | 既定の挨拶文 | `planning_{開始}_{終了}.pdf` |
//! | `MonthlyCustom` | カスタム件名 | カスタム本文（宛名を置換） | `planning_mensuel_{ラベル}.pdf` |
//!
//! 導出はリクエストの内容のみに依存する純粋関数。

use chrono::NaiveDate;

use super::{BatchKind, CustomContent, PlanningPeriod};

/// 本文テンプレート内の宛名プレースホルダ
pub const NAME_PLACEHOLDER: &str = "{name}";

/// 件名・本文・添付ファイル名に使う日付形式（fr-FR の短い日付）
const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// 本文の生成方法
#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyTemplate {
    /// 既定の週次挨拶文
    Weekly { start: String, end: String },
    /// カスタム本文
    Custom(String),
}

/// バッチのメールテンプレート
///
/// 件名と添付ファイル名はバッチ内で共通、本文は受信者ごとに [`Self::body_for`] で生成する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTemplate {
    subject:  String,
    filename: String,
    body:     BodyTemplate,
}

impl MailTemplate {
    /// 配信種別と期間からテンプレートを導出する
    pub fn for_batch(kind: &BatchKind, period: &PlanningPeriod) -> Self {
        match kind {
            BatchKind::Weekly | BatchKind::MonthlyDefault => Self::weekly(period),
            BatchKind::MonthlyCustom(content) => Self::custom(content),
        }
    }

    fn weekly(period: &PlanningPeriod) -> Self {
        let start = display_date(period.start());
        let end = display_date(period.end());

        Self {
            subject:  format!("Planning du {start} au {end}"),
            filename: format!("planning_{start}_{end}.pdf"),
            body:     BodyTemplate::Weekly { start, end },
        }
    }

    fn custom(content: &CustomContent) -> Self {
        Self {
            subject:  content.subject.clone(),
            filename: format!(
                "planning_mensuel_{}.pdf",
                content.period_label.to_lowercase()
            ),
            body:     BodyTemplate::Custom(content.body_template.clone()),
        }
    }

    /// 件名
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// 添付ファイル名
    pub fn attachment_filename(&self) -> &str {
        &self.filename
    }

    /// 受信者名を差し込んだ本文を生成する
    pub fn body_for(&self, recipient_name: &str) -> String {
        match &self.body {
            BodyTemplate::Weekly { start, end } => format!(
                "Bonjour {recipient_name},\n\nVeuillez trouver ci-joint votre planning pour la semaine du {start} au {end}.\n\nCordialement,"
            ),
            BodyTemplate::Custom(template) => template.replace(NAME_PLACEHOLDER, recipient_name),
        }
    }
}

fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn june_3rd_period() -> PlanningPeriod {
        PlanningPeriod::week_starting(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()).unwrap()
    }

    fn june_custom() -> CustomContent {
        CustomContent {
            subject:       "Juin".to_string(),
            body_template: "Bonjour {name}, voici juin".to_string(),
            period_label:  "Juin_2024".to_string(),
        }
    }

    #[rstest]
    #[case(BatchKind::Weekly)]
    #[case(BatchKind::MonthlyDefault)]
    fn test_既定テンプレートの件名は期間の両端を含む(#[case] kind: BatchKind) {
        let template = MailTemplate::for_batch(&kind, &june_3rd_period());

        assert_eq!(template.subject(), "Planning du 03/06/2024 au 09/06/2024");
        assert_eq!(
            template.attachment_filename(),
            "planning_03/06/2024_09/06/2024.pdf"
        );
    }

    #[test]
    fn test_既定テンプレートの本文は宛名と期間を含む() {
        let template = MailTemplate::for_batch(&BatchKind::Weekly, &june_3rd_period());

        assert_eq!(
            template.body_for("Alice"),
            "Bonjour Alice,\n\nVeuillez trouver ci-joint votre planning pour la semaine du 03/06/2024 au 09/06/2024.\n\nCordialement,"
        );
    }

    #[test]
    fn test_カスタムテンプレートは件名をそのまま使う() {
        let template =
            MailTemplate::for_batch(&BatchKind::MonthlyCustom(june_custom()), &june_3rd_period());

        assert_eq!(template.subject(), "Juin");
        assert_eq!(
            template.attachment_filename(),
            "planning_mensuel_juin_2024.pdf"
        );
        assert_eq!(template.body_for("Alice"), "Bonjour Alice, voici juin");
    }

    #[test]
    fn test_カスタム本文は宛名のみを置換する() {
        let content = CustomContent {
            body_template: "{name} / {name} / {period}".to_string(),
            ..june_custom()
        };
        let template =
            MailTemplate::for_batch(&BatchKind::MonthlyCustom(content), &june_3rd_period());

        assert_eq!(template.body_for("Bob"), "Bob / Bob / {period}");
    }

    #[test]
    fn test_同じ入力からは同じテンプレートが導出される() {
        let kind = BatchKind::MonthlyCustom(june_custom());

        let first = MailTemplate::for_batch(&kind, &june_3rd_period());
        let second = MailTemplate::for_batch(&kind, &june_3rd_period());

        assert_eq!(first, second);
        assert_eq!(first.body_for("Alice"), second.body_for("Alice"));
    }
}
