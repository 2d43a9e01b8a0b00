use crate::features::categories::models::{Category, CategoryCatalog};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{normalize_string, parse_amount_input, validate_description};
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 金額を整数として読み込む
///
/// バックエンドは小数点付きの数値（`4500.0`）で返すことがあるため、
/// 小数部が0の有限な浮動小数点数も受け付ける。
fn deserialize_amount<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integral amount")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
            i64::try_from(value).map_err(|_| E::custom(format!("amount out of range: {value}")))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
            if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                Ok(value as i64)
            } else {
                Err(E::custom(format!("amount is not an integer: {value}")))
            }
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

/// 経費データモデル
///
/// 金額は最小通貨単位の整数。カテゴリーは読み取り時に埋め込まれて返る。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: i64,
    #[serde(default)]
    pub category: Option<Category>,
    pub date: DateTime<Utc>,
}

/// 経費作成用DTO（APIに送信するペイロード）
///
/// カテゴリーはIDのみで参照する。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CreateExpenseDto {
    pub amount: i64,
    pub description: String,
    pub category_id: i64,
}

/// 経費作成フォームの入力値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    /// 入力された金額（未検証）
    pub amount: String,
    /// 説明
    pub description: String,
    /// 選択されたカテゴリーID
    pub category_id: i64,
}

impl ExpenseDraft {
    pub fn new(amount: impl Into<String>, description: impl Into<String>, category_id: i64) -> Self {
        Self {
            amount: amount.into(),
            description: description.into(),
            category_id,
        }
    }

    /// 入力値を検証して作成用DTOに変換する
    ///
    /// # 引数
    /// * `catalog` - 選択可能なカテゴリー
    ///
    /// # 戻り値
    /// 作成用DTO、または入力が不正な場合はバリデーションエラー
    pub fn validate(&self, catalog: &CategoryCatalog) -> AppResult<CreateExpenseDto> {
        let amount = parse_amount_input(&self.amount)?;
        validate_description(&self.description)?;

        if catalog.find(self.category_id).is_none() {
            return Err(AppError::validation(format!(
                "カテゴリーが不正です: category_id={}",
                self.category_id
            )));
        }

        Ok(CreateExpenseDto {
            amount,
            description: normalize_string(&self.description),
            category_id: self.category_id,
        })
    }
}

/// 残高（集計値）
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Balance {
    /// 合計金額
    #[serde(deserialize_with = "deserialize_amount")]
    pub total: i64,
    /// 通貨コード
    pub currency: String,
    /// 前期間比の増減率（%）
    #[serde(default)]
    pub trend: Option<f64>,
}

impl Balance {
    /// 経費一覧から残高を計算する
    pub fn from_expenses(expenses: &[Expense], currency: impl Into<String>) -> Self {
        Self {
            total: expenses.iter().map(|e| e.amount).sum(),
            currency: currency.into(),
            trend: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CategoryCatalog {
        CategoryCatalog::default()
    }

    #[test]
    fn test_expense_deserialization_with_embedded_category() {
        let json = r##"{
            "id": 7,
            "description": "Uber al centro",
            "amount": 4500,
            "category": {"id": 2, "name": "Transporte", "color": "#FEF"},
            "date": "2026-02-19T14:30:00Z"
        }"##;

        let expense: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.id, 7);
        assert_eq!(expense.amount, 4500);
        assert_eq!(expense.category.as_ref().unwrap().name, "Transporte");
        assert_eq!(expense.date.to_rfc3339(), "2026-02-19T14:30:00+00:00");
    }

    #[test]
    fn test_expense_accepts_integral_decimal_amount() {
        let json = r##"{"id": 3, "description": "Uber", "amount": 4500.0,
                        "category": {"id": 2, "name": "Transporte", "color": "#FEF"},
                        "date": "2026-02-19T14:30:00Z"}"##;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.amount, 4500);

        let balance: Balance =
            serde_json::from_str(r#"{"total": 6000.0, "currency": "ARS"}"#).unwrap();
        assert_eq!(balance.total, 6000);
    }

    #[test]
    fn test_expense_rejects_fractional_amount() {
        for amount in ["4500.5", "\"4500\"", "1e300"] {
            let json = format!(
                r#"{{"id": 3, "description": "x", "amount": {amount}, "date": "2026-02-19T14:30:00Z"}}"#
            );
            assert!(serde_json::from_str::<Expense>(&json).is_err(), "amount: {amount}");
        }
    }

    #[test]
    fn test_expense_without_category() {
        let json = r#"{"id": 1, "description": "x", "amount": 1, "category": null,
                       "date": "2026-02-19T14:30:00-03:00"}"#;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert!(expense.category.is_none());
        assert_eq!(expense.date.to_rfc3339(), "2026-02-19T17:30:00+00:00");
    }

    #[test]
    fn test_expense_rejects_string_category() {
        // 旧スキーマ（カテゴリーが文字列）は受け付けない
        let json = r#"{"id": 1, "description": "x", "amount": 1, "category": "Comida",
                       "date": "2026-02-19T14:30:00Z"}"#;
        assert!(serde_json::from_str::<Expense>(json).is_err());
    }

    #[test]
    fn test_create_dto_serializes_category_id_only() {
        let dto = ExpenseDraft::new("1000", "Almuerzo", 1)
            .validate(&catalog())
            .unwrap();
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"amount": 1000, "description": "Almuerzo", "category_id": 1})
        );
    }

    #[test]
    fn test_draft_validation_errors() {
        let catalog = catalog();
        assert!(ExpenseDraft::new("abc", "Almuerzo", 1).validate(&catalog).is_err());
        assert!(ExpenseDraft::new("", "Almuerzo", 1).validate(&catalog).is_err());
        assert!(ExpenseDraft::new("100", "  ", 1).validate(&catalog).is_err());
        assert!(ExpenseDraft::new("100", "Almuerzo", 99).validate(&catalog).is_err());
    }

    #[test]
    fn test_draft_trims_description() {
        let dto = ExpenseDraft::new("100", "  Cafe  ", 1)
            .validate(&catalog())
            .unwrap();
        assert_eq!(dto.description, "Cafe");
    }

    #[test]
    fn test_balance_from_expenses() {
        let expenses = vec![
            Expense {
                id: 1,
                description: "a".to_string(),
                amount: 1500,
                category: None,
                date: Utc::now(),
            },
            Expense {
                id: 2,
                description: "b".to_string(),
                amount: 2500,
                category: None,
                date: Utc::now(),
            },
        ];
        let balance = Balance::from_expenses(&expenses, "ARS");
        assert_eq!(balance.total, 4000);
        assert_eq!(balance.currency, "ARS");
        assert!(balance.trend.is_none());
    }

    #[test]
    fn test_balance_trend_optional() {
        let balance: Balance =
            serde_json::from_str(r#"{"total": 0, "currency": "ARS"}"#).unwrap();
        assert_eq!(balance.total, 0);
        assert!(balance.trend.is_none());

        let balance: Balance =
            serde_json::from_str(r#"{"total": 100, "currency": "ARS", "trend": 12.5}"#).unwrap();
        assert_eq!(balance.trend, Some(12.5));
    }
}
