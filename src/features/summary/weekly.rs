use crate::features::expenses::models::Expense;
use crate::shared::utils::week_start;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;

/// カテゴリー未設定の経費をまとめる名前
pub const UNCATEGORIZED_NAME: &str = "Sin categoría";
/// カテゴリー未設定の経費の表示色
pub const UNCATEGORIZED_COLOR: &str = "#9CA3AF";

/// カテゴリー別の集計
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub color: String,
    pub total: i64,
    pub count: usize,
}

/// 週次の支出サマリー
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    /// 今週の合計
    pub total_amount: i64,
    /// 今週の件数
    pub total_count: usize,
    /// カテゴリー別の合計（合計の降順）
    pub by_category: Vec<CategoryTotal>,
    /// 週の開始日（dd/mm）
    pub start_date: String,
    /// 先週比の増減率（%）。先週の支出がない場合はNone
    pub trend: Option<f64>,
}

impl WeeklySummary {
    /// 経費一覧から今週のサマリーを計算する
    ///
    /// # 引数
    /// * `expenses` - 経費一覧
    /// * `now` - 基準時刻
    /// * `tz` - ユーザーのタイムゾーン（週の区切りに使う）
    pub fn compute(expenses: &[Expense], now: DateTime<Utc>, tz: Tz) -> Self {
        let start = week_start(now, tz);
        let previous_start = week_start(start - Duration::days(1), tz);

        let this_week: Vec<&Expense> = expenses
            .iter()
            .filter(|e| e.date >= start && e.date <= now)
            .collect();
        let previous_total: i64 = expenses
            .iter()
            .filter(|e| e.date >= previous_start && e.date < start)
            .map(|e| e.amount)
            .sum();

        let total_amount: i64 = this_week.iter().map(|e| e.amount).sum();

        let trend = (previous_total != 0).then(|| {
            let change = (total_amount - previous_total) as f64 / previous_total as f64 * 100.0;
            (change * 10.0).round() / 10.0
        });

        Self {
            total_amount,
            total_count: this_week.len(),
            by_category: group_by_category(&this_week),
            start_date: start.with_timezone(&tz).format("%d/%m").to_string(),
            trend,
        }
    }
}

fn group_by_category(expenses: &[&Expense]) -> Vec<CategoryTotal> {
    let mut groups: HashMap<Option<i64>, CategoryTotal> = HashMap::new();

    for expense in expenses {
        let key = expense.category.as_ref().map(|c| c.id);
        let entry = groups.entry(key).or_insert_with(|| match &expense.category {
            Some(category) => CategoryTotal {
                name: category.name.clone(),
                color: category.color.clone(),
                total: 0,
                count: 0,
            },
            None => CategoryTotal {
                name: UNCATEGORIZED_NAME.to_string(),
                color: UNCATEGORIZED_COLOR.to_string(),
                total: 0,
                count: 0,
            },
        });
        entry.total += expense.amount;
        entry.count += 1;
    }

    let mut totals: Vec<CategoryTotal> = groups.into_values().collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::models::Category;
    use chrono::TimeZone;

    const TZ: Tz = chrono_tz::America::Argentina::Buenos_Aires;

    fn expense(id: i64, amount: i64, category: Option<Category>, date: DateTime<Utc>) -> Expense {
        Expense {
            id,
            description: format!("gasto {id}"),
            amount,
            category,
            date,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_compute_current_week() {
        let comida = Category::new(1, "Comida", "#FFF");
        let transporte = Category::new(2, "Transporte", "#FEF");
        // 基準: 2026-02-19（木）、週の開始は02-16 03:00 UTC
        let now = at(19, 15);
        let expenses = vec![
            expense(1, 1000, Some(comida.clone()), at(16, 12)),
            expense(2, 3000, Some(transporte.clone()), at(17, 12)),
            expense(3, 500, Some(comida.clone()), at(19, 10)),
            expense(4, 200, None, at(18, 10)),
            // 先週
            expense(5, 2000, Some(comida.clone()), at(12, 12)),
            // 週の開始直前（現地では日曜23:00）
            expense(6, 2350, Some(transporte.clone()), at(16, 2)),
            // 未来の経費は含めない
            expense(7, 9999, None, at(20, 10)),
        ];

        let summary = WeeklySummary::compute(&expenses, now, TZ);

        assert_eq!(summary.total_amount, 4700);
        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.start_date, "16/02");
        assert_eq!(
            summary.by_category,
            vec![
                CategoryTotal {
                    name: "Transporte".to_string(),
                    color: "#FEF".to_string(),
                    total: 3000,
                    count: 1,
                },
                CategoryTotal {
                    name: "Comida".to_string(),
                    color: "#FFF".to_string(),
                    total: 1500,
                    count: 2,
                },
                CategoryTotal {
                    name: UNCATEGORIZED_NAME.to_string(),
                    color: UNCATEGORIZED_COLOR.to_string(),
                    total: 200,
                    count: 1,
                },
            ]
        );
        // 先週4350 → 今週4700
        assert_eq!(summary.trend, Some(8.0));
    }

    #[test]
    fn test_compute_without_previous_week() {
        let now = at(19, 15);
        let expenses = vec![expense(1, 1000, None, at(17, 12))];

        let summary = WeeklySummary::compute(&expenses, now, TZ);
        assert_eq!(summary.total_amount, 1000);
        assert!(summary.trend.is_none());
    }

    #[test]
    fn test_compute_empty() {
        let summary = WeeklySummary::compute(&[], at(19, 15), TZ);
        assert_eq!(summary.total_amount, 0);
        assert_eq!(summary.total_count, 0);
        assert!(summary.by_category.is_empty());
        assert!(summary.trend.is_none());
    }
}
