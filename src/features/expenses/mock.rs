/// モックの経費サービス
///
/// バックエンドなしで画面を動かすためのメモリ上の実装。
/// 疑似的な通信遅延は注入可能で、テストでは0にする。
use crate::features::categories::models::{Category, CategoryCatalog};
use crate::features::expenses::models::{Balance, Expense, ExpenseDraft};
use crate::features::expenses::service::ExpenseApi;
use crate::shared::errors::{AppError, AppResult};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// モック経費サービス
pub struct MockExpenseService {
    expenses: Mutex<Vec<Expense>>,
    catalog: CategoryCatalog,
    latency: Duration,
    currency: String,
    last_id: AtomicI64,
}

impl MockExpenseService {
    /// 空のモックサービスを作成する
    ///
    /// # 引数
    /// * `catalog` - 選択可能なカテゴリー
    /// * `latency` - 各操作の疑似遅延
    pub fn new(catalog: CategoryCatalog, latency: Duration) -> Self {
        Self {
            expenses: Mutex::new(Vec::new()),
            catalog,
            latency,
            currency: "ARS".to_string(),
            last_id: AtomicI64::new(0),
        }
    }

    /// サンプルデータ入りのモックサービスを作成する
    pub fn with_sample_data(catalog: CategoryCatalog, latency: Duration) -> Self {
        let service = Self::new(catalog, latency);
        let now = Utc::now();
        let samples = [
            ("Supermercado", 12500, 1, 0),
            ("SUBE", 1800, 2, 1),
            ("Netflix", 4300, 3, 2),
            ("Farmacia", 6200, 4, 4),
        ];

        let seeded: Vec<Expense> = samples
            .iter()
            .map(|(description, amount, category_id, days_ago)| Expense {
                id: service.next_id(),
                description: description.to_string(),
                amount: *amount,
                category: service.catalog.find(*category_id).cloned(),
                date: now - ChronoDuration::days(*days_ago),
            })
            .collect();
        *service.lock_expenses() = seeded;
        service
    }

    /// 通貨コードを指定する
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    fn lock_expenses(&self) -> MutexGuard<'_, Vec<Expense>> {
        self.expenses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 時刻ベースのIDを発行する（単調増加）
    fn next_id(&self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_ms.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now_ms.max(previous + 1)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn find_category(&self, id: i64) -> AppResult<Category> {
        self.catalog
            .find(id)
            .cloned()
            .ok_or_else(|| AppError::validation(format!("カテゴリーが不正です: category_id={id}")))
    }
}

impl ExpenseApi for MockExpenseService {
    async fn list(&self) -> AppResult<Vec<Expense>> {
        self.simulate_latency().await;
        Ok(self.lock_expenses().clone())
    }

    async fn create(&self, draft: &ExpenseDraft) -> AppResult<Expense> {
        let dto = draft.validate(&self.catalog)?;
        self.simulate_latency().await;

        let expense = Expense {
            id: self.next_id(),
            description: dto.description,
            amount: dto.amount,
            category: Some(self.find_category(dto.category_id)?),
            date: Utc::now(),
        };
        self.lock_expenses().insert(0, expense.clone());

        log::debug!("モック経費を作成しました: expense_id={}", expense.id);
        Ok(expense)
    }

    async fn get_balance(&self) -> AppResult<Balance> {
        self.simulate_latency().await;
        Ok(Balance::from_expenses(
            &self.lock_expenses(),
            self.currency.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn service() -> MockExpenseService {
        MockExpenseService::with_sample_data(CategoryCatalog::default(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_create_increases_balance_by_amount() {
        let service = service();
        let before = service.get_balance().await.unwrap().total;

        service
            .create(&ExpenseDraft::new("1000", "Cafe", 1))
            .await
            .unwrap();

        let after = service.get_balance().await.unwrap().total;
        assert_eq!(after, before + 1000);
    }

    #[tokio::test]
    async fn test_balance_equals_sum_of_list() {
        let service = service();
        let expenses = service.list().await.unwrap();
        let balance = service.get_balance().await.unwrap();
        assert_eq!(balance.total, expenses.iter().map(|e| e.amount).sum::<i64>());
        assert_eq!(balance.currency, "ARS");
    }

    #[tokio::test]
    async fn test_created_expense_is_listed_first_with_category() {
        let service = service();
        let created = service
            .create(&ExpenseDraft::new("250", "Kiosco", 1))
            .await
            .unwrap();

        let expenses = service.list().await.unwrap();
        assert_eq!(expenses[0], created);
        assert_eq!(created.category.as_ref().unwrap().name, "Comida");
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let service = MockExpenseService::new(CategoryCatalog::default(), Duration::ZERO);
        let mut ids = Vec::new();
        for _ in 0..20 {
            let expense = service
                .create(&ExpenseDraft::new("1", "x", 1))
                .await
                .unwrap();
            ids.push(expense.id);
        }

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_invalid_draft_is_rejected_without_side_effects() {
        let service = service();
        let before = service.list().await.unwrap().len();

        let result = service.create(&ExpenseDraft::new("abc", "Cafe", 1)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(service.list().await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let service = MockExpenseService::new(CategoryCatalog::default(), Duration::from_millis(50));
        let started = std::time::Instant::now();
        service.list().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
