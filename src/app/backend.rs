use crate::features::expenses::mock::MockExpenseService;
use crate::features::expenses::models::{Balance, Expense, ExpenseDraft};
use crate::features::expenses::service::{ExpenseApi, ExpenseService};
use crate::shared::errors::AppResult;

/// 経費データの取得元（HTTPまたはモック）
pub enum ExpenseBackend {
    Http(ExpenseService),
    Mock(MockExpenseService),
}

impl ExpenseApi for ExpenseBackend {
    async fn list(&self) -> AppResult<Vec<Expense>> {
        match self {
            ExpenseBackend::Http(service) => service.list().await,
            ExpenseBackend::Mock(service) => service.list().await,
        }
    }

    async fn create(&self, draft: &ExpenseDraft) -> AppResult<Expense> {
        match self {
            ExpenseBackend::Http(service) => service.create(draft).await,
            ExpenseBackend::Mock(service) => service.create(draft).await,
        }
    }

    async fn get_balance(&self) -> AppResult<Balance> {
        match self {
            ExpenseBackend::Http(service) => service.get_balance().await,
            ExpenseBackend::Mock(service) => service.get_balance().await,
        }
    }
}
