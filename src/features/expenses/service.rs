/// API Server経由での経費操作
///
/// 一覧取得・作成・残高取得をHTTPクライアント上に実装します。
use crate::features::categories::models::CategoryCatalog;
use crate::features::expenses::models::{Balance, CreateExpenseDto, Expense, ExpenseDraft};
use crate::shared::api_client::ApiClient;
use crate::shared::errors::{AppError, AppResult};
use log::{info, warn};
use std::future::Future;

/// 経費一覧・作成のエンドポイント
pub const EXPENSES_ENDPOINT: &str = "/expenses/";
/// 残高のエンドポイント
pub const BALANCE_ENDPOINT: &str = "/balance/";

/// 経費データへのアクセスを抽象化するトレイト
///
/// HTTP実装とモック実装があり、ダッシュボードはこのトレイト越しに使う。
pub trait ExpenseApi: Send + Sync {
    /// 経費一覧を取得する
    fn list(&self) -> impl Future<Output = AppResult<Vec<Expense>>> + Send;

    /// 経費を作成する（入力値の検証は送信前に行う）
    fn create(&self, draft: &ExpenseDraft) -> impl Future<Output = AppResult<Expense>> + Send;

    /// 残高を取得する
    fn get_balance(&self) -> impl Future<Output = AppResult<Balance>> + Send;
}

/// HTTP経由の経費サービス
#[derive(Clone)]
pub struct ExpenseService {
    api_client: ApiClient,
    catalog: CategoryCatalog,
}

impl ExpenseService {
    /// 新しい経費サービスを作成する
    ///
    /// # 引数
    /// * `api_client` - APIクライアント
    /// * `catalog` - 作成時のバリデーションに使うカテゴリー
    pub fn new(api_client: ApiClient, catalog: CategoryCatalog) -> Self {
        Self {
            api_client,
            catalog,
        }
    }

    fn list_endpoint(&self) -> String {
        format!(
            "{EXPENSES_ENDPOINT}?limit={}",
            self.api_client.config().list_limit
        )
    }

    /// 残高エンドポイントが使えない場合に一覧から残高を計算する
    async fn compute_balance_from_list(&self) -> AppResult<Balance> {
        let expenses = self.list().await?;
        let balance = Balance::from_expenses(&expenses, self.api_client.config().currency.clone());
        info!(
            "経費一覧から残高を計算しました: total={}, count={}",
            balance.total,
            expenses.len()
        );
        Ok(balance)
    }
}

impl ExpenseApi for ExpenseService {
    async fn list(&self) -> AppResult<Vec<Expense>> {
        let expenses: Vec<Expense> = self.api_client.get(&self.list_endpoint()).await?;
        info!("経費一覧取得成功: count={}", expenses.len());
        Ok(expenses)
    }

    async fn create(&self, draft: &ExpenseDraft) -> AppResult<Expense> {
        let dto: CreateExpenseDto = draft.validate(&self.catalog)?;

        let expense: Expense = self.api_client.post(EXPENSES_ENDPOINT, &dto).await?;
        info!("経費作成成功: expense_id={}", expense.id);
        Ok(expense)
    }

    async fn get_balance(&self) -> AppResult<Balance> {
        match self.api_client.get::<Balance>(BALANCE_ENDPOINT).await {
            Ok(balance) => Ok(balance),
            Err(AppError::Api { status, .. }) if status == 404 || status == 405 => {
                warn!("残高エンドポイントが利用できません（status={status}）。一覧から計算します");
                self.compute_balance_from_list().await
            }
            Err(e) => Err(e),
        }
    }
}
