/// 経費機能モジュール
///
/// このモジュールは経費に関連するすべての機能を提供します：
/// - 経費・残高のデータモデルと作成フォームの検証
/// - API Server経由の一覧取得・作成・残高取得
/// - バックエンドなしで動作するモック実装
pub mod mock;
pub mod models;
pub mod service;

pub use mock::MockExpenseService;
pub use models::{Balance, CreateExpenseDto, Expense, ExpenseDraft};
pub use service::{ExpenseApi, ExpenseService, BALANCE_ENDPOINT, EXPENSES_ENDPOINT};
