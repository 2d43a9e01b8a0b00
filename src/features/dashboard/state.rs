use crate::features::expenses::models::{Balance, Expense};
use crate::features::expenses::service::ExpenseApi;
use log::{error, info};
use tokio::sync::watch;

/// ダッシュボード読み込み失敗時に表示するメッセージ
pub const LOAD_ERROR_MESSAGE: &str = "データの読み込みに失敗しました";

/// ダッシュボードの表示状態
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    /// 読み込み中
    Loading,
    /// 表示可能
    Ready {
        expenses: Vec<Expense>,
        balance: Balance,
    },
    /// 読み込み失敗
    Error { message: String },
}

impl DashboardState {
    pub fn is_loading(&self) -> bool {
        matches!(self, DashboardState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, DashboardState::Ready { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DashboardState::Error { .. })
    }
}

/// ダッシュボードの状態管理
///
/// 起動のたびに一覧と残高を並行して取得する。どちらかが失敗した時点で
/// 全体を失敗とし、もう一方の取得は破棄する。
pub struct Dashboard<S> {
    source: S,
    state: watch::Sender<DashboardState>,
}

impl<S> Dashboard<S>
where
    S: ExpenseApi,
{
    /// 新しいダッシュボードを作成する（初期状態は読み込み中）
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: watch::channel(DashboardState::Loading).0,
        }
    }

    /// データ取得元
    pub fn source(&self) -> &S {
        &self.source
    }

    /// 現在の状態
    pub fn current(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// 状態の変化を購読する
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// データを取得して状態を更新する
    ///
    /// # 戻り値
    /// 取得後の状態（ReadyまたはError）
    pub async fn activate(&self) -> DashboardState {
        self.state.send_replace(DashboardState::Loading);

        let next = match tokio::try_join!(self.source.list(), self.source.get_balance()) {
            Ok((expenses, balance)) => {
                info!(
                    "ダッシュボードのデータを取得しました: count={}, total={}",
                    expenses.len(),
                    balance.total
                );
                DashboardState::Ready { expenses, balance }
            }
            Err(e) => {
                error!("ダッシュボードのデータ取得に失敗しました: {e}");
                DashboardState::Error {
                    message: LOAD_ERROR_MESSAGE.to_string(),
                }
            }
        };

        self.state.send_replace(next.clone());
        next
    }
}
