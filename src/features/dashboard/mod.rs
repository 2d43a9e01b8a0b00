/// ダッシュボード機能モジュール
///
/// 経費一覧と残高を並行取得し、表示状態（読み込み中・表示可能・失敗）を管理します。
pub mod state;


pub use state::{Dashboard, DashboardState, LOAD_ERROR_MESSAGE};
