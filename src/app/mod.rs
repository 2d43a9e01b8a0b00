/// アプリケーションシェル（画面遷移とコマンド実行）
pub mod backend;
pub mod routes;
pub mod shell;

pub use backend::ExpenseBackend;
pub use routes::{Route, USAGE};
pub use shell::{App, SAVE_ERROR_MESSAGE};
