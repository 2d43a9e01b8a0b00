/// 共有HTTPクライアント
pub mod api_client;

/// 共有設定管理
pub mod config;

/// 共有エラー型とエラーハンドリング
pub mod errors;

/// 共有ユーティリティ関数
pub mod utils;

/// テスト用のバックエンドサーバー
#[cfg(test)]
pub mod test_server;

// 便利な再エクスポート
pub use api_client::ApiClient;
pub use config::{ApiConfig, ClientConfig};
pub use errors::{AppError, AppResult, ErrorSeverity};
