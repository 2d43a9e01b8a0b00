/// カテゴリー機能モジュール
///
/// カテゴリーに関連するモデルとAPIサービスを提供します。
pub mod models;
pub mod service;

pub use models::*;
pub use service::*;
