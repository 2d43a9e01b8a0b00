/// 週次サマリー機能のモジュール
pub mod weekly;

pub use weekly::{CategoryTotal, WeeklySummary, UNCATEGORIZED_COLOR, UNCATEGORIZED_NAME};
