use smart_expense_lib::shared::errors::ErrorSeverity;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match smart_expense_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.severity() {
                ErrorSeverity::High => log::error!("アプリケーションの実行に失敗しました: {e}"),
                ErrorSeverity::Medium => log::warn!("アプリケーションの実行に失敗しました: {e}"),
                ErrorSeverity::Low => log::info!("操作を完了できませんでした: {e}"),
            }
            eprintln!("エラー: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
