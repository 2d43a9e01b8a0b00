use crate::features::auth::loopback::{parse_magic_link, LoginServer};
use crate::features::auth::session::{SessionContext, SessionStatus};
use crate::shared::config::ClientConfig;
use crate::shared::errors::AppResult;
use std::sync::Arc;
use std::time::Duration;

/// 認証サービス
///
/// マジックリンクによるログインとログアウトを扱う。
/// トークンの保持と失効の通知はSessionContextが担う。
#[derive(Clone)]
pub struct AuthService {
    session: Arc<SessionContext>,
    login_port: u16,
    login_timeout: Duration,
}

impl AuthService {
    /// 新しい認証サービスを作成する
    ///
    /// # 引数
    /// * `session` - セッション
    /// * `login_port` - ループバックサーバーのポート（0は自動）
    /// * `login_timeout` - マジックリンク待機の最大時間
    pub fn new(session: Arc<SessionContext>, login_port: u16, login_timeout: Duration) -> Self {
        Self {
            session,
            login_port,
            login_timeout,
        }
    }

    /// クライアント設定から認証サービスを作成する
    pub fn from_config(session: Arc<SessionContext>, config: &ClientConfig) -> Self {
        Self::new(session, config.login_port, config.login_timeout)
    }

    /// セッション
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// ログイン済みかどうか
    pub fn is_authenticated(&self) -> bool {
        self.session.status() == SessionStatus::Active && self.session.get_token().is_some()
    }

    /// マジックリンクのURLからログインする
    ///
    /// # 引数
    /// * `link` - `/login?token=...` 形式のURL
    ///
    /// # 戻り値
    /// 処理結果。トークンが含まれない場合はバリデーションエラー
    pub fn complete_login(&self, link: &str) -> AppResult<()> {
        let token = parse_magic_link(link)?;
        self.session.set_token(&token)?;
        log::info!("マジックリンクでログインしました");
        Ok(())
    }

    /// ループバックサーバーでマジックリンクを受け取ってログインする
    ///
    /// # 引数
    /// * `on_ready` - 待ち受け開始時に転送先URLを受け取るコールバック
    ///
    /// # 戻り値
    /// 処理結果。時間内にトークンを受信できなかった場合はエラー
    pub async fn login_via_loopback<F>(&self, on_ready: F) -> AppResult<()>
    where
        F: FnOnce(&str),
    {
        let server = LoginServer::bind(self.login_port).await?;
        on_ready(&server.login_url());

        let token = server.wait_for_token(self.login_timeout).await?;
        self.session.set_token(&token)?;
        log::info!("ループバック経由でログインしました");
        Ok(())
    }

    /// ログアウトする（未ログインの場合は何もしない）
    pub fn logout(&self) -> AppResult<()> {
        self.session.clear_token()?;
        log::info!("ログアウト処理が完了しました");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::secure_storage::{FileTokenStorage, TokenStorage};
    use crate::shared::errors::AppError;
    use tempfile::TempDir;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(SessionContext::in_memory()),
            0,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_complete_login_stores_token() {
        let auth = service();
        assert!(!auth.is_authenticated());

        auth.complete_login("https://app.example.com/login?token=jwt-1")
            .unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(auth.session().get_token().as_deref(), Some("jwt-1"));
    }

    #[test]
    fn test_complete_login_without_token_keeps_session() {
        let auth = service();
        auth.complete_login("/login?token=old").unwrap();

        let result = auth.complete_login("/login");
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(auth.session().get_token().as_deref(), Some("old"));
    }

    #[test]
    fn test_login_persists_and_logout_removes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secure.json");
        let storage = Arc::new(FileTokenStorage::new(&path));
        let session = Arc::new(SessionContext::new(storage.clone()).unwrap());
        let auth = AuthService::new(session, 0, Duration::from_secs(5));

        auth.complete_login("/login?token=persisted").unwrap();
        assert_eq!(storage.load_token().unwrap().as_deref(), Some("persisted"));
        assert!(storage.last_login().unwrap().is_some());

        auth.logout().unwrap();
        assert!(storage.load_token().unwrap().is_none());
        assert!(!auth.is_authenticated());

        // 2回目のログアウトも成功する
        auth.logout().unwrap();
    }

    #[tokio::test]
    async fn test_login_via_loopback() {
        let auth = service();
        let (url_tx, url_rx) = tokio::sync::oneshot::channel::<String>();

        let browser = tokio::spawn(async move {
            let url = url_rx.await.unwrap();
            reqwest::get(format!("{url}?token=loopback-jwt"))
                .await
                .unwrap()
                .status()
        });

        auth.login_via_loopback(|url| {
            url_tx.send(url.to_string()).unwrap();
        })
        .await
        .unwrap();

        assert_eq!(browser.await.unwrap(), 200);
        assert_eq!(auth.session().get_token().as_deref(), Some("loopback-jwt"));
    }
}
