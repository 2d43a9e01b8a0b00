/// 汎用APIクライアント
///
/// バックエンドAPIサーバーとの通信を行うクライアント。
/// 認証ヘッダーの付与とレスポンスの分類をここに集約し、
/// 401を受けた場合はセッションを失効させて`SessionExpired`を返す。
use crate::features::auth::session::SessionContext;
use crate::shared::config::environment::ApiConfig;
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// リクエストヘッダーを組み立てる
///
/// # 引数
/// * `token` - ベアラートークン（存在しない場合はNone）
///
/// # 戻り値
/// Content-Typeと、トークンがある場合はAuthorizationを含むヘッダー
pub fn build_headers_for(token: Option<&str>) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            AppError::validation(format!("トークンをヘッダーに設定できません: {e}"))
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// 汎用APIクライアント
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    session: Arc<SessionContext>,
}

impl ApiClient {
    /// 設定とセッションを指定してAPIクライアントを作成
    ///
    /// # 引数
    /// * `config` - API設定
    /// * `session` - セッションコンテキスト
    pub fn new(config: ApiConfig, session: Arc<SessionContext>) -> AppResult<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self {
            client,
            config,
            session,
        })
    }

    /// API設定
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// セッションコンテキスト
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// 現在のセッション状態からリクエストヘッダーを組み立てる
    pub fn build_headers(&self) -> AppResult<HeaderMap> {
        build_headers_for(self.session.snapshot().token.as_deref())
    }

    /// GETリクエストを送信
    pub async fn get<T>(&self, endpoint: &str) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        info!("GETリクエスト送信: endpoint={endpoint}");

        let url = self.config.endpoint_url(endpoint);
        self.send(self.client.get(&url), "GET", endpoint).await
    }

    /// POSTリクエストを送信
    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> AppResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        info!("POSTリクエスト送信: endpoint={endpoint}");

        let url = self.config.endpoint_url(endpoint);
        self.send(self.client.post(&url).json(body), "POST", endpoint)
            .await
    }

    /// リクエストを送信してレスポンスを処理する
    ///
    /// リトライは行わない。
    async fn send<T>(&self, request: RequestBuilder, method: &str, endpoint: &str) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let snapshot = self.session.snapshot();
        let headers = build_headers_for(snapshot.token.as_deref())?;

        let response = request.headers(headers).send().await.map_err(|e| {
            warn!("{method}リクエスト送信失敗: endpoint={endpoint}, error={e}");
            AppError::Network(format!("APIサーバーへの接続に失敗しました: {e}"))
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            AppError::Network(format!("レスポンスの読み取りに失敗しました: {e}"))
        })?;

        let result = self.handle_response(status, &body, snapshot.generation);
        if result.is_ok() {
            info!("{method}リクエスト成功: endpoint={endpoint}");
        }
        result
    }

    /// レスポンスを分類し、成功時はボディを解析する
    ///
    /// # 引数
    /// * `status` - HTTPステータス
    /// * `body` - レスポンスボディ
    /// * `generation` - リクエスト送信時のセッション世代
    ///
    /// # 戻り値
    /// - 401: セッションを失効させて`SessionExpired`
    /// - その他の非成功ステータス: `Api`（ステータステキストのみ）
    /// - 成功: 宣言された型に解析したボディ
    pub fn handle_response<T>(
        &self,
        status: StatusCode,
        body: &[u8],
        generation: u64,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        if status == StatusCode::UNAUTHORIZED {
            warn!("401 Unauthorized: トークンが失効、または無効です");
            self.session.invalidate(generation);
            return Err(AppError::SessionExpired);
        }

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown Status");
            warn!(
                "APIサーバーエラー: status={}, body={}",
                status.as_u16(),
                String::from_utf8_lossy(body)
            );
            return Err(AppError::Api {
                status: status.as_u16(),
                status_text: status_text.to_string(),
            });
        }

        serde_json::from_slice(body).map_err(|e| {
            debug!("レスポンス解析エラー: body={}", String::from_utf8_lossy(body));
            AppError::InvalidResponse(e.to_string())
        })
    }
}
