/// API Server経由でのカテゴリー取得
use crate::features::categories::models::{Category, CategoryCatalog};
use crate::shared::api_client::ApiClient;
use crate::shared::errors::AppResult;
use log::info;

/// カテゴリー一覧のエンドポイント
pub const CATEGORIES_ENDPOINT: &str = "/categories/";

/// カテゴリーサービス
#[derive(Clone)]
pub struct CategoryService {
    api_client: ApiClient,
}

impl CategoryService {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    /// カテゴリー一覧を取得する
    pub async fn list(&self) -> AppResult<Vec<Category>> {
        let categories: Vec<Category> = self.api_client.get(CATEGORIES_ENDPOINT).await?;
        info!("カテゴリー一覧取得成功: count={}", categories.len());
        Ok(categories)
    }

    /// サーバーのカテゴリー一覧からカタログを作成する
    pub async fn catalog(&self) -> AppResult<CategoryCatalog> {
        Ok(CategoryCatalog::new(self.list().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::session::SessionContext;
    use crate::shared::config::ApiConfig;
    use crate::shared::errors::AppError;
    use crate::shared::test_server::TestServer;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_categories() {
        let server = TestServer::start().await;
        server.respond(
            "GET",
            "/categories/",
            200,
            r##"[{"id":1,"name":"Comida","color":"#FFF"},{"id":4,"name":"Salud","color":"#AFF"}]"##,
        );

        let client = ApiClient::new(
            ApiConfig::with_base_url(server.base_url()),
            Arc::new(SessionContext::in_memory()),
        )
        .unwrap();
        let service = CategoryService::new(client);

        let catalog = service.catalog().await.unwrap();
        assert_eq!(catalog.all().len(), 2);
        assert_eq!(catalog.find(4).unwrap().name, "Salud");
    }

    #[tokio::test]
    async fn test_list_categories_unauthorized() {
        let server = TestServer::start().await;
        server.respond("GET", "/categories/", 401, r#"{"detail":"Unauthorized"}"#);

        let session = Arc::new(SessionContext::in_memory());
        session.set_token("expired").unwrap();
        let client =
            ApiClient::new(ApiConfig::with_base_url(server.base_url()), Arc::clone(&session))
                .unwrap();

        let result = CategoryService::new(client).list().await;
        assert!(matches!(result, Err(AppError::SessionExpired)));
        assert_eq!(session.get_token(), None);
    }
}
