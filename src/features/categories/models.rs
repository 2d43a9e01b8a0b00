use serde::{Deserialize, Serialize};

/// カテゴリーデータモデル
///
/// バックエンドが所有する参照データ。経費の作成時はIDのみで参照し、
/// 読み取り時は経費に埋め込まれて返ってくる。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
        }
    }
}

/// 利用可能なカテゴリーの一覧
///
/// 経費作成前のバリデーションに使う。
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(vec![
            Category::new(1, "Comida", "#FFF"),
            Category::new(2, "Transporte", "#FEF"),
            Category::new(3, "Suscripciones", "#EFE"),
            Category::new(4, "Salud", "#AFF"),
        ])
    }
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// IDでカテゴリーを検索する
    pub fn find(&self, id: i64) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// 全カテゴリー
    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
