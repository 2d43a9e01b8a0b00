use crate::features::expenses::models::ExpenseDraft;

/// 画面（コマンド）の定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// ダッシュボード（既定）
    Dashboard,
    /// ログイン（マジックリンク指定時はそのまま完了する）
    Login { link: Option<String> },
    /// ログアウト
    Logout,
    /// 経費履歴
    History,
    /// 経費の追加
    AddExpense(ExpenseDraft),
    /// プロフィール
    Profile,
    /// 週次サマリー
    Summary,
    /// カテゴリー一覧
    Categories,
    /// 未定義のコマンド
    NotFound(String),
}

impl Route {
    /// コマンドライン引数から画面を決定する
    ///
    /// # 引数
    /// * `args` - プログラム名を除いた引数
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let Some(command) = args.first() else {
            return Route::Dashboard;
        };

        match (command.as_str(), &args[1..]) {
            ("dashboard" | "home", []) => Route::Dashboard,
            ("login", []) => Route::Login { link: None },
            ("login", [link]) => Route::Login {
                link: Some(link.clone()),
            },
            ("logout", []) => Route::Logout,
            ("history", []) => Route::History,
            ("add", [amount, description, category_id]) => match category_id.trim().parse() {
                Ok(category_id) => {
                    Route::AddExpense(ExpenseDraft::new(amount.as_str(), description.as_str(), category_id))
                }
                Err(_) => Route::NotFound(args.join(" ")),
            },
            ("profile", []) => Route::Profile,
            ("summary", []) => Route::Summary,
            ("categories", []) => Route::Categories,
            _ => Route::NotFound(args.join(" ")),
        }
    }

    /// 画面のパス表記（ログ用）
    pub fn path(&self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Login { .. } => "/login",
            Route::Logout => "/logout",
            Route::History => "/history",
            Route::AddExpense(_) => "/add",
            Route::Profile => "/profile",
            Route::Summary => "/summary",
            Route::Categories => "/categories",
            Route::NotFound(_) => "*",
        }
    }
}

/// 使い方
pub const USAGE: &str = "\
使い方: smart-expense [コマンド]

コマンド:
  dashboard                               今週の支出と最近の経費を表示（既定）
  login [マジックリンク]                  ログイン（リンク省略時はブラウザからの転送を待機）
  logout                                  ログアウト
  history                                 経費の履歴を表示
  add <金額> <説明> <カテゴリーID>        経費を追加
  profile                                 セッションと設定を表示
  summary                                 週次サマリーを表示
  categories                              カテゴリー一覧を表示";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_route_is_dashboard() {
        assert_eq!(Route::parse(Vec::<String>::new()), Route::Dashboard);
        assert_eq!(Route::parse(["dashboard"]), Route::Dashboard);
    }

    #[test]
    fn test_login_routes() {
        assert_eq!(Route::parse(["login"]), Route::Login { link: None });
        assert_eq!(
            Route::parse(["login", "https://app/login?token=x"]),
            Route::Login {
                link: Some("https://app/login?token=x".to_string())
            }
        );
    }

    #[test]
    fn test_add_route() {
        assert_eq!(
            Route::parse(["add", "1000", "Cafe con leche", "1"]),
            Route::AddExpense(ExpenseDraft::new("1000", "Cafe con leche", 1))
        );
        // 金額はここでは検証しない
        assert_eq!(
            Route::parse(["add", "doce", "Cafe", "1"]),
            Route::AddExpense(ExpenseDraft::new("doce", "Cafe", 1))
        );
        assert!(matches!(
            Route::parse(["add", "1000", "Cafe", "comida"]),
            Route::NotFound(_)
        ));
        assert!(matches!(Route::parse(["add", "1000"]), Route::NotFound(_)));
    }

    #[test]
    fn test_unknown_route() {
        assert_eq!(
            Route::parse(["settings", "x"]),
            Route::NotFound("settings x".to_string())
        );
        assert_eq!(Route::parse(["history", "extra"]).path(), "*");
    }

    #[test]
    fn test_simple_routes() {
        assert_eq!(Route::parse(["logout"]), Route::Logout);
        assert_eq!(Route::parse(["history"]), Route::History);
        assert_eq!(Route::parse(["profile"]), Route::Profile);
        assert_eq!(Route::parse(["summary"]), Route::Summary);
        assert_eq!(Route::parse(["categories"]), Route::Categories);
    }
}
