//! アプリケーションシェル
//!
//! 画面遷移はここだけで扱う。データ層はセッション切れをエラーとして返し、
//! シェルがログイン画面へ振り分ける。
use crate::app::backend::ExpenseBackend;
use crate::app::routes::{Route, USAGE};
use crate::features::auth::secure_storage::{FileTokenStorage, TokenStorage};
use crate::features::auth::service::AuthService;
use crate::features::auth::session::{SessionContext, SessionStatus};
use crate::features::categories::models::{Category, CategoryCatalog};
use crate::features::categories::service::CategoryService;
use crate::features::dashboard::state::{Dashboard, DashboardState};
use crate::features::expenses::mock::MockExpenseService;
use crate::features::expenses::models::{Balance, Expense, ExpenseDraft};
use crate::features::expenses::service::{ExpenseApi, ExpenseService};
use crate::features::summary::weekly::WeeklySummary;
use crate::shared::api_client::ApiClient;
use crate::shared::config::{get_environment, ClientConfig};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::format_amount;
use chrono::Utc;
use chrono_tz::Tz;
use log::{error, info, warn};
use std::io::Write;
use std::sync::Arc;

/// 経費保存失敗時に表示するメッセージ
pub const SAVE_ERROR_MESSAGE: &str = "経費の保存に失敗しました";

/// ダッシュボードに表示する最近の経費の件数
const RECENT_EXPENSES: usize = 10;

/// 連続した画面遷移の上限
const MAX_REDIRECTS: usize = 3;

/// 画面表示後の遷移
#[derive(Debug, Clone, PartialEq, Eq)]
enum Next {
    Done,
    Redirect(Route),
}

/// アプリケーション
pub struct App {
    config: ClientConfig,
    session: Arc<SessionContext>,
    auth: AuthService,
    dashboard: Dashboard<ExpenseBackend>,
    categories: Option<CategoryService>,
    catalog: CategoryCatalog,
    token_store: Option<Arc<FileTokenStorage>>,
}

impl App {
    /// 設定からアプリケーションを組み立てる（トークンはファイルに保存）
    pub fn from_config(config: ClientConfig) -> AppResult<Self> {
        let storage = match &config.session_store_path {
            Some(path) => FileTokenStorage::new(path),
            None => FileTokenStorage::in_config_dir()?,
        };
        let storage = Arc::new(storage);
        info!("トークンの保存先: {}", storage.path().display());

        let token_storage: Arc<dyn TokenStorage> = storage.clone();
        let session = Arc::new(SessionContext::new(token_storage)?);

        let mut app = Self::with_session(config, session)?;
        app.token_store = Some(storage);
        Ok(app)
    }

    /// 既存のセッションでアプリケーションを組み立てる
    ///
    /// # 引数
    /// * `config` - クライアント設定
    /// * `session` - セッション
    pub fn with_session(config: ClientConfig, session: Arc<SessionContext>) -> AppResult<Self> {
        let catalog = CategoryCatalog::default();

        let (backend, categories) = if config.use_mock_api {
            let mock = MockExpenseService::with_sample_data(catalog.clone(), config.mock_latency)
                .with_currency(config.currency.clone());
            (ExpenseBackend::Mock(mock), None)
        } else {
            let api = config.api.clone().ok_or_else(|| {
                AppError::configuration("API_SERVER_URLが設定されていません")
            })?;
            let client = ApiClient::new(api, Arc::clone(&session))?;
            (
                ExpenseBackend::Http(ExpenseService::new(client.clone(), catalog.clone())),
                Some(CategoryService::new(client)),
            )
        };

        Ok(Self {
            auth: AuthService::from_config(Arc::clone(&session), &config),
            config,
            session,
            dashboard: Dashboard::new(backend),
            categories,
            catalog,
            token_store: None,
        })
    }

    /// セッション
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// 画面を表示する
    ///
    /// セッション切れはログイン画面に、成功した操作は次の画面に遷移する。
    ///
    /// # 引数
    /// * `route` - 表示する画面
    /// * `out` - 出力先
    pub async fn dispatch(&self, route: Route, out: &mut dyn Write) -> AppResult<()> {
        let mut route = route;

        for _ in 0..=MAX_REDIRECTS {
            info!("画面を表示します: {}", route.path());
            match self.render(&route, out).await {
                Ok(Next::Done) => return Ok(()),
                Ok(Next::Redirect(next)) => route = next,
                Err(e) if e.is_session_expired() => {
                    warn!("セッション切れのためログイン画面に遷移します");
                    writeln!(out, "{}", e.user_message())?;
                    route = Route::Login { link: None };
                }
                Err(e) => return Err(e),
            }
        }

        error!("画面遷移が上限に達しました: {}", route.path());
        Err(AppError::validation("画面遷移の回数が上限を超えました"))
    }

    async fn render(&self, route: &Route, out: &mut dyn Write) -> AppResult<Next> {
        match route {
            Route::Dashboard => self.show_dashboard(out).await,
            Route::Login { link } => self.show_login(link.as_deref(), out).await,
            Route::Logout => {
                self.auth.logout()?;
                writeln!(out, "ログアウトしました")?;
                Ok(Next::Done)
            }
            Route::History => self.show_history(out).await,
            Route::AddExpense(draft) => self.add_expense(draft, out).await,
            Route::Profile => self.show_profile(out),
            Route::Summary => self.show_summary(out).await,
            Route::Categories => self.show_categories(out).await,
            Route::NotFound(command) => {
                writeln!(out, "404 - ページが見つかりません: {command}")?;
                writeln!(out, "{USAGE}")?;
                Err(AppError::validation(format!("不明なコマンドです: {command}")))
            }
        }
    }

    async fn show_dashboard(&self, out: &mut dyn Write) -> AppResult<Next> {
        writeln!(out, "読み込み中...")?;

        match self.dashboard.activate().await {
            DashboardState::Ready { expenses, balance } => {
                render_dashboard(out, &expenses, &balance, self.config.user_timezone)?;
                Ok(Next::Done)
            }
            DashboardState::Error { .. } if self.session.status() == SessionStatus::Expired => {
                Err(AppError::SessionExpired)
            }
            DashboardState::Error { message } => {
                writeln!(out, "エラー: {message}")?;
                Ok(Next::Done)
            }
            DashboardState::Loading => Ok(Next::Done),
        }
    }

    async fn show_login(&self, link: Option<&str>, out: &mut dyn Write) -> AppResult<Next> {
        if let Some(link) = link {
            self.auth.complete_login(link)?;
            writeln!(out, "ログインしました")?;
            return Ok(Next::Redirect(Route::Dashboard));
        }

        writeln!(
            out,
            "ログインするには、Telegramのボットに /link コマンドでマジックリンクを依頼してください。"
        )?;
        self.auth
            .login_via_loopback(|url| {
                let shown = writeln!(out, "マジックリンクの転送先で待機しています: {url}")
                    .and_then(|_| out.flush());
                if let Err(e) = shown {
                    warn!("ログイン案内の出力に失敗しました: {e}");
                }
            })
            .await?;

        writeln!(out, "ログインしました")?;
        Ok(Next::Redirect(Route::Dashboard))
    }

    async fn show_history(&self, out: &mut dyn Write) -> AppResult<Next> {
        let expenses = self.dashboard.source().list().await?;

        writeln!(out, "経費履歴（{}件）", expenses.len())?;
        if expenses.is_empty() {
            writeln!(out, "  経費はまだありません")?;
        }
        for expense in &expenses {
            write_expense_line(out, expense, &self.config.currency, self.config.user_timezone)?;
        }
        Ok(Next::Done)
    }

    async fn add_expense(&self, draft: &ExpenseDraft, out: &mut dyn Write) -> AppResult<Next> {
        match self.dashboard.source().create(draft).await {
            Ok(expense) => {
                writeln!(
                    out,
                    "経費を保存しました: {} {}",
                    expense.description,
                    format_amount(expense.amount, &self.config.currency)
                )?;
                Ok(Next::Redirect(Route::Dashboard))
            }
            Err(e) if e.is_session_expired() => Err(e),
            Err(AppError::Validation(message)) => {
                writeln!(out, "入力内容を確認してください: {message}")?;
                Err(AppError::Validation(message))
            }
            Err(e) => {
                error!("経費の保存に失敗しました: {e}");
                writeln!(out, "{SAVE_ERROR_MESSAGE}")?;
                Err(e)
            }
        }
    }

    fn show_profile(&self, out: &mut dyn Write) -> AppResult<Next> {
        let status = match self.session.status() {
            SessionStatus::Active => "ログイン中",
            SessionStatus::Anonymous => "未ログイン",
            SessionStatus::Expired => "期限切れ",
        };
        writeln!(out, "セッション: {status}")?;

        if let Some(store) = &self.token_store {
            let last_login = store.last_login()?;
            writeln!(
                out,
                "最終ログイン: {}",
                last_login.as_deref().unwrap_or("なし")
            )?;
        }

        match (&self.config.api, self.config.use_mock_api) {
            (_, true) => writeln!(out, "接続先: モックAPI")?,
            (Some(api), false) => writeln!(out, "接続先: {}", api.base_url)?,
            (None, false) => writeln!(out, "接続先: 未設定")?,
        }
        writeln!(out, "環境: {:?}", get_environment())?;
        writeln!(out, "タイムゾーン: {}", self.config.user_timezone.name())?;
        writeln!(out, "通貨: {}", self.config.currency)?;
        Ok(Next::Done)
    }

    async fn show_summary(&self, out: &mut dyn Write) -> AppResult<Next> {
        let expenses = self.dashboard.source().list().await?;
        let summary = WeeklySummary::compute(&expenses, Utc::now(), self.config.user_timezone);
        let currency = &self.config.currency;

        writeln!(out, "週次サマリー（{}〜）", summary.start_date)?;
        writeln!(
            out,
            "今週の合計: {}（{}件）",
            format_amount(summary.total_amount, currency),
            summary.total_count
        )?;
        if let Some(trend) = summary.trend {
            writeln!(out, "先週比: {trend:+.1}%")?;
        }
        for category in &summary.by_category {
            writeln!(
                out,
                "  {:<16} {:>12} ({}件)",
                category.name,
                format_amount(category.total, currency),
                category.count
            )?;
        }
        Ok(Next::Done)
    }

    async fn show_categories(&self, out: &mut dyn Write) -> AppResult<Next> {
        let categories: Vec<Category> = match &self.categories {
            Some(service) => service.list().await?,
            None => self.catalog.all().to_vec(),
        };

        writeln!(out, "カテゴリー一覧")?;
        for category in &categories {
            writeln!(out, "  {:>3}  {:<16} {}", category.id, category.name, category.color)?;
        }
        Ok(Next::Done)
    }
}

fn render_dashboard(
    out: &mut dyn Write,
    expenses: &[Expense],
    balance: &Balance,
    tz: Tz,
) -> AppResult<()> {
    writeln!(out, "今週の支出: {}", format_amount(balance.total, &balance.currency))?;
    if let Some(trend) = balance.trend {
        writeln!(out, "先週比: {trend:+.1}%")?;
    }

    writeln!(out, "最近の経費")?;
    if expenses.is_empty() {
        writeln!(out, "  経費はまだありません")?;
    }
    for expense in expenses.iter().take(RECENT_EXPENSES) {
        write_expense_line(out, expense, &balance.currency, tz)?;
    }
    Ok(())
}

fn write_expense_line(
    out: &mut dyn Write,
    expense: &Expense,
    currency: &str,
    tz: Tz,
) -> AppResult<()> {
    let category = expense
        .category
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or("-");
    writeln!(
        out,
        "  {}  {:<24} {:<14} {:>12}",
        expense.date.with_timezone(&tz).format("%d/%m %H:%M"),
        expense.description,
        category,
        format_amount(expense.amount, currency)
    )?;
    Ok(())
}
