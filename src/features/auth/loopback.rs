use crate::features::auth::session::validate_token;
use crate::shared::errors::{AppError, AppResult};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use url::Url;

/// マジックリンクのパス
pub const LOGIN_PATH: &str = "/login";

type TokenSender = Arc<Mutex<Option<oneshot::Sender<String>>>>;

/// マジックリンク受信用のループバックHTTPサーバー
pub struct LoginServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl LoginServer {
    /// ループバックアドレスでリッスンを開始する
    ///
    /// # 引数
    /// * `port` - 待ち受けポート（0の場合は空いているポートを自動で使う）
    pub async fn bind(port: u16) -> AppResult<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await?;
        let addr = listener.local_addr()?;
        log::info!("ログイン用ループバックサーバーを開始しました: http://{addr}");
        Ok(Self { listener, addr })
    }

    /// 実際に使用しているポート番号
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// マジックリンクの転送先URL
    pub fn login_url(&self) -> String {
        format!("http://{}{LOGIN_PATH}", self.addr)
    }

    /// マジックリンクのトークンを受信するまで待機する
    ///
    /// # 引数
    /// * `timeout` - 最大待ち時間
    ///
    /// # 戻り値
    /// 受信したトークン、または時間切れの場合はエラー
    pub async fn wait_for_token(self, timeout: Duration) -> AppResult<String> {
        let (sender, receiver) = oneshot::channel();
        let sender: TokenSender = Arc::new(Mutex::new(Some(sender)));

        let listener = self.listener;
        let accept_loop = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let sender = Arc::clone(&sender);
                        tokio::spawn(async move {
                            handle_connection(stream, sender).await;
                        });
                    }
                    Err(e) => {
                        log::error!("接続受け入れエラー: {e}");
                        break;
                    }
                }
            }
        });

        let result = tokio::time::timeout(timeout, receiver).await;
        accept_loop.abort();

        match result {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(_)) => Err(AppError::Network(
                "ログインサーバーが停止しました".to_string(),
            )),
            Err(_) => Err(AppError::Network(format!(
                "ログインがタイムアウトしました（{}秒）",
                timeout.as_secs()
            ))),
        }
    }
}

/// TCP接続を処理する
async fn handle_connection(stream: TcpStream, sender: TokenSender) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| handle_request(req, Arc::clone(&sender)));

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        log::error!("HTTP接続処理エラー: {err}");
    }
}

/// HTTPリクエストを処理する
async fn handle_request(
    req: Request<Incoming>,
    sender: TokenSender,
) -> Result<Response<String>, Infallible> {
    log::debug!(
        "ループバックサーバーがリクエストを受信: {} {}",
        req.method(),
        req.uri().path()
    );

    if req.method() != Method::GET || req.uri().path() != LOGIN_PATH {
        return Ok(html_response(StatusCode::NOT_FOUND, "Not Found".to_string()));
    }

    let token = req.uri().query().and_then(token_from_query);
    let Some(token) = token else {
        log::info!("トークンなしでログインページが開かれました");
        return Ok(html_response(StatusCode::OK, create_instructions_html()));
    };

    if let Err(e) = validate_token(&token) {
        log::warn!("使用できないトークンを受信しました: {e}");
        return Ok(html_response(StatusCode::BAD_REQUEST, create_invalid_token_html()));
    }

    let delivered = sender
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
        .map(|sender| sender.send(token).is_ok())
        .unwrap_or(false);

    if delivered {
        log::info!("マジックリンクのトークンを受信しました");
    } else {
        log::warn!("トークンは既に受信済みです。追加のリクエストを無視します");
    }

    Ok(html_response(StatusCode::OK, create_success_html()))
}

fn html_response(status: StatusCode, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// クエリ文字列からトークンを取り出す（空の場合はNone）
fn token_from_query(query: &str) -> Option<String> {
    let url = Url::parse(&format!("http://localhost/?{query}")).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// マジックリンクのURLからトークンを取り出す
///
/// 絶対URL（`https://host/login?token=...`）とパスのみ（`/login?token=...`）の両方を受け付ける。
///
/// # 引数
/// * `link` - マジックリンク
///
/// # 戻り値
/// トークン、またはトークンが含まれない場合はバリデーションエラー
pub fn parse_magic_link(link: &str) -> AppResult<String> {
    let link = link.trim();
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://localhost/")
            .and_then(|base| base.join(link))
            .map_err(|e| AppError::validation(format!("マジックリンクの形式が不正です: {e}")))?,
        Err(e) => {
            return Err(AppError::validation(format!(
                "マジックリンクの形式が不正です: {e}"
            )))
        }
    };

    url.query()
        .and_then(token_from_query)
        .ok_or_else(|| AppError::validation("マジックリンクにトークンが含まれていません"))
}

/// トークンなしで開かれたときの案内ページ
fn create_instructions_html() -> String {
    r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <title>SmartExpense</title>
</head>
<body style="font-family: sans-serif; text-align: center; padding: 20px;">
    <h1>🔐 SmartExpense</h1>
    <p>Para ingresar, solicita tu Magic Link a nuestro bot de Telegram usando el comando <b>/link</b>.</p>
</body>
</html>"#
        .to_string()
}

/// トークンが使用できないときのページ
fn create_invalid_token_html() -> String {
    r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <title>SmartExpense</title>
</head>
<body style="font-family: sans-serif; text-align: center; padding: 20px;">
    <h1>⚠️ SmartExpense</h1>
    <p>El enlace no es válido. Solicita un nuevo Magic Link al bot de Telegram con el comando <b>/link</b>.</p>
</body>
</html>"#
        .to_string()
}

/// ログイン成功時のページ
fn create_success_html() -> String {
    r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <title>SmartExpense</title>
</head>
<body style="font-family: sans-serif; text-align: center; padding: 20px;">
    <h1>✅ SmartExpense</h1>
    <p>Sesión iniciada. Ya puedes cerrar esta pestaña y volver a la aplicación.</p>
    <script>
        setTimeout(() => {
            window.close();
        }, 3000);
    </script>
</body>
</html>"#
        .to_string()
}
