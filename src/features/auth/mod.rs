/// 認証機能のモジュール
pub mod loopback;
pub mod secure_storage;
pub mod service;
pub mod session;

pub use loopback::{parse_magic_link, LoginServer};
pub use secure_storage::{FileTokenStorage, MemoryTokenStorage, SecureStorageKeys, TokenStorage};
pub use service::AuthService;
pub use session::{SessionContext, SessionSnapshot, SessionStatus};
