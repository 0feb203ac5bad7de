//! エラー型
//!
//! どのエラーもセッション内では回復不能です。呼び出し側はログを出して
//! セッションを終了します。

use thiserror::Error;

/// アドレス管理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// `begin_module` より前に登録が行われた
    #[error("No current module set")]
    NoCurrentModule,

    /// 同じアドレスが二度登録された
    #[error("Address 0x{address:x} is already registered")]
    DuplicateAddress { address: u64 },

    /// 登録されていないアドレスがヒットとして報告された
    #[error("Address 0x{address:x} should be registered first")]
    UnknownAddress { address: u64 },

    /// このマネージャに属さないモジュールハンドル
    #[error("Module handle {module} does not belong to this session")]
    UnknownModule { module: usize },
}

/// フィルタ設定のエラー
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// イベントログのパースエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),

    #[error("Missing {field} in '{event}' event")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<EventParseError>,
    },
}
