//! trapcov カバレッジ記録のコア機能
//!
//! このクレートは、ブレークポイント方式のコードカバレッジ計測の中核を提供します。
//! 計装アドレスの登録、ヒットしたアドレスの記録、モジュール/ファイル/行単位の
//! カバレッジレポート生成を行います。

pub mod address_manager;
pub mod breakpoint;
pub mod coverage;
pub mod errors;
pub mod event;
pub mod filter;
pub mod model;
pub mod session;

pub use address_manager::ExecutedAddressManager;
pub use breakpoint::{CodeMemory, SparseMemory, INT3_OPCODE};
pub use coverage::{CoverageData, CoverageRate, FileCoverage, LineCoverage, ModuleCoverage};
pub use errors::{AddressError, EventParseError, FilterError};
pub use event::Event;
pub use filter::{CoverageFilter, FilterConfig};
pub use model::{Instruction, InstructionId, ModuleId};
pub use session::CoverageSession;

/// カバレッジ処理の結果型
pub type Result<T> = anyhow::Result<T>;
