//! カバレッジセッション
//!
//! デバッグイベントループが駆動するオブジェクトです。フィルタを適用してから
//! アドレスマネージャへ登録し、ヒット時にはトラップを解除します。

use crate::address_manager::ExecutedAddressManager;
use crate::breakpoint::{self, CodeMemory};
use crate::coverage::CoverageData;
use crate::filter::CoverageFilter;
use crate::Result;
use std::collections::HashSet;
use tracing::debug;

/// カバレッジセッション
#[derive(Debug, Default)]
pub struct CoverageSession {
    manager: ExecutedAddressManager,
    filter: CoverageFilter,
    /// 現在のモジュールがフィルタで除外されているか
    skipping_module: bool,
    /// INT3 を書き込み、まだヒットしていないアドレス
    armed: HashSet<u64>,
}

impl CoverageSession {
    /// フィルタを指定してセッションを作成する
    pub fn new(filter: CoverageFilter) -> Self {
        Self {
            manager: ExecutedAddressManager::new(),
            filter,
            skipping_module: false,
            armed: HashSet::new(),
        }
    }

    /// モジュールのロードを処理する
    ///
    /// カバレッジ対象なら true を返します。対象外の場合、次のモジュールまで
    /// 命令の登録をスキップします。
    pub fn on_module_loaded(&mut self, name: &str) -> bool {
        if self.filter.is_module_selected(name) {
            self.manager.begin_module(name);
            self.skipping_module = false;
            true
        } else {
            debug!("Skip module {}", name);
            self.skipping_module = true;
            false
        }
    }

    /// 計装可能な命令を処理する
    ///
    /// ブレークポイントを設置した場合は true、フィルタで除外した場合は false。
    pub fn on_instruction_discovered<M: CodeMemory + ?Sized>(
        &mut self,
        memory: &mut M,
        address: u64,
        filename: &str,
        line_number: u32,
    ) -> Result<bool> {
        if self.skipping_module || !self.filter.is_source_selected(filename) {
            return Ok(false);
        }

        breakpoint::arm(&mut self.manager, memory, address, filename, line_number)?;
        self.armed.insert(address);
        Ok(true)
    }

    /// ブレークポイントのヒットを処理し、復元したバイトを返す
    pub fn on_breakpoint<M: CodeMemory + ?Sized>(
        &mut self,
        memory: &mut M,
        address: u64,
    ) -> Result<u8> {
        let original_byte = breakpoint::disarm(&mut self.manager, memory, address)?;
        self.armed.remove(&address);
        Ok(original_byte)
    }

    /// まだヒットしていないブレークポイントの数
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// カバレッジレポートを作成する
    pub fn snapshot(&self, name: &str) -> CoverageData {
        self.manager.create_coverage_snapshot(name)
    }

    /// アドレスマネージャへの参照を取得
    pub fn manager(&self) -> &ExecutedAddressManager {
        &self.manager
    }
}
