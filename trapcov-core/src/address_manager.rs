//! 計装アドレスの管理
//!
//! デバッグイベントループから呼び出され、計装アドレスの登録と
//! ヒットの記録を行い、最後にカバレッジレポートを生成します。

use crate::coverage::CoverageData;
use crate::errors::AddressError;
use crate::model::{Instruction, InstructionId, Module, ModuleId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, trace};

/// マネージャごとの識別子
static NEXT_SESSION: AtomicUsize = AtomicUsize::new(0);

/// 実行済みアドレスマネージャ
///
/// モジュールは登録順に保持されます。最後に `begin_module` されたモジュールが
/// 現在のモジュールで、`register_address` の登録先になります。
#[derive(Debug)]
pub struct ExecutedAddressManager {
    /// `ModuleId` の発行元を判別するための識別子
    session: usize,
    /// モジュール（登録順）
    modules: Vec<Module>,
    /// 命令アリーナ（追加のみ）
    instructions: Vec<Instruction>,
    /// ランタイムアドレス → 命令ハンドル
    address_index: HashMap<u64, InstructionId>,
}

impl Default for ExecutedAddressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutedAddressManager {
    /// 空のマネージャを作成する
    pub fn new() -> Self {
        Self {
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            modules: Vec::new(),
            instructions: Vec::new(),
            address_index: HashMap::new(),
        }
    }

    fn module_id(&self, index: usize) -> ModuleId {
        ModuleId {
            session: self.session,
            index,
        }
    }

    /// 新しいモジュールを追加し、現在のモジュールにする
    pub fn begin_module(&mut self, name: impl Into<String>) -> ModuleId {
        let module = Module::new(name);
        debug!("Begin module {}", module.name);

        self.modules.push(module);
        self.module_id(self.modules.len() - 1)
    }

    /// 現在のモジュールのハンドル
    pub fn current_module(&self) -> Option<ModuleId> {
        self.modules
            .len()
            .checked_sub(1)
            .map(|index| self.module_id(index))
    }

    /// 現在のモジュールにアドレスを登録する
    pub fn register_address(
        &mut self,
        address: u64,
        filename: &str,
        line_number: u32,
        original_byte: u8,
    ) -> Result<InstructionId, AddressError> {
        let module = self.current_module().ok_or(AddressError::NoCurrentModule)?;
        self.register_address_in(module, address, filename, line_number, original_byte)
    }

    /// 指定したモジュールにアドレスを登録する
    ///
    /// 重複チェックはツリーを変更する前に行うため、失敗時にファイルや行が
    /// 作られることはありません。
    pub fn register_address_in(
        &mut self,
        module: ModuleId,
        address: u64,
        filename: &str,
        line_number: u32,
        original_byte: u8,
    ) -> Result<InstructionId, AddressError> {
        if module.session != self.session || module.index >= self.modules.len() {
            return Err(AddressError::UnknownModule {
                module: module.index,
            });
        }

        let id = InstructionId(self.instructions.len());
        match self.address_index.entry(address) {
            Entry::Occupied(_) => return Err(AddressError::DuplicateAddress { address }),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        trace!(
            "RegisterAddress: 0x{:x} for {}:{}",
            address,
            filename,
            line_number
        );

        self.instructions.push(Instruction::new(original_byte));

        let file = self.modules[module.index]
            .files
            .entry(filename.to_owned())
            .or_default();
        file.lines
            .entry(line_number)
            .or_default()
            .instructions
            .push(id);

        Ok(id)
    }

    /// アドレスを実行済みにし、元のバイトを返す
    ///
    /// 何度呼んでも同じ結果になります。
    pub fn mark_executed(&mut self, address: u64) -> Result<u8, AddressError> {
        let id = *self
            .address_index
            .get(&address)
            .ok_or(AddressError::UnknownAddress { address })?;

        let instruction = &mut self.instructions[id.0];
        instruction.mark_executed();
        Ok(instruction.original_byte())
    }

    /// アドレスが登録済みかどうか
    pub fn is_registered(&self, address: u64) -> bool {
        self.address_index.contains_key(&address)
    }

    /// アドレスに対応する命令レコードを取得する
    pub fn instruction(&self, address: u64) -> Option<&Instruction> {
        self.address_index
            .get(&address)
            .map(|id| &self.instructions[id.0])
    }

    /// 登録済みアドレス数
    pub fn address_count(&self) -> usize {
        self.address_index.len()
    }

    /// モジュール数
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// モジュール名を取得する
    pub fn module_name(&self, module: ModuleId) -> Option<&str> {
        if module.session != self.session {
            return None;
        }
        self.modules.get(module.index).map(|m| m.name.as_str())
    }

    /// 現在の状態からカバレッジレポートを作成する
    pub fn create_coverage_snapshot(&self, name: &str) -> CoverageData {
        let mut coverage_data = CoverageData::new(name);

        for module in &self.modules {
            info!("Create coverage report for {}", module.name);
            let module_coverage = coverage_data.add_module(module.name.as_str());

            for (filename, file) in &module.files {
                let file_coverage = module_coverage.add_file(filename.as_str());

                for (&line_number, line) in &file.lines {
                    file_coverage.add_line(line_number, line.has_been_executed(&self.instructions));
                }
            }
        }

        coverage_data.compute_coverage_rate();
        coverage_data
    }
}
