//! モジュール/ファイル/行/命令のデータモデル
//!
//! 命令レコードは `ExecutedAddressManager` のアリーナに格納され、
//! 行はそのハンドル（`InstructionId`）だけを保持します。
//! アリーナは追加のみなので、一度払い出したハンドルはセッション中ずっと有効です。

use std::collections::BTreeMap;

/// 命令アリーナ内のハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionId(pub(crate) usize);

impl InstructionId {
    /// アリーナ内のインデックス
    pub fn index(self) -> usize {
        self.0
    }
}

/// モジュールのハンドル（`begin_module` の戻り値）
///
/// 発行元のマネージャの識別子を持ち、他のマネージャでは使えません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    pub(crate) session: usize,
    pub(crate) index: usize,
}

impl ModuleId {
    /// 登録順のインデックス
    pub fn index(self) -> usize {
        self.index
    }
}

/// 計装された1命令（ブレークポイント1箇所）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    original_byte: u8,
    executed: bool,
}

impl Instruction {
    pub(crate) fn new(original_byte: u8) -> Self {
        Self {
            original_byte,
            executed: false,
        }
    }

    /// ブレークポイントで置き換える前の元のバイト
    pub fn original_byte(&self) -> u8 {
        self.original_byte
    }

    /// 実行済みかどうか
    pub fn has_been_executed(&self) -> bool {
        self.executed
    }

    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
    }
}

/// ソース1行分の命令ハンドル（登録順）
#[derive(Debug, Default)]
pub(crate) struct Line {
    pub(crate) instructions: Vec<InstructionId>,
}

impl Line {
    /// いずれかの命令が実行されていれば true
    pub(crate) fn has_been_executed(&self, arena: &[Instruction]) -> bool {
        self.instructions
            .iter()
            .any(|id| arena[id.0].has_been_executed())
    }
}

/// ソースファイル（行番号の昇順）
#[derive(Debug, Default)]
pub(crate) struct File {
    pub(crate) lines: BTreeMap<u32, Line>,
}

/// ロードされたモジュール
#[derive(Debug)]
pub(crate) struct Module {
    pub(crate) name: String,
    pub(crate) files: BTreeMap<String, File>,
}

impl Module {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }
}
