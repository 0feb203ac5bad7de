//! ブレークポイントの設置と解除
//!
//! 計装アドレスの命令を INT3 で置き換え、最初のヒットで元のバイトに戻します
//! （一度きりのトラップ）。

use crate::address_manager::ExecutedAddressManager;
use crate::Result;
use anyhow::Context;
use std::collections::HashMap;
use tracing::debug;

/// INT3命令のオペコード
pub const INT3_OPCODE: u8 = 0xCC;

/// デバッグ対象のコード領域へのアクセス
pub trait CodeMemory {
    /// 1バイト読み込む
    fn read_u8(&self, address: u64) -> Result<u8>;

    /// 1バイト書き込む
    fn write_u8(&mut self, address: u64, value: u8) -> Result<()>;
}

/// アドレス→バイトの疎なメモリ
///
/// 記録済みセッションの再生やテストで、実プロセスの代わりに使います。
#[derive(Debug, Clone, Default)]
pub struct SparseMemory {
    bytes: HashMap<u64, u8>,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// バイトを配置する
    pub fn map(&mut self, address: u64, value: u8) {
        self.bytes.insert(address, value);
    }
}

impl CodeMemory for SparseMemory {
    fn read_u8(&self, address: u64) -> Result<u8> {
        self.bytes
            .get(&address)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Address 0x{:x} is not mapped", address))
    }

    fn write_u8(&mut self, address: u64, value: u8) -> Result<()> {
        match self.bytes.get_mut(&address) {
            Some(byte) => {
                *byte = value;
                Ok(())
            }
            None => Err(anyhow::anyhow!("Address 0x{:x} is not mapped", address)),
        }
    }
}

/// ブレークポイントを設置する
///
/// 元のバイトを読み込んで登録してから INT3 を書き込みます。
/// 登録に失敗した場合はメモリを変更しません。
pub fn arm<M: CodeMemory + ?Sized>(
    manager: &mut ExecutedAddressManager,
    memory: &mut M,
    address: u64,
    filename: &str,
    line_number: u32,
) -> Result<()> {
    let original_byte = memory
        .read_u8(address)
        .with_context(|| format!("Failed to read original byte at 0x{:x}", address))?;

    manager.register_address(address, filename, line_number, original_byte)?;

    memory
        .write_u8(address, INT3_OPCODE)
        .with_context(|| format!("Failed to write breakpoint at 0x{:x}", address))?;
    Ok(())
}

/// ヒットしたブレークポイントを記録し、元のバイトに戻す
pub fn disarm<M: CodeMemory + ?Sized>(
    manager: &mut ExecutedAddressManager,
    memory: &mut M,
    address: u64,
) -> Result<u8> {
    let original_byte = manager.mark_executed(address)?;
    debug!("Breakpoint hit at 0x{:x}", address);

    memory
        .write_u8(address, original_byte)
        .with_context(|| format!("Failed to restore original byte at 0x{:x}", address))?;
    Ok(original_byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AddressError;

    fn setup() -> (ExecutedAddressManager, SparseMemory) {
        let mut manager = ExecutedAddressManager::new();
        manager.begin_module("app.dll");

        let mut memory = SparseMemory::new();
        memory.map(0x1000, 0x55);
        memory.map(0x1001, 0x48);
        (manager, memory)
    }

    #[test]
    fn test_arm_and_disarm() {
        let (mut manager, mut memory) = setup();

        arm(&mut manager, &mut memory, 0x1000, "main.cpp", 3).unwrap();
        assert_eq!(memory.read_u8(0x1000).unwrap(), INT3_OPCODE);
        assert_eq!(manager.instruction(0x1000).unwrap().original_byte(), 0x55);

        assert_eq!(disarm(&mut manager, &mut memory, 0x1000).unwrap(), 0x55);
        assert_eq!(memory.read_u8(0x1000).unwrap(), 0x55);
    }

    #[test]
    fn test_original_byte_equal_to_int3() {
        let (mut manager, mut memory) = setup();
        memory.map(0x2000, INT3_OPCODE);

        arm(&mut manager, &mut memory, 0x2000, "main.cpp", 20).unwrap();
        assert_eq!(manager.instruction(0x2000).unwrap().original_byte(), INT3_OPCODE);

        assert_eq!(disarm(&mut manager, &mut memory, 0x2000).unwrap(), INT3_OPCODE);
        assert_eq!(memory.read_u8(0x2000).unwrap(), INT3_OPCODE);
        assert!(manager.instruction(0x2000).unwrap().has_been_executed());
    }

    #[test]
    fn test_duplicate_arm_leaves_memory() {
        let (mut manager, mut memory) = setup();
        arm(&mut manager, &mut memory, 0x1000, "main.cpp", 3).unwrap();
        disarm(&mut manager, &mut memory, 0x1000).unwrap();

        let err = arm(&mut manager, &mut memory, 0x1000, "main.cpp", 4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AddressError>(),
            Some(&AddressError::DuplicateAddress { address: 0x1000 })
        );
        assert_eq!(memory.read_u8(0x1000).unwrap(), 0x55);
    }

    #[test]
    fn test_arm_unmapped_address() {
        let (mut manager, mut memory) = setup();
        assert!(arm(&mut manager, &mut memory, 0x9999, "main.cpp", 1).is_err());
        assert!(!manager.is_registered(0x9999));
    }

    #[test]
    fn test_disarm_unknown_address() {
        let (mut manager, mut memory) = setup();
        let err = disarm(&mut manager, &mut memory, 0x1001).unwrap_err();
        assert!(err.downcast_ref::<AddressError>().is_some());
        assert_eq!(memory.read_u8(0x1001).unwrap(), 0x48);
    }
}
