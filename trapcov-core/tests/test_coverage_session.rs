//! アドレス登録からカバレッジレポートまでの通しテスト

use trapcov_core::event::parse_log;
use trapcov_core::{
    AddressError, CoverageRate, CoverageSession, Event, ExecutedAddressManager, SparseMemory,
};

#[test]
fn test_line_executed_by_one_of_two_instructions() {
    let mut manager = ExecutedAddressManager::new();
    manager.begin_module("app.dll");
    manager.register_address(0x1000, "main.cpp", 10, 0x90).unwrap();
    manager.register_address(0x1004, "main.cpp", 20, 0x90).unwrap();
    manager.register_address(0x1008, "main.cpp", 20, 0xCC).unwrap();
    manager.mark_executed(0x1004).unwrap();

    let data = manager.create_coverage_snapshot("scenario");
    let module = data.module("app.dll").expect("module should be reported");
    let file = module.file("main.cpp").expect("file should be reported");

    let lines: Vec<_> = file
        .lines
        .iter()
        .map(|l| (l.line_number, l.has_been_executed))
        .collect();
    assert_eq!(lines, [(10, false), (20, true)]);

    assert_eq!(module.rate, CoverageRate::new(1, 2));
    assert_eq!(module.rate.percentage(), 50.0);
    assert_eq!(data.rate.percentage(), 50.0);
}

#[test]
fn test_duplicate_registration_does_not_touch_line() {
    let mut manager = ExecutedAddressManager::new();
    manager.begin_module("app.dll");
    manager.register_address(0x2000, "a.cpp", 1, 0x90).unwrap();

    let err = manager.register_address(0x2000, "a.cpp", 5, 0x90).unwrap_err();
    assert_eq!(err, AddressError::DuplicateAddress { address: 0x2000 });

    let data = manager.create_coverage_snapshot("duplicate");
    let file = data.module("app.dll").unwrap().file("a.cpp").unwrap();
    assert!(file.line(5).is_none(), "a.cpp:5 must not be created");
    assert_eq!(file.rate.total_lines, 1);
}

#[test]
fn test_every_address_registered_once() {
    let mut manager = ExecutedAddressManager::new();
    manager.begin_module("app.dll");

    let addresses: Vec<u64> = (0..200).map(|i| 0x4000 + i * 3).collect();
    for (i, &addr) in addresses.iter().enumerate() {
        manager
            .register_address(addr, "loop.cpp", (i / 4) as u32 + 1, 0x90)
            .unwrap();
    }
    assert_eq!(manager.address_count(), addresses.len());

    for &addr in &addresses {
        assert!(matches!(
            manager.register_address(addr, "other.cpp", 1, 0x90),
            Err(AddressError::DuplicateAddress { address }) if address == addr
        ));
    }
    assert_eq!(manager.address_count(), addresses.len());
}

#[test]
fn test_line_or_semantics_all_combinations() {
    // 3命令の行について、ヒットの全組み合わせを確認する
    for mask in 0u8..8 {
        let mut manager = ExecutedAddressManager::new();
        manager.begin_module("app.dll");
        for bit in 0..3u64 {
            manager.register_address(0x100 + bit, "x.cpp", 7, 0x90).unwrap();
        }
        for bit in 0..3u64 {
            if mask & (1 << bit) != 0 {
                manager.mark_executed(0x100 + bit).unwrap();
            }
        }

        let data = manager.create_coverage_snapshot("or");
        let executed = data.modules[0].files[0].line(7).unwrap().has_been_executed;
        assert_eq!(executed, mask != 0, "mask = {:03b}", mask);
    }
}

#[test]
fn test_replay_recorded_session() {
    let log = r"
# two modules, one hit in each
module app.exe
break 0x1000 0x55 3 main.cpp
break 0x1010 0x48 4 main.cpp
break 0x1020 0x89 1 util.cpp
module plugin.dll
break 0x8000 0x31 12 plugin.cpp
hit 0x1010
hit 0x8000
hit 0x1010
";
    let events = parse_log(log).unwrap();

    let mut memory = SparseMemory::new();
    for event in &events {
        if let Event::Break { address, original_byte, .. } = event {
            memory.map(*address, *original_byte);
        }
    }

    let mut session = CoverageSession::default();
    for event in &events {
        match event {
            Event::Module(name) => {
                session.on_module_loaded(name);
            }
            Event::Break { address, line, filename, .. } => {
                session
                    .on_instruction_discovered(&mut memory, *address, filename, *line)
                    .unwrap();
            }
            Event::Hit(address) => {
                session.on_breakpoint(&mut memory, *address).unwrap();
            }
        }
    }

    let data = session.snapshot("replay");
    assert_eq!(data.modules.len(), 2);
    assert_eq!(data.module("app.exe").unwrap().rate, CoverageRate::new(1, 3));
    assert_eq!(data.module("plugin.dll").unwrap().rate, CoverageRate::new(1, 1));
    assert_eq!(data.rate, CoverageRate::new(2, 4));

    // ヒットしていない2箇所は INT3 のまま
    assert_eq!(session.armed_count(), 2);
}
