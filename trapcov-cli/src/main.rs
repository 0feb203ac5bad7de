//! trapcov CLI - コマンドラインインターフェース
//!
//! 記録済みのデバッグイベントログを再生し、カバレッジの概要を表示する

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use trapcov_core::event::parse_log;
use trapcov_core::filter::MATCH_ALL;
use trapcov_core::{
    CoverageData, CoverageFilter, CoverageRate, CoverageSession, Event, FilterConfig, SparseMemory,
};

/// trapcov - breakpoint based code coverage
#[derive(Parser)]
#[command(name = "trapcov")]
#[command(version)]
#[command(about = "Line coverage from single-shot breakpoints", long_about = None)]
struct Cli {
    /// Show verbose log
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CoverageCommand,
}

#[derive(Subcommand)]
enum CoverageCommand {
    /// Replay a recorded debug-event log and print its coverage
    Replay {
        /// Path to the event log
        log: PathBuf,

        /// Name of the coverage report
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(clap::Args)]
struct FilterArgs {
    /// The pattern that module's paths should match. Can have multiple occurrences.
    #[arg(long = "modules", default_value = MATCH_ALL)]
    selected_modules: Vec<String>,

    /// The pattern that module's paths should NOT match. Can have multiple occurrences.
    #[arg(long)]
    excluded_modules: Vec<String>,

    /// The pattern that source's paths should match. Can have multiple occurrences.
    #[arg(long = "sources", default_value = MATCH_ALL)]
    selected_sources: Vec<String>,

    /// The pattern that source's paths should NOT match. Can have multiple occurrences.
    #[arg(long)]
    excluded_sources: Vec<String>,
}

impl From<FilterArgs> for FilterConfig {
    fn from(args: FilterArgs) -> Self {
        Self {
            selected_modules: args.selected_modules,
            excluded_modules: args.excluded_modules,
            selected_sources: args.selected_sources,
            excluded_sources: args.excluded_sources,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        CoverageCommand::Replay { log, name, filter } => {
            let name = name.unwrap_or_else(|| log.display().to_string());
            let data = replay(&log, &name, filter.into()).map_err(|e| {
                tracing::error!("Coverage session aborted: {:#}", e);
                e
            })?;
            print_summary(&data);
        }
    }

    Ok(())
}

/// ログ出力を初期化する（RUST_LOG が優先）
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// イベントログを再生してカバレッジを作成する
fn replay(path: &Path, name: &str, config: FilterConfig) -> Result<CoverageData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event log {:?}", path))?;
    let events = parse_log(&text).with_context(|| format!("Invalid event log {:?}", path))?;

    let session = replay_events(events, &config)?;
    Ok(session.snapshot(name))
}

/// イベント列をセッションに流し込む
fn replay_events(events: Vec<Event>, config: &FilterConfig) -> Result<CoverageSession> {
    // 実プロセスの代わりに、記録された元のバイトでメモリを用意する
    let mut memory = SparseMemory::new();
    for event in &events {
        if let Event::Break { address, original_byte, .. } = event {
            memory.map(*address, *original_byte);
        }
    }

    let filter = CoverageFilter::new(config)?;
    let mut session = CoverageSession::new(filter);
    // フィルタで除外したアドレスにはブレークポイントが無いので、ヒットも無視する
    let mut skipped = HashSet::new();

    for event in events {
        match event {
            Event::Module(module) => {
                session.on_module_loaded(&module);
            }
            Event::Break {
                address,
                line,
                filename,
                ..
            } => {
                if session.on_instruction_discovered(&mut memory, address, &filename, line)? {
                    skipped.remove(&address);
                } else {
                    skipped.insert(address);
                }
            }
            Event::Hit(address) => {
                if skipped.contains(&address) && !session.manager().is_registered(address) {
                    continue;
                }
                session.on_breakpoint(&mut memory, address)?;
            }
        }
    }

    tracing::debug!(
        "Replayed {} addresses, {} breakpoints never hit",
        session.manager().address_count(),
        session.armed_count()
    );

    Ok(session)
}

fn format_rate(rate: &CoverageRate) -> String {
    format!(
        "{}/{} ({:.2}%)",
        rate.executed_lines,
        rate.total_lines,
        rate.percentage()
    )
}

/// カバレッジの概要を表示する
fn print_summary(data: &CoverageData) {
    println!("Coverage: {}", data.name);
    println!();

    if data.modules.is_empty() {
        println!("No module selected");
        return;
    }

    for module in &data.modules {
        println!("{}  {}", module.path, format_rate(&module.rate));
        for file in &module.files {
            println!("    {}  {}", file.path, format_rate(&file.rate));
        }
    }

    println!();
    println!("Total: {}", format_rate(&data.rate));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(log: &str) -> Vec<Event> {
        parse_log(log).unwrap()
    }

    #[test]
    fn test_replay_reloaded_address_counts_hit() {
        let config = FilterConfig {
            excluded_modules: vec!["ex.dll".to_string()],
            ..FilterConfig::default()
        };
        let log = "\
module ex.dll
break 0x10 0x90 3 ex.cpp
hit 0x10
module app.exe
break 0x10 0x55 7 main.cpp
hit 0x10
";
        let session = replay_events(events(log), &config).unwrap();
        let data = session.snapshot("reload");

        let line = data.module("app.exe").unwrap().file("main.cpp").unwrap().line(7).unwrap();
        assert!(line.has_been_executed);
        assert_eq!(session.armed_count(), 0);
        assert!(data.module("ex.dll").is_none());
    }

    #[test]
    fn test_replay_ignores_hits_on_filtered_addresses() {
        let config = FilterConfig {
            excluded_sources: vec!["include".to_string()],
            ..FilterConfig::default()
        };
        let log = "\
module app.exe
break 0x20 0x90 1 /usr/include/vector
break 0x21 0x90 2 main.cpp
hit 0x20
";
        let session = replay_events(events(log), &config).unwrap();
        assert_eq!(session.manager().address_count(), 1);
        assert_eq!(session.armed_count(), 1);
    }

    #[test]
    fn test_replay_unknown_hit_aborts() {
        let log = "module app.exe\nbreak 0x20 0x90 1 main.cpp\nhit 0x30\n";
        assert!(replay_events(events(log), &FilterConfig::default()).is_err());
    }

    #[test]
    fn test_filter_defaults() {
        let cli = Cli::try_parse_from(["trapcov", "replay", "session.log"]).unwrap();
        let CoverageCommand::Replay { filter, name, .. } = cli.command;
        assert!(name.is_none());

        let config = FilterConfig::from(filter);
        assert_eq!(config, FilterConfig::default());
    }

    #[test]
    fn test_filter_multiple_occurrences() {
        let cli = Cli::try_parse_from([
            "trapcov",
            "replay",
            "session.log",
            "--modules",
            "app",
            "--modules",
            "plugin",
            "--excluded-sources",
            "vc\\include",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);

        let CoverageCommand::Replay { filter, .. } = cli.command;
        let config = FilterConfig::from(filter);
        assert_eq!(config.selected_modules, ["app", "plugin"]);
        assert_eq!(config.excluded_sources, ["vc\\include"]);
        assert_eq!(config.selected_sources, [MATCH_ALL]);
    }
}
