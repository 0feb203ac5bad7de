//! カバレッジレポートのデータ構造
//!
//! `ExecutedAddressManager::create_coverage_snapshot` が組み立て、
//! レポート出力側（HTML や Cobertura など）が読み取ります。

use std::ops::AddAssign;

/// 実行済み行数 / 全行数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageRate {
    pub executed_lines: usize,
    pub total_lines: usize,
}

impl CoverageRate {
    pub fn new(executed_lines: usize, total_lines: usize) -> Self {
        Self {
            executed_lines,
            total_lines,
        }
    }

    /// 未実行行数
    pub fn unexecuted_lines(&self) -> usize {
        self.total_lines.saturating_sub(self.executed_lines)
    }

    /// カバレッジ率（0.0〜100.0）
    ///
    /// 行が1つもない場合は 0.0 を返します。
    pub fn percentage(&self) -> f64 {
        if self.total_lines == 0 {
            return 0.0;
        }
        self.executed_lines as f64 * 100.0 / self.total_lines as f64
    }
}

impl AddAssign for CoverageRate {
    fn add_assign(&mut self, other: Self) {
        self.executed_lines += other.executed_lines;
        self.total_lines += other.total_lines;
    }
}

/// 1行分のカバレッジ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCoverage {
    pub line_number: u32,
    pub has_been_executed: bool,
}

/// ファイル単位のカバレッジ
#[derive(Debug, Clone, PartialEq)]
pub struct FileCoverage {
    pub path: String,
    /// 行番号の昇順
    pub lines: Vec<LineCoverage>,
    pub rate: CoverageRate,
}

impl FileCoverage {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
            rate: CoverageRate::default(),
        }
    }

    pub(crate) fn add_line(&mut self, line_number: u32, has_been_executed: bool) {
        debug_assert!(
            self.lines.last().map_or(true, |l| l.line_number < line_number),
            "lines must be added in ascending order"
        );
        self.lines.push(LineCoverage {
            line_number,
            has_been_executed,
        });
    }

    /// 行番号から行カバレッジを探す
    pub fn line(&self, line_number: u32) -> Option<&LineCoverage> {
        self.lines
            .binary_search_by_key(&line_number, |l| l.line_number)
            .ok()
            .map(|i| &self.lines[i])
    }

    fn compute_coverage_rate(&mut self) {
        let executed = self.lines.iter().filter(|l| l.has_been_executed).count();
        self.rate = CoverageRate::new(executed, self.lines.len());
    }
}

/// モジュール単位のカバレッジ
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleCoverage {
    pub path: String,
    pub files: Vec<FileCoverage>,
    pub rate: CoverageRate,
}

impl ModuleCoverage {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            files: Vec::new(),
            rate: CoverageRate::default(),
        }
    }

    pub(crate) fn add_file(&mut self, path: impl Into<String>) -> &mut FileCoverage {
        self.files.push(FileCoverage::new(path));
        let last = self.files.len() - 1;
        &mut self.files[last]
    }

    /// パスからファイルカバレッジを探す
    pub fn file(&self, path: &str) -> Option<&FileCoverage> {
        self.files.iter().find(|f| f.path == path)
    }

    fn compute_coverage_rate(&mut self) {
        let mut rate = CoverageRate::default();
        for file in &mut self.files {
            file.compute_coverage_rate();
            rate += file.rate;
        }
        self.rate = rate;
    }
}

/// セッション全体のカバレッジレポート
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageData {
    pub name: String,
    pub modules: Vec<ModuleCoverage>,
    pub rate: CoverageRate,
}

impl CoverageData {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
            rate: CoverageRate::default(),
        }
    }

    pub(crate) fn add_module(&mut self, path: impl Into<String>) -> &mut ModuleCoverage {
        self.modules.push(ModuleCoverage::new(path));
        let last = self.modules.len() - 1;
        &mut self.modules[last]
    }

    /// パスからモジュールカバレッジを探す（同名が複数あれば最初のもの）
    pub fn module(&self, path: &str) -> Option<&ModuleCoverage> {
        self.modules.iter().find(|m| m.path == path)
    }

    /// ファイル→モジュール→全体の順に集計する
    ///
    /// 全ての行を追加し終えてから呼び出すこと。
    pub(crate) fn compute_coverage_rate(&mut self) {
        let mut rate = CoverageRate::default();
        for module in &mut self.modules {
            module.compute_coverage_rate();
            rate += module.rate;
        }
        self.rate = rate;
    }
}
