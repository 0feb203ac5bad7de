//! モジュール/ソースの選択フィルタ
//!
//! パターンは大文字小文字を区別しないワイルドカード（`*` が任意の文字列）で、
//! パスのどこかに現れればマッチとみなします。

use crate::errors::FilterError;
use regex::{Regex, RegexBuilder};

/// 全てにマッチするパターン
pub const MATCH_ALL: &str = "*";

/// フィルタの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub selected_modules: Vec<String>,
    pub excluded_modules: Vec<String>,
    pub selected_sources: Vec<String>,
    pub excluded_sources: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            selected_modules: vec![MATCH_ALL.to_string()],
            excluded_modules: Vec::new(),
            selected_sources: vec![MATCH_ALL.to_string()],
            excluded_sources: Vec::new(),
        }
    }
}

/// ワイルドカードパターン
#[derive(Debug, Clone)]
enum Wildcard {
    /// `*` だけのパターン
    Any,
    Pattern(Regex),
}

impl Wildcard {
    fn new(pattern: &str) -> Result<Self, FilterError> {
        if !pattern.is_empty() && pattern.chars().all(|c| c == '*') {
            return Ok(Wildcard::Any);
        }

        let expr = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        RegexBuilder::new(&expr)
            .case_insensitive(true)
            .build()
            .map(Wildcard::Pattern)
            .map_err(|source| FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    fn is_match(&self, path: &str) -> bool {
        match self {
            Wildcard::Any => true,
            Wildcard::Pattern(regex) => regex.is_match(path),
        }
    }
}

/// 選択パターンと除外パターンの組
#[derive(Debug, Clone)]
struct PatternSet {
    selected: Vec<Wildcard>,
    excluded: Vec<Wildcard>,
}

impl PatternSet {
    fn new(selected: &[String], excluded: &[String]) -> Result<Self, FilterError> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Wildcard::new(p))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Self {
            selected: compile(selected)?,
            excluded: compile(excluded)?,
        })
    }

    fn select_all() -> Self {
        Self {
            selected: vec![Wildcard::Any],
            excluded: Vec::new(),
        }
    }

    fn is_selected(&self, path: &str) -> bool {
        self.selected.iter().any(|w| w.is_match(path))
            && !self.excluded.iter().any(|w| w.is_match(path))
    }
}

/// カバレッジ対象のフィルタ
#[derive(Debug, Clone)]
pub struct CoverageFilter {
    modules: PatternSet,
    sources: PatternSet,
}

impl CoverageFilter {
    /// 設定からフィルタを作成する
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        Ok(Self {
            modules: PatternSet::new(&config.selected_modules, &config.excluded_modules)?,
            sources: PatternSet::new(&config.selected_sources, &config.excluded_sources)?,
        })
    }

    /// 全てを選択するフィルタ
    pub fn select_all() -> Self {
        Self {
            modules: PatternSet::select_all(),
            sources: PatternSet::select_all(),
        }
    }

    /// モジュールがカバレッジ対象かどうか
    pub fn is_module_selected(&self, path: &str) -> bool {
        self.modules.is_selected(path)
    }

    /// ソースファイルがカバレッジ対象かどうか
    pub fn is_source_selected(&self, path: &str) -> bool {
        self.sources.is_selected(path)
    }
}

impl Default for CoverageFilter {
    fn default() -> Self {
        Self::select_all()
    }
}
