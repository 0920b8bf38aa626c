//! Level and module statistics over parsed logs
//!
//! Every function here is a pure count over a [`ParsedLogSet`]: the
//! accumulators are local to the call and returned by value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parser::ParsedLogSet;

/// Catch-all bucket name for non-canonical levels
pub const INVALID_LEVEL: &str = "INVALID";

/// Canonical severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Error,
    Info,
    Warn,
    Debug,
}

impl Level {
    /// All canonical levels in report order
    pub const ALL: [Level; 4] = [Level::Error, Level::Info, Level::Warn, Level::Debug];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Debug => "DEBUG",
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    /// Exact, case-sensitive match
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ERROR" => Ok(Level::Error),
            "INFO" => Ok(Level::Info),
            "WARN" => Ok(Level::Warn),
            "DEBUG" => Ok(Level::Debug),
            _ => Err(format!("Not a canonical level: {:?}", s)),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Occurrence count per canonical level plus the INVALID bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct LevelStats {
    pub error: usize,
    pub info: usize,
    pub warn: usize,
    pub debug: usize,
    pub invalid: usize,
}

impl LevelStats {
    /// Count a raw level string
    pub fn record(&mut self, level: &str) {
        match level.parse::<Level>() {
            Ok(Level::Error) => self.error += 1,
            Ok(Level::Info) => self.info += 1,
            Ok(Level::Warn) => self.warn += 1,
            Ok(Level::Debug) => self.debug += 1,
            Err(_) => self.invalid += 1,
        }
    }

    pub fn get(&self, level: Level) -> usize {
        match level {
            Level::Error => self.error,
            Level::Info => self.info,
            Level::Warn => self.warn,
            Level::Debug => self.debug,
        }
    }

    /// Sum of every bucket, INVALID included
    pub fn total(&self) -> usize {
        self.error + self.info + self.warn + self.debug + self.invalid
    }

    /// `(name, count)` pairs in report order, INVALID last
    pub fn entries(&self) -> [(&'static str, usize); 5] {
        [
            ("ERROR", self.error),
            ("INFO", self.info),
            ("WARN", self.warn),
            ("DEBUG", self.debug),
            (INVALID_LEVEL, self.invalid),
        ]
    }
}

/// Module name -> occurrence count
pub type ModuleStats = BTreeMap<String, usize>;

/// Module name -> raw level -> occurrence count
pub type LevelsPerModule = BTreeMap<String, BTreeMap<String, usize>>;

/// Count canonical levels; everything else goes to INVALID
pub fn calculate_stats(logs: &ParsedLogSet) -> LevelStats {
    let mut stats = LevelStats::default();
    for record in logs {
        stats.record(&record.level);
    }
    stats
}

/// Count module occurrences verbatim
pub fn calculate_module_stats(logs: &ParsedLogSet) -> ModuleStats {
    let mut modules = ModuleStats::new();
    for record in logs {
        *modules.entry(record.module.clone()).or_default() += 1;
    }
    modules
}

/// Count `(module, level)` pairs verbatim
pub fn calculate_levels_per_module(logs: &ParsedLogSet) -> LevelsPerModule {
    let mut per_module = LevelsPerModule::new();
    for record in logs {
        *per_module
            .entry(record.module.clone())
            .or_default()
            .entry(record.level.clone())
            .or_default() += 1;
    }
    per_module
}

/// All statistics for one parsed log set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReport {
    /// Number of records the statistics cover
    pub records: usize,
    pub levels: LevelStats,
    pub modules: ModuleStats,
    pub levels_per_module: LevelsPerModule,
}

impl LogReport {
    /// Human-readable report
    ///
    /// Modules are listed by call count (descending, ties by name); the
    /// per-module breakdown is ordered by module, then level count.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        out.push_str("Overall level counts:\n");
        for (name, count) in self.levels.entries() {
            out.push_str(&format!("  {}: {}\n", name, count));
        }

        for level in Level::ALL {
            out.push_str(&format!("{} occured : {}\n", level, self.levels.get(level)));
        }

        if !self.modules.is_empty() {
            out.push_str("\nModule call counts:\n");
            let mut modules: Vec<(&String, &usize)> = self.modules.iter().collect();
            modules.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (module, count) in modules {
                out.push_str(&format!("  {}: {}\n", module, count));
            }
        }

        if !self.levels_per_module.is_empty() {
            out.push_str("\nLevels per module:\n");
            for (module, levels) in &self.levels_per_module {
                out.push_str(&format!("  {}:\n", module));
                let mut levels: Vec<(&String, &usize)> = levels.iter().collect();
                levels.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
                for (level, count) in levels {
                    out.push_str(&format!("    {}: {}\n", level, count));
                }
            }
        }

        out
    }
}

/// Compute level, module and level-per-module statistics in one call
pub fn aggregate(logs: &ParsedLogSet) -> LogReport {
    LogReport {
        records: logs.len(),
        levels: calculate_stats(logs),
        modules: calculate_module_stats(logs),
        levels_per_module: calculate_levels_per_module(logs),
    }
}
