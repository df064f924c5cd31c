//! Semantic change extraction.
//!
//! This is a heuristic layer, not a parser. Each [`Rule`] is a named regular
//! expression applied to one diff line at a time; whatever it captures lands in
//! a fixed field of [`FileChangeAnalysis`]. The rules target JavaScript-style
//! sources (`function foo`, `const foo = (`, `router.get('/x'`) and will both
//! miss constructs and report false positives in other languages. They never
//! fail: text that matches nothing simply contributes nothing.
//!
//! Callers depend on the [`ChangeAnalyzer`] trait, so a different rule set
//! can replace [`LexicalAnalyzer`] without touching the pipeline.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::diff::FileDiff;

/// Derived view of one [`FileDiff`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangeAnalysis {
    pub filename: String,
    pub has_changes: bool,
    pub functions_added: Vec<String>,
    pub functions_removed: Vec<String>,
    /// Names found on both sides of the diff, each listed once.
    pub functions_modified: Vec<String>,
    pub classes_changed: Vec<String>,
    /// `"<router-var>.<method> <path>"`
    pub apis_changed: Vec<String>,
    /// Trimmed source lines carrying a deprecation marker, added side first.
    pub deprecated: Vec<String>,
}

/// Commit-level aggregate. Each list is a log across files, duplicates kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub functions_added: Vec<String>,
    pub functions_removed: Vec<String>,
    pub functions_modified: Vec<String>,
    pub classes_changed: Vec<String>,
    pub apis_changed: Vec<String>,
    pub deprecated: Vec<String>,
    pub modules_affected: Vec<String>,
}

impl ChangeSummary {
    /// Append one file's findings, preserving file order.
    pub fn absorb(&mut self, file: FileChangeAnalysis) {
        if file.has_changes {
            self.modules_affected.push(file.filename);
        }
        self.functions_added.extend(file.functions_added);
        self.functions_removed.extend(file.functions_removed);
        self.functions_modified.extend(file.functions_modified);
        self.classes_changed.extend(file.classes_changed);
        self.apis_changed.extend(file.apis_changed);
        self.deprecated.extend(file.deprecated);
    }

    pub fn is_empty(&self) -> bool {
        self.modules_affected.is_empty()
    }
}

/// Anything able to summarise a commit's diffs.
pub trait ChangeAnalyzer: Send + Sync {
    fn analyze_file(&self, diff: &FileDiff) -> FileChangeAnalysis;

    fn analyze(&self, diffs: &[FileDiff]) -> ChangeSummary {
        diffs
            .iter()
            .map(|diff| self.analyze_file(diff))
            .fold(ChangeSummary::default(), |mut summary, file| {
                summary.absorb(file);
                summary
            })
    }
}

/// What a rule's match is turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Function,
    Class,
    Api,
    Deprecation,
}

/// A named pattern and the field it feeds.
pub struct Rule {
    pub name: &'static str,
    pub kind: RuleKind,
    pub pattern: Regex,
}

impl Rule {
    fn new(name: &'static str, kind: RuleKind, pattern: &str) -> Self {
        Self {
            name,
            kind,
            // Patterns are literals below; failing to compile one is a programming error.
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("rule '{name}': {e}")),
        }
    }

    /// Value recorded for `line`, if the rule matches it.
    fn extract(&self, line: &str) -> Option<String> {
        let caps = self.pattern.captures(line)?;
        match self.kind {
            RuleKind::Function | RuleKind::Class => first_group(&caps),
            RuleKind::Api => Some(format!("{}.{} {}", &caps[1], &caps[2], &caps[3])),
            RuleKind::Deprecation => Some(line.trim().to_string()),
        }
    }
}

fn first_group(caps: &Captures<'_>) -> Option<String> {
    caps.iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// The default rule table.
pub fn default_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Rule::new(
                "function",
                RuleKind::Function,
                r"(?:function\s+(\w+)|const\s+(\w+)\s*=\s*\(|(\w+)\s*=\s*\(.*?\)\s*=>)",
            ),
            Rule::new("class", RuleKind::Class, r"class\s+(\w+)"),
            Rule::new(
                "api",
                RuleKind::Api,
                r#"(router|app)\.(get|post|put|delete|patch)\(\s*['"`]([^'"`]+)"#,
            ),
            Rule::new(
                "deprecation",
                RuleKind::Deprecation,
                r"(?i)(deprecated|remove in next release|legacy|to be removed)",
            ),
        ]
    })
}

/// Regex-table analyzer over added and removed lines.
#[derive(Clone, Copy)]
pub struct LexicalAnalyzer {
    rules: &'static [Rule],
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// One value per line at most: the first rule of `kind` that matches wins.
    fn collect(&self, kind: RuleKind, lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .filter_map(|line| {
                self.rules
                    .iter()
                    .filter(|rule| rule.kind == kind)
                    .find_map(|rule| rule.extract(line))
            })
            .collect()
    }

    fn both_sides(&self, kind: RuleKind, diff: &FileDiff) -> Vec<String> {
        let mut found = self.collect(kind, &diff.added_lines);
        found.extend(self.collect(kind, &diff.removed_lines));
        found
    }
}

impl ChangeAnalyzer for LexicalAnalyzer {
    fn analyze_file(&self, diff: &FileDiff) -> FileChangeAnalysis {
        let functions_added = self.collect(RuleKind::Function, &diff.added_lines);
        let functions_removed = self.collect(RuleKind::Function, &diff.removed_lines);

        // Whole-file presence test: a name that vanishes anywhere and reappears
        // anywhere in the same file counts as modified.
        let mut functions_modified: Vec<String> = Vec::new();
        for name in &functions_added {
            if functions_removed.contains(name) && !functions_modified.contains(name) {
                functions_modified.push(name.clone());
            }
        }

        FileChangeAnalysis {
            filename: diff.filename.clone(),
            has_changes: !diff.added_lines.is_empty() || !diff.removed_lines.is_empty(),
            classes_changed: self.both_sides(RuleKind::Class, diff),
            apis_changed: self.both_sides(RuleKind::Api, diff),
            deprecated: self.both_sides(RuleKind::Deprecation, diff),
            functions_added,
            functions_removed,
            functions_modified,
        }
    }
}

/// Summarise `diffs` with the default rule table.
pub fn analyze(diffs: &[FileDiff]) -> ChangeSummary {
    LexicalAnalyzer::default().analyze(diffs)
}
