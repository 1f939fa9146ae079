//! Release-name regex rules and the compiled pattern library.
//!
//! Rules live in the database (most arrive via bulk import from a newznab
//! regex dump) and are compiled once, at library load. Each rule is scoped to
//! a group-name prefix or to `*` for every group, and carries named captures
//! that the subject parser stitches into a release name.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::warn;

use crate::db::{Database, NewRule, RegexRuleRow};
use crate::Result;

/// One compiled rule ready for matching.
pub struct RegexRule {
    /// Database id of the rule
    pub id: i64,
    /// Group-name prefix the rule applies to, or "*" for all groups
    pub group_scope: String,
    /// Evaluation order within a scope
    pub ordinal: i32,
    /// The compiled pattern
    pub regex: Regex,
}

/// All enabled rules, compiled, in evaluation order.
///
/// Scoped rules run before wildcard rules; within each bucket ordinals
/// ascend. Patterns that fail to compile are logged and skipped so one bad
/// import row cannot take down parsing.
pub struct PatternLibrary {
    scoped: Vec<RegexRule>,
    wildcard: Vec<RegexRule>,
}

impl PatternLibrary {
    /// Load and compile the enabled rules from the database
    pub async fn load(db: &Database) -> Result<Self> {
        let rows = db.enabled_rules().await?;
        Ok(Self::from_rules(&rows))
    }

    /// Compile a rule set directly
    pub fn from_rules(rows: &[RegexRuleRow]) -> Self {
        let mut scoped = Vec::new();
        let mut wildcard = Vec::new();

        for row in rows {
            let regex = match regex::RegexBuilder::new(&row.pattern)
                .size_limit(1024 * 1024)
                .case_insensitive(true)
                .build()
            {
                Ok(regex) => regex,
                Err(e) => {
                    warn!(rule_id = row.id, pattern = %row.pattern, "skipping invalid regex rule: {}", e);
                    continue;
                }
            };

            let rule = RegexRule {
                id: row.id,
                group_scope: row.group_scope.clone(),
                ordinal: row.ordinal,
                regex,
            };
            if row.group_scope == "*" {
                wildcard.push(rule);
            } else {
                scoped.push(rule);
            }
        }

        scoped.sort_by_key(|r| (r.ordinal, r.id));
        wildcard.sort_by_key(|r| (r.ordinal, r.id));

        Self { scoped, wildcard }
    }

    /// Number of usable rules
    pub fn len(&self) -> usize {
        self.scoped.len() + self.wildcard.len()
    }

    /// True when no rules compiled
    pub fn is_empty(&self) -> bool {
        self.scoped.is_empty() && self.wildcard.is_empty()
    }

    /// Match a subject against the rules applicable to a group
    ///
    /// Rules scoped to a prefix of the group name run first, then wildcard
    /// rules. The first rule producing at least one non-empty named capture
    /// wins; its captures are returned keyed by capture name. The BTreeMap
    /// keeps capture iteration order stable for name concatenation.
    pub fn match_subject(
        &self,
        group_name: &str,
        subject: &str,
    ) -> Option<BTreeMap<String, String>> {
        let applicable = self
            .scoped
            .iter()
            .filter(|rule| group_name.starts_with(rule.group_scope.as_str()))
            .chain(self.wildcard.iter());

        for rule in applicable {
            if let Some(captures) = rule.regex.captures(subject) {
                let mut named = BTreeMap::new();
                for capture_name in rule.regex.capture_names().flatten() {
                    if let Some(value) = captures.name(capture_name) {
                        let value = value.as_str().trim();
                        if !value.is_empty() {
                            named.insert(capture_name.to_string(), value.to_string());
                        }
                    }
                }
                if !named.is_empty() {
                    return Some(named);
                }
            }
        }

        None
    }
}

/// Parse a newznab-style regex dump into importable rules.
///
/// The dump format is one SQL-ish tuple per line:
/// `(id, 'group.scope', 'pattern', ordinal, status, 'description')`. Lines
/// that do not match the tuple shape are skipped. Rules with non-1 status
/// are imported disabled-by-omission (they are simply dropped, matching how
/// the upstream dumps mark retired rules).
pub fn parse_regex_dump(dump: &str) -> Vec<NewRule> {
    let line_re = match Regex::new(
        r#"^\((?P<id>\d+),\s*'(?P<scope>[^']*)',\s*'(?P<pattern>.*)',\s*(?P<ordinal>\d+),\s*(?P<status>\d+),\s*'(?P<desc>[^']*)'\)"#,
    ) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut rules = Vec::new();
    for line in dump.lines() {
        let line = line.trim();
        let Some(captures) = line_re.captures(line) else {
            continue;
        };
        let status: i32 = captures["status"].parse().unwrap_or(0);
        if status != 1 {
            continue;
        }
        let (Ok(id), Ok(ordinal)) = (captures["id"].parse(), captures["ordinal"].parse()) else {
            continue;
        };
        rules.push(NewRule {
            id,
            group_scope: captures["scope"].replace("\\'", "'"),
            pattern: captures["pattern"].replace("\\'", "'"),
            ordinal,
            description: captures["desc"].replace("\\'", "'"),
        });
    }
    rules
}
