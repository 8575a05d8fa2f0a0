//! Rewrite rules: glob compilation and first-match-wins selection.
//!
//! Rules are compiled once when a hosting server starts and are immutable
//! afterwards, so evaluating the same request against the same site always
//! selects the same rule regardless of concurrent traffic.

use regex::Regex;

use crate::config::{RewriteRuleConfig, RewriteTargetConfig};
use crate::error::SuiteError;

/// A compiled rewrite rule.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    /// The original glob, kept for logs.
    pub source: String,
    pattern: Regex,
    pub target: RewriteTargetConfig,
}

impl RewriteRule {
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

/// Compiles the site's rewrite list, preserving order.
///
/// # Errors
///
/// Returns [`SuiteError::Config`] when a glob does not compile.
pub fn compile_rules(configs: &[RewriteRuleConfig]) -> Result<Vec<RewriteRule>, SuiteError> {
    configs
        .iter()
        .map(|cfg| {
            let pattern = compile_glob(&cfg.source).map_err(|err| {
                SuiteError::Config(format!("invalid rewrite source '{}': {err}", cfg.source))
            })?;
            Ok(RewriteRule {
                source: cfg.source.clone(),
                pattern,
                target: cfg.target.clone(),
            })
        })
        .collect()
}

/// Returns the first rule matching the request path, if any. Evaluation is
/// top to bottom; no match means the caller falls through to static serving.
pub fn resolve<'r>(path: &str, rules: &'r [RewriteRule]) -> Option<&'r RewriteRule> {
    rules.iter().find(|rule| rule.matches(path))
}

/// Translates a path glob into an anchored regex: `**` crosses path
/// segments, `*` and `?` stay within one.
fn compile_glob(glob: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    re.push_str(".*");
                } else {
                    re.push_str("[^/]*");
                }
            }
            '?' => re.push_str("[^/]"),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
}
