//! Regex-line quality drivers for raw linter stdout.

use std::collections::BTreeMap;

use regex::Regex;

use super::{QualityDriver, QualityError};
use crate::paths;
use crate::violations::Violation;

/// A driver whose report format is one violation per stdout line, matched by
/// a fixed pattern with `file`, `line` and `message` capture groups.
pub struct RegexDriver {
    name: &'static str,
    extensions: &'static [&'static str],
    command: Option<&'static [&'static str]>,
    pattern: Regex,
}

impl QualityDriver for RegexDriver {
    fn name(&self) -> &str {
        self.name
    }

    fn supported_extensions(&self) -> &[&str] {
        self.extensions
    }

    fn command(&self) -> Option<&[&str]> {
        self.command
    }

    fn parse(&self, report: &str) -> Result<BTreeMap<String, Vec<Violation>>, QualityError> {
        let mut by_file: BTreeMap<String, Vec<Violation>> = BTreeMap::new();

        for line in report.lines() {
            let Some(caps) = self.pattern.captures(line) else {
                continue;
            };
            let (Some(file), Some(line_no)) = (caps.name("file"), caps.name("line")) else {
                continue;
            };
            let Ok(line_no) = line_no.as_str().parse::<u32>() else {
                continue;
            };
            let message = caps
                .name("message")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();

            by_file
                .entry(paths::normalize(file.as_str()))
                .or_default()
                .push(Violation::new(line_no, message));
        }

        Ok(by_file)
    }
}

/// flake8 / pycodestyle output: `path:line:col: CODE message`.
pub fn flake8_driver() -> RegexDriver {
    RegexDriver {
        name: "flake8",
        extensions: &["py"],
        command: Some(&["flake8"]),
        pattern: Regex::new(r"^(?P<file>[^:\s][^:]*):(?P<line>\d+):(?:\d+:)? (?P<message>.*)$")
            .expect("flake8 pattern is valid"),
    }
}

/// eslint compact output: `path: line N, col M, Severity - message (rule)`.
pub fn eslint_driver() -> RegexDriver {
    RegexDriver {
        name: "eslint",
        extensions: &["js", "jsx", "ts", "tsx"],
        command: Some(&["eslint", "--format", "compact"]),
        pattern: Regex::new(r"^(?P<file>[^:\s][^:]*): line (?P<line>\d+), col \d+, (?P<message>.*)$")
            .expect("eslint pattern is valid"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::QualityDriver;

    #[test]
    fn test_flake8_parse() {
        let report = "\
src/app.py:3:1: F401 'os' imported but unused
src/app.py:10:80: E501 line too long (88 > 79 characters)
src/other.py:1:1: E302 expected 2 blank lines
collecting ... done
";
        let by_file = flake8_driver().parse(report).unwrap();
        assert_eq!(by_file.len(), 2);
        assert_eq!(
            by_file["src/app.py"],
            vec![
                Violation::new(3, "F401 'os' imported but unused"),
                Violation::new(10, "E501 line too long (88 > 79 characters)"),
            ]
        );
    }

    #[test]
    fn test_flake8_windows_paths_normalized() {
        let report = "src\\app.py:2:1: E999 SyntaxError\n";
        let by_file = flake8_driver().parse(report).unwrap();
        assert!(by_file.contains_key("src/app.py"));
    }

    #[test]
    fn test_eslint_compact_parse() {
        let report = "\
src/main.ts: line 4, col 7, Error - 'x' is assigned a value but never used. (no-unused-vars)
src/main.ts: line 9, col 1, Warning - Unexpected console statement. (no-console)

2 problems
";
        let by_file = eslint_driver().parse(report).unwrap();
        let violations = &by_file["src/main.ts"];
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].line, 4);
        assert!(violations[1]
            .message
            .as_deref()
            .unwrap()
            .contains("no-console"));
    }

    #[test]
    fn test_no_matches_yields_empty() {
        assert!(flake8_driver().parse("nothing to see\n").unwrap().is_empty());
    }
}
