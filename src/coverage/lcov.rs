//! LCOV format parser

use super::{CoverageError, ParsedReport, ReportedFile};
use crate::paths;

/// Parse LCOV content from a string.
///
/// Line-oriented records: `SF:<path>` opens a source section,
/// `DA:<lineNo>,<executionCount>` accumulates execution counts per line
/// (additively when a line repeats), `end_of_record` closes the section.
pub fn parse_lcov_string(content: &str) -> Result<ParsedReport, CoverageError> {
    let mut report = ParsedReport::default();
    let mut current_file: Option<ReportedFile> = None;

    for line in content.lines() {
        let line = line.trim();

        if let Some(path) = line.strip_prefix("SF:") {
            if let Some(file) = current_file.take() {
                report.files.push(file);
            }
            current_file = Some(ReportedFile {
                candidates: vec![paths::relative_to_cwd(path)],
                ..Default::default()
            });
        } else if let Some(record) = line.strip_prefix("DA:") {
            if let Some(ref mut file) = current_file {
                let mut parts = record.splitn(3, ',');
                let line_no = parts.next().and_then(|s| s.parse::<u32>().ok());
                let count = parts.next().and_then(|s| s.parse::<u64>().ok());
                match (line_no, count) {
                    (Some(line_no), Some(count)) => file.record(line_no, count),
                    _ => {
                        return Err(CoverageError::Malformed(format!(
                            "bad DA record: {}",
                            line
                        )))
                    }
                }
            }
        } else if line == "end_of_record" {
            if let Some(file) = current_file.take() {
                report.files.push(file);
            }
        }
        // TN/FN/FNDA/LF/LH/BRDA records carry no line coverage we use
    }

    if let Some(file) = current_file.take() {
        report.files.push(file);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lcov() {
        let lcov = "SF:a.ts\nDA:1,0\nDA:2,3\n";
        let report = parse_lcov_string(lcov).unwrap();

        assert_eq!(report.files.len(), 1);
        let file = &report.files[0];
        assert_eq!(file.candidates, vec!["a.ts".to_string()]);
        assert_eq!(file.line_hits.get(&1), Some(&0));
        assert_eq!(file.line_hits.get(&2), Some(&3));
    }

    #[test]
    fn test_repeated_da_records_accumulate() {
        let lcov = "SF:a.ts\nDA:4,0\nDA:4,2\nend_of_record\n";
        let report = parse_lcov_string(lcov).unwrap();
        assert_eq!(report.files[0].line_hits.get(&4), Some(&2));
    }

    #[test]
    fn test_multiple_records() {
        let lcov = "\
TN:
SF:src/main.rs
DA:1,1
DA:2,0
LF:2
LH:1
end_of_record
SF:src/lib.rs
DA:7,5
end_of_record
";
        let report = parse_lcov_string(lcov).unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files[1].candidates, vec!["src/lib.rs".to_string()]);
    }

    #[test]
    fn test_empty_lcov() {
        let report = parse_lcov_string("").unwrap();
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_bad_da_record_is_malformed() {
        let err = parse_lcov_string("SF:a.ts\nDA:x,y\n").unwrap_err();
        assert!(matches!(err, CoverageError::Malformed(_)));
    }
}
