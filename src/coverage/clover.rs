//! Clover XML format parser

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{CoverageError, ParsedReport, ReportedFile};
use crate::paths;

/// Parse Clover XML content from a string.
///
/// `<file>` elements carry a `path` (often absolute) and a `name`; both are
/// kept as match candidates, with absolute paths re-rooted at the invocation
/// directory. Only `stmt` and `cond` line types carry line coverage.
pub fn parse_clover_string(content: &str) -> Result<ParsedReport, CoverageError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut report = ParsedReport::default();
    let mut current_file: Option<ReportedFile> = None;

    let mut buf = Vec::new();
    let mut depth = 0i32;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf);
        if let Ok(Event::Start(_)) = event {
            depth += 1;
        }
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"file" => {
                    let mut candidates = Vec::new();
                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        match attr.key.as_ref() {
                            b"path" => {
                                let path = String::from_utf8_lossy(&attr.value).to_string();
                                candidates.push(paths::relative_to_cwd(&path));
                            }
                            b"name" => {
                                let name = String::from_utf8_lossy(&attr.value).to_string();
                                candidates.push(paths::normalize(&name));
                            }
                            _ => {}
                        }
                    }
                    if !candidates.is_empty() {
                        current_file = Some(ReportedFile {
                            candidates,
                            ..Default::default()
                        });
                    }
                }
                b"line" => {
                    if let Some(ref mut file) = current_file {
                        let mut num: Option<u32> = None;
                        let mut count: u64 = 0;
                        let mut countable = false;
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            match attr.key.as_ref() {
                                b"num" => {
                                    num = String::from_utf8_lossy(&attr.value).parse().ok();
                                }
                                b"count" => {
                                    count = String::from_utf8_lossy(&attr.value)
                                        .parse()
                                        .unwrap_or(0);
                                }
                                b"type" => {
                                    let kind = String::from_utf8_lossy(&attr.value);
                                    countable = kind == "stmt" || kind == "cond";
                                }
                                _ => {}
                            }
                        }
                        if countable {
                            if let Some(line) = num {
                                file.record(line, count);
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => {
                depth -= 1;
                if e.name().as_ref() == b"file" {
                    if let Some(file) = current_file.take() {
                        report.files.push(file);
                    }
                }
            }
            Ok(Event::Eof) => {
                if depth > 0 {
                    return Err(CoverageError::Malformed(
                        "unexpected end of document".to_string(),
                    ));
                }
                break;
            }
            Err(e) => return Err(CoverageError::Malformed(e.to_string())),
            _ => {}
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clover() {
        let xml = r#"<?xml version="1.0"?>
<coverage generated="1" clover="4.4.1">
    <project timestamp="1">
        <file name="src/app.ts" path="src/app.ts">
            <line num="1" type="stmt" count="4"/>
            <line num="2" type="cond" count="0" truecount="0" falsecount="0"/>
            <line num="3" type="method" count="0"/>
            <line num="4" type="stmt" count="1"/>
        </file>
    </project>
</coverage>"#;

        let report = parse_clover_string(xml).unwrap();
        assert_eq!(report.files.len(), 1);

        let file = &report.files[0];
        assert!(file.candidates.contains(&"src/app.ts".to_string()));
        // method lines are not measured
        assert_eq!(file.line_hits.len(), 3);
        assert_eq!(file.line_hits.get(&2), Some(&0));
        assert_eq!(file.line_hits.get(&3), None);
    }

    #[test]
    fn test_truncated_xml_is_error() {
        let err = parse_clover_string("<coverage clover=\"4.4.1\"><project><file").unwrap_err();
        assert!(matches!(err, CoverageError::Malformed(_)));
    }

    #[test]
    fn test_self_closing_file_without_lines() {
        let xml = r#"<coverage clover="4.4.1"><project><file name="empty.ts"/></project></coverage>"#;
        let report = parse_clover_string(xml).unwrap();
        // self-closing file never sees an End event, so nothing is recorded
        assert!(report.files.is_empty() || report.files[0].line_hits.is_empty());
    }
}
