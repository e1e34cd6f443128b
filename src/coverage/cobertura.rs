//! Cobertura XML format parser

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{CoverageError, ParsedReport, ReportedFile};
use crate::paths;

/// Parse Cobertura XML content from a string.
///
/// A reported file matches a query either by its `<class filename="...">`
/// attribute directly or by that filename joined against each `<source>`
/// root; a `<line>` with `hits="0"` is uncovered.
pub fn parse_cobertura_string(content: &str) -> Result<ParsedReport, CoverageError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut report = ParsedReport::default();
    let mut roots: Vec<String> = Vec::new();
    let mut current_file: Option<ReportedFile> = None;
    let mut in_source = false;

    let mut buf = Vec::new();
    let mut depth = 0i32;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf);
        // only an opened element can contain text, so a self-closing
        // <source/> must not arm root collection
        if let Ok(Event::Start(ref e)) = event {
            depth += 1;
            if e.name().as_ref() == b"source" {
                in_source = true;
            }
        }
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"class" => {
                    let mut filename = String::new();
                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        if attr.key.as_ref() == b"filename" {
                            filename = String::from_utf8_lossy(&attr.value).to_string();
                        }
                    }

                    if !filename.is_empty() {
                        let reported = paths::clean(&filename);
                        let mut candidates = vec![reported.clone()];
                        for root in &roots {
                            candidates.push(paths::join(root, &reported));
                        }
                        current_file = Some(ReportedFile {
                            candidates,
                            ..Default::default()
                        });
                    }
                }
                b"line" => {
                    if let Some(ref mut file) = current_file {
                        let mut number: Option<u32> = None;
                        let mut hits: u64 = 0;
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            match attr.key.as_ref() {
                                b"number" => {
                                    number = String::from_utf8_lossy(&attr.value).parse().ok();
                                }
                                b"hits" => {
                                    hits = String::from_utf8_lossy(&attr.value)
                                        .parse()
                                        .unwrap_or(0);
                                }
                                _ => {}
                            }
                        }
                        if let Some(line) = number {
                            file.record(line, hits);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_source {
                    let root = e.unescape().unwrap_or_default().trim().to_string();
                    if !root.is_empty() {
                        roots.push(paths::normalize(&root));
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                depth -= 1;
                match e.name().as_ref() {
                    b"source" => in_source = false,
                    b"class" => {
                        if let Some(file) = current_file.take() {
                            report.files.push(file);
                        }
                    }
                    _ => {}
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
    fn test_parse_cobertura() {
        let xml = r#"<?xml version="1.0"?>
<coverage line-rate="0.75">
    <sources>
        <source>src</source>
    </sources>
    <packages>
        <package name="app">
            <classes>
                <class name="main" filename="app/main.py" line-rate="0.75">
                    <lines>
                        <line number="1" hits="1"/>
                        <line number="2" hits="1"/>
                        <line number="3" hits="0"/>
                        <line number="4" hits="1"/>
                    </lines>
                </class>
            </classes>
        </package>
    </packages>
</coverage>"#;

        let report = parse_cobertura_string(xml).unwrap();
        assert_eq!(report.files.len(), 1);

        let file = &report.files[0];
        assert!(file.candidates.contains(&"app/main.py".to_string()));
        assert!(file.candidates.contains(&"src/app/main.py".to_string()));
        assert_eq!(file.line_hits.get(&3), Some(&0));
        assert_eq!(file.line_hits.get(&1), Some(&1));
        assert_eq!(file.line_hits.len(), 4);
    }

    #[test]
    fn test_same_filename_in_two_classes() {
        let xml = r#"<coverage>
    <packages><package name="p"><classes>
        <class name="A" filename="mod.py">
            <lines><line number="1" hits="0"/></lines>
        </class>
        <class name="B" filename="mod.py">
            <lines><line number="9" hits="2"/></lines>
        </class>
    </classes></package></packages>
</coverage>"#;

        let report = parse_cobertura_string(xml).unwrap();
        assert_eq!(report.files.len(), 2);
        assert!(report.files.iter().all(|f| f.candidates[0] == "mod.py"));
    }

    #[test]
    fn test_self_closing_source_collects_no_root() {
        let xml = r#"<coverage>
    <sources><source/></sources>
    <notes>generated nightly</notes>
    <packages><package name="p"><classes>
        <class name="A" filename="a.py">
            <lines><line number="1" hits="1"/></lines>
        </class>
    </classes></package></packages>
</coverage>"#;

        let report = parse_cobertura_string(xml).unwrap();
        assert_eq!(report.files[0].candidates, vec!["a.py".to_string()]);
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let err = parse_cobertura_string("<coverage><class").unwrap_err();
        assert!(matches!(err, CoverageError::Malformed(_)));
    }
}
