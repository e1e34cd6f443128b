//! JaCoCo XML format parser

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{CoverageError, ParsedReport, ReportedFile};
use crate::paths;

/// Parse JaCoCo XML content from a string.
///
/// A `<sourcefile name="...">` inside `<package name="...">` matches a query
/// when `root/package/sourcefile` equals it for some configured source root
/// (`src_roots`); `ci` is the covered-instruction count for a line.
pub fn parse_jacoco_string(
    content: &str,
    src_roots: &[String],
) -> Result<ParsedReport, CoverageError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut report = ParsedReport::default();
    let mut current_package = String::new();
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
                b"package" => {
                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        if attr.key.as_ref() == b"name" {
                            current_package =
                                paths::normalize(&String::from_utf8_lossy(&attr.value));
                        }
                    }
                }
                b"sourcefile" => {
                    let mut name = String::new();
                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        if attr.key.as_ref() == b"name" {
                            name = String::from_utf8_lossy(&attr.value).to_string();
                        }
                    }
                    if !name.is_empty() {
                        let package_path = paths::join(&current_package, &name);
                        let mut candidates = vec![package_path.clone()];
                        for root in src_roots {
                            candidates.push(paths::join(root, &package_path));
                        }
                        current_file = Some(ReportedFile {
                            candidates,
                            ..Default::default()
                        });
                    }
                }
                b"line" => {
                    if let Some(ref mut file) = current_file {
                        let mut nr: Option<u32> = None;
                        let mut covered: u64 = 0;
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            match attr.key.as_ref() {
                                b"nr" => {
                                    nr = String::from_utf8_lossy(&attr.value).parse().ok();
                                }
                                b"ci" => {
                                    covered = String::from_utf8_lossy(&attr.value)
                                        .parse()
                                        .unwrap_or(0);
                                }
                                _ => {}
                            }
                        }
                        if let Some(line) = nr {
                            file.record(line, covered);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => {
                depth -= 1;
                match e.name().as_ref() {
                    b"sourcefile" => {
                        if let Some(file) = current_file.take() {
                            report.files.push(file);
                        }
                    }
                    b"package" => current_package.clear(),
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
