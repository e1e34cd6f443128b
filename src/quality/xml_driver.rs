//! XML quality drivers for structured linter reports.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{QualityDriver, QualityError};
use crate::paths;
use crate::violations::Violation;

/// Checkstyle XML: `<file name="..."><error line=".." message=".."/></file>`.
pub struct CheckstyleDriver;

impl QualityDriver for CheckstyleDriver {
    fn name(&self) -> &str {
        "checkstyle"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn parse(&self, report: &str) -> Result<BTreeMap<String, Vec<Violation>>, QualityError> {
        let mut reader = Reader::from_str(report);
        reader.trim_text(true);

        let mut by_file: BTreeMap<String, Vec<Violation>> = BTreeMap::new();
        let mut current_file: Option<String> = None;
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
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            if attr.key.as_ref() == b"name" {
                                current_file =
                                    Some(paths::normalize(&String::from_utf8_lossy(&attr.value)));
                            }
                        }
                    }
                    b"error" | b"warning" => {
                        if let Some(file) = &current_file {
                            let mut line: Option<u32> = None;
                            let mut message = String::new();
                            for attr in e.attributes().filter_map(|a| a.ok()) {
                                match attr.key.as_ref() {
                                    b"line" => {
                                        line = String::from_utf8_lossy(&attr.value).parse().ok();
                                    }
                                    b"message" => {
                                        message = String::from_utf8_lossy(&attr.value).to_string();
                                    }
                                    _ => {}
                                }
                            }
                            // line 0 is a file-level, not line-level, diagnostic
                            if let Some(line) = line.filter(|l| *l > 0) {
                                by_file
                                    .entry(file.clone())
                                    .or_default()
                                    .push(Violation::new(line, message));
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(ref e)) => {
                    depth -= 1;
                    if e.name().as_ref() == b"file" {
                        current_file = None;
                    }
                }
                Ok(Event::Eof) => {
                    if depth > 0 {
                        return Err(QualityError::Malformed(
                            "unexpected end of document".to_string(),
                        ));
                    }
                    break;
                }
                Err(e) => return Err(QualityError::Malformed(e.to_string())),
                _ => {}
            }
        }

        Ok(by_file)
    }
}

/// Findbugs/SpotBugs XML: `<BugInstance>` with a `<SourceLine sourcepath
/// start>` location and a `<LongMessage>` description.
pub struct FindbugsDriver;

impl QualityDriver for FindbugsDriver {
    fn name(&self) -> &str {
        "findbugs"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn parse(&self, report: &str) -> Result<BTreeMap<String, Vec<Violation>>, QualityError> {
        let mut reader = Reader::from_str(report);
        reader.trim_text(true);

        let mut by_file: BTreeMap<String, Vec<Violation>> = BTreeMap::new();
        let mut in_bug = false;
        let mut in_long_message = false;
        let mut bug_location: Option<(String, u32)> = None;
        let mut bug_message = String::new();
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
                    b"BugInstance" => {
                        in_bug = true;
                        bug_location = None;
                        bug_message.clear();
                    }
                    b"SourceLine" => {
                        // the first SourceLine inside the bug is its primary location
                        if in_bug && bug_location.is_none() {
                            let mut sourcepath = String::new();
                            let mut start: Option<u32> = None;
                            for attr in e.attributes().filter_map(|a| a.ok()) {
                                match attr.key.as_ref() {
                                    b"sourcepath" => {
                                        sourcepath =
                                            String::from_utf8_lossy(&attr.value).to_string();
                                    }
                                    b"start" => {
                                        start =
                                            String::from_utf8_lossy(&attr.value).parse().ok();
                                    }
                                    _ => {}
                                }
                            }
                            if !sourcepath.is_empty() {
                                if let Some(start) = start.filter(|s| *s > 0) {
                                    bug_location = Some((paths::normalize(&sourcepath), start));
                                }
                            }
                        }
                    }
                    b"LongMessage" => {
                        if in_bug {
                            in_long_message = true;
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if in_long_message {
                        bug_message = e.unescape().unwrap_or_default().to_string();
                    }
                }
                Ok(Event::End(ref e)) => {
                    depth -= 1;
                    match e.name().as_ref() {
                        b"LongMessage" => in_long_message = false,
                        b"BugInstance" => {
                            if let Some((file, line)) = bug_location.take() {
                                by_file
                                    .entry(file)
                                    .or_default()
                                    .push(Violation::new(line, bug_message.clone()));
                            }
                            in_bug = false;
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => {
                    if depth > 0 {
                        return Err(QualityError::Malformed(
                            "unexpected end of document".to_string(),
                        ));
                    }
                    break;
                }
                Err(e) => return Err(QualityError::Malformed(e.to_string())),
                _ => {}
            }
        }

        Ok(by_file)
    }
}
