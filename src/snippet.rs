//! Snippet range building: group violation lines into contiguous,
//! context-padded excerpt windows for display.

use crate::lineset::LineSet;

/// Context lines added on each side of a violation cluster.
const CONTEXT: u32 = 4;

/// Clusters separated by more than this many clean lines get separate ranges.
const MAX_GAP: u32 = 4;

/// An inclusive 1-based line range for one excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetRange {
    pub start: u32,
    pub end: u32,
}

/// Compute excerpt windows for a file of `total_lines` lines.
///
/// Ranges come out ascending and disjoint. A range opens `CONTEXT` lines
/// before the first violation of a cluster and closes `CONTEXT` lines after
/// its last; clusters closer together than `MAX_GAP` merge into one range.
pub fn ranges(total_lines: u32, violation_lines: &LineSet) -> Vec<SnippetRange> {
    let mut result = Vec::new();
    let mut open_start: Option<u32> = None;
    let mut last_violation = 0u32;
    let mut gap = 0u32;

    for line in 1..=total_lines {
        if violation_lines.contains(line) {
            if open_start.is_none() {
                open_start = Some(line.saturating_sub(CONTEXT).max(1));
            }
            last_violation = line;
            gap = 0;
        } else if let Some(start) = open_start {
            gap += 1;
            if gap > MAX_GAP {
                result.push(SnippetRange {
                    start,
                    end: (last_violation + CONTEXT).min(total_lines),
                });
                open_start = None;
                gap = 0;
            }
        }
    }

    if let Some(start) = open_start {
        result.push(SnippetRange {
            start,
            end: total_lines,
        });
    }

    result
}
