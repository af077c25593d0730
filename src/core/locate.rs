//! Timestamp to byte-offset lookup over a CSV log.
//!
//! The log has no index, so the search runs directly over byte positions:
//! every midpoint lands somewhere inside a line, realigns to the next line start
//! and reads that row's leading timestamp. Line lengths vary, so the converged
//! position is confirmed with a short forward scan before it is returned.

use log::debug;

use crate::core::log_view::LogView;

/// Default number of lines the confirmation scan may inspect.
pub const DEFAULT_SCAN_LIMIT: usize = 10;

/// How a lookup resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekResult {
    /// A row with timestamp >= target was confirmed.
    Found,
    /// The first data row already satisfies the target.
    BeforeStart,
    /// Every row is older than the target; offset is the end of data.
    EndOfLog,
    /// The scan budget ran out; offset is the header end.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub offset: usize,
    pub result: SeekResult,
}

/// Find the first row whose timestamp is >= `target`.
///
/// Midpoint rows that are missing or whose timestamp does not parse count as
/// "too high". When the confirmation scan cannot find a qualifying row within
/// `scan_limit` lines, the header end is returned so no valid row is skipped.
pub fn locate(view: &LogView<'_>, target: i64, scan_limit: usize) -> Located {
    let header_end = view.header_end();
    let size = view.len();

    let mut low = header_end;
    let mut high = size;

    while low < high {
        let mid = low + (high - low) / 2;
        let pos = view.line_start_at_or_after(mid);
        let Some(line) = view.line_at(pos) else {
            high = mid;
            continue;
        };
        match line.timestamp() {
            None => high = mid,
            Some(ts) if ts < target => low = line.end(),
            Some(_) => high = mid,
        }
    }

    // Rows before `low` are all older than the target, so the scan starts there.
    debug!("locate target={target} converged={low} size={size}");

    let mut offset = low;
    for _ in 0..scan_limit.max(1) {
        let Some(line) = view.line_at(offset) else {
            return Located {
                offset: size,
                result: SeekResult::EndOfLog,
            };
        };
        if matches!(line.timestamp(), Some(ts) if ts >= target) {
            let result = if line.offset == header_end {
                SeekResult::BeforeStart
            } else {
                SeekResult::Found
            };
            return Located {
                offset: line.offset,
                result,
            };
        }
        offset = line.end();
    }

    if view.line_at(offset).is_none() {
        return Located {
            offset: size,
            result: SeekResult::EndOfLog,
        };
    }

    debug!("locate target={target} unconfirmed after {scan_limit} lines, falling back to header end");
    Located {
        offset: header_end,
        result: SeekResult::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(stamps: &[i64]) -> Vec<u8> {
        let mut out = b"timestamp,value\n".to_vec();
        for (i, ts) in stamps.iter().enumerate() {
            out.extend_from_slice(format!("{ts},{}\n", i * 7).as_bytes());
        }
        out
    }

    fn offset_of_row(data: &[u8], row: usize) -> usize {
        let view = LogView::new(data);
        view.lines_from(view.header_end())
            .nth(row)
            .map(|line| line.offset)
            .unwrap()
    }

    #[test]
    fn finds_first_of_duplicates() {
        let data = build(&[10, 20, 20, 30, 50]);
        let view = LogView::new(&data);
        let found = locate(&view, 20, DEFAULT_SCAN_LIMIT);
        assert_eq!(found.offset, offset_of_row(&data, 1));
        assert_eq!(found.result, SeekResult::Found);
    }

    #[test]
    fn later_duplicate_hit_does_not_skip_first_copy() {
        // Long runs of equal stamps: a midpoint lands on a later copy before
        // the search narrows down to the first one.
        let mut stamps = vec![1; 3];
        stamps.extend(std::iter::repeat(5).take(40));
        stamps.extend([9, 9, 12]);
        let data = build(&stamps);
        let view = LogView::new(&data);
        let found = locate(&view, 5, DEFAULT_SCAN_LIMIT);
        assert_eq!(found.offset, offset_of_row(&data, 3));
        assert_eq!(found.result, SeekResult::Found);
    }

    #[test]
    fn between_rows_lands_on_next() {
        let data = build(&[10, 20, 20, 30, 50]);
        let view = LogView::new(&data);
        assert_eq!(locate(&view, 25, DEFAULT_SCAN_LIMIT).offset, offset_of_row(&data, 3));
    }

    #[test]
    fn before_start_and_after_end() {
        let data = build(&[10, 20, 20, 30, 50]);
        let view = LogView::new(&data);

        let before = locate(&view, 5, DEFAULT_SCAN_LIMIT);
        assert_eq!(before.offset, view.header_end());
        assert_eq!(before.result, SeekResult::BeforeStart);

        let after = locate(&view, 1000, DEFAULT_SCAN_LIMIT);
        assert_eq!(after.offset, data.len());
        assert_eq!(after.result, SeekResult::EndOfLog);
    }

    #[test]
    fn header_only_log() {
        let data = b"timestamp,value\n".to_vec();
        let view = LogView::new(&data);
        let found = locate(&view, 0, DEFAULT_SCAN_LIMIT);
        assert_eq!(found.offset, data.len());
        assert_eq!(found.result, SeekResult::EndOfLog);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let data = b"timestamp,value\n10,a\nbad,b\n20,c\noops\n30,d\n".to_vec();
        let view = LogView::new(&data);
        let found = locate(&view, 15, DEFAULT_SCAN_LIMIT);
        assert_eq!(&data[found.offset..found.offset + 4], b"20,c");
    }

    #[test]
    fn unterminated_last_row() {
        let data = b"timestamp,value\n10,a\n20,b\n30,c".to_vec();
        let view = LogView::new(&data);
        let found = locate(&view, 30, DEFAULT_SCAN_LIMIT);
        assert_eq!(&data[found.offset..], b"30,c");
    }

    #[test]
    fn unconfirmed_scan_falls_back_to_header_end() {
        let mut data = b"timestamp,value\n1,a\n".to_vec();
        for _ in 0..20 {
            data.extend_from_slice(b"garbage,row\n");
        }
        data.extend_from_slice(b"100,z\n");
        let view = LogView::new(&data);
        let found = locate(&view, 50, 3);
        assert_eq!(found.result, SeekResult::Fallback);
        assert_eq!(found.offset, view.header_end());
    }

    #[test]
    fn variable_line_lengths() {
        let mut data = b"timestamp,payload\n".to_vec();
        let mut offsets = Vec::new();
        for i in 0..200_i64 {
            offsets.push(data.len());
            let pad = "x".repeat(((i * 37) % 90) as usize);
            data.extend_from_slice(format!("{},{pad}\n", 1_000 + i * 10).as_bytes());
        }
        let view = LogView::new(&data);
        for i in 0..200_i64 {
            let exact = locate(&view, 1_000 + i * 10, DEFAULT_SCAN_LIMIT);
            assert_eq!(exact.offset, offsets[i as usize], "exact target row {i}");
            let between = locate(&view, 1_000 + i * 10 - 5, DEFAULT_SCAN_LIMIT);
            assert_eq!(between.offset, offsets[i as usize], "between target row {i}");
        }
    }
}
