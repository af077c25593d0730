//! Windowed, projected and down-sampled reads over a CSV log.
//!
//! `read_window` is the whole request pipeline: locate the first row at or
//! after `from`, then walk forward emitting the (projected) header and every
//! row the stride sampler keeps, until a row passes `to` or data ends.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::locate::{locate, SeekResult, DEFAULT_SCAN_LIMIT};
use crate::core::log_view::{Line, LogView};
use crate::core::query::WindowQuery;
use crate::core::sampler::{SamplingState, StrideSampler};

/// Default number of trailing periods always served at full resolution.
pub const DEFAULT_TAIL_WINDOW: u32 = 6;

/// Tunables for windowed reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Rows within this many estimated periods of `to` skip down-sampling.
    /// `None` disables the tail guarantee.
    /// Default: 6
    pub tail_window: Option<u32>,

    /// Lines the locator may scan forward to confirm its landing row.
    /// Default: 10
    pub scan_limit: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            tail_window: Some(DEFAULT_TAIL_WINDOW),
            scan_limit: DEFAULT_SCAN_LIMIT,
        }
    }
}

/// Counters for a single windowed read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub start_offset: usize,
    pub rows_scanned: u64,
    pub rows_emitted: u64,
}

/// Column projection resolved against a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Source column index for each output column; `None` passes lines through.
    indices: Option<Vec<usize>>,
}

impl Projection {
    pub fn all() -> Self {
        Self { indices: None }
    }

    /// Resolve `columns` against the header. Unknown names are dropped.
    pub fn resolve(view: &LogView<'_>, columns: Option<&[String]>) -> Self {
        let Some(columns) = columns else {
            return Self::all();
        };
        let header = view.columns();
        let indices = columns
            .iter()
            .filter_map(|name| header.iter().position(|col| *col == name.as_bytes()))
            .collect();
        Self {
            indices: Some(indices),
        }
    }

    pub fn write_header(&self, view: &LogView<'_>, out: &mut Vec<u8>) {
        match &self.indices {
            None => out.extend_from_slice(view.header()),
            Some(indices) => {
                let header = view.columns();
                write_cells(indices, &header, out);
            }
        }
    }

    pub fn write_row(&self, line: &Line<'_>, out: &mut Vec<u8>) {
        match &self.indices {
            None => out.extend_from_slice(line.bytes),
            Some(indices) => {
                let cells: Vec<&[u8]> = line.content().split(|&b| b == b',').collect();
                write_cells(indices, &cells, out);
            }
        }
    }
}

fn write_cells(indices: &[usize], cells: &[&[u8]], out: &mut Vec<u8>) {
    for (i, &idx) in indices.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        // Short rows yield empty cells.
        if let Some(cell) = cells.get(idx) {
            out.extend_from_slice(cell);
        }
    }
    out.push(b'\n');
}

/// Emit the header and every kept row from `start` onward into `out`.
///
/// `start` must be a line start at or after the header end. Iteration stops
/// at the first row whose timestamp is strictly greater than `query.to`;
/// that row is not emitted. Rows without a parseable timestamp are always
/// emitted and leave the sampling state untouched.
pub fn stream<R: Rng>(
    view: &LogView<'_>,
    start: usize,
    query: &WindowQuery,
    config: &WindowConfig,
    rng: &mut R,
    out: &mut Vec<u8>,
) -> WindowStats {
    let start = start.max(view.header_end());
    let projection = Projection::resolve(view, query.filter_columns.as_deref());
    let sampler = StrideSampler::new(query, config);
    let mut state = SamplingState::new();
    let mut stats = WindowStats {
        start_offset: start,
        ..WindowStats::default()
    };

    projection.write_header(view, out);

    for line in view.lines_from(start) {
        stats.rows_scanned += 1;
        let timestamp = line.timestamp();

        if let (Some(to), Some(ts)) = (query.to, timestamp) {
            if ts > to {
                break;
            }
        }

        let keep = match timestamp {
            Some(ts) => {
                let (keep, next) = sampler.include(state, ts, rng);
                state = next;
                keep
            }
            None => true,
        };

        if keep {
            projection.write_row(&line, out);
            stats.rows_emitted += 1;
        }
    }

    if sampler.is_active() {
        debug!(
            "sampled window period={:?} stride={:.3} kept={}/{}",
            state.estimated_period, state.stride, stats.rows_emitted, stats.rows_scanned
        );
    }
    stats
}

/// Run a complete windowed read against `view`.
///
/// A query without bounds, samples or filter returns the log unchanged.
pub fn read_window<R: Rng>(
    view: &LogView<'_>,
    query: &WindowQuery,
    config: &WindowConfig,
    rng: &mut R,
) -> (Vec<u8>, WindowStats) {
    if query.is_passthrough() {
        let stats = WindowStats {
            start_offset: 0,
            rows_scanned: 0,
            rows_emitted: 0,
        };
        return (view.as_bytes().to_vec(), stats);
    }

    let start = match query.from {
        None => view.header_end(),
        Some(from) => {
            let located = locate(view, from, config.scan_limit);
            if located.result == SeekResult::Fallback {
                debug!("from={from} could not be confirmed, serving from first row");
            }
            located.offset
        }
    };

    let mut out = Vec::new();
    let stats = stream(view, start, query, config, rng, &mut out);
    (out, stats)
}
