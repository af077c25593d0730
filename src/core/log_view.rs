//! Line-oriented view over a mapped CSV log.
//!
//! A log is a header line of column names followed by data rows whose first
//! cell is an integer timestamp. The view never allocates; every accessor
//! hands back slices of the underlying buffer and treats reads past the end
//! as end-of-file.

/// A single line inside the log, terminator included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Byte offset of the first byte of the line.
    pub offset: usize,
    /// Line bytes including the trailing `\n` if present.
    pub bytes: &'a [u8],
}

impl<'a> Line<'a> {
    /// Offset of the byte following this line.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }

    /// Line content without `\n` / `\r\n`.
    pub fn content(&self) -> &'a [u8] {
        trim_line_ending(self.bytes)
    }

    /// Leading timestamp, or `None` if the first cell is not an integer.
    pub fn timestamp(&self) -> Option<i64> {
        parse_timestamp(self.bytes)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LogView<'a> {
    data: &'a [u8],
    header_end: usize,
}

impl<'a> LogView<'a> {
    /// Wrap a log buffer. A buffer without any newline is all header.
    pub fn new(data: &'a [u8]) -> Self {
        let header_end = data
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |pos| pos + 1);
        Self { data, header_end }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset of the first data row.
    pub fn header_end(&self) -> usize {
        self.header_end
    }

    /// Header line including its terminator.
    pub fn header(&self) -> &'a [u8] {
        &self.data[..self.header_end]
    }

    /// Column names of the header, in order.
    pub fn columns(&self) -> Vec<&'a [u8]> {
        let header = trim_line_ending(self.header());
        if header.is_empty() {
            return Vec::new();
        }
        header.split(|&b| b == b',').collect()
    }

    /// The line starting at `offset`, or `None` at end of data.
    pub fn line_at(&self, offset: usize) -> Option<Line<'a>> {
        if offset >= self.data.len() {
            return None;
        }
        let rest = &self.data[offset..];
        let len = rest
            .iter()
            .position(|&b| b == b'\n')
            .map_or(rest.len(), |pos| pos + 1);
        Some(Line {
            offset,
            bytes: &rest[..len],
        })
    }

    /// First line start at or after `offset` (never before the header end).
    ///
    /// Returns `len()` when no further line starts.
    pub fn line_start_at_or_after(&self, offset: usize) -> usize {
        if offset <= self.header_end {
            return self.header_end;
        }
        if offset >= self.data.len() {
            return self.data.len();
        }
        if self.data[offset - 1] == b'\n' {
            return offset;
        }
        self.data[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.data.len(), |pos| offset + pos + 1)
    }

    /// Iterate lines starting at `offset`, which must be a line start.
    pub fn lines_from(&self, offset: usize) -> Lines<'a> {
        Lines {
            view: *self,
            offset,
        }
    }
}

pub struct Lines<'a> {
    view: LogView<'a>,
    offset: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.view.line_at(self.offset)?;
        self.offset = line.end();
        Some(line)
    }
}

/// Parse the leading comma-delimited cell of a row as a base-10 integer.
///
/// Surrounding whitespace and a leading sign are accepted.
pub fn parse_timestamp(line: &[u8]) -> Option<i64> {
    let first = match line.iter().position(|&b| b == b',') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let cell = std::str::from_utf8(first).ok()?.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<i64>().ok()
}

pub(crate) fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
