use url::form_urlencoded;

use crate::core::{Error, Result};

/// A single windowed read request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WindowQuery {
    /// Inclusive lower timestamp bound.
    pub from: Option<i64>,
    /// Inclusive upper timestamp bound.
    pub to: Option<i64>,
    /// Requested approximate row count; requires `to`.
    pub approx_num_samples: Option<u64>,
    /// Columns to project, in output order.
    pub filter_columns: Option<Vec<String>>,
}

impl WindowQuery {
    /// Parse a URL query string (without the leading `?`).
    ///
    /// Non-integer bounds and non-positive sample counts are treated as
    /// absent. Only the first occurrence of each parameter counts.
    pub fn parse(query: &str) -> Result<Self> {
        let mut from = None;
        let mut to = None;
        let mut approx = None;
        let mut filter = None;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match &*key {
                "from" => &mut from,
                "to" => &mut to,
                "approx_num_samples" => &mut approx,
                "filter" => &mut filter,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        let parsed = Self {
            from: from.as_deref().and_then(parse_int),
            to: to.as_deref().and_then(parse_int),
            approx_num_samples: approx
                .as_deref()
                .and_then(parse_int)
                .filter(|&n| n > 0)
                .map(|n| n as u64),
            filter_columns: filter.as_deref().and_then(parse_columns),
        };
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject parameter combinations that cannot be served.
    pub fn validate(&self) -> Result<()> {
        if self.approx_num_samples.is_some() && self.to.is_none() {
            return Err(Error::BadRequest(
                "'approx_num_samples' requires 'to' parameter".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the whole file can be served untouched.
    pub fn is_passthrough(&self) -> bool {
        self.from.is_none()
            && self.to.is_none()
            && self.approx_num_samples.is_none()
            && self.filter_columns.is_none()
    }
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_columns(value: &str) -> Option<Vec<String>> {
    let columns: Vec<String> = value
        .split(',')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        None
    } else {
        Some(columns)
    }
}
