//! `Range: bytes=...` handling for file transfers.
//!
//! Only a single range is ever honoured. Unknown units, malformed specs
//!  and multi-range requests fall back to sending the whole file, which
//!  RFC 9110 allows a server to do.

/// An inclusive byte range (`start..=end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered. Never zero: `start <= end` always holds.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(self) -> u64 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelection {
    Full,
    Partial(ByteRange),
    Unsatisfiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    FromTo { start: u64, end: Option<u64> },
    Suffix { len: u64 },
}

fn parse(value: &str) -> Option<Vec<RangeSpec>> {
    let (unit, rest) = value.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }

    let mut specs = Vec::new();
    for part in rest.split(',') {
        let part = part.trim();
        if let Some(suffix) = part.strip_prefix('-') {
            specs.push(RangeSpec::Suffix {
                len: suffix.trim().parse().ok()?,
            });
            continue;
        }

        let (start, end) = part.split_once('-')?;
        let start: u64 = start.trim().parse().ok()?;
        let end = match end.trim() {
            "" => None,
            end => Some(end.parse::<u64>().ok()?),
        };
        if matches!(end, Some(end) if end < start) {
            return None;
        }
        specs.push(RangeSpec::FromTo { start, end });
    }

    if specs.is_empty() {
        return None;
    }
    Some(specs)
}

/// Resolve a raw `Range` header against a file of `size` bytes.
pub fn select(header: Option<&str>, size: u64) -> RangeSelection {
    let Some(specs) = header.and_then(parse) else {
        return RangeSelection::Full;
    };
    let [spec] = specs.as_slice() else {
        return RangeSelection::Full;
    };

    if size == 0 {
        return RangeSelection::Unsatisfiable;
    }

    match *spec {
        RangeSpec::FromTo { start, end } => {
            if start >= size {
                return RangeSelection::Unsatisfiable;
            }
            let end = end.map_or(size - 1, |end| end.min(size - 1));
            RangeSelection::Partial(ByteRange { start, end })
        }
        RangeSpec::Suffix { len } => {
            if len == 0 {
                return RangeSelection::Unsatisfiable;
            }
            RangeSelection::Partial(ByteRange {
                start: size.saturating_sub(len),
                end: size - 1,
            })
        }
    }
}
