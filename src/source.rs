//! Landmark streams produced by an external hand tracker.
//!
//! The tracker writes one JSON object per line:
//!
//! ```text
//! {"t": 0.033, "hands": [[[0.51, 0.80], [0.49, 0.74], ...]]}
//! {"t": 0.066, "hands": []}
//! ```
//!
//! `hands` holds one list of `[x, y]` pairs per detected hand, indexed by
//! landmark id. `t` (seconds since the stream started) is optional.
//!
//! Landmarks are read leniently so that one bad point rejects its frame
//! instead of ending the stream: `NaN`/`Infinity` tokens and `null`
//! coordinates become NaN, extra coordinates (MediaPipe's `z`) are dropped,
//! and `{"x": .., "y": ..}` objects are accepted as well.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::{
    borrow::Cow,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackedFrame {
    #[serde(default)]
    pub t: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_hands")]
    pub hands: Vec<Vec<[f64; 2]>>,
}

fn deserialize_hands<'de, D>(deserializer: D) -> Result<Vec<Vec<[f64; 2]>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<Value>> = Deserialize::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .map(|hand| hand.iter().map(coords).collect())
        .collect())
}

/// `[x, y]` of one landmark; anything that is not a number reads as NaN
/// and is rejected later by frame validation.
fn coords(point: &Value) -> [f64; 2] {
    let num = |v: Option<&Value>| v.and_then(Value::as_f64).unwrap_or(f64::NAN);
    match point {
        Value::Array(xs) => [num(xs.first()), num(xs.get(1))],
        Value::Object(m) => [num(m.get("x")), num(m.get("y"))],
        _ => [f64::NAN, f64::NAN],
    }
}

/// Replace bare `NaN`, `Infinity` and `-Infinity` tokens (as written by
/// Python's `json.dumps`) with `null`. String literals are left alone.
fn null_non_finite(line: &str) -> Cow<'_, str> {
    if !line.contains("NaN") && !line.contains("Infinity") {
        return Cow::Borrowed(line);
    }
    let mut out = String::with_capacity(line.len());
    let mut in_str = false;
    let mut escaped = false;
    let mut rest = line;
    while let Some(c) = rest.chars().next() {
        if in_str {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_str = false;
            }
        } else if c == '"' {
            in_str = true;
        } else if let Some(tok) = ["-Infinity", "Infinity", "NaN"]
            .into_iter()
            .find(|t| rest.starts_with(t))
        {
            out.push_str("null");
            rest = &rest[tok.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(out)
}

pub trait LandmarkSource {
    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<TrackedFrame>>;
}

pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| anyhow!("failed to open {}: {e}", path.display()))?;
        Ok(Self::new(BufReader::new(f)))
    }
}

impl JsonLinesSource<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<TrackedFrame>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let txt = self.line.trim();
            if txt.is_empty() {
                continue;
            }
            let frame = serde_json::from_str(&null_non_finite(txt))
                .map_err(|e| anyhow!("landmark stream line {}: {e}", self.line_no))?;
            return Ok(Some(frame));
        }
    }
}
