//! Paths into a value tree, used by the stream cursor to seek into
//! sub-values without materializing the whole tree.

use std::fmt;

/// One step of a [`ValuePath`]: either a compound key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A compound entry name.
    Name(String),
    /// An array element index.
    Index(u64),
}

impl From<&str> for PathSegment {
    fn from(segment: &str) -> Self {
        PathSegment::Name(segment.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(segment: String) -> Self {
        PathSegment::Name(segment)
    }
}

impl From<u64> for PathSegment {
    fn from(index: u64) -> Self {
        PathSegment::Index(index)
    }
}

/// A path into a value tree, e.g. `players/3/name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValuePath {
    segments: Vec<PathSegment>,
}

impl ValuePath {
    /// An empty path, pointing at the root value.
    pub fn new() -> Self {
        ValuePath::default()
    }

    /// Parse the legacy stringized form, with segments separated by
    /// `/`. Segments made only of ASCII digits become indices.
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                    match s.parse::<u64>() {
                        Ok(index) => PathSegment::Index(index),
                        Err(_) => PathSegment::Name(s.to_owned()),
                    }
                } else {
                    PathSegment::Name(s.to_owned())
                }
            })
            .collect();
        ValuePath { segments }
    }

    /// Append a compound key segment.
    pub fn push_name(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Name(name.into()));
        self
    }

    /// Append an array index segment.
    pub fn push_index(mut self, index: u64) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    /// The segments of this path, in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Whether this path points at the root value.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for ValuePath {
    fn from(path: &str) -> Self {
        ValuePath::parse(path)
    }
}

impl FromIterator<PathSegment> for ValuePath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        ValuePath {
            segments: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment {
                PathSegment::Name(name) => f.write_str(name)?,
                PathSegment::Index(index) => write!(f, "{}", index)?,
            }
        }
        Ok(())
    }
}
