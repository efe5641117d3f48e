// ── Parameter expressions ──
//
// The value editor addresses a parameter through a parsed expression
// rather than its raw key. Parsing is memoized per exact key string in a
// bounded LRU so repeated renders of the same tree stay cheap.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use thiserror::Error;

/// Default number of distinct keys kept by [`ExpressionCache`].
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("empty expression")]
    Empty,

    #[error("invalid parameter path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
}

// ── Expression ──────────────────────────────────────────────────────

/// One dot-delimited component of a parameter path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Name(String),
    /// Numeric instance number (`Device.WiFi.1`).
    Index(u32),
    /// `*`, matching any single segment.
    Wildcard,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// A parsed parameter path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterPath {
    segments: Vec<PathSegment>,
}

impl ParameterPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.contains(&PathSegment::Wildcard)
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Structured form of a parameter-name string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Parameter(ParameterPath),
}

impl Expression {
    pub fn as_path(&self) -> &ParameterPath {
        match self {
            Self::Parameter(path) => path,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(path) => write!(f, "{path}"),
        }
    }
}

// ── Parsers ─────────────────────────────────────────────────────────

/// Turns a parameter-name string into an [`Expression`].
pub trait ExpressionParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Expression, ExpressionError>;
}

/// Parses plain dot-delimited parameter paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathParser;

impl ExpressionParser for PathParser {
    fn parse(&self, source: &str) -> Result<Expression, ExpressionError> {
        if source.trim().is_empty() {
            return Err(ExpressionError::Empty);
        }

        let invalid = |reason: &str| ExpressionError::InvalidPath {
            path: source.to_owned(),
            reason: reason.to_owned(),
        };

        let segments = source
            .split('.')
            .map(|segment| {
                if segment.is_empty() {
                    Err(invalid("empty segment"))
                } else if segment.chars().any(char::is_whitespace) {
                    Err(invalid("whitespace in segment"))
                } else if segment == "*" {
                    Ok(PathSegment::Wildcard)
                } else if segment.bytes().all(|b| b.is_ascii_digit()) {
                    segment
                        .parse()
                        .map(PathSegment::Index)
                        .map_err(|_| invalid("instance number out of range"))
                } else {
                    Ok(PathSegment::Name(segment.to_owned()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Expression::Parameter(ParameterPath { segments }))
    }
}

// ── ExpressionCache ─────────────────────────────────────────────────

/// Memoizing wrapper around an [`ExpressionParser`].
///
/// Keyed by the exact source string. Bounded: once `capacity` distinct
/// keys are held, the least recently used entry is evicted. Failed parses
/// are returned to the caller and never cached.
pub struct ExpressionCache<P = PathParser> {
    parser: P,
    capacity: usize,
    entries: Mutex<IndexMap<String, Arc<Expression>>>,
}

impl ExpressionCache<PathParser> {
    pub fn new(capacity: usize) -> Self {
        Self::with_parser(PathParser, capacity)
    }
}

impl Default for ExpressionCache<PathParser> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<P: ExpressionParser> ExpressionCache<P> {
    pub fn with_parser(parser: P, capacity: usize) -> Self {
        Self {
            parser,
            capacity: capacity.max(1),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Parse `source`, returning the cached expression when available.
    pub fn parse(&self, source: &str) -> Result<Arc<Expression>, ExpressionError> {
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(index) = entries.get_index_of(source) {
                // Most recently used lives at the back.
                let last = entries.len() - 1;
                entries.move_index(index, last);
                if let Some((_, expr)) = entries.get_index(last) {
                    return Ok(Arc::clone(expr));
                }
            }
        }

        let parsed = Arc::new(self.parser.parse(source)?);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(source) && entries.len() >= self.capacity {
            entries.shift_remove_index(0);
        }
        entries.insert(source.to_owned(), Arc::clone(&parsed));
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(source)
    }
}
