//! Structured cache keys with token-wise prefix matching.

use std::fmt;

/// Ordered sequence of tokens identifying one piece of server state.
///
/// Keys sharing a prefix form an invalidation family: `["jobs"]` covers
/// `["jobs", "byId", "42"]` but not `["jobs2"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Vec<String>);

/// Shape of the operation a key is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
  /// `[domain]`
  List,
  /// `[domain, qualifier]`
  Qualified(&'a str),
  /// `[domain, "byId", id]`
  ById(&'a str),
  /// `[domain, id, relation]`
  Related { id: &'a str, relation: &'a str },
}

impl CacheKey {
  pub fn new<I, S>(tokens: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(tokens.into_iter().map(Into::into).collect())
  }

  /// Build the key for an operation on a domain.
  pub fn for_operation(domain: &str, operation: Operation<'_>) -> Self {
    match operation {
      Operation::List => Self::new([domain]),
      Operation::Qualified(qualifier) => Self::new([domain, qualifier]),
      Operation::ById(id) => Self::new([domain, "byId", id]),
      Operation::Related { id, relation } => Self::new([domain, id, relation]),
    }
  }

  /// Extend this key with one more token.
  pub fn child(&self, token: impl Into<String>) -> Self {
    let mut tokens = self.0.clone();
    tokens.push(token.into());
    Self(tokens)
  }

  pub fn tokens(&self) -> &[String] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// True when every token of `self` matches the leading tokens of `other`.
  /// A key is a prefix of itself; the empty key is a prefix of every key.
  pub fn is_prefix_of(&self, other: &CacheKey) -> bool {
    other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
  }
}

impl<const N: usize> From<[&str; N]> for CacheKey {
  fn from(tokens: [&str; N]) -> Self {
    Self::new(tokens)
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[")?;
    for (i, token) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{:?}", token)?;
    }
    f.write_str("]")
  }
}
