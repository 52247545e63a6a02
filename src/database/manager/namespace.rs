//! Random schema names for per-test isolation inside a shared cluster

use rand::Rng;
use std::fmt;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Shortest generated name
pub const MIN_NAMESPACE_LEN: usize = 9;
/// Longest generated name
pub const MAX_NAMESPACE_LEN: usize = 10;

/// A lowercase alphabetic schema name, safe to splice into SQL unquoted
///
/// Generation does not check the cluster for an existing schema of the same
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaNamespace(String);

impl SchemaNamespace {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let len = rng.random_range(MIN_NAMESPACE_LEN..=MAX_NAMESPACE_LEN);
        let name = (0..len)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        SchemaNamespace(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_shape() {
        for _ in 0..200 {
            let ns = SchemaNamespace::generate();
            let len = ns.as_str().len();
            assert!((MIN_NAMESPACE_LEN..=MAX_NAMESPACE_LEN).contains(&len));
            assert!(ns.as_str().bytes().all(|b| b.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_generated_names_differ() {
        let a = SchemaNamespace::generate();
        let b = SchemaNamespace::generate();
        assert_ne!(a, b);
    }
}
