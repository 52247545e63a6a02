//! Schema and fixture resource bundle
//!
//! A `SchemaBundle` is an immutable, name-keyed table of SQL text. The embedded
//! bundle is compiled into the binary; [`SchemaBundle::from_dir`] loads the
//! same layout from disk so a full upstream chado DDL can be swapped in.
//!
//! Layout:
//!
//! ```text
//! chado.sqlite        # DDL for the SQLite backend
//! chado.postgres      # DDL for the PostgreSQL backend
//! default.sql         # default fixture
//! <preset>.sql        # named preset fixtures
//! <driver>/<name>     # optional per-backend override of any entry
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::Driver;
use crate::error::{ChadoError, Result};

/// Key of the default fixture
pub const DEFAULT_FIXTURE: &str = "default";

const EMBEDDED: &[(&str, &str)] = &[
    (
        "chado.sqlite",
        include_str!("../../../resources/chado/chado.sqlite"),
    ),
    (
        "chado.postgres",
        include_str!("../../../resources/chado/chado.postgres"),
    ),
    (
        "default.sql",
        include_str!("../../../resources/fixtures/default.sql"),
    ),
    (
        "cvprop.sql",
        include_str!("../../../resources/fixtures/cvprop.sql"),
    ),
    ("eco.sql", include_str!("../../../resources/fixtures/eco.sql")),
];

/// Read-only lookup from entry name to SQL text
#[derive(Debug, Clone)]
pub struct SchemaBundle {
    entries: BTreeMap<String, String>,
}

impl SchemaBundle {
    /// The bundle compiled into this crate
    pub fn embedded() -> Self {
        Self::from_entries(EMBEDDED.iter().copied())
    }

    /// Build a bundle from `(name, content)` pairs
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        SchemaBundle {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Load every file of `dir`, plus one level of per-driver subdirectories
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut entries = BTreeMap::new();
        read_dir_into(dir, None, &mut entries)?;
        Ok(SchemaBundle { entries })
    }

    /// Exact-name lookup; an absent entry yields empty content
    pub fn entry(&self, name: &str) -> &str {
        self.entries.get(name).map(String::as_str).unwrap_or("")
    }

    /// Lookup preferring the `<driver>/<name>` override over the shared entry
    pub fn resolve(&self, driver: Driver, name: &str) -> &str {
        let scoped = format!("{}/{}", driver.as_str(), name);
        match self.entries.get(&scoped) {
            Some(content) => content.as_str(),
            None => self.entry(name),
        }
    }

    /// Full schema DDL for `driver`, keyed as `chado.<driver>`
    pub fn schema_ddl(&self, driver: Driver) -> Result<&str> {
        let name = format!("chado.{}", driver.as_str());
        let ddl = self.resolve(driver, &name);
        if ddl.trim().is_empty() {
            return Err(ChadoError::schema(
                "deploy",
                format!("no DDL found for '{}'", name),
            ));
        }
        Ok(ddl)
    }

    /// Fixture text for `name` (without the `.sql` suffix)
    pub fn fixture(&self, driver: Driver, name: &str) -> Result<&str> {
        let content = self.resolve(driver, &format!("{}.sql", name));
        if content.trim().is_empty() {
            return Err(ChadoError::FixtureNotFound(name.to_string()));
        }
        Ok(content)
    }

    /// Entry names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::embedded()
    }
}

fn read_dir_into(
    dir: &Path,
    prefix: Option<&str>,
    entries: &mut BTreeMap<String, String>,
) -> Result<()> {
    let listing = fs::read_dir(dir).map_err(|e| {
        ChadoError::Configuration(format!(
            "unable to open bundle directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    for item in listing {
        let item = item.map_err(|e| {
            ChadoError::Configuration(format!("unable to read bundle entry: {}", e))
        })?;
        let path = item.path();
        let file_name = item.file_name().to_string_lossy().to_string();

        if path.is_dir() {
            if prefix.is_none() {
                read_dir_into(&path, Some(&file_name), entries)?;
            }
            continue;
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            ChadoError::Configuration(format!(
                "unable to read bundle file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let key = match prefix {
            Some(p) => format!("{}/{}", p, file_name),
            None => file_name,
        };
        entries.insert(key, content);
    }
    Ok(())
}
