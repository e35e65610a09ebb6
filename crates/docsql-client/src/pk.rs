//! Partition key resolution and the argument-count convention.
//!
//! A write statement's partition key values come either from the statement
//! itself (derived) or from extra arguments appended after the placeholder
//! values (the deprecated trailing convention). [`PkArgs::dispatch`] is the
//! single place that tells the two apart.

use docsql_core::PkSource;
use serde_json::Value as JsonValue;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::rest::RestClient;

/// Partition key paths as far as a statement knows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkPaths<'a> {
    /// Named paths.
    Paths(&'a [String]),
    /// One unnamed path whose value is always passed positionally.
    Single,
}

impl PkPaths<'_> {
    /// Number of partition key values a document needs.
    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            Self::Paths(paths) => paths.len(),
            Self::Single => 1,
        }
    }
}

/// Per-statement cache of the collection's partition key paths.
///
/// Concurrent first use performs at most one lookup.
#[derive(Debug, Default)]
pub struct PkCache {
    paths: OnceCell<Vec<String>>,
}

impl PkCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once a lookup has succeeded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.paths.initialized()
    }

    /// Resolves the paths for `source`, asking the collaborator only for
    /// [`PkSource::Lookup`].
    pub async fn resolve<'a>(
        &'a self,
        client: &dyn RestClient,
        db_name: &str,
        coll_name: &str,
        source: &'a PkSource,
    ) -> Result<PkPaths<'a>> {
        match source {
            PkSource::Explicit(paths) => Ok(PkPaths::Paths(paths)),
            PkSource::SinglePath => Ok(PkPaths::Single),
            PkSource::Lookup => {
                let paths = self
                    .paths
                    .get_or_try_init(|| async {
                        debug!(db = db_name, coll = coll_name, "fetching partition key paths");
                        client
                            .get_collection_pk_paths(db_name, coll_name)
                            .await
                            .map_err(Error::from)
                    })
                    .await?;
                Ok(PkPaths::Paths(paths))
            }
        }
    }
}

/// How a statement's arguments split between placeholders and partition key values.
#[derive(Debug, Clone, PartialEq)]
pub enum PkArgs<'a> {
    /// Every argument binds a placeholder; partition key values come from the statement.
    Derived {
        /// Placeholder values.
        inputs: &'a [JsonValue],
    },
    /// Partition key values follow the placeholder values.
    Trailing {
        /// Placeholder values.
        inputs: &'a [JsonValue],
        /// Partition key values, one per path.
        pk_values: &'a [JsonValue],
    },
}

impl<'a> PkArgs<'a> {
    /// Decides the convention from the argument count.
    ///
    /// `num_inputs` arguments means derived; `num_inputs + num_pk_paths`
    /// means trailing, which is deprecated and logged. Anything else fails.
    pub fn dispatch(
        statement: &'static str,
        args: &'a [JsonValue],
        num_inputs: usize,
        num_pk_paths: usize,
    ) -> Result<Self> {
        if args.len() == num_inputs {
            return Ok(Self::Derived { inputs: args });
        }
        if args.len() == num_inputs + num_pk_paths {
            warn!(
                statement,
                trailing = num_pk_paths,
                "supplying partition key values at the end of the argument list is deprecated"
            );
            let (inputs, pk_values) = args.split_at(num_inputs);
            return Ok(Self::Trailing { inputs, pk_values });
        }
        Err(Error::PkArgumentCount {
            inputs: num_inputs,
            with_pk: num_inputs + num_pk_paths,
            got: args.len(),
        })
    }

    /// The placeholder values.
    #[must_use]
    pub const fn inputs(&self) -> &'a [JsonValue] {
        match self {
            Self::Derived { inputs } | Self::Trailing { inputs, .. } => inputs,
        }
    }
}

/// Derives one value per path with `lookup`, failing on the first path it cannot serve.
pub fn derive_pk_values(
    paths: PkPaths<'_>,
    mut lookup: impl FnMut(&str) -> Option<JsonValue>,
) -> Result<Vec<JsonValue>> {
    match paths {
        PkPaths::Single => Err(Error::MissingPkValue(
            "(single path, pass its value after the statement arguments)".into(),
        )),
        PkPaths::Paths(paths) => paths
            .iter()
            .map(|path| lookup(path).ok_or_else(|| Error::MissingPkValue(path.clone())))
            .collect(),
    }
}
