//! Cross-file linking: the post-index phases that resolve relationships
//! no single-file parser can see (service grouping, router-mount
//! prefixes, API-call-to-endpoint matching, manifest binding, interface
//! implementation, test coverage), plus the indexing driver glue.

pub mod indexer;
pub mod linker;
pub mod phases;
pub mod url;

pub use indexer::{IndexError, IndexOutcome, IndexStats, Indexer};
pub use linker::{top_dir, LinkError, LinkReport, Linker};
pub use url::normalize_url;
