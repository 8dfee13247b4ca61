//! The seven ordered linker phases (spec'd execution order: services,
//! endpoints, api_calls, library_deps, import_deps, implements,
//! test_links). Each is individually idempotent.

pub(crate) mod api_calls;
pub(crate) mod endpoints;
pub(crate) mod implements;
pub(crate) mod import_deps;
pub(crate) mod library_deps;
pub(crate) mod services;
pub(crate) mod test_links;
