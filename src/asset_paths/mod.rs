//! Helpers for resolving stylesheet asset references to files and public URL paths.
//!
//! Filtering of references that must never be rewritten, filesystem resolution and the
//! public-root suffix live in separate submodules so each can be tested on its own.

mod filters;
mod public;
mod resolve;

pub use filters::should_skip_rewrite;
pub use public::public_path_suffix;
pub use resolve::{normalize_path, resolve_asset_path};
