// Small helpers used across the `libs` modules.

// Path expansion and webroot resolution.
pub mod path_helpers;
// Atomic writes and owner-only permissions.
pub mod file_operations;
pub mod timestamps;
