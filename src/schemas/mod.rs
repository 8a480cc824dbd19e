// Data structures shared by the library and the CLI.

// The declarative server instance model (`lucee.json`).
pub mod server_config;
// The version cache file and the registry response.
pub mod version_cache;
