// Register application subcommands.
// Each module corresponds to a specific `serverbox` command-line action.

// `config get/set/keys` on a server config file.
pub mod config;
// Writes an instance's server.xml and supporting files.
pub mod provision;
// Lists installable runtime versions.
pub mod versions;
