// server.xml handling: an owned XML tree, the individual mutations, and the
// patcher that strings them together for a `ServerConfig`.

pub mod patcher;
pub mod transforms;
pub mod tree;

pub use patcher::ServerXmlPatcher;
pub use tree::{Document, Element, Node};
