// Server module entry point
// Listener creation, the accept loop, and per-connection HTTP serving

pub mod connection;
pub mod listener;

// `loop` is a keyword, so the file is mounted under another name
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::{bind, create_reusable_listener, resolve_addr};
pub use server_loop::serve;
