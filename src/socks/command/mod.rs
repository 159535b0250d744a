//! SOCKS5 command module
//!
//! Handles parsing SOCKS5 requests and building replies.

mod parser;
mod reply;

pub use parser::ConnectionRequest;
pub use reply::{send_failure, send_success, ConnectionReply};
