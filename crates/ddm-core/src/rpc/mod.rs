//! Native-message RPC adaptor: length-prefixed JSON framing over a
//! stdin/stdout-shaped transport, consumed by the browser-extension
//! collaborator described in the external interfaces. Only the framing and
//! the minimum recognized request surface live here; everything else about
//! the extension (stream capture, manifest parsing) is out of scope.

mod dispatch;
mod framing;
mod message;

pub use dispatch::handle_request;
pub use framing::{read_message, write_message, MAX_MESSAGE_BYTES};
pub use message::{AddDownloadRequest, AddMediaDownloadRequest, Request, Response};
