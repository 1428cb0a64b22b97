//! Wire codecs.
//!
//! Two independent encodings share one in-memory model: [`binary`] for
//! inter-process request/response traffic and [`structured`] for document
//! storage and REST I/O.

pub mod binary;
pub mod structured;

pub use binary::{Readable, StreamInput, StreamOutput, Writeable};
pub use structured::{FromStructured, ToStructured};
