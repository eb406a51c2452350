// z21-core: the synchronous face of an asynchronous station.
//
// A Z21 pushes unsolicited broadcasts and request replies interleaved on
// one UDP stream. This crate owns the three algorithms that make that
// usable from a CLI: request/reply correlation with a bounded wait,
// time-windowed CAN discovery, and session resumption by local-endpoint
// reuse.

pub mod correlator;
pub mod discovery;
pub mod error;
pub mod ranges;
pub mod session;

pub use discovery::{Detector, DetectorPort};
pub use error::CoreError;
pub use ranges::format_port_ranges;
pub use session::{Session, SessionDescriptor};
