//! # Streams with an observable lifecycle.
//!
//! Jobs signal completion through these types when they produce or consume data:
//! - [`Readable`] pull-based source backed by a bounded buffer (`high_water_mark`)
//! - [`Writable`] push-based sink flushing into any [`futures::Sink`]
//! - [`Duplex`] both at once; completes with its writable side
//!
//! Each exposes a passive [`StateWatch`] reporting [`StreamState`] without touching data.

mod duplex;
mod readable;
mod state;
mod writable;

pub use duplex::Duplex;
pub use readable::{DEFAULT_HIGH_WATER_MARK, ReadStream, Readable};
pub use state::{StateWatch, StreamState};
pub use writable::Writable;
