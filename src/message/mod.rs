//! Message header parsing
//!
//! The engine never parses bodies; it only needs a header multimap, a date and
//! address lists.

pub mod address;
pub mod headers;

pub use address::{parse_address_list, parse_nonstandard_address, Address};
pub use headers::HeaderMap;
