//! Shared utilities for diffserv.

pub mod addr;
pub mod names;
pub mod parse;
pub mod rate;

pub use addr::{in_prefix, parse_addr, parse_prefix};
pub use parse::{get_bucket_size, get_port_range, get_rate, get_u8, get_u16, get_u32, get_u64};
pub use rate::InformationRate;
