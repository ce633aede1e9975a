//! Helpers shared by the integration crates
//!
//! - [`slugify`], [`ensure_unique_string`] - building entity ids from names
//! - [`sanitize_filename`], [`sanitize_path`] - rejecting path traversal
//! - [`convert`], [`convert_to_int`] - lenient parsing with defaults
//! - [`Throttle`] - rate limiting calls to a device
//! - [`format_mac`] - canonical MAC addresses for unique ids

mod convert;
mod mac;
mod text;
mod throttle;

pub use convert::{convert, convert_to_int, IntSource};
pub use mac::format_mac;
pub use text::{
    ensure_unique_string, get_random_string, raise_if_invalid_filename, raise_if_invalid_path,
    sanitize_filename, sanitize_path, slugify,
};
pub use throttle::Throttle;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UtilError {
    #[error("{0} is not a safe filename")]
    InvalidFilename(String),

    #[error("{0} is not a safe path")]
    InvalidPath(String),
}
