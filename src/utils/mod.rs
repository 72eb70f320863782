pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::{encode_rfc2047, random_id};
pub use url_utils::{host_of, is_valid_url, origin_of, strip_proxy_host};
