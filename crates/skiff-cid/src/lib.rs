mod gateway;
mod parse;

pub use gateway::{gateway_urls, thumbnail_url, to_gateway_url, DEFAULT_GATEWAY, PUBLIC_GATEWAYS};
pub use parse::{extract_cid, is_valid_cid};
