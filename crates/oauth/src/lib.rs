pub mod refresh;
pub mod types;

pub use {
    refresh::{GRANT_TYPE, ThreadsRefresher, http_client},
    types::{RefreshedToken, UpstreamResponse, mask_token},
};
