//! Authentication layers for [`HttpClient`](super::HttpClient).

mod api_key;
mod token;

pub use api_key::ApiKey;
pub use token::{
    ANALYTICS_READONLY_SCOPE, AuthorizedUser, Credentials, ServiceAccount, exchange_refresh_token,
    exchange_service_account, fetch_access_token, sign_assertion,
};
