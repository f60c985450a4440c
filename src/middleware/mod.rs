mod cors;
mod error_handler;
mod rate_limit;

pub use cors::{
    ALLOW_HEADERS, ALLOW_METHODS, MAX_AGE_SECS, apply_cors, preflight, shape, shape_response,
};
pub use error_handler::log_errors;
pub use rate_limit::{Admission, RateLimiter, rate_limit};
