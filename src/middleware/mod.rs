/// Middleware module
///
/// RPC interceptors: logging wraps everything, authorization gates the
/// service methods.

mod auth_interceptor;
mod logging_interceptor;

pub use auth_interceptor::{method_name, parse_bearer, AuthInterceptor, PUBLIC_METHODS};
pub use logging_interceptor::{LoggingInterceptor, REQUEST_ID_HEADER};
