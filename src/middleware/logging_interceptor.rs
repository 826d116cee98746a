use std::rc::Rc;
use std::time::Instant;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth_interceptor::method_name;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Outermost RPC middleware.
///
/// Tags each call with a request id, logs its start and outcome, and makes
/// sure nothing but an `AppError` leaves the process as an error.
pub struct LoggingInterceptor;

impl<S, B> Transform<S, ServiceRequest> for LoggingInterceptor
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggingInterceptorService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggingInterceptorService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggingInterceptorService<S> {
    service: Rc<S>,
}

/// Replace anything that is not an `AppError` with an internal failure
fn coerce(err: Error) -> Error {
    if err.as_error::<AppError>().is_some() {
        err
    } else {
        AppError::internal(err.to_string()).into()
    }
}

impl<S, B> Service<ServiceRequest> for LoggingInterceptorService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let method = method_name(req.path()).to_string();
        let span = tracing::info_span!("rpc", request_id = %request_id, method = %method);
        let service = self.service.clone();

        Box::pin(
            async move {
                tracing::info!("rpc request started");

                let res = match service.call(req).await {
                    Ok(res) => res,
                    Err(e) => {
                        let e = coerce(e);
                        tracing::error!(
                            duration_ms = start_time.elapsed().as_millis() as u64,
                            error = %e,
                            "rpc request failed"
                        );
                        return Err(e);
                    }
                };

                let unrecognized = res
                    .response()
                    .error()
                    .map(|e| e.as_error::<AppError>().is_none())
                    .unwrap_or(false);

                let mut res = if unrecognized {
                    let detail = res
                        .response()
                        .error()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    let (req, _) = res.into_parts();
                    let response = HttpResponse::from_error(AppError::internal(detail));
                    ServiceResponse::new(req, response).map_into_right_body()
                } else {
                    res.map_into_left_body()
                };

                let duration_ms = start_time.elapsed().as_millis() as u64;
                let status = res.status().as_u16();
                match res.response().error().and_then(|e| e.as_error::<AppError>()) {
                    Some(app_error) => tracing::warn!(
                        status,
                        duration_ms,
                        code = app_error.code(),
                        "rpc request failed"
                    ),
                    None => tracing::info!(status, duration_ms, "rpc request completed"),
                }

                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    res.headers_mut()
                        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                }
                Ok(res)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_keeps_app_errors() {
        let err: Error = AppError::InvalidToken.into();
        let err = coerce(err);
        assert!(matches!(err.as_error::<AppError>(), Some(AppError::InvalidToken)));
    }

    #[test]
    fn test_coerce_wraps_foreign_errors() {
        let err = actix_web::error::ErrorBadGateway("upstream exploded");
        let err = coerce(err);
        let app_error = err.as_error::<AppError>().unwrap();
        assert!(app_error.is_internal());
        assert_eq!(app_error.to_string(), "error: internal server error");
    }
}
