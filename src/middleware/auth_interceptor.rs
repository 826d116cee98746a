/// Authorization gate for RPC calls
///
/// Every call except the credential-issuing methods must carry
/// `Authorization: Bearer <access token>`. The resolved user is attached to
/// the request extensions as an `AuthenticatedIdentity`.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;

use crate::auth::AuthService;
use crate::error::AppError;

/// Full paths of the methods whose purpose is to obtain credentials
pub const PUBLIC_METHODS: [&str; 3] = [
    "/auth.AuthService/RegistrateUser",
    "/auth.AuthService/LoginUser",
    "/auth.AuthService/RefreshUserToken",
];

/// RPC method name: the last path segment
pub fn method_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Extract the token from a `Bearer <token>` header value.
///
/// Exactly two space-separated parts, the first literally `Bearer`.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

pub struct AuthInterceptor {
    auth: Arc<AuthService>,
    public_methods: &'static [&'static str],
}

impl AuthInterceptor {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            public_methods: &PUBLIC_METHODS,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthInterceptor
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthInterceptorService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthInterceptorService {
            service: Rc::new(service),
            auth: self.auth.clone(),
            public_methods: self.public_methods,
        }))
    }
}

pub struct AuthInterceptorService<S> {
    service: Rc<S>,
    auth: Arc<AuthService>,
    public_methods: &'static [&'static str],
}

fn reject<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
    let (req, _) = req.into_parts();
    ServiceResponse::new(req, HttpResponse::from_error(AppError::InvalidToken)).map_into_right_body()
}

impl<S, B> Service<ServiceRequest> for AuthInterceptorService<S>
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
        let service = self.service.clone();

        if self.public_methods.iter().any(|m| *m == req.path()) {
            return Box::pin(async move { Ok(service.call(req).await?.map_into_left_body()) });
        }

        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_bearer)
            .map(str::to_string);
        let auth = self.auth.clone();

        Box::pin(async move {
            let token = match token {
                Some(token) => token,
                None => {
                    tracing::warn!(method = %method_name(req.path()), "Missing or malformed Authorization header");
                    return Ok(reject(req));
                }
            };

            match auth.authorize(&token).await {
                Ok(identity) => {
                    tracing::debug!(user_id = %identity.user_id(), "Access token accepted");
                    req.extensions_mut().insert(identity);
                    Ok(service.call(req).await?.map_into_left_body())
                }
                Err(e) => {
                    // the precise cause stays in the logs
                    tracing::warn!(method = %method_name(req.path()), error = ?e, "Authorization failed");
                    Ok(reject(req))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_name_is_last_segment() {
        assert_eq!(method_name("/auth.AuthService/LoginUser"), "LoginUser");
        assert_eq!(method_name("/posts.PostsService/CreatePost"), "CreatePost");
        assert_eq!(method_name("LoginUser"), "LoginUser");
    }

    #[test]
    fn test_allow_list_is_exact() {
        assert!(PUBLIC_METHODS.contains(&"/auth.AuthService/RegistrateUser"));
        assert!(!PUBLIC_METHODS.contains(&"/auth.AuthService/LoginUserExtra"));
        assert!(!PUBLIC_METHODS.contains(&"/posts.PostsService/LoginUser"));
        assert!(!PUBLIC_METHODS.contains(&"/anything/RegistrateUser"));
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_bearer("bearer abc"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer a b"), None);
        assert_eq!(parse_bearer("Bearer  abc"), None);
        assert_eq!(parse_bearer("Basic abc"), None);
    }
}
