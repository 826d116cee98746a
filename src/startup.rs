use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};

use crate::auth::AuthService;
use crate::error::AppError;
use crate::middleware::{AuthInterceptor, LoggingInterceptor};
use crate::posts::PostsService;
use crate::routes::{
    create_post, delete_post_by_id, get_post_by_id, get_posts_by_location, get_user_posts,
    health_check, login_user, refresh_user_token, registrate_user, update_post_by_id,
};

fn malformed_body(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::MalformedRequest(err.to_string()).into()
}

/// Register the RPC methods of both services
pub fn rpc_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth.AuthService")
            .route("/RegistrateUser", web::post().to(registrate_user))
            .route("/LoginUser", web::post().to(login_user))
            .route("/RefreshUserToken", web::post().to(refresh_user_token)),
    )
    .service(
        web::scope("/posts.PostsService")
            .route("/CreatePost", web::post().to(create_post))
            .route("/GetPostById", web::post().to(get_post_by_id))
            .route("/GetUserPosts", web::post().to(get_user_posts))
            .route("/GetPostsByLocation", web::post().to(get_posts_by_location))
            .route("/UpdatePostById", web::post().to(update_post_by_id))
            .route("/DeletePostById", web::post().to(delete_post_by_id)),
    );
}

pub fn run(
    listener: TcpListener,
    auth: Arc<AuthService>,
    posts: Arc<PostsService>,
) -> Result<Server, std::io::Error> {
    let auth_data = web::Data::from(auth.clone());
    let posts_data = web::Data::from(posts);

    let server = HttpServer::new(move || {
        App::new()
            // Shared state
            .app_data(auth_data.clone())
            .app_data(posts_data.clone())
            .app_data(web::JsonConfig::default().error_handler(malformed_body))

            // Operational probe, outside the interceptors
            .route("/health_check", web::get().to(health_check))

            // RPC surface: logging (outer) -> authorization (inner) -> handler
            .service(
                web::scope("")
                    .wrap(AuthInterceptor::new(auth.clone()))
                    .wrap(LoggingInterceptor)
                    .configure(rpc_routes),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
