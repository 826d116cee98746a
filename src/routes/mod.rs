mod auth;
mod health_check;
mod posts;

pub use auth::{
    login_user, refresh_user_token, registrate_user, CredentialsRequest, MessageResponse,
    RefreshRequest, SessionResponse,
};
pub use health_check::health_check;
pub use posts::{
    create_post, delete_post_by_id, get_post_by_id, get_posts_by_location, get_user_posts,
    update_post_by_id, CreatePostRequest, LocationRequest, PostIdRequest, PostResponse,
    PostsResponse, UpdatePostRequest, UserPostsRequest,
};
