//! HTTP surface of the social layer.
//!
//! Handlers stay thin: pull the requester and path/body values out of the
//! request, run the matching `SocialStore` operation on the blocking pool, and
//! wrap the result in the standard envelope
//! `{statusCode, data, message, success}`.
//!
//! Authentication happens upstream. The auth proxy forwards the caller's id in
//! the `x-user-id` header and the [`Requester`] extractor turns it into an
//! explicit parameter for every engine call.

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task;
use tracing::{debug, error};

use crate::{
    ObjectId, SocialError, SocialStore,
    comments::{Comment, ContentBody},
    content::ContentKind,
    dashboard::{ChannelStats, ChannelVideo},
    error::SocialResult,
    likes::{LikeState, LikeToggle, LikedVideo},
    pagination::{Page, PageParams, PageRequest},
    subscriptions::{ChannelList, SubscriberList, SubscriptionState, SubscriptionToggle},
    tweets::Tweet,
    users::UserProfile,
    videos::{NewVideo, Video, VideoListParams, VideoQuery, VideoUpdate},
};

/// Header carrying the authenticated user id, set by the auth proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    store: SocialStore,
}

impl AppState {
    pub fn new(store: SocialStore) -> Self {
        Self { store }
    }

    /// Runs a blocking store operation off the async workers.
    async fn run<F, T>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&SocialStore) -> SocialResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        task::spawn_blocking(move || op(&store))
            .await
            .map_err(|err| ApiError::internal(format!("task join error: {err}")))?
            .map_err(ApiError::from)
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Logs `detail` and hides it from the caller.
    fn internal(detail: impl Into<String>) -> Self {
        let detail: String = detail.into();
        error!(%detail, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
    }
}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::InvalidArgument(message) => Self::new(StatusCode::BAD_REQUEST, message),
            SocialError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            SocialError::PermissionDenied(message) => Self::new(StatusCode::FORBIDDEN, message),
            SocialError::Internal(err) => Self::internal(format!("{err:#}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "statusCode": self.status.as_u16(),
            "data": null,
            "message": self.message,
            "errors": [],
            "success": false,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(reason = %rejection.body_text(), "rejected request body");
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => "Request body must be JSON",
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
            JsonRejection::JsonDataError(_) => "Request body has invalid fields",
            _ => "Invalid request body",
        };
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(reason = %rejection.body_text(), "rejected query string");
        Self::new(StatusCode::BAD_REQUEST, "Invalid query parameters")
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!(reason = %rejection.body_text(), "rejected path parameters");
        Self::new(StatusCode::BAD_REQUEST, "Invalid path parameters")
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body whose rejections use the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string whose rejections use the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// Path parameters whose rejections use the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// Success envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(skip)]
    pub status: StatusCode,
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status,
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: true,
        }
    }

    fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Data payload for deletions and other responses with nothing to return.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Empty {}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester(pub ObjectId);

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        let raw = value
            .to_str()
            .map_err(|_| ApiError::from(SocialError::invalid("Invalid user ID")))?;
        Ok(Self(ObjectId::parse_labeled(raw.trim(), "user")?))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/videos", get(list_videos).post(publish_video))
        .route(
            "/videos/{video_id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/videos/{video_id}/publish", patch(toggle_publish_status))
        .route(
            "/videos/{video_id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/videos/{video_id}/like", post(toggle_video_like))
        .route(
            "/comments/{comment_id}",
            patch(update_comment).delete(delete_comment),
        )
        .route("/comments/{comment_id}/like", post(toggle_comment_like))
        .route("/tweets", post(create_tweet))
        .route(
            "/tweets/{tweet_id}",
            get(get_tweet).patch(update_tweet).delete(delete_tweet),
        )
        .route("/tweets/{tweet_id}/like", post(toggle_tweet_like))
        .route("/likes/videos", get(list_liked_videos))
        .route("/channels/{channel_id}/subscribe", post(toggle_subscription))
        .route("/channels/{channel_id}/subscribers", get(list_subscribers))
        .route("/users/me", put(sync_profile))
        .route(
            "/users/{user_id}/subscriptions",
            get(list_subscribed_channels),
        )
        .route("/users/{user_id}/tweets", get(list_user_tweets))
        .route("/dashboard/stats", get(channel_stats))
        .route("/dashboard/videos", get(channel_videos))
        .fallback(route_not_found)
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found")
}

async fn list_comments(
    State(state): State<AppState>,
    PathParam(video_id): PathParam<String>,
    QueryParams(params): QueryParams<PageParams>,
) -> ApiResult<ApiResponse<Page<Comment>>> {
    let page = PageRequest::from_params(&params);
    let comments = state
        .run(move |store| store.list_comments(&video_id, page))
        .await?;
    let message = if comments.docs.is_empty() {
        "No comments found for this video"
    } else {
        "Video comments fetched successfully"
    };
    Ok(ApiResponse::ok(comments, message))
}

async fn add_comment(
    State(state): State<AppState>,
    Requester(author): Requester,
    PathParam(video_id): PathParam<String>,
    JsonBody(body): JsonBody<ContentBody>,
) -> ApiResult<ApiResponse<Comment>> {
    let comment = state
        .run(move |store| store.add_comment(&video_id, author, &body.content))
        .await?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

async fn update_comment(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(comment_id): PathParam<String>,
    JsonBody(body): JsonBody<ContentBody>,
) -> ApiResult<ApiResponse<Comment>> {
    let comment = state
        .run(move |store| store.update_comment(&comment_id, requester, &body.content))
        .await?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

async fn delete_comment(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(comment_id): PathParam<String>,
) -> ApiResult<ApiResponse<Empty>> {
    state
        .run(move |store| store.delete_comment(&comment_id, requester))
        .await?;
    Ok(ApiResponse::ok(Empty {}, "Comment deleted successfully"))
}

async fn toggle_video_like(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(video_id): PathParam<String>,
) -> ApiResult<ApiResponse<LikeToggle>> {
    toggle_like(state, requester, ContentKind::Video, video_id).await
}

async fn toggle_comment_like(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(comment_id): PathParam<String>,
) -> ApiResult<ApiResponse<LikeToggle>> {
    toggle_like(state, requester, ContentKind::Comment, comment_id).await
}

async fn toggle_tweet_like(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(tweet_id): PathParam<String>,
) -> ApiResult<ApiResponse<LikeToggle>> {
    toggle_like(state, requester, ContentKind::Tweet, tweet_id).await
}

/// 201 when the call created a like, 200 when it removed one.
async fn toggle_like(
    state: AppState,
    requester: ObjectId,
    kind: ContentKind,
    target_id: String,
) -> ApiResult<ApiResponse<LikeToggle>> {
    let toggle = state
        .run(move |store| store.toggle_like(requester, kind, &target_id))
        .await?;
    let noun = match kind {
        ContentKind::Video => "Video",
        ContentKind::Comment => "Comment",
        ContentKind::Tweet => "Tweet",
    };
    Ok(match toggle.state {
        LikeState::Liked => ApiResponse::created(toggle, format!("{noun} liked successfully")),
        LikeState::Unliked => ApiResponse::ok(toggle, format!("{noun} unliked successfully")),
    })
}

async fn list_liked_videos(
    State(state): State<AppState>,
    Requester(requester): Requester,
) -> ApiResult<ApiResponse<Vec<LikedVideo>>> {
    let liked = state
        .run(move |store| store.list_liked_videos(requester))
        .await?;
    let message = if liked.is_empty() {
        "No liked videos found"
    } else {
        "Liked videos fetched successfully"
    };
    Ok(ApiResponse::ok(liked, message))
}

async fn toggle_subscription(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(channel_id): PathParam<String>,
) -> ApiResult<ApiResponse<SubscriptionToggle>> {
    let toggle = state
        .run(move |store| store.toggle_subscription(requester, &channel_id))
        .await?;
    Ok(match toggle.state {
        SubscriptionState::Subscribed => ApiResponse::created(toggle, "Subscribed successfully"),
        SubscriptionState::Unsubscribed => ApiResponse::ok(toggle, "Unsubscribed successfully"),
    })
}

async fn list_subscribers(
    State(state): State<AppState>,
    PathParam(channel_id): PathParam<String>,
) -> ApiResult<ApiResponse<SubscriberList>> {
    let subscribers = state
        .run(move |store| store.list_subscribers(&channel_id))
        .await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

async fn list_subscribed_channels(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<String>,
) -> ApiResult<ApiResponse<ChannelList>> {
    let channels = state
        .run(move |store| store.list_subscribed_channels(&user_id))
        .await?;
    Ok(ApiResponse::ok(
        channels,
        "Subscribed channels fetched successfully",
    ))
}

async fn create_tweet(
    State(state): State<AppState>,
    Requester(owner): Requester,
    JsonBody(body): JsonBody<ContentBody>,
) -> ApiResult<ApiResponse<Tweet>> {
    let tweet = state
        .run(move |store| store.create_tweet(owner, &body.content))
        .await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

async fn get_tweet(
    State(state): State<AppState>,
    PathParam(tweet_id): PathParam<String>,
) -> ApiResult<ApiResponse<Tweet>> {
    let tweet = state.run(move |store| store.get_tweet(&tweet_id)).await?;
    Ok(ApiResponse::ok(tweet, "Tweet fetched successfully"))
}

async fn list_user_tweets(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<String>,
) -> ApiResult<ApiResponse<Vec<Tweet>>> {
    let tweets = state
        .run(move |store| store.list_user_tweets(&user_id))
        .await?;
    let message = if tweets.is_empty() {
        "No tweets found for this user"
    } else {
        "User tweets fetched successfully"
    };
    Ok(ApiResponse::ok(tweets, message))
}

async fn update_tweet(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(tweet_id): PathParam<String>,
    JsonBody(body): JsonBody<ContentBody>,
) -> ApiResult<ApiResponse<Tweet>> {
    let tweet = state
        .run(move |store| store.update_tweet(&tweet_id, requester, &body.content))
        .await?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

async fn delete_tweet(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(tweet_id): PathParam<String>,
) -> ApiResult<ApiResponse<Empty>> {
    state
        .run(move |store| store.delete_tweet(&tweet_id, requester))
        .await?;
    Ok(ApiResponse::ok(Empty {}, "Tweet deleted successfully"))
}

async fn list_videos(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<VideoListParams>,
) -> ApiResult<ApiResponse<Page<Video>>> {
    let query = VideoQuery::from_params(&params)?;
    let videos = state.run(move |store| store.list_videos(&query)).await?;
    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

async fn publish_video(
    State(state): State<AppState>,
    Requester(owner): Requester,
    JsonBody(body): JsonBody<NewVideo>,
) -> ApiResult<ApiResponse<Video>> {
    let video = state
        .run(move |store| store.publish_video(owner, &body))
        .await?;
    Ok(ApiResponse::created(video, "Video published successfully"))
}

async fn get_video(
    State(state): State<AppState>,
    PathParam(video_id): PathParam<String>,
) -> ApiResult<ApiResponse<Video>> {
    let video = state.run(move |store| store.get_video(&video_id)).await?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

async fn update_video(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(video_id): PathParam<String>,
    JsonBody(body): JsonBody<VideoUpdate>,
) -> ApiResult<ApiResponse<Video>> {
    let video = state
        .run(move |store| store.update_video(&video_id, requester, &body))
        .await?;
    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

async fn delete_video(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(video_id): PathParam<String>,
) -> ApiResult<ApiResponse<Empty>> {
    state
        .run(move |store| store.delete_video(&video_id, requester))
        .await?;
    Ok(ApiResponse::ok(Empty {}, "Video deleted successfully"))
}

async fn toggle_publish_status(
    State(state): State<AppState>,
    Requester(requester): Requester,
    PathParam(video_id): PathParam<String>,
) -> ApiResult<ApiResponse<Video>> {
    let video = state
        .run(move |store| store.toggle_publish_status(&video_id, requester))
        .await?;
    Ok(ApiResponse::ok(
        video,
        "Video publish status updated successfully",
    ))
}

async fn channel_stats(
    State(state): State<AppState>,
    Requester(owner): Requester,
) -> ApiResult<ApiResponse<ChannelStats>> {
    let stats = state
        .run(move |store| store.get_channel_stats(owner))
        .await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

async fn channel_videos(
    State(state): State<AppState>,
    Requester(owner): Requester,
) -> ApiResult<ApiResponse<Vec<ChannelVideo>>> {
    let videos = state
        .run(move |store| store.get_channel_videos(owner))
        .await?;
    let message = if videos.is_empty() {
        "No videos found for this channel"
    } else {
        "Channel videos fetched successfully"
    };
    Ok(ApiResponse::ok(videos, message))
}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

/// Lets the identity layer push the caller's current profile so owner and
/// subscriber projections stay fresh.
async fn sync_profile(
    State(state): State<AppState>,
    Requester(requester): Requester,
    JsonBody(body): JsonBody<ProfileBody>,
) -> ApiResult<ApiResponse<UserProfile>> {
    let profile = UserProfile {
        id: requester,
        username: body.username,
        email: body.email,
        avatar: body.avatar,
    };
    let stored = state
        .run(move |store| store.upsert_user(&profile))
        .await?;
    Ok(ApiResponse::ok(stored, "Profile synced successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use serde_json::Value;
    use tempfile::TempDir;

    use crate::store::test_support::{seed_user, temp_store};

    struct ApiTestContext {
        _temp: TempDir,
        store: SocialStore,
        state: AppState,
    }

    impl ApiTestContext {
        fn new() -> Self {
            let (temp, store) = temp_store();
            Self {
                state: AppState::new(store.clone()),
                store,
                _temp: temp,
            }
        }

        fn state(&self) -> State<AppState> {
            State(self.state.clone())
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn content(text: &str) -> JsonBody<ContentBody> {
        JsonBody(ContentBody {
            content: text.into(),
        })
    }

    #[tokio::test]
    async fn tweet_scenario_maps_statuses() {
        let ctx = ApiTestContext::new();
        let alice = seed_user(&ctx.store, "alice");
        let bob = seed_user(&ctx.store, "bob");

        let created = create_tweet(ctx.state(), Requester(alice), content("hello"))
            .await
            .unwrap();
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.data.content, "hello");
        assert_eq!(created.data.owner.id, alice);
        let tweet_id = created.data.id.to_string();

        let err = update_tweet(
            ctx.state(),
            Requester(bob),
            PathParam(tweet_id.clone()),
            content("nope"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let updated = update_tweet(
            ctx.state(),
            Requester(alice),
            PathParam(tweet_id.clone()),
            content("hi"),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, StatusCode::OK);
        assert_eq!(updated.data.content, "hi");
        assert!(updated.data.updated_at >= created.data.updated_at);

        let deleted = delete_tweet(ctx.state(), Requester(alice), PathParam(tweet_id.clone()))
            .await
            .unwrap();
        assert_eq!(deleted.status, StatusCode::OK);

        let err = get_tweet(ctx.state(), PathParam(tweet_id)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn like_toggle_returns_created_then_ok() {
        let ctx = ApiTestContext::new();
        let alice = seed_user(&ctx.store, "alice");
        let video_id = ObjectId::new().to_string();

        let liked = toggle_video_like(ctx.state(), Requester(alice), PathParam(video_id.clone()))
            .await
            .unwrap();
        assert_eq!(liked.status, StatusCode::CREATED);
        assert_eq!(liked.message, "Video liked successfully");

        let unliked = toggle_video_like(ctx.state(), Requester(alice), PathParam(video_id))
            .await
            .unwrap();
        assert_eq!(unliked.status, StatusCode::OK);
        assert_eq!(unliked.message, "Video unliked successfully");

        let err = toggle_tweet_like(ctx.state(), Requester(alice), PathParam("bad".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid tweet ID");
    }

    #[tokio::test]
    async fn subscription_toggle_and_listings() {
        let ctx = ApiTestContext::new();
        let fan = seed_user(&ctx.store, "fan");
        let creator = seed_user(&ctx.store, "creator");

        let subscribed =
            toggle_subscription(ctx.state(), Requester(fan), PathParam(creator.to_string()))
                .await
                .unwrap();
        assert_eq!(subscribed.status, StatusCode::CREATED);

        let subscribers = list_subscribers(ctx.state(), PathParam(creator.to_string()))
            .await
            .unwrap();
        assert_eq!(subscribers.data.count, 1);

        let none = list_subscribed_channels(ctx.state(), PathParam(creator.to_string()))
            .await
            .unwrap();
        assert_eq!(none.status, StatusCode::OK);
        assert_eq!(none.data.count, 0);

        let unsubscribed =
            toggle_subscription(ctx.state(), Requester(fan), PathParam(creator.to_string()))
                .await
                .unwrap();
        assert_eq!(unsubscribed.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn comment_listing_coerces_pagination() {
        let ctx = ApiTestContext::new();
        let alice = seed_user(&ctx.store, "alice");
        let video_id = ObjectId::new().to_string();
        for n in 0..3 {
            add_comment(
                ctx.state(),
                Requester(alice),
                PathParam(video_id.clone()),
                content(&format!("c{n}")),
            )
            .await
            .unwrap();
        }

        let page = list_comments(
            ctx.state(),
            PathParam(video_id.clone()),
            QueryParams(PageParams {
                page: Some("junk".into()),
                limit: Some("2".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(page.data.page, 1);
        assert_eq!(page.data.docs.len(), 2);

        let beyond = list_comments(
            ctx.state(),
            PathParam(video_id),
            QueryParams(PageParams {
                page: Some("9".into()),
                limit: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(beyond.status, StatusCode::OK);
        assert!(beyond.data.docs.is_empty());
        assert_eq!(beyond.message, "No comments found for this video");
    }

    #[tokio::test]
    async fn blank_comment_is_bad_request() {
        let ctx = ApiTestContext::new();
        let alice = seed_user(&ctx.store, "alice");
        let err = add_comment(
            ctx.state(),
            Requester(alice),
            PathParam(ObjectId::new().to_string()),
            content("   "),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Comment content is required");
    }

    #[tokio::test]
    async fn dashboard_of_empty_channel_is_all_zero() {
        let ctx = ApiTestContext::new();
        let owner = seed_user(&ctx.store, "quiet");
        let stats = channel_stats(ctx.state(), Requester(owner)).await.unwrap();
        assert_eq!(stats.data, ChannelStats::default());

        let json = body_json(stats.into_response()).await;
        assert_eq!(
            json,
            json!({
                "statusCode": 200,
                "data": {
                    "totalSubscribers": 0,
                    "totalVideos": 0,
                    "totalViews": 0,
                    "totalLikes": 0,
                },
                "message": "Channel stats fetched successfully",
                "success": true,
            })
        );
    }

    #[tokio::test]
    async fn error_envelope_shape() {
        let response = ApiError::from(SocialError::not_found("Comment not found")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(
            json,
            json!({
                "statusCode": 404,
                "data": null,
                "message": "Comment not found",
                "errors": [],
                "success": false,
            })
        );
    }

    #[tokio::test]
    async fn internal_errors_are_not_leaked() {
        let err = ApiError::from(SocialError::Internal(anyhow::anyhow!(
            "disk I/O error at /var/lib/secret.db"
        )));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("secret"));
    }

    #[tokio::test]
    async fn requester_header_is_required_and_validated() {
        let id = ObjectId::new();
        let (mut parts, _) = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .body(())
            .unwrap()
            .into_parts();
        let requester = Requester::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(requester, Requester(id));

        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = Requester::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let (mut parts, _) = Request::builder()
            .header(USER_ID_HEADER, "admin")
            .body(())
            .unwrap()
            .into_parts();
        let err = Requester::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn router_dispatches_with_requester_header() {
        use tower::ServiceExt;

        let ctx = ApiTestContext::new();
        let alice = seed_user(&ctx.store, "alice");
        let app = router(ctx.state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tweets")
                    .header(USER_ID_HEADER, alice.to_string())
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"content":"via router"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["data"]["content"], "via router");
        assert_eq!(json["data"]["owner"]["username"], "alice");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/users/{alice}/tweets"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn video_publish_and_fetch() {
        let ctx = ApiTestContext::new();
        let owner = seed_user(&ctx.store, "creator");
        let published = publish_video(
            ctx.state(),
            Requester(owner),
            JsonBody(NewVideo {
                title: "intro".into(),
                description: "first upload".into(),
                video_file: "https://files.example.test/intro.mp4".into(),
                thumbnail: None,
                duration: Some(12.5),
            }),
        )
        .await
        .unwrap();
        assert_eq!(published.status, StatusCode::CREATED);

        let fetched = get_video(ctx.state(), PathParam(published.data.id.to_string()))
            .await
            .unwrap();
        assert_eq!(fetched.data.views, 1);

        let err = publish_video(ctx.state(), Requester(owner), JsonBody(NewVideo::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_sync_feeds_projections() {
        let ctx = ApiTestContext::new();
        let id = ObjectId::new();
        let synced = sync_profile(
            ctx.state(),
            Requester(id),
            JsonBody(ProfileBody {
                username: "newbie".into(),
                email: None,
                avatar: Some("https://cdn.example.test/n.png".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(synced.data.username, "newbie");

        let tweet = create_tweet(ctx.state(), Requester(id), content("hey"))
            .await
            .unwrap();
        assert_eq!(tweet.data.owner.username.as_deref(), Some("newbie"));
    }

    #[tokio::test]
    async fn rejected_bodies_and_unknown_routes_use_error_envelope() {
        use tower::ServiceExt;

        let ctx = ApiTestContext::new();
        let alice = seed_user(&ctx.store, "alice");
        let app = router(ctx.state.clone());

        let cases = [
            ("application/json", "{not json", "Request body is not valid JSON"),
            ("text/plain", r#"{"content":"hi"}"#, "Request body must be JSON"),
            ("application/json", r#"{"content":5}"#, "Request body has invalid fields"),
        ];
        for (content_type, body, message) in cases {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/tweets")
                        .header(USER_ID_HEADER, alice.to_string())
                        .header("content-type", content_type)
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            let json = body_json(response).await;
            assert_eq!(
                json,
                json!({
                    "statusCode": 400,
                    "data": null,
                    "message": message,
                    "errors": [],
                    "success": false,
                })
            );
        }
        assert!(
            ctx.store
                .list_user_tweets(&alice.to_string())
                .unwrap()
                .is_empty()
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/no/such/route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Route not found");
    }
}
