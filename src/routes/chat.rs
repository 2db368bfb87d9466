use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use crate::message::MessageBuilder;
use crate::routes::extract::{Json, Path};
use crate::routes::{ok, ApiResult};
use crate::security::{AdminUser, CurrentUser};
use crate::services::chat::{ChatService, MessageRequest};
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/host/:user_id", get(conversation_of_host).post(open_conversation))
        .route("/conversations/:id", get(get_conversation))
        .route("/conversations/:id/messages", post(post_message))
}

async fn list_conversations(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser) -> ApiResult {
    ok(&msg, ChatService::new(&s).get_all_conversations().await?)
}

async fn get_conversation(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, ChatService::new(&s).get_by_id(&user, id).await?)
}

async fn conversation_of_host(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(user_id): Path<i64>) -> ApiResult {
    ok(&msg, ChatService::new(&s).get_by_host(&user, user_id).await?)
}

async fn open_conversation(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(user_id): Path<i64>) -> ApiResult {
    ok(&msg, ChatService::new(&s).create(&user, user_id).await?)
}

async fn post_message(
    State(s): State<AppState>,
    msg: MessageBuilder,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<MessageRequest>,
) -> ApiResult {
    ok(&msg, ChatService::new(&s).add_message(&user, id, &req).await?)
}
