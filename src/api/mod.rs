//! Chat service integration: REST client, real-time channel and wire mapping.

pub mod error;
pub mod http;
pub mod realtime;
pub mod status_tracker;
pub mod wire;

use std::{future::Future, sync::mpsc::Sender, time::Duration};

use serde_json::{json, Value};
use tokio::runtime::{Builder, Runtime};

use crate::{
    domain::{
        attestation::{AttestationReport, MessageSignature},
        chat::{Chat, ChatSummary},
        events::AppEvent,
        history::ChatHistory,
        model::Model,
        server::{ServerInfo, UserSettings},
        status::AuthConnectivityStatus,
        user::{Session, User},
    },
    infra::config::{RealtimeConfig, ServerConfig},
    usecases::{
        contracts::{ChatListing, ChatSource, SessionSource, SourceError},
        guided_auth::{AuthBackend, AuthBackendError},
        list_models::ModelSource,
        send_message::{CompletionRequest, CompletionSender},
        startup::SessionProbe,
        verify_message::AttestationSource,
    },
};

use self::{
    error::ApiError,
    http::HttpClient,
    realtime::{ChannelSettings, RealtimeChannel},
    status_tracker::StatusTracker,
    wire::{
        ChatListItemDto, ChatResponseDto, CompletionMessage, ListingFlags, ModelsResponseDto,
        ServerConfigDto, SessionUserDto, SignInRequest, SignatureDto, TagDto,
    },
};

const SIGNING_ALGO: &str = "ecdsa";
const PROBE_TIMED_OUT: &str = "session probe timed out";

/// Blocking facade over the async REST client. Owns the runtime the real-time
/// channel task runs on.
#[derive(Debug)]
pub struct ApiAdapter {
    runtime: Runtime,
    client: HttpClient,
    status: StatusTracker,
}

impl ApiAdapter {
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("vchat-io")
            .enable_all()
            .build()
            .map_err(|error| ApiError::Transport(format!("failed to start runtime: {error}")))?;

        Ok(Self {
            runtime,
            client: HttpClient::new(config)?,
            status: StatusTracker::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn set_token(&self, token: Option<String>) {
        self.client.set_token(token);
    }

    pub fn status_snapshot(&self) -> AuthConnectivityStatus {
        self.status.snapshot()
    }

    pub fn reset_status(&self) {
        self.client.set_token(None);
        self.status.on_logout_reset();
    }

    /// Starts the event channel with the current token. Dropping the handle
    /// stops it. Returns `None` while signed out.
    pub fn start_channel(
        &self,
        config: &RealtimeConfig,
        event_tx: Sender<AppEvent>,
    ) -> Option<RealtimeChannel> {
        let token = self.client.token()?;
        let settings = ChannelSettings::new(self.client.base_url(), config, token);
        Some(RealtimeChannel::start(&self.runtime, settings, event_tx))
    }

    fn call<T, F>(&self, request: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match self.runtime.block_on(request) {
            Ok(value) => {
                self.status.on_request_succeeded();
                Ok(value)
            }
            Err(error) => {
                self.status.on_request_failed(&error);
                Err(error.into())
            }
        }
    }

    fn list_with(&self, path: &str, flags: ListingFlags) -> Result<Vec<ChatSummary>, SourceError> {
        let items: Vec<ChatListItemDto> = self.call(self.client.get(path))?;
        Ok(items
            .into_iter()
            .map(|item| item.into_summary(flags))
            .collect())
    }
}

impl From<ApiError> for SourceError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => Self::Unauthorized,
            ApiError::NotFound => Self::NotFound,
            ApiError::Decode(detail) => Self::InvalidData(detail),
            other @ (ApiError::Server { .. } | ApiError::Transport(_)) => {
                Self::Unavailable(other.user_message())
            }
        }
    }
}

fn chat_path(chat_id: &str, suffix: &str) -> String {
    format!("/api/v1/chats/{chat_id}{suffix}")
}

fn tag_names(tags: Vec<TagDto>) -> Vec<String> {
    tags.into_iter().map(|tag| tag.name).collect()
}

fn map_sign_in_error(error: ApiError) -> AuthBackendError {
    if error.is_timeout() {
        return AuthBackendError::Timeout;
    }

    match error {
        ApiError::Unauthorized => AuthBackendError::InvalidCredentials,
        ApiError::Server { status, .. } if (400..500).contains(&status) => {
            AuthBackendError::InvalidCredentials
        }
        ApiError::Decode(message) => AuthBackendError::Transient {
            code: "AUTH_RESPONSE_INVALID",
            message,
        },
        other => AuthBackendError::Transient {
            code: "AUTH_BACKEND_UNAVAILABLE",
            message: other.to_string(),
        },
    }
}

impl AuthBackend for ApiAdapter {
    fn sign_in(&mut self, email: &str, password: &str) -> Result<Session, AuthBackendError> {
        self.status.on_auth_start();

        let result = self
            .runtime
            .block_on(
                self.client
                    .post::<_, SessionUserDto>("/api/v1/auths/signin", &SignInRequest { email, password }),
            )
            .map_err(map_sign_in_error)
            .and_then(|dto| match dto.token.clone().filter(|token| !token.is_empty()) {
                Some(token) => Ok(Session {
                    user: dto.to_user(),
                    token,
                }),
                None => Err(AuthBackendError::Transient {
                    code: "AUTH_TOKEN_MISSING",
                    message: "sign-in response carried no token".to_owned(),
                }),
            });

        match &result {
            Ok(session) => {
                self.client.set_token(Some(session.token.clone()));
                self.status.on_auth_success();
            }
            Err(error) => self.status.on_auth_error(error),
        }

        result
    }
}

impl SessionProbe for ApiAdapter {
    fn probe_session(&self, token: &str, timeout: Duration) -> Result<User, SourceError> {
        self.client.set_token(Some(token.to_owned()));

        let probe = tokio::time::timeout(timeout, self.client.get::<SessionUserDto>("/api/v1/auths/"));
        match self.runtime.block_on(probe) {
            Ok(result) => {
                let dto = result.map_err(|error| {
                    self.status.on_request_failed(&error);
                    SourceError::from(error)
                })?;
                self.status.on_auth_success();
                Ok(dto.to_user())
            }
            Err(_elapsed) => Err(SourceError::Unavailable(PROBE_TIMED_OUT.to_owned())),
        }
    }
}

impl SessionSource for ApiAdapter {
    fn session_user(&self) -> Result<User, SourceError> {
        let dto: SessionUserDto = self.call(self.client.get("/api/v1/auths/"))?;
        Ok(dto.to_user())
    }

    fn sign_out(&self) -> Result<(), SourceError> {
        let _: Value = self.call(self.client.get("/api/v1/auths/signout"))?;
        Ok(())
    }

    fn server_info(&self) -> Result<ServerInfo, SourceError> {
        let dto: ServerConfigDto = self.call(self.client.get("/api/config"))?;
        Ok(dto.into())
    }

    fn user_settings(&self) -> Result<UserSettings, SourceError> {
        let value: Option<Value> = self.call(self.client.get("/api/v1/users/user/settings"))?;
        Ok(wire::settings_from_value(value))
    }
}

impl ChatSource for ApiAdapter {
    fn list_chats(&self, listing: ChatListing) -> Result<Vec<ChatSummary>, SourceError> {
        match listing {
            ChatListing::Recent { page } => {
                let page = page.to_string();
                let items: Vec<ChatListItemDto> = self.call(
                    self.client
                        .get_with_query("/api/v1/chats/", &[("page", page.as_str())]),
                )?;
                Ok(items
                    .into_iter()
                    .map(|item| item.into_summary(ListingFlags::default()))
                    .collect())
            }
            ChatListing::Pinned => self.list_with(
                "/api/v1/chats/pinned",
                ListingFlags {
                    pinned: true,
                    archived: false,
                },
            ),
            ChatListing::Archived => self.list_with(
                "/api/v1/chats/archived",
                ListingFlags {
                    pinned: false,
                    archived: true,
                },
            ),
        }
    }

    fn get_chat(&self, chat_id: &str) -> Result<Chat, SourceError> {
        let dto: ChatResponseDto = self.call(self.client.get(&chat_path(chat_id, "")))?;
        Ok(dto.into_chat())
    }

    fn create_chat(
        &self,
        title: &str,
        models: &[String],
        history: &ChatHistory,
    ) -> Result<ChatSummary, SourceError> {
        let body = wire::chat_body(title, models, history);
        let dto: ChatResponseDto = self.call(self.client.post("/api/v1/chats/new", &body))?;
        Ok(dto.summary())
    }

    fn update_chat(
        &self,
        chat_id: &str,
        title: &str,
        models: &[String],
        history: &ChatHistory,
    ) -> Result<(), SourceError> {
        let body = wire::chat_body(title, models, history);
        let _: Value = self.call(self.client.post(&chat_path(chat_id, ""), &body))?;
        Ok(())
    }

    fn delete_chat(&self, chat_id: &str) -> Result<(), SourceError> {
        let _: Value = self.call(self.client.delete(&chat_path(chat_id, "")))?;
        Ok(())
    }

    fn toggle_pin(&self, chat_id: &str) -> Result<ChatSummary, SourceError> {
        let dto: ChatResponseDto = self.call(self.client.post_empty(&chat_path(chat_id, "/pin")))?;
        Ok(dto.summary())
    }

    fn toggle_archive(&self, chat_id: &str) -> Result<ChatSummary, SourceError> {
        let dto: ChatResponseDto =
            self.call(self.client.post_empty(&chat_path(chat_id, "/archive")))?;
        Ok(dto.summary())
    }

    fn share_chat(&self, chat_id: &str) -> Result<String, SourceError> {
        let dto: ChatResponseDto =
            self.call(self.client.post_empty(&chat_path(chat_id, "/share")))?;
        dto.share_id
            .filter(|share_id| !share_id.is_empty())
            .ok_or_else(|| SourceError::InvalidData("share response carried no share_id".to_owned()))
    }

    fn unshare_chat(&self, chat_id: &str) -> Result<(), SourceError> {
        let _: Value = self.call(self.client.delete(&chat_path(chat_id, "/share")))?;
        Ok(())
    }

    fn list_tags(&self, chat_id: &str) -> Result<Vec<String>, SourceError> {
        let tags: Vec<TagDto> = self.call(self.client.get(&chat_path(chat_id, "/tags")))?;
        Ok(tag_names(tags))
    }

    fn add_tag(&self, chat_id: &str, name: &str) -> Result<Vec<String>, SourceError> {
        let tags: Vec<TagDto> = self.call(
            self.client
                .post(&chat_path(chat_id, "/tags"), &json!({ "name": name })),
        )?;
        Ok(tag_names(tags))
    }

    fn remove_tag(&self, chat_id: &str, name: &str) -> Result<Vec<String>, SourceError> {
        let tags: Vec<TagDto> = self.call(
            self.client
                .delete_with_body(&chat_path(chat_id, "/tags"), &json!({ "name": name })),
        )?;
        Ok(tag_names(tags))
    }
}

impl ModelSource for ApiAdapter {
    fn list_models(&self) -> Result<Vec<Model>, SourceError> {
        let dto: ModelsResponseDto = self.call(self.client.get("/api/models"))?;
        Ok(dto.data.into_iter().map(Model::from).collect())
    }
}

impl CompletionSender for ApiAdapter {
    fn start_completion(&self, request: &CompletionRequest) -> Result<(), SourceError> {
        let body = wire::CompletionRequest {
            chat_id: &request.chat_id,
            id: &request.message_id,
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|(role, content)| CompletionMessage {
                    role: role.as_str(),
                    content,
                })
                .collect(),
            stream: true,
        };

        let _: Value = self.call(self.client.post("/api/chat/completions", &body))?;
        Ok(())
    }
}

impl AttestationSource for ApiAdapter {
    fn message_signature(
        &self,
        message_id: &str,
        model: &str,
    ) -> Result<MessageSignature, SourceError> {
        let path = format!("/api/v1/signature/{message_id}");
        let dto: SignatureDto = self.call(
            self.client
                .get_with_query(&path, &[("model", model), ("signing_algo", SIGNING_ALGO)]),
        )?;
        Ok(dto.into())
    }

    fn attestation_report(&self, model: &str) -> Result<AttestationReport, SourceError> {
        let value: Value = self.call(self.client.get_with_query(
            "/api/v1/attestation/report",
            &[("model", model), ("signing_algo", SIGNING_ALGO)],
        ))?;
        wire::report_from_value(&value).ok_or_else(|| {
            SourceError::InvalidData("attestation report has no signing_address".to_owned())
        })
    }
}
