//! JSON payloads exchanged with the chat service and their mapping into domain types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{
    attestation::{AttestationReport, MessageSignature},
    chat::{Chat, ChatSummary},
    history::ChatHistory,
    message::{FileAttachment, Message, Role, Source, StatusUpdate, Usage},
    model::Model,
    reconcile::DEFAULT_STREAM_ERROR,
    server::{ServerInfo, UserSettings},
    stream::{ChannelEvent, CompletionUpdate, StreamUpdate},
    user::{User, UserRole},
};

const CHAT_EVENTS: &str = "chat-events";
const HISTORY_RECOVERED: &str = "API_HISTORY_RECOVERED";

#[derive(Debug, Serialize)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionUserDto {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl SessionUserDto {
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: UserRole::parse(&self.role),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfigDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
}

impl From<ServerConfigDto> for ServerInfo {
    fn from(dto: ServerConfigDto) -> Self {
        Self {
            name: dto.name,
            version: dto.version,
            features: dto
                .features
                .into_iter()
                .filter_map(|(key, value)| value.as_bool().map(|enabled| (key, enabled)))
                .collect(),
        }
    }
}

pub fn settings_from_value(value: Option<Value>) -> UserSettings {
    UserSettings {
        raw: value.unwrap_or(Value::Null),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMetaDto {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatListItemDto {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub pinned: Option<bool>,
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default)]
    pub share_id: Option<String>,
    #[serde(default)]
    pub meta: Option<ChatMetaDto>,
}

impl ChatListItemDto {
    /// Pinned/archived listings omit the flags; `implied` fills them in.
    pub fn into_summary(self, implied: ListingFlags) -> ChatSummary {
        ChatSummary {
            id: self.id,
            title: self.title,
            updated_at_s: self.updated_at,
            created_at_s: self.created_at,
            pinned: self.pinned.unwrap_or(implied.pinned),
            archived: self.archived.unwrap_or(implied.archived),
            tags: self.meta.map(|meta| meta.tags).unwrap_or_default(),
            share_id: self.share_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingFlags {
    pub pinned: bool,
    pub archived: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryDto {
    #[serde(default)]
    pub messages: HashMap<String, MessageDto>,
    #[serde(default, rename = "currentId")]
    pub current_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatBodyDto {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub history: HistoryDto,
    #[serde(default)]
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseDto {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub chat: ChatBodyDto,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub share_id: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub pinned: Option<bool>,
    #[serde(default)]
    pub meta: Option<ChatMetaDto>,
}

impl ChatResponseDto {
    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            updated_at_s: self.updated_at,
            created_at_s: self.created_at,
            pinned: self.pinned.unwrap_or(false),
            archived: self.archived,
            tags: self
                .meta
                .as_ref()
                .map(|meta| meta.tags.clone())
                .unwrap_or_default(),
            share_id: self.share_id.clone(),
        }
    }

    pub fn into_chat(self) -> Chat {
        let summary = self.summary();
        let history = history_from_dto(&summary.id, self.chat.history, self.chat.messages);

        Chat {
            summary,
            history,
            models: self.chat.models,
        }
    }
}

fn history_from_dto(chat_id: &str, history: HistoryDto, legacy: Vec<MessageDto>) -> ChatHistory {
    if history.messages.is_empty() {
        return linear_history(legacy);
    }

    let messages: Vec<Message> = history
        .messages
        .into_iter()
        .map(|(key, dto)| dto.into_message(key))
        .collect();

    match history.current_id {
        Some(current_id) => match ChatHistory::new(messages.clone(), Some(current_id)) {
            Ok(history) => history,
            Err(error) => {
                tracing::warn!(
                    code = HISTORY_RECOVERED,
                    chat_id,
                    error = %error,
                    "chat history pointer is dangling; recovering newest leaf"
                );
                ChatHistory::recover(messages)
            }
        },
        None => ChatHistory::recover(messages),
    }
}

/// Older chats store a flat message list; it becomes a single branch.
fn linear_history(messages: Vec<MessageDto>) -> ChatHistory {
    let mut parent: Option<String> = None;
    let mut linked: Vec<Message> = Vec::with_capacity(messages.len());

    for (index, dto) in messages.into_iter().enumerate() {
        let mut message = dto.into_message(format!("legacy-{index}"));
        message.parent_id = parent.clone();
        message.children_ids.clear();
        if let Some(previous) = linked.last_mut() {
            previous.children_ids.push(message.id.clone());
        }
        parent = Some(message.id.clone());
        linked.push(message);
    }

    ChatHistory::recover(linked)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorDto {
    Flag(bool),
    Text(String),
    Detail { content: Option<String> },
}

impl ErrorDto {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Flag(false) => None,
            Self::Flag(true) => Some(DEFAULT_STREAM_ERROR.to_owned()),
            Self::Text(text) => Some(text),
            Self::Detail { content } => {
                Some(content.unwrap_or_else(|| DEFAULT_STREAM_ERROR.to_owned()))
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusDto {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub done: bool,
}

impl From<StatusDto> for StatusUpdate {
    fn from(dto: StatusDto) -> Self {
        Self {
            action: dto.action,
            description: dto.description,
            done: dto.done,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UsageDto {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

impl From<UsageDto> for Usage {
    fn from(dto: UsageDto) -> Self {
        Self {
            prompt_tokens: dto.prompt_tokens,
            completion_tokens: dto.completion_tokens,
            total_tokens: dto.total_tokens,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<FileDto> for FileAttachment {
    fn from(dto: FileDto) -> Self {
        Self {
            name: dto
                .name
                .or_else(|| dto.url.clone())
                .unwrap_or_else(|| "file".to_owned()),
            kind: dto.kind.unwrap_or_else(|| "file".to_owned()),
            id: dto.id,
            url: dto.url,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "parentId")]
    pub parent_id: Option<String>,
    #[serde(default, rename = "childrenIds")]
    pub children_ids: Vec<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub error: Option<ErrorDto>,
    #[serde(default, rename = "statusHistory")]
    pub status_history: Vec<StatusDto>,
    #[serde(default)]
    pub sources: Vec<Value>,
    #[serde(default)]
    pub usage: Option<UsageDto>,
    #[serde(default)]
    pub files: Vec<FileDto>,
}

impl MessageDto {
    /// `fallback_id` is the history map key, used when the body omits its id.
    pub fn into_message(self, fallback_id: String) -> Message {
        let error = self.error.and_then(ErrorDto::into_text);

        Message {
            id: self.id.unwrap_or(fallback_id),
            parent_id: self.parent_id,
            children_ids: self.children_ids,
            role: Role::parse(&self.role).unwrap_or_default(),
            content: content_text(&self.content),
            model: self.model,
            timestamp_s: self.timestamp,
            // Stored messages without a flag were never streamed.
            done: self.done.unwrap_or(true) || error.is_some(),
            error,
            status_history: self.status_history.into_iter().map(Into::into).collect(),
            sources: self.sources.iter().filter_map(source_from_value).collect(),
            usage: self.usage.map(Into::into),
            files: self.files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Flattens string or multi-part (`[{type: "text", text}]`) content.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn source_from_value(value: &Value) -> Option<Source> {
    let source = value.get("source").unwrap_or(value);
    let name = ["name", "id", "url"]
        .iter()
        .find_map(|key| source.get(*key).and_then(Value::as_str))?
        .to_owned();
    let url = source
        .get("url")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/metadata/0/source").and_then(Value::as_str))
        .map(str::to_owned);

    Some(Source { name, url })
}

pub fn message_to_value(message: &Message) -> Value {
    let mut value = json!({
        "id": message.id,
        "parentId": message.parent_id,
        "childrenIds": message.children_ids,
        "role": message.role.as_str(),
        "content": message.content,
        "timestamp": message.timestamp_s,
        "done": message.done,
    });

    if let Some(model) = &message.model {
        value["model"] = json!(model);
    }
    if let Some(error) = &message.error {
        value["error"] = json!({ "content": error });
    }
    if !message.status_history.is_empty() {
        value["statusHistory"] = message
            .status_history
            .iter()
            .map(|status| {
                json!({
                    "action": status.action,
                    "description": status.description,
                    "done": status.done,
                })
            })
            .collect();
    }
    if !message.sources.is_empty() {
        value["sources"] = message
            .sources
            .iter()
            .map(|source| json!({ "source": { "name": source.name, "url": source.url } }))
            .collect();
    }
    if let Some(usage) = message.usage {
        value["usage"] = json!({
            "prompt_tokens": usage.prompt_tokens,
            "completion_tokens": usage.completion_tokens,
            "total_tokens": usage.total_tokens,
        });
    }
    if !message.files.is_empty() {
        value["files"] = message
            .files
            .iter()
            .map(|file| json!({ "id": file.id, "name": file.name, "type": file.kind, "url": file.url }))
            .collect();
    }

    value
}

/// Body of `POST /chats/new` and `POST /chats/{id}`.
pub fn chat_body(title: &str, models: &[String], history: &ChatHistory) -> Value {
    let messages: serde_json::Map<String, Value> = history
        .messages()
        .map(|message| (message.id.clone(), message_to_value(message)))
        .collect();
    let thread: Vec<Value> = history.thread().into_iter().map(message_to_value).collect();

    json!({
        "chat": {
            "title": title,
            "models": models,
            "history": {
                "messages": messages,
                "currentId": history.current_id(),
            },
            "messages": thread,
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct TagDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelsResponseDto {
    #[serde(default)]
    pub data: Vec<ModelDto>,
}

#[derive(Debug, Deserialize)]
pub struct ModelDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owned_by: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub confidential: Option<bool>,
    #[serde(default)]
    pub info: Option<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
}

impl From<ModelDto> for Model {
    fn from(dto: ModelDto) -> Self {
        let description = dto.description.or_else(|| {
            dto.info
                .as_ref()
                .and_then(|info| info.pointer("/meta/description"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        });
        let tagged_confidential = dto.tags.iter().any(|tag| {
            tag.get("name")
                .or(Some(tag))
                .and_then(Value::as_str)
                .is_some_and(|name| {
                    name.eq_ignore_ascii_case("confidential") || name.eq_ignore_ascii_case("tee")
                })
        });

        Self {
            name: dto.name.unwrap_or_else(|| dto.id.clone()),
            id: dto.id,
            owned_by: dto.owned_by,
            description,
            confidential: dto.confidential.unwrap_or(tagged_confidential),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompletionMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub chat_id: &'a str,
    /// Id of the assistant placeholder the response streams into.
    pub id: &'a str,
    pub model: &'a str,
    pub messages: Vec<CompletionMessage<'a>>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignatureDto {
    pub text: String,
    pub signature: String,
    pub signing_address: String,
    #[serde(default)]
    pub signing_algo: Option<String>,
}

impl From<SignatureDto> for MessageSignature {
    fn from(dto: SignatureDto) -> Self {
        Self {
            text: dto.text,
            signature: dto.signature,
            signing_address: dto.signing_address,
            signing_algo: dto.signing_algo.unwrap_or_else(|| "ecdsa".to_owned()),
        }
    }
}

/// Reads an attestation report. Multi-node reports carry the fields under
/// `all_attestations[0]`.
pub fn report_from_value(value: &Value) -> Option<AttestationReport> {
    let node = value
        .pointer("/all_attestations/0")
        .filter(|_| value.get("signing_address").is_none())
        .unwrap_or(value);

    let text = |key: &str| -> Option<String> {
        match node.get(key).or_else(|| value.get(key))? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    };

    Some(AttestationReport {
        model: text("model"),
        signing_address: text("signing_address")?,
        signing_algo: text("signing_algo").unwrap_or_else(|| "ecdsa".to_owned()),
        intel_quote: text("intel_quote"),
        nvidia_payload: text("nvidia_payload"),
        raw: serde_json::to_string_pretty(value).unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
struct FrameDto {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ChatEventDto {
    chat_id: String,
    message_id: String,
    data: EventBodyDto,
}

#[derive(Debug, Deserialize)]
struct EventBodyDto {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionDto {
    #[serde(default)]
    choices: Vec<ChoiceDto>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<ErrorDto>,
    #[serde(default)]
    sources: Vec<Value>,
    #[serde(default)]
    usage: Option<UsageDto>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceDto {
    #[serde(default)]
    delta: Option<DeltaDto>,
}

#[derive(Debug, Default, Deserialize)]
struct DeltaDto {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum FrameOutcome {
    Event(ChannelEvent),
    /// A frame of another event family.
    Other { event: String },
    Malformed(String),
}

pub fn parse_channel_frame(text: &str) -> FrameOutcome {
    let frame: FrameDto = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(error) => return FrameOutcome::Malformed(error.to_string()),
    };

    if frame.event != CHAT_EVENTS {
        return FrameOutcome::Other { event: frame.event };
    }

    match serde_json::from_value::<ChatEventDto>(frame.data) {
        Ok(event) => FrameOutcome::Event(ChannelEvent {
            chat_id: event.chat_id,
            message_id: event.message_id,
            update: stream_update(event.data.kind, event.data.data),
        }),
        Err(error) => FrameOutcome::Malformed(error.to_string()),
    }
}

fn stream_update(kind: String, data: Value) -> StreamUpdate {
    let content = |data: &Value| {
        data.get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };

    match kind.as_str() {
        "status" => match serde_json::from_value::<StatusDto>(data) {
            Ok(status) => StreamUpdate::Status(status.into()),
            Err(_) => StreamUpdate::Unknown { kind },
        },
        "message" | "chat:message:delta" => StreamUpdate::Delta {
            content: content(&data),
        },
        "replace" | "chat:message" => StreamUpdate::Replace {
            content: content(&data),
        },
        "chat:completion" => {
            let dto = serde_json::from_value::<CompletionDto>(data).unwrap_or_default();
            StreamUpdate::Completion(CompletionUpdate {
                delta: dto
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta)
                    .and_then(|delta| delta.content),
                content: dto.content,
                done: dto.done.unwrap_or(false),
                error: dto.error.and_then(ErrorDto::into_text),
                sources: dto.sources.iter().filter_map(source_from_value).collect(),
                usage: dto.usage.map(Into::into),
                title: dto.title,
            })
        }
        "chat:message:files" | "files" => {
            let files = data
                .get("files")
                .cloned()
                .and_then(|files| serde_json::from_value::<Vec<FileDto>>(files).ok())
                .unwrap_or_default();
            StreamUpdate::Files(files.into_iter().map(Into::into).collect())
        }
        "chat:title" => match data {
            Value::String(title) => StreamUpdate::Title(title),
            other => match other.get("title").and_then(Value::as_str) {
                Some(title) => StreamUpdate::Title(title.to_owned()),
                None => StreamUpdate::Unknown { kind },
            },
        },
        "error" | "chat:message:error" => {
            let message = data
                .get("error")
                .cloned()
                .and_then(|error| serde_json::from_value::<ErrorDto>(error).ok())
                .and_then(ErrorDto::into_text)
                .or_else(|| data.get("content").and_then(Value::as_str).map(str::to_owned));
            StreamUpdate::Error { message }
        }
        _ => StreamUpdate::Unknown { kind },
    }
}
