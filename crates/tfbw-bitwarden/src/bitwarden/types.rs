//! Core types for the Bitwarden CLI bridge.
//!
//! Defines the vault object model, enumerations matching the `bw` data
//! format, client configuration, credentials, and error types.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

// ── Error types ─────────────────────────────────────────────────────

/// Message used when a lookup by ID finds nothing (or a trashed object).
pub const OBJECT_NOT_FOUND: &str = "object not found";

/// Message used when a filtered lookup matches nothing.
pub const NO_MATCHING_OBJECT: &str = "no object found matching the filter";

/// Reason reported when the CLI exits successfully without any output.
pub const UNEXPECTED_END_OF_INPUT: &str = "unexpected end of JSON input";

/// Flat classification of a [`BitwardenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitwardenErrorKind {
    /// The `bw` executable is missing or cannot be started.
    Setup,
    /// Login/unlock failed or the session was rejected.
    Auth,
    /// The CLI exited with a nonzero status.
    Process,
    /// The CLI output could not be parsed.
    Decode,
    /// Zero matches where one object was required.
    NotFound,
    /// Several matches where one object was required.
    Ambiguous,
    /// The returned object is not of the requested type.
    TypeMismatch,
    /// The configured command timeout elapsed.
    Timeout,
    /// The caller's cancellation token fired.
    Cancelled,
    /// The object failed validation before a command was built.
    InvalidObject,
    /// Spawning or waiting on the child failed for another reason.
    Io,
}

/// An error raised by the Bitwarden CLI bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BitwardenError {
    #[error("unable to run '{binary}': {reason}")]
    Setup { binary: String, reason: String },

    #[error("authentication failed running '{command}': {message}")]
    Auth { command: String, message: String },

    #[error("error running '{command}': {}", describe_exit(.exit_code, .stderr))]
    Process {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("unable to parse result of '{command}', error: '{reason}', output: '{output}'")]
    Decode {
        command: String,
        reason: String,
        output: String,
    },

    #[error("{message}")]
    NotFound { message: String },

    #[error("too many objects found")]
    Ambiguous { count: usize },

    #[error("returned object type does not match requested object type")]
    TypeMismatch { expected: String, actual: String },

    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("'{command}' was cancelled")]
    Cancelled { command: String },

    #[error("invalid object: {0}")]
    InvalidObject(String),

    #[error("I/O error running '{command}': {reason}")]
    Io { command: String, reason: String },
}

fn describe_exit(exit_code: &Option<i32>, stderr: &str) -> String {
    let status = match exit_code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    };
    format!("{}, stderr: '{}'", status, stderr.trim())
}

/// Result alias used throughout the crate.
pub type BitwardenResult<T> = Result<T, BitwardenError>;

impl BitwardenError {
    pub fn kind(&self) -> BitwardenErrorKind {
        match self {
            Self::Setup { .. } => BitwardenErrorKind::Setup,
            Self::Auth { .. } => BitwardenErrorKind::Auth,
            Self::Process { .. } => BitwardenErrorKind::Process,
            Self::Decode { .. } => BitwardenErrorKind::Decode,
            Self::NotFound { .. } => BitwardenErrorKind::NotFound,
            Self::Ambiguous { .. } => BitwardenErrorKind::Ambiguous,
            Self::TypeMismatch { .. } => BitwardenErrorKind::TypeMismatch,
            Self::Timeout { .. } => BitwardenErrorKind::Timeout,
            Self::Cancelled { .. } => BitwardenErrorKind::Cancelled,
            Self::InvalidObject(_) => BitwardenErrorKind::InvalidObject,
            Self::Io { .. } => BitwardenErrorKind::Io,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == BitwardenErrorKind::Auth
    }

    pub fn setup(binary: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Setup { binary: binary.into(), reason: reason.into() }
    }
    pub fn auth(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Auth { command: command.into(), message: message.into() }
    }
    pub fn decode(
        command: impl Into<String>,
        reason: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::Decode { command: command.into(), reason: reason.into(), output: output.into() }
    }
    pub fn not_found() -> Self {
        Self::NotFound { message: OBJECT_NOT_FOUND.into() }
    }
    pub fn no_match() -> Self {
        Self::NotFound { message: NO_MATCHING_OBJECT.into() }
    }
    pub fn cancelled(command: impl Into<String>) -> Self {
        Self::Cancelled { command: command.into() }
    }
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidObject(msg.into())
    }
    pub fn io(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Io { command: command.into(), reason: reason.into() }
    }
}

// ── Enumerations ────────────────────────────────────────────────────

/// Top-level vault object tag, as used in `bw` command lines and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    #[serde(rename = "item")]
    Item,
    #[serde(rename = "folder")]
    Folder,
    #[serde(rename = "org-collection")]
    OrgCollection,
}

impl ObjectType {
    /// Singular name used by `create`, `get`, `edit` and `delete`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Folder => "folder",
            Self::OrgCollection => "org-collection",
        }
    }

    /// Plural name used by `list`.
    pub fn list_name(&self) -> &'static str {
        match self {
            Self::Item => "items",
            Self::Folder => "folders",
            Self::OrgCollection => "org-collections",
        }
    }

    /// Parse the `object` tag of a CLI response.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "item" => Some(Self::Item),
            "folder" => Some(Self::Folder),
            // `list org-collections` tags its entries as plain collections
            "org-collection" | "collection" => Some(Self::OrgCollection),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitwarden vault item type (matching CLI enums).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemType {
    Login = 1,
    SecureNote = 2,
    Card = 3,
    Identity = 4,
}

impl ItemType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Login),
            2 => Some(Self::SecureNote),
            3 => Some(Self::Card),
            4 => Some(Self::Identity),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::SecureNote => "secure note",
            Self::Card => "card",
            Self::Identity => "identity",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Custom field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldType {
    Text = 0,
    Hidden = 1,
    Boolean = 2,
    Linked = 3,
}

impl FieldType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Text),
            1 => Some(Self::Hidden),
            2 => Some(Self::Boolean),
            3 => Some(Self::Linked),
            _ => None,
        }
    }
}

/// URI match detection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum UriMatchType {
    Domain = 0,
    Host = 1,
    StartsWith = 2,
    Exact = 3,
    RegularExpression = 4,
    Never = 5,
}

impl UriMatchType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Domain),
            1 => Some(Self::Host),
            2 => Some(Self::StartsWith),
            3 => Some(Self::Exact),
            4 => Some(Self::RegularExpression),
            5 => Some(Self::Never),
            _ => None,
        }
    }
}

// ── Item payloads ───────────────────────────────────────────────────

/// Treat an explicit JSON `null` like a missing key.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A login URI entry attached to a login item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUri {
    #[serde(rename = "match")]
    pub match_type: Option<u8>,
    #[serde(default)]
    pub uri: String,
}

impl LoginUri {
    pub fn new(uri: &str) -> Self {
        Self { match_type: None, uri: uri.to_string() }
    }

    pub fn with_match(uri: &str, match_type: UriMatchType) -> Self {
        Self { match_type: Some(match_type as u8), uri: uri.to_string() }
    }

    pub fn match_kind(&self) -> Option<UriMatchType> {
        self.match_type.and_then(UriMatchType::from_u8)
    }
}

/// Login item data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_revision_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<LoginUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Login {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..Default::default()
        }
    }
}

/// Secure note data. The CLI only knows the generic note type `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureNote {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub note_type: Option<u8>,
}

/// Card (credit/debit) item data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardholder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

/// Identity item data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A file attached to an item. Managed through the attachment commands,
/// never through item payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A previous password of a login item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordHistoryEntry {
    #[serde(default)]
    pub last_used_date: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Group access entry on an organization collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionGroup {
    pub id: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub hide_passwords: bool,
}

/// A custom field on a vault item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub field_type: FieldType,
    /// Only set for [`FieldType::Linked`].
    pub linked_id: Option<u32>,
}

impl Field {
    pub fn text(name: &str, value: &str) -> Self {
        Self::plain(name, value, FieldType::Text)
    }

    pub fn hidden(name: &str, value: &str) -> Self {
        Self::plain(name, value, FieldType::Hidden)
    }

    pub fn boolean(name: &str, value: bool) -> Self {
        Self::plain(name, if value { "true" } else { "false" }, FieldType::Boolean)
    }

    /// A field whose value mirrors another property of the item
    /// (e.g. `100` for the login username).
    pub fn linked(name: &str, linked_id: u32) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            field_type: FieldType::Linked,
            linked_id: Some(linked_id),
        }
    }

    fn plain(name: &str, value: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            field_type,
            linked_id: None,
        }
    }

    pub fn validate(&self) -> BitwardenResult<()> {
        match (self.field_type, self.linked_id) {
            (FieldType::Linked, None) => Err(BitwardenError::invalid(format!(
                "linked field '{}' has no linked id",
                self.name
            ))),
            (FieldType::Linked, Some(_)) => Ok(()),
            (_, Some(_)) => Err(BitwardenError::invalid(format!(
                "field '{}' is not linked but carries a linked id",
                self.name
            ))),
            (_, None) => Ok(()),
        }
    }
}

// ── Vault object model ──────────────────────────────────────────────

/// Subtype-specific payload of a vault item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemData {
    Login(Login),
    SecureNote(SecureNote),
    Card(Card),
    Identity(Identity),
}

impl ItemData {
    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Login(_) => ItemType::Login,
            Self::SecureNote(_) => ItemType::SecureNote,
            Self::Card(_) => ItemType::Card,
            Self::Identity(_) => ItemType::Identity,
        }
    }
}

/// A vault item (cipher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub data: ItemData,
    pub folder_id: Option<String>,
    pub collection_ids: Vec<String>,
    pub notes: Option<String>,
    pub favorite: bool,
    pub reprompt: u8,
    pub fields: Vec<Field>,
    pub attachments: Vec<Attachment>,
    pub password_history: Vec<PasswordHistoryEntry>,
    pub creation_date: Option<String>,
    pub deleted_date: Option<String>,
}

impl Item {
    pub fn new(data: ItemData) -> Self {
        Self {
            data,
            folder_id: None,
            collection_ids: Vec::new(),
            notes: None,
            favorite: false,
            reprompt: 0,
            fields: Vec::new(),
            attachments: Vec::new(),
            password_history: Vec::new(),
            creation_date: None,
            deleted_date: None,
        }
    }

    pub fn login(&self) -> Option<&Login> {
        match &self.data {
            ItemData::Login(login) => Some(login),
            _ => None,
        }
    }
}

/// An organization collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgCollection {
    pub external_id: Option<String>,
    pub groups: Vec<CollectionGroup>,
}

/// Variant-specific part of a vault object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Item(Item),
    Folder,
    OrgCollection(OrgCollection),
}

/// A vault entity: item, folder or organization collection.
///
/// `id` stays empty until the object has been created in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub id: String,
    pub name: String,
    pub organization_id: Option<String>,
    pub revision_date: Option<String>,
    pub kind: ObjectKind,
}

impl Object {
    fn with_kind(name: &str, kind: ObjectKind) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            organization_id: None,
            revision_date: None,
            kind,
        }
    }

    pub fn item(name: &str, data: ItemData) -> Self {
        Self::with_kind(name, ObjectKind::Item(Item::new(data)))
    }

    pub fn login(name: &str, login: Login) -> Self {
        Self::item(name, ItemData::Login(login))
    }

    pub fn secure_note(name: &str, notes: &str) -> Self {
        let mut object = Self::item(name, ItemData::SecureNote(SecureNote::default()));
        if let ObjectKind::Item(item) = &mut object.kind {
            item.notes = Some(notes.to_string());
        }
        object
    }

    pub fn card(name: &str, card: Card) -> Self {
        Self::item(name, ItemData::Card(card))
    }

    pub fn identity(name: &str, identity: Identity) -> Self {
        Self::item(name, ItemData::Identity(identity))
    }

    pub fn folder(name: &str) -> Self {
        Self::with_kind(name, ObjectKind::Folder)
    }

    pub fn org_collection(organization_id: &str, name: &str) -> Self {
        let mut object = Self::with_kind(name, ObjectKind::OrgCollection(OrgCollection::default()));
        object.organization_id = Some(organization_id.to_string());
        object
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_organization(mut self, organization_id: &str) -> Self {
        self.organization_id = Some(organization_id.to_string());
        self
    }

    pub fn object_type(&self) -> ObjectType {
        match self.kind {
            ObjectKind::Item(_) => ObjectType::Item,
            ObjectKind::Folder => ObjectType::Folder,
            ObjectKind::OrgCollection(_) => ObjectType::OrgCollection,
        }
    }

    /// Item subtype, `None` for folders and collections.
    pub fn item_type(&self) -> Option<ItemType> {
        self.as_item().map(|item| item.data.item_type())
    }

    pub fn as_item(&self) -> Option<&Item> {
        match &self.kind {
            ObjectKind::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut Item> {
        match &mut self.kind {
            ObjectKind::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Whether the object sits in the trash.
    pub fn is_deleted(&self) -> bool {
        self.as_item().is_some_and(|item| item.deleted_date.is_some())
    }

    /// Human-readable type label such as `item (login)`.
    pub fn type_label(&self) -> String {
        match self.item_type() {
            Some(item_type) => format!("{} ({})", self.object_type(), item_type),
            None => self.object_type().to_string(),
        }
    }

    /// Structural checks done before the object is sent to the CLI.
    pub fn validate(&self) -> BitwardenResult<()> {
        match &self.kind {
            ObjectKind::Item(item) => item.fields.iter().try_for_each(Field::validate),
            ObjectKind::OrgCollection(_) if self.organization_id.is_none() => Err(
                BitwardenError::invalid("org-collection requires an organization id"),
            ),
            _ => Ok(()),
        }
    }
}

// ── Status ──────────────────────────────────────────────────────────

/// Vault lock status as reported by `bw status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStatus {
    Unauthenticated,
    Locked,
    Unlocked,
}

impl VaultStatus {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "unlocked" => Self::Unlocked,
            "locked" => Self::Locked,
            _ => Self::Unauthenticated,
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
        }
    }
}

/// Status response from `bw status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub last_sync: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub status: String,
}

impl StatusInfo {
    pub fn vault_status(&self) -> VaultStatus {
        VaultStatus::parse(&self.status)
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// What to do when a data operation reports an authentication failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthRetryPolicy {
    /// Drop the session and return the error; the next call logs in again.
    #[default]
    FailFast,
    /// Drop the session, acquire a new one and retry the operation once.
    ///
    /// A call that needed a fresh session to begin with can then run two
    /// acquisitions, one more than `ensure_ready` allows on its own.
    ReauthenticateOnce,
}

/// Configuration for driving the `bw` CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Path to the `bw` executable.
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    /// Vault server, applied with `bw config server` before login.
    #[serde(default)]
    pub server_url: Option<String>,

    /// Exported as `BITWARDENCLI_APPDATA_DIR`.
    #[serde(default)]
    pub app_data_dir: Option<String>,

    /// Exported as `NODE_EXTRA_CA_CERTS`.
    #[serde(default)]
    pub extra_ca_certs: Option<String>,

    /// Per-command timeout in seconds (0 = none).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Per-command timeout in milliseconds. Takes precedence over
    /// `timeout_secs` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Caller environment variables copied into every child process.
    #[serde(default = "default_passthrough_env")]
    pub passthrough_env: Vec<String>,

    /// Additional variables set on every child process.
    #[serde(default)]
    pub extra_env: Vec<(String, String)>,

    /// Run `bw sync` right after a session has been acquired.
    #[serde(default = "default_true")]
    pub sync_after_unlock: bool,

    #[serde(default)]
    pub auth_retry: AuthRetryPolicy,
}

fn default_cli_path() -> String { "bw".into() }
fn default_timeout() -> u64 { 60 }
fn default_true() -> bool { true }
fn default_passthrough_env() -> Vec<String> {
    ["PATH", "HOME", "USERPROFILE", "APPDATA", "LOCALAPPDATA", "SystemRoot", "TMPDIR", "TEMP", "TMP"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            server_url: None,
            app_data_dir: None,
            extra_ca_certs: None,
            timeout_secs: default_timeout(),
            timeout_ms: None,
            passthrough_env: default_passthrough_env(),
            extra_env: Vec::new(),
            sync_after_unlock: true,
            auth_retry: AuthRetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_cli_path(mut self, path: &str) -> Self {
        self.cli_path = path.to_string();
        self
    }

    pub fn with_server_url(mut self, url: &str) -> Self {
        self.server_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_app_data_dir(mut self, dir: &str) -> Self {
        self.app_data_dir = Some(dir.to_string());
        self
    }

    /// A zero duration disables the timeout. Anything shorter than a
    /// millisecond is rounded up to one.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.timeout_ms = Some(if timeout.is_zero() { 0 } else { millis.max(1) });
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.extra_env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_auth_retry(mut self, policy: AuthRetryPolicy) -> Self {
        self.auth_retry = policy;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms {
            Some(ms) => (ms > 0).then(|| Duration::from_millis(ms)),
            None => (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }
}

// ── Credentials ─────────────────────────────────────────────────────

/// How the session manager authenticates against the vault.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Credentials {
    /// Email + master password.
    Password { email: String, master_password: String },
    /// Personal API key; the master password is still needed to unlock.
    ApiKey {
        client_id: String,
        client_secret: String,
        master_password: String,
    },
}

impl Credentials {
    pub fn password(email: &str, master_password: &str) -> Self {
        Self::Password {
            email: email.to_string(),
            master_password: master_password.to_string(),
        }
    }

    pub fn api_key(client_id: &str, client_secret: &str, master_password: &str) -> Self {
        Self::ApiKey {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            master_password: master_password.to_string(),
        }
    }

    pub fn master_password(&self) -> &str {
        match self {
            Self::Password { master_password, .. } | Self::ApiKey { master_password, .. } => {
                master_password
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("master_password", &"<redacted>")
                .finish(),
            Self::ApiKey { client_id, .. } => f
                .debug_struct("ApiKey")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("master_password", &"<redacted>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Errors ──────────────────────────────────────────────────────

    #[test]
    fn decode_error_message_embeds_command_and_output() {
        let err = BitwardenError::decode("list org-collection", UNEXPECTED_END_OF_INPUT, "");
        assert_eq!(
            err.to_string(),
            "unable to parse result of 'list org-collection', error: 'unexpected end of JSON input', output: ''"
        );
        assert_eq!(err.kind(), BitwardenErrorKind::Decode);
    }

    #[test]
    fn process_error_message_embeds_stderr() {
        let err = BitwardenError::Process {
            command: "get item abc".into(),
            exit_code: Some(1),
            stderr: "Something broke.\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "error running 'get item abc': exit status 1, stderr: 'Something broke.'"
        );
    }

    #[test]
    fn selector_messages() {
        assert_eq!(BitwardenError::no_match().to_string(), NO_MATCHING_OBJECT);
        assert_eq!(BitwardenError::not_found().to_string(), OBJECT_NOT_FOUND);
        assert_eq!(BitwardenError::Ambiguous { count: 2 }.to_string(), "too many objects found");
        let mismatch = BitwardenError::TypeMismatch {
            expected: "item (login)".into(),
            actual: "item (secure note)".into(),
        };
        assert_eq!(
            mismatch.to_string(),
            "returned object type does not match requested object type"
        );
        assert_eq!(mismatch.kind(), BitwardenErrorKind::TypeMismatch);
    }

    // ── Enums ───────────────────────────────────────────────────────

    #[test]
    fn object_type_names() {
        assert_eq!(ObjectType::OrgCollection.as_str(), "org-collection");
        assert_eq!(ObjectType::Item.list_name(), "items");
        assert_eq!(ObjectType::from_tag("collection"), Some(ObjectType::OrgCollection));
        assert_eq!(ObjectType::from_tag("organization"), None);
    }

    #[test]
    fn item_type_codes() {
        assert_eq!(ItemType::from_u8(1), Some(ItemType::Login));
        assert_eq!(ItemType::from_u8(4), Some(ItemType::Identity));
        assert_eq!(ItemType::from_u8(9), None);
        assert_eq!(FieldType::from_u8(3), Some(FieldType::Linked));
    }

    // ── Object model ────────────────────────────────────────────────

    #[test]
    fn linked_field_requires_linked_id() {
        assert!(Field::linked("user", 100).validate().is_ok());
        let mut broken = Field::text("name", "value");
        broken.linked_id = Some(100);
        assert_eq!(broken.validate().unwrap_err().kind(), BitwardenErrorKind::InvalidObject);
        let mut unlinked = Field::linked("user", 100);
        unlinked.linked_id = None;
        assert!(unlinked.validate().is_err());
    }

    #[test]
    fn org_collection_requires_organization() {
        let mut collection = Object::org_collection("org-id", "Team");
        assert!(collection.validate().is_ok());
        collection.organization_id = None;
        assert!(collection.validate().is_err());
    }

    #[test]
    fn object_accessors() {
        let note = Object::secure_note("Secret", "my secret data");
        assert_eq!(note.object_type(), ObjectType::Item);
        assert_eq!(note.item_type(), Some(ItemType::SecureNote));
        assert_eq!(note.as_item().unwrap().notes.as_deref(), Some("my secret data"));
        assert_eq!(note.type_label(), "item (secure note)");

        let folder = Object::folder("Work");
        assert_eq!(folder.item_type(), None);
        assert!(!folder.is_deleted());
    }

    #[test]
    fn deleted_items_are_detected() {
        let mut login = Object::login("Test", Login::new("u", "p"));
        assert!(!login.is_deleted());
        login.as_item_mut().unwrap().deleted_date = Some("2024-01-01T00:00:00Z".into());
        assert!(login.is_deleted());
    }

    // ── Config ──────────────────────────────────────────────────────

    #[test]
    fn config_default() {
        let c = ClientConfig::default();
        assert_eq!(c.cli_path, "bw");
        assert_eq!(c.timeout(), Some(Duration::from_secs(60)));
        assert!(c.passthrough_env.contains(&"PATH".to_string()));
        assert_eq!(c.auth_retry, AuthRetryPolicy::FailFast);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let c: ClientConfig =
            serde_json::from_str(r#"{"serverUrl":"https://vault.example.com","timeoutSecs":0}"#)
                .unwrap();
        assert_eq!(c.server_url.as_deref(), Some("https://vault.example.com"));
        assert_eq!(c.timeout(), None);
        assert!(c.sync_after_unlock);

        let c: ClientConfig = serde_json::from_str(r#"{"timeoutSecs":5,"timeoutMs":250}"#).unwrap();
        assert_eq!(c.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn sub_second_timeouts_are_kept() {
        let c = ClientConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(c.timeout(), Some(Duration::from_millis(500)));
        let c = ClientConfig::default().with_timeout(Duration::from_millis(1900));
        assert_eq!(c.timeout(), Some(Duration::from_millis(1900)));
        let c = ClientConfig::default().with_timeout(Duration::from_micros(10));
        assert_eq!(c.timeout(), Some(Duration::from_millis(1)));
        let c = ClientConfig::default().with_timeout(Duration::ZERO);
        assert_eq!(c.timeout(), None);
    }

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = BitwardenError::Timeout {
            command: "sync".into(),
            timeout: Duration::from_millis(50),
        };
        assert_eq!(err.to_string(), "'sync' timed out after 50ms");
    }

    #[test]
    fn config_builders() {
        let c = ClientConfig::default()
            .with_cli_path("/opt/bw")
            .with_server_url("https://bw.example.com/")
            .with_env("FOO", "bar")
            .with_auth_retry(AuthRetryPolicy::ReauthenticateOnce);
        assert_eq!(c.cli_path, "/opt/bw");
        assert_eq!(c.server_url.as_deref(), Some("https://bw.example.com"));
        assert_eq!(c.extra_env, vec![("FOO".to_string(), "bar".to_string())]);
        assert_eq!(c.auth_retry, AuthRetryPolicy::ReauthenticateOnce);
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = Credentials::api_key("user.abc", "s3cr3t", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("user.abc"));
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(creds.master_password(), "hunter2");
    }

    #[test]
    fn vault_status_parse() {
        assert_eq!(VaultStatus::parse("unlocked"), VaultStatus::Unlocked);
        assert_eq!(VaultStatus::parse("LOCKED"), VaultStatus::Locked);
        assert_eq!(VaultStatus::parse("whatever"), VaultStatus::Unauthenticated);
    }
}
