//! Command builder: deterministic `bw` argument vectors.
//!
//! Every argument is a discrete vector element; nothing is ever joined
//! into a shell string. Commands that need secrets carry them as
//! per-command environment variables rather than arguments.

use crate::bitwarden::encode;
use crate::bitwarden::types::*;
use std::fmt;

/// Flag used to scope org-collection commands.
const ORGANIZATION_FLAG: &str = "--organizationid";
/// Placeholder printed instead of an object payload.
const REDACTED_PAYLOAD: &str = "<payload>";

/// Environment variable carrying the master password for one command.
pub const ENV_PASSWORD: &str = "BW_PASSWORD";
pub const ENV_CLIENT_ID: &str = "BW_CLIENTID";
pub const ENV_CLIENT_SECRET: &str = "BW_CLIENTSECRET";

/// Top-level `bw` operations used by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Get,
    Edit,
    Delete,
    List,
    Sync,
    Login,
    Unlock,
    Logout,
    Status,
    Config,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Sync => "sync",
            Self::Login => "login",
            Self::Unlock => "unlock",
            Self::Logout => "logout",
            Self::Status => "status",
            Self::Config => "config",
        }
    }
}

// ── Filter options ──────────────────────────────────────────────────

/// One optional constraint narrowing a `list` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOption {
    FolderId(String),
    CollectionId(String),
    OrganizationId(String),
    Search(String),
    Url(String),
}

impl FilterOption {
    pub fn folder_id(id: &str) -> Self {
        Self::FolderId(id.to_string())
    }
    pub fn collection_id(id: &str) -> Self {
        Self::CollectionId(id.to_string())
    }
    pub fn organization_id(id: &str) -> Self {
        Self::OrganizationId(id.to_string())
    }
    pub fn search(term: &str) -> Self {
        Self::Search(term.to_string())
    }
    pub fn url(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

/// The combined (logical AND) set of filter options of a query.
///
/// Flags are always emitted in declaration order, whatever order the
/// options were supplied in. A repeated option keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub folder_id: Option<String>,
    pub collection_id: Option<String>,
    pub organization_id: Option<String>,
    pub search: Option<String>,
    pub url: Option<String>,
}

impl ListFilter {
    pub fn from_options(options: &[FilterOption]) -> Self {
        let mut filter = Self::default();
        for option in options {
            match option {
                FilterOption::FolderId(v) => filter.folder_id = Some(v.clone()),
                FilterOption::CollectionId(v) => filter.collection_id = Some(v.clone()),
                FilterOption::OrganizationId(v) => filter.organization_id = Some(v.clone()),
                FilterOption::Search(v) => filter.search = Some(v.clone()),
                FilterOption::Url(v) => filter.url = Some(v.clone()),
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn push_args(&self, args: &mut Vec<String>) {
        let flags = [
            ("--folderid", &self.folder_id),
            ("--collectionid", &self.collection_id),
            (ORGANIZATION_FLAG, &self.organization_id),
            ("--search", &self.search),
            ("--url", &self.url),
        ];
        for (flag, value) in flags {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
    }
}

// ── Command ─────────────────────────────────────────────────────────

/// A fully built `bw` invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    operation: Operation,
    args: Vec<String>,
    env: Vec<(String, String)>,
    payload_index: Option<usize>,
}

impl Command {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            args: vec![operation.as_str().to_string()],
            env: Vec::new(),
            payload_index: None,
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn payload(mut self, payload: String) -> Self {
        self.payload_index = Some(self.args.len());
        self.args.push(payload);
        self
    }

    fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    fn organization_scope(self, object: &Object) -> BitwardenResult<Self> {
        if object.object_type() != ObjectType::OrgCollection {
            return Ok(self);
        }
        match object.organization_id.as_deref() {
            Some(org) if !org.is_empty() => Ok(self.arg(ORGANIZATION_FLAG).arg(org)),
            _ => Err(BitwardenError::invalid("org-collection requires an organization id")),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The argument vector handed to the executable.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Variables this command needs on top of the shared environment.
    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Operation and object type, e.g. `list org-collection`.
    pub fn summary(&self) -> String {
        self.args.iter().take(2).map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    /// Whitespace-joined arguments with any object payload replaced by a
    /// placeholder.
    pub fn redacted(&self) -> String {
        self.args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                if Some(i) == self.payload_index { REDACTED_PAYLOAD } else { arg.as_str() }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Command")
            .field("args", &self.redacted())
            .field("env", &env_keys)
            .finish()
    }
}

fn require_id(object: &Object) -> BitwardenResult<&str> {
    if object.id.is_empty() {
        Err(BitwardenError::invalid(format!("{} has no id", object.object_type())))
    } else {
        Ok(&object.id)
    }
}

// ── Object commands ─────────────────────────────────────────────────

/// `create <type> <payload> [--organizationid <org>]`
pub fn create(object: &Object) -> BitwardenResult<Command> {
    let payload = encode::encode(object)?;
    Command::new(Operation::Create)
        .arg(object.object_type().as_str())
        .payload(payload)
        .organization_scope(object)
}

/// `get <type> <id> [--organizationid <org>]`
pub fn get(object: &Object) -> BitwardenResult<Command> {
    let id = require_id(object)?;
    Command::new(Operation::Get)
        .arg(object.object_type().as_str())
        .arg(id)
        .organization_scope(object)
}

/// `edit <type> <id> <payload> [--organizationid <org>]`
pub fn edit(object: &Object) -> BitwardenResult<Command> {
    let id = require_id(object)?;
    let payload = encode::encode(object)?;
    Command::new(Operation::Edit)
        .arg(object.object_type().as_str())
        .arg(id)
        .payload(payload)
        .organization_scope(object)
}

/// `delete <type> <id> [--organizationid <org>]`
pub fn delete(object: &Object) -> BitwardenResult<Command> {
    let id = require_id(object)?;
    Command::new(Operation::Delete)
        .arg(object.object_type().as_str())
        .arg(id)
        .organization_scope(object)
}

/// `list <type-name> [--<option> <value>]...`
///
/// `type_name` is passed through verbatim (`items`, `folders`,
/// `org-collections`, ...).
pub fn list(type_name: &str, filter: &ListFilter) -> Command {
    let mut command = Command::new(Operation::List).arg(type_name);
    filter.push_args(&mut command.args);
    command
}

// ── Attachments ─────────────────────────────────────────────────────

/// `create attachment --itemid <item> --file <path>`
pub fn create_attachment(item_id: &str, file_path: &str) -> Command {
    Command::new(Operation::Create)
        .arg("attachment")
        .arg("--itemid")
        .arg(item_id)
        .arg("--file")
        .arg(file_path)
}

/// `get attachment <attachment> --itemid <item> --raw`
pub fn get_attachment(item_id: &str, attachment_id: &str) -> Command {
    Command::new(Operation::Get)
        .arg("attachment")
        .arg(attachment_id)
        .arg("--itemid")
        .arg(item_id)
        .arg("--raw")
}

/// `delete attachment <attachment> --itemid <item>`
pub fn delete_attachment(item_id: &str, attachment_id: &str) -> Command {
    Command::new(Operation::Delete)
        .arg("attachment")
        .arg(attachment_id)
        .arg("--itemid")
        .arg(item_id)
}

// ── Session lifecycle ───────────────────────────────────────────────

pub fn status() -> Command {
    Command::new(Operation::Status)
}

pub fn sync() -> Command {
    Command::new(Operation::Sync)
}

pub fn logout() -> Command {
    Command::new(Operation::Logout)
}

/// `config server <url>`
pub fn config_server(url: &str) -> Command {
    Command::new(Operation::Config).arg("server").arg(url)
}

/// `login` for the given credentials. The secret never appears in the
/// argument vector.
pub fn login(credentials: &Credentials) -> Command {
    match credentials {
        Credentials::Password { email, master_password } => Command::new(Operation::Login)
            .arg(email.as_str())
            .arg("--passwordenv")
            .arg(ENV_PASSWORD)
            .env(ENV_PASSWORD, master_password),
        Credentials::ApiKey { client_id, client_secret, .. } => Command::new(Operation::Login)
            .arg("--apikey")
            .env(ENV_CLIENT_ID, client_id)
            .env(ENV_CLIENT_SECRET, client_secret),
    }
}

/// `unlock --passwordenv BW_PASSWORD --raw`, printing the session token.
pub fn unlock(master_password: &str) -> Command {
    Command::new(Operation::Unlock)
        .arg("--passwordenv")
        .arg(ENV_PASSWORD)
        .arg("--raw")
        .env(ENV_PASSWORD, master_password)
}
