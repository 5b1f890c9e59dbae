//! Public client surface.
//!
//! Every data operation runs under a ready session: the session manager
//! logs in and unlocks on demand, and a CLI response that rejects the
//! session drops it so the next call acquires a fresh one.

use crate::bitwarden::command::{self, Command, FilterOption, ListFilter};
use crate::bitwarden::decode;
use crate::bitwarden::exec::{ExecOutput, Executor, ProcessExecutor, Runner};
use crate::bitwarden::select::{self, Selector};
use crate::bitwarden::session::{SessionInfo, SessionManager, SessionStatus};
use crate::bitwarden::types::*;
use log::{debug, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Client {
    config: ClientConfig,
    runner: Runner,
    session: SessionManager,
}

impl Client {
    /// A client driving the configured `bw` binary.
    pub fn new(config: ClientConfig, credentials: Option<Credentials>) -> Self {
        let executor = Arc::new(ProcessExecutor::from_config(&config));
        Self::with_executor(config, credentials, executor)
    }

    pub fn with_executor(
        config: ClientConfig,
        credentials: Option<Credentials>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let runner = Runner::new(executor, &config);
        let session = SessionManager::new(runner.clone(), &config, credentials);
        Self { config, runner, session }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Session lifecycle ───────────────────────────────────────────

    /// `bw status`, under the current session if there is one.
    pub async fn status(&self, cancel: &CancellationToken) -> BitwardenResult<StatusInfo> {
        let command = command::status();
        let token = self.session.session_key().await;
        let output = self.runner.run(cancel, &command, token.as_deref()).await?;
        decode::decode_status(&command, &output)
    }

    /// Point the CLI at another vault server.
    pub async fn set_server(&self, cancel: &CancellationToken, url: &str) -> BitwardenResult<()> {
        self.runner.run(cancel, &command::config_server(url), None).await?;
        info!("Bitwarden server set to {}", url);
        Ok(())
    }

    pub async fn login(&self, cancel: &CancellationToken) -> BitwardenResult<()> {
        self.session.login(cancel).await
    }

    pub async fn unlock(&self, cancel: &CancellationToken) -> BitwardenResult<()> {
        self.session.unlock(cancel).await.map(|_| ())
    }

    pub async fn sync(&self, cancel: &CancellationToken) -> BitwardenResult<()> {
        self.run_authenticated(cancel, &command::sync()).await?;
        info!("Vault synced");
        Ok(())
    }

    pub async fn logout(&self, cancel: &CancellationToken) -> BitwardenResult<()> {
        self.session.logout(cancel).await
    }

    pub async fn session_status(&self) -> SessionStatus {
        self.session.status().await
    }

    pub async fn session_info(&self) -> SessionInfo {
        self.session.info().await
    }

    pub async fn session_key(&self) -> Option<String> {
        self.session.session_key().await
    }

    /// Adopt an externally obtained session token, or forget the current one.
    pub async fn set_session_key(&self, token: Option<String>) {
        self.session.set_session_key(token).await
    }

    // ── Objects ─────────────────────────────────────────────────────

    /// Create an object and return it as stored, with its new id.
    pub async fn create_object(
        &self,
        cancel: &CancellationToken,
        object: &Object,
    ) -> BitwardenResult<Object> {
        let command = command::create(object)?;
        let created = self.fetch_object(cancel, &command, object).await?;
        debug!("Created {} {}", created.type_label(), created.id);
        Ok(created)
    }

    /// Fetch the object whose id (and organization, for collections) is
    /// set on `object`. The result must be of the same type.
    pub async fn get_object(
        &self,
        cancel: &CancellationToken,
        object: &Object,
    ) -> BitwardenResult<Object> {
        let command = command::get(object)?;
        self.fetch_object(cancel, &command, object).await
    }

    pub async fn edit_object(
        &self,
        cancel: &CancellationToken,
        object: &Object,
    ) -> BitwardenResult<Object> {
        let command = command::edit(object)?;
        self.fetch_object(cancel, &command, object).await
    }

    pub async fn delete_object(
        &self,
        cancel: &CancellationToken,
        object: &Object,
    ) -> BitwardenResult<()> {
        let command = command::delete(object)?;
        self.run_authenticated(cancel, &command).await?;
        debug!("Deleted {} {}", object.object_type(), object.id);
        Ok(())
    }

    /// `bw list <type_name>` with the given filters, as returned by the CLI.
    pub async fn list_objects(
        &self,
        cancel: &CancellationToken,
        type_name: &str,
        options: &[FilterOption],
    ) -> BitwardenResult<Vec<Object>> {
        let command = command::list(type_name, &ListFilter::from_options(options));
        let output = self.run_authenticated(cancel, &command).await?;
        decode::decode_objects(&command, &output)
    }

    /// Look up the single object of the given type matching the filters.
    pub async fn find_object(
        &self,
        cancel: &CancellationToken,
        object_type: ObjectType,
        item_type: Option<ItemType>,
        options: &[FilterOption],
    ) -> BitwardenResult<Object> {
        let filter = ListFilter::from_options(options);
        let command = command::list(object_type.list_name(), &filter);
        let output = self.run_authenticated(cancel, &command).await?;
        let objects = decode::decode_objects(&command, &output)?;

        let mut selector = Selector::new(object_type).with_filter(filter);
        if let Some(item_type) = item_type {
            selector = selector.with_item_type(item_type);
        }
        selector.select(objects)
    }

    // ── Attachments ─────────────────────────────────────────────────

    /// Upload a file to an item and return the updated item.
    pub async fn create_attachment(
        &self,
        cancel: &CancellationToken,
        item_id: &str,
        file_path: &str,
    ) -> BitwardenResult<Object> {
        let command = command::create_attachment(item_id, file_path);
        let output = self.run_authenticated(cancel, &command).await?;
        let item = decode::decode_object(&command, &output)?;
        if item.object_type() != ObjectType::Item {
            return Err(BitwardenError::TypeMismatch {
                expected: ObjectType::Item.to_string(),
                actual: item.type_label(),
            });
        }
        Ok(item)
    }

    /// Raw attachment contents.
    pub async fn get_attachment(
        &self,
        cancel: &CancellationToken,
        item_id: &str,
        attachment_id: &str,
    ) -> BitwardenResult<Vec<u8>> {
        let command = command::get_attachment(item_id, attachment_id);
        Ok(self.run_authenticated(cancel, &command).await?.stdout)
    }

    pub async fn delete_attachment(
        &self,
        cancel: &CancellationToken,
        item_id: &str,
        attachment_id: &str,
    ) -> BitwardenResult<()> {
        let command = command::delete_attachment(item_id, attachment_id);
        self.run_authenticated(cancel, &command).await?;
        Ok(())
    }

    // ── Execution ───────────────────────────────────────────────────

    async fn fetch_object(
        &self,
        cancel: &CancellationToken,
        command: &Command,
        requested: &Object,
    ) -> BitwardenResult<Object> {
        let output = self.run_authenticated(cancel, command).await?;
        let returned = decode::decode_object(command, &output)?;
        select::verify_identity(requested, returned)
    }

    /// Run a command under a ready session, dropping the session when the
    /// CLI rejects it.
    async fn run_authenticated(
        &self,
        cancel: &CancellationToken,
        command: &Command,
    ) -> BitwardenResult<ExecOutput> {
        let mut may_retry = self.config.auth_retry == AuthRetryPolicy::ReauthenticateOnce;
        loop {
            let token = self.session.ensure_ready(cancel).await?;
            match self.runner.run(cancel, command, Some(&token)).await {
                Err(e) if e.is_auth() => {
                    self.session.invalidate(&token).await;
                    if !may_retry {
                        return Err(e);
                    }
                    may_retry = false;
                    info!("Retrying bw {} with a new session", command.summary());
                }
                result => return result,
            }
        }
    }
}
