//! Typed access to the barman subcommands the exporter relies on.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::command::{CommandError, CommandInvoker};
use super::models::{
    BarmanCheck, BarmanListBackup, BarmanListServer, BarmanShowBackup, BarmanStatus,
};

/// Decodes barman's JSON answers into the models of [`super::models`].
#[derive(Clone)]
pub struct BarmanClient {
    invoker: Arc<dyn CommandInvoker>,
}

impl BarmanClient {
    pub fn new(invoker: Arc<dyn CommandInvoker>) -> Self {
        Self { invoker }
    }

    /// `barman check <server>`
    pub async fn check(&self, server: &str) -> Result<BarmanCheck, CommandError> {
        self.fetch("check", &[server]).await
    }

    /// `barman list-server`
    pub async fn list_server(&self) -> Result<BarmanListServer, CommandError> {
        self.fetch("list-server", &[]).await
    }

    /// `barman list-backup <server>`
    pub async fn list_backup(&self, server: &str) -> Result<BarmanListBackup, CommandError> {
        self.fetch("list-backup", &[server]).await
    }

    /// `barman status <server>`
    pub async fn status(&self, server: &str) -> Result<BarmanStatus, CommandError> {
        self.fetch("status", &[server]).await
    }

    /// `barman show-backup <server> <backup_id>`
    pub async fn show_backup(
        &self,
        server: &str,
        backup_id: &str,
    ) -> Result<BarmanShowBackup, CommandError> {
        self.fetch("show-backup", &[server, backup_id]).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        subcommand: &str,
        args: &[&str],
    ) -> Result<T, CommandError> {
        let stdout = self.invoker.invoke(subcommand, args).await?;
        serde_json::from_slice(&stdout).map_err(|e| CommandError::new(subcommand, args, e))
    }
}
