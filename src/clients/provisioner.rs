//! # Channel provisioner.
//!
//! Creates and deletes topics. Both operations are idempotent from the caller's point of
//! view: "already exists" on create (and "does not exist" on delete) come back as
//! [`Error::ChannelConflict`], which callers report and otherwise ignore.

use async_trait::async_trait;

use crate::error::Error;

/// Topic administration.
#[async_trait]
pub trait ChannelProvisioner: Send + Sync + 'static {
    /// Creates topic `name`.
    async fn create(&self, name: &str) -> Result<(), Error>;

    /// Deletes topic `name`.
    async fn delete(&self, name: &str) -> Result<(), Error>;
}
