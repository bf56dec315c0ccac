//! Transaction lock.
//!
//! The CLI has no lock primitive. Creating and deleting a reserved alias
//! forces the fabric to open a transaction owned by this session, and the
//! token it reports afterwards is ours.

use log::{debug, warn};

use super::agent::{Agent, TransactionState};
use crate::error::Result;
use crate::model::ObjectKind;
use crate::session::Shell;

/// Reserved alias created and deleted to open a transaction.
pub const LOCK_ALIAS: &str = "fabricsh_lock";

/// Member of [`LOCK_ALIAS`]; never seen by any device.
pub const LOCK_MEMBER: &str = "50:00:00:00:00:00:00:00";

/// Outcome of [`Agent::lock_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockResult {
    /// A transaction was opened and its token recorded.
    Acquired,
    /// This agent already holds an open transaction.
    AlreadyHeld,
    /// The lock could not be taken; the caller must not proceed.
    Unavailable,
}

impl LockResult {
    /// True when the caller may go on with its changes.
    pub fn is_held(self) -> bool {
        self != LockResult::Unavailable
    }
}

impl<S: Shell> Agent<S> {
    /// Take the fabric's transaction slot for this agent.
    ///
    /// Never fails: any error on the way is logged and reported as
    /// [`LockResult::Unavailable`].
    pub async fn lock_transaction(&mut self) -> LockResult {
        match self.try_lock().await {
            Ok(result) => {
                debug!("Transaction lock: {:?}", result);
                result
            }
            Err(e) => {
                warn!("Failed to lock transaction: {}", e);
                LockResult::Unavailable
            }
        }
    }

    async fn try_lock(&mut self) -> Result<LockResult> {
        if let TransactionState::Held(current) = &self.current {
            if current.is_open() {
                return Ok(LockResult::AlreadyHeld);
            }
        }

        let kind = ObjectKind::Alias;
        let create = format!("{} '{LOCK_ALIAS}', '{LOCK_MEMBER}'", kind.create_command());
        let response = self.switch.query(&[create.as_str()]).await?;
        self.validate(&response)?;

        // the create opened a transaction that holds the lock alias
        match self.finish_lock().await {
            Ok(result) => Ok(result),
            Err(e) => {
                match self.abort_transaction().await {
                    Ok(aborted) => debug!("Half-taken lock aborted: {}", aborted),
                    Err(abort) => warn!("Failed to abort half-taken lock: {}", abort),
                }
                Err(e)
            }
        }
    }

    async fn finish_lock(&mut self) -> Result<LockResult> {
        let delete = format!("{} '{LOCK_ALIAS}'", ObjectKind::Alias.delete_command());
        let response = self.switch.query(&[delete.as_str()]).await?;
        self.validate(&response)?;

        let transaction = self.get_transaction().await?;
        if !transaction.is_open() {
            return Ok(LockResult::Unavailable);
        }
        debug!("Holding transaction {}", transaction.id.as_str());
        self.current = TransactionState::Held(transaction);
        Ok(LockResult::Acquired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{DeviceConfig, ScriptedShell};

    const TOKEN: &str = "Current transaction token is 0x5a1\nIt is abortable\n";

    fn agent(shell: &ScriptedShell) -> Agent<ScriptedShell> {
        Agent::new(shell.clone(), DeviceConfig::default())
    }

    fn lock_commands(shell: &ScriptedShell) {
        shell
            .expect("alicreate 'fabricsh_lock', '50:00:00:00:00:00:00:00'", "")
            .expect("alidelete 'fabricsh_lock'", "");
    }

    #[tokio::test]
    async fn test_lock_acquired() {
        let shell = ScriptedShell::new();
        lock_commands(&shell);
        shell.expect("cfgtransshow", TOKEN);
        let mut agent = agent(&shell);

        assert_eq!(agent.lock_transaction().await, LockResult::Acquired);
        let held = agent.current_transaction().unwrap();
        assert_eq!(held.id.as_str(), "0x5a1");
        assert!(held.abortable);

        // a second attempt does not touch the switch
        assert_eq!(agent.lock_transaction().await, LockResult::AlreadyHeld);
        assert_eq!(shell.pending(), 0);
    }

    #[tokio::test]
    async fn test_lock_rejected_is_unavailable() {
        let shell = ScriptedShell::new();
        shell.expect(
            "alicreate 'fabricsh_lock', '50:00:00:00:00:00:00:00'",
            "Zone DB is locked by another transaction\n",
        );
        let mut agent = agent(&shell);

        assert_eq!(agent.lock_transaction().await, LockResult::Unavailable);
        assert!(agent.current_transaction().is_none());
        assert_eq!(shell.log().count("alidelete 'fabricsh_lock'"), 0);
    }

    #[tokio::test]
    async fn test_lock_without_token_is_unavailable() {
        let shell = ScriptedShell::new();
        lock_commands(&shell);
        shell.expect("cfgtransshow", "There is no outstanding zoning transaction\n");
        let mut agent = agent(&shell);

        let result = agent.lock_transaction().await;
        assert_eq!(result, LockResult::Unavailable);
        assert!(!result.is_held());
    }

    #[tokio::test]
    async fn test_failed_delete_aborts_opened_transaction() {
        let shell = ScriptedShell::new();
        shell
            .expect("alicreate 'fabricsh_lock', '50:00:00:00:00:00:00:00'", "")
            .expect("alidelete 'fabricsh_lock'", "Zone DB busy\n")
            .expect("cfgtransabort", "");
        let mut agent = agent(&shell);

        assert_eq!(agent.lock_transaction().await, LockResult::Unavailable);
        assert!(agent.current_transaction().is_none());
        assert_eq!(shell.log().count("cfgtransabort"), 1);
        assert_eq!(shell.pending(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_token_aborts_opened_transaction() {
        let shell = ScriptedShell::new();
        lock_commands(&shell);
        shell
            .expect("cfgtransshow", "garbage\n")
            .expect("cfgtransabort", "Abort failed\n");
        let mut agent = agent(&shell);

        // a failing abort still reports the lock as unavailable
        assert_eq!(agent.lock_transaction().await, LockResult::Unavailable);
        assert_eq!(shell.log().count("cfgtransabort"), 1);
        assert_eq!(shell.pending(), 0);
    }
}
