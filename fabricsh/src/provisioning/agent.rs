//! Zoning changes with the switch's transaction protocol.
//!
//! Every create, delete, add and remove opens (or joins) a zoning
//! transaction on the fabric. Outside a [`transaction`](Agent::transaction)
//! block each change is saved right away; inside one, the block saves once
//! at the end and aborts everything when its body fails.

use log::{debug, warn};

use crate::error::{Error, ProvisioningError, Result};
use crate::fabric::{FindOptions, Switch};
use crate::model::naming::is_hardware_member;
use crate::model::{
    Alias, ObjectKind, Transaction, TransactionId, Zone, ZoneConfiguration, ZoneMember,
    ZoningEntity, ZoningObject,
};
use crate::parser::{Response, Value};
use crate::session::{DeviceConfig, Shell};

const NO_OPEN_TRANSACTION: &str = "There is no outstanding zoning transaction";
const NOTHING_TO_ABORT: &str = "There is no outstanding transaction";
const FOREIGN_TRANSACTION: &str = "trans_abort: there is an outstanding  transaction";
const CANCELLED: &str = "Operation cancelled";
const NOTHING_TO_SAVE: &str = "Nothing changed: nothing to save";
const SAVED: &str = "Updating flash";
const ABSENT: &str = "does not exist";
const RBAC_DENIED: &str = "RBAC permission denied";

/// What this agent knows about the transaction it is working in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum TransactionState {
    /// Not inside a transaction block.
    #[default]
    Idle,
    /// Inside a block, token not read yet.
    Pending,
    /// Inside a block holding this transaction.
    Held(Transaction),
}

/// A [`Switch`] allowed to change zoning.
#[derive(Debug)]
pub struct Agent<S: Shell> {
    pub(super) switch: Switch<S>,
    pub(super) current: TransactionState,
    transaction_depth: usize,
}

impl<S: Shell> Agent<S> {
    /// Wrap a shell without talking to the switch.
    pub fn new(shell: S, config: DeviceConfig) -> Self {
        Self::from_switch(Switch::new(shell, config))
    }

    pub fn from_switch(switch: Switch<S>) -> Self {
        Self {
            switch,
            current: TransactionState::Idle,
            transaction_depth: 0,
        }
    }

    /// Connect, probe for virtual fabrics and check the account may change
    /// zoning.
    pub async fn connect(shell: S, config: DeviceConfig) -> Result<Self> {
        let switch = Switch::connect(shell, config).await?;
        let mut agent = Self::from_switch(switch);
        agent.verify().await?;
        Ok(agent)
    }

    pub fn switch(&self) -> &Switch<S> {
        &self.switch
    }

    pub fn switch_mut(&mut self) -> &mut Switch<S> {
        &mut self.switch
    }

    /// Nesting level of [`transaction`](Self::transaction) blocks.
    pub fn transaction_depth(&self) -> usize {
        self.transaction_depth
    }

    /// The transaction held by the current block, once its token is known.
    pub fn current_transaction(&self) -> Option<&Transaction> {
        match &self.current {
            TransactionState::Held(t) => Some(t),
            _ => None,
        }
    }

    fn in_transaction(&self) -> bool {
        self.current != TransactionState::Idle
    }

    /// Fail with [`ProvisioningError::InsufficientRights`] when the account
    /// may not change zoning.
    pub async fn verify(&mut self) -> Result<()> {
        let response = self.switch.query(&["configshow | grep RBAC"]).await?;
        if response.contains(RBAC_DENIED) {
            return Err(ProvisioningError::InsufficientRights.into());
        }
        Ok(())
    }

    async fn session<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        self.switch.open().await?;
        let result = f(self).await;
        let closed = self.switch.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Run `f` as one zoning transaction over one connection.
    ///
    /// The outermost block refuses to start while another transaction is
    /// open, takes the transaction lock, and saves after `f` if the
    /// transaction is still open. If `f` fails the transaction is aborted
    /// and the error from `f` is returned. Nested blocks join the outer one.
    pub async fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        self.transaction_depth += 1;
        let result = self.run_transaction(f).await;
        self.transaction_depth -= 1;
        if self.transaction_depth == 0 {
            self.current = TransactionState::Idle;
        }
        result
    }

    async fn run_transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        let outermost = self.transaction_depth == 1;
        self.session(async |agent: &mut Self| {
            if outermost {
                if agent.check_for_running_transaction().await? {
                    return Err(Error::from(ProvisioningError::TransactionInProgress));
                }
                agent.current = TransactionState::Pending;
                if !agent.lock_transaction().await.is_held() {
                    return Err(Error::from(ProvisioningError::TransactionUnlockable));
                }
            }
            let result = agent.transaction_body(outermost, f).await;
            if result.is_err() && outermost {
                match agent.abort_transaction().await {
                    Ok(aborted) => debug!("Transaction aborted: {}", aborted),
                    Err(e) => warn!("Failed to abort transaction: {}", e),
                }
            }
            result
        })
        .await
    }

    async fn transaction_body<T, F>(&mut self, outermost: bool, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        let value = f(self).await?;
        if outermost && self.get_transaction().await?.is_open() {
            self.cfg_save().await?;
        }
        Ok(value)
    }

    /// True when a transaction other than ours is open on the fabric.
    pub async fn check_for_running_transaction(&mut self) -> Result<bool> {
        if self.in_transaction() {
            return Ok(false);
        }
        let response = self.switch.query(&["cfgtransshow"]).await?;
        Ok(!response.contains(NO_OPEN_TRANSACTION))
    }

    /// The fabric's outstanding transaction as `cfgtransshow` reports it.
    pub async fn get_transaction(&mut self) -> Result<Transaction> {
        let response = self.switch.query(&["cfgtransshow"]).await?;
        let state = response
            .get("cfg_transaction")
            .and_then(Value::as_map)
            .ok_or(ProvisioningError::UnexpectedTransactionState)?;
        let id = state
            .get("id")
            .and_then(Value::as_str)
            .ok_or(ProvisioningError::UnexpectedTransactionState)?;
        let abortable = state
            .get("abortable")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Transaction::new(TransactionId::parse(id), abortable))
    }

    /// Abort the outstanding transaction.
    ///
    /// Returns `false` when there was nothing to abort.
    pub async fn abort_transaction(&mut self) -> Result<bool> {
        let response = self.switch.query(&["cfgtransabort"]).await?;
        if response.line_count() == 1 {
            return Ok(true);
        }
        if response.contains(NOTHING_TO_ABORT) {
            return Ok(false);
        }
        if response.contains(FOREIGN_TRANSACTION) {
            return Err(ProvisioningError::NotOwner.into());
        }
        Err(ProvisioningError::Rejected(response.output()).into())
    }

    /// Commit the defined configuration.
    pub async fn cfg_save(&mut self) -> Result<()> {
        let response = self.switch.query_interactive("cfgsave", &["y"]).await?;
        if response.contains(CANCELLED) {
            Err(ProvisioningError::SaveCancelled.into())
        } else if response.contains(NOTHING_TO_SAVE) {
            Err(ProvisioningError::NothingToSave.into())
        } else if response.contains(SAVED) {
            debug!("Configuration saved");
            Ok(())
        } else {
            Err(ProvisioningError::Unrecognized(response.output()).into())
        }
    }

    /// Make `cfg` the effective configuration.
    pub async fn cfg_enable(&mut self, cfg: &ZoneConfiguration) -> Result<()> {
        let command = format!("cfgenable \"{}\"", cfg.name());
        let response = self.switch.query_interactive(&command, &["y"]).await?;
        if response.contains(CANCELLED) {
            Err(ProvisioningError::SaveCancelled.into())
        } else if response.contains(SAVED) {
            debug!("Configuration {} enabled", cfg.name());
            Ok(())
        } else {
            Err(ProvisioningError::Unrecognized(response.output()).into())
        }
    }

    /// Accept a one-line reply, raise anything longer as the switch's message.
    pub(super) fn validate(&self, response: &Response) -> Result<()> {
        if response.line_count() == 1 {
            Ok(())
        } else {
            Err(ProvisioningError::Rejected(response.output()).into())
        }
    }

    async fn validate_and_save(&mut self, response: &Response) -> Result<()> {
        self.validate(response)?;
        if !self.in_transaction() {
            self.cfg_save().await?;
        }
        Ok(())
    }

    async fn execute(&mut self, command: &str) -> Result<()> {
        debug!("Provisioning '{}'", command);
        let response = self.switch.query(&[command]).await?;
        self.validate_and_save(&response).await
    }

    async fn ensure_no_foreign_transaction(&mut self) -> Result<()> {
        if self.check_for_running_transaction().await? {
            return Err(ProvisioningError::TransactionInProgress.into());
        }
        Ok(())
    }

    /// True when an object named `name` of `kind` is defined, including
    /// changes of the open transaction.
    pub async fn exist(&mut self, name: &str, kind: ObjectKind) -> Result<bool> {
        let command = format!("{} \"{name}\"", kind.show_command());
        let response = self.switch.query(&[command.as_str()]).await?;
        Ok(!response.contains(ABSENT))
    }

    async fn require(&mut self, name: &str, kind: ObjectKind) -> Result<()> {
        if self.exist(name, kind).await? {
            Ok(())
        } else {
            Err(ProvisioningError::DoesNotExist {
                kind: kind.label().to_string(),
                name: name.to_string(),
            }
            .into())
        }
    }

    /// Check the objects `members` refer to exist. Hardware members of a
    /// zone and alias members need no object.
    async fn require_members(&mut self, kind: ObjectKind, members: &[String]) -> Result<()> {
        let member_kind = match kind {
            ObjectKind::Cfg => ObjectKind::Zone,
            ObjectKind::Zone => ObjectKind::Alias,
            ObjectKind::Alias => return Ok(()),
        };
        for member in members {
            if member_kind == ObjectKind::Alias && is_hardware_member(member) {
                continue;
            }
            self.require(member, member_kind).await?;
        }
        Ok(())
    }

    async fn show(&mut self, name: &str, kind: ObjectKind) -> Result<Option<Vec<String>>> {
        let command = format!("{} \"{name}\"", kind.show_command());
        let response = self.switch.query(&[command.as_str()]).await?;
        Ok(response
            .get(kind.key())
            .and_then(Value::as_map)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            })
            .map(|(_, members)| members.to_string_list()))
    }

    /// Read the object named `name` from the fabric.
    pub async fn pull<T: ZoningObject>(&mut self, name: &str) -> Result<Option<T>> {
        match self.show(name, T::KIND).await? {
            Some(members) => Ok(Some(T::from_entry(name, &members)?)),
            None => Ok(None),
        }
    }

    /// Read an object of unknown kind, trying configurations, then zones,
    /// then aliases.
    pub async fn pull_any(&mut self, name: &str) -> Result<Option<ZoningEntity>> {
        for kind in ObjectKind::ALL {
            if let Some(members) = self.show(name, kind).await? {
                return Ok(Some(ZoningEntity::from_entry(kind, name, &members)?));
            }
        }
        Ok(None)
    }

    async fn pull_required<T: ZoningObject>(&mut self, name: &str) -> Result<T> {
        self.pull(name).await?.ok_or_else(|| {
            ProvisioningError::DoesNotExist {
                kind: T::KIND.label().to_string(),
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Define `object` with its members and return it as the fabric has it.
    pub async fn create<T: ZoningObject>(&mut self, object: &T) -> Result<T> {
        if object.members().is_empty() {
            return Err(ProvisioningError::MembersEmpty.into());
        }
        self.session(async |agent: &mut Self| {
            agent.ensure_no_foreign_transaction().await?;
            agent.require_members(T::KIND, object.members()).await?;
            let command = format!(
                "{} '{}', '{}'",
                T::KIND.create_command(),
                object.name(),
                object.members().join(";")
            );
            agent.execute(&command).await?;
            agent.pull_required(object.name()).await
        })
        .await
    }

    /// Delete `object` by name.
    pub async fn delete<T: ZoningObject>(&mut self, object: &T) -> Result<()> {
        self.session(async |agent: &mut Self| {
            agent.ensure_no_foreign_transaction().await?;
            let command = format!("{} '{}'", T::KIND.delete_command(), object.name());
            agent.execute(&command).await
        })
        .await
    }

    /// Replace the definition of `object` in one transaction.
    pub async fn change<T: ZoningObject>(&mut self, object: &T) -> Result<T> {
        self.transaction(async |agent: &mut Self| {
            agent.delete(object).await?;
            agent.create(object).await
        })
        .await
    }

    /// Append `member` to an existing object.
    pub async fn add<T: ZoningObject>(&mut self, object: &T, member: &str) -> Result<T> {
        T::verify_member(member)?;
        self.session(async |agent: &mut Self| {
            agent.ensure_no_foreign_transaction().await?;
            agent.require(object.name(), T::KIND).await?;
            agent.require_members(T::KIND, &[member.to_string()]).await?;
            let command = format!("{} '{}', '{member}'", T::KIND.add_command(), object.name());
            agent.execute(&command).await?;
            agent.pull_required(object.name()).await
        })
        .await
    }

    /// Take `member` out of an existing object.
    pub async fn remove<T: ZoningObject>(&mut self, object: &T, member: &str) -> Result<T> {
        T::verify_member(member)?;
        self.session(async |agent: &mut Self| {
            agent.ensure_no_foreign_transaction().await?;
            agent.require(object.name(), T::KIND).await?;
            let command = format!("{} '{}', '{member}'", T::KIND.remove_command(), object.name());
            agent.execute(&command).await?;
            agent.pull_required(object.name()).await
        })
        .await
    }

    /// Delete `object` after removing it from every object that lists it.
    ///
    /// Parents are found with the open transaction's changes included, and
    /// everything runs in one transaction.
    pub async fn purge<T: ZoningObject>(&mut self, object: &T) -> Result<()> {
        let parent = match T::KIND {
            ObjectKind::Alias => Some(ObjectKind::Zone),
            ObjectKind::Zone => Some(ObjectKind::Cfg),
            ObjectKind::Cfg => None,
        };
        self.transaction(async |agent: &mut Self| {
            if let Some(parent) = parent {
                let opts = FindOptions::object(parent).in_transaction();
                let parents = agent.switch.find_by_member(object.name(), opts).await?;
                for p in parents {
                    let command = format!(
                        "{} '{}', '{}'",
                        parent.remove_command(),
                        p.name(),
                        object.name()
                    );
                    debug!("Provisioning '{}'", command);
                    let response = agent.switch.query(&[command.as_str()]).await?;
                    agent.validate(&response)?;
                }
            }
            agent.delete(object).await
        })
        .await
    }

    /// Rename any zoning object and return it under its new name.
    pub async fn rename(&mut self, name: &str, new_name: &str) -> Result<ZoningEntity> {
        self.session(async |agent: &mut Self| {
            agent.execute(&rename_command(name, new_name)).await?;
            agent.pull_any(new_name).await?.ok_or_else(|| {
                Error::from(ProvisioningError::DoesNotExist {
                    kind: "Object".to_string(),
                    name: new_name.to_string(),
                })
            })
        })
        .await
    }

    /// Rename `object` and return it under its new name.
    pub async fn rename_object<T: ZoningObject>(&mut self, object: &T, new_name: &str) -> Result<T> {
        self.session(async |agent: &mut Self| {
            agent.execute(&rename_command(object.name(), new_name)).await?;
            agent.pull_required(new_name).await
        })
        .await
    }

    pub async fn alias_create(&mut self, alias: &Alias) -> Result<Alias> {
        self.create(alias).await
    }

    pub async fn alias_delete(&mut self, alias: &Alias) -> Result<()> {
        self.delete(alias).await
    }

    pub async fn alias_change(&mut self, alias: &Alias) -> Result<Alias> {
        self.change(alias).await
    }

    /// Add a WWN or `domain,index` member.
    pub async fn alias_add(&mut self, alias: &Alias, member: &str) -> Result<Alias> {
        self.add(alias, member).await
    }

    pub async fn alias_remove(&mut self, alias: &Alias, member: &str) -> Result<Alias> {
        self.remove(alias, member).await
    }

    /// Delete an alias and drop it from every zone.
    pub async fn alias_purge(&mut self, alias: &Alias) -> Result<()> {
        self.purge(alias).await
    }

    pub async fn zone_create(&mut self, zone: &Zone) -> Result<Zone> {
        self.create(zone).await
    }

    pub async fn zone_delete(&mut self, zone: &Zone) -> Result<()> {
        self.delete(zone).await
    }

    pub async fn zone_change(&mut self, zone: &Zone) -> Result<Zone> {
        self.change(zone).await
    }

    /// Add an alias, WWN or port. Alias names must already exist.
    pub async fn zone_add(&mut self, zone: &Zone, member: impl Into<ZoneMember>) -> Result<Zone> {
        let member = member.into();
        self.add(zone, member.as_str()).await
    }

    pub async fn zone_remove(&mut self, zone: &Zone, member: impl Into<ZoneMember>) -> Result<Zone> {
        let member = member.into();
        self.remove(zone, member.as_str()).await
    }

    /// Delete a zone and drop it from every configuration.
    pub async fn zone_purge(&mut self, zone: &Zone) -> Result<()> {
        self.purge(zone).await
    }

    pub async fn cfg_create(&mut self, cfg: &ZoneConfiguration) -> Result<ZoneConfiguration> {
        self.create(cfg).await
    }

    pub async fn cfg_delete(&mut self, cfg: &ZoneConfiguration) -> Result<()> {
        self.delete(cfg).await
    }

    pub async fn cfg_add(&mut self, cfg: &ZoneConfiguration, zone: &Zone) -> Result<ZoneConfiguration> {
        self.add(cfg, zone.name()).await
    }

    pub async fn cfg_remove(
        &mut self,
        cfg: &ZoneConfiguration,
        zone: &Zone,
    ) -> Result<ZoneConfiguration> {
        self.remove(cfg, zone.name()).await
    }
}

fn rename_command(name: &str, new_name: &str) -> String {
    format!("zoneobjectrename \"{name}\", \"{new_name}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ScriptedShell;
    use tokio_test::{assert_err, assert_ok};

    const IDLE: &str = "There is no outstanding zoning transaction\n";
    const TOKEN: &str = "Current transaction token is 0x5a1\nIt is abortable\n";
    const SAVE_PROMPT: &str =
        "Do you want to save the Defined zoning configuration only? (yes, y, no, n): [no] ";
    const WWN: &str = "50:00:10:20:30:40:50:60";

    fn agent(shell: &ScriptedShell) -> Agent<ScriptedShell> {
        Agent::new(shell.clone(), DeviceConfig::default())
    }

    fn expect_lock(shell: &ScriptedShell) {
        shell
            .expect("cfgtransshow", IDLE)
            .expect("alicreate 'fabricsh_lock', '50:00:00:00:00:00:00:00'", "")
            .expect("alidelete 'fabricsh_lock'", "")
            .expect("cfgtransshow", TOKEN);
    }

    fn expect_save(shell: &ScriptedShell) {
        shell.expect_interactive("cfgsave", &[SAVE_PROMPT, "Updating flash ...\n"]);
    }

    fn provisioning(err: Error) -> ProvisioningError {
        match err {
            Error::Provisioning(e) => e,
            other => panic!("expected a provisioning error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_alias_create_saves_and_pulls() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("alicreate 'test', '50:00:10:20:30:40:50:60'", "");
        expect_save(&shell);
        shell.expect("alishow \"test\"", " alias:\ttest\t50:00:10:20:30:40:50:60\n");
        let mut agent = agent(&shell);

        let alias = Alias::new("test", [WWN]).unwrap();
        let created = agent.alias_create(&alias).await.unwrap();
        assert_eq!(created, alias);
        assert_eq!(shell.pending(), 0);
        assert_eq!(shell.log().sent(), ["y\n"]);
        assert_eq!(shell.log().connects(), 1);
        assert_eq!(shell.log().disconnects(), 1);
    }

    #[tokio::test]
    async fn test_alias_create_cancelled_save() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("alicreate 'test', '50:00:10:20:30:40:50:60'", "")
            .expect_interactive("cfgsave", &[SAVE_PROMPT, "Operation cancelled...\n"]);
        let mut agent = agent(&shell);

        let alias = Alias::new("test", [WWN]).unwrap();
        let err = provisioning(agent.alias_create(&alias).await.unwrap_err());
        assert!(matches!(err, ProvisioningError::SaveCancelled));
        assert_eq!(shell.log().count("alishow \"test\""), 0);
    }

    #[tokio::test]
    async fn test_nothing_to_save_is_an_error() {
        let shell = ScriptedShell::new();
        shell.expect_interactive(
            "cfgsave",
            &[SAVE_PROMPT, "Nothing changed: nothing to save, returning ...\n"],
        );
        let mut agent = agent(&shell);

        let err = provisioning(agent.cfg_save().await.unwrap_err());
        assert!(matches!(err, ProvisioningError::NothingToSave));
    }

    #[tokio::test]
    async fn test_create_with_no_members_sends_nothing() {
        let shell = ScriptedShell::new();
        let mut agent = agent(&shell);

        let err = provisioning(agent.alias_create(&Alias::named("empty").unwrap()).await.unwrap_err());
        assert!(matches!(err, ProvisioningError::MembersEmpty));
        assert!(shell.log().commands().is_empty());
    }

    #[tokio::test]
    async fn test_create_blocked_by_foreign_transaction() {
        let shell = ScriptedShell::new();
        shell.expect("cfgtransshow", TOKEN);
        let mut agent = agent(&shell);

        let alias = Alias::new("test", [WWN]).unwrap();
        let err = provisioning(agent.alias_create(&alias).await.unwrap_err());
        assert!(matches!(err, ProvisioningError::TransactionInProgress));
    }

    #[tokio::test]
    async fn test_create_rejected_with_switch_message() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("alicreate 'test', '50:00:10:20:30:40:50:60'", "'test' duplicate name\n");
        let mut agent = agent(&shell);

        let alias = Alias::new("test", [WWN]).unwrap();
        let err = provisioning(agent.alias_create(&alias).await.unwrap_err());
        assert_eq!(err.to_string(), "'test' duplicate name");
        assert_eq!(shell.log().count("cfgsave"), 0);
    }

    #[tokio::test]
    async fn test_zone_create_requires_aliases() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("alishow \"host1\"", "\"host1\" does not exist.\n");
        let mut agent = agent(&shell);

        let zone = Zone::new("z1", ["host1", WWN]).unwrap();
        let err = provisioning(agent.zone_create(&zone).await.unwrap_err());
        assert_eq!(err.to_string(), "Alias host1 does not exist");
        assert_eq!(shell.pending(), 0);
    }

    #[tokio::test]
    async fn test_zone_create_skips_hardware_members() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("alishow \"host1\"", " alias:\thost1\t50:00:10:20:30:40:50:61\n")
            .expect("zonecreate 'z1', 'host1;50:00:10:20:30:40:50:60'", "");
        expect_save(&shell);
        shell.expect("zoneshow \"z1\"", " zone:\tz1\thost1; 50:00:10:20:30:40:50:60\n");
        let mut agent = agent(&shell);

        let zone = Zone::new("z1", ["host1", WWN]).unwrap();
        let created = agent.zone_create(&zone).await.unwrap();
        assert_eq!(created.members(), ["host1", WWN]);
        assert_eq!(shell.pending(), 0);
    }

    #[tokio::test]
    async fn test_cfg_create_requires_zones() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("zoneshow \"z1\"", " zone:\tz1\thost1\n")
            .expect("zoneshow \"z2\"", "\"z2\" does not exist.\n");
        let mut agent = agent(&shell);

        let cfg = ZoneConfiguration::new("cfg1", ["z1", "z2"]).unwrap();
        let err = provisioning(agent.cfg_create(&cfg).await.unwrap_err());
        assert_eq!(err.to_string(), "Zone z2 does not exist");
    }

    #[tokio::test]
    async fn test_delete_command() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("zonedelete 'z1'", "");
        expect_save(&shell);
        let mut agent = agent(&shell);

        assert_ok!(agent.zone_delete(&Zone::named("z1").unwrap()).await);
        assert_eq!(shell.pending(), 0);
    }

    #[tokio::test]
    async fn test_zone_add_checks_target_and_member() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("zoneshow \"z1\"", " zone:\tz1\thost1\n")
            .expect("alishow \"host2\"", " alias:\thost2\t50:00:10:20:30:40:50:62\n")
            .expect("zoneadd 'z1', 'host2'", "");
        expect_save(&shell);
        shell.expect("zoneshow \"z1\"", " zone:\tz1\thost1; host2\n");
        let mut agent = agent(&shell);

        let zone = Zone::named("z1").unwrap();
        let updated = agent.zone_add(&zone, "host2").await.unwrap();
        assert_eq!(updated.members(), ["host1", "host2"]);
    }

    #[tokio::test]
    async fn test_cfg_add_requires_zone() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("cfgshow \"cfg1\"", " cfg:\tcfg1\tz1\n")
            .expect("zoneshow \"z9\"", "\"z9\" does not exist.\n");
        let mut agent = agent(&shell);

        let cfg = ZoneConfiguration::named("cfg1").unwrap();
        let err = provisioning(agent.cfg_add(&cfg, &Zone::named("z9").unwrap()).await.unwrap_err());
        match err {
            ProvisioningError::DoesNotExist { kind, name } => {
                assert_eq!(kind, "Zone");
                assert_eq!(name, "z9");
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(shell.log().count("cfgadd 'cfg1', 'z9'"), 0);
        assert_eq!(shell.pending(), 0);
    }

    #[tokio::test]
    async fn test_cfg_add() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("cfgshow \"cfg1\"", " cfg:\tcfg1\tz1\n")
            .expect("zoneshow \"z2\"", " zone:\tz2\thost2\n")
            .expect("cfgadd 'cfg1', 'z2'", "");
        expect_save(&shell);
        shell.expect("cfgshow \"cfg1\"", " cfg:\tcfg1\tz1; z2\n");
        let mut agent = agent(&shell);

        let cfg = ZoneConfiguration::named("cfg1").unwrap();
        let updated = agent.cfg_add(&cfg, &Zone::named("z2").unwrap()).await.unwrap();
        assert_eq!(updated.name(), "cfg1");
        assert_eq!(updated.members(), ["z1", "z2"]);
        assert_eq!(shell.pending(), 0);
    }

    #[tokio::test]
    async fn test_remove_from_missing_target() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("cfgshow \"cfg1\"", "\"cfg1\" does not exist.\n");
        let mut agent = agent(&shell);

        let cfg = ZoneConfiguration::named("cfg1").unwrap();
        let err = provisioning(agent.cfg_remove(&cfg, &Zone::named("z1").unwrap()).await.unwrap_err());
        assert_eq!(err.to_string(), "Config cfg1 does not exist");
    }

    #[tokio::test]
    async fn test_add_invalid_member_sends_nothing() {
        let shell = ScriptedShell::new();
        let mut agent = agent(&shell);

        let alias = Alias::named("a1").unwrap();
        let err = assert_err!(agent.alias_add(&alias, "host1").await);
        assert!(matches!(err, Error::Validation(_)));
        assert!(shell.log().commands().is_empty());
    }

    #[tokio::test]
    async fn test_transaction_saves_once() {
        let shell = ScriptedShell::new();
        expect_lock(&shell);
        shell
            .expect("alicreate 'a1', '50:00:10:20:30:40:50:60'", "")
            .expect("alishow \"a1\"", " alias:\ta1\t50:00:10:20:30:40:50:60\n")
            .expect("cfgtransshow", TOKEN);
        expect_save(&shell);
        let mut agent = agent(&shell);

        let alias = Alias::new("a1", [WWN]).unwrap();
        let created = agent
            .transaction(async |agent: &mut Agent<ScriptedShell>| {
                assert!(!agent.check_for_running_transaction().await?);
                assert_eq!(agent.current_transaction().unwrap().id.as_str(), "0x5a1");
                agent
                    .transaction(async |agent: &mut Agent<ScriptedShell>| {
                        assert_eq!(agent.transaction_depth(), 2);
                        agent.alias_create(&alias).await
                    })
                    .await
            })
            .await
            .unwrap();

        assert_eq!(created, alias);
        assert_eq!(shell.pending(), 0);
        assert_eq!(shell.log().count("cfgsave"), 1);
        assert_eq!(shell.log().connects(), 1);
        assert_eq!(agent.transaction_depth(), 0);
        assert!(agent.current_transaction().is_none());
    }

    #[tokio::test]
    async fn test_transaction_error_aborts_once() {
        let shell = ScriptedShell::new();
        expect_lock(&shell);
        shell
            .expect("alicreate 'a1', '50:00:10:20:30:40:50:60'", "Invalid alias\n")
            .expect("cfgtransabort", "");
        let mut agent = agent(&shell);

        let alias = Alias::new("a1", [WWN]).unwrap();
        let err = agent
            .transaction(async |agent: &mut Agent<ScriptedShell>| agent.alias_create(&alias).await)
            .await
            .unwrap_err();

        assert_eq!(provisioning(err).to_string(), "Invalid alias");
        assert_eq!(shell.log().count("cfgtransabort"), 1);
        assert_eq!(shell.log().count("cfgsave"), 0);
        assert_eq!(agent.transaction_depth(), 0);
        assert!(agent.current_transaction().is_none());
        assert_eq!(shell.log().disconnects(), 1);
    }

    #[tokio::test]
    async fn test_failed_abort_keeps_original_error() {
        let shell = ScriptedShell::new();
        expect_lock(&shell);
        shell
            .expect("alidelete 'a1'", "not found\n")
            .expect("cfgtransabort", "trans_abort: there is an outstanding  transaction\n");
        let mut agent = agent(&shell);

        let err = agent
            .transaction(async |agent: &mut Agent<ScriptedShell>| {
                agent.alias_delete(&Alias::named("a1").unwrap()).await
            })
            .await
            .unwrap_err();
        assert_eq!(provisioning(err).to_string(), "not found");
    }

    #[tokio::test]
    async fn test_transaction_refused_while_foreign_open() {
        let shell = ScriptedShell::new();
        shell.expect("cfgtransshow", TOKEN);
        let mut agent = agent(&shell);

        let err = agent
            .transaction(async |_agent: &mut Agent<ScriptedShell>| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(provisioning(err), ProvisioningError::TransactionInProgress));
        assert_eq!(agent.transaction_depth(), 0);
        // the check runs on the block's own connection
        assert_eq!(shell.log().connects(), 1);
        assert_eq!(shell.log().disconnects(), 1);
    }

    #[tokio::test]
    async fn test_transaction_unlockable() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect(
                "alicreate 'fabricsh_lock', '50:00:00:00:00:00:00:00'",
                "Zone DB is locked\n",
            );
        let mut agent = agent(&shell);

        let err = agent
            .transaction(async |_agent: &mut Agent<ScriptedShell>| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(provisioning(err), ProvisioningError::TransactionUnlockable));
        assert_eq!(agent.transaction_depth(), 0);
        assert!(agent.current_transaction().is_none());
    }

    #[tokio::test]
    async fn test_half_taken_lock_is_released() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransshow", IDLE)
            .expect("alicreate 'fabricsh_lock', '50:00:00:00:00:00:00:00'", "")
            .expect("alidelete 'fabricsh_lock'", "Zone DB busy\n")
            .expect("cfgtransabort", "");
        let mut agent = agent(&shell);

        let err = agent
            .transaction(async |_agent: &mut Agent<ScriptedShell>| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(provisioning(err), ProvisioningError::TransactionUnlockable));
        assert_eq!(shell.log().count("cfgtransabort"), 1);
        assert_eq!(shell.pending(), 0);
        assert_eq!(shell.log().connects(), 1);
    }

    #[tokio::test]
    async fn test_zone_purge_removes_from_parents() {
        let shell = ScriptedShell::new();
        expect_lock(&shell);
        shell
            .expect(
                "cfgshow",
                "Defined configuration:\n \
cfg:\tcfg1\tz1; z2\n \
cfg:\tcfg2\tz2\n \
zone:\tz1\thost1\n",
            )
            .expect("cfgremove 'cfg1', 'z1'", "")
            .expect("zonedelete 'z1'", "")
            .expect("cfgtransshow", TOKEN);
        expect_save(&shell);
        let mut agent = agent(&shell);

        agent.zone_purge(&Zone::named("z1").unwrap()).await.unwrap();
        assert_eq!(shell.pending(), 0);
        assert_eq!(shell.log().count("cfgremove 'cfg2', 'z1'"), 0);
    }

    #[tokio::test]
    async fn test_abort_replies() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgtransabort", "")
            .expect("cfgtransabort", "There is no outstanding transaction\n")
            .expect("cfgtransabort", "trans_abort: there is an outstanding  transaction\n")
            .expect("cfgtransabort", "something else\n");
        let mut agent = agent(&shell);

        assert!(agent.abort_transaction().await.unwrap());
        assert!(!agent.abort_transaction().await.unwrap());
        let err = provisioning(agent.abort_transaction().await.unwrap_err());
        assert!(matches!(err, ProvisioningError::NotOwner));
        let err = provisioning(agent.abort_transaction().await.unwrap_err());
        assert_eq!(err.to_string(), "something else");
    }

    #[tokio::test]
    async fn test_running_transaction_check() {
        let shell = ScriptedShell::new();
        shell.expect("cfgtransshow", IDLE).expect("cfgtransshow", TOKEN);
        let mut agent = agent(&shell);

        assert!(!agent.check_for_running_transaction().await.unwrap());
        assert!(agent.check_for_running_transaction().await.unwrap());
    }

    #[tokio::test]
    async fn test_get_transaction() {
        let shell = ScriptedShell::new();
        shell
            .expect(
                "cfgtransshow",
                "Current transaction token is 271010736\nIt is not abortable\n",
            )
            .expect("cfgtransshow", IDLE)
            .expect("cfgtransshow", "garbage\n");
        let mut agent = agent(&shell);

        let open = agent.get_transaction().await.unwrap();
        assert_eq!(open.id, TransactionId::Token("271010736".into()));
        assert!(!open.abortable);

        let none = agent.get_transaction().await.unwrap();
        assert_eq!(none.id, TransactionId::NoTransaction);
        assert!(!none.is_open());

        let err = provisioning(agent.get_transaction().await.unwrap_err());
        assert!(matches!(err, ProvisioningError::UnexpectedTransactionState));
    }

    #[tokio::test]
    async fn test_exist() {
        let shell = ScriptedShell::new();
        shell
            .expect("zoneshow \"z1\"", " zone:\tz1\thost1\n")
            .expect("alishow \"a9\"", "\"a9\" does not exist.\n");
        let mut agent = agent(&shell);

        assert!(agent.exist("z1", ObjectKind::Zone).await.unwrap());
        assert!(!agent.exist("a9", ObjectKind::Alias).await.unwrap());
    }

    #[tokio::test]
    async fn test_pull() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgshow \"cfgtest\"", " cfg: cfgtest  zone1;\n\tzone2;zone3\n")
            .expect("zoneshow \"gone\"", "\"gone\" does not exist.\n");
        let mut agent = agent(&shell);

        let cfg: ZoneConfiguration = agent.pull("cfgtest").await.unwrap().unwrap();
        assert_eq!(cfg.members(), ["zone1", "zone2", "zone3"]);
        assert!(agent.pull::<Zone>("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pull_any_probes_every_kind() {
        let shell = ScriptedShell::new();
        shell
            .expect("cfgshow \"test\"", "\"test\" does not exist.\n")
            .expect("zoneshow \"test\"", "\"test\" does not exist.\n")
            .expect("alishow \"test\"", "\"test\" does not exist.\n");
        let mut agent = agent(&shell);

        assert!(agent.pull_any("test").await.unwrap().is_none());
        assert_eq!(shell.pending(), 0);
    }

    #[tokio::test]
    async fn test_rename() {
        let shell = ScriptedShell::new();
        shell.expect("zoneobjectrename \"z1\", \"z1_new\"", "");
        expect_save(&shell);
        shell
            .expect("cfgshow \"z1_new\"", "\"z1_new\" does not exist.\n")
            .expect("zoneshow \"z1_new\"", " zone:\tz1_new\thost1\n");
        let mut agent = agent(&shell);

        let renamed = agent.rename("z1", "z1_new").await.unwrap();
        assert_eq!(renamed.kind(), ObjectKind::Zone);
        assert_eq!(renamed.name(), "z1_new");
    }

    #[tokio::test]
    async fn test_rename_object_rejected() {
        let shell = ScriptedShell::new();
        shell.expect(
            "zoneobjectrename \"a1\", \"a1_new\"",
            "not found \"a1\"\n",
        );
        let mut agent = agent(&shell);

        let err = agent
            .rename_object(&Alias::named("a1").unwrap(), "a1_new")
            .await
            .unwrap_err();
        assert_eq!(provisioning(err).to_string(), "not found \"a1\"");
    }

    #[tokio::test]
    async fn test_cfg_enable() {
        let shell = ScriptedShell::new();
        shell
            .expect_interactive(
                "cfgenable \"cfg1\"",
                &["Do you want to enable 'cfg1' configuration  (yes, y, no, n): [no] ", "Updating flash ...\n"],
            )
            .expect_interactive("cfgenable \"cfg1\"", &["Operation cancelled...\n"]);
        let mut agent = agent(&shell);

        let cfg = ZoneConfiguration::named("cfg1").unwrap();
        agent.cfg_enable(&cfg).await.unwrap();
        let err = provisioning(agent.cfg_enable(&cfg).await.unwrap_err());
        assert!(matches!(err, ProvisioningError::SaveCancelled));
    }

    #[tokio::test]
    async fn test_connect_verifies_rights() {
        let shell = ScriptedShell::new();
        shell
            .expect("switchshow |grep \"^LS Attributes\"", "")
            .expect("configshow | grep RBAC", "RBAC permission denied.\n");

        let err = Agent::connect(shell.clone(), DeviceConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(provisioning(err), ProvisioningError::InsufficientRights));
    }
}
