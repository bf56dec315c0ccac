//! Read access to a switch: attributes, fabric topology, zoning database and
//! name server.

use std::collections::HashMap;

use log::{debug, trace};

use super::attribute::Attribute;
use super::records::{FabricMember, IslLink, Port, TrunkLink, rows};
use crate::error::{FabricError, Result};
use crate::model::{
    Alias, ObjectKind, Wwn, Zone, ZoneConfiguration, ZoningEntity, ZoningObject,
};
use crate::parser::{Record, Response, Value};
use crate::session::{Device, DeviceConfig, Mode, Shell};

/// Default logical switch selected by [`Switch::set_context`].
pub const DEFAULT_FID: u32 = 128;

const CFGSHOW_SUMMARY_FILTER: &str = "-e cfg: -e configuration:";

/// Options for [`Switch::find`] and [`Switch::find_by_member`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Object kind to search. `None` means zones for `find` and every kind
    /// for `find_by_member`.
    pub object: Option<ObjectKind>,

    /// Substring match instead of a whole-name match.
    pub partial: bool,

    /// Search the full `cfgshow` dump, which includes changes of the open
    /// transaction, instead of the saved `configshow`.
    pub transaction: bool,
}

impl FindOptions {
    pub fn object(kind: ObjectKind) -> Self {
        Self {
            object: Some(kind),
            ..Self::default()
        }
    }

    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    pub fn in_transaction(mut self) -> Self {
        self.transaction = true;
        self
    }
}

/// Which name server tables [`Switch::wwns`] reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WwnScope {
    /// Devices attached to this switch (`nsshow -t`).
    #[default]
    Local,
    /// Devices cached from remote switches (`nscamshow -t`).
    Cached,
    /// Both.
    All,
}

/// Zoning database as read from `cfgshow`.
#[derive(Debug, Clone, Default)]
struct ZoningDatabase {
    configurations: Vec<ZoneConfiguration>,
    zones: Vec<Zone>,
    aliases: Vec<Alias>,
}

/// A fabric switch queried over its CLI.
///
/// Command output is parsed and merged into one configuration record, with
/// a per-command cache. Accessors take a `forced` flag to bypass the cache.
///
/// # Example
///
/// ```rust,no_run
/// use fabricsh::fabric::SwitchBuilder;
///
/// # async fn example() -> Result<(), fabricsh::Error> {
/// let mut switch = SwitchBuilder::new("san-sw01")
///     .username("admin")
///     .password("secret")
///     .connect()
///     .await?;
///
/// println!("{:?} runs {:?}", switch.name(false).await?, switch.firmware(false).await?);
/// for zone in switch.zones(false).await? {
///     println!("{} active={} {:?}", zone.name(), zone.active(), zone.members());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Switch<S: Shell> {
    device: Device<S>,
    configuration: Record,
    loaded: HashMap<String, bool>,
    vf: Option<bool>,
    fid: Option<u32>,
}

impl<S: Shell> Switch<S> {
    /// Wrap a shell without talking to the switch.
    pub fn new(shell: S, config: DeviceConfig) -> Self {
        Self {
            device: Device::new(shell, config),
            configuration: Record::new(),
            loaded: HashMap::new(),
            vf: None,
            fid: None,
        }
    }

    /// Wrap a shell and probe the switch for virtual fabric support, which
    /// decides how every later command is sent.
    pub async fn connect(shell: S, config: DeviceConfig) -> Result<Self> {
        let mut switch = Self::new(shell, config);
        switch.vf(true).await?;
        Ok(switch)
    }

    pub fn device(&self) -> &Device<S> {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device<S> {
        &mut self.device
    }

    /// Everything parsed so far, merged across commands.
    pub fn configuration(&self) -> &Record {
        &self.configuration
    }

    /// Logical switch selected with [`set_context`](Self::set_context).
    pub fn fid(&self) -> Option<u32> {
        self.fid
    }

    /// Enter a session; see [`Device::open`].
    pub async fn open(&mut self) -> Result<()> {
        self.device.open().await
    }

    /// Leave a session; see [`Device::close`].
    pub async fn close(&mut self) -> Result<()> {
        self.device.close().await
    }

    /// Run `f` with one connection held for all its commands.
    pub async fn session<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        self.open().await?;
        let result = f(self).await;
        let closed = self.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Select the logical switch to query and drop the cache.
    ///
    /// FID 0 selects the default switch. Has no effect on the commands
    /// sent when the switch has no virtual fabrics.
    pub fn set_context(&mut self, fid: u32) -> u32 {
        self.loaded.clear();
        let fid = if fid == 0 { DEFAULT_FID } else { fid };
        self.fid = Some(fid);
        fid
    }

    /// Command text targeting the selected logical switch.
    ///
    /// Only the first command of a pipeline is wrapped; the filters run
    /// outside `fosexec`.
    pub fn fullcmd(&self, command: &str) -> String {
        match (self.vf, self.fid) {
            (Some(true), Some(fid)) => match command.split_once('|') {
                Some((first, rest)) => {
                    format!("fosexec --fid {fid} '{}' |{rest}", first.trim_end())
                }
                None => format!("fosexec --fid {fid} '{command}'"),
            },
            _ => command.to_string(),
        }
    }

    /// Run script-mode commands in the selected context and parse the output.
    pub async fn query(&mut self, commands: &[&str]) -> Result<Response> {
        let commands: Vec<String> = commands.iter().map(|c| self.fullcmd(c)).collect();
        let commands: Vec<&str> = commands.iter().map(String::as_str).collect();
        let mut response = self.device.run_in(Mode::Script, &commands).await?;
        response.parse();
        Ok(response)
    }

    /// Run an interactive command in the selected context, answering its
    /// prompts with `answers`.
    pub async fn query_interactive(&mut self, command: &str, answers: &[&str]) -> Result<Response> {
        let command = self.fullcmd(command);
        let mut commands = vec![command.as_str()];
        commands.extend_from_slice(answers);
        let mut response = self.device.run_in(Mode::Interactive, &commands).await?;
        response.parse();
        Ok(response)
    }

    /// True when the switch has virtual fabrics enabled.
    pub async fn vf(&mut self, forced: bool) -> Result<bool> {
        if let (Some(vf), false) = (self.vf, forced) {
            return Ok(vf);
        }
        let response = self.query(&["switchshow |grep \"^LS Attributes\""]).await?;
        let enabled = response.line_count() == 2;
        debug!("Virtual fabrics {}", if enabled { "enabled" } else { "disabled" });
        self.vf = Some(enabled);
        self.configuration.insert(
            "vf".into(),
            Value::text(if enabled { "enabled" } else { "disabled" }),
        );
        Ok(enabled)
    }

    fn cache_key(command: &str) -> String {
        command.split_whitespace().collect::<Vec<_>>().join("_")
    }

    fn is_loaded(&self, command: &str) -> bool {
        self.loaded
            .get(&Self::cache_key(command))
            .copied()
            .unwrap_or(false)
    }

    /// Run `command` (optionally through `grep filter`) and merge the parsed
    /// record into the configuration.
    async fn refresh(&mut self, command: &str, filter: &str) -> Result<()> {
        let full = if filter.is_empty() {
            command.to_string()
        } else {
            format!("{command} | grep {filter}")
        };
        let response = self.query(&[full.as_str()]).await?;
        trace!("'{}' parsed {} keys", full, response.parsed.len());
        self.configuration.extend(response.parsed);

        // filtered output leaves the unfiltered command stale
        self.loaded.insert(Self::cache_key(command), false);
        self.loaded
            .insert(Self::cache_key(&format!("{command}{filter}")), true);
        Ok(())
    }

    async fn ensure(&mut self, command: &str, filter: &str, forced: bool) -> Result<()> {
        if forced || !self.is_loaded(&format!("{command}{filter}")) {
            self.refresh(command, filter).await?;
        }
        Ok(())
    }

    /// Read one attribute; [`Value::Null`] when the switch did not report it.
    pub async fn get(&mut self, attr: Attribute, forced: bool) -> Result<Value> {
        self.ensure(attr.command(), "", forced).await?;
        Ok(self.configuration.get(attr.key()).cloned().unwrap_or_default())
    }

    /// [`get`](Self::get) by attribute name.
    pub async fn get_named(&mut self, name: &str, forced: bool) -> Result<Value> {
        let attr: Attribute = name.parse()?;
        self.get(attr, forced).await
    }

    async fn get_text(&mut self, attr: Attribute, forced: bool) -> Result<Option<String>> {
        Ok(self.get(attr, forced).await?.as_str().map(str::to_string))
    }

    pub async fn name(&mut self, forced: bool) -> Result<Option<String>> {
        self.get_text(Attribute::Name, forced).await
    }

    pub async fn state(&mut self, forced: bool) -> Result<Option<String>> {
        self.get_text(Attribute::State, forced).await
    }

    pub async fn role(&mut self, forced: bool) -> Result<Option<String>> {
        self.get_text(Attribute::Role, forced).await
    }

    pub async fn wwn(&mut self, forced: bool) -> Result<Option<String>> {
        self.get_text(Attribute::Wwn, forced).await
    }

    pub async fn firmware(&mut self, forced: bool) -> Result<Option<String>> {
        self.get_text(Attribute::Firmware, forced).await
    }

    pub async fn chassis_name(&mut self, forced: bool) -> Result<Option<String>> {
        self.get_text(Attribute::ChassisName, forced).await
    }

    /// Domain id of this switch.
    pub async fn domain(&mut self, forced: bool) -> Result<Option<i64>> {
        Ok(self.get(Attribute::Domain, forced).await?.as_int())
    }

    pub async fn zoning_enabled(&mut self, forced: bool) -> Result<bool> {
        Ok(self
            .get(Attribute::ZoningEnabled, forced)
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    /// Name of the enabled zone configuration, if zoning is on.
    pub async fn active_config(&mut self, forced: bool) -> Result<Option<String>> {
        self.get_text(Attribute::ActiveConfig, forced).await
    }

    /// Logical switch FIDs configured on the chassis.
    pub async fn logical_switches(&mut self, forced: bool) -> Result<Vec<i64>> {
        let value = self.get(Attribute::LogicalSwitches, forced).await?;
        Ok(value
            .as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_int)
            .collect())
    }

    pub async fn ports(&mut self, forced: bool) -> Result<Vec<Port>> {
        let value = self.get(Attribute::Ports, forced).await?;
        Ok(rows(&value, Port::from_record))
    }

    pub async fn isls(&mut self, forced: bool) -> Result<Vec<IslLink>> {
        let value = self.get(Attribute::Isls, forced).await?;
        Ok(rows(&value, IslLink::from_record))
    }

    pub async fn trunks(&mut self, forced: bool) -> Result<Vec<TrunkLink>> {
        let value = self.get(Attribute::Trunks, forced).await?;
        Ok(rows(&value, TrunkLink::from_record))
    }

    /// Switches in the fabric.
    pub async fn fabric(&mut self, forced: bool) -> Result<Vec<FabricMember>> {
        self.ensure("fabricshow", "", forced).await?;
        let value = self.configuration.get("fabric").cloned().unwrap_or_default();
        Ok(rows(&value, FabricMember::from_record))
    }

    async fn zoning_database(&mut self, full: bool, forced: bool) -> Result<ZoningDatabase> {
        let filter = if full { "" } else { CFGSHOW_SUMMARY_FILTER };
        self.ensure("cfgshow", filter, forced).await?;

        let defined = self
            .configuration
            .get("defined_configuration")
            .and_then(Value::as_map);
        let effective_name = self
            .configuration
            .get("effective_configuration")
            .and_then(Value::as_map)
            .and_then(|e| e.get("cfg"))
            .and_then(Value::as_map)
            .and_then(|cfg| cfg.keys().next())
            .cloned();

        let entries = |kind: ObjectKind| -> Vec<(String, Vec<String>)> {
            defined
                .and_then(|d| d.get(kind.key()))
                .and_then(Value::as_map)
                .map(|m| {
                    m.iter()
                        .map(|(name, members)| (name.clone(), members.to_string_list()))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut db = ZoningDatabase::default();
        for (name, members) in entries(ObjectKind::Cfg) {
            let effective = effective_name.as_deref() == Some(name.as_str());
            db.configurations
                .push(ZoneConfiguration::from_entry(&name, &members)?.with_effective(effective));
        }
        if !full {
            return Ok(db);
        }

        let active: Vec<String> = db
            .configurations
            .iter()
            .find(|c| c.effective())
            .map(|c| c.members().to_vec())
            .unwrap_or_default();
        for (name, members) in entries(ObjectKind::Zone) {
            let is_active = active.contains(&name);
            db.zones
                .push(Zone::from_entry(&name, &members)?.with_active(is_active));
        }
        for (name, members) in entries(ObjectKind::Alias) {
            db.aliases.push(Alias::from_entry(&name, &members)?);
        }
        Ok(db)
    }

    /// Defined zone configurations. `full` reads the whole `cfgshow`
    /// instead of the configuration lines only.
    pub async fn zone_configurations(
        &mut self,
        full: bool,
        forced: bool,
    ) -> Result<Vec<ZoneConfiguration>> {
        Ok(self.zoning_database(full, forced).await?.configurations)
    }

    /// The zone configuration enforced on the fabric.
    pub async fn effective_configuration(
        &mut self,
        full: bool,
        forced: bool,
    ) -> Result<Option<ZoneConfiguration>> {
        Ok(self
            .zone_configurations(full, forced)
            .await?
            .into_iter()
            .find(ZoneConfiguration::effective))
    }

    /// Defined zones, flagged active when the effective configuration has them.
    pub async fn zones(&mut self, forced: bool) -> Result<Vec<Zone>> {
        Ok(self.zoning_database(true, forced).await?.zones)
    }

    pub async fn aliases(&mut self, forced: bool) -> Result<Vec<Alias>> {
        Ok(self.zoning_database(true, forced).await?.aliases)
    }

    /// Find saved objects by name, case-insensitive.
    ///
    /// Objects created in a transaction that is not yet saved are not found.
    pub async fn find(&mut self, name: &str, opts: FindOptions) -> Result<Vec<ZoningEntity>> {
        let kind = opts.object.unwrap_or(ObjectKind::Zone);
        let pattern = if opts.partial {
            format!("^{}\\..*{name}", kind.key())
        } else {
            format!("^{}\\..*{name}:", kind.key())
        };
        let command = format!("configshow | grep -i -E \"{pattern}\"");
        let response = self.query(&[command.as_str()]).await?;

        let found = find_results(&response)?;
        Ok(found
            .into_iter()
            .filter(|e| e.kind() == kind)
            .filter(|e| opts.partial || e.name().eq_ignore_ascii_case(name))
            .collect())
    }

    pub async fn find_zone(&mut self, name: &str) -> Result<Option<Zone>> {
        let found = self.find(name, FindOptions::object(ObjectKind::Zone)).await?;
        Ok(found.into_iter().find_map(|e| match e {
            ZoningEntity::Zone(z) => Some(z),
            _ => None,
        }))
    }

    /// Zones whose name contains `pattern`.
    pub async fn find_zones(&mut self, pattern: &str) -> Result<Vec<Zone>> {
        let found = self
            .find(pattern, FindOptions::object(ObjectKind::Zone).partial())
            .await?;
        Ok(found
            .into_iter()
            .filter_map(|e| match e {
                ZoningEntity::Zone(z) => Some(z),
                _ => None,
            })
            .collect())
    }

    pub async fn find_alias(&mut self, name: &str) -> Result<Option<Alias>> {
        let found = self.find(name, FindOptions::object(ObjectKind::Alias)).await?;
        Ok(found.into_iter().find_map(|e| match e {
            ZoningEntity::Alias(a) => Some(a),
            _ => None,
        }))
    }

    /// Aliases whose name contains `pattern`.
    pub async fn find_aliases(&mut self, pattern: &str) -> Result<Vec<Alias>> {
        let found = self
            .find(pattern, FindOptions::object(ObjectKind::Alias).partial())
            .await?;
        Ok(found
            .into_iter()
            .filter_map(|e| match e {
                ZoningEntity::Alias(a) => Some(a),
                _ => None,
            })
            .collect())
    }

    /// Objects that list `member` among their members.
    ///
    /// With `opts.transaction` the full `cfgshow` is scanned, so changes of
    /// the open transaction are seen.
    pub async fn find_by_member(
        &mut self,
        member: &str,
        opts: FindOptions,
    ) -> Result<Vec<ZoningEntity>> {
        if opts.transaction {
            return self.find_by_member_in_transaction(member, opts).await;
        }

        let object = match opts.object {
            Some(kind) => format!("^{}.", kind.key()),
            None => "^zone|alias|cfg.".to_string(),
        };
        let pattern = if opts.partial {
            format!(":.*{member}")
        } else {
            format!("(:|;){member}(;|$)")
        };
        let command = format!("configshow | grep -i -E \"{object}\" | grep -i -E \"{pattern}\"");
        let response = self.query(&[command.as_str()]).await?;
        find_results(&response)
    }

    async fn find_by_member_in_transaction(
        &mut self,
        member: &str,
        opts: FindOptions,
    ) -> Result<Vec<ZoningEntity>> {
        let response = self.query(&["cfgshow"]).await?;
        let Some(defined) = response
            .get("defined_configuration")
            .and_then(Value::as_map)
        else {
            return Ok(Vec::new());
        };

        let needle = member.to_lowercase();
        let matches = |m: &String| {
            let m = m.to_lowercase();
            if opts.partial {
                m.contains(&needle)
            } else {
                m == needle
            }
        };

        let mut found = Vec::new();
        for kind in ObjectKind::ALL {
            if opts.object.is_some_and(|o| o != kind) {
                continue;
            }
            let Some(entries) = defined.get(kind.key()).and_then(Value::as_map) else {
                continue;
            };
            for (name, members) in entries {
                let members = members.to_string_list();
                if members.iter().any(matches) {
                    found.push(ZoningEntity::from_entry(kind, name, &members)?);
                }
            }
        }
        Ok(found)
    }

    async fn name_server(&mut self, local: bool, forced: bool) -> Result<Vec<Wwn>> {
        let (command, key) = if local {
            ("nsshow -t", "wwn_local")
        } else {
            ("nscamshow -t", "wwn_remote")
        };
        if forced || !self.is_loaded(command) {
            // an empty table must not leave the previous one behind
            self.configuration.shift_remove(key);
            self.refresh(command, "").await?;
        }

        let entries = self.configuration.get(key).cloned().unwrap_or_default();
        let mut own_domain = None;
        let mut wwns = Vec::new();
        for entry in entries.as_list().unwrap_or_default().iter().filter_map(Value::as_map) {
            let mut domain = entry.get("domain_id").and_then(Value::as_int).unwrap_or(0);
            if domain == 0 {
                if own_domain.is_none() {
                    own_domain = Some(self.domain(false).await?.unwrap_or(0));
                }
                domain = own_domain.unwrap_or(0);
            }
            let value = entry.get("value").and_then(Value::as_str).unwrap_or_default();
            let dev_type = entry.get("dev_type").and_then(Value::as_str).unwrap_or_default();
            let port_index = entry.get("port_index").and_then(Value::as_int).unwrap_or(0);
            let symbol = entry.get("symbol").and_then(Value::as_str).unwrap_or_default();
            let wwn = Wwn::new(
                value,
                dev_type,
                u32::try_from(domain).map_err(|_| FabricError::UnexpectedValue {
                    key: "domain_id".into(),
                })?,
                u32::try_from(port_index).map_err(|_| FabricError::UnexpectedValue {
                    key: "port_index".into(),
                })?,
            )?;
            wwns.push(wwn.with_symbol(symbol));
        }
        Ok(wwns)
    }

    /// Devices known to the name server.
    pub async fn wwns(&mut self, forced: bool, scope: WwnScope) -> Result<Vec<Wwn>> {
        match scope {
            WwnScope::Local => self.name_server(true, forced).await,
            WwnScope::Cached => self.name_server(false, forced).await,
            WwnScope::All => {
                let mut all = self.name_server(true, forced).await?;
                all.extend(self.name_server(false, forced).await?);
                Ok(all)
            }
        }
    }

    /// Look up a device by WWN, case-insensitive.
    pub async fn find_wwn(&mut self, value: &str, forced: bool, fabric_wide: bool) -> Result<Option<Wwn>> {
        let scope = if fabric_wide { WwnScope::All } else { WwnScope::Local };
        Ok(self
            .wwns(forced, scope)
            .await?
            .into_iter()
            .find(|w| w.value().eq_ignore_ascii_case(value)))
    }
}

/// Objects listed by a `configshow | grep` query.
fn find_results(response: &Response) -> Result<Vec<ZoningEntity>> {
    let Some(found) = response.get("find_results").and_then(Value::as_list) else {
        return Ok(Vec::new());
    };
    let mut entities = Vec::with_capacity(found.len());
    for item in found.iter().filter_map(Value::as_map) {
        let kind = match item.get("kind").and_then(Value::as_str) {
            Some("cfg") => ObjectKind::Cfg,
            Some("zone") => ObjectKind::Zone,
            Some("alias") => ObjectKind::Alias,
            _ => continue,
        };
        let name = item.get("obj").and_then(Value::as_str).unwrap_or_default();
        let members = item.get("members").map(Value::to_string_list).unwrap_or_default();
        entities.push(ZoningEntity::from_entry(kind, name, &members)?);
    }
    Ok(entities)
}
