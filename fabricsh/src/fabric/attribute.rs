//! Static table of switch attributes.
//!
//! Every attribute is read by running one command and picking one key from
//! the parsed record. Several attributes share a command; the switch cache
//! keys on the command, so reading `name` after `domain` costs nothing.

use std::fmt;
use std::str::FromStr;

use crate::error::FabricError;

/// A switch attribute readable through [`Switch::get`](super::Switch::get).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Name,
    State,
    Mode,
    Type,
    Role,
    Domain,
    Id,
    Wwn,
    ZoningEnabled,
    ActiveConfig,
    SwitchBeacon,
    FcRouter,
    AllowXislUse,
    LsAttributes,
    Ports,
    VirtualFabric,
    Kernel,
    Firmware,
    LogicalSwitches,
    AptPolicy,
    ChassisName,
    Dls,
    Iod,
    Status,
    StatusDetails,
    Ip,
    SupportShow,
    Isls,
    Trunks,
    CfgTransaction,
    PrincipalMode,
    PrincipalPriority,
}

impl Attribute {
    pub const ALL: [Attribute; 32] = [
        Attribute::Name,
        Attribute::State,
        Attribute::Mode,
        Attribute::Type,
        Attribute::Role,
        Attribute::Domain,
        Attribute::Id,
        Attribute::Wwn,
        Attribute::ZoningEnabled,
        Attribute::ActiveConfig,
        Attribute::SwitchBeacon,
        Attribute::FcRouter,
        Attribute::AllowXislUse,
        Attribute::LsAttributes,
        Attribute::Ports,
        Attribute::VirtualFabric,
        Attribute::Kernel,
        Attribute::Firmware,
        Attribute::LogicalSwitches,
        Attribute::AptPolicy,
        Attribute::ChassisName,
        Attribute::Dls,
        Attribute::Iod,
        Attribute::Status,
        Attribute::StatusDetails,
        Attribute::Ip,
        Attribute::SupportShow,
        Attribute::Isls,
        Attribute::Trunks,
        Attribute::CfgTransaction,
        Attribute::PrincipalMode,
        Attribute::PrincipalPriority,
    ];

    /// Command whose output carries this attribute.
    pub fn command(self) -> &'static str {
        use Attribute::*;
        match self {
            Name | State | Mode | Type | Role | Domain | Id | Wwn | ZoningEnabled
            | ActiveConfig | SwitchBeacon | FcRouter | AllowXislUse | LsAttributes | Ports => {
                "switchshow"
            }
            VirtualFabric => "fosconfig --show",
            Kernel | Firmware => "version",
            LogicalSwitches => "lscfg --show",
            AptPolicy => "aptpolicy",
            ChassisName => "chassisname",
            Dls => "dlsshow",
            Iod => "iodshow",
            Status | StatusDetails => "switchstatusshow",
            Ip => "ipaddrshow",
            SupportShow => "supportshow",
            Isls => "islshow",
            Trunks => "trunkshow",
            CfgTransaction => "cfgtransshow",
            PrincipalMode | PrincipalPriority => "fabricprincipal",
        }
    }

    /// Key of the value in the parsed record.
    pub fn key(self) -> &'static str {
        use Attribute::*;
        match self {
            Name => "switch_name",
            State => "switch_state",
            Mode => "switch_mode",
            Type => "switch_type",
            Role => "switch_role",
            Domain => "switch_domain",
            Id => "switch_id",
            Wwn => "switch_wwn",
            ZoningEnabled => "zoning_enabled",
            ActiveConfig => "active_config",
            SwitchBeacon => "switch_beacon",
            FcRouter => "fc_router",
            AllowXislUse => "allow_xisl_use",
            LsAttributes => "ls_attributes",
            Ports => "ports",
            VirtualFabric => "virtual_fabric",
            Kernel => "kernel",
            Firmware => "fabric_os",
            LogicalSwitches => "created_switches",
            AptPolicy => "current_policy",
            ChassisName => "chassisname",
            Dls => "dlsshow",
            Iod => "iodshow",
            Status => "switch_state",
            StatusDetails => "switchstatusshow",
            Ip => "ethernet_ip_address",
            SupportShow => "supportshow",
            Isls => "isl_links",
            Trunks => "trunk_links",
            CfgTransaction => "cfg_transaction",
            PrincipalMode => "principal_selection_mode",
            PrincipalPriority => "principal_switch_selection_priority",
        }
    }

    /// Name accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        use Attribute::*;
        match self {
            Name => "name",
            State => "state",
            Mode => "mode",
            Type => "type",
            Role => "role",
            Domain => "domain",
            Id => "id",
            Wwn => "wwn",
            ZoningEnabled => "zoning_enabled",
            ActiveConfig => "active_config",
            SwitchBeacon => "switch_beacon",
            FcRouter => "fc_router",
            AllowXislUse => "allow_xisl_use",
            LsAttributes => "ls_attributes",
            Ports => "ports",
            VirtualFabric => "virtual_fabric",
            Kernel => "kernel",
            Firmware => "firmware",
            LogicalSwitches => "logical_switches",
            AptPolicy => "aptpolicy",
            ChassisName => "chassisname",
            Dls => "dls",
            Iod => "iod",
            Status => "status",
            StatusDetails => "status_details",
            Ip => "ip",
            SupportShow => "supportshow",
            Isls => "isls",
            Trunks => "trunks",
            CfgTransaction => "cfg_transaction",
            PrincipalMode => "principal_mode",
            PrincipalPriority => "principal_priority",
        }
    }
}

impl FromStr for Attribute {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| FabricError::UnknownAttribute(s.to_string()))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::strategy_for;

    #[test]
    fn test_name_lookup() {
        assert_eq!("domain".parse::<Attribute>().unwrap(), Attribute::Domain);
        assert_eq!("firmware".parse::<Attribute>().unwrap().key(), "fabric_os");
        assert!(matches!(
            "bogus".parse::<Attribute>(),
            Err(FabricError::UnknownAttribute(name)) if name == "bogus"
        ));
    }

    #[test]
    fn test_every_command_has_a_parser() {
        for attr in Attribute::ALL {
            let command = attr.command().split_whitespace().next().unwrap();
            assert!(strategy_for(command).is_some(), "{attr} uses unparsed {command}");
            assert_eq!(attr.name().parse::<Attribute>().unwrap(), attr);
        }
    }
}
