//! Read path: switch attributes, topology and zoning state.

mod attribute;
mod builder;
mod records;
mod switch;

pub use attribute::Attribute;
pub use builder::SwitchBuilder;
pub use records::{FabricMember, IslLink, Port, TrunkLink};
pub use switch::{DEFAULT_FID, FindOptions, Switch, WwnScope};
