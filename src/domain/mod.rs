pub mod asset;
pub mod charging_profile;
pub mod session;
pub mod site_area;
pub mod snapshot;
pub mod types;

pub use asset::*;
pub use charging_profile::*;
pub use session::*;
pub use site_area::*;
pub use snapshot::*;
pub use types::*;
