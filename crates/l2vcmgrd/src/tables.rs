//! Key and field name constants for l2vcmgrd

/// Positional key of the first endpoint
pub const ENDPOINT_KEY_1: &str = "1";

/// Positional key of the second endpoint
pub const ENDPOINT_KEY_2: &str = "2";

/// All endpoint keys, in order
pub const ENDPOINT_KEYS: [&str; 2] = [ENDPOINT_KEY_1, ENDPOINT_KEY_2];

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/l2vc/l2vcmgrd.conf";

/// Endpoint type names used in the desired-state tree
pub mod endpoint_types {
    /// Local (interface-bound) endpoint
    pub const LOCAL: &str = "local";

    /// Remote (peer-bound) endpoint
    pub const REMOTE: &str = "remote";
}

/// Command template placeholders
pub mod placeholders {
    pub const NAME: &str = "{name}";
    pub const PEER: &str = "{peer}";
    pub const VC_ID: &str = "{vcid}";
    pub const IFC: &str = "{ifc}";
    pub const VLAN: &str = "{vlan}";
    /// Full reference (`name` or `name.sub`) of endpoint "1"
    pub const IFC1: &str = "{ifc1}";
    /// Full reference (`name` or `name.sub`) of endpoint "2"
    pub const IFC2: &str = "{ifc2}";
}
