//! CLI dialect table
//!
//! A [`Dialect`] describes one CLI syntax family: the show commands that
//! fetch a circuit, the section headers that locate it in running-config
//! text, the extraction rules for each field, and the command templates used
//! to create and tear it down. The engine is generic over this table; adding
//! a vendor means adding an entry here.
//!
//! Template placeholders are listed in [`crate::tables::placeholders`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use l2vc_cfgmgr_common::CfgMgrError;

use crate::types::CircuitKind;

/// Dialect identifier as used in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectId {
    /// `vll` / `vll-local` keyword style (IronWare)
    Ironware,
    /// `l2vpn xconnect group` / `p2p` / `neighbor` style (IOS XR)
    Iosxr,
    /// `connect` style (IOS); local cross-connects only
    Ios,
}

impl DialectId {
    /// All dialects, in default read order
    pub const ALL: [DialectId; 3] = [DialectId::Iosxr, DialectId::Ironware, DialectId::Ios];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectId::Ironware => "ironware",
            DialectId::Iosxr => "iosxr",
            DialectId::Ios => "ios",
        }
    }

    /// The dialect descriptor
    pub fn dialect(&self) -> &'static Dialect {
        match self {
            DialectId::Ironware => &IRONWARE,
            DialectId::Iosxr => &IOSXR,
            DialectId::Ios => &IOS,
        }
    }
}

impl fmt::Display for DialectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectId {
    type Err = CfgMgrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DialectId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| CfgMgrError::invalid_config("dialect", format!("unknown dialect '{}'", s)))
    }
}

/// Pseudowire extraction rules
#[derive(Debug)]
pub struct RemoteRules {
    /// Section header pattern; `{name}` is replaced by the escaped circuit name
    pub header: &'static str,
    /// Captures `peer`
    pub peer: Regex,
    /// Captures `vcid`
    pub vc_id: Regex,
}

/// How local interface references are found in a section
#[derive(Debug)]
pub enum AttachmentRule {
    /// Every match of either pattern is a reference; endpoints are ordered by
    /// character offset. `untagged` captures `ifc`, `tagged` captures `ifc`
    /// and `vlan`.
    Scan { untagged: Regex, tagged: Regex },
    /// One pattern capturing `first` and `second` full references
    /// (`name` or `name.sub`)
    Pair(Regex),
}

/// Command templates, one slice of lines per batch
#[derive(Debug)]
pub struct Templates {
    /// Pseudowire session (peer + VC id)
    pub session: &'static [&'static str],
    /// Untagged attachment of the local side of a pseudowire
    pub remote_untagged: &'static [&'static str],
    /// Tagged attachment of the local side of a pseudowire
    pub remote_tagged: &'static [&'static str],
    /// Untagged attachment of one cross-connect endpoint
    pub local_untagged: &'static [&'static str],
    /// Tagged attachment of one cross-connect endpoint
    pub local_tagged: &'static [&'static str],
    /// Binds both cross-connect endpoints at once; empty when the
    /// attachments already do
    pub local_connect: &'static [&'static str],
    /// Removes a pseudowire
    pub remote_teardown: &'static [&'static str],
    /// Removes a cross-connect container
    pub local_teardown: &'static [&'static str],
}

/// One CLI syntax family
#[derive(Debug)]
pub struct Dialect {
    pub id: DialectId,
    /// Show commands fetched for a circuit; outputs are concatenated
    pub read_commands: &'static [&'static str],
    /// `None` if the family has no pseudowire form
    pub remote: Option<RemoteRules>,
    /// Section header of a cross-connect
    pub local_header: &'static str,
    pub attachments: AttachmentRule,
    pub templates: Templates,
}

impl Dialect {
    /// Returns true if this dialect can express `kind`
    pub fn supports(&self, kind: CircuitKind) -> bool {
        match kind {
            CircuitKind::LocalLocal => true,
            CircuitKind::LocalRemote => self.remote.is_some(),
        }
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid regex pattern")
}

const IPV4: &str = r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}";

static IRONWARE: Lazy<Dialect> = Lazy::new(|| Dialect {
    id: DialectId::Ironware,
    read_commands: &["show running-config | begin router mpls"],
    remote: Some(RemoteRules {
        header: r"^(?P<indent>[ \t]*)vll[ \t]+{name}[ \t]+\d+[ \t]*$",
        peer: re(&format!(r"(?m)^vll-peer\s+(?P<peer>{})\b", IPV4)),
        vc_id: re(r"(?m)^vll\s+\S+\s+(?P<vcid>\d+)\s*$"),
    }),
    local_header: r"^(?P<indent>[ \t]*)vll-local[ \t]+{name}[ \t]*$",
    attachments: AttachmentRule::Scan {
        untagged: re(r"(?m)^untagged\s+(?P<ifc>ethe(?:rnet)?[ \t]+\S+|\S+)"),
        tagged: re(r"(?m)^vlan\s+(?P<vlan>\d+)\s*\n\s*tagged\s+(?P<ifc>ethe(?:rnet)?[ \t]+\S+|\S+)"),
    },
    templates: Templates {
        session: &["router mpls", " vll {name} {vcid}", "  vll-peer {peer}"],
        remote_untagged: &["router mpls", " vll {name} {vcid}", "  untagged {ifc}"],
        remote_tagged: &[
            "router mpls",
            " vll {name} {vcid}",
            "  vlan {vlan}",
            "   tagged {ifc}",
        ],
        local_untagged: &["router mpls", " vll-local {name}", "  untagged {ifc}"],
        local_tagged: &[
            "router mpls",
            " vll-local {name}",
            "  vlan {vlan}",
            "   tagged {ifc}",
        ],
        local_connect: &[],
        remote_teardown: &["router mpls", " no vll {name} {vcid}"],
        local_teardown: &["router mpls", " no vll-local {name}"],
    },
});

static IOSXR: Lazy<Dialect> = Lazy::new(|| Dialect {
    id: DialectId::Iosxr,
    read_commands: &["show running-config l2vpn xconnect group {name}"],
    remote: Some(RemoteRules {
        header: r"^(?P<indent>[ \t]*)p2p[ \t]+{name}[ \t]*$",
        peer: re(&format!(
            r"(?m)^neighbor\s+(?:ipv4\s+)?(?P<peer>{})\s+pw-id\s+\d+",
            IPV4
        )),
        vc_id: re(&format!(
            r"(?m)^neighbor\s+(?:ipv4\s+)?{}\s+pw-id\s+(?P<vcid>\d+)",
            IPV4
        )),
    }),
    local_header: r"^(?P<indent>[ \t]*)p2p[ \t]+{name}[ \t]*$",
    attachments: AttachmentRule::Scan {
        untagged: re(r"(?m)^interface[ \t]+(?P<ifc>[^\s.]+)[ \t]*$"),
        tagged: re(r"(?m)^interface[ \t]+(?P<ifc>[^\s.]+)\.(?P<vlan>\d+)[ \t]*$"),
    },
    templates: Templates {
        session: &[
            "l2vpn",
            " xconnect group {name}",
            "  p2p {name}",
            "   neighbor ipv4 {peer} pw-id {vcid}",
        ],
        remote_untagged: &[
            "l2vpn",
            " xconnect group {name}",
            "  p2p {name}",
            "   interface {ifc}",
        ],
        remote_tagged: &[
            "l2vpn",
            " xconnect group {name}",
            "  p2p {name}",
            "   interface {ifc}.{vlan}",
        ],
        local_untagged: &[
            "l2vpn",
            " xconnect group {name}",
            "  p2p {name}",
            "   interface {ifc}",
        ],
        local_tagged: &[
            "l2vpn",
            " xconnect group {name}",
            "  p2p {name}",
            "   interface {ifc}.{vlan}",
        ],
        local_connect: &[],
        remote_teardown: &["l2vpn", " xconnect group {name}", "  no p2p {name}"],
        local_teardown: &["l2vpn", " no xconnect group {name}"],
    },
});

static IOS: Lazy<Dialect> = Lazy::new(|| Dialect {
    id: DialectId::Ios,
    read_commands: &["show running-config | include ^connect {name} "],
    remote: None,
    local_header: r"^(?P<indent>[ \t]*)connect[ \t]+{name}[ \t]+\S+[ \t]+\S+.*$",
    attachments: AttachmentRule::Pair(re(
        r"(?m)^connect\s+\S+\s+(?P<first>\S+)\s+(?P<second>\S+)",
    )),
    templates: Templates {
        session: &[],
        remote_untagged: &[],
        remote_tagged: &[],
        // Untagged ports need no preparation before `connect`.
        local_untagged: &[],
        local_tagged: &["interface {ifc}.{vlan}", " encapsulation dot1Q {vlan}"],
        local_connect: &["connect {name} {ifc1} {ifc2}"],
        remote_teardown: &[],
        local_teardown: &["no connect {name}"],
    },
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_id_roundtrip() {
        for id in DialectId::ALL {
            assert_eq!(id.as_str().parse::<DialectId>().unwrap(), id);
            assert_eq!(id.dialect().id, id);
        }
        assert!("junos".parse::<DialectId>().is_err());
    }

    #[test]
    fn test_supports() {
        assert!(DialectId::Iosxr.dialect().supports(CircuitKind::LocalRemote));
        assert!(DialectId::Ironware.dialect().supports(CircuitKind::LocalRemote));
        assert!(!DialectId::Ios.dialect().supports(CircuitKind::LocalRemote));
        for id in DialectId::ALL {
            assert!(id.dialect().supports(CircuitKind::LocalLocal));
        }
    }

    #[test]
    fn test_ironware_tagged_does_not_match_untagged() {
        let AttachmentRule::Scan { untagged, tagged } = &DialectId::Ironware.dialect().attachments
        else {
            panic!("ironware scans attachments");
        };
        let text = "untagged ethernet 1/1\nvlan 20\ntagged ethernet 1/3";
        assert_eq!(untagged.find_iter(text).count(), 1);
        let caps = tagged.captures(text).unwrap();
        assert_eq!(&caps["vlan"], "20");
        assert_eq!(&caps["ifc"], "ethernet 1/3");
    }

    #[test]
    fn test_iosxr_interface_patterns() {
        let AttachmentRule::Scan { untagged, tagged } = &DialectId::Iosxr.dialect().attachments
        else {
            panic!("iosxr scans attachments");
        };
        assert!(untagged.is_match("interface eth1/2"));
        assert!(!untagged.is_match("interface eth1/2.20"));
        assert!(tagged.is_match("interface eth1/2.20"));
        assert!(!tagged.is_match("interface eth1/2"));
    }

    #[test]
    fn test_dialect_serde_names() {
        let id: DialectId = serde_json::from_str("\"iosxr\"").unwrap();
        assert_eq!(id, DialectId::Iosxr);
    }
}
