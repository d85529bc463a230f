//! Running-config parsers
//!
//! Every dialect is parsed by the same routine, driven by its
//! [`Dialect`] rules:
//!
//! 1. Collect the circuit's section (header line plus every deeper-indented
//!    line after it, over all occurrences of the header). Lines are trimmed.
//! 2. If the dialect has a pseudowire form and the section names a peer,
//!    require the VC id and at least one attachment.
//! 3. Otherwise require two attachments in the cross-connect section.
//!
//! Attachments found by scanning are ordered by their character offset in
//! the trimmed section text: the earlier match becomes endpoint "1". This is
//! a heuristic over free-form text and only as stable as the device's
//! output ordering.

use regex::{Captures, Regex};
use std::net::Ipv4Addr;

use l2vc_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::dialect::{AttachmentRule, Dialect};
use crate::tables::placeholders;
use crate::types::{Circuit, InterfaceRef, RemotePeer};

/// Parses the CLI outputs fetched for circuit `name`
///
/// Returns `ParseMismatch` when the dialect does not recognise a complete
/// circuit; never a partial one.
pub fn parse(dialect: &Dialect, name: &str, outputs: &[String]) -> CfgMgrResult<Circuit> {
    let text = outputs.join("\n");
    let mismatch = |reason: String| CfgMgrError::parse_mismatch(dialect.id.as_str(), reason);

    if let Some(rules) = &dialect.remote {
        let header = header_regex(dialect, rules.header, name)?;
        if let Some(section) = extract_section(&text, &header) {
            if let Some(peer) = capture(&rules.peer, &section, "peer") {
                let address: Ipv4Addr = peer
                    .parse()
                    .map_err(|_| mismatch(format!("peer '{}' is not an IPv4 address", peer)))?;
                let vc_id = capture(&rules.vc_id, &section, "vcid")
                    .ok_or_else(|| mismatch(format!("no virtual circuit id for '{}'", name)))?
                    .parse::<u32>()
                    .map_err(|e| mismatch(format!("invalid virtual circuit id: {}", e)))?;
                let local = scan_attachments(dialect, &section)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| mismatch(format!("no local interface for '{}'", name)))?;

                return Circuit::local_remote(name, local, RemotePeer::new(address, vc_id));
            }
        }
    }

    let header = header_regex(dialect, dialect.local_header, name)?;
    let section = extract_section(&text, &header)
        .ok_or_else(|| mismatch(format!("no section for '{}'", name)))?;
    let mut locals = scan_attachments(dialect, &section)?.into_iter();
    match (locals.next(), locals.next()) {
        (Some(first), Some(second)) => Circuit::local_local(name, first, second),
        _ => Err(mismatch(format!("fewer than two interfaces for '{}'", name))),
    }
}

fn header_regex(dialect: &Dialect, pattern: &str, name: &str) -> CfgMgrResult<Regex> {
    Regex::new(&pattern.replace(placeholders::NAME, &regex::escape(name)))
        .map_err(|e| CfgMgrError::parse_mismatch(dialect.id.as_str(), e.to_string()))
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Collects the trimmed lines of every section opened by `header`
///
/// Returns `None` if the header never matches.
pub fn extract_section(text: &str, header: &Regex) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut section: Vec<&str> = Vec::new();
    let mut found = false;
    let mut i = 0;

    while i < lines.len() {
        if !header.is_match(lines[i]) {
            i += 1;
            continue;
        }

        found = true;
        let indent = indent_width(lines[i]);
        section.push(lines[i].trim());
        i += 1;

        while i < lines.len() {
            let line = lines[i];
            if line.trim().is_empty() {
                i += 1;
                continue;
            }
            if indent_width(line) <= indent {
                break;
            }
            section.push(line.trim());
            i += 1;
        }
    }

    found.then(|| section.join("\n"))
}

fn capture<'t>(rule: &Regex, text: &'t str, group: &str) -> Option<&'t str> {
    rule.captures(text)
        .and_then(|caps| caps.name(group))
        .map(|m| m.as_str())
}

/// A reference found in section text, with its byte range
#[derive(Debug)]
struct Found {
    start: usize,
    end: usize,
    reference: InterfaceRef,
}

fn vlan_of(dialect: &Dialect, caps: &Captures<'_>) -> CfgMgrResult<u32> {
    caps["vlan"].parse::<u32>().map_err(|e| {
        CfgMgrError::parse_mismatch(dialect.id.as_str(), format!("invalid VLAN id: {}", e))
    })
}

/// Extracts attachment references in endpoint order
fn scan_attachments(dialect: &Dialect, section: &str) -> CfgMgrResult<Vec<InterfaceRef>> {
    match &dialect.attachments {
        AttachmentRule::Pair(rule) => Ok(rule
            .captures(section)
            .map(|caps| {
                vec![
                    InterfaceRef::parse(&caps["first"]),
                    InterfaceRef::parse(&caps["second"]),
                ]
            })
            .unwrap_or_default()),
        AttachmentRule::Scan { untagged, tagged } => {
            let mut found = Vec::new();
            for caps in tagged.captures_iter(section) {
                let Some(whole) = caps.get(0) else { continue };
                found.push(Found {
                    start: whole.start(),
                    end: whole.end(),
                    reference: InterfaceRef::tagged(&caps["ifc"], vlan_of(dialect, &caps)?),
                });
            }
            for caps in untagged.captures_iter(section) {
                let Some(whole) = caps.get(0) else { continue };
                found.push(Found {
                    start: whole.start(),
                    end: whole.end(),
                    reference: InterfaceRef::new(&caps["ifc"]),
                });
            }

            // Earliest first; on equal offsets the longer match wins.
            found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

            let mut ordered: Vec<Found> = Vec::with_capacity(found.len());
            for f in found {
                if ordered.last().map_or(true, |prev| f.start >= prev.end) {
                    ordered.push(f);
                }
            }
            Ok(ordered.into_iter().map(|f| f.reference).collect())
        }
    }
}
