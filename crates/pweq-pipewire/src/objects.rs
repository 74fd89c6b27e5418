//! Parsing of `pw-cli list-objects` output.
//!
//! ```text
//! 	id 31, type PipeWire:Interface:Node/3
//!  		object.serial = "31"
//!  		node.name = "effect_input.pweq"
//!  		media.class = "Audio/Sink"
//! 	id 32, type PipeWire:Interface:Port/3
//!  		port.direction = "in"
//! *		node.id = "31"
//! ```
//!
//! Each `id N, type T` header opens an object; `key = value` lines below it
//! are its properties. A leading `*` (changed property marker) is ignored.

use std::collections::BTreeMap;

/// One object from a `pw-cli list-objects` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwObject {
    /// Global object id.
    pub id: u32,
    /// Interface type, e.g. `PipeWire:Interface:Node/3`.
    pub kind: String,
    /// Properties with surrounding quotes removed.
    pub props: BTreeMap<String, String>,
}

impl PwObject {
    /// Property value by key.
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Whether the interface type is `name`, ignoring namespace and version
    /// (`is_kind("Node")` matches `PipeWire:Interface:Node/3`).
    pub fn is_kind(&self, name: &str) -> bool {
        self.kind
            .rsplit(':')
            .next()
            .and_then(|last| last.split('/').next())
            == Some(name)
    }
}

/// Parse a `pw-cli list-objects` listing. Unrecognised lines are skipped.
pub fn parse_objects(text: &str) -> Vec<PwObject> {
    let mut objects: Vec<PwObject> = Vec::new();

    for line in text.lines() {
        let line = line.trim_start_matches(|c: char| c == '*' || c.is_whitespace());
        let line = line.trim_end();

        if let Some(header) = line.strip_prefix("id ") {
            let Some((id, rest)) = header.split_once(',') else {
                continue;
            };
            let Ok(id) = id.trim().parse::<u32>() else {
                continue;
            };
            let kind = rest.trim().strip_prefix("type ").unwrap_or("").trim();
            objects.push(PwObject {
                id,
                kind: kind.to_string(),
                props: BTreeMap::new(),
            });
            continue;
        }

        let Some(current) = objects.last_mut() else {
            continue;
        };
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = value.trim().trim_matches('"');
            current.props.insert(key.to_string(), value.to_string());
        }
    }

    objects
}

/// Id of the first node whose `node.name` is `name`.
pub fn find_node_id(objects: &[PwObject], name: &str) -> Option<u32> {
    objects
        .iter()
        .find(|o| o.is_kind("Node") && o.prop("node.name") == Some(name))
        .map(|o| o.id)
}

/// Id of a port owned by `node_id`, preferring input ports.
pub fn find_port_id(objects: &[PwObject], node_id: u32) -> Option<u32> {
    let node = node_id.to_string();
    let mut owned = objects
        .iter()
        .filter(|o| o.is_kind("Port") && o.prop("node.id") == Some(node.as_str()))
        .peekable();

    let first = owned.peek().map(|o| o.id);
    owned
        .find(|o| o.prop("port.direction") == Some("in"))
        .map(|o| o.id)
        .or(first)
}
