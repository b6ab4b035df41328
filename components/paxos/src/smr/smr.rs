use std::collections::BTreeMap;
use std::fmt;

use crate::operation::{OpKind, Operation};
use crate::NodeIndex;

/// Applied is the outcome of applying one operation to a KvStateMachine.
///
/// Its Display impl is the result text handed back to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Found(String),
    NotFound,
    Saved {
        key: String,
        value: String,
        node: NodeIndex,
        snapshot: String,
    },
    AlreadyExists,
    Deleted { snapshot: String },
    NothingToDelete { snapshot: String },
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Applied::Found(v) => write!(f, "Here is your value {}", v),
            Applied::NotFound => write!(f, "Key does not exist, try another key."),
            Applied::Saved {
                key,
                value,
                node,
                snapshot,
            } => write!(
                f,
                "OK saved operation: {{key= {}, value= {}}}, current operations in server {}: {}",
                key, value, node, snapshot
            ),
            Applied::AlreadyExists => write!(f, "Key already exists, try another key."),
            Applied::Deleted { snapshot } => {
                write!(f, "Deleted key as requested. Operations left: {}", snapshot)
            }
            Applied::NothingToDelete { snapshot } => {
                write!(f, "Key does not exist. Operations left: {}", snapshot)
            }
        }
    }
}

/// KvStateMachine is the replicated key-value map of one node.
///
/// It is only ever mutated by `apply`, which the learner calls for learned proposals.
#[derive(Debug, Default)]
pub struct KvStateMachine {
    node: NodeIndex,
    map: BTreeMap<String, String>,
}

impl KvStateMachine {
    pub fn new(node: NodeIndex) -> KvStateMachine {
        KvStateMachine {
            node,
            map: BTreeMap::new(),
        }
    }

    pub fn apply(&mut self, op: &Operation) -> Applied {
        match op.kind {
            OpKind::Get => match self.map.get(&op.key) {
                Some(v) => Applied::Found(v.clone()),
                None => Applied::NotFound,
            },
            OpKind::Put => {
                if self.map.contains_key(&op.key) {
                    return Applied::AlreadyExists;
                }
                let value = op.value.clone().unwrap_or_default();
                self.map.insert(op.key.clone(), value.clone());
                Applied::Saved {
                    key: op.key.clone(),
                    value,
                    node: self.node,
                    snapshot: self.render(),
                }
            }
            OpKind::Delete => match self.map.remove(&op.key) {
                Some(_) => Applied::Deleted {
                    snapshot: self.render(),
                },
                None => Applied::NothingToDelete {
                    snapshot: self.render(),
                },
            },
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.map.clone()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// render formats the map as `{k1=v1, k2=v2}`.
    fn render(&self) -> String {
        let items: Vec<String> = self
            .map
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{{{}}}", items.join(", "))
    }
}
