use std::fmt;

/// OpKind is the closed set of requests a client can route through consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Get,
    Put,
    Delete,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpKind::Get => "GET",
            OpKind::Put => "PUT",
            OpKind::Delete => "DELETE",
        };
        write!(f, "{}", s)
    }
}

/// Operation is a single store request. It is immutable once built and always passed by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    pub kind: OpKind,
    pub key: String,
    pub value: Option<String>,
}

impl Operation {
    pub fn get(key: impl Into<String>) -> Operation {
        Operation {
            kind: OpKind::Get,
            key: key.into(),
            value: None,
        }
    }

    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Operation {
        Operation {
            kind: OpKind::Put,
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(key: impl Into<String>) -> Operation {
        Operation {
            kind: OpKind::Delete,
            key: key.into(),
            value: None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{} {} {}", self.kind, self.key, v),
            None => write!(f, "{} {}", self.kind, self.key),
        }
    }
}
