//! Wire messages. They are declared by hand in the shape prost generates for a `.proto` file,
//! so no protoc is needed at build time.

use std::convert::TryFrom;

use crate::acceptor::{Promise, Vote};
use crate::ballot::{ProposalId, NO_PROPOSAL};
use crate::message::ProtocolError;
use crate::operation::{OpKind, Operation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OpCode {
    Get = 0,
    Put = 1,
    Delete = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OperationMsg {
    #[prost(enumeration = "OpCode", tag = "1")]
    pub op: i32,
    #[prost(string, tag = "2")]
    pub key: String,
    #[prost(string, optional, tag = "3")]
    pub value: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrepareRequest {
    #[prost(int64, tag = "1")]
    pub proposal_id: i64,
}

/// `promised_id` is -1 on rejection, and `highest_id` is then the greatest id the acceptor
/// knows of. `vote_op` is set only when the acceptor reports its unlearned vote, and
/// `learned_op` only when it has learned something. Their ids are -1 otherwise.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrepareReply {
    #[prost(int64, tag = "1")]
    pub promised_id: i64,
    #[prost(int64, tag = "2")]
    pub vote_id: i64,
    #[prost(message, optional, tag = "3")]
    pub vote_op: Option<OperationMsg>,
    #[prost(int64, tag = "4")]
    pub highest_id: i64,
    #[prost(int64, tag = "5")]
    pub learned_id: i64,
    #[prost(message, optional, tag = "6")]
    pub learned_op: Option<OperationMsg>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AcceptRequest {
    #[prost(int64, tag = "1")]
    pub proposal_id: i64,
    #[prost(message, optional, tag = "2")]
    pub operation: Option<OperationMsg>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AcceptReply {
    #[prost(bool, tag = "1")]
    pub accepted: bool,
}

/// `prev_op` is the proposal learned before this one, `prev_id` is -1 if there is none.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LearnRequest {
    #[prost(int64, tag = "1")]
    pub proposal_id: i64,
    #[prost(message, optional, tag = "2")]
    pub operation: Option<OperationMsg>,
    #[prost(int64, tag = "3")]
    pub prev_id: i64,
    #[prost(message, optional, tag = "4")]
    pub prev_op: Option<OperationMsg>,
}

/// An empty `result_text` means the proposal was stale and nothing was applied.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LearnReply {
    #[prost(string, tag = "1")]
    pub result_text: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReleaseRequest {
    #[prost(int64, tag = "1")]
    pub proposal_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReleaseReply {
    #[prost(bool, tag = "1")]
    pub released: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRequest {
    #[prost(string, tag = "1")]
    pub key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutRequest {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteRequest {
    #[prost(string, tag = "1")]
    pub key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KvReply {
    #[prost(string, tag = "1")]
    pub result_text: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorReply {
    #[prost(string, tag = "1")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(oneof = "request::Body", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub body: Option<request::Body>,
}

pub mod request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        Prepare(super::PrepareRequest),
        #[prost(message, tag = "2")]
        Accept(super::AcceptRequest),
        #[prost(message, tag = "3")]
        Learn(super::LearnRequest),
        #[prost(message, tag = "4")]
        Get(super::GetRequest),
        #[prost(message, tag = "5")]
        Put(super::PutRequest),
        #[prost(message, tag = "6")]
        Delete(super::DeleteRequest),
        #[prost(message, tag = "7")]
        Release(super::ReleaseRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Reply {
    #[prost(oneof = "reply::Body", tags = "1, 2, 3, 4, 5, 6")]
    pub body: Option<reply::Body>,
}

pub mod reply {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        Prepare(super::PrepareReply),
        #[prost(message, tag = "2")]
        Accept(super::AcceptReply),
        #[prost(message, tag = "3")]
        Learn(super::LearnReply),
        #[prost(message, tag = "4")]
        Kv(super::KvReply),
        #[prost(message, tag = "5")]
        Error(super::ErrorReply),
        #[prost(message, tag = "6")]
        Release(super::ReleaseReply),
    }
}

impl From<OpKind> for OpCode {
    fn from(k: OpKind) -> Self {
        match k {
            OpKind::Get => OpCode::Get,
            OpKind::Put => OpCode::Put,
            OpKind::Delete => OpCode::Delete,
        }
    }
}

impl From<&Operation> for OperationMsg {
    fn from(op: &Operation) -> Self {
        OperationMsg {
            op: OpCode::from(op.kind) as i32,
            key: op.key.clone(),
            value: op.value.clone(),
        }
    }
}

impl TryFrom<&OperationMsg> for Operation {
    type Error = ProtocolError;

    fn try_from(m: &OperationMsg) -> Result<Self, Self::Error> {
        let code = OpCode::try_from(m.op).map_err(|_| ProtocolError::UnknownOpKind(m.op))?;
        let op = match code {
            OpCode::Get => Operation::get(m.key.as_str()),
            OpCode::Delete => Operation::delete(m.key.as_str()),
            OpCode::Put => {
                let v = m
                    .value
                    .as_ref()
                    .ok_or_else(|| ProtocolError::LackOf("operation.value".into()))?;
                Operation::put(m.key.as_str(), v.as_str())
            }
        };
        Ok(op)
    }
}

/// required_op extracts the operation a request must carry.
pub fn required_op(m: &Option<OperationMsg>) -> Result<Operation, ProtocolError> {
    let m = m
        .as_ref()
        .ok_or_else(|| ProtocolError::LackOf("operation".into()))?;
    Operation::try_from(m)
}

fn vote_id(v: &Option<Vote>) -> i64 {
    v.as_ref().map_or(NO_PROPOSAL, |v| v.id.to_wire())
}

fn vote_op(v: &Option<Vote>) -> Option<OperationMsg> {
    v.as_ref().map(|v| OperationMsg::from(&v.op))
}

/// vote_from_wire rebuilds a vote sent as an id and an operation. A negative id means none.
pub fn vote_from_wire(id: i64, op: &Option<OperationMsg>) -> Result<Option<Vote>, ProtocolError> {
    match (ProposalId::from_wire(id), op) {
        (Some(id), Some(op)) => Ok(Some(Vote {
            id,
            op: Operation::try_from(op)?,
        })),
        _ => Ok(None),
    }
}

impl From<&Promise> for PrepareReply {
    fn from(p: &Promise) -> Self {
        match p {
            Promise::Rejected { highest } => PrepareReply {
                promised_id: NO_PROPOSAL,
                vote_id: NO_PROPOSAL,
                vote_op: None,
                highest_id: highest.map_or(NO_PROPOSAL, |h| h.to_wire()),
                learned_id: NO_PROPOSAL,
                learned_op: None,
            },
            Promise::Granted { id, vote, learned } => PrepareReply {
                promised_id: id.to_wire(),
                vote_id: vote_id(vote),
                vote_op: vote_op(vote),
                highest_id: NO_PROPOSAL,
                learned_id: vote_id(learned),
                learned_op: vote_op(learned),
            },
        }
    }
}

impl TryFrom<&PrepareReply> for Promise {
    type Error = ProtocolError;

    fn try_from(r: &PrepareReply) -> Result<Self, Self::Error> {
        let id = match ProposalId::from_wire(r.promised_id) {
            Some(id) => id,
            None => {
                return Ok(Promise::Rejected {
                    highest: ProposalId::from_wire(r.highest_id),
                })
            }
        };

        Ok(Promise::Granted {
            id,
            vote: vote_from_wire(r.vote_id, &r.vote_op)?,
            learned: vote_from_wire(r.learned_id, &r.learned_op)?,
        })
    }
}

impl Request {
    pub fn prepare(id: ProposalId) -> Request {
        Request {
            body: Some(request::Body::Prepare(PrepareRequest {
                proposal_id: id.to_wire(),
            })),
        }
    }

    pub fn accept(id: ProposalId, op: &Operation) -> Request {
        Request {
            body: Some(request::Body::Accept(AcceptRequest {
                proposal_id: id.to_wire(),
                operation: Some(op.into()),
            })),
        }
    }

    pub fn learn(id: ProposalId, op: &Operation, prev: &Option<Vote>) -> Request {
        Request {
            body: Some(request::Body::Learn(LearnRequest {
                proposal_id: id.to_wire(),
                operation: Some(op.into()),
                prev_id: vote_id(prev),
                prev_op: vote_op(prev),
            })),
        }
    }

    pub fn release(id: ProposalId) -> Request {
        Request {
            body: Some(request::Body::Release(ReleaseRequest {
                proposal_id: id.to_wire(),
            })),
        }
    }

    pub fn get(key: &str) -> Request {
        Request {
            body: Some(request::Body::Get(GetRequest { key: key.into() })),
        }
    }

    pub fn put(key: &str, value: &str) -> Request {
        Request {
            body: Some(request::Body::Put(PutRequest {
                key: key.into(),
                value: value.into(),
            })),
        }
    }

    pub fn delete(key: &str) -> Request {
        Request {
            body: Some(request::Body::Delete(DeleteRequest { key: key.into() })),
        }
    }
}

impl Reply {
    pub fn of(body: reply::Body) -> Reply {
        Reply { body: Some(body) }
    }

    pub fn error(message: impl Into<String>) -> Reply {
        Reply::of(reply::Body::Error(ErrorReply {
            message: message.into(),
        }))
    }
}
