use std::fmt;

use paxos::rpc::RpcError;
use paxos::traits::KvStore;

pub const PROMPT: &str = "Enter operation:\nPUT <key> <value> or GET <key> or DELETE <key>";

/// Keys of the warm-up run. Round i puts key i with key i+1 as its value.
pub const PREPOPULATE: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

quick_error! {
    #[derive(Debug, PartialEq, Eq)]
    pub enum ShellError {
        GetArgs {
            display("Make sure there's one key to perform GET operation.")
        }

        PutArgs {
            display("Make sure there's one key value to perform PUT operation.")
        }

        DeleteArgs {
            display("Make sure there's one key to perform DELETE operation.")
        }

        Unknown(op: String) {
            display("Received an unknown operation. Try again. Or you didn't want to shut down.")
        }
    }
}

/// Command is one line typed into the client shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get(String),
    Put(String, String),
    Delete(String),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Get(k) => write!(f, "GET {}", k),
            Command::Put(k, v) => write!(f, "PUT {} {}", k, v),
            Command::Delete(k) => write!(f, "DELETE {}", k),
        }
    }
}

impl Command {
    /// parse reads `OP key [value]`. The op is case-insensitive and tokens are split on
    /// any whitespace.
    pub fn parse(line: &str) -> Result<Command, ShellError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let op = tokens.first().map(|s| s.to_uppercase()).unwrap_or_default();

        match (op.as_str(), tokens.len()) {
            ("GET", 2) => Ok(Command::Get(tokens[1].to_string())),
            ("GET", _) => Err(ShellError::GetArgs),
            ("PUT", 3) => Ok(Command::Put(tokens[1].to_string(), tokens[2].to_string())),
            ("PUT", _) => Err(ShellError::PutArgs),
            ("DELETE", 2) => Ok(Command::Delete(tokens[1].to_string())),
            ("DELETE", _) => Err(ShellError::DeleteArgs),
            _ => Err(ShellError::Unknown(op)),
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            Command::Get(_) => "GET",
            Command::Put(_, _) => "PUT",
            Command::Delete(_) => "DELETE",
        }
    }

    /// run sends the command to `store` and returns the node's result text.
    pub async fn run(&self, store: &dyn KvStore) -> Result<String, RpcError> {
        match self {
            Command::Get(k) => store.get(k).await,
            Command::Put(k, v) => store.put(k, v).await,
            Command::Delete(k) => store.delete(k).await,
        }
    }
}

/// render formats the outcome of one command the way the shell prints it.
pub fn render(cmd: &Command, rst: &Result<String, RpcError>) -> String {
    match rst {
        Ok(txt) => format!("{}, receiving {}: {}", timestamp(), cmd, txt),
        Err(e) => format!("{} operation failed: {}", cmd.op(), e),
    }
}

/// prepopulate returns the warm-up commands: five rounds of PUT, GET and DELETE.
pub fn prepopulate() -> Vec<Command> {
    PREPOPULATE
        .windows(2)
        .flat_map(|w| {
            let (k, v) = (w[0].to_string(), w[1].to_string());
            vec![
                Command::Put(k.clone(), v),
                Command::Get(k.clone()),
                Command::Delete(k),
            ]
        })
        .collect()
}

/// timestamp is the local wall clock as `HH:MM:SS.mmm`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}
