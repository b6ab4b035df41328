use std::net::SocketAddr;
use std::process;
use std::time::Duration;

use clap::{App, Arg};
use slog::{o, Logger};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use paxos::rpc::RemotePeer;
use pkv::setup::init_logger;
use pkv::shell::{prepopulate, render, timestamp, Command, PROMPT};

#[tokio::main]
async fn main() {
    let matches = App::new("pkv-cli")
        .version("0.1.0")
        .about("interactive client of a pkv node")
        .arg(
            Arg::with_name("addr")
                .long("addr")
                .takes_value(true)
                .default_value("127.0.0.1:4000")
                .help("address of the node to send operations to"),
        )
        .arg(
            Arg::with_name("timeout-ms")
                .long("timeout-ms")
                .takes_value(true)
                .default_value("10000")
                .help("give up an operation after this many milliseconds"),
        )
        .arg(
            Arg::with_name("prepopulate")
                .long("prepopulate")
                .help("run 5 rounds of PUT, GET and DELETE before reading stdin"),
        )
        .arg(
            Arg::with_name("log")
                .long("log")
                .takes_value(true)
                .help("log file, no log if absent"),
        )
        .get_matches();

    let addr: SocketAddr = match matches.value_of("addr").unwrap_or_default().parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("invalid --addr: {}", e);
            process::exit(1);
        }
    };

    let timeout_ms: u64 = match matches.value_of("timeout-ms").unwrap_or_default().parse() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("invalid --timeout-ms: {}", e);
            process::exit(1);
        }
    };

    let logger = match matches.value_of("log") {
        Some(p) => match init_logger(Some(p)) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("can not init logger: {}", e);
                process::exit(1);
            }
        },
        None => Logger::root(slog::Discard, o!()),
    };

    let peer = RemotePeer::new(addr, Duration::from_millis(timeout_ms), logger);

    println!("Starting the key-value store client of {}\n", addr);

    if matches.is_present("prepopulate") {
        println!("Enter at least 5 PUTs, 5 GETs, 5 DELETEs operation.\nHere is an example:");
        for c in prepopulate() {
            println!("{}", render(&c, &c.run(&peer).await));
        }
    }

    println!("{}, {}", timestamp(), PROMPT);

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Client exception: {}", e);
                process::exit(1);
            }
        };

        let ts = timestamp();
        println!("{}, Sending: {}", ts, line);

        match Command::parse(&line) {
            Ok(c) => println!("{}", render(&c, &c.run(&peer).await)),
            Err(e) => println!("{}, {}", ts, e),
        }

        println!("{}, {}", timestamp(), PROMPT);
    }
}
