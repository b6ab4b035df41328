use std::process;
use std::str::FromStr;

use clap::{App, Arg, ArgMatches};
use slog::{error, info, warn, Logger};

use paxos::conf::ClusterConf;
use pkv::setup::init_logger;
use pkv::{Server, ServerError};

const NUM_SERVERS: usize = 5;

#[tokio::main]
async fn main() {
    let matches = App::new("pkv")
        .version("0.1.0")
        .about("paxos replicated key-value store node")
        .arg(
            Arg::with_name("cluster")
                .long("cluster")
                .takes_value(true)
                .help("cluster config in yaml. Without it 5 nodes on 127.0.0.1 from --base-port are used"),
        )
        .arg(
            Arg::with_name("base-port")
                .long("base-port")
                .takes_value(true)
                .default_value("4000")
                .help("port of node 0 when no --cluster is given, node i listens on base-port + i"),
        )
        .arg(
            Arg::with_name("id")
                .long("id")
                .takes_value(true)
                .required_unless("all")
                .help("index of the node to run. It must be one key of cluster.nodes"),
        )
        .arg(
            Arg::with_name("all")
                .long("all")
                .conflicts_with("id")
                .help("run every node of the cluster in this process"),
        )
        .arg(
            Arg::with_name("faults")
                .long("faults")
                .help("simulate failing acceptors, overriding the fault section of the cluster config"),
        )
        .arg(
            Arg::with_name("log")
                .long("log")
                .takes_value(true)
                .help("log file, stderr if absent"),
        )
        .get_matches();

    let logger = match init_logger(matches.value_of("log")) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("can not init logger: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&matches, &logger).await {
        error!(logger, "server exit"; "err" => %e);
        eprintln!("Server exception: {}", e);
        process::exit(1);
    }
}

async fn run(matches: &ArgMatches<'_>, logger: &Logger) -> Result<(), ServerError> {
    let mut conf = match matches.value_of("cluster") {
        Some(path) => ClusterConf::from_file(path)?,
        None => {
            let port = parse_arg(matches, "base-port")?;
            ClusterConf::local(NUM_SERVERS, port)?
        }
    };

    if matches.is_present("faults") {
        conf.fault.enabled = true;
        conf.fault.outages = true;
    }

    let ids: Vec<usize> = if matches.is_present("all") {
        conf.nodes.keys().cloned().collect()
    } else {
        vec![parse_arg(matches, "id")?]
    };

    let mut servers = Vec::with_capacity(ids.len());
    for id in ids {
        let mut s = Server::new(&conf, id, logger)?;
        s.start();
        println!("Server {} is ready at {}", id, s.addr());
        servers.push(s);
    }
    println!("Servers ready...");

    tokio::signal::ctrl_c().await?;
    info!(logger, "shutting down");

    // a node whose service already quit has no receiver left, its join reports why
    for s in servers.iter_mut() {
        if let Err(e) = s.stop() {
            warn!(logger, "stop"; "addr" => %s.addr(), "err" => %e);
        }
    }

    let mut rst = Ok(());
    for s in servers.iter_mut() {
        if let Err(e) = s.join().await {
            error!(logger, "server quit"; "addr" => %s.addr(), "err" => %e);
            rst = Err(e);
        }
    }
    rst
}

fn parse_arg<T: FromStr>(matches: &ArgMatches<'_>, name: &'static str) -> Result<T, ServerError> {
    let v = matches.value_of(name).unwrap_or_default();
    v.parse::<T>().map_err(|_| ServerError::InvalidArg(name, v.to_string()))
}
