//! # mvpnd CLI
//!
//! The CLI runs the mvpnd daemon and can also query a running instance of it.
//! It uses the default endpoint for the JSON-RPC API (localhost:8080),
//! use `--host` and `--port` to point at mvpnd running elsewhere.
//!
//! ```sh
//! $ mvpnd run demos/config.toml
//! $ mvpnd show instances
//! $ mvpnd show routes green
//! $ mvpnd advertise route master 1-10.1.1.1:65535,9.8.7.6 -t target:127.0.0.1:1001
//! $ mvpnd advertise tree fabric 2-10.1.1.1:65535-192.168.1.1,224.1.2.3,9.8.7.6 \
//!     --label 10 --identifier 1.2.3.4 -e gre
//! ```
use std::error::Error;
use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use colored::*;
use itertools::Itertools;
use jsonrpsee::http_client::HttpClientBuilder;

use crate::api::rpc::{ApiClient, PmsiSpec, RouteDetail, RouteSpec, TreeSpec};

mod display;
mod table;

use display::{InstanceSummaryRow, NeighborDetailRow, RouteDetailRow};

#[derive(Parser, Debug)]
#[clap(name = "mvpnd", rename_all = "kebab-case")]
/// MVPN route replication engine
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,
    #[clap(short, long, default_value_t = 8080)]
    pub port: u16,
    /// API Listening address/port (E.g. 127.0.0.1:8080), overrides host/port
    #[clap(long)]
    pub api: Option<SocketAddr>,
    /// Show debug logs (additive for trace logs)
    #[clap(short, parse(from_occurrences), global = true)]
    pub verbose: u8,
}

impl Args {
    pub fn api_socket(&self) -> Result<SocketAddr, Box<dyn Error>> {
        match self.api {
            Some(socket) => Ok(socket),
            None => Ok(format!("{}:{}", self.host, self.port).parse()?),
        }
    }
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Run mvpnd daemon
    Run(RunOptions),
    /// View instances, routes and neighbors
    #[clap(alias = "s", subcommand)]
    Show(Show),
    /// Add routes to a routing instance
    #[clap(subcommand)]
    Advertise(Advertise),
    /// Remove API routes from a routing instance
    #[clap(subcommand)]
    Withdraw(Withdraw),
    /// Change the BGP identifier
    Identifier { identifier: Ipv4Addr },
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RunOptions {
    /// Path to mvpnd config.toml
    pub config_path: String,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Show {
    #[clap(alias = "i")]
    Instances,
    #[clap(alias = "r")]
    Routes(TableOptions),
    /// ErmVpn tree routes
    #[clap(alias = "t")]
    Trees(TableOptions),
    #[clap(alias = "n")]
    Neighbors(TableOptions),
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct TableOptions {
    /// Routing instance name
    #[clap(default_value = "master")]
    instance: String,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Advertise {
    Route(Route),
    Tree(Tree),
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct Route {
    instance: String,
    /// MVPN route key (E.g. 1-10.1.1.1:65535,9.8.7.6)
    prefix: String,
    /// Route targets (E.g. -t target:1:1001 -t target:1:1002)
    #[clap(short, long)]
    targets: Vec<String>,
    #[clap(long, default_value_t = 0)]
    source_as: u32,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct Tree {
    instance: String,
    /// ErmVpn route key (E.g. 2-10.1.1.1:65535-192.168.1.1,224.1.2.3,9.8.7.6)
    prefix: String,
    #[clap(short, long)]
    targets: Vec<String>,
    /// PMSI label, requires --identifier
    #[clap(long, requires = "identifier")]
    label: Option<u32>,
    /// PMSI tunnel identifier
    #[clap(long)]
    identifier: Option<Ipv4Addr>,
    /// Tunnel encapsulations (E.g. -e gre -e udp)
    #[clap(short, long)]
    encapsulations: Vec<String>,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Withdraw {
    Route { instance: String, prefix: String },
    Tree { instance: String, prefix: String },
}

fn print_routes(routes: Vec<RouteDetail>) {
    for (table_name, routes) in &routes.into_iter().group_by(|r| r.table.clone()) {
        println!("{}", table_name.bold());
        let mut table = table::OutputTable::new();
        for route in routes {
            table.add_row(&RouteDetailRow(route));
        }
        table.print();
        println!();
    }
}

async fn run_cmd(args: &Args) -> Result<(), Box<dyn Error>> {
    let client = {
        let base = format!("http://{}", args.api_socket()?);
        HttpClientBuilder::default().build(base)?
    };
    match &args.cmd {
        Command::Show(show) => match show {
            Show::Instances => {
                let mut table = table::OutputTable::new();
                for instance in client.show_instances().await? {
                    table.add_row(&InstanceSummaryRow(instance));
                }
                table.print();
            }
            Show::Routes(options) => {
                print_routes(client.show_routes(options.instance.clone()).await?);
            }
            Show::Trees(options) => {
                print_routes(client.show_tree_routes(options.instance.clone()).await?);
            }
            Show::Neighbors(options) => {
                let neighbors = client.show_neighbors(options.instance.clone()).await?;
                if neighbors.is_empty() {
                    println!("No neighbors in {}", options.instance);
                } else {
                    let mut table = table::OutputTable::new();
                    for neighbor in neighbors {
                        table.add_row(&NeighborDetailRow(neighbor));
                    }
                    table.print();
                }
            }
        },
        Command::Advertise(advertise) => match advertise {
            Advertise::Route(route) => {
                let mut spec = RouteSpec::new(&route.instance, &route.prefix);
                spec.route_targets = route.targets.clone();
                spec.source_as = route.source_as;
                match client.advertise_route(spec).await {
                    Ok(advertised) => {
                        println!("Added route to {}:", route.instance);
                        print_routes(advertised);
                    }
                    Err(err) => eprintln!("{}", format!("Error adding route: {}", err).red()),
                }
            }
            Advertise::Tree(tree) => {
                let mut spec = TreeSpec::new(&tree.instance, &tree.prefix);
                spec.route_targets = tree.targets.clone();
                if let (Some(label), Some(identifier)) = (tree.label, tree.identifier) {
                    spec.pmsi = Some(PmsiSpec {
                        label,
                        identifier,
                        encapsulations: tree.encapsulations.clone(),
                    });
                }
                match client.advertise_tree(spec).await {
                    Ok(advertised) => {
                        println!("Added tree route to {}:", tree.instance);
                        print_routes(advertised);
                    }
                    Err(err) => eprintln!("{}", format!("Error adding tree route: {}", err).red()),
                }
            }
        },
        Command::Withdraw(withdraw) => {
            let removed = match withdraw {
                Withdraw::Route { instance, prefix } => {
                    client.withdraw_route(instance.clone(), prefix.clone()).await?
                }
                Withdraw::Tree { instance, prefix } => {
                    client.withdraw_tree(instance.clone(), prefix.clone()).await?
                }
            };
            if !removed {
                println!("{}", "No API route to withdraw".yellow());
            }
        }
        Command::Identifier { identifier } => {
            let identifier = client.update_identifier(*identifier).await?;
            println!("BGP identifier is {}", identifier);
        }
        Command::Run(_) => (), // Handled in main
    }
    Ok(())
}

/// mvpnd interactive commands (other than running the daemon)
pub async fn query_mvpnd(args: &Args) {
    if let Err(err) = run_cmd(args).await {
        eprintln!("{}", err.to_string().red());
    }
}
