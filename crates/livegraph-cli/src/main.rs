//! LiveGraph CLI - The `livegraph` command.
//!
//! # Architecture
//!
//! The CLI binary wires together the modular crates:
//!
//! - **livegraph-core**: Action protocol and correlation client
//! - **livegraph-bridge**: Host-side object accessor and bridge loop
//! - **livegraph-graph**: Typed query/mutation resolvers
//! - **livegraph-http**: REST exposure of the graph surface
//!
//! `serve` connects to a running host bridge and exposes the graph over
//! HTTP; `sim` runs the in-memory host bridge for development without a
//! live host attached.

mod transport;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use livegraph_bridge::{server, Bridge, MemoryModel};
use livegraph_graph::GraphClient;

/// LiveGraph - Graph query/mutation surface over a live music host
#[derive(Parser, Debug)]
#[command(name = "livegraph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query and mutate a live music host as a typed graph", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a host bridge and serve the graph API over HTTP
    Serve {
        /// Address of the host bridge in "host:port" format
        #[arg(long, default_value = "127.0.0.1:1605")]
        bridge: String,

        /// Port for the HTTP API
        #[arg(long, default_value_t = 1606)]
        port: u16,
    },

    /// Run an in-memory host bridge with a demo song
    Sim {
        /// Address to listen on in "host:port" format
        #[arg(long, default_value = "127.0.0.1:1605")]
        listen: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Serve { bridge, port } => serve(&bridge, port).await,
        Commands::Sim { listen } => sim(&listen).await,
        Commands::Version => {
            println!("livegraph {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(bridge: &str, port: u16) -> Result<()> {
    log::info!("connecting to host bridge at {}", bridge);
    let client = transport::connect(bridge).await?;
    let graph = GraphClient::new(client);
    livegraph_http::start_server(graph, port).await
}

async fn sim(listen: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding {}", listen))?;
    log::info!("simulated host bridge listening on {}", listen);
    server::serve(Bridge::new(MemoryModel::demo_song()), listener).await
}
