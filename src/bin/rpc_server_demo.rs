// SPDX-License-Identifier: BSD-3-Clause

//! Demonstration server: registers an "add2" procedure and serves it forever.
//!
//! This binary, and its client counterpart, are external collaborators around the RPC runtime,
//! not part of the core: they exist only to exercise `Server`/`Client` end to end from the
//! command line.

use clap::Parser;

use rpc_runtime::{PayloadRecord, Server};

#[derive(Parser)]
struct Cli {
    /// Port to listen on.
    #[arg(short = 'p', long, default_value_t = 8080)]
    port: u16,
}

fn main() {
    env_logger::init();

    let args = Cli::parse();

    let server = match Server::bind(args.port) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("failed to bind server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.register("add2", add2) {
        eprintln!("failed to register add2: {e}");
        std::process::exit(1);
    }

    log::info!("serving on port {}", args.port);
    server.serve();
}

/// `data1 + data2[0]`, matching the demonstration handler in the original source.
fn add2(payload: &PayloadRecord) -> Option<PayloadRecord> {
    let right_operand = *payload.data2.as_ref()?.first()?;
    Some(PayloadRecord::new(
        payload.data1 + i32::from(right_operand),
        None,
    ))
}
