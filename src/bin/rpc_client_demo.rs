// SPDX-License-Identifier: BSD-3-Clause

//! Demonstration client: finds "add2" on the server and calls it twice, matching the original
//! source's `rpc-client.c`.

use clap::Parser;

use rpc_runtime::{Client, PayloadRecord};

#[derive(Parser)]
struct Cli {
    /// Address of the server.
    #[arg(short = 'i', long, default_value = "::1")]
    addr: String,

    /// Port to connect to.
    #[arg(short = 'p', long, default_value_t = 8080)]
    port: u16,
}

fn main() {
    env_logger::init();

    let args = Cli::parse();

    let mut client = match Client::connect(&args.addr, args.port) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to connect: {e}");
            std::process::exit(1);
        }
    };

    let Some(handle) = client.find("add2") else {
        eprintln!("ERROR: function add2 does not exist");
        std::process::exit(1);
    };

    for left_operand in 0i32..2 {
        let right_operand: u8 = 100;
        let request = PayloadRecord::new(left_operand, Some(vec![right_operand]));

        let Some(response) = client.call(&handle, &request) else {
            eprintln!("function call of add2 failed");
            std::process::exit(1);
        };

        assert_eq!(response.data2_len, 0);
        assert!(response.data2.is_none());
        println!(
            "Result of adding {left_operand} and {right_operand}: {}",
            response.data1
        );
    }

    client.close();
}
