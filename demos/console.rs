//! Console driver - interactive menu over a controller client.
//!
//! This example demonstrates:
//! - Opening a client on a named or auto-discovered serial port
//! - Sending commands from a line-based menu
//! - Refreshing and printing the cached button state
//!
//! # Running
//!
//! ```text
//! cargo run --example console -- --port /dev/ttyUSB0
//! cargo run --example console -- --list
//! RUST_LOG=buzzer_link=debug cargo run --example console
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use buzzer_link::transport::{available_ports, DEFAULT_BAUD_RATE};
use buzzer_link::ControllerClient;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Drive a four-button answer controller from the terminal")]
struct Args {
    /// Serial port (defaults to the first one found).
    #[arg(short, long)]
    port: Option<String>,

    /// Line speed.
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Read timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// List serial ports and exit.
    #[arg(long)]
    list: bool,
}

const MENU: &str = "\
1) enable buttons
2) reset buttons
3) disable buttons
4) set answered status
5) show state
q) quit";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.list {
        for port in available_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    let mut builder = ControllerClient::builder()
        .baud_rate(args.baud)
        .read_timeout(Duration::from_millis(args.timeout_ms));
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    let mut client = builder.open()?;

    println!("Connected to {}", client.port_name().unwrap_or("?"));
    println!("{}", MENU);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(choice) = prompt(&mut lines, "enter choice")? else {
            break;
        };

        let result = match choice.as_str() {
            "1" => client.send_enable(),
            "2" => client.send_reset(),
            "3" => client.send_disable(),
            "4" => {
                let Some(button) = prompt_u8(&mut lines, "button")? else {
                    continue;
                };
                let Some(status) = prompt_u8(&mut lines, "status")? else {
                    continue;
                };
                client.send_set_answered(button, status)
            }
            "5" => client.refresh_state().map(|_| print_state(&client)),
            "q" | "quit" => break,
            _ => {
                println!("{}", MENU);
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("error: {}", e);
        }
        if let Err(e) = client.check_link() {
            eprintln!("{}", e);
            break;
        }
    }

    client.shutdown();
    Ok(())
}

fn print_state(client: &ControllerClient) {
    if client.last_update().is_none() {
        println!("(no status received yet)");
    }
    for (i, button) in client.snapshot().iter().enumerate() {
        println!("button{} {}", i, button);
    }
}

fn prompt<B: BufRead>(lines: &mut io::Lines<B>, label: &str) -> io::Result<Option<String>> {
    print!("{}: ", label);
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

fn prompt_u8<B: BufRead>(lines: &mut io::Lines<B>, label: &str) -> io::Result<Option<u8>> {
    let Some(input) = prompt(lines, label)? else {
        return Ok(None);
    };
    match input.parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            eprintln!("not a number in 0..=255: {}", input);
            Ok(None)
        }
    }
}
