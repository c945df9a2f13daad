#![deny(clippy::all)]

use std::io::Read;

use log::*;

use veles::config::{load_config, Config};
use veles::dispatch::{DecodeError, Direction, Dispatcher};
use veles::metrics::METRICS;
use veles::session::CallContextStore;

fn setup_logger() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", concat!(env!("CARGO_PKG_NAME"), "=info"));
    }
    env_logger::init();
}

fn print_help() {
    println!("veles v{}", env!("CARGO_PKG_VERSION"));
    println!("Decoder for account-management RPC payloads\n");
    println!("USAGE:");
    println!("    veles [OPTIONS] --opcode N [PAYLOAD_FILE]\n");
    println!("OPTIONS:");
    println!("    -h, --help        Show this help message");
    println!("    --dir DIR         Payload direction: request or reply (default: request)");
    println!("    --opcode N        Operation number of the payload (required)");
    println!("    --call-id N       Request/reply pairing token (default: 0)");
    println!("    --config FILE     Path to configuration file");
    println!("    --secret PW       Expected account password for credential blocks\n");
    println!("ARGUMENTS:");
    println!("    [PAYLOAD_FILE]    Hex dump of the payload (default: read from stdin)\n");
    println!("CONFIGURATION:");
    println!("The configuration file uses a simple key=value format with sections.\n");
    println!("[limits] - Decode caps for variable-length wire fields");
    println!("  max_string_bytes = 65536    # Max byte count of a counted string");
    println!("  max_array_items = 4096      # Max element count of a counted array");
    println!("  max_rid_count = 4096        # Max entries in a rid/name translation");
    println!("  max_logon_hours_bytes = 1260 # Max logon-hours bitmap length");
    println!("  max_sid_subauths = 15       # Max sub-authorities in a SID\n");
    println!("[secret] - Credential-block decryption");
    println!("  account_password = \"\"       # Expected password; empty disables verification\n");
    println!("EXAMPLES:");
    println!("    veles --opcode 34 request.hex");
    println!("    veles --dir reply --opcode 34 --call-id 7 reply.hex");
    println!("    xxd -p capture.bin | veles --opcode 64");
}

struct Args {
    direction: Direction,
    opcode: u16,
    call_id: u64,
    config_path: Option<String>,
    secret: Option<String>,
    payload_path: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut direction = Direction::Request;
    let mut opcode: Option<u16> = None;
    let mut call_id = 0u64;
    let mut config_path = None;
    let mut secret = None;
    let mut payload_path = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--dir" => {
                let v = args.next().ok_or("--dir requires a value")?;
                direction = match v.as_str() {
                    "request" => Direction::Request,
                    "reply" => Direction::Reply,
                    other => return Err(format!("unknown direction '{}'", other)),
                };
            }
            "--opcode" => {
                let v = args.next().ok_or("--opcode requires a value")?;
                opcode = Some(
                    v.parse()
                        .map_err(|_| format!("invalid opcode '{}'", v))?,
                );
            }
            "--call-id" => {
                let v = args.next().ok_or("--call-id requires a value")?;
                call_id = v
                    .parse()
                    .map_err(|_| format!("invalid call id '{}'", v))?;
            }
            "--config" => {
                config_path = Some(args.next().ok_or("--config requires a value")?);
            }
            "--secret" => {
                secret = Some(args.next().ok_or("--secret requires a value")?);
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{}'", other));
            }
            other => {
                if payload_path.is_some() {
                    return Err("multiple payload files given".into());
                }
                payload_path = Some(other.to_string());
            }
        }
    }

    Ok(Args {
        direction,
        opcode: opcode.ok_or("--opcode is required")?,
        call_id,
        config_path,
        secret,
        payload_path,
    })
}

fn read_hex_payload(path: Option<&str>) -> Result<Vec<u8>, String> {
    let text = match path {
        Some(p) if p != "-" => {
            std::fs::read_to_string(p).map_err(|e| format!("failed to read {}: {}", p, e))?
        }
        _ => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .map_err(|e| format!("failed to read stdin: {}", e))?;
            s
        }
    };
    let digits: Vec<u8> = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            c.to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| format!("invalid hex digit '{}'", c))
        })
        .collect::<Result<_, _>>()?;
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".into());
    }
    Ok(digits.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect())
}

fn main() {
    setup_logger();

    let args = parse_args().unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        eprintln!("run with --help for usage");
        std::process::exit(2);
    });

    let mut config = match &args.config_path {
        Some(path) => load_config(path).unwrap_or_else(|e| {
            eprintln!("failed to read config {}: {}", path, e);
            std::process::exit(1);
        }),
        None => Config::default(),
    };
    if args.secret.is_some() {
        config.secret.account_password = args.secret.clone();
    }

    let payload = read_hex_payload(args.payload_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(1);
    });

    let dispatcher = Dispatcher::new(config);
    let mut store = CallContextStore::default();
    match dispatcher.decode(args.direction, args.opcode, args.call_id, &payload, &mut store) {
        Ok(msg) => {
            println!("{} {}", msg.name, msg.direction);
            print!("{}", msg.fields.render());
        }
        Err(DecodeError::UnsupportedOperation(op)) => {
            eprintln!("no decoder registered for opcode {}", op);
            std::process::exit(1);
        }
        Err(err @ DecodeError::Truncated { .. }) | Err(err @ DecodeError::Malformed { .. }) => {
            let partial = match &err {
                DecodeError::Truncated { partial } => partial,
                DecodeError::Malformed { partial, .. } => partial,
                DecodeError::UnsupportedOperation(_) => unreachable!(),
            };
            println!("{} {} (incomplete)", partial.name, partial.direction);
            print!("{}", partial.fields.render());
            eprintln!("error: {}", err);
            debug!("metrics:\n{}", METRICS.snapshot());
            std::process::exit(1);
        }
    }
    debug!("metrics:\n{}", METRICS.snapshot());
}
