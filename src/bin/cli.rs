//! arclink CLI Client
//!
//! Command-line interface for talking to a hardware-control server.

use std::net::IpAddr;
use std::path::PathBuf;

use arclink::protocol::FormatSpec;
use arclink::{
    ClassToken, ClientConfig, Connection, Device, DiscoveryService, EolMode, LinkError, Method,
    Result,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// arclink CLI
#[derive(Parser, Debug)]
#[command(name = "arclink-cli")]
#[command(about = "CLI for arclink hardware-control servers")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = arclink::DEFAULT_PORT)]
    port: u16,

    /// Frame delimiting mode
    #[arg(short, long, value_enum, default_value_t = Framing::Line)]
    eol: Framing,

    /// Read timeout in milliseconds (0 = wait forever)
    #[arg(short, long, default_value = "30000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Framing {
    Line,
    Length,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List servers answering a discovery probe
    Discover {
        /// Listening window in milliseconds
        #[arg(short, long, default_value = "1000")]
        window_ms: u64,

        /// Probe target (repeatable); broadcast when omitted
        #[arg(long)]
        target: Vec<IpAddr>,
    },

    /// Invoke a remote method
    Call {
        /// Class token, e.g. Device
        class: String,

        /// Method token, e.g. ToString
        method: String,

        /// printf-style argument format; one %s per value when omitted
        #[arg(short, long)]
        format: Option<String>,

        /// Argument values
        values: Vec<String>,
    },

    /// Send raw text as a command
    Raw {
        /// Command text
        text: String,
    },

    /// Upload a file to the server
    SendFile {
        /// File to send
        path: PathBuf,
    },

    /// List the server's devices
    Devices,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,arclink=info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let eol_mode = match args.eol {
        Framing::Line => EolMode::Line,
        Framing::Length => EolMode::LengthPrefixed,
    };
    let config = ClientConfig::builder()
        .host(&args.host)
        .port(args.port)
        .eol_mode(eol_mode)
        .read_timeout_ms(args.timeout_ms)
        .build();

    match args.command {
        Commands::Discover { window_ms, target } => {
            let mut builder = ClientConfig::builder().discovery_window_ms(window_ms);
            if !target.is_empty() {
                builder = builder.discovery_targets(target);
            }
            let service = DiscoveryService::new(&builder.build())?;
            let mut found = 0;
            for server in service.detect_servers(args.port)? {
                found += 1;
                match server.metadata {
                    Some(meta) => println!("{}\t{}", server.addr, meta),
                    None => println!("{}", server.addr),
                }
            }
            if found == 0 {
                println!("No servers found");
            }
        }
        Commands::Call {
            class,
            method,
            format,
            values,
        } => {
            let class = ClassToken::from_token(&class)
                .ok_or_else(|| LinkError::Protocol(format!("Unknown class {:?}", class)))?;
            let method = Method::from_token(&method)
                .ok_or_else(|| LinkError::Protocol(format!("Unknown method {:?}", method)))?;
            let format = format.unwrap_or_else(|| vec!["%s"; values.len()].join(" "));
            let call_args = FormatSpec::parse(&format)?.coerce(&values)?;

            let mut conn = Connection::connect(config)?;
            let response = conn.call_method_response(class, method, &format, &call_args)?;
            let list = response.string_list();
            let payload = response.into_result()?;
            if list.len() > 1 {
                for item in list {
                    println!("{}", item);
                }
            } else {
                println!("{}", payload);
            }
            conn.close();
        }
        Commands::Raw { text } => {
            let mut conn = Connection::connect(config)?;
            println!("{}", conn.send_invalid_command(&text)?);
            conn.close();
        }
        Commands::SendFile { path } => {
            let mut conn = Connection::connect(config)?;
            let sent = conn.send_file(&path)?;
            println!("Sent {} bytes from {}", sent, path.display());
            conn.close();
        }
        Commands::Devices => {
            let mut conn = Connection::connect(config)?;
            for (index, name) in Device::new(&mut conn).device_list()?.iter().enumerate() {
                println!("{}: {}", index, name);
            }
            conn.close();
        }
    }

    Ok(())
}
