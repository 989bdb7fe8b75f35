//! Batch example: collect command output from a list of devices
//!
//! Connects to every device concurrently with one shared set of
//! credentials, runs the given commands and writes each device's output
//! to `<output-dir>/<hostname>.txt`. A device that cannot be reached or
//! rejects the login is reported and skipped; the others continue.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example collect_configs -- \
//!     --devices devices.txt --user admin --password secret \
//!     --enable-secret enable --output configs \
//!     --command "show running-config" --command "show version"
//! ```
//!
//! `devices.txt` holds one host per line; blank lines and `#` comments are
//! ignored.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cliwire::{CommandOutput, SessionBuilder, SessionError};
use futures_util::future::join_all;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let devices = read_devices(&args.devices).await?;
    tokio::fs::create_dir_all(&args.output).await?;

    println!("Collecting from {} devices...", devices.len());

    let jobs = devices.iter().map(|host| collect(host, &args));
    let results = join_all(jobs).await;

    let mut failed = 0;
    for (host, result) in devices.iter().zip(results) {
        match result {
            Ok(Report { path, partial }) if partial => {
                println!("  {:<20} partial  {}", host, path.display());
            }
            Ok(Report { path, .. }) => println!("  {:<20} ok       {}", host, path.display()),
            Err(e) => {
                failed += 1;
                println!("  {:<20} failed   {}", host, e);
            }
        }
    }

    println!("{} of {} devices collected", devices.len() - failed, devices.len());
    Ok(())
}

struct Report {
    path: PathBuf,
    partial: bool,
}

async fn collect(host: &str, args: &Args) -> Result<Report, Box<dyn std::error::Error>> {
    let mut builder = SessionBuilder::new(host)
        .username(&args.user)
        .password(&args.password)
        .profile(&args.profile)
        .timeout(Duration::from_secs(args.timeout));
    if let Some(secret) = &args.enable_secret {
        builder = builder.enable_secret(secret);
    }

    let mut session = builder.build()?;
    session.connect().await?;
    if !session.is_connected() {
        session.disconnect().await;
        return Err("session dropped after connect".into());
    }

    let mut body = String::new();
    let mut partial = false;
    for command in &args.commands {
        match session.execute(command).await {
            Ok(output) => append(&mut body, &output),
            // Keep what a slow device managed to send
            Err(e @ SessionError::PromptTimeout { .. }) => {
                partial = true;
                body.push_str(&format!("!! {}: {}\n", command, e));
                body.push_str(e.partial_output().unwrap_or_default());
                body.push('\n');
            }
            Err(e) => {
                session.disconnect().await;
                return Err(e.into());
            }
        }
    }

    let name = session.hostname().unwrap_or_else(|| host.to_string());
    session.disconnect().await;

    let path = args.output.join(format!("{}.txt", name));
    tokio::fs::write(&path, body).await?;
    Ok(Report { path, partial })
}

fn append(body: &mut String, output: &CommandOutput) {
    body.push_str(&format!("!! {} ({:?})\n", output.command, output.elapsed));
    body.push_str(&output.normalized());
    body.push('\n');
}

async fn read_devices(path: &Path) -> std::io::Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

struct Args {
    devices: PathBuf,
    user: String,
    password: String,
    enable_secret: Option<String>,
    profile: String,
    output: PathBuf,
    commands: Vec<String>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut devices = PathBuf::from("devices.txt");
        let mut user = env::var("USER").unwrap_or_else(|_| "admin".to_string());
        let mut password = String::new();
        let mut enable_secret = None;
        let mut profile = "cisco_ios".to_string();
        let mut output = PathBuf::from("configs");
        let mut commands = Vec::new();
        let mut timeout = 10u64;

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match (args[i].as_str(), value) {
                ("--devices" | "-d", Some(v)) => devices = PathBuf::from(v),
                ("--user" | "-u", Some(v)) => user = v,
                ("--password" | "-P", Some(v)) => password = v,
                ("--enable-secret" | "-e", Some(v)) => enable_secret = Some(v),
                ("--profile", Some(v)) => profile = v,
                ("--output" | "-o", Some(v)) => output = PathBuf::from(v),
                ("--command" | "-c", Some(v)) => commands.push(v),
                ("--timeout" | "-t", Some(v)) => timeout = v.parse().unwrap_or(10),
                ("--help", _) => {
                    println!("Usage: collect_configs [OPTIONS]");
                    println!();
                    println!("Options:");
                    println!("  -d, --devices <FILE>         Device list (default: devices.txt)");
                    println!("  -u, --user <USER>            Username (default: $USER)");
                    println!("  -P, --password <PASS>        Password");
                    println!("  -e, --enable-secret <PASS>   Escalation secret (default: password)");
                    println!("      --profile <NAME>         Device profile (default: cisco_ios)");
                    println!("  -o, --output <DIR>           Output directory (default: configs)");
                    println!("  -c, --command <CMD>          Command to run (repeatable)");
                    println!("  -t, --timeout <SECS>         Connect timeout (default: 10)");
                    std::process::exit(0);
                }
                _ => {
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        if commands.is_empty() {
            commands.push("show running-config".to_string());
        }

        Self {
            devices,
            user,
            password,
            enable_secret,
            profile,
            output,
            commands,
            timeout,
        }
    }
}
