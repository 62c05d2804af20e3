//! devca command line: issue a leaf certificate, creating `<output>/ca.{crt,key}` on first use.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use time::OffsetDateTime;
use tracing::info;

use devca::key::DEFAULT_KEY_BITS;
use devca::storage::{self, FileStore};
use devca::workflow::{
    self, DEFAULT_CA_DAYS, DEFAULT_DAYS, IssueOptions, issue_with_store, parse_hosts,
    parse_not_before,
};

#[derive(Parser, Debug)]
#[command(name = "devca", version, about = "Issue development TLS certificates from a local CA")]
struct Args {
    /// Domains or IPs of the certificate, comma separated.
    #[arg(short = 'H', long, default_value = "")]
    hosts: String,

    /// Common name of the certificate (default: first host).
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Number of bits in the RSA keys to create.
    #[arg(short = 'b', long, default_value_t = DEFAULT_KEY_BITS)]
    bits: usize,

    /// Valid from, formatted as "YYYY-MM-DD HH:MM:SS" in UTC (default: now).
    #[arg(short = 's', long)]
    start: Option<String>,

    /// Valid days of the certificate.
    #[arg(short = 'd', long, default_value_t = DEFAULT_DAYS)]
    days: i64,

    /// Valid days of the CA, used only when the CA is created.
    #[arg(long, default_value_t = DEFAULT_CA_DAYS)]
    ca_days: i64,

    /// Folder for saving the certificates.
    #[arg(short = 'o', long, default_value = "cert")]
    output: PathBuf,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let hosts = parse_hosts(&args.hosts);
    if hosts.is_empty() {
        bail!("at least one host is required (--hosts example.com,127.0.0.1)");
    }

    let not_before = match args.start.as_deref().filter(|s| !s.is_empty()) {
        Some(start) => parse_not_before(start).context("Failed to parse valid from parameter")?,
        None => OffsetDateTime::now_utc(),
    };

    let options = IssueOptions::builder()
        .hosts(hosts)
        .maybe_common_name(args.name)
        .key_bits(args.bits)
        .not_before(not_before)
        .days(args.days)
        .ca_days(args.ca_days)
        .build();

    let store = FileStore::create(&args.output).context("Failed to create output folder")?;
    let issued = issue_with_store(&store, &options).context("Failed to issue the certificate")?;

    if issued.root.was_created() {
        let ca_base = store.base_path(workflow::CA_NAME)?;
        info!(path = %storage::certificate_path(&ca_base).display(), "wrote CA certificate");
    }

    let leaf_base = store.base_path(&issued.leaf_name)?;
    info!(
        cert = %storage::certificate_path(&leaf_base).display(),
        key = %storage::key_path(&leaf_base).display(),
        "wrote certificate"
    );

    Ok(())
}
