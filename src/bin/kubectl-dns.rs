// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `kubectl dns` plugin
//!
//! Converts presentation-format records and zone files into `DNSRecord` manifests,
//! lists records and toggles their activation.
//!
//! Usage:
//!   kubectl dns create 'api.example.com. 300 IN A 10.0.0.1' | kubectl apply -f -
//!   kubectl dns import example.com.zone > records.yaml
//!   kubectl dns list -n prod
//!   kubectl dns deactivate api-example-com

use anyhow::{bail, Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use k8s_dns::cli::{activation_patch, create_yaml, find_record, import_yaml, list_table};
use k8s_dns::crd::DNSRecord;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use std::io::Read;
use std::path::PathBuf;

/// Manage DNSRecord resources
#[derive(Parser, Debug)]
#[command(name = "kubectl-dns", version, about)]
struct Cli {
    /// Namespace of the records
    #[arg(short, long, global = true, default_value = "default")]
    namespace: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the DNSRecord for a presentation-format record
    #[command(visible_aliases = ["new", "add"])]
    Create {
        /// e.g. 'api.example.com. 300 IN A 10.0.0.1'
        #[arg(required = true, num_args = 1..)]
        record: Vec<String>,
    },
    /// Print a DNSRecordList for a zone file, `-` reads stdin
    #[command(visible_alias = "convert")]
    Import { file: PathBuf },
    /// List records
    #[command(visible_aliases = ["ls", "l"])]
    List {
        /// Only print names
        #[arg(short, long)]
        quiet: bool,
    },
    /// Publish a record, given its name or its presentation form
    Activate {
        #[arg(required = true, num_args = 1..)]
        target: Vec<String>,
    },
    /// Withdraw a record, given its name or its presentation form
    Deactivate {
        #[arg(required = true, num_args = 1..)]
        target: Vec<String>,
    },
    /// Print shell completions
    Completion { shell: Shell },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Create { record } => {
            print!("{}", create_yaml(&record.join(" "))?);
        }
        Command::Import { file } => {
            let zone = read_input(&file)?;
            print!("{}", import_yaml(&zone)?);
        }
        Command::List { quiet } => {
            let api = records_api(&cli.namespace).await?;
            let records = api.list(&ListParams::default()).await?.items;
            print!("{}", list_table(&records, quiet));
        }
        Command::Activate { target } => set_active(&cli.namespace, &target.join(" "), true).await?,
        Command::Deactivate { target } => set_active(&cli.namespace, &target.join(" "), false).await?,
        Command::Completion { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "kubectl-dns", &mut std::io::stdout());
        }
    }
    Ok(())
}

fn read_input(file: &PathBuf) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut zone = String::new();
        std::io::stdin().read_to_string(&mut zone)?;
        return Ok(zone);
    }
    if file.is_dir() {
        bail!("input: expected a file, not a directory");
    }
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

async fn records_api(namespace: &str) -> Result<Api<DNSRecord>> {
    let client = Client::try_default()
        .await
        .context("loading kubeconfig")?;
    Ok(Api::namespaced(client, namespace))
}

async fn set_active(namespace: &str, target: &str, active: bool) -> Result<()> {
    let api = records_api(namespace).await?;
    let records = api.list(&ListParams::default()).await?.items;
    let Some(record) = find_record(&records, target)? else {
        bail!("no DNSRecord matches '{target}' in namespace {namespace}");
    };
    let name = record.name_any();
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&activation_patch(active)))
        .await
        .with_context(|| format!("updating DNSRecord {namespace}/{name}"))?;
    println!(
        "dnsrecord/{name} {}",
        if active { "activated" } else { "deactivated" }
    );
    Ok(())
}
