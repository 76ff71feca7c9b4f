// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the `DNSRecord` CRD YAML from the Rust type in src/crd.rs, so the
//! manifest in deploy/crds/ always matches the code.
//!
//! Usage:
//!   cargo run --bin crdgen            # write deploy/crds/dnsrecords.crd.yaml
//!   cargo run --bin crdgen -- -       # print to stdout

use k8s_dns::crd::DNSRecord;
use kube::CustomResourceExt;
use serde_json::Value;
use std::fs;
use std::path::Path;

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let to_stdout = std::env::args().nth(1).as_deref() == Some("-");
    let content = render_crd::<DNSRecord>()?;

    if to_stdout {
        print!("{content}");
        return Ok(());
    }

    let output_dir = Path::new("deploy/crds");
    fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join("dnsrecords.crd.yaml");
    fs::write(&output_path, content)?;
    println!("✓ Generated {}", output_path.display());
    println!("\nDeploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

fn render_crd<T>() -> Result<String, Box<dyn std::error::Error>>
where
    T: CustomResourceExt,
{
    let mut crd_json: Value = serde_json::to_value(T::crd())?;

    // The only version is both served and stored.
    if let Some(versions) = crd_json["spec"]["versions"].as_array_mut() {
        for version in versions {
            version["served"] = Value::Bool(true);
            version["storage"] = Value::Bool(true);
        }
    }

    let yaml = serde_yaml::to_string(&crd_json)?;
    Ok(format!("{COPYRIGHT_HEADER}{yaml}"))
}
