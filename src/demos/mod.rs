// Demo routines, one module per feature area. Each `run` is a fixed script
// against the client that prints what it does; failures bubble up to the
// command loop.

pub mod cleanup;
pub mod collections;
pub mod databases;
pub mod documents;
pub mod indexing;
pub mod stored_procedures;
pub mod triggers;
pub mod udfs;
pub mod users_permissions;

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::api::{Collection, CosmosClient, CosmosResource, Database, Link, RequestOptions};
use crate::ui::{Menu, Section};

/// Database every demo works in.
pub const DATABASE_ID: &str = "mydb";
/// Document collection shared by the document and server-side demos.
pub const STORE_ID: &str = "mystore";
pub const STORE_PARTITION_KEY: &str = "/address/postalCode";
const STORE_THROUGHPUT: u32 = 400;

/// The full demo menu.
pub fn menu() -> Menu<CosmosClient> {
    Menu::new()
        .with_demo("DB", "Databases", Section::Sdk, databases::run)
        .with_demo("CO", "Collections", Section::Sdk, collections::run)
        .with_demo("DO", "Documents", Section::Sdk, documents::run)
        .with_demo("IX", "Indexing", Section::Sdk, indexing::run)
        .with_demo("UP", "Users & Permissions", Section::Sdk, users_permissions::run)
        .with_demo("SP", "Stored procedures", Section::ServerSide, stored_procedures::run)
        .with_demo("TR", "Triggers", Section::ServerSide, triggers::run)
        .with_demo("UF", "User defined functions", Section::ServerSide, udfs::run)
        .with_demo("C", "Cleanup", Section::Maintenance, cleanup::run)
}

pub(crate) fn database() -> Link {
    Link::database(DATABASE_ID)
}

pub(crate) fn store() -> Link {
    database().collection(STORE_ID)
}

/// Make sure `mydb` exists.
pub(crate) fn ensure_database(client: &CosmosClient, out: &mut dyn Write) -> Result<Database> {
    create_if_missing(client, out, &Link::root(), &Database::new(DATABASE_ID), &RequestOptions::default())
}

/// Make sure `mydb/mystore` exists, creating whatever is missing.
pub(crate) fn ensure_store(client: &CosmosClient, out: &mut dyn Write) -> Result<Collection> {
    ensure_database(client, out)?;
    create_if_missing(
        client,
        out,
        &database(),
        &Collection::new(STORE_ID, STORE_PARTITION_KEY),
        &RequestOptions::throughput(STORE_THROUGHPUT),
    )
}

fn create_if_missing<T: CosmosResource>(
    client: &CosmosClient,
    out: &mut dyn Write,
    parent: &Link,
    resource: &T,
    options: &RequestOptions,
) -> Result<T> {
    let link = parent.child(T::TYPE, resource.id());
    match client.read::<T>(&link, &RequestOptions::default()) {
        Ok(existing) => Ok(existing),
        Err(err) if err.is_not_found() => {
            writeln!(out, "Creating {link}")?;
            client
                .create(parent, resource, options)
                .with_context(|| format!("creating {link}"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Print the identifying properties of any resource, labels right-aligned.
pub(crate) fn view_resource<T: CosmosResource>(out: &mut dyn Write, kind: &str, resource: &T) -> Result<()> {
    let system = resource.system();
    let timestamp = system
        .modified()
        .map(|ts| ts.to_rfc2822())
        .unwrap_or_else(|| "-".to_string());
    writeln!(out, "{:>17}: {}", format!("{kind} ID"), resource.id())?;
    writeln!(out, "{:>17}: {}", "Resource ID", system.resource_id)?;
    writeln!(out, "{:>17}: {}", "Self Link", system.self_link)?;
    writeln!(out, "{:>17}: {}", "E-Tag", system.etag)?;
    writeln!(out, "{:>17}: {}", "Timestamp", timestamp)?;
    Ok(())
}

pub(crate) fn heading(out: &mut dyn Write, title: &str) -> Result<()> {
    writeln!(out)?;
    writeln!(out, ">>> {title} <<<")?;
    Ok(())
}

/// Partition key value of a document stored in `mystore`.
pub(crate) fn postal_code(doc: &Value) -> Value {
    doc.pointer("/address/postalCode").cloned().unwrap_or(Value::Null)
}

/// Customers used by the server-side demos.
pub(crate) fn sample_customers() -> Vec<Value> {
    vec![
        json!({
            "id": "CUST-101",
            "name": "Acme Rentals",
            "address": {
                "addressType": "Main Office",
                "addressLine1": "123 Main Street",
                "location": { "city": "Brooklyn", "stateProvinceName": "New York" },
                "postalCode": "11229",
                "countryRegionName": "United States"
            }
        }),
        json!({
            "id": "CUST-102",
            "name": "Contoso Bike Rental",
            "address": {
                "addressType": "Main Office",
                "addressLine1": "200 Front Street West",
                "location": { "city": "Toronto", "stateProvinceName": "Ontario" },
                "postalCode": "M5V 3K2",
                "countryRegionName": "Canada"
            }
        }),
        json!({
            "id": "CUST-103",
            "name": "Fabrikam Outfitters",
            "address": {
                "addressType": "Warehouse",
                "addressLine1": "10 Downing Street",
                "location": { "city": "London", "stateProvinceName": "Greater London" },
                "postalCode": "SW1A 2AA",
                "countryRegionName": "United Kingdom"
            }
        }),
    ]
}
