// Stored procedure demo: register the scripts under `scripts/`, execute them
// within a partition and delete them.
//
// The bulk procedures stop early when they run out of time, so both are
// called in a loop until the work is done.

use std::io::Write;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ensure_store, heading, postal_code, store, view_resource};
use crate::api::{CosmosClient, RequestOptions, StoredProcedure};

pub(crate) const STORED_PROCEDURES: [(&str, &str); 4] = [
    ("spHelloWorld", include_str!("../../scripts/spHelloWorld.js")),
    ("spSetNorthAmerica", include_str!("../../scripts/spSetNorthAmerica.js")),
    ("spBulkInsert", include_str!("../../scripts/spBulkInsert.js")),
    ("spBulkDelete", include_str!("../../scripts/spBulkDelete.js")),
];

/// Document written by `spSetNorthAmerica`, with its partition key.
pub(crate) const NORTH_AMERICA_DOCUMENT: (&str, &str) = ("SP-NORTH-AMERICA", "11229");
/// Partition the bulk procedures work in.
pub(crate) const BULK_POSTAL_CODE: &str = "12345";
const BULK_COUNT: usize = 10;

#[derive(Debug, Deserialize)]
struct BulkDeleteResult {
    deleted: u64,
    continuation: bool,
}

pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    ensure_store(client, out)?;

    create_stored_procedures(client, out)?;
    view_stored_procedures(client, out)?;

    execute_hello_world(client, out)?;
    execute_set_north_america(client, out)?;
    execute_bulk_insert(client, out)?;
    execute_bulk_delete(client, out)?;

    delete_stored_procedures(client, out)?;
    Ok(())
}

fn create_stored_procedures(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Create Stored Procedures")?;

    for (id, body) in STORED_PROCEDURES {
        let sproc = client
            .create(&store(), &StoredProcedure::new(id, body), &RequestOptions::default())
            .with_context(|| format!("creating stored procedure {id}"))?;
        writeln!(out, " Created stored procedure {} ({})", sproc.id, sproc.system.resource_id)?;
    }
    Ok(())
}

fn view_stored_procedures(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "View Stored Procedures")?;

    let sprocs = client
        .list::<StoredProcedure>(&store())
        .context("listing stored procedures")?;
    for sproc in &sprocs {
        writeln!(out)?;
        view_resource(out, "Sproc", sproc)?;
    }
    writeln!(out)?;
    writeln!(out, "Total stored procedures: {}", sprocs.len())?;
    Ok(())
}

fn execute(client: &CosmosClient, id: &str, parameters: &[Value], partition_key: Value) -> Result<Value> {
    client
        .execute_stored_procedure(
            &store().stored_procedure(id),
            parameters,
            &RequestOptions::partition_key(partition_key),
        )
        .with_context(|| format!("executing stored procedure {id}"))
}

fn execute_hello_world(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Execute spHelloWorld")?;

    let result = execute(client, "spHelloWorld", &[], json!(""))?;
    writeln!(out, " Result: {}", result.as_str().unwrap_or_default())?;
    Ok(())
}

fn execute_set_north_america(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Execute spSetNorthAmerica")?;

    let (doc_id, key) = NORTH_AMERICA_DOCUMENT;
    let doc = json!({
        "id": doc_id,
        "name": "John Doe",
        "address": {
            "addressType": "Home",
            "addressLine1": "123 Main Street",
            "location": { "city": "Brooklyn", "stateProvinceName": "New York" },
            "postalCode": key,
            "countryRegionName": "United States"
        }
    });
    let created = execute(client, "spSetNorthAmerica", &[doc.clone(), json!(true)], postal_code(&doc))?;

    writeln!(
        out,
        " Result: id = {}, country = {}, isNorthAmerica = {}",
        created["id"],
        created["address"]["countryRegionName"],
        created["address"]["isNorthAmerica"]
    )?;

    client
        .delete(&store().document(doc_id), &RequestOptions::partition_key(key))
        .with_context(|| format!("deleting document {doc_id}"))?;
    writeln!(out, " Deleted document {doc_id}")?;
    Ok(())
}

fn execute_bulk_insert(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Execute spBulkInsert")?;

    let docs: Vec<Value> = (1..=BULK_COUNT)
        .map(|i| {
            json!({
                "id": format!("BULK-{i:03}"),
                "name": format!("Bulk inserted doc {i}"),
                "address": { "postalCode": BULK_POSTAL_CODE }
            })
        })
        .collect();

    // The procedure returns how many documents it got through before running
    // out of time; resume from there.
    let mut inserted = 0;
    while inserted < docs.len() {
        let remaining = Value::Array(docs[inserted..].to_vec());
        let count = execute(client, "spBulkInsert", &[remaining], json!(BULK_POSTAL_CODE))?
            .as_u64()
            .unwrap_or_default() as usize;
        if count == 0 {
            bail!("spBulkInsert stopped after inserting {inserted} of {} documents", docs.len());
        }
        inserted += count.min(docs.len() - inserted);
    }
    writeln!(out, " Created {inserted} documents")?;
    Ok(())
}

fn execute_bulk_delete(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Execute spBulkDelete")?;

    let query = json!("SELECT c._self FROM c WHERE STARTSWITH(c.id, 'BULK-') = true");
    let mut total = 0;
    loop {
        let result: BulkDeleteResult = serde_json::from_value(execute(
            client,
            "spBulkDelete",
            &[query.clone()],
            json!(BULK_POSTAL_CODE),
        )?)
        .context("decoding spBulkDelete result")?;
        total += result.deleted;
        // The procedure stops early when it runs out of time.
        if !result.continuation || result.deleted == 0 {
            break;
        }
    }
    writeln!(out, " Deleted {total} documents")?;
    Ok(())
}

fn delete_stored_procedures(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Delete Stored Procedures")?;

    for (id, _) in STORED_PROCEDURES {
        client
            .delete(&store().stored_procedure(id), &RequestOptions::default())
            .with_context(|| format!("deleting stored procedure {id}"))?;
        writeln!(out, " Deleted stored procedure {id}")?;
    }
    Ok(())
}
