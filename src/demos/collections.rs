// Collections demo: list, create and delete collections in `mydb`.

use std::io::Write;

use anyhow::{Context, Result};

use super::{database, ensure_database, heading, view_resource, DATABASE_ID};
use crate::api::{Collection, CosmosClient, RequestOptions};

pub(crate) const COLLECTION_IDS: [&str; 2] = ["MyCollection1", "MyCollection2"];

/// Provisioned throughput used when none is given.
pub const DEFAULT_THROUGHPUT: u32 = 1000;
pub const DEFAULT_PARTITION_KEY: &str = "/partitionKey";

pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    ensure_database(client, out)?;
    view_collections(client, out)?;

    create_collection(client, out, COLLECTION_IDS[0], DEFAULT_THROUGHPUT, DEFAULT_PARTITION_KEY)?;
    create_collection(client, out, COLLECTION_IDS[1], 25000, DEFAULT_PARTITION_KEY)?;
    view_collections(client, out)?;

    delete_collection(client, out, COLLECTION_IDS[0])?;
    delete_collection(client, out, COLLECTION_IDS[1])?;
    Ok(())
}

fn view_collections(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, &format!("View Collections in {DATABASE_ID}"))?;

    let collections = client
        .list::<Collection>(&database())
        .with_context(|| format!("listing collections in {DATABASE_ID}"))?;

    for (i, collection) in collections.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, " Collection #{}", i + 1)?;
        view_resource(out, "Collection", collection)?;
    }

    writeln!(out)?;
    writeln!(out, "Total collections in {DATABASE_ID} database: {}", collections.len())?;
    Ok(())
}

fn create_collection(
    client: &CosmosClient,
    out: &mut dyn Write,
    collection_id: &str,
    reserved_rus: u32,
    partition_key: &str,
) -> Result<()> {
    heading(out, &format!("Create Collection {collection_id} in {DATABASE_ID}"))?;
    writeln!(out)?;
    writeln!(out, " Throughput: {reserved_rus} RU/sec")?;
    writeln!(out, " Partition key: {partition_key}")?;
    writeln!(out)?;

    let definition = Collection::new(collection_id, partition_key);
    let collection = client
        .create(&database(), &definition, &RequestOptions::throughput(reserved_rus))
        .with_context(|| format!("creating collection {collection_id}"))?;

    writeln!(out, "Created new collection")?;
    view_resource(out, "Collection", &collection)?;
    Ok(())
}

fn delete_collection(client: &CosmosClient, out: &mut dyn Write, collection_id: &str) -> Result<()> {
    heading(out, &format!("Delete Collection {collection_id} in {DATABASE_ID}"))?;

    client
        .delete(&database().collection(collection_id), &RequestOptions::default())
        .with_context(|| format!("deleting collection {collection_id}"))?;

    writeln!(out, "Deleted collection {collection_id} from database {DATABASE_ID}")?;
    Ok(())
}
