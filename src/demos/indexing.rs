// Indexing demo: a collection with an excluded path, queries on included
// and excluded paths, then a composite index for ORDER BY.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use super::{database, ensure_database, heading, view_resource, DATABASE_ID};
use crate::api::{
    Collection, CompositePath, CosmosClient, IndexPath, IndexingPolicy, Link, Query, RequestOptions, ResourceType,
};

pub(crate) const INDEX_COLLECTION_ID: &str = "IndexDemo";
const PARTITION_KEY: &str = "/category";

pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    ensure_database(client, out)?;

    create_with_excluded_path(client, out)?;
    add_documents(client, out)?;
    query_included_path(client, out)?;
    query_excluded_path(client, out)?;
    use_composite_index(client, out)?;

    delete_collection(client, out)?;
    Ok(())
}

fn collection() -> Link {
    database().collection(INDEX_COLLECTION_ID)
}

fn create_with_excluded_path(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, &format!("Create Collection {INDEX_COLLECTION_ID} with excluded path"))?;

    let mut policy = IndexingPolicy::default();
    policy.excluded_paths.push(IndexPath::new("/miscellaneous/*"));

    let definition = Collection::new(INDEX_COLLECTION_ID, PARTITION_KEY).with_indexing_policy(policy);
    let created = client
        .create(&database(), &definition, &RequestOptions::throughput(400))
        .with_context(|| format!("creating collection {INDEX_COLLECTION_ID}"))?;

    view_resource(out, "Collection", &created)?;
    writeln!(out, " Indexing policy:")?;
    writeln!(out, "{}", serde_json::to_string_pretty(&created.indexing_policy)?)?;
    Ok(())
}

fn add_documents(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Add Documents")?;

    let docs = [
        json!({ "id": "DOC-1", "category": "books", "title": "Dune", "miscellaneous": { "shelf": 4 } }),
        json!({ "id": "DOC-2", "category": "books", "title": "Emma", "miscellaneous": { "shelf": 2 } }),
        json!({ "id": "DOC-3", "category": "music", "title": "Blue", "miscellaneous": { "shelf": 9 } }),
    ];
    for doc in &docs {
        let options = RequestOptions::partition_key(doc["category"].clone());
        client
            .create(&collection(), doc, &options)
            .with_context(|| format!("creating document {}", doc["id"]))?;
        writeln!(out, " Created document {}", doc["id"])?;
    }
    Ok(())
}

fn query_included_path(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Query on an included path")?;

    let query = Query::new("SELECT c.id, c.title FROM c WHERE c.title = @title").with_parameter("@title", "Dune");
    let page = client
        .query::<Value>(&collection(), ResourceType::Documents, &query, &RequestOptions::cross_partition())
        .context("querying on an included path")?;

    writeln!(out, " Results: {}", Value::Array(page.items))?;
    writeln!(out, " Request charge: {:.2} RUs", page.request_charge)?;
    Ok(())
}

// Either a scan (visible in the charge) or a rejection, depending on the
// account.
fn query_excluded_path(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Query on an excluded path")?;

    let query = Query::new("SELECT c.id, c.title FROM c WHERE c.miscellaneous.shelf = 4");
    match client.query::<Value>(&collection(), ResourceType::Documents, &query, &RequestOptions::cross_partition()) {
        Ok(page) => {
            writeln!(out, " Results: {}", Value::Array(page.items))?;
            writeln!(out, " Request charge: {:.2} RUs", page.request_charge)?;
        }
        Err(err) => writeln!(out, " Query rejected: {err}")?,
    }
    Ok(())
}

fn use_composite_index(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Replace indexing policy with a composite index")?;

    let mut current: Collection = client
        .read(&collection(), &RequestOptions::default())
        .with_context(|| format!("reading collection {INDEX_COLLECTION_ID}"))?;
    let mut policy = current.indexing_policy.take().unwrap_or_default();
    policy.composite_indexes = vec![vec![
        CompositePath::ascending("/category"),
        CompositePath::descending("/title"),
    ]];
    current.indexing_policy = Some(policy);

    let replaced = client
        .replace(&collection(), &current, &RequestOptions::default())
        .with_context(|| format!("replacing collection {INDEX_COLLECTION_ID}"))?;
    writeln!(out, "{}", serde_json::to_string_pretty(&replaced.indexing_policy)?)?;

    let query = Query::new("SELECT c.id, c.category, c.title FROM c ORDER BY c.category ASC, c.title DESC");
    let page = client
        .query::<Value>(&collection(), ResourceType::Documents, &query, &RequestOptions::partition_key("books"))
        .context("querying with composite ORDER BY")?;
    writeln!(out, " Ordered results: {}", Value::Array(page.items))?;
    Ok(())
}

fn delete_collection(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, &format!("Delete Collection {INDEX_COLLECTION_ID}"))?;

    client
        .delete(&collection(), &RequestOptions::default())
        .with_context(|| format!("deleting collection {INDEX_COLLECTION_ID}"))?;
    writeln!(out, "Deleted collection {INDEX_COLLECTION_ID} from database {DATABASE_ID}")?;
    Ok(())
}
