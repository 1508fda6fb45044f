// Documents demo: create documents three ways, query them (all at once and
// page by page), replace and delete them.

use std::io::Write;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ensure_store, heading, postal_code, store};
use crate::api::{CosmosClient, Query, RequestOptions, ResourceType};

const NAME_PREFIX: &str = "New Customer";
pub(crate) const DOCUMENT_IDS: [(&str, &str); 3] = [
    ("MY-NEW-CUSTOMER-1", "11229"),
    ("MY-NEW-CUSTOMER-2", "11229"),
    ("MY-NEW-CUSTOMER-3", "98052"),
];

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
    id: String,
    name: String,
    #[serde(default)]
    is_new: bool,
    address: Address,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Address {
    address_type: String,
    address_line1: String,
    location: Location,
    postal_code: String,
    country_region_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    city: String,
    state_province_name: String,
}

pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    ensure_store(client, out)?;

    create_documents(client, out)?;
    query_documents(client, out)?;
    query_with_paging(client, out)?;
    replace_documents(client, out)?;
    delete_documents(client, out)?;
    Ok(())
}

fn create_documents(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Create Documents")?;

    let (first, second, third) = (DOCUMENT_IDS[0], DOCUMENT_IDS[1], DOCUMENT_IDS[2]);

    let literal = json!({
        "id": first.0,
        "name": format!("{NAME_PREFIX} 1"),
        "isNew": true,
        "address": {
            "addressType": "Main Office",
            "addressLine1": "123 Main Street",
            "location": { "city": "Brooklyn", "stateProvinceName": "New York" },
            "postalCode": first.1,
            "countryRegionName": "United States"
        }
    });
    create_document(client, out, "JSON literal", &literal)?;

    let text = format!(
        r#"{{
            "id": "{}",
            "name": "{NAME_PREFIX} 2",
            "isNew": true,
            "address": {{
                "addressType": "Main Office",
                "addressLine1": "456 Ocean Parkway",
                "location": {{ "city": "Brooklyn", "stateProvinceName": "New York" }},
                "postalCode": "{}",
                "countryRegionName": "United States"
            }}
        }}"#,
        second.0, second.1
    );
    let parsed: Value = serde_json::from_str(&text).context("parsing document JSON")?;
    create_document(client, out, "JSON string", &parsed)?;

    let typed = Customer {
        id: third.0.to_string(),
        name: format!("{NAME_PREFIX} 3"),
        is_new: true,
        address: Address {
            address_type: "Main Office".to_string(),
            address_line1: "1 Microsoft Way".to_string(),
            location: Location {
                city: "Redmond".to_string(),
                state_province_name: "WA".to_string(),
            },
            postal_code: third.1.to_string(),
            country_region_name: "United States".to_string(),
        },
    };
    create_document(client, out, "typed struct", &serde_json::to_value(&typed)?)?;
    Ok(())
}

fn create_document(client: &CosmosClient, out: &mut dyn Write, source: &str, doc: &Value) -> Result<()> {
    let created = client
        .create(&store(), doc, &RequestOptions::partition_key(postal_code(doc)))
        .with_context(|| format!("creating document from {source}"))?;

    writeln!(out)?;
    writeln!(out, "Created new document from {source}")?;
    writeln!(out, "{}", serde_json::to_string_pretty(&created)?)?;
    Ok(())
}

fn customer_query() -> Query {
    Query::new("SELECT * FROM c WHERE STARTSWITH(c.name, @prefix)").with_parameter("@prefix", NAME_PREFIX)
}

fn query_documents(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Query Documents (SQL)")?;

    let customers: Vec<Customer> = client
        .query_all(&store(), ResourceType::Documents, &customer_query(), &RequestOptions::cross_partition())
        .context("querying documents")?;

    writeln!(out, "Found {} new documents", customers.len())?;
    for customer in &customers {
        writeln!(
            out,
            " Id: {}; Name: {}; City: {}",
            customer.id, customer.name, customer.address.location.city
        )?;
    }
    Ok(())
}

fn query_with_paging(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Query Documents (paged results)")?;

    let mut options = RequestOptions {
        max_item_count: Some(1),
        ..RequestOptions::cross_partition()
    };
    let mut page_number = 0;
    loop {
        let page = client
            .query::<Value>(&store(), ResourceType::Documents, &customer_query(), &options)
            .context("querying documents page")?;
        page_number += 1;

        writeln!(
            out,
            " Page {page_number}: {} document(s), {:.2} RUs",
            page.items.len(),
            page.request_charge
        )?;
        for doc in &page.items {
            writeln!(out, "   Id: {}", doc["id"].as_str().unwrap_or_default())?;
        }

        match page.continuation {
            Some(token) => options.continuation = Some(token),
            None => break,
        }
    }
    Ok(())
}

fn replace_documents(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Replace Documents")?;

    let query = Query::new("SELECT * FROM c WHERE c.isNew = true");
    let docs: Vec<Value> = client
        .query_all(&store(), ResourceType::Documents, &query, &RequestOptions::cross_partition())
        .context("querying documents to replace")?;

    writeln!(out, "Documents with 'isNew' flag: {}", docs.len())?;
    for mut doc in docs {
        let id = doc["id"].as_str().unwrap_or_default().to_string();
        doc["isNew"] = Value::Bool(false);
        client
            .replace(
                &store().document(&id),
                &doc,
                &RequestOptions::partition_key(postal_code(&doc)),
            )
            .with_context(|| format!("replacing document {id}"))?;
        writeln!(out, " Updated document {id}: isNew = false")?;
    }
    Ok(())
}

fn delete_documents(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Delete Documents")?;

    let query = Query::new("SELECT c.id, c.address.postalCode FROM c WHERE STARTSWITH(c.name, @prefix)")
        .with_parameter("@prefix", NAME_PREFIX);
    let docs: Vec<Value> = client
        .query_all(&store(), ResourceType::Documents, &query, &RequestOptions::cross_partition())
        .context("querying documents to delete")?;

    writeln!(out, "Found {} documents to be deleted", docs.len())?;
    for doc in &docs {
        let id = doc["id"].as_str().unwrap_or_default();
        let key = doc.get("postalCode").cloned().unwrap_or(Value::Null);
        client
            .delete(&store().document(id), &RequestOptions::partition_key(key))
            .with_context(|| format!("deleting document {id}"))?;
    }
    writeln!(out, "Deleted {} new customer documents", docs.len())?;
    Ok(())
}
