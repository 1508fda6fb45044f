// Cleanup demo: removes what the other demos may have left behind.
// Resources that are already gone are skipped.

use std::io::Write;

use anyhow::{Context, Result};

use super::collections::COLLECTION_IDS;
use super::databases::NEW_DATABASE_ID;
use super::documents::DOCUMENT_IDS;
use super::indexing::INDEX_COLLECTION_ID;
use super::stored_procedures::{BULK_POSTAL_CODE, NORTH_AMERICA_DOCUMENT, STORED_PROCEDURES};
use super::triggers::{TRIGGER_DOCUMENT_IDS, TRIGGER_IDS, TRIGGER_POSTAL_CODE};
use super::udfs::USER_DEFINED_FUNCTIONS;
use super::users_permissions::{permission_test_document_id, GRANTS, PERMISSION_TEST_POSTAL_CODE};
use super::{database, heading, postal_code, sample_customers, store};
use crate::api::{CosmosClient, Link, Query, RequestOptions, ResourceType};

/// Remove whatever earlier demo runs left behind. Missing resources are
/// skipped.
pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Cleanup")?;
    let none = RequestOptions::default();

    delete_if_exists(client, out, &Link::database(NEW_DATABASE_ID), &none)?;
    for id in COLLECTION_IDS.iter().chain([INDEX_COLLECTION_ID].iter()) {
        delete_if_exists(client, out, &database().collection(id), &none)?;
    }
    // Deleting a user also deletes its permissions.
    for (user, _, _) in GRANTS {
        delete_if_exists(client, out, &database().user(user), &none)?;
    }

    for (id, _) in STORED_PROCEDURES {
        delete_if_exists(client, out, &store().stored_procedure(id), &none)?;
    }
    for id in TRIGGER_IDS {
        delete_if_exists(client, out, &store().trigger(id), &none)?;
    }
    for (id, _) in USER_DEFINED_FUNCTIONS {
        delete_if_exists(client, out, &store().user_defined_function(id), &none)?;
    }

    for (id, key) in DOCUMENT_IDS {
        delete_if_exists(client, out, &store().document(id), &RequestOptions::partition_key(key))?;
    }
    for id in TRIGGER_DOCUMENT_IDS {
        delete_if_exists(client, out, &store().document(id), &RequestOptions::partition_key(TRIGGER_POSTAL_CODE))?;
    }
    let (id, key) = NORTH_AMERICA_DOCUMENT;
    delete_if_exists(client, out, &store().document(id), &RequestOptions::partition_key(key))?;
    for (user, _, _) in GRANTS {
        let id = permission_test_document_id(user);
        delete_if_exists(client, out, &store().document(&id), &RequestOptions::partition_key(PERMISSION_TEST_POSTAL_CODE))?;
    }
    for customer in sample_customers() {
        let id = customer["id"].as_str().unwrap_or_default();
        delete_if_exists(client, out, &store().document(id), &RequestOptions::partition_key(postal_code(&customer)))?;
    }
    delete_bulk_documents(client, out)?;

    writeln!(out)?;
    writeln!(out, "Cleanup complete")?;
    Ok(())
}

fn delete_if_exists(client: &CosmosClient, out: &mut dyn Write, link: &Link, options: &RequestOptions) -> Result<()> {
    match client.delete(link, options) {
        Ok(()) => writeln!(out, " Deleted {link}")?,
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err).with_context(|| format!("deleting {link}")),
    }
    Ok(())
}

fn delete_bulk_documents(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    let query = Query::new("SELECT VALUE c.id FROM c WHERE STARTSWITH(c.id, 'BULK-')");
    let options = RequestOptions::partition_key(BULK_POSTAL_CODE);
    let ids: Vec<String> = match client.query_all(&store(), ResourceType::Documents, &query, &options) {
        Ok(ids) => ids,
        Err(err) if err.is_not_found() => return Ok(()),
        Err(err) => return Err(err).context("querying bulk documents"),
    };
    for id in ids {
        delete_if_exists(client, out, &store().document(&id), &options)?;
    }
    Ok(())
}
