// Triggers demo: a validating pre-trigger and a metadata post-trigger,
// attached per request when creating documents.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use super::{ensure_store, heading, store, view_resource};
use crate::api::{CosmosClient, RequestOptions, Trigger, TriggerOperation, TriggerType};

const VALIDATE_DOCUMENT: &str = "trgValidateDocument";
const UPDATE_METADATA: &str = "trgUpdateMetadata";

pub(crate) const TRIGGER_IDS: [&str; 2] = [VALIDATE_DOCUMENT, UPDATE_METADATA];
/// Partition every trigger demo document lives in.
pub(crate) const TRIGGER_POSTAL_CODE: &str = "54321";
pub(crate) const TRIGGER_DOCUMENT_IDS: [&str; 4] = ["TRG-MONDAY", "TRG-META-1", "TRG-META-2", "_metadata"];

pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    ensure_store(client, out)?;

    create_triggers(client, out)?;
    view_triggers(client, out)?;

    execute_validate_document(client, out)?;
    execute_update_metadata(client, out)?;

    delete_documents(client, out)?;
    delete_triggers(client, out)?;
    Ok(())
}

fn create_triggers(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Create Triggers")?;

    let triggers = [
        Trigger::new(
            VALIDATE_DOCUMENT,
            include_str!("../../scripts/trgValidateDocument.js"),
            TriggerType::Pre,
            TriggerOperation::Create,
        ),
        Trigger::new(
            UPDATE_METADATA,
            include_str!("../../scripts/trgUpdateMetadata.js"),
            TriggerType::Post,
            TriggerOperation::Create,
        ),
    ];
    for trigger in &triggers {
        let created = client
            .create(&store(), trigger, &RequestOptions::default())
            .with_context(|| format!("creating trigger {}", trigger.id))?;
        writeln!(
            out,
            " Created {:?}-trigger {} on {:?}",
            created.trigger_type, created.id, created.trigger_operation
        )?;
    }
    Ok(())
}

fn view_triggers(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "View Triggers")?;

    let triggers = client.list::<Trigger>(&store()).context("listing triggers")?;
    for trigger in &triggers {
        writeln!(out)?;
        view_resource(out, "Trigger", trigger)?;
        writeln!(out, "{:>17}: {:?}", "Type", trigger.trigger_type)?;
        writeln!(out, "{:>17}: {:?}", "Operation", trigger.trigger_operation)?;
    }
    writeln!(out)?;
    writeln!(out, "Total triggers: {}", triggers.len())?;
    Ok(())
}

fn create_with_triggers(client: &CosmosClient, doc: &Value, pre: &[&str], post: &[&str]) -> crate::api::Result<Value> {
    let options = RequestOptions {
        pre_triggers: pre.iter().map(|s| s.to_string()).collect(),
        post_triggers: post.iter().map(|s| s.to_string()).collect(),
        ..RequestOptions::partition_key(TRIGGER_POSTAL_CODE)
    };
    client.create(&store(), doc, &options)
}

fn execute_validate_document(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, &format!("Execute {VALIDATE_DOCUMENT}"))?;

    let valid = json!({
        "id": "TRG-MONDAY",
        "name": "Employee with a valid day off",
        "weekdayOff": "monday",
        "address": { "postalCode": TRIGGER_POSTAL_CODE }
    });
    let created = create_with_triggers(client, &valid, &[VALIDATE_DOCUMENT], &[])
        .context("creating document with a valid day off")?;
    writeln!(
        out,
        " Created document {}: weekdayOff = {}, weekdayOffNumber = {}",
        created["id"], created["weekdayOff"], created["weekdayOffNumber"]
    )?;

    // Rejected by the trigger; the document is never written.
    let invalid = json!({
        "id": "TRG-FRIZDAY",
        "name": "Employee with an invalid day off",
        "weekdayOff": "frizday",
        "address": { "postalCode": TRIGGER_POSTAL_CODE }
    });
    match create_with_triggers(client, &invalid, &[VALIDATE_DOCUMENT], &[]) {
        Ok(_) => writeln!(out, " Unexpectedly created document TRG-FRIZDAY")?,
        Err(err) => writeln!(out, " Document TRG-FRIZDAY rejected: {err}")?,
    }
    Ok(())
}

fn execute_update_metadata(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, &format!("Execute {UPDATE_METADATA}"))?;

    for id in ["TRG-META-1", "TRG-META-2"] {
        let doc = json!({
            "id": id,
            "name": format!("Tracked document {id}"),
            "address": { "postalCode": TRIGGER_POSTAL_CODE }
        });
        create_with_triggers(client, &doc, &[], &[UPDATE_METADATA])
            .with_context(|| format!("creating document {id}"))?;
        writeln!(out, " Created document {id}")?;
    }

    let metadata: Value = client
        .read(
            &store().document("_metadata"),
            &RequestOptions::partition_key(TRIGGER_POSTAL_CODE),
        )
        .context("reading partition metadata")?;
    writeln!(
        out,
        " Metadata: count = {}, lastId = {}",
        metadata["count"], metadata["lastId"]
    )?;
    Ok(())
}

fn delete_documents(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Delete Documents")?;

    for id in TRIGGER_DOCUMENT_IDS {
        client
            .delete(
                &store().document(id),
                &RequestOptions::partition_key(TRIGGER_POSTAL_CODE),
            )
            .with_context(|| format!("deleting document {id}"))?;
        writeln!(out, " Deleted document {id}")?;
    }
    Ok(())
}

fn delete_triggers(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Delete Triggers")?;

    for id in TRIGGER_IDS {
        client
            .delete(&store().trigger(id), &RequestOptions::default())
            .with_context(|| format!("deleting trigger {id}"))?;
        writeln!(out, " Deleted trigger {id}")?;
    }
    Ok(())
}
