// Users and permissions demo: grant users access to `mystore` and try each
// resource token against it.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use super::{database, ensure_store, heading, store, view_resource, DATABASE_ID};
use crate::api::{CosmosClient, Permission, PermissionMode, RequestOptions, User};

/// Users created by the demo, with the access each one is granted on
/// `mystore`.
pub(crate) const GRANTS: [(&str, &str, PermissionMode); 2] = [
    ("Alice", "AliceCollectionAccess", PermissionMode::All),
    ("Tom", "TomCollectionAccess", PermissionMode::Read),
];

/// Partition the resource-token write test uses.
pub(crate) const PERMISSION_TEST_POSTAL_CODE: &str = "00000";

/// Document the resource-token write test creates for `user_id`.
pub(crate) fn permission_test_document_id(user_id: &str) -> String {
    format!("PERMISSION-TEST-{}", user_id.to_uppercase())
}

pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    let collection = ensure_store(client, out)?;

    view_users(client, out)?;
    for (user, _, _) in GRANTS {
        create_user(client, out, user)?;
    }
    view_users(client, out)?;

    let mut permissions = Vec::new();
    for (user, permission_id, mode) in GRANTS {
        let permission = create_permission(client, out, user, permission_id, mode, &collection.system.self_link)?;
        permissions.push((user, permission));
    }
    for (user, _, _) in GRANTS {
        view_permissions(client, out, user)?;
    }

    for (user, permission) in &permissions {
        test_permission(client, out, user, permission)?;
    }

    for (user, permission_id, _) in GRANTS {
        delete_permission(client, out, user, permission_id)?;
        delete_user(client, out, user)?;
    }
    Ok(())
}

fn view_users(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, &format!("View Users in {DATABASE_ID}"))?;

    let users = client
        .list::<User>(&database())
        .with_context(|| format!("listing users in {DATABASE_ID}"))?;

    for (i, user) in users.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, " User #{}", i + 1)?;
        view_resource(out, "User", user)?;
    }
    writeln!(out)?;
    writeln!(out, "Total users in database {DATABASE_ID}: {}", users.len())?;
    Ok(())
}

fn create_user(client: &CosmosClient, out: &mut dyn Write, user_id: &str) -> Result<()> {
    heading(out, &format!("Create User {user_id} in {DATABASE_ID}"))?;

    let user = client
        .create(&database(), &User::new(user_id), &RequestOptions::default())
        .with_context(|| format!("creating user {user_id}"))?;

    writeln!(out, "Created new user")?;
    view_resource(out, "User", &user)?;
    Ok(())
}

fn create_permission(
    client: &CosmosClient,
    out: &mut dyn Write,
    user_id: &str,
    permission_id: &str,
    mode: PermissionMode,
    resource: &str,
) -> Result<Permission> {
    heading(out, &format!("Create Permission {permission_id} for {user_id}"))?;

    let definition = Permission::new(permission_id, mode, resource);
    let permission = client
        .create(&database().user(user_id), &definition, &RequestOptions::default())
        .with_context(|| format!("creating permission {permission_id}"))?;

    writeln!(out, "Created new permission")?;
    view_permission(out, &permission)?;
    Ok(permission)
}

fn view_permissions(client: &CosmosClient, out: &mut dyn Write, user_id: &str) -> Result<()> {
    heading(out, &format!("View Permissions for {user_id}"))?;

    let permissions = client
        .list::<Permission>(&database().user(user_id))
        .with_context(|| format!("listing permissions for {user_id}"))?;

    for permission in &permissions {
        writeln!(out)?;
        view_permission(out, permission)?;
    }
    writeln!(out)?;
    writeln!(out, "Total permissions for {user_id}: {}", permissions.len())?;
    Ok(())
}

fn view_permission(out: &mut dyn Write, permission: &Permission) -> Result<()> {
    view_resource(out, "Permission", permission)?;
    writeln!(out, "{:>17}: {:?}", "Permission Mode", permission.permission_mode)?;
    writeln!(out, "{:>17}: {}", "Resource", permission.resource)?;
    if let Some(token) = &permission.token {
        let shown: String = token.chars().take(24).collect();
        writeln!(out, "{:>17}: {shown}...", "Token")?;
    }
    Ok(())
}

/// Read and write `mystore` with the permission's resource token and report
/// what the service allows.
fn test_permission(client: &CosmosClient, out: &mut dyn Write, user_id: &str, permission: &Permission) -> Result<()> {
    heading(out, &format!("Test {:?} permission for {user_id}", permission.permission_mode))?;

    let Some(token) = &permission.token else {
        writeln!(out, " No resource token returned for {}", permission.id)?;
        return Ok(());
    };
    let restricted = CosmosClient::with_resource_token(client.endpoint().as_str(), token)?;

    match restricted.list::<Value>(&store()) {
        Ok(docs) => writeln!(out, " Read documents: allowed ({} found)", docs.len())?,
        Err(err) => writeln!(out, " Read documents: denied ({err})")?,
    }

    let doc_id = permission_test_document_id(user_id);
    let doc = json!({
        "id": doc_id,
        "name": format!("Written by {user_id}"),
        "address": { "postalCode": PERMISSION_TEST_POSTAL_CODE }
    });
    let options = RequestOptions::partition_key(PERMISSION_TEST_POSTAL_CODE);
    match restricted.create(&store(), &doc, &options) {
        Ok(_) => {
            writeln!(out, " Write document: allowed")?;
            client
                .delete(&store().document(&doc_id), &options)
                .with_context(|| format!("deleting document {doc_id}"))?;
        }
        Err(err) => writeln!(out, " Write document: denied ({err})")?,
    }
    Ok(())
}

fn delete_permission(client: &CosmosClient, out: &mut dyn Write, user_id: &str, permission_id: &str) -> Result<()> {
    heading(out, &format!("Delete Permission {permission_id} from {user_id}"))?;

    client
        .delete(&database().user(user_id).permission(permission_id), &RequestOptions::default())
        .with_context(|| format!("deleting permission {permission_id}"))?;

    writeln!(out, "Deleted permission {permission_id} from user {user_id}")?;
    Ok(())
}

fn delete_user(client: &CosmosClient, out: &mut dyn Write, user_id: &str) -> Result<()> {
    heading(out, &format!("Delete User {user_id} in {DATABASE_ID}"))?;

    client
        .delete(&database().user(user_id), &RequestOptions::default())
        .with_context(|| format!("deleting user {user_id}"))?;

    writeln!(out, "Deleted user {user_id} from database {DATABASE_ID}")?;
    Ok(())
}
