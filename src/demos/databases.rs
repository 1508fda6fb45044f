// Databases demo: list databases, create `MyNewDatabase`, delete it again.

use std::io::Write;

use anyhow::{Context, Result};

use super::{heading, view_resource};
use crate::api::{CosmosClient, Database, Link, RequestOptions};

pub(crate) const NEW_DATABASE_ID: &str = "MyNewDatabase";

pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    view_databases(client, out)?;

    create_database(client, out, NEW_DATABASE_ID)?;
    view_databases(client, out)?;

    delete_database(client, out, NEW_DATABASE_ID)?;
    Ok(())
}

fn view_databases(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "View Databases")?;

    let databases = client
        .list::<Database>(&Link::root())
        .context("listing databases")?;

    for database in &databases {
        writeln!(out)?;
        view_resource(out, "Database", database)?;
    }

    writeln!(out)?;
    writeln!(out, "Total databases: {}", databases.len())?;
    Ok(())
}

fn create_database(client: &CosmosClient, out: &mut dyn Write, id: &str) -> Result<()> {
    heading(out, &format!("Create Database {id}"))?;

    let database = client
        .create(&Link::root(), &Database::new(id), &RequestOptions::default())
        .with_context(|| format!("creating database {id}"))?;

    writeln!(out, "Created new database")?;
    view_resource(out, "Database", &database)?;
    Ok(())
}

fn delete_database(client: &CosmosClient, out: &mut dyn Write, id: &str) -> Result<()> {
    heading(out, &format!("Delete Database {id}"))?;

    client
        .delete(&Link::database(id), &RequestOptions::default())
        .with_context(|| format!("deleting database {id}"))?;

    writeln!(out, "Deleted database {id}")?;
    Ok(())
}
