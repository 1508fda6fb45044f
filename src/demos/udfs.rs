// User defined functions demo: register the functions and call them from
// SQL queries over the sample customers.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;

use super::{ensure_store, heading, postal_code, sample_customers, store, view_resource};
use crate::api::{CosmosClient, Query, RequestOptions, ResourceType, UserDefinedFunction};

pub(crate) const USER_DEFINED_FUNCTIONS: [(&str, &str); 3] = [
    ("udfRegEx", include_str!("../../scripts/udfRegEx.js")),
    ("udfIsNorthAmerica", include_str!("../../scripts/udfIsNorthAmerica.js")),
    ("udfFormatCityStateZip", include_str!("../../scripts/udfFormatCityStateZip.js")),
];

pub fn run(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    ensure_store(client, out)?;

    create_user_defined_functions(client, out)?;
    view_user_defined_functions(client, out)?;

    seed_customers(client, out)?;
    execute_reg_ex(client, out)?;
    execute_is_north_america(client, out)?;
    execute_format_city_state_zip(client, out)?;
    remove_customers(client, out)?;

    delete_user_defined_functions(client, out)?;
    Ok(())
}

fn create_user_defined_functions(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Create User Defined Functions")?;

    for (id, body) in USER_DEFINED_FUNCTIONS {
        let udf = client
            .create(&store(), &UserDefinedFunction::new(id, body), &RequestOptions::default())
            .with_context(|| format!("creating user defined function {id}"))?;
        writeln!(out, " Created user defined function {} ({})", udf.id, udf.system.resource_id)?;
    }
    Ok(())
}

fn view_user_defined_functions(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "View User Defined Functions")?;

    let udfs = client
        .list::<UserDefinedFunction>(&store())
        .context("listing user defined functions")?;
    for udf in &udfs {
        writeln!(out)?;
        view_resource(out, "UDF", udf)?;
    }
    writeln!(out)?;
    writeln!(out, "Total user defined functions: {}", udfs.len())?;
    Ok(())
}

fn seed_customers(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Create sample customers")?;

    for customer in sample_customers() {
        let options = RequestOptions::partition_key(postal_code(&customer));
        let id = customer["id"].as_str().unwrap_or_default().to_string();
        match client.create(&store(), &customer, &options) {
            Ok(_) => writeln!(out, " Created customer {id}")?,
            Err(err) if err.is_conflict() => writeln!(out, " Customer {id} already exists")?,
            Err(err) => return Err(err).with_context(|| format!("creating customer {id}")),
        }
    }
    Ok(())
}

fn run_query(client: &CosmosClient, out: &mut dyn Write, sql: &str) -> Result<()> {
    writeln!(out, " Query: {sql}")?;
    let rows: Vec<Value> = client
        .query_all(&store(), ResourceType::Documents, &Query::new(sql), &RequestOptions::cross_partition())
        .with_context(|| format!("running query {sql}"))?;
    for row in &rows {
        writeln!(out, "  {row}")?;
    }
    writeln!(out, " Rows: {}", rows.len())?;
    Ok(())
}

fn execute_reg_ex(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Execute udfRegEx")?;
    run_query(
        client,
        out,
        "SELECT c.id, c.name FROM c WHERE udf.udfRegEx(c.name, 'Rent') != null",
    )
}

fn execute_is_north_america(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Execute udfIsNorthAmerica")?;
    run_query(
        client,
        out,
        "SELECT c.name, c.address.countryRegionName FROM c \
         WHERE STARTSWITH(c.id, 'CUST-') AND udf.udfIsNorthAmerica(c.address.countryRegionName) = true",
    )?;
    run_query(
        client,
        out,
        "SELECT c.name, c.address.countryRegionName FROM c \
         WHERE STARTSWITH(c.id, 'CUST-') AND udf.udfIsNorthAmerica(c.address.countryRegionName) = false",
    )
}

fn execute_format_city_state_zip(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Execute udfFormatCityStateZip")?;
    run_query(
        client,
        out,
        "SELECT c.id, c.name, udf.udfFormatCityStateZip(c) AS location FROM c WHERE STARTSWITH(c.id, 'CUST-')",
    )
}

fn remove_customers(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Delete sample customers")?;

    for customer in sample_customers() {
        let id = customer["id"].as_str().unwrap_or_default();
        client
            .delete(&store().document(id), &RequestOptions::partition_key(postal_code(&customer)))
            .with_context(|| format!("deleting customer {id}"))?;
        writeln!(out, " Deleted customer {id}")?;
    }
    Ok(())
}

fn delete_user_defined_functions(client: &CosmosClient, out: &mut dyn Write) -> Result<()> {
    heading(out, "Delete User Defined Functions")?;

    for (id, _) in USER_DEFINED_FUNCTIONS {
        client
            .delete(&store().user_defined_function(id), &RequestOptions::default())
            .with_context(|| format!("deleting user defined function {id}"))?;
        writeln!(out, " Deleted user defined function {id}")?;
    }
    Ok(())
}
