//! Basic usage example for hs2arrow-rs.

use hs2arrow_rs::{Connection, ConnectionParams, OperationState};
use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

const HOST: &str = "localhost";
const PORT: u16 = 10000;
const USER: &str = "hive";
const PASSWORD: &str = "hive";
const TABLE: &str = "hs2arrow_example";

/// Opens a SASL connection and a session.
async fn example_connection() -> Result<Connection, Box<dyn Error>> {
    let params = ConnectionParams::from_str(&format!(
        "hive2://{}:{}@{}:{}?transport=sasl&hive_version=v7",
        USER, PASSWORD, HOST, PORT
    ))?;
    let mut connection = Connection::new(&params)?;
    connection.open().await?;
    connection.open_session().await?;
    Ok(connection)
}

/// Executes a simple query and converts the page to Arrow.
async fn example_simple_select(conn: &mut Connection) -> Result<usize, Box<dyn Error>> {
    let rows = conn.fetch("SELECT 1 + 1", 10).await?;
    let batch = rows.to_record_batch()?;
    Ok(batch.num_rows())
}

/// Creates a table, reads it back in batches of two and drops it.
async fn example_batches(conn: &mut Connection) -> Result<usize, Box<dyn Error>> {
    conn.execute(&format!("CREATE TABLE IF NOT EXISTS {} (id INT, name STRING)", TABLE))
        .await?;
    conn.execute(&format!(
        "INSERT INTO {} VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Charlie')",
        TABLE
    ))
    .await?;

    let mut row_count = 0;
    conn.fetch_in_batch(
        &format!("SELECT id, name FROM {} ORDER BY id", TABLE),
        2,
        |batch| {
            for row in batch.rows() {
                println!("  {:?}", row.values());
            }
            row_count += batch.len();
        },
    )
    .await?;

    conn.drop_table(TABLE).await?;
    Ok(row_count)
}

/// Runs a statement in the background and polls until it finishes.
async fn example_async(conn: &mut Connection) -> Result<usize, Box<dyn Error>> {
    let handles = conn.async_execute("SELECT count(*) FROM (SELECT 1) t").await?;
    println!("Stored handles: {}", handles.to_json()?);

    let state = loop {
        let state = conn.async_state(&handles).await?;
        if state.is_terminal() {
            break state;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    };

    if state != OperationState::Finished {
        return Err(format!("operation ended in state {}", state).into());
    }
    Ok(conn.async_fetch(&handles, 10).await?.len())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let mut conn = example_connection().await?;
    if let Some(session) = conn.session() {
        println!("Connected: protocol {:?}", session.protocol_version());
    }

    let rows = example_simple_select(&mut conn).await?;
    println!("Simple select: {} row(s)", rows);

    let rows = example_batches(&mut conn).await?;
    println!("Batches: {} row(s)", rows);

    let rows = example_async(&mut conn).await?;
    println!("Async: {} row(s)", rows);

    println!("{}", conn.explain("SELECT 1").await?);

    conn.close_session().await?;
    conn.close().await?;
    println!("Done");

    Ok(())
}
