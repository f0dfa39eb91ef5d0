//! Basic data-access example
//!
//! This example demonstrates:
//! - Letting the executor open and close a connection around each call
//! - Named parameters and boolean flags
//! - Buffered tables, lazy streams and object mapping
//! - Collecting metrics through an interceptor
//!
//! Run with: cargo run --example basic_usage

use rust_data_access::prelude::*;
use rust_data_access::{data_object, enum_field};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Tier {
    #[default]
    Free,
    Pro,
}

enum_field!(Tier { Free, Pro });

#[derive(Debug, Default)]
struct User {
    id: i64,
    username: String,
    email: String,
    age: Option<i32>,
    balance: f64,
    is_active: bool,
    tier: Tier,
}

data_object!(User {
    id,
    username,
    email,
    age,
    balance,
    is_active,
    tier,
});

fn main() -> Result<()> {
    println!("=== Rust Data Access - Basic Usage Example ===\n");

    let path = std::env::temp_dir().join("rust_data_access_basic_usage.db");
    let _ = std::fs::remove_file(&path);

    let metrics = Arc::new(MetricsInterceptor::new());
    let mut executor = Executor::new();
    executor.add_interceptor(Arc::clone(&metrics));

    // The connection starts closed; every call opens it and closes it again
    let mut conn = SqliteConnection::new(path.to_string_lossy());

    println!("1. Creating table...");
    executor.execute_non_query(
        &mut conn,
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT NOT NULL,
            age INTEGER,
            balance REAL,
            is_active TEXT,
            tier TEXT
        )",
        &[],
    )?;
    println!("   ✓ Table created, connection is {:?}\n", conn.state());

    println!("2. Inserting data...");
    let users = vec![
        ("alice", "alice@example.com", Some(30), 1500.50, true, "Pro"),
        ("bob", "bob@example.com", Some(25), 2300.75, true, "Free"),
        ("charlie", "charlie@example.com", None, 980.25, false, "Free"),
        ("diana", "diana@example.com", Some(28), 3200.00, true, "Pro"),
    ];

    for (username, email, age, balance, active, tier) in users {
        let affected = executor.execute_non_query(
            &mut conn,
            "INSERT INTO users (username, email, age, balance, is_active, tier)
             VALUES (:username, :email, :age, :balance, :active, :tier)",
            &[
                username.into(),
                email.into(),
                age.into(),
                balance.into(),
                active.into(),
                tier.into(),
            ],
        )?;
        println!("   ✓ Inserted {} row(s)", affected);
    }
    println!();

    println!("3. Loading all users into a table...");
    let table = executor.get_table(&mut conn, "SELECT * FROM users ORDER BY id", &[])?;
    println!("   Found {} users:", table.len());
    for user in table.to_objects::<User>()? {
        println!(
            "   - User #{}: {} ({}) - Age: {}, Balance: ${:.2}, Active: {}, Tier: {:?}",
            user.id,
            user.username,
            user.email,
            user.age.map_or("n/a".to_string(), |a| a.to_string()),
            user.balance,
            user.is_active,
            user.tier
        );
    }
    println!();

    println!("4. Streaming users with balance > :min...");
    let stream = executor.execute_records(
        &mut conn,
        "SELECT username, balance FROM users WHERE balance > :min ORDER BY balance DESC",
        &[1000.0f64.into()],
    )?;
    for record in stream {
        let record = record?;
        let username = record.get_ignore_case("USERNAME").map(DatabaseValue::as_string);
        let balance = record.get_ignore_case("balance").and_then(DatabaseValue::as_double);
        println!("   - {}: ${:.2}", username.unwrap_or_default(), balance.unwrap_or(0.0));
    }
    println!();

    println!("5. Updating from an object...");
    let mut command = Command::new("UPDATE users SET tier = :tier WHERE username = :username");
    command.bind_parameters_from_text();
    let upgrade = User {
        username: "bob".to_string(),
        tier: Tier::Pro,
        ..User::default()
    };
    executor.copy_fields_into_parameters(&mut command, &upgrade);
    let affected = executor.execute_non_query_command(&mut conn, &command)?;
    println!("   ✓ Updated {} row(s)\n", affected);

    println!("6. Counting active users...");
    let count = executor.execute_scalar(
        &mut conn,
        "SELECT COUNT(*) FROM users WHERE is_active = :active",
        &[true.into()],
    )?;
    println!("   Active users: {}\n", count.as_long().unwrap_or(0));

    println!("7. Metrics...");
    let stats = metrics.snapshot();
    println!("   {}", serde_json::to_string(&stats)?);
    println!("   Connection is {:?}", conn.state());

    let _ = std::fs::remove_file(&path);
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
