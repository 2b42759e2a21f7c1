//! Basic usage example for rowstream.
//!
//! Run with `cargo run --example basic_usage`. Set `RUST_LOG=rowstream=debug`
//! to see every statement the engine executes.

use futures_util::StreamExt;
use rowstream::{OrderBy, Query, Row, Sql, Subscriber, Subscription, QueryError};
use std::error::Error;
use std::io::Cursor;

const SCHEMA: &str = "\
CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT, author TEXT, year INTEGER)
INSERT INTO books (title, author, year) VALUES ('Dune', 'Frank Herbert', 1965)
INSERT INTO books (title, author, year) VALUES ('Children of Dune', 'Frank Herbert', 1976)
INSERT INTO books (title, author, year) VALUES ('Emma', 'Jane Austen', 1815)
INSERT INTO books (title, author, year) VALUES ('Persuasion', 'Jane Austen', 1817)
INSERT INTO books (title, author, year) VALUES ('Solaris', 'Stanislaw Lem', 1961)
";

/// Creates and fills the `books` table from a line-oriented script.
async fn example_schema(sql: &Sql) -> Result<u64, Box<dyn Error>> {
    let affected = sql.batch_from_reader(Cursor::new(SCHEMA))?.execute().await?;
    Ok(affected)
}

/// Streams every book, two rows per window.
async fn example_stream(sql: &Sql) -> Result<usize, Box<dyn Error>> {
    let query = sql
        .query("SELECT title, year FROM books")
        .order_by(OrderBy::asc("year"))
        .limit(0, 2)
        .all_rows(true);

    let mut rows = Box::pin(query.execute());
    let mut count = 0;
    while let Some(row) = rows.next().await {
        let row = row?;
        println!(
            "  {} ({})",
            row.get_by_name_as::<String>("title")?.unwrap_or_default(),
            row.get_by_name_as::<i64>("year")?.unwrap_or_default()
        );
        count += 1;
    }
    Ok(count)
}

/// Looks up one author and reuses the row as parameters of a second query.
async fn example_chained(sql: &Sql) -> Result<Vec<Row>, Box<dyn Error>> {
    let dune = sql
        .query("SELECT author FROM books WHERE title = :title")
        .bind("title", "Dune")
        .fetch_all()
        .await?;

    let Some(author) = dune.first() else {
        return Ok(Vec::new());
    };

    let books = sql
        .query("SELECT title FROM books WHERE author = :author")
        .parameters(author)
        .order_by(OrderBy::desc("year"))
        .limit(0, 10)
        .fetch_all()
        .await?;
    Ok(books)
}

/// Prints rows until it has seen enough, then cancels.
struct FirstN {
    remaining: usize,
    subscription: Option<Subscription>,
}

impl Subscriber for FirstN {
    fn on_subscribe(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    fn on_next(&mut self, row: Row) {
        println!("  {:?}", row.get(1));
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            if let Some(subscription) = &self.subscription {
                subscription.cancel();
            }
        }
    }

    fn on_error(&mut self, error: QueryError) {
        eprintln!("  failed: {}", error);
    }

    fn on_complete(&mut self) {
        println!("  no more rows");
    }
}

/// Subscribes to all titles but stops after three.
async fn example_subscriber(query: Query) {
    let mut subscriber = FirstN {
        remaining: 3,
        subscription: None,
    };
    query.subscribe(&mut subscriber).await;
}

/// Applies a named-parameter update.
async fn example_update(sql: &Sql) -> Result<u64, Box<dyn Error>> {
    let affected = sql
        .update("UPDATE books SET year = year + :shift WHERE author = :author")
        .bind("shift", 1)
        .bind("author", "Jane Austen")
        .execute()
        .await?;
    Ok(affected)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let sql = Sql::connect("sqlite::memory:")?;

    let affected = example_schema(&sql).await?;
    println!("Schema: {} row(s) inserted", affected);

    println!("Stream:");
    let count = example_stream(&sql).await?;
    println!("Stream: {} row(s)", count);

    let books = example_chained(&sql).await?;
    println!("Same author as Dune: {} book(s)", books.len());

    println!("Subscriber:");
    example_subscriber(
        sql.query("SELECT title FROM books")
            .limit(0, 2)
            .all_rows(true),
    )
    .await;

    let affected = example_update(&sql).await?;
    println!("Update: {} row(s)", affected);

    println!("Done");
    Ok(())
}
