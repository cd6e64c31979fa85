//! Import movie documents into the SQLite movie store.
//!
//! Usage: cargo run --bin import_movies <movies.json> <movies.db> [--replace]
//!
//! The input is either a JSON array of movie documents or one document per
//! line (the default `mongoexport` output).

use std::path::Path;

use moviebot::relay::movie::parse_documents;
use moviebot::relay::SqliteStore;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let replace = args.iter().any(|a| a == "--replace");
    let paths: Vec<&String> = args.iter().skip(1).filter(|a| *a != "--replace").collect();
    if paths.len() != 2 {
        eprintln!("Usage: {} <movies.json> <movies.db> [--replace]", args[0]);
        eprintln!();
        eprintln!("Import movie documents into the movie store.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  movies.json  JSON array, or one JSON document per line");
        eprintln!("  movies.db    SQLite database (created if missing)");
        eprintln!("  --replace    Delete existing movies before importing");
        std::process::exit(1);
    }

    let input_path = Path::new(paths[0]);
    let db_path = Path::new(paths[1]);

    println!("Reading movies from {:?}...", input_path);
    let text = std::fs::read_to_string(input_path).expect("Failed to read input file");
    let (movies, skipped) = parse_documents(&text).expect("Failed to parse movie documents");
    println!("Parsed {} movies ({} without a title skipped)", movies.len(), skipped);

    let store = SqliteStore::open(db_path).expect("Failed to open database");
    if replace {
        let removed = store.clear().expect("Failed to clear movies");
        println!("Removed {} existing movies", removed);
    }

    let added = store.insert_all(&movies).expect("Failed to insert movies");
    let total = store.count().expect("Failed to count movies");
    println!("Imported {} movies, {} in store", added, total);
}
