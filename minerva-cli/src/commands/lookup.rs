//! Lookup command implementation

use anyhow::{bail, Result};
use futures::future::join_all;
use minerva_core::{BookMetadata, Resolver};

/// Print one book as labelled lines
fn print_book(book: &BookMetadata) {
    println!("ISBN:        {}", book.isbn);
    if let Some(title) = &book.title {
        println!("Title:       {}", title);
    }
    if let Some(subtitle) = &book.subtitle {
        println!("Subtitle:    {}", subtitle);
    }
    if let Some(authors) = book.authors.as_ref().filter(|a| !a.is_empty()) {
        println!("Authors:     {}", authors.join(", "));
    }
    if let Some(published) = &book.published_date {
        println!("Published:   {}", published);
    }
    if let Some(categories) = book.categories.as_ref().filter(|c| !c.is_empty()) {
        println!("Categories:  {}", categories.join(", "));
    }
    if let Some(language) = &book.language {
        println!("Language:    {}", language);
    }
    println!("Pages:       {}", book.page_count);
    if let Some(desc) = &book.description {
        println!("Description: {}", desc);
    }
}

/// Look up each ISBN and print the results in argument order
pub async fn lookup(resolver: &Resolver, isbns: &[String], json: bool) -> Result<()> {
    // Duplicate ISBNs collapse into one request
    let results = join_all(isbns.iter().map(|isbn| resolver.fetch(isbn))).await;

    let mut books = Vec::new();
    let mut errors = 0;
    for result in results {
        match result {
            Ok(book) => books.push(book),
            Err(e) => {
                errors += 1;
                eprintln!("Error: {}", e);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
    } else {
        for (i, book) in books.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_book(book);
        }
    }

    if errors > 0 {
        bail!("{} of {} lookups failed", errors, isbns.len());
    }

    Ok(())
}
