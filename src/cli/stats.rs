use anyhow::Result;

use tome::config::TomeConfig;

/// Display knowledge base statistics in the terminal.
pub fn stats(config: &TomeConfig, detailed: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = tome::db::open_database(&db_path)?;

    let response = tome::kb::stats::get_stats(&conn, detailed, Some(&db_path))?;

    println!("Knowledge Base Statistics");
    println!("{}", "=".repeat(40));
    println!("  Documents:           {}", response.total_documents);
    println!("  With embedding:      {}", response.with_embedding);
    println!("  Without embedding:   {}", response.without_embedding);
    println!("  Links:               {}", response.link_count);

    if let Some(size) = response.db_size_bytes {
        println!("  Database size:       {size} bytes");
    }
    if let Some(ref oldest) = response.oldest {
        println!("  Oldest document:     {oldest}");
    }
    if let Some(ref newest) = response.newest {
        println!("  Last updated:        {newest}");
    }

    if let Some(ref categories) = response.categories {
        println!();
        println!("By Category:");
        for c in categories {
            println!("  {:<20} {}", c.category, c.count);
        }
    }

    if let Some(ref tags) = response.top_tags {
        println!();
        println!("Top Tags:");
        for t in tags {
            println!("  {:<20} {}", t.tag, t.count);
        }
    }

    Ok(())
}
