#![deny(warnings)]

use persistence::{default_sqlite_url, init_db, list_saves};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"));
    if let Some(path) = path.filter(|p| !p.contains(":memory:")) {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let pool = init_db(&url).await?;
    let saves = list_saves(&pool).await?;
    println!("DB migrated at {} ({} saves)", url, saves.len());
    for save in saves {
        println!(
            "  {:<24} tick {:>4}  {}  {}",
            save.business_id, save.tick, save.date, save.business_name
        );
    }
    Ok(())
}
