use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use server_api::{resolve_posts, ApiContext};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/posts.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateIndex {
        #[arg(long, default_value = "all_posts")]
        name: String,
        #[arg(long, default_value = "posts")]
        collection: String,
    },
    AddPost {
        title: String,
        #[arg(long, default_value = "posts")]
        collection: String,
    },
    ListPosts {
        #[arg(long, default_value = "all_posts")]
        index: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateIndex { name, collection } => {
            let index = storage.create_index(&name, &collection).await?;
            println!(
                "index {} covers collection {}",
                index.name, index.source_collection
            );
        }
        Command::AddPost { title, collection } => {
            let doc_ref = storage
                .create_document(&collection, &json!({ "title": title }))
                .await?;
            println!("created post {doc_ref}");
        }
        Command::ListPosts { index } => {
            let ctx = ApiContext::new(Arc::new(storage), index, storage::DEFAULT_PAGE_SIZE);
            let posts = resolve_posts(&ctx).await?;
            for post in posts {
                println!("- {}", post.title);
            }
        }
    }

    Ok(())
}
