//! Basic usage example with the mock backend.
//!
//! Run with:
//!   cargo run --example basic

use rgmux::{factory, report, Backend, BackendType, Config, ResourceSpec, Tags};

#[tokio::main]
async fn main() -> rgmux::Result<()> {
    // Initialize the library (registers backends)
    rgmux::init();

    // Small pages so the listing below follows continuation links
    let config = Config::new(BackendType::Mock).with_option("page_size", "2");
    let mut backend = factory::new_backend(config)?;
    println!("Backend initialized: {}", backend.name());

    backend.init().await?;
    let session = backend.authenticate().await?;

    let mut tags = Tags::new();
    tags.insert("env".to_string(), "demo".to_string());

    for name in ["demo-a", "demo-b", "demo-c"] {
        backend
            .create_or_update_group(name, "westus", &tags, &*session)
            .await?;
    }

    let groups = backend.list_groups(&*session).await?;
    print!("{}", report::format_groups(&groups));

    let vault = ResourceSpec::key_vault("demovault", "westus", "00000000-0000-0000-0000-000000000000");
    backend
        .create_or_update_resource("demo-a", &vault, &*session)
        .await?;

    let resources = backend.list_resources("demo-a", &*session).await?;
    print!("{}", report::format_resources("demo-a", &resources));

    // Exports refuse to overwrite, so write into a fresh directory
    let dir = std::env::temp_dir().join(format!("rgmux-demo-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;
    let path = backend.export_template_to("demo-a", &dir, &*session).await?;
    println!("Template saved to {}", path.display());

    match backend.export_template_to("demo-a", &dir, &*session).await {
        Err(e) => println!("Second export refused: {}", e),
        Ok(_) => println!("Second export unexpectedly succeeded"),
    }

    for name in ["demo-a", "demo-b", "demo-c"] {
        backend.delete_group(name, &*session).await?;
    }
    println!("\nCleaned up {} groups", groups.len());

    Ok(())
}
