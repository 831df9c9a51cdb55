use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        let config = Config::default();
        println!("✓ Config file created with a fresh JWT secret.");
        println!(
            "  Uploads will be stored in {}",
            config.storage.upload_path().display()
        );
        println!("  Edit config.toml and run `cropdoc serve`.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }

    Ok(())
}
