use crate::config::Config;
use crate::db::{NewUser, Store};
use crate::services::validation::{password_problems, validate_email, validate_username};

pub async fn cmd_create_user(
    config: &Config,
    username: &str,
    password: &str,
    email: Option<&str>,
) -> anyhow::Result<()> {
    validate_username(username).map_err(|msg| anyhow::anyhow!("username: {msg}"))?;

    if let Some(msg) = password_problems(password).first() {
        anyhow::bail!("password: {msg}");
    }

    if let Some(email) = email {
        validate_email(email).map_err(|msg| anyhow::anyhow!("email: {msg}"))?;
    }

    let store = Store::new(&config.general.database_path).await?;

    if store.username_exists(username).await? {
        anyhow::bail!("A user with that username already exists.");
    }

    let user = store
        .create_user(
            NewUser {
                username: username.to_string(),
                email: email.unwrap_or_default().trim().to_string(),
                first_name: String::new(),
                last_name: String::new(),
                password: password.to_string(),
            },
            &config.security,
        )
        .await?;

    println!("✓ Created user '{}' (id {})", user.username, user.id);
    Ok(())
}
