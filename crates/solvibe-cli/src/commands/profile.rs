//! Profile commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Context as _, Result};
use serde::Serialize;
use solvibe_core::{ProfileUpdate, UserProfile};
use std::fmt;

#[derive(Serialize)]
#[serde(transparent)]
struct ProfileView<'a>(&'a UserProfile);

impl fmt::Display for ProfileView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self.0;
        writeln!(f, "{}", output::row("Wallet", user.wallet_address.as_str()))?;
        writeln!(f, "{}", output::row("Username", &user.username))?;
        writeln!(f, "{}", output::row("Name", &user.name))?;
        if let Some(bio) = &user.bio {
            writeln!(f, "{}", output::row("Bio", bio))?;
        }
        if let Some(image) = &user.profile_image {
            writeln!(f, "{}", output::row("Image", image))?;
        }
        write!(f, "{}", output::row("User ID", &user.id))
    }
}

/// Show the signed-in user, from the stored session or from the backend.
pub async fn profile_show(ctx: &Context, remote: bool, format: &OutputFormat) -> Result<()> {
    let Some(session) = ctx.machine.session() else {
        bail!("Not logged in. Run 'solvibe login' first");
    };

    if remote {
        let profile = ctx
            .backend
            .fetch_profile(&session.token)
            .await
            .context("Failed to fetch profile")?;
        // The backend's profile shape is not fixed; show it as returned
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    output::print(&ProfileView(&session.user), format);
    Ok(())
}

/// Edit the stored profile locally.
pub async fn profile_update(
    ctx: &Context,
    update: ProfileUpdate,
    format: &OutputFormat,
) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update. Pass --username, --name or --bio");
    }
    let user = ctx.machine.update_profile(update)?;
    output::print(&ProfileView(&user), format);
    Ok(())
}
