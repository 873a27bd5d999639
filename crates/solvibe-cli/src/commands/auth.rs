//! Authentication commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use auth_session_machine::{AuthErrorKind, AuthPhase, AuthSessionMachine, AuthSnapshot};
use serde::Serialize;
use solvibe_core::ProfileFields;
use std::fmt;
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

/// Registration fields given on the command line. Anything missing is
/// prompted for if the wallet turns out to be new.
#[derive(Debug, Default, Clone)]
pub struct LoginArgs {
    pub username: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// How many times an interactive registration may be re-entered.
const MAX_PROFILE_ATTEMPTS: usize = 3;

#[derive(Serialize)]
struct StatusView {
    phase: AuthPhase,
    logged_in: bool,
    wallet_address: Option<String>,
    username: Option<String>,
    name: Option<String>,
    profile_completed: bool,
    api_base_url: String,
}

impl StatusView {
    fn new(snapshot: &AuthSnapshot, api_base_url: &str) -> Self {
        let user = snapshot.session.as_ref().map(|s| &s.user);
        Self {
            phase: snapshot.phase,
            logged_in: snapshot.phase.is_authenticated(),
            wallet_address: snapshot.target.as_ref().map(ToString::to_string),
            username: user.map(|u| u.username.clone()),
            name: user.map(|u| u.name.clone()),
            profile_completed: snapshot.profile_completed,
            api_base_url: api_base_url.to_string(),
        }
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = if self.logged_in {
            "logged in"
        } else {
            "not logged in"
        };
        writeln!(f, "{}", output::row("Auth", auth))?;
        if let Some(address) = &self.wallet_address {
            writeln!(f, "{}", output::row("Wallet", address))?;
        }
        if let Some(username) = &self.username {
            writeln!(f, "{}", output::row("Username", username))?;
        }
        if let Some(name) = &self.name {
            writeln!(f, "{}", output::row("Name", name))?;
        }
        if self.logged_in {
            let completed = if self.profile_completed { "yes" } else { "no" };
            writeln!(f, "{}", output::row("Profile complete", completed))?;
        }
        write!(f, "{}", output::row("Backend", &self.api_base_url))
    }
}

/// Connect the local wallet and sign in, registering if the wallet is new.
pub async fn login(ctx: &Context, args: LoginArgs, format: &OutputFormat) -> Result<()> {
    let current = ctx.machine.snapshot();
    if let Some(session) = current.session.as_ref() {
        output::print_success(
            &format!(
                "Already logged in as {} ({})",
                session.user.username,
                session.address()
            ),
            format,
        );
        return Ok(());
    }

    let listener = ctx.machine.spawn_wallet_listener();
    let result = run_login(&ctx.machine, args, format, &mut io::stdin().lock()).await;
    listener.abort();

    let snapshot = result?;
    match snapshot.session {
        Some(session) => {
            info!(wallet_address = %session.address(), "Login complete");
            output::print_success(
                &format!(
                    "Logged in as {} ({})",
                    session.user.username,
                    session.address()
                ),
                format,
            );
            Ok(())
        }
        None => bail!("Login ended in state {}", snapshot.phase),
    }
}

/// Connect, then loop on the profile form until the machine leaves it.
///
/// Flags fill the first form. After any rejected submission the form is
/// always shown again, with the previous answers as defaults.
async fn run_login(
    machine: &AuthSessionMachine,
    args: LoginArgs,
    format: &OutputFormat,
    input: &mut impl BufRead,
) -> Result<AuthSnapshot> {
    if *format == OutputFormat::Text {
        println!("Connecting wallet...");
    }
    let mut snapshot = machine.connect_and_authenticate().await?;
    let mut profile_attempts = 0;
    let mut defaults = args;
    let mut force_prompt = false;

    while snapshot.phase == AuthPhase::AwaitingProfileForm {
        profile_attempts += 1;
        let address = snapshot
            .target
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let fields = collect_profile(input, &address, &defaults, force_prompt)?;

        match machine.submit_profile(fields.clone()).await {
            Ok(next) => snapshot = next,
            Err(e) if e.kind() == AuthErrorKind::InvalidProfile => {
                output::print_error(&e.to_string(), format);
                if profile_attempts >= MAX_PROFILE_ATTEMPTS {
                    return Err(e.into());
                }
                force_prompt = true;
            }
            Err(e) => {
                let back_to_form = machine
                    .snapshot()
                    .failure
                    .is_some_and(|f| f.during_registration);
                if !back_to_form || profile_attempts >= MAX_PROFILE_ATTEMPTS {
                    return Err(e.into());
                }
                output::print_error(&format!("Registration failed: {e}"), format);
                debug!(error = %e, "Returning to the profile form");
                snapshot = machine.retry().await?;
                defaults = LoginArgs {
                    username: Some(fields.username),
                    name: Some(fields.name),
                    bio: fields.bio,
                };
                force_prompt = true;
            }
        }
    }

    Ok(snapshot)
}

/// Registration fields. Complete flags are used as-is unless
/// `force_prompt`; otherwise every field is prompted with `defaults` shown.
fn collect_profile(
    input: &mut impl BufRead,
    address: &str,
    defaults: &LoginArgs,
    force_prompt: bool,
) -> Result<ProfileFields> {
    if !force_prompt {
        if let (Some(username), Some(name)) = (&defaults.username, &defaults.name) {
            if !username.trim().is_empty() && !name.trim().is_empty() {
                return Ok(ProfileFields::new(
                    username.clone(),
                    name.clone(),
                    defaults.bio.clone(),
                ));
            }
        }
    }

    eprintln!();
    if force_prompt {
        eprintln!("Edit your SolVibe profile for wallet {address}:");
    } else {
        eprintln!("No SolVibe account for wallet {address}. Create one:");
    }
    let username = prompt(input, "Username", defaults.username.as_deref())?;
    let name = prompt(input, "Display name", defaults.name.as_deref())?;
    let bio = prompt(input, "Bio (optional)", defaults.bio.as_deref())?;

    Ok(ProfileFields::new(
        username,
        name,
        (!bio.trim().is_empty()).then_some(bio),
    ))
}

fn prompt(input: &mut impl BufRead, label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) if !value.is_empty() => eprint!("{label} [{value}]: "),
        _ => eprint!("{label}: "),
    }
    io::stderr().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input closed while reading {}", label.to_lowercase());
    }
    let line = line.trim();
    if line.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(line.to_string())
    }
}

/// Clear the session and disconnect the wallet.
pub async fn logout(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let had_session = ctx.machine.session().is_some();
    ctx.machine.logout().await;
    if had_session {
        output::print_success("Logged out successfully", format);
    } else {
        output::print_success("Not logged in", format);
    }
    Ok(())
}

/// Show the restored auth state. Never touches the network.
pub async fn status(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let view = StatusView::new(&ctx.machine.snapshot(), &ctx.config.api_base_url);
    output::print(&view, format);
    Ok(())
}
