//! Profile commands

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Subcommand;

use safelens::identity::{IdentityProvider, Session, StaticIdentity, password_credentials};
use safelens::store::{AvatarStore, ProfileStore};
use safelens::{Attachment, ProfileDraft, UserProfile};

use super::AppContext;

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Show the stored profile
    Show,

    /// Sign in with the configured identity and record the login
    Login {
        /// Email or username; defaults to the configured email
        #[arg(long, requires = "password")]
        user: Option<String>,

        /// Check this against the configured password
        #[arg(long)]
        password: Option<String>,
    },

    /// Set the username
    SetUsername { username: String },

    /// Change the profile photo, by link or by uploading a local image
    SetPhoto {
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        url: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Check whether a username is free
    Check { username: String },
}

pub async fn profile_command(ctx: &AppContext, command: ProfileCommand) -> Result<()> {
    let session = ctx.require_session()?;

    match command {
        ProfileCommand::Show => match ctx.profiles.get_profile(&session.user_id).await? {
            Some(profile) => print_profile(&profile),
            None => println!("No profile yet. Run `safelens profile login` first."),
        },
        ProfileCommand::Login { user, password } => {
            let session = match password {
                Some(password) => password_login(ctx, session, user, password).await?,
                None => {
                    let identity = StaticIdentity::signed_in(session);
                    let Some(session) = identity.current_session().await else {
                        bail!("Not signed in");
                    };
                    session
                }
            };
            let profile = ctx.profiles.record_login(&session).await?;
            println!("Signed in as {} ({})", profile.username, profile.email);
        }
        ProfileCommand::SetUsername { username } => {
            let Some(current) = ctx.profiles.get_profile(&session.user_id).await? else {
                bail!("Profile not found");
            };
            let draft = ProfileDraft::new(&current.id, &current.email, username);
            let profile = ctx.profiles.save_profile(draft).await?;
            println!("Username set to {}", profile.username);
        }
        ProfileCommand::SetPhoto { url, file } => {
            let url = match (url, file) {
                (_, Some(path)) => {
                    let photo = Attachment::from_path(&path)?;
                    let avatars = AvatarStore::new(ctx.config.store.resolved_avatars_dir());
                    avatars
                        .upload(&session.user_id, &photo.file_name, &photo.bytes)
                        .await?
                }
                (Some(url), None) => url,
                (None, None) => bail!("Pass a photo URL or --file"),
            };
            ctx.profiles.update_photo(&session.user_id, &url).await?;
            println!("Photo updated: {}", url);
        }
        ProfileCommand::Check { username } => {
            let free = ctx
                .profiles
                .is_username_available(&username, Some(&session.user_id))
                .await?;
            if free {
                println!("{} is available", username);
            } else {
                println!("{} is taken", username);
            }
        }
    }

    Ok(())
}

/// Sign in against the `[identity]` account; `user` may be an email or a username
async fn password_login(
    ctx: &AppContext,
    session: Session,
    user: Option<String>,
    password: String,
) -> Result<Session> {
    let identity = ctx
        .config
        .identity
        .as_ref()
        .context("No identity configured")?;
    let email = session
        .email
        .clone()
        .context("The [identity] section needs an email for password sign-in")?;
    let expected = identity
        .password
        .clone()
        .context("No password set in the [identity] section")?;

    let provider = StaticIdentity::new().with_password_account(&email, expected, session);
    let user = user.unwrap_or(email);
    let credentials = password_credentials(&*ctx.profiles, &user, password).await?;
    Ok(provider.sign_in(credentials).await?)
}

fn print_profile(profile: &UserProfile) {
    println!("{} <{}>", profile.username, profile.email);
    println!("  User ID:  {}", profile.id);
    if profile.google_connected {
        println!(
            "  Google:   {}",
            profile.google_email.as_deref().unwrap_or("connected")
        );
    }
    if let Some(photo) = &profile.google_photo_url {
        println!("  Photo:    {}", photo);
    }
    println!("  Created:  {}", profile.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(last) = profile.last_login {
        println!("  Last login: {}", last.format("%Y-%m-%d %H:%M"));
    }
}
