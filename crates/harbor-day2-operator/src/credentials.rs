//! Admin password rotation.

use anyhow::{Context, Result, bail};
use harbor_day2_api::RegistryClient;
use tracing::{info, warn};

/// What [`sync_admin_password`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSync {
    /// The configured password was already accepted.
    Current,
    /// The password was changed from the old one.
    Rotated,
}

/// Makes sure the admin user has `new_password`.
///
/// `current` authenticates with the new password. Only when it is rejected
/// is `previous` (authenticated with `old_password`) used to change it.
pub async fn sync_admin_password(
    current: &dyn RegistryClient,
    previous: Option<&dyn RegistryClient>,
    old_password: Option<&str>,
    new_password: &str,
) -> Result<PasswordSync> {
    match current.current_user().await {
        Ok(user) => {
            info!(user = %user.username, "Admin password is up to date");
            return Ok(PasswordSync::Current);
        }
        Err(e) if e.is_unauthorized() => {
            warn!("Configured admin password was rejected, rotating from the old password");
        }
        Err(e) => return Err(e).context("Failed to check the admin credentials"),
    }

    let (Some(previous), Some(old_password)) = (previous, old_password) else {
        bail!("Admin password was rejected and no old password is configured");
    };
    let admin = previous
        .current_user()
        .await
        .context("Failed to authenticate with the old admin password")?;
    previous
        .set_user_password(admin.user_id, old_password, new_password)
        .await
        .context("Failed to change the admin password")?;
    info!(user = %admin.username, "Admin password updated");
    Ok(PasswordSync::Rotated)
}
