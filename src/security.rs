//! Process-level guards for the social API binary.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Refuses to start when the effective uid is root. The API only needs write
/// access to its SQLite file and runs under an unprivileged service account.
pub fn ensure_not_root(process: &str) -> Result<()> {
    reject_root(process, Uid::effective())
}

fn reject_root(process: &str, uid: Uid) -> Result<()> {
    if uid.is_root() {
        bail!("{process} must not be run as root; start it under its service account");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_uid_is_refused() {
        let err = reject_root("backend", Uid::from_raw(0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "backend must not be run as root; start it under its service account"
        );
    }

    #[test]
    fn service_uid_is_allowed() {
        assert!(reject_root("backend", Uid::from_raw(998)).is_ok());
    }

    #[test]
    fn guard_follows_the_effective_uid() {
        assert_eq!(
            ensure_not_root("backend").is_err(),
            Uid::effective().is_root()
        );
    }
}
