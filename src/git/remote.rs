use std::path::PathBuf;

use dirs::home_dir;
use git2::{Cred, CredentialType, Error, FetchOptions, RemoteCallbacks};

fn find_ssh_key() -> Option<PathBuf> {
    let home = home_dir()?;
    ["id_ed25519", "id_rsa"]
        .iter()
        .map(|k| home.join(".ssh").join(k))
        .find(|p| p.exists())
}

/// Callbacks trying, in order: an SSH key from `~/.ssh`, the ssh-agent,
/// then libgit2 default credentials. Local and anonymous https remotes
/// never reach them.
pub fn auth_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();

    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(key) = find_ssh_key()
                && let Ok(cred) = Cred::ssh_key(username, None, &key, None)
            {
                return Ok(cred);
            }
            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        if allowed_types.contains(CredentialType::DEFAULT)
            && let Ok(cred) = Cred::default()
        {
            return Ok(cred);
        }

        Err(Error::from_str("No authentication methods available"))
    });

    callbacks
}

pub fn fetch_options<'a>() -> FetchOptions<'a> {
    let mut fo = FetchOptions::new();
    fo.remote_callbacks(auth_callbacks());
    fo
}

/// `owner/repo` out of an https, ssh or scp-style remote, used for display.
pub fn repo_slug(remote: &str) -> anyhow::Result<String> {
    let s = remote.trim();
    if s.is_empty() {
        return Err(anyhow::anyhow!("empty remote"));
    }

    let path = if let Some(scheme_pos) = s.find("://") {
        let after_scheme = &s[scheme_pos + 3..];
        let slash_idx = after_scheme
            .find('/')
            .ok_or_else(|| anyhow::anyhow!("No '/' found after scheme in remote URL"))?;
        &after_scheme[slash_idx..]
    } else if let Some(colon_idx) = s.rfind(':') {
        &s[colon_idx + 1..]
    } else {
        return Err(anyhow::anyhow!("Failed to extract repo path from `{s}`"));
    };

    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(anyhow::anyhow!("Incorrect remote path: {path}"));
    }
    Ok(segments.join("/"))
}
