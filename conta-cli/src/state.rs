use anyhow::{Context, Result};
use conta_core::AccountContext;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub fn conta_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".conta"))
}

pub fn ensure_conta_home() -> Result<PathBuf> {
    let dir = conta_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Who is signed in on this machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionFile {
    pub holder_id: u64,
    pub signed_in_at_utc: Option<String>,
}

impl SessionFile {
    pub fn context(&self) -> AccountContext {
        AccountContext::new(self.holder_id)
    }
}

pub fn session_path() -> Result<PathBuf> {
    Ok(ensure_conta_home()?.join("session.json"))
}

pub fn write_session(session: &SessionFile) -> Result<()> {
    let p = session_path()?;
    let json = serde_json::to_string_pretty(session)?;
    fs::write(&p, json).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn read_session() -> Result<Option<SessionFile>> {
    let p = session_path()?;
    if !p.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(Some(serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))?))
}

/// Returns whether a session file was removed.
pub fn clear_session() -> Result<bool> {
    let p = session_path()?;
    if !p.exists() {
        return Ok(false);
    }
    fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
    Ok(true)
}
