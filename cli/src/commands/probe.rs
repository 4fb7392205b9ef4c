use std::path::Path;

use anyhow::{Context, Result};
use engine::{resolve_capabilities, FormatProbe};

pub fn execute(session: Option<&Path>) -> Result<()> {
    let mut store = super::open_session(session)?;
    let caps = resolve_capabilities(store.as_mut(), &FormatProbe::webp()).context("Failed to persist capability")?;
    println!("webp: {}", caps.webp);
    Ok(())
}
