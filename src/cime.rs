//! Output-root discovery through CIME's `xmlquery`
//!
//! A CIME case directory answers `./xmlquery --value VAR` for its XML
//! settings. `RUNDIR` is always an output root; `DOUT_S_ROOT` is one when
//! short-term archiving (`DOUT_S`) is on.

use crate::error::{CaseError, Result};
use crate::models::StringOrList;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

const XMLQUERY: &str = "./xmlquery";

/// Value of `varname` in the case at `caseroot`; `None` when `caseroot` is
/// not a directory
pub async fn xmlquery(caseroot: &Path, varname: &str) -> Result<Option<String>> {
    if !caseroot.is_dir() {
        return Ok(None);
    }
    let output = Command::new(XMLQUERY)
        .args(["--value", varname])
        .current_dir(caseroot)
        .output()
        .await
        .map_err(|e| CaseError::Cime {
            caseroot: caseroot.to_path_buf(),
            reason: format!("could not run xmlquery: {}", e),
        })?;
    if !output.status.success() {
        return Err(CaseError::Cime {
            caseroot: caseroot.to_path_buf(),
            reason: format!(
                "xmlquery --value {} exited with {}: {}",
                varname,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!("{}: {} = {}", caseroot.display(), varname, value);
    Ok(Some(value))
}

/// Output roots of one or more CIME case directories, in order
pub async fn output_roots_from_caseroot(caseroots: impl Into<StringOrList>) -> Result<Vec<PathBuf>> {
    let caseroots = caseroots.into().into_paths("caseroot")?;
    let mut roots = Vec::new();
    for caseroot in &caseroots {
        let Some(rundir) = xmlquery(caseroot, "RUNDIR").await? else {
            warn!("Skipping caseroot {}: not a directory", caseroot.display());
            continue;
        };
        roots.push(PathBuf::from(rundir));

        if xmlquery(caseroot, "DOUT_S").await?.as_deref() == Some("TRUE") {
            if let Some(archive) = xmlquery(caseroot, "DOUT_S_ROOT").await? {
                roots.push(PathBuf::from(archive));
            }
        }
    }
    Ok(roots)
}
