//! Built-in device profiles.
//!
//! ```text
//! router1>   en          router1#
//! ─────────────────────► ───────
//! user EXEC  Password:   privileged EXEC
//! ```

use super::definition::DeviceProfile;
use crate::error::ProfileError;

/// Names accepted by [`by_name`].
pub const BUILTIN: &[&str] = &["cisco_ios", "cisco_nxos", "arista_eos"];

/// Look up a built-in profile.
pub fn by_name(name: &str) -> Result<DeviceProfile, ProfileError> {
    match name {
        "cisco_ios" => cisco_ios(),
        "cisco_nxos" => cisco_nxos(),
        "arista_eos" => arista_eos(),
        _ => Err(ProfileError::Unknown {
            name: name.to_string(),
        }),
    }
}

/// Cisco IOS / IOS-XE.
///
/// Any line ending in `:` after `en` is taken as the secret request.
pub fn cisco_ios() -> Result<DeviceProfile, ProfileError> {
    Ok(DeviceProfile::new("cisco_ios", r">\s*$", r"#\s*$", r":\s*$")?
        .with_escalate("en")
        .with_disable_paging("term len 0"))
}

/// Cisco NX-OS. Usually lands privileged; `enable` exists for RBAC setups.
pub fn cisco_nxos() -> Result<DeviceProfile, ProfileError> {
    Ok(
        DeviceProfile::new("cisco_nxos", r">\s*$", r"#\s*$", r"(?i)password:\s*$")?
            .with_escalate("enable")
            .with_disable_paging("terminal length 0"),
    )
}

/// Arista EOS.
pub fn arista_eos() -> Result<DeviceProfile, ProfileError> {
    Ok(
        DeviceProfile::new("arista_eos", r">\s*$", r"#\s*$", r"(?i)password:\s*$")?
            .with_escalate("enable")
            .with_disable_paging("terminal length 0"),
    )
}
