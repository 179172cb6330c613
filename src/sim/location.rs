use std::fmt;

use crate::core::Coordinate;

use super::runner::{CommandRunner, SimctlError};

/// Sentinel device name understood by the external tool
const ACTIVE_DEVICE: &str = "booted";

/// Where location commands are aimed.
///
/// `Booted` is the tool's own sentinel for "whichever simulator is
/// currently active"; `Udid` pins a specific device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceTarget {
    #[default]
    Booted,
    Udid(String),
}

impl DeviceTarget {
    /// Parse a user-supplied target, recognizing the sentinel spelling
    pub fn parse(raw: &str) -> Self {
        if raw == ACTIVE_DEVICE {
            DeviceTarget::Booted
        } else {
            DeviceTarget::Udid(raw.to_string())
        }
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTarget::Booted => write!(f, "{}", ACTIVE_DEVICE),
            DeviceTarget::Udid(udid) => write!(f, "{}", udid),
        }
    }
}

/// Send one coordinate to the target device.
///
/// A single best-effort invocation; no retries. The coordinate rides on
/// the command line in fixed six-decimal form.
pub async fn set_location(
    runner: &dyn CommandRunner,
    target: &DeviceTarget,
    coordinate: Coordinate,
) -> Result<(), SimctlError> {
    let device = target.to_string();
    let position = coordinate.to_string();

    let output = runner
        .run(&["simctl", "location", &device, "set", &position])
        .await?;
    if !output.success() {
        return Err(SimctlError::CommandFailed {
            command: format!("simctl location {} set {}", device, position),
            code: output.code,
            stderr: output.stderr_text(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::mock::MockRunner;
    use super::*;

    #[tokio::test]
    async fn test_set_location_builds_exact_arguments() {
        let mock = MockRunner::new();
        let coordinate = Coordinate::new(37.331686, -122.030656).unwrap();

        set_location(&mock, &DeviceTarget::Booted, coordinate)
            .await
            .unwrap();

        let calls = mock.take_calls();
        assert_eq!(
            calls[0].args,
            vec!["simctl", "location", "booted", "set", "37.331686,-122.030656"]
        );
    }

    #[tokio::test]
    async fn test_set_location_targets_udid() {
        let mock = MockRunner::new();
        let coordinate = Coordinate::new(0.0, 0.0).unwrap();
        let target = DeviceTarget::Udid("AAAA-1111".to_string());

        set_location(&mock, &target, coordinate).await.unwrap();

        assert_eq!(mock.calls()[0].args[2], "AAAA-1111");
    }

    #[tokio::test]
    async fn test_set_location_surfaces_command_failure() {
        let mock = MockRunner::new();
        mock.push_failure(148, "Invalid device: nope");
        let coordinate = Coordinate::new(1.0, 2.0).unwrap();

        let err = set_location(&mock, &DeviceTarget::Udid("nope".into()), coordinate)
            .await
            .unwrap_err();

        match err {
            SimctlError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(148));
                assert_eq!(stderr, "Invalid device: nope");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_device_target_parse_and_display() {
        assert_eq!(DeviceTarget::parse("booted"), DeviceTarget::Booted);
        assert_eq!(
            DeviceTarget::parse("AAAA-1111"),
            DeviceTarget::Udid("AAAA-1111".to_string())
        );
        assert_eq!(DeviceTarget::Booted.to_string(), "booted");
        assert_eq!(
            DeviceTarget::Udid("AAAA-1111".to_string()).to_string(),
            "AAAA-1111"
        );
    }
}
