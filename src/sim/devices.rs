use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use super::runner::{CommandRunner, SimctlError};

/// Lifecycle state reported by the device listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Booted,
    Shutdown,
    /// Transitional or unknown states, kept verbatim for display
    Other(String),
}

impl DeviceState {
    fn from_raw(raw: &str) -> Self {
        match raw {
            "Booted" => DeviceState::Booted,
            "Shutdown" => DeviceState::Shutdown,
            other => DeviceState::Other(other.to_string()),
        }
    }

    pub fn is_booted(&self) -> bool {
        matches!(self, DeviceState::Booted)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Booted => write!(f, "Booted"),
            DeviceState::Shutdown => write!(f, "Shutdown"),
            DeviceState::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// One addressable simulator, taken from the listing output.
///
/// The set of devices is rebuilt wholesale on every listing; entries are
/// never mutated or merged.
#[derive(Debug, Clone)]
pub struct Device {
    pub udid: String,
    pub name: String,
    pub state: DeviceState,
    /// Human form of the runtime the device runs under, e.g. `iOS 17.0`
    pub runtime: String,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: BTreeMap<String, Vec<RawDevice>>,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    udid: Option<String>,
    name: Option<String>,
    state: Option<String>,
    #[serde(rename = "isAvailable", default)]
    is_available: bool,
}

/// Run the listing command and parse its JSON into sorted devices.
///
/// Entries missing any of udid, name or state, and entries the tool marks
/// unavailable, are skipped rather than failing the whole listing.
pub async fn list_devices(runner: &dyn CommandRunner) -> Result<Vec<Device>, SimctlError> {
    let output = runner.run(&["simctl", "list", "devices", "--json"]).await?;
    if !output.success() {
        return Err(SimctlError::CommandFailed {
            command: "simctl list devices --json".to_string(),
            code: output.code,
            stderr: output.stderr_text(),
        });
    }

    parse_device_list(&output.stdout)
}

fn parse_device_list(json: &[u8]) -> Result<Vec<Device>, SimctlError> {
    let list: DeviceList = serde_json::from_slice(json)?;

    let mut devices = Vec::new();
    for (runtime, entries) in list.devices {
        let runtime = prettify_runtime(&runtime);
        for raw in entries {
            if !raw.is_available {
                continue;
            }
            let (udid, name, state) = match (raw.udid, raw.name, raw.state) {
                (Some(udid), Some(name), Some(state)) => (udid, name, state),
                _ => continue,
            };
            devices.push(Device {
                udid,
                name,
                state: DeviceState::from_raw(&state),
                runtime: runtime.clone(),
            });
        }
    }

    sort_devices(&mut devices);
    Ok(devices)
}

/// Booted devices first, everything else after, each group by name.
///
/// Callers rely on this ordering: the first entry is the best default.
fn sort_devices(devices: &mut [Device]) {
    devices.sort_by(|a, b| {
        b.state
            .is_booted()
            .cmp(&a.state.is_booted())
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// The first booted device if any, else the first device, else none
pub fn pick_default(devices: &[Device]) -> Option<&Device> {
    devices
        .iter()
        .find(|d| d.state.is_booted())
        .or_else(|| devices.first())
}

/// `com.apple.CoreSimulator.SimRuntime.iOS-17-0` -> `iOS 17.0`
fn prettify_runtime(raw: &str) -> String {
    let tail = raw
        .strip_prefix("com.apple.CoreSimulator.SimRuntime.")
        .unwrap_or(raw);
    match tail.split_once('-') {
        Some((platform, version)) => format!("{} {}", platform, version.replace('-', ".")),
        None => tail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::MockRunner;
    use super::*;

    const LISTING: &str = r#"{
      "devices" : {
        "com.apple.CoreSimulator.SimRuntime.iOS-17-0" : [
          {
            "udid" : "AAAA-1111",
            "name" : "iPhone 15",
            "state" : "Booted",
            "isAvailable" : true,
            "deviceTypeIdentifier" : "com.apple.CoreSimulator.SimDeviceType.iPhone-15"
          },
          {
            "udid" : "BBBB-2222",
            "name" : "iPad Air",
            "state" : "Shutdown",
            "isAvailable" : true
          },
          {
            "udid" : "CCCC-3333",
            "name" : "Broken runtime",
            "state" : "Shutdown",
            "isAvailable" : false
          }
        ],
        "com.apple.CoreSimulator.SimRuntime.watchOS-10-2" : [
          {
            "udid" : "DDDD-4444",
            "name" : "Apple Watch",
            "state" : "Shutdown",
            "isAvailable" : true
          },
          {
            "name" : "No udid",
            "state" : "Shutdown",
            "isAvailable" : true
          }
        ]
      }
    }"#;

    #[tokio::test]
    async fn test_list_devices_filters_and_sorts() {
        let mock = MockRunner::new();
        mock.push_stdout(LISTING);

        let devices = list_devices(&mock).await.unwrap();

        let calls = mock.take_calls();
        assert_eq!(calls[0].args, vec!["simctl", "list", "devices", "--json"]);

        // booted first, then the rest by name: "Apple Watch" < "iPad Air"
        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["iPhone 15", "Apple Watch", "iPad Air"]);
        assert_eq!(devices[0].udid, "AAAA-1111");
        assert_eq!(devices[0].state, DeviceState::Booted);
        assert_eq!(devices[0].runtime, "iOS 17.0");
        assert_eq!(devices[1].runtime, "watchOS 10.2");
    }

    #[tokio::test]
    async fn test_list_devices_listing_failure() {
        let mock = MockRunner::new();
        mock.push_failure(1, "simctl is unavailable");

        let err = list_devices(&mock).await.unwrap_err();
        assert!(matches!(err, SimctlError::CommandFailed { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn test_list_devices_rejects_bad_json() {
        let mock = MockRunner::new();
        mock.push_stdout("not json at all");

        let err = list_devices(&mock).await.unwrap_err();
        assert!(matches!(err, SimctlError::UnparseableOutput(_)));
    }

    #[test]
    fn test_sort_puts_booted_first_then_names() {
        let mut devices = vec![
            device("B", DeviceState::Shutdown),
            device("A", DeviceState::Booted),
            device("C", DeviceState::Booted),
        ];
        sort_devices(&mut devices);

        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_pick_default_prefers_booted() {
        let devices = vec![
            device("B", DeviceState::Shutdown),
            device("A", DeviceState::Booted),
        ];
        assert_eq!(pick_default(&devices).unwrap().name, "A");

        let cold = vec![
            device("B", DeviceState::Shutdown),
            device("C", DeviceState::Shutdown),
        ];
        assert_eq!(pick_default(&cold).unwrap().name, "B");

        assert!(pick_default(&[]).is_none());
    }

    #[test]
    fn test_prettify_runtime() {
        assert_eq!(
            prettify_runtime("com.apple.CoreSimulator.SimRuntime.iOS-17-0"),
            "iOS 17.0"
        );
        assert_eq!(
            prettify_runtime("com.apple.CoreSimulator.SimRuntime.watchOS-10-2"),
            "watchOS 10.2"
        );
        assert_eq!(prettify_runtime("iOS 17.0"), "iOS 17.0");
    }

    fn device(name: &str, state: DeviceState) -> Device {
        Device {
            udid: format!("udid-{}", name),
            name: name.to_string(),
            state,
            runtime: "iOS 17.0".to_string(),
        }
    }
}
