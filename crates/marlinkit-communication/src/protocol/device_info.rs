//! Device identification
//!
//! Parses the report Marlin produces for `M115`. The interesting part is a
//! single long line of `KEY:value` fields where values may contain spaces,
//! so the parser locates known keys by position and slices the text between
//! them. Firmware that answers with something else entirely still yields a
//! usable [`DeviceInfo`]; the raw text is always preserved.

use std::fmt;

const BANNER_KEYS: [&str; 6] = [
    "FIRMWARE_NAME",
    "SOURCE_CODE_URL",
    "PROTOCOL_VERSION",
    "MACHINE_TYPE",
    "EXTRUDER_COUNT",
    "UUID",
];

/// Identity reported by the device after connect
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfo {
    /// The identification text exactly as received
    pub raw: String,
    /// Full firmware identifier, e.g. `Marlin 2.1.2 (Jun 10 2023 12:00:00)`
    pub firmware_name: Option<String>,
    /// Version number extracted from the firmware identifier
    pub firmware_version: Option<String>,
    pub source_code_url: Option<String>,
    pub protocol_version: Option<String>,
    /// Machine name the firmware was configured with
    pub machine_type: Option<String>,
    pub extruder_count: Option<u32>,
    pub uuid: Option<String>,
    /// `Cap:` lines from an extended capabilities report
    pub capabilities: Vec<String>,
}

impl DeviceInfo {
    /// Parse an identification response
    pub fn parse(raw: &str) -> Self {
        let mut info = DeviceInfo {
            raw: raw.to_string(),
            ..Default::default()
        };

        for line in raw.lines() {
            let line = line.trim();
            if let Some(cap) = line.strip_prefix("Cap:") {
                info.capabilities.push(cap.trim().to_string());
            } else if line.contains("FIRMWARE_NAME:") {
                info.parse_banner_line(line);
            }
        }

        if let Some(name) = &info.firmware_name {
            info.firmware_version = extract_version(name);
        }

        info
    }

    fn parse_banner_line(&mut self, line: &str) {
        // Key positions, sorted, delimit each value
        let mut found: Vec<(usize, &str)> = BANNER_KEYS
            .iter()
            .filter_map(|key| {
                line.find(&format!("{}:", key)).map(|idx| (idx, *key))
            })
            .collect();
        found.sort_by_key(|(idx, _)| *idx);

        for (i, (idx, key)) in found.iter().enumerate() {
            let value_start = idx + key.len() + 1;
            let value_end = found
                .get(i + 1)
                .map(|(next_idx, _)| *next_idx)
                .unwrap_or(line.len());
            let value = line[value_start..value_end].trim();
            if value.is_empty() {
                continue;
            }
            match *key {
                "FIRMWARE_NAME" => self.firmware_name = Some(value.to_string()),
                "SOURCE_CODE_URL" => self.source_code_url = Some(value.to_string()),
                "PROTOCOL_VERSION" => self.protocol_version = Some(value.to_string()),
                "MACHINE_TYPE" => self.machine_type = Some(value.to_string()),
                "EXTRUDER_COUNT" => self.extruder_count = value.parse().ok(),
                "UUID" => self.uuid = Some(value.to_string()),
                _ => {}
            }
        }
    }
}

/// Second whitespace token of the identifier, when it looks like a version
fn extract_version(firmware_name: &str) -> Option<String> {
    let token = firmware_name.split_whitespace().nth(1)?;
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        Some(token.to_string())
    } else {
        None
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.firmware_name {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "unidentified firmware")?,
        }
        if let Some(machine) = &self.machine_type {
            write!(f, " on {}", machine)?;
        }
        if let Some(count) = self.extruder_count {
            write!(f, " ({} extruder{})", count, if count == 1 { "" } else { "s" })?;
        }
        Ok(())
    }
}
