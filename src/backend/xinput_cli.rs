//! Gateway backed by the `xinput` command line tool.
//!
//! Every operation spawns one process and waits for it. Nothing is retried.

use super::{DeviceRecord, GatewayError, InputGateway};
use log::debug;
use std::process::Command;

/// Glyphs `xinput list` uses to draw the device tree
const TREE_GLYPHS: &[char] = &['⎡', '⎜', '⎣', '↳', '∼'];

/// Real gateway that shells out to `xinput` (and `dpkg` for the version gate).
#[derive(Clone, Debug)]
pub struct XinputCli {
    program: String,
}

impl XinputCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[String]) -> Result<String, GatewayError> {
        run_command(&self.program, args)
    }
}

impl Default for XinputCli {
    fn default() -> Self {
        Self::new("xinput")
    }
}

impl InputGateway for XinputCli {
    fn list_devices(&self) -> Result<Vec<DeviceRecord>, GatewayError> {
        let out = self.run(&["list".to_string()])?;
        Ok(parse_list_output(&out))
    }

    fn create_primary(&self, name: &str) -> Result<(), GatewayError> {
        self.run(&["create-master".to_string(), name.to_string()])?;
        Ok(())
    }

    fn remove_primary(&self, id: u32) -> Result<(), GatewayError> {
        self.run(&["remove-master".to_string(), id.to_string()])?;
        Ok(())
    }

    fn reattach(&self, device_id: u32, primary_id: u32) -> Result<(), GatewayError> {
        debug!("reattaching {} to {}", device_id, primary_id);
        self.run(&[
            "reattach".to_string(),
            device_id.to_string(),
            primary_id.to_string(),
        ])?;
        Ok(())
    }

    fn server_version(&self) -> Result<String, GatewayError> {
        let out = run_command("dpkg", &["-l".to_string()])?;
        find_package_version(&out, "xserver-xorg-core").ok_or_else(|| {
            GatewayError::InvalidOutput {
                command: "dpkg -l".to_string(),
                reason: "xserver-xorg-core is not installed".to_string(),
            }
        })
    }
}

fn run_command(program: &str, args: &[String]) -> Result<String, GatewayError> {
    let command = std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    debug!("running `{}`", command);

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| GatewayError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(GatewayError::CommandFailed {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| GatewayError::InvalidOutput {
        command,
        reason: e.to_string(),
    })
}

/// Split `xinput list` output into raw device records.
///
/// Lines look like
/// `⎜   ↳ Logitech USB Receiver    id=9    [slave  pointer  (2)]`.
/// Lines without `id=` are skipped. A line with `id=` whose bracketed part is
/// incomplete still produces a record, with the missing fields left empty.
/// Floating slaves carry no type and no primary and are left out.
pub fn parse_list_output(output: &str) -> Vec<DeviceRecord> {
    output.lines().filter_map(parse_list_line).collect()
}

fn parse_list_line(line: &str) -> Option<DeviceRecord> {
    let id_pos = line.rfind("id=")?;
    let name = line[..id_pos]
        .trim_start_matches(|c: char| c.is_whitespace() || TREE_GLYPHS.contains(&c))
        .trim_end()
        .to_string();

    let rest = &line[id_pos + 3..];
    let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();

    let attrs = match (rest.find('['), rest.rfind(']')) {
        (Some(open), Some(close)) if open < close => &rest[open + 1..close],
        _ => "",
    };

    if attrs.trim() == "floating slave" {
        debug!("skipping floating slave '{}' id={}", name, id);
        return None;
    }

    let mut tokens = attrs.split_whitespace();
    let role = tokens.next().unwrap_or_default().to_string();
    let kind = tokens.next().unwrap_or_default().to_string();
    let link = tokens
        .next()
        .and_then(|t| t.strip_prefix('('))
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or_default()
        .to_string();

    Some(DeviceRecord {
        name,
        id,
        role,
        kind,
        link,
    })
}

/// Version of `package` from `dpkg -l` output, epoch stripped.
///
/// `ii  xserver-xorg-core  2:1.20.13-1ubuntu1  amd64  ...` yields `1.20.13`.
pub fn find_package_version(dpkg_output: &str, package: &str) -> Option<String> {
    dpkg_output.lines().find_map(|line| {
        let mut cols = line.split_whitespace();
        let _status = cols.next()?;
        let name = cols.next()?;
        if name.split(':').next()? != package {
            return None;
        }
        let raw = cols.next()?;
        let without_epoch = raw.split_once(':').map_or(raw, |(_, v)| v);
        let version: String = without_epoch
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let version = version.trim_end_matches('.').to_string();
        (!version.is_empty()).then_some(version)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
⎡ Virtual core pointer                    \tid=2\t[master pointer  (3)]
⎜   ↳ Virtual core XTEST pointer              \tid=4\t[slave  pointer  (2)]
⎜   ↳ Logitech USB Optical Mouse              \tid=10\t[slave  pointer  (2)]
⎣ Virtual core keyboard                   \tid=3\t[master keyboard (2)]
    ↳ Virtual core XTEST keyboard             \tid=5\t[slave  keyboard (3)]
    ↳ Power Button                            \tid=6\t[slave  keyboard (3)]
∼ Wacom Pen                                   \tid=14\t[floating slave]
";

    #[test]
    fn test_parse_list_output() {
        let records = parse_list_output(LIST);
        assert_eq!(records.len(), 6);
        assert_eq!(
            records[0],
            DeviceRecord {
                name: "Virtual core pointer".to_string(),
                id: "2".to_string(),
                role: "master".to_string(),
                kind: "pointer".to_string(),
                link: "3".to_string(),
            }
        );
        assert_eq!(records[2].name, "Logitech USB Optical Mouse");
        assert_eq!(records[2].id, "10");
        assert_eq!(records[2].role, "slave");
        assert_eq!(records[2].link, "2");
        assert_eq!(records[3].kind, "keyboard");
    }

    #[test]
    fn test_floating_slave_skipped() {
        let records = parse_list_output(LIST);
        assert!(records.iter().all(|r| r.id != "14"));
    }

    #[test]
    fn test_incomplete_line_keeps_empty_fields() {
        let records = parse_list_output("⎜   ↳ Broken device   id=11\t[slave ]\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Broken device");
        assert_eq!(records[0].id, "11");
        assert_eq!(records[0].role, "slave");
        assert!(records[0].kind.is_empty());
        assert!(records[0].link.is_empty());
    }

    #[test]
    fn test_lines_without_id_ignored() {
        assert!(parse_list_output("\n  nothing here\n").is_empty());
    }

    #[test]
    fn test_find_package_version() {
        let dpkg = "\
ii  xserver-common       2:1.20.13-1ubuntu1  all    common files
ii  xserver-xorg-core    2:1.20.13-1ubuntu1  amd64  Xorg X server - core server
ii  xterm                372-1ubuntu1        amd64  X terminal emulator
";
        assert_eq!(
            find_package_version(dpkg, "xserver-xorg-core").as_deref(),
            Some("1.20.13")
        );
        assert_eq!(find_package_version(dpkg, "xserver-xorg-video-intel"), None);
    }

    #[test]
    fn test_find_package_version_with_arch_suffix() {
        let dpkg = "ii  xserver-xorg-core:amd64  21.1.4-2  amd64  Xorg X server\n";
        assert_eq!(
            find_package_version(dpkg, "xserver-xorg-core").as_deref(),
            Some("21.1.4")
        );
    }
}
