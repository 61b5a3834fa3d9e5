//! ratbag-command: inspect and configure mice from the command line.

mod hid;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ratbag_core::{
    ActionType, Button, Capability, Context, Device, LogPriority, Profile, SpecialAction,
};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const KEY_VOLUMEDOWN: u32 = 114;
const KEY_VOLUMEUP: u32 = 115;

/// Names accepted for key actions. Anything else must be a raw key code.
const KEY_NAMES: &[(&str, u32)] = &[
    ("KEY_ESC", 1),
    ("KEY_1", 2),
    ("KEY_2", 3),
    ("KEY_3", 4),
    ("KEY_4", 5),
    ("KEY_5", 6),
    ("KEY_TAB", 15),
    ("KEY_Q", 16),
    ("KEY_W", 17),
    ("KEY_E", 18),
    ("KEY_R", 19),
    ("KEY_ENTER", 28),
    ("KEY_LEFTCTRL", 29),
    ("KEY_A", 30),
    ("KEY_S", 31),
    ("KEY_D", 32),
    ("KEY_F", 33),
    ("KEY_LEFTSHIFT", 42),
    ("KEY_C", 46),
    ("KEY_V", 47),
    ("KEY_LEFTALT", 56),
    ("KEY_SPACE", 57),
    ("KEY_F1", 59),
    ("KEY_F2", 60),
    ("KEY_F3", 61),
    ("KEY_F4", 62),
    ("KEY_HOME", 102),
    ("KEY_PAGEUP", 104),
    ("KEY_END", 107),
    ("KEY_PAGEDOWN", 109),
    ("KEY_MUTE", 113),
    ("KEY_VOLUMEDOWN", KEY_VOLUMEDOWN),
    ("KEY_VOLUMEUP", KEY_VOLUMEUP),
    ("KEY_LEFTMETA", 125),
    ("KEY_BACK", 158),
    ("KEY_FORWARD", 159),
    ("KEY_NEXTSONG", 163),
    ("KEY_PLAYPAUSE", 164),
    ("KEY_PREVIOUSSONG", 165),
];

#[derive(Parser)]
#[command(
    name = "ratbag-command",
    version,
    about = "Inspect and configure gaming mice"
)]
struct Cli {
    /// Print library debug messages; `--verbose=raw` also dumps every report.
    #[arg(
        long,
        global = true,
        value_enum,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "debug"
    )]
    verbose: Option<Verbosity>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Verbosity {
    Debug,
    Raw,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionKind {
    Button,
    Key,
    Special,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the device's profiles, resolutions and buttons.
    Info {
        /// hidraw node, as printed by `list`.
        path: String,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List supported devices.
    List,
    /// Remap a button of the active profile.
    ChangeButton {
        /// Button index.
        button: u32,
        kind: ActionKind,
        /// Button number, KEY_* name or key code, or special action name.
        value: String,
        path: String,
    },
    /// Make profile N the active one.
    SwitchProfile { index: u32, path: String },
    /// Set the resolution of the active mode.
    SwitchDpi { dpi: u32, path: String },
    /// Toggle the volume keys on buttons 6 and 7.
    SwitchEtekcity { path: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        None => "warn",
        Some(Verbosity::Debug) => "debug",
        Some(Verbosity::Raw) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let api = Rc::new(hidapi::HidApi::new().map_err(|e| anyhow!("hidapi init: {e}"))?);
    let ctx = Context::new(hid::interface(Rc::clone(&api)), None)?;
    ctx.set_log_priority(match cli.verbose {
        None => LogPriority::Info,
        Some(Verbosity::Debug) => LogPriority::Debug,
        Some(Verbosity::Raw) => LogPriority::Raw,
    });
    ctx.set_log_handler(Rc::new(|priority: LogPriority, msg: &str| match priority {
        LogPriority::Raw => tracing::trace!("{msg}"),
        LogPriority::Debug => tracing::debug!("{msg}"),
        LogPriority::Info => tracing::info!("{msg}"),
        LogPriority::Error => tracing::error!("{msg}"),
    }));

    let open = |path: &str| -> Result<Device> {
        let token = hid::token_for(&api, path)?;
        ctx.create_device(&token)
            .with_context(|| format!("{path}: cannot open '{}'", token.name))
    };

    match cli.command {
        Commands::Info { path, json } => {
            let device = open(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&device.summary()?)?);
            } else {
                print_info(&device)?;
            }
        }
        Commands::List => {
            let mut found = 0;
            for token in hid::tokens(&api) {
                match ctx.create_device(&token) {
                    Ok(device) => {
                        println!("{}:\t{}", device.devnode(), device.name());
                        found += 1;
                    }
                    Err(e) => tracing::debug!("{}: {e}", token.devnode),
                }
            }
            if found == 0 {
                eprintln!("No supported devices found");
            }
        }
        Commands::ChangeButton {
            button,
            kind,
            value,
            path,
        } => {
            let device = open(&path)?;
            let profile = device.active_profile()?;
            let handle = profile.button(button)?;
            match kind {
                ActionKind::Button => {
                    let number = value
                        .parse()
                        .with_context(|| format!("'{value}' is not a button number"))?;
                    handle.set_button(number)?;
                }
                ActionKind::Key => handle.set_key(parse_key(&value)?, &[])?,
                ActionKind::Special => {
                    let special = SpecialAction::from_name(&value)
                        .ok_or_else(|| anyhow!("unknown special action '{value}'"))?;
                    handle.set_special(special)?;
                }
            }
            commit(&profile)?;
            println!("Button {button} is now '{}'", handle.action());
        }
        Commands::SwitchProfile { index, path } => {
            let device = open(&path)?;
            device.profile(index)?.set_active()?;
            println!("Profile {index} is active");
        }
        Commands::SwitchDpi { dpi, path } => {
            let device = open(&path)?;
            let profile = device.active_profile()?;
            let mut active = None;
            for r in 0..profile.num_resolutions() {
                let res = profile.resolution(r)?;
                if res.is_active() {
                    active = Some(res);
                    break;
                }
            }
            let res = active.ok_or_else(|| anyhow!("no active resolution"))?;
            res.set_dpi(dpi)?;
            commit(&profile)?;
            println!("Resolution {} set to {dpi} dpi", res.index());
        }
        Commands::SwitchEtekcity { path } => {
            let device = open(&path)?;
            let name = device.name();
            match toggle_volume_keys(&device)? {
                VolumeKeys::Reported => println!("Switched '{name}' to report the volume keys"),
                VolumeKeys::Silenced => {
                    println!("Switched '{name}' to not report the volume keys")
                }
                VolumeKeys::Untouched => {
                    println!("'{name}': buttons 6 and 7 carry other actions, left unchanged")
                }
            }
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum VolumeKeys {
    Reported,
    Silenced,
    Untouched,
}

/// Buttons 6 and 7 of the active profile: volume keys become disabled,
/// disabled buttons become volume keys, anything else is left alone.
fn toggle_volume_keys(device: &Device) -> Result<VolumeKeys> {
    if !device.has_capability(Capability::SwitchableProfile) {
        bail!("{}: device has no switchable profiles", device.devnode());
    }
    let profile = device.active_profile()?;
    let up = profile.button(6)?;
    let down = profile.button(7)?;

    if is_key(&up, KEY_VOLUMEUP) && is_key(&down, KEY_VOLUMEDOWN) {
        up.disable()?;
        down.disable()?;
        commit(&profile)?;
        Ok(VolumeKeys::Silenced)
    } else if up.action_type() == ActionType::None && down.action_type() == ActionType::None {
        up.set_key(KEY_VOLUMEUP, &[])?;
        down.set_key(KEY_VOLUMEDOWN, &[])?;
        commit(&profile)?;
        Ok(VolumeKeys::Reported)
    } else {
        Ok(VolumeKeys::Untouched)
    }
}

fn is_key(button: &Button, code: u32) -> bool {
    let mut modifiers = [0u32; ratbag_core::MAX_MODIFIERS];
    button.action_type() == ActionType::Key && button.key(&mut modifiers).0 == code
}

/// Push buffered edits to the hardware.
fn commit(profile: &Profile) -> Result<()> {
    profile
        .set_active()
        .with_context(|| format!("committing profile {}", profile.index()))
}

fn parse_key(value: &str) -> Result<u32> {
    if let Some(&(_, code)) = KEY_NAMES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
    {
        return Ok(code);
    }
    value
        .parse()
        .map_err(|_| anyhow!("unknown key '{value}'"))
}

fn print_info(device: &Device) -> Result<()> {
    println!("{} - {}", device.devnode(), device.name());
    println!("  Driver: {} ({})", device.driver_name(), device.id());
    let caps: Vec<_> = device
        .capabilities()
        .iter()
        .map(|c: Capability| c.label())
        .collect();
    println!("  Capabilities: {}", caps.join(", "));
    println!("  Profiles: {}", device.num_profiles());

    for p in 0..device.num_profiles() {
        let profile = device.profile(p)?;
        let marker = if profile.is_active() { " (active)" } else { "" };
        println!("  Profile {p}{marker}");
        for r in 0..profile.num_resolutions() {
            let res = profile.resolution(r)?;
            if res.dpi() == 0 {
                println!("    Resolution {r}: <disabled>");
                continue;
            }
            println!(
                "    Resolution {r}: {}dpi @ {}Hz{}{}",
                res.dpi(),
                res.report_rate(),
                if res.is_active() { " (active)" } else { "" },
                if res.is_default() { " (default)" } else { "" },
            );
        }
        for b in 0..profile.num_buttons() {
            let button = profile.button(b)?;
            println!(
                "    Button {b}: {} mapped to '{}'",
                button.button_type(),
                button.action()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratbag_core::driver::{
        Backend, BoundDevice, ButtonData, DeviceMatch, Driver, Probe, ProfileData, ResolutionMode,
    };
    use ratbag_core::io::DeviceIo;
    use ratbag_core::{Action, Capabilities, DeviceToken, Error, HidTransport, InputId, Interface};
    use std::cell::RefCell;

    const ANY: &[DeviceMatch] = &[DeviceMatch {
        bustype: None,
        vendor: None,
        product: None,
        version: None,
    }];

    /// Button actions as stored on the fake mouse, plus a count of writes.
    #[derive(Default)]
    struct Buttons {
        actions: Vec<Action>,
        writes: usize,
    }

    struct EightButtons {
        caps: Capabilities,
        buttons: Rc<RefCell<Buttons>>,
    }

    impl Backend for EightButtons {
        fn name(&self) -> &str {
            "eight-buttons"
        }

        fn id_table(&self) -> &[DeviceMatch] {
            ANY
        }

        fn probe(&self, _io: &DeviceIo, _id: &InputId) -> ratbag_core::Result<Probe> {
            Ok(Probe::Bound(BoundDevice {
                capabilities: self.caps,
                num_profiles: 1,
                num_buttons: 8,
                active_profile: 0,
                name: None,
                driver: Box::new(Flash(Rc::clone(&self.buttons))),
            }))
        }
    }

    struct Flash(Rc<RefCell<Buttons>>);

    impl Driver for Flash {
        fn read_profile(&mut self, _io: &DeviceIo, _index: u32) -> ratbag_core::Result<ProfileData> {
            Ok(ProfileData {
                resolutions: vec![ResolutionMode {
                    dpi: 800,
                    report_rate: 1000,
                }],
                num_resolutions: 1,
                active_resolution: Some(0),
                default_resolution: Some(0),
                buttons: self
                    .0
                    .borrow()
                    .actions
                    .iter()
                    .map(|action| ButtonData {
                        action: action.clone(),
                        ..ButtonData::default()
                    })
                    .collect(),
            })
        }

        fn set_active_profile(&mut self, _io: &DeviceIo, _index: u32) -> ratbag_core::Result<()> {
            Ok(())
        }

        fn read_active_profile(&mut self, _io: &DeviceIo) -> ratbag_core::Result<u32> {
            Ok(0)
        }

        fn write_resolution(
            &mut self,
            _io: &DeviceIo,
            _profile: u32,
            _index: u32,
            _mode: &ResolutionMode,
        ) -> ratbag_core::Result<()> {
            Ok(())
        }

        fn set_active_resolution(&mut self, _io: &DeviceIo, _profile: u32, _index: u32) -> ratbag_core::Result<()> {
            Ok(())
        }

        fn set_default_resolution(&mut self, _io: &DeviceIo, _profile: u32, _index: u32) -> ratbag_core::Result<()> {
            Ok(())
        }

        fn write_button(
            &mut self,
            _io: &DeviceIo,
            _profile: u32,
            index: u32,
            action: &Action,
        ) -> ratbag_core::Result<()> {
            let mut buttons = self.0.borrow_mut();
            buttons.actions[index as usize] = action.clone();
            buttons.writes += 1;
            Ok(())
        }
    }

    struct Unplugged;

    impl HidTransport for Unplugged {
        fn send_report(&self, _data: &[u8]) -> ratbag_core::Result<Vec<u8>> {
            Err(Error::Hid("no hardware behind this node".to_string()))
        }
    }

    fn mouse(caps: Capabilities, actions: Vec<Action>) -> (Device, Rc<RefCell<Buttons>>) {
        let buttons = Rc::new(RefCell::new(Buttons { actions, writes: 0 }));
        let backend = EightButtons {
            caps,
            buttons: Rc::clone(&buttons),
        };
        let interface = Interface::new(
            |_path, _mode| Ok(Box::new(Unplugged) as Box<dyn HidTransport>),
            drop,
        );
        let ctx = Context::with_backends(interface, None, vec![Box::new(backend)]).unwrap();
        let token = DeviceToken {
            name: "Etekcity Scroll 1".to_string(),
            devnode: "/dev/hidraw7".to_string(),
            id: InputId::default(),
        };
        (ctx.create_device(&token).unwrap(), buttons)
    }

    fn full_caps() -> Capabilities {
        [Capability::SwitchableProfile, Capability::ButtonKey]
            .into_iter()
            .collect()
    }

    fn key(code: u32) -> Action {
        Action::Key {
            key: code,
            modifiers: Vec::new(),
        }
    }

    #[test]
    fn disabled_buttons_become_volume_keys_and_back() {
        let (device, buttons) = mouse(full_caps(), vec![Action::None; 8]);

        assert_eq!(toggle_volume_keys(&device).unwrap(), VolumeKeys::Reported);
        assert_eq!(buttons.borrow().actions[6], key(KEY_VOLUMEUP));
        assert_eq!(buttons.borrow().actions[7], key(KEY_VOLUMEDOWN));

        assert_eq!(toggle_volume_keys(&device).unwrap(), VolumeKeys::Silenced);
        assert_eq!(buttons.borrow().actions[6], Action::None);
        assert_eq!(buttons.borrow().actions[7], Action::None);
        assert_eq!(buttons.borrow().writes, 4);
    }

    #[test]
    fn swapped_volume_keys_are_left_alone() {
        let mut actions = vec![Action::None; 8];
        actions[6] = key(KEY_VOLUMEDOWN);
        actions[7] = key(KEY_VOLUMEUP);
        let (device, buttons) = mouse(full_caps(), actions);

        assert_eq!(toggle_volume_keys(&device).unwrap(), VolumeKeys::Untouched);
        assert_eq!(buttons.borrow().writes, 0);
        assert_eq!(buttons.borrow().actions[6], key(KEY_VOLUMEDOWN));
    }

    #[test]
    fn one_mapped_button_blocks_the_toggle() {
        let mut actions = vec![Action::None; 8];
        actions[7] = Action::Button(8);
        let (device, buttons) = mouse(full_caps(), actions);

        assert_eq!(toggle_volume_keys(&device).unwrap(), VolumeKeys::Untouched);
        assert_eq!(buttons.borrow().writes, 0);
    }

    #[test]
    fn fixed_profile_devices_are_refused() {
        let caps = Capabilities::empty().with(Capability::ButtonKey);
        let (device, buttons) = mouse(caps, vec![Action::None; 8]);

        assert!(toggle_volume_keys(&device).is_err());
        assert_eq!(buttons.borrow().writes, 0);
    }
}
