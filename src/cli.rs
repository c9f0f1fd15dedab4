use anyhow::{Result, anyhow};
use log::{info, warn};
use pico_args::Arguments;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::{
    env,
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
    time::Instant,
};

use crate::actions::{InputSink, UinputSink};
use crate::config::ConfigState;
use crate::pipeline::{Pipeline, run_pipeline};
use crate::source::{JsonLinesSource, LandmarkSource};
use crate::watch::ProfileWatcher;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    // Flags-based help (-h/--help)
    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("run") => {
            let input: Option<PathBuf> = pargs.opt_value_from_str("--input")?;
            let profile: Option<String> = pargs.opt_value_from_str("--profile")?;
            let dry_run = pargs.contains("--dry-run");
            run_session(input, profile, dry_run)
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handctl use <profile_name>"))?;
            let mut cfg = ConfigState::load_or_install_default()?;
            cfg.set_active(&name)?;
            println!("active profile: {}", cfg.active_name);
            Ok(())
        }

        Some("list") => {
            let cfg = ConfigState::load_or_install_default()?;
            for name in cfg.list_profiles() {
                let mark = if name == cfg.active_name { "*" } else { " " };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("doctor") => {
            let cfg = ConfigState::load_or_install_default()?;
            print_response(&cfg.doctor_report());
            Ok(())
        }

        Some("emit") => {
            // usage:
            //   handctl emit scroll 3
            //   handctl emit key CTRL+TAB
            let what: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handctl emit <scroll|key> ..."))?;
            let mut sink = UinputSink::new()?;
            match what.as_str() {
                "scroll" => {
                    let steps: i32 = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: handctl emit scroll <steps>"))?;
                    sink.scroll_vertical(steps)?;
                    println!("ok: scrolled vertical {steps}");
                }
                "key" => {
                    let chord: String = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: handctl emit key CTRL+TAB"))?;
                    sink.key_chord(&chord)?;
                    println!("ok: sent key chord {chord}");
                }
                other => return Err(anyhow!("unknown emit kind: {other}")),
            }
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn run_session(input: Option<PathBuf>, profile: Option<String>, dry_run: bool) -> Result<()> {
    let mut cfg = ConfigState::load_or_install_default()?;
    if let Some(name) = profile {
        cfg.select(&name)?;
    }
    info!("using profile '{}'", cfg.active_name);

    // first signal asks the loop to stop, a second one exits right away
    let stop = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        flag::register_conditional_shutdown(sig, 1, Arc::clone(&stop))?;
        flag::register(sig, Arc::clone(&stop))?;
    }

    let sink = if dry_run {
        info!("dry run: actions are logged, not injected");
        UinputSink::noop()
    } else {
        UinputSink::new()?
    };
    let mut pipeline = Pipeline::new(cfg.profile.clone(), sink, Instant::now());

    let mut source: Box<dyn LandmarkSource> = match &input {
        Some(path) => Box::new(JsonLinesSource::open(path)?),
        None => Box::new(JsonLinesSource::stdin()),
    };

    let watcher = match ProfileWatcher::new(&cfg.profile_path()) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("profile hot reload disabled: {e}");
            None
        }
    };
    let reload = || {
        if !watcher.as_ref()?.changed() {
            return None;
        }
        match cfg.reload() {
            Ok(()) => Some(cfg.profile.clone()),
            Err(e) => {
                warn!("keeping previous profile: {e}");
                None
            }
        }
    };

    run_pipeline(source.as_mut(), &mut pipeline, &stop, reload)?;
    Ok(())
}

fn print_help() {
    println!(
        r#"handctl: hand gesture browser control

USAGE:
  handctl help [command]                  Show general or command-specific help
  handctl run [--input FILE] [--profile NAME] [--dry-run]
                                          Recognize gestures from a landmark stream
  handctl use <name>                      Switch active profile
  handctl list                            List profiles
  handctl doctor                          Diagnose uinput permissions and config
  handctl emit scroll <steps>             Emit vertical scroll (+/- steps)
  handctl emit key CTRL+TAB               Emit a key or chord

TIPS:
  - Landmarks are read as JSON lines: {{"t": 0.03, "hands": [[[x, y], ...]]}}
  - Profiles: ~/.config/handctl/profiles
  - Active profile pointer: ~/.config/handctl/active
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "run" => println!(
            "usage: handctl run [--input FILE] [--profile NAME] [--dry-run]\nReads landmark frames from FILE (stdin by default) and drives tab and scroll actions.\nThe profile file is reloaded when it changes.\nCtrl-C stops after the current frame; while the tracker sends nothing, press it twice to exit."
        ),
        "use" => {
            println!("usage: handctl use <name>\nSwitches the active profile to <name>.")
        }
        "list" => {
            println!("usage: handctl list\nLists available profiles; marks active with '*'.")
        }
        "doctor" => println!(
            "usage: handctl doctor\nChecks uinput access and shows the active profile."
        ),
        "emit" => println!("usage:\n  handctl emit scroll <steps>\n  handctl emit key CTRL+TAB"),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
