// Keybindings for the slideshow
// Maps key names and typed commands to actions
//
// Keybindings:
// - Escape / q: Exit
// - a / Left: Previous image
// - d / Right: Next image
// - space: Start/stop the slideshow
// - s: Toggle shuffle
// - r: Reload current image
//
// Commands:
// - speed [ms]: Slide delay, or the next preset without an argument
// - cache [n]: Look-ahead window size, or the next preset without an argument
// - open <dir>: Load another folder
// - surface <w>x<h>: Display surface size

use std::path::PathBuf;

use crate::config::parse_surface;

/// Something the user asked the slideshow to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Exit,
    Previous,
    Next,
    TogglePlayback,
    ToggleShuffle,
    Reload,
    SetSpeed(u64),
    CycleSpeed,
    SetCacheSize(usize),
    CycleCacheSize,
    Open(PathBuf),
    SetSurface(u32, u32),
}

/// Action bound to a single key name, if any.
pub fn action_for_key(key: &str) -> Option<Action> {
    match key {
        "Escape" | "q" | "Q" => Some(Action::Exit),
        "a" | "A" | "Left" => Some(Action::Previous),
        "d" | "D" | "Right" => Some(Action::Next),
        "space" | " " => Some(Action::TogglePlayback),
        "s" | "S" => Some(Action::ToggleShuffle),
        "r" | "R" => Some(Action::Reload),
        _ => None,
    }
}

/// Parses one input line: a key name or a command with an argument.
pub fn parse_command(line: &str) -> Option<Action> {
    // A bare space is the playback key; don't trim it away.
    if line == " " {
        return Some(Action::TogglePlayback);
    }

    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => {
            return match line.to_ascii_lowercase().as_str() {
                "speed" => Some(Action::CycleSpeed),
                "cache" => Some(Action::CycleCacheSize),
                _ => action_for_key(line),
            }
        }
    };

    match name.to_ascii_lowercase().as_str() {
        "speed" => arg
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .map(Action::SetSpeed),
        "cache" => arg
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Action::SetCacheSize),
        "open" if !arg.is_empty() => Some(Action::Open(PathBuf::from(arg))),
        "surface" => parse_surface(arg).map(|(w, h)| Action::SetSurface(w, h)),
        _ => None,
    }
}
