use anyhow::{Result, anyhow};
use log::{debug, info, warn};

/// Something that can inject OS-level input.
pub trait InputSink {
    /// Send a chord like "CTRL+SHIFT+TAB" or a single "TAB".
    fn key_chord(&mut self, chord: &str) -> Result<()>;
    /// Wheel notches, positive scrolls up.
    fn scroll_vertical(&mut self, steps: i32) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Ctrl,
    Shift,
    Alt,
    Super,
    Tab,
    T,
    W,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
}

const ALL_KEYS: [Key; 13] = [
    Key::Ctrl,
    Key::Shift,
    Key::Alt,
    Key::Super,
    Key::Tab,
    Key::T,
    Key::W,
    Key::Left,
    Key::Right,
    Key::Up,
    Key::Down,
    Key::PageUp,
    Key::PageDown,
];

fn map_token(tok: &str) -> Result<Key> {
    let k = match tok {
        "CTRL" | "CONTROL" => Key::Ctrl,
        "SHIFT" => Key::Shift,
        "ALT" => Key::Alt,
        "SUPER" | "META" | "WIN" => Key::Super,
        "TAB" => Key::Tab,
        "T" => Key::T,
        "W" => Key::W,
        "LEFT" => Key::Left,
        "RIGHT" => Key::Right,
        "UP" => Key::Up,
        "DOWN" => Key::Down,
        "PAGEUP" => Key::PageUp,
        "PAGEDOWN" => Key::PageDown,
        other => return Err(anyhow!("unsupported key token: {other}")),
    };
    Ok(k)
}

/// Parse "CTRL+SHIFT+TAB" into keys, in press order.
pub fn parse_chord(chord: &str) -> Result<Vec<Key>> {
    let keys = chord
        .split('+')
        .map(|s| map_token(&s.trim().to_ascii_uppercase()))
        .collect::<Result<Vec<_>>>()?;
    if keys.is_empty() {
        return Err(anyhow!("empty key chord"));
    }
    Ok(keys)
}

pub struct UinputSink {
    #[allow(dead_code)]
    linux: Option<Box<LinuxUinput>>,
}

impl UinputSink {
    pub fn new() -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            let dev = LinuxUinput::create()?;
            return Ok(Self {
                linux: Some(Box::new(dev)),
            });
        }
        #[allow(unreachable_code)]
        {
            warn!("uinput not available; running in NO-OP mode");
            Ok(Self::noop())
        }
    }

    /// A sink that logs actions instead of injecting them.
    pub fn noop() -> Self {
        Self { linux: None }
    }
}

impl InputSink for UinputSink {
    fn key_chord(&mut self, chord: &str) -> Result<()> {
        let keys = parse_chord(chord)?;
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            // press in order
            for k in &keys {
                dev.key_send(*k, 1)?;
            }
            dev.sync()?;
            // release in reverse
            for k in keys.iter().rev() {
                dev.key_send(*k, 0)?;
            }
            dev.sync()?;
            return Ok(());
        }
        debug!("noop sink: key chord {keys:?}");
        Ok(())
    }

    fn scroll_vertical(&mut self, steps: i32) -> Result<()> {
        if steps == 0 {
            return Ok(());
        }
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            return dev.scroll_vertical(steps);
        }
        debug!("noop sink: scroll {steps}");
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn uinput_key(k: Key) -> uinput::event::keyboard::Key {
    use uinput::event::keyboard::Key as K;
    match k {
        Key::Ctrl => K::LeftControl,
        Key::Shift => K::LeftShift,
        Key::Alt => K::LeftAlt,
        Key::Super => K::LeftMeta,
        Key::Tab => K::Tab,
        Key::T => K::T,
        Key::W => K::W,
        Key::Left => K::Left,
        Key::Right => K::Right,
        Key::Up => K::Up,
        Key::Down => K::Down,
        Key::PageUp => K::PageUp,
        Key::PageDown => K::PageDown,
    }
}

#[cfg(target_os = "linux")]
struct LinuxUinput {
    dev: uinput::device::Device,
}

#[cfg(target_os = "linux")]
impl LinuxUinput {
    fn create() -> Result<Self> {
        use uinput::event::relative;

        let mut builder = uinput::default()?
            .name("Handctl Virtual Input")?
            .event(relative::Wheel::Vertical)?;
        for k in ALL_KEYS {
            builder = builder.event(uinput_key(k))?;
        }
        let dev = builder.create()?;

        info!("uinput: created virtual device");
        Ok(Self { dev })
    }

    fn sync(&mut self) -> Result<()> {
        self.dev.synchronize()?;
        Ok(())
    }

    fn key_send(&mut self, key: Key, val: i32) -> Result<()> {
        self.dev.send(uinput_key(key), val)?;
        Ok(())
    }

    fn scroll_vertical(&mut self, steps: i32) -> Result<()> {
        use uinput::event::relative::Wheel;
        self.dev.send(Wheel::Vertical, steps)?;
        self.sync()
    }
}
