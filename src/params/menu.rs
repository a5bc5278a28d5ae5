use super::{Method, Obfs, ObfsMode};

pub const METHOD_MENU: &str = "\
  1) 2022-blake3-aes-128-gcm (default)
  2) 2022-blake3-aes-256-gcm
  3) 2022-blake3-chacha20-poly1305
  4) aes-128-gcm
  5) aes-256-gcm
  6) chacha20-ietf-poly1305";

pub const OBFS_MENU: &str = "\
  1) none
  2) http (default)
  3) tls";

const DEFAULT_METHOD_CHOICE: &str = "1";
const DEFAULT_OBFS_CHOICE: &str = "2";

/// Result of reading a menu answer. `fallback` is set when the answer was not
/// a menu entry and the default was used instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuPick<T> {
    pub value: T,
    pub fallback: bool,
}

impl<T> MenuPick<T> {
    fn chosen(value: T) -> Self {
        Self { value, fallback: false }
    }

    fn fallback(value: T) -> Self {
        Self { value, fallback: true }
    }
}

fn or_default<'a>(choice: &'a str, default: &'a str) -> &'a str {
    let choice = choice.trim();
    if choice.is_empty() {
        default
    } else {
        choice
    }
}

pub fn select_method(choice: &str) -> MenuPick<Method> {
    let choice = or_default(choice, DEFAULT_METHOD_CHOICE);
    let index = choice
        .parse::<usize>()
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| Method::ALL.get(i));
    match index {
        Some(method) => MenuPick::chosen(*method),
        None => {
            log::warn!("unknown cipher choice {choice:?}, using {}", Method::default());
            MenuPick::fallback(Method::default())
        }
    }
}

/// `None` means obfuscation is off. Unknown choices resolve to off as well.
pub fn select_obfuscation(choice: &str, host: &str) -> MenuPick<Option<Obfs>> {
    match or_default(choice, DEFAULT_OBFS_CHOICE) {
        "1" => MenuPick::chosen(None),
        "2" => MenuPick::chosen(Some(Obfs::new(ObfsMode::Http, host))),
        "3" => MenuPick::chosen(Some(Obfs::new(ObfsMode::Tls, host))),
        other => {
            log::warn!("unknown obfuscation choice {other:?}, obfuscation disabled");
            MenuPick::fallback(None)
        }
    }
}
