use serde::Serialize;
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `DEVMIND_QUIET=1` suppresses the human-mode banners
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("DEVMIND_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }

    pub fn is_human(self) -> bool {
        self == Self::Human
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    command: &'a str,
    data: T,
}

/// Print `data` as a single JSON document tagged with the command name
pub fn emit_success<T: Serialize>(mode: OutputMode, command: &str, data: T) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        println!("{}", serde_json::to_string_pretty(&Envelope { command, data })?);
    }
    Ok(())
}
