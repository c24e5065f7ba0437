//! Card image provisioning: build the 16-byte command block for a card, or
//! read one back, as hex.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use keycard::{AdminAction, CardRecord, PlaybackMode, RECORD_LEN};
use platform::FolderId;

#[derive(Subcommand)]
pub enum CardCommand {
    /// Print the block image of a playable card
    Encode {
        /// Folder number (1-99)
        #[arg(long)]
        folder: u8,
        /// Playback mode
        #[arg(long, value_enum)]
        mode: Mode,
        /// Track (single-track mode) or start position (audiobook)
        #[arg(long, default_value_t = 0)]
        special: u16,
    },
    /// Print the block image of an admin card
    Admin {
        #[arg(value_enum)]
        action: Action,
    },
    /// Decode a block image given as hex
    Decode {
        /// 32 hex digits; spaces and colons are ignored
        hex: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Mode {
    Story,
    Album,
    Party,
    Single,
    Audiobook,
}

impl From<Mode> for PlaybackMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Story => PlaybackMode::StoryBranching,
            Mode::Album => PlaybackMode::Album,
            Mode::Party => PlaybackMode::Party,
            Mode::Single => PlaybackMode::SingleTrack,
            Mode::Audiobook => PlaybackMode::AudiobookResumable,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Action {
    Menu,
    Pair,
    Reset,
}

impl From<Action> for AdminAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Menu => AdminAction::OpenMenu,
            Action::Pair => AdminAction::PairCard,
            Action::Reset => AdminAction::ResetCard,
        }
    }
}

pub fn run(command: CardCommand) -> Result<()> {
    match command {
        CardCommand::Encode {
            folder,
            mode,
            special,
        } => {
            let folder = FolderId::try_new(folder)
                .map_err(|_| anyhow!("folder {folder} is outside 1..=99"))?;
            let record = CardRecord::new(folder, mode.into(), special);
            print_image(&record)
        }
        CardCommand::Admin { action } => print_image(&CardRecord::admin(action.into())),
        CardCommand::Decode { hex } => {
            let raw = parse_hex(&hex)?;
            let record = keycard::decode(&raw).context("not a valid command card")?;
            println!("{}", describe(&record).green());
            Ok(())
        }
    }
}

fn print_image(record: &CardRecord) -> Result<()> {
    let image = keycard::encode(record);
    // Must survive the firmware's own decoder before anyone writes it.
    keycard::decode(&image).context("encoded image does not decode")?;
    println!("{}", to_hex(&image));
    println!("{}", describe(record).dimmed());
    Ok(())
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}

pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.len() != RECORD_LEN * 2 {
        bail!(
            "expected {} hex digits, got {}",
            RECORD_LEN * 2,
            digits.len()
        );
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s: String = pair.iter().collect();
            u8::from_str_radix(&s, 16).with_context(|| format!("'{s}' is not a hex byte"))
        })
        .collect()
}

fn describe(record: &CardRecord) -> String {
    match record.admin_action() {
        Some(action) => format!("admin card: {action:?} (v{})", record.version),
        None => format!(
            "folder {} {:?} special {} (v{})",
            record.folder, record.mode, record.special, record.version
        ),
    }
}
