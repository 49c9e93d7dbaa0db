use std::sync::Mutex;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::config::ShoutoutConfig;

// the first entry of every pool is the classic phrasing

/// `{name}` is replaced with the streamer's display name.
pub const INTRO_TEMPLATES: [&str; 5] = [
    "🎉 Shoutout to @{name}!",
    "📣 Everybody go show @{name} some love!",
    "✨ Time to meet @{name}!",
    "💜 Huge shoutout to @{name}!",
    "🚨 PSA: you NEED to check out @{name}!",
];

/// `{about}` is replaced with the (possibly cut) about text. It always sits between quotes.
pub const ABOUT_TEMPLATES: [&str; 4] = [
    "Known for: \"{about}\".",
    "In their own words: \"{about}\".",
    "Their bio says it best: \"{about}\".",
    "Fun fact: \"{about}\".",
];

/// `{url}` is replaced with the channel link.
pub const CLOSING_TEMPLATES: [&str; 4] = [
    "Show some love ➡ {url}",
    "Go give them a follow ➡ {url}",
    "Check them out ➡ {url}",
    "Clearly they deserve it, so go follow them now ➡ {url}",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Intro,
    About,
    Closing,
}

impl Slot {
    pub fn pool(self) -> &'static [&'static str] {
        match self {
            Slot::Intro => &INTRO_TEMPLATES,
            Slot::About => &ABOUT_TEMPLATES,
            Slot::Closing => &CLOSING_TEMPLATES,
        }
    }
}

/// One template per slot, picked together for a single message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phrases {
    pub intro: &'static str,
    pub about: &'static str,
    pub closing: &'static str,
}

pub struct PhrasePicker {
    rng: Option<Mutex<StdRng>>,
}

impl PhrasePicker {
    /// Always picks the first template of each pool.
    pub fn first() -> Self {
        Self { rng: None }
    }

    pub fn random() -> Self {
        Self {
            rng: Some(Mutex::new(StdRng::from_entropy())),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn from_config(config: &ShoutoutConfig) -> Self {
        match (config.randomize_phrases, config.phrase_seed) {
            (false, _) => Self::first(),
            (true, Some(seed)) => Self::seeded(seed),
            (true, None) => Self::random(),
        }
    }

    /// Uniform pick from the slot's pool.
    pub fn pick(&self, slot: Slot) -> &'static str {
        let pool = slot.pool();
        match &self.rng {
            Some(rng) => {
                // a poisoned rng is still a fine rng
                let mut rng = rng.lock().unwrap_or_else(|e| e.into_inner());
                pool.choose(&mut *rng).copied().unwrap_or(pool[0])
            }
            None => pool[0],
        }
    }

    pub fn pick_all(&self) -> Phrases {
        Phrases {
            intro: self.pick(Slot::Intro),
            about: self.pick(Slot::About),
            closing: self.pick(Slot::Closing),
        }
    }
}
